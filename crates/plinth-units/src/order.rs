use plinth_core::{BoxError, Reply, RouteTableBuilder, Unit, UnitConfig, config_str};
use tracing::info;

pub(crate) const NAME: &str = "order";
const DEFAULT_DSN: &str = "memory://default";

/// Order endpoint backed by a configurable store. Requires `auth`.
///
/// Config: `dsn` (string).
#[derive(Debug, Default)]
pub struct OrderUnit {
    dsn: String,
    running: bool,
}

impl Unit for OrderUnit {
    fn dependencies(&self) -> Vec<String> {
        vec![crate::auth::NAME.to_owned()]
    }

    fn initialize(&mut self, config: UnitConfig) -> Result<(), BoxError> {
        self.dsn = config_str(&config, "dsn", DEFAULT_DSN);
        self.running = true;
        info!(unit = NAME, dsn = %self.dsn, "initialized");
        Ok(())
    }

    fn publish(&self, routes: &mut RouteTableBuilder) {
        let msg = format!("Order module using DSN: {}", self.dsn);
        routes.get("/order", move |_| Reply::message(msg.as_str()));
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        if std::mem::take(&mut self.running) {
            info!(unit = NAME, "shut down");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_auth_dependency_without_initializing() {
        let unit = OrderUnit::default();
        assert_eq!(unit.dependencies(), vec!["auth"]);
        assert!(!unit.running);
        assert!(unit.dsn.is_empty());
    }
}
