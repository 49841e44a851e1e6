use plinth_core::{BoxError, Reply, RouteTableBuilder, Unit, UnitConfig};
use tracing::info;

pub(crate) const NAME: &str = "auth";

/// Authentication endpoint. Takes no configuration.
#[derive(Debug, Default)]
pub struct AuthUnit {
    running: bool,
}

impl Unit for AuthUnit {
    fn initialize(&mut self, _config: UnitConfig) -> Result<(), BoxError> {
        self.running = true;
        info!(unit = NAME, "initialized");
        Ok(())
    }

    fn publish(&self, routes: &mut RouteTableBuilder) {
        routes.get("/auth", |_| Reply::message("Hello from auth module"));
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        if std::mem::take(&mut self.running) {
            info!(unit = NAME, "shut down");
        }
        Ok(())
    }
}
