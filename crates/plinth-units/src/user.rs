use plinth_core::{BoxError, Reply, RouteTableBuilder, Unit, UnitConfig, config_str};
use tracing::info;

pub(crate) const NAME: &str = "user";
const DEFAULT_GREETING: &str = "Hello from user (default)";

/// Greets callers with a configurable message.
///
/// Config: `greeting` (string).
#[derive(Debug, Default)]
pub struct UserUnit {
    greeting: String,
    running: bool,
}

impl Unit for UserUnit {
    fn initialize(&mut self, config: UnitConfig) -> Result<(), BoxError> {
        self.greeting = config_str(&config, "greeting", DEFAULT_GREETING);
        self.running = true;
        info!(unit = NAME, greeting = %self.greeting, "initialized");
        Ok(())
    }

    fn publish(&self, routes: &mut RouteTableBuilder) {
        let greeting = self.greeting.clone();
        routes.get("/user", move |_| Reply::message(greeting.as_str()));
    }

    fn shutdown(&mut self) -> Result<(), BoxError> {
        if std::mem::take(&mut self.running) {
            info!(unit = NAME, "shut down");
        }
        Ok(())
    }
}
