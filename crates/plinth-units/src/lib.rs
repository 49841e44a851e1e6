//! Units bundled with the plinth binary.
//!
//! | Unit    | Depends on | Route        |
//! |---------|------------|--------------|
//! | `user`  |            | `GET /user`  |
//! | `auth`  |            | `GET /auth`  |
//! | `order` | `auth`     | `GET /order` |

mod auth;
mod order;
mod user;

use plinth_core::{LifecycleError, UnitRegistry};

pub use auth::AuthUnit;
pub use order::OrderUnit;
pub use user::UserUnit;

/// A registry holding every built-in unit.
pub fn builtin_registry() -> Result<UnitRegistry, LifecycleError> {
    let mut registry = UnitRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

/// Add the built-in units to an existing registry.
pub fn register_builtins(registry: &mut UnitRegistry) -> Result<(), LifecycleError> {
    registry.register(user::NAME, || Box::new(UserUnit::default()))?;
    registry.register(auth::NAME, || Box::new(AuthUnit::default()))?;
    registry.register(order::NAME, || Box::new(OrderUnit::default()))?;
    Ok(())
}
