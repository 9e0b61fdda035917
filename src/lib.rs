pub mod config;
pub mod limits;
pub mod model;
pub mod observability;
pub mod record;
pub mod registry;
pub mod sql;
pub mod store;
pub mod validator;

pub use config::{ConfigError, ValidatorConfig};
pub use validator::{OverlapValidator, ValidationOutcome, ValidatorError};
