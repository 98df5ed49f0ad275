//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → CLI flags and the DEBUG variable override individual fields
//!
//! On SIGHUP:
//!     service reconfiguration reloads the same file
//!     → validation.rs validates
//!     → startup overrides are re-applied on top
//!     → new interval takes effect; on failure the current config is kept
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a reload
//! - All fields have defaults so running without a file works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, StartupOverrides};
pub use validation::{validate_config, ValidationError};
pub use schema::DebugConfig;
pub use schema::NotifyConfig;
pub use schema::ObservabilityConfig;
pub use schema::ServiceConfig;
pub use schema::ServiceSettings;
