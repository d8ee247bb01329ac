//! Typed configuration loading from environment variables, optionally seeded
//! from dotenv files.
//!
//! ```no_run
//! use env_loadr::{EnvLoader, FromEnv, new_config};
//!
//! #[derive(Debug, FromEnv)]
//! struct DatabaseConfig {
//!     #[field(env = "URL", required)]
//!     url: String,
//!     #[field(env = "POOL_SIZE", default = "10")]
//!     pool_size: u32,
//! }
//!
//! #[derive(Debug, FromEnv)]
//! struct Config {
//!     #[field(env = "APP_NAME", default = "my-app")]
//!     app_name: String,
//!     #[field(env = "ALLOWED_HOSTS", delimiter = ";")]
//!     allowed_hosts: Vec<String>,
//!     #[field(nested, prefix = "DB_")]
//!     database: DatabaseConfig,
//! }
//!
//! let loader = EnvLoader::<Config>::builder()
//!     .source(".env")
//!     .skip_missing_files()
//!     .build()?;
//! let config = new_config(&loader)?;
//! # Ok::<(), env_loadr::LoadError>(())
//! ```

extern crate self as env_loadr;

pub mod binder;
pub mod docs;
pub mod error;
pub mod field;
pub mod loader;
pub mod source;
pub mod value;

// Re-export main types
pub use binder::{BindOptions, Binder, FromEnv};
pub use error::LoadError;
pub use field::{FieldInfo, FieldSpec};
pub use loader::{EnvLoader, LoaderBuilder, LoaderOptions};
pub use value::EnvValue;

// Re-export derive macro
pub use env_loadr_macros::FromEnv;

/// A source of configuration values of type `T`
///
/// [`EnvLoader`] is the environment-backed implementation; other sources can
/// implement this and be used interchangeably through [`new_config`].
pub trait ConfigLoader<T> {
    type Error;

    fn load(&self) -> Result<T, Self::Error>;
}

/// Create a configuration of type `T` using `loader`
pub fn new_config<T, L>(loader: &L) -> Result<T, L::Error>
where
    L: ConfigLoader<T> + ?Sized,
{
    loader.load()
}
