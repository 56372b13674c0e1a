//! Configuration loading, secret resolution, and assembly of the raglet pipelines.

pub mod bootstrap;
pub mod config;
pub mod vault;

pub use bootstrap::AppBuilder;
pub use config::Config;
