pub mod env;
mod loader;

pub use env::{
    AppConfig, ConfigError, DirectoryConfig, FilterSettings, OutputConfig, OutputMethod,
    ProcessingConfig, ProcessingMode,
};
pub use loader::load_config;
