//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, load_default_config, save_config, save_default_config};
pub use paths::config_file_path;
pub use types::{
    AcquisitionConfig, Config, EnrichmentConfig, IdentifyConfig, OutputConfig, OutputFormat,
    RecognitionConfig, ServerConfig,
};
pub use validate::validate_config;
