pub mod config_service;
pub mod paths;

pub use config_service::ConfigService;
pub use paths::ContablePaths;
