pub mod config_service;
pub mod frame_source;
pub mod paths;
pub mod secret_service;

pub use crate::config_service::ConfigService;
pub use crate::frame_source::ReplayFrameSource;
pub use crate::paths::MootPaths;
pub use crate::secret_service::SecretServiceImpl;
