pub mod analyze;
pub mod status;
pub mod summary;
pub mod token;
pub mod utils;
pub mod watch;
