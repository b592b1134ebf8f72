//! pingpong-server: wires the vision and motor subsystems into one process
//! and exposes them over HTTP.

pub mod settings;
pub mod hardware;
pub mod system;
pub mod http;

pub use settings::AppConfig;
pub use hardware::Hardware;
pub use system::{FeederSystem, SystemStatus};
pub use http::{create_router, AppState};
