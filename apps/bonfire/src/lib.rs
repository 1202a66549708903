pub mod config;
pub mod dispatch;
pub mod model;
pub mod render;
pub mod session;
pub mod telemetry;
pub mod transport;
