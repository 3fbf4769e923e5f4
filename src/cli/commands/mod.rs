//! CLI command implementations.

mod chat;
mod config;
mod doctor;
mod recommend;
mod serve;

pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use recommend::run_recommend;
pub use serve::run_serve;
