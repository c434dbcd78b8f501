pub mod cli;
pub mod core;
pub mod domain;
pub mod issuance;
pub mod orchestrator;
pub mod platform;
pub mod renewal;

pub use cli::run;
