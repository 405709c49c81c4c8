pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod monitor;
pub mod worker;
