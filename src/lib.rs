// Library root for the cabinet access service

pub mod core;
pub mod hardware;
pub mod store;
pub mod orchestrator;
pub mod api;
pub mod config;
