pub mod app;
pub mod config;
pub mod rpc;
pub mod search;
pub mod server;
