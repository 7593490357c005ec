pub mod bus;
pub mod cassandra;
pub mod config;
pub mod error;
pub mod kafka;
pub mod media;
pub mod pipeline;
pub mod server;
pub mod service;
