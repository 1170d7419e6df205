pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod storage;
