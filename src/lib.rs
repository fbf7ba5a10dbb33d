pub mod cli;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod response;
pub mod wal;
