pub mod cliopt;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod opentsdb;
pub mod output;
pub mod parser;
pub mod runner;
pub mod server;
pub mod storage;
