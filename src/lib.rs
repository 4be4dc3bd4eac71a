pub mod config;
pub mod constants;
pub mod converters;
pub mod error;
pub mod logging;
pub mod readers;
pub mod sanitizer;
pub mod schema;
pub mod service;
pub mod transforms;
pub mod types;
pub mod writers;
