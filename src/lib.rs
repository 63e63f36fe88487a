pub mod cli;
pub mod config;
pub mod csv;
pub mod domain;
pub mod errors;
pub mod importer;
pub mod logging;
pub mod processor;
pub mod services;
pub mod sources;
pub mod storage;
