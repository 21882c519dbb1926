pub mod batch;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod legacy;
pub mod report;
pub mod save;
pub mod scan;
pub mod session;
pub mod util;
