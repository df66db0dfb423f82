pub mod config;
pub mod engine;
pub mod ops;
pub mod persistence;
pub mod refinery;
