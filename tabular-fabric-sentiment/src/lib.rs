pub mod analyzer;
pub mod api;
pub mod base;
pub mod config;
pub mod constants;
pub mod errors;
pub mod infer;
pub mod models;
pub mod summary;
pub mod validate;
