pub mod config;
pub mod database;
pub mod model_cache;
pub mod scorer;
pub mod overlay;
pub mod session;
pub mod engine;
pub mod controller;
