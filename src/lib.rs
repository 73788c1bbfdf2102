pub mod api;
pub mod channels;
pub mod clients;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod queue;
pub mod services;
pub mod store;
pub mod utils;
