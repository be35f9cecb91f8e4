pub mod config;
pub mod db;
pub mod export;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod stats;
pub mod templates;
pub mod utils;
pub mod validation;
