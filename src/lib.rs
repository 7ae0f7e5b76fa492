pub mod alignment;
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod fetch_error;
pub mod fetcher;
pub mod observation;
pub mod orchestrator;
pub mod scheduler;
pub mod services;
pub mod stations;
pub mod utils;
