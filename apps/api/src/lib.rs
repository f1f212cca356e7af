pub mod analysis;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod errors;
pub mod inference;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
