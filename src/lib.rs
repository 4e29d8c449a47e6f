pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod firebase;
pub mod meals;
pub mod state;
pub mod storage;
