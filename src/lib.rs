pub mod calendar;
pub mod classify;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod holiday;
pub mod models;
pub mod report;
pub mod server;
pub mod service;
pub mod store;

pub use error::{AppError, Result};
