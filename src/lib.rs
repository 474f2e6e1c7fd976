//! Meal logging service: conversational intake through an external
//! interpreter, a SQLite log store, and per-day rollups for review and charts.

pub mod app;
pub mod chat;
pub mod config;
pub mod date_key;
pub mod db;
pub mod error;
pub mod interpreter;
pub mod logs;
pub mod settings;
pub mod state;
pub mod trends;
