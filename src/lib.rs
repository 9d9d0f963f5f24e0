pub mod analytics;
pub mod app;
pub mod auth;
pub mod config;
pub mod contact;
pub mod content;
pub mod db;
pub mod error;
pub mod mail;
pub mod state;
pub mod telemetry;
pub mod validation;
