pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod transform;
