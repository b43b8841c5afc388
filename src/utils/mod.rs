// src/utils/mod.rs
pub mod data_loader;
pub mod data_splitter;
pub mod env;
pub mod logging;
pub mod progress_config;
pub mod synthetic;
