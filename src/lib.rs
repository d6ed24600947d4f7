pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod output;
pub mod tui;
