pub mod assets;
pub mod config;
pub mod error;
pub mod framework;
pub mod host;
pub mod menu;
pub mod paths;
pub mod plugins;
pub mod sanitizer;
