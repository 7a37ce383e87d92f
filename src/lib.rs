pub mod cache;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod logging;
pub mod models;
pub mod paths;
pub mod process;
pub mod provider;
pub mod refresh;
pub mod share_link;
