pub mod auth;
pub mod browser;
pub mod config;
pub mod import;
pub mod ingest;
pub mod leaderboard;
pub mod logging;
pub mod model;
pub mod output;
pub mod scoring;
pub mod store;
