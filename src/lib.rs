pub mod api;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod humanize;
pub mod imaging;
pub mod observability;
pub mod uploads;
