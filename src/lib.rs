pub mod config;
pub mod fits;
pub mod handlers;
pub mod humanize;
pub mod observability;
pub mod storage;
