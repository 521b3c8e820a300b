// src/edinet/mod.rs
pub mod archive;
pub mod client;
pub mod crawler;
pub mod models;
