//! Encrypted personal-access-token vault with password login and
//! self-contained bearer credentials.

pub mod api;
pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod gateway;
pub mod vault;
