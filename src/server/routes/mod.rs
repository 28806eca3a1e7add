//! Proxy-plane routes

pub mod chat;
pub mod health;
pub mod models;
