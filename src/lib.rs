//! Order valuation, cart lifecycle and dashboard analytics for a small shop,
//! with a thin axum JSON surface on top.

pub mod analytics;
pub mod api;
pub mod config;
pub mod directory;
pub mod entities;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod repository;
pub mod valuation;

pub use error::ShopError;
