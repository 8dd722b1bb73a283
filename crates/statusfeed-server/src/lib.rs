//! RSS server: feed and health routes, DTOs, and OpenAPI documentation.

pub mod config;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod rss;
pub mod state;
