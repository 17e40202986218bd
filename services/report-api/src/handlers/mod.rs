//! HTTP request handlers for the report API.

pub mod health;
pub mod report;
pub mod upload;
