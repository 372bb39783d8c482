//! Gmail API module
//!
//! Contains types, authentication, client, and message handling for
//! interacting with the Gmail API.

pub mod auth;
pub mod client;
pub mod message;
pub mod summary;
pub mod types;
