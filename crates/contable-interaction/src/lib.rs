//! Network access to the accounting-assistant backend.

pub mod endpoints;
pub mod http_client;

pub use http_client::HttpAssistantClient;
