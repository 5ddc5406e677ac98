pub mod api_key;
pub mod client;
pub mod error;
