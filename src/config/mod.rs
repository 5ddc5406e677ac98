pub mod error;
pub mod parameter;
pub mod settings;
