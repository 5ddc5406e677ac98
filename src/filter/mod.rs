pub mod error;
pub mod job;
pub mod parameter_filter;
pub mod rules;
pub mod tools;
