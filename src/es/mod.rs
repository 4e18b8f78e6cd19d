pub mod client;
pub mod engine;
pub mod mapping;
pub mod templates;
