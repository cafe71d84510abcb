//! Request middleware and extractors

pub mod actor;
pub mod json;

pub use actor::Actor;
pub use json::ApiJson;
