//! Request/Response data transfer objects

pub mod donation;
pub mod profile;
