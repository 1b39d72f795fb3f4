//! Request handlers

pub mod donation;
pub mod form;
pub mod health;
pub mod profiles;
