//! Business logic and use cases

pub mod services;
