//! # Lodgelock Booking Core
//!
//! Self-check-in booking engine for unattended lodging: interval
//! allocation without double-booking, a guarded booking lifecycle,
//! access-code issuance and bounded resource ledgers.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, repository traits and errors
//! - **application**: Services implementing the booking workflows
//! - **infrastructure**: Persistence (SeaORM database, in-memory storage)
//! - **support**: Shutdown coordination and retry helpers

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod support;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};
