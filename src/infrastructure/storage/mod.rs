//! In-memory storage backend
//!
//! DashMap-backed repositories used by tests and by deployments that do
//! not need persistence.

pub mod memory;

pub use memory::InMemoryRepositoryProvider;
