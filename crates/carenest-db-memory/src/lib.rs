//! In-memory entity store backend for the carenest API.
//!
//! This crate provides an in-memory implementation of the `EntityStore` trait
//! from `carenest-storage`, using one `DashMap` per collection for concurrent
//! access.
//!
//! # Example
//!
//! ```ignore
//! use carenest_db_memory::{StorageConfig, create_store};
//!
//! let store = create_store(&StorageConfig::default()).await?;
//! let created = store.insert(EntityKind::User, json!({ "name": "Dana" })).await?;
//! ```

pub mod factory;
mod matcher;
pub mod storage;

pub use carenest_storage::{EntityStore, StorageError};
pub use factory::{StorageBackend, StorageConfig, create_store};
pub use storage::InMemoryStore;
