//! # carenest-storage
//!
//! Storage abstraction layer for the carenest API.
//!
//! This crate defines the traits and types that all storage backends must
//! implement. Implementations live in separate crates.
//!
//! ## Overview
//!
//! The main trait is [`EntityStore`], which defines:
//! - lifecycle (open once, close once)
//! - CRUD on JSON documents, one collection per entity kind
//! - filtered, sorted and capped queries
//! - counts and grouped counts for aggregation
//!
//! ## Example
//!
//! ```ignore
//! use carenest_storage::{Constraint, Filter, Query, typed};
//!
//! let upcoming: Vec<Appointment> = typed::find(
//!     store.as_ref(),
//!     &Query::new(Filter::from(Constraint::eq("patient", patient_id)))
//!         .sort_asc("appointmentDate")
//!         .limit(10),
//! )
//! .await?;
//! ```

mod error;
mod query;
mod traits;
pub mod typed;

pub use error::{ErrorCategory, StorageError};
pub use query::{Constraint, Filter, Query, SortKey, SortOrder};
pub use traits::EntityStore;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn EntityStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use carenest_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::query::{Constraint, Filter, Query, SortKey, SortOrder};
    pub use crate::traits::EntityStore;
    pub use crate::typed;
    pub use crate::{DynStore, StorageResult};
}
