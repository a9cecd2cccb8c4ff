//! Facade crate for the sensitive areas engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite store,
//! the web layer and the export tasks behind feature flags.

#![forbid(unsafe_code)]

pub use sensitivity_core::{
    Actor, AreaGeometry, AreaIndex, AreaQuery, AreaStore, AreaStoreMut, Lifecycle, Period,
    Permission, Practice, PracticeFilter, SensitiveArea, Species, SpeciesCategory, Srid,
    SridError, StoreError, Structure, Trek, TrekStore, User,
};

#[cfg(feature = "store-sqlite")]
pub use sensitivity_core::SqliteStore;

/// Views, forms and the public API.
#[cfg(feature = "web")]
pub use sensitivity_web as web;

/// Background export jobs.
#[cfg(feature = "tasks")]
pub use sensitivity_tasks as tasks;
