//! Core domain types for sensitive areas along treks.
//!
//! A sensitive area is a zone where a protected species, or a regulation,
//! restricts outdoor practices for part of the year. This crate models the
//! areas, their species and the treks crossing them, and exposes the query
//! layer every presentation surface goes through.
//!
//! # Examples
//!
//! ```
//! use sensitivity_core::{AreaQuery, AreaStore, SensitiveArea, Srid};
//! use sensitivity_core::test_support::{MemoryStore, sample_species, square};
//!
//! # fn main() -> Result<(), sensitivity_core::StoreError> {
//! let area = SensitiveArea::new(
//!     1,
//!     sample_species(1, &["Climbing"]),
//!     square(700_000.0, 6_600_000.0, 100.0),
//!     Srid::Lambert93,
//!     1,
//! )
//! .with_published(true);
//! let store = MemoryStore::new(Srid::Lambert93).with_areas([area]);
//! let public = store.select(&AreaQuery::existing().published())?;
//! assert_eq!(public.len(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod area;
mod query;
mod species;
mod srid;
mod store;
mod structure;
mod trek;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use area::{AreaGeometry, DEFAULT_BUFFER_RADIUS, Lifecycle, SensitiveArea};
pub use query::{AreaQuery, PracticeFilter};
pub use species::{Period, Practice, Species, SpeciesCategory, UnknownCategory};
pub use srid::{Srid, SridError};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteStore;
pub use store::{AreaIndex, AreaStore, AreaStoreMut, StoreError, TrekStore};
pub use structure::{Actor, Permission, Structure, User};
pub use trek::Trek;
