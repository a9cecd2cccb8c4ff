//! Treks, the published routes sensitive areas are matched against.

use geo::LineString;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Lifecycle, Srid};

/// A trekking route.
///
/// Its sensitive areas are the existing areas whose footprint intersects
/// `path`; see [`AreaStore::intersecting`](crate::AreaStore::intersecting).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trek {
    /// Store identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Route geometry.
    pub path: LineString<f64>,
    /// Reference system `path` is expressed in.
    pub srid: Srid,
    /// Whether the trek is public.
    pub published: bool,
    /// Owning structure.
    pub structure: u64,
    /// Soft-deletion state.
    pub lifecycle: Lifecycle,
}

impl Trek {
    /// Construct an existing, unpublished trek.
    pub fn new(id: u64, name: impl Into<String>, path: LineString<f64>, srid: Srid) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            srid,
            published: false,
            structure: 0,
            lifecycle: Lifecycle::Existing,
        }
    }

    /// Set the publication flag.
    #[must_use]
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Whether the trek may be shown to the public.
    pub const fn is_public(&self) -> bool {
        self.published
    }

    /// Whether the trek has not been soft-deleted.
    pub const fn is_existing(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Existing)
    }
}
