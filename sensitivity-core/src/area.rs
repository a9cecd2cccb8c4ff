//! Sensitive areas and their geometry.

use std::f64::consts::TAU;

use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Species, Srid};

/// Vertices used to approximate a buffered point.
const BUFFER_SEGMENTS: u32 = 32;

/// Reference system circles are drawn in, so radii stay in metres whatever
/// system the record is stored in.
const BUFFER_SRID: Srid = Srid::Lambert93;

/// Default buffer radius, in metres, for point areas whose species carries
/// none.
pub const DEFAULT_BUFFER_RADIUS: u32 = 100;

/// Geometry of a sensitive area.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum AreaGeometry {
    /// Explicit zone outline.
    Polygon { polygons: MultiPolygon<f64> },
    /// Point surrounded by a circular buffer.
    ///
    /// `centre` is expressed in the record's reference system; `radius` is
    /// always in metres.
    BufferedPoint { centre: Point<f64>, radius: f64 },
}

impl AreaGeometry {
    /// Wrap a single polygon.
    pub fn polygon(polygon: Polygon<f64>) -> Self {
        Self::Polygon {
            polygons: MultiPolygon::new(vec![polygon]),
        }
    }

    /// Surface covered by the area in `srid`, the system the geometry is
    /// expressed in.
    ///
    /// Points are buffered in Lambert-93 and the circle is brought back into
    /// `srid`, so a geographic record still gets a metric radius.
    pub fn footprint(&self, srid: Srid) -> MultiPolygon<f64> {
        match self {
            Self::Polygon { polygons } => polygons.clone(),
            Self::BufferedPoint { centre, radius } => {
                let metric = srid.transform_coord(BUFFER_SRID, centre.0);
                let disc = BUFFER_SRID.transform(srid, &circle(metric, *radius));
                MultiPolygon::new(vec![disc])
            }
        }
    }

    /// Reproject from `from` into `to`.
    ///
    /// Buffered points are expanded in the source system first, so a metric
    /// radius keeps its meaning once expressed in degrees.
    #[must_use]
    pub fn reproject(&self, from: Srid, to: Srid) -> Self {
        if from == to {
            return self.clone();
        }
        Self::Polygon {
            polygons: from.transform(to, &self.footprint(from)),
        }
    }
}

fn circle(centre: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..BUFFER_SEGMENTS)
        .map(|step| {
            let angle = TAU * f64::from(step) / f64::from(BUFFER_SEGMENTS);
            Coord {
                x: centre.x + radius * angle.cos(),
                y: centre.y + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), Vec::new())
}

/// Soft-deletion state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Lifecycle {
    /// Visible to listings and views.
    #[default]
    Existing,
    /// Soft-deleted; kept in storage but hidden everywhere.
    Deleted,
}

/// A geofenced zone protecting a species, owned by a structure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensitiveArea {
    /// Store identifier; zero until inserted.
    pub id: u64,
    /// Protected species or regulation.
    pub species: Species,
    /// Zone outline or buffered point.
    pub geometry: AreaGeometry,
    /// Reference system `geometry` is expressed in.
    pub srid: Srid,
    /// Whether the public API exposes the area.
    pub published: bool,
    /// Owning structure.
    pub structure: u64,
    /// Soft-deletion state.
    pub lifecycle: Lifecycle,
    /// Free-form description shown to the public.
    pub description: String,
    /// Contact details of the managing body.
    pub contact: String,
}

impl SensitiveArea {
    /// Construct an existing, unpublished area.
    pub fn new(
        id: u64,
        species: Species,
        geometry: AreaGeometry,
        srid: Srid,
        structure: u64,
    ) -> Self {
        Self {
            id,
            species,
            geometry,
            srid,
            published: false,
            structure,
            lifecycle: Lifecycle::Existing,
            description: String::new(),
            contact: String::new(),
        }
    }

    /// Set the publication flag.
    #[must_use]
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Surface covered by the area in its own reference system.
    pub fn footprint(&self) -> MultiPolygon<f64> {
        self.geometry.footprint(self.srid)
    }

    /// Whether the record has not been soft-deleted.
    pub const fn is_existing(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Existing)
    }

    /// Whether the record is owned by `structure`.
    pub const fn belongs_to(&self, structure: u64) -> bool {
        self.structure == structure
    }

    /// Mark the record as deleted.
    pub const fn soft_delete(&mut self) {
        self.lifecycle = Lifecycle::Deleted;
    }

    /// Return the record with its geometry expressed in `target`.
    #[must_use]
    pub fn transformed(mut self, target: Srid) -> Self {
        self.geometry = self.geometry.reproject(self.srid, target);
        self.srid = target;
        self
    }
}
