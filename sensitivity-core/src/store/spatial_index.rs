//! R\*-tree over sensitive area footprints.
//!
//! The tree holds bounding rectangles only; candidates are confirmed against
//! the exact footprint before being returned.

use geo::{Intersects, LineString, MultiPolygon, Rect};
use rstar::{
    AABB, RTree,
    primitives::{GeomWithData, Rectangle},
};

use crate::{SensitiveArea, Srid};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Spatial index over a set of sensitive areas.
///
/// Footprints are reprojected into a single reference system when the index
/// is built, so queries are expressed in that system regardless of how each
/// area is stored.
pub struct AreaIndex {
    areas: Vec<SensitiveArea>,
    footprints: Vec<MultiPolygon<f64>>,
    tree: RTree<Entry>,
    srid: Srid,
}

impl std::fmt::Debug for AreaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaIndex")
            .field("entries", &self.tree.size())
            .field("srid", &self.srid)
            .finish_non_exhaustive()
    }
}

impl AreaIndex {
    /// Index `areas`, expressing footprints in `srid`.
    pub fn new(areas: Vec<SensitiveArea>, srid: Srid) -> Self {
        let footprints: Vec<MultiPolygon<f64>> = areas
            .iter()
            .map(|area| area.srid.transform(srid, &area.footprint()))
            .collect();
        let entries = footprints
            .iter()
            .enumerate()
            .filter_map(|(position, footprint)| {
                geo::BoundingRect::bounding_rect(footprint).map(|rect| {
                    GeomWithData::new(
                        Rectangle::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                        position,
                    )
                })
            })
            .collect();
        Self {
            areas,
            footprints,
            tree: RTree::bulk_load(entries),
            srid,
        }
    }

    /// Reference system queries are expressed in.
    pub const fn srid(&self) -> Srid {
        self.srid
    }

    /// Number of indexed areas.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    fn candidates(&self, rect: Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
    }

    fn collect_hits<G>(&self, rect: Rect<f64>, geometry: &G) -> Vec<SensitiveArea>
    where
        MultiPolygon<f64>: Intersects<G>,
    {
        let mut positions: Vec<usize> = self
            .candidates(rect)
            .filter(|position| {
                self.footprints
                    .get(*position)
                    .is_some_and(|footprint| footprint.intersects(geometry))
            })
            .collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .filter_map(|position| self.areas.get(position).cloned())
            .collect()
    }

    /// Areas whose footprint intersects `path`.
    pub fn intersecting(&self, path: &LineString<f64>) -> Vec<SensitiveArea> {
        match geo::BoundingRect::bounding_rect(path) {
            Some(rect) => self.collect_hits(rect, path),
            None => Vec::new(),
        }
    }

    /// Areas whose footprint intersects `bbox`; boundaries count as inside.
    pub fn within_bbox(&self, bbox: &Rect<f64>) -> Vec<SensitiveArea> {
        self.collect_hits(*bbox, bbox)
    }
}
