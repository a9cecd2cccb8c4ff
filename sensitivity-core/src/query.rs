//! Composable criteria for selecting sensitive areas.
//!
//! An [`AreaQuery`] describes *what* to select; stores decide *how*. The
//! in-memory evaluation in [`AreaQuery::apply`] is the reference semantics
//! every store must agree with.
//!
//! # Examples
//! ```
//! use sensitivity_core::{AreaQuery, PracticeFilter, Srid};
//!
//! let query = AreaQuery::existing()
//!     .published()
//!     .practices(PracticeFilter::parse("Climbing,Flying"))
//!     .transform(Srid::Wgs84);
//! assert!(query.requires_published());
//! assert_eq!(query.target_srid(), Some(Srid::Wgs84));
//! ```

use std::collections::BTreeSet;

use crate::{SensitiveArea, Species, Srid};

/// Practice names requested through a comma-separated parameter.
///
/// Matching uses OR semantics: a species matches when it carries at least one
/// of the names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PracticeFilter {
    names: BTreeSet<String>,
}

impl PracticeFilter {
    /// Split a raw `practices` parameter on commas.
    ///
    /// Items are kept verbatim, so an empty item only matches a practice with
    /// an empty name.
    pub fn parse(raw: &str) -> Self {
        Self {
            names: raw.split(',').map(str::to_owned).collect(),
        }
    }

    /// Build a filter from explicit names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Requested names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether `species` carries any requested practice.
    pub fn matches(&self, species: &Species) -> bool {
        species.has_any_practice(self.names())
    }
}

/// Selection criteria for sensitive areas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AreaQuery {
    include_deleted: bool,
    published_only: bool,
    practices: Option<PracticeFilter>,
    srid: Option<Srid>,
}

impl AreaQuery {
    /// Every record, deleted ones included.
    pub fn all() -> Self {
        Self {
            include_deleted: true,
            ..Self::default()
        }
    }

    /// Records that have not been soft-deleted.
    pub fn existing() -> Self {
        Self::default()
    }

    /// Restrict to published records.
    #[must_use]
    pub const fn published(mut self) -> Self {
        self.published_only = true;
        self
    }

    /// Restrict to records whose species carries one of the practices.
    #[must_use]
    pub fn practices(mut self, filter: PracticeFilter) -> Self {
        self.practices = Some(filter);
        self
    }

    /// Apply an optional practice filter, as read from a query string.
    #[must_use]
    pub fn maybe_practices(self, filter: Option<PracticeFilter>) -> Self {
        match filter {
            Some(filter) => self.practices(filter),
            None => self,
        }
    }

    /// Return geometries reprojected into `srid`.
    #[must_use]
    pub const fn transform(mut self, srid: Srid) -> Self {
        self.srid = Some(srid);
        self
    }

    /// The same criteria without the transform.
    #[must_use]
    pub fn untransformed(&self) -> Self {
        Self {
            srid: None,
            ..self.clone()
        }
    }

    /// Whether deleted records are excluded.
    pub const fn requires_existing(&self) -> bool {
        !self.include_deleted
    }

    /// Whether unpublished records are excluded.
    pub const fn requires_published(&self) -> bool {
        self.published_only
    }

    /// Practice filter, when one was requested.
    pub const fn practice_filter(&self) -> Option<&PracticeFilter> {
        self.practices.as_ref()
    }

    /// Reference system results are returned in, when a transform was
    /// requested.
    pub const fn target_srid(&self) -> Option<Srid> {
        self.srid
    }

    /// Whether `area` satisfies the filtering criteria.
    pub fn matches(&self, area: &SensitiveArea) -> bool {
        if self.requires_existing() && !area.is_existing() {
            return false;
        }
        if self.published_only && !area.published {
            return false;
        }
        self.practices
            .as_ref()
            .is_none_or(|filter| filter.matches(&area.species))
    }

    /// Finish a selection: reproject when asked and order by identifier.
    pub fn finish<I>(&self, areas: I) -> Vec<SensitiveArea>
    where
        I: IntoIterator<Item = SensitiveArea>,
    {
        let mut selected: Vec<_> = match self.srid {
            Some(srid) => areas
                .into_iter()
                .map(|area| area.transformed(srid))
                .collect(),
            None => areas.into_iter().collect(),
        };
        selected.sort_unstable_by_key(|area| area.id);
        selected
    }

    /// Evaluate the query against an in-memory collection.
    pub fn apply<I>(&self, areas: I) -> Vec<SensitiveArea>
    where
        I: IntoIterator<Item = SensitiveArea>,
    {
        self.finish(areas.into_iter().filter(|area| self.matches(area)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AreaGeometry, Practice, SpeciesCategory};
    use geo::polygon;
    use rstest::{fixture, rstest};

    fn area(id: u64, published: bool, practices: &[&str]) -> SensitiveArea {
        let species = Species::new(id, format!("species-{id}"), SpeciesCategory::Species)
            .with_practices(
                practices
                    .iter()
                    .zip(1_u64..)
                    .map(|(name, pid)| Practice::new(pid, *name)),
            );
        SensitiveArea::new(
            id,
            species,
            AreaGeometry::polygon(polygon![
                (x: 700_000.0, y: 6_600_000.0),
                (x: 700_100.0, y: 6_600_000.0),
                (x: 700_100.0, y: 6_600_100.0)
            ]),
            Srid::Lambert93,
            1,
        )
        .with_published(published)
    }

    #[fixture]
    fn areas() -> Vec<SensitiveArea> {
        let mut deleted = area(4, true, &["Climbing"]);
        deleted.soft_delete();
        vec![
            area(1, true, &["Climbing"]),
            area(2, true, &["Flying", "Hiking"]),
            area(3, false, &["Climbing"]),
            deleted,
            area(5, true, &[]),
        ]
    }

    fn ids(areas: &[SensitiveArea]) -> Vec<u64> {
        areas.iter().map(|area| area.id).collect()
    }

    #[rstest]
    fn existing_hides_deleted(areas: Vec<SensitiveArea>) {
        assert_eq!(ids(&AreaQuery::existing().apply(areas)), vec![1, 2, 3, 5]);
    }

    #[rstest]
    fn all_keeps_deleted(areas: Vec<SensitiveArea>) {
        assert_eq!(ids(&AreaQuery::all().apply(areas)), vec![1, 2, 3, 4, 5]);
    }

    #[rstest]
    fn published_hides_drafts(areas: Vec<SensitiveArea>) {
        assert_eq!(
            ids(&AreaQuery::existing().published().apply(areas)),
            vec![1, 2, 5]
        );
    }

    #[rstest]
    #[case("Climbing", vec![1])]
    #[case("Hiking", vec![2])]
    #[case("Climbing,Hiking", vec![1, 2])]
    #[case("Swimming", vec![])]
    #[case("", vec![])]
    fn practices_use_or_semantics(
        areas: Vec<SensitiveArea>,
        #[case] raw: &str,
        #[case] expected: Vec<u64>,
    ) {
        let query = AreaQuery::existing()
            .published()
            .practices(PracticeFilter::parse(raw));
        assert_eq!(ids(&query.apply(areas)), expected);
    }

    #[rstest]
    fn transform_reprojects_results(areas: Vec<SensitiveArea>) {
        let selected = AreaQuery::existing()
            .published()
            .transform(Srid::Wgs84)
            .apply(areas);
        assert!(selected.iter().all(|area| area.srid == Srid::Wgs84));
    }

    #[test]
    fn parse_keeps_items_verbatim() {
        let filter = PracticeFilter::parse("b,a,,a");
        assert_eq!(filter.names().collect::<Vec<_>>(), vec!["", "a", "b"]);
    }
}
