//! Presentation views and the public API over sensitive areas.
//!
//! Both layers are plain functions over the storage traits of
//! `sensitivity-core`. Views return a [`ViewOutcome`] describing what to
//! render or where to redirect; the API returns GeoJSON
//! [`FeatureCollection`]s and errors carrying an HTTP status.
//!
//! ```
//! use sensitivity_core::{Actor, Srid};
//! use sensitivity_core::test_support::MemoryStore;
//! use sensitivity_web::{Method, list_sensitive_areas};
//!
//! let store = MemoryStore::new(Srid::Lambert93);
//! let areas = list_sensitive_areas(&store, &Actor::Anonymous, Method::Get, None, Srid::Wgs84)
//!     .expect("anonymous read");
//! assert!(areas.features.is_empty());
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod forms;
pub mod geojson;
pub mod guard;
pub mod views;

pub use api::{
    ApiError, Method, UnknownMethod, check_permission, list_sensitive_areas,
    list_trek_sensitive_areas,
};
pub use forms::{AreaForm, CATEGORY_PARAM, FormData, FormErrors, FormKind};
pub use geojson::{Feature, FeatureCollection, GeoJsonError};
pub use guard::{ACCESS_DENIED, Decision, same_structure_required};
pub use views::{
    AreaDetail, AreaRow, Export, ExportFormat, ListFilter, Route, UnknownFormat, ViewError,
    ViewOutcome, create, delete, detail, format_list, layer, list, update,
};
