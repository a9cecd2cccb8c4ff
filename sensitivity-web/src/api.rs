//! Public API listings of sensitive areas.
//!
//! Safe methods are open to everyone. Other methods require the model
//! permission they map to, so anonymous callers are asked to authenticate
//! while authenticated callers without the permission are refused.

use std::str::FromStr;

use log::debug;
use thiserror::Error;

use sensitivity_core::{
    Actor, AreaQuery, AreaStore, Permission, PracticeFilter, Srid, StoreError, TrekStore,
};

use crate::geojson::{FeatureCollection, GeoJsonError, api_properties, feature_collection};

/// HTTP methods the API distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Read headers only.
    Head,
    /// Describe the allowed methods.
    Options,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Partially update a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

/// Error returned for an unrecognised method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method {0:?}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownMethod(raw.to_owned())),
        }
    }
}

impl Method {
    /// Whether the method only reads.
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }

    /// Model permission an unsafe method requires.
    pub const fn required_permission(self) -> Option<Permission> {
        match self {
            Self::Get | Self::Head | Self::Options => None,
            Self::Post => Some(Permission::Add),
            Self::Put | Self::Patch => Some(Permission::Change),
            Self::Delete => Some(Permission::Delete),
        }
    }
}

/// Errors returned by the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The trek is missing, deleted or not public.
    #[error("not found")]
    NotFound,
    /// Authentication is required.
    #[error("authentication required")]
    Unauthorized,
    /// The caller lacks the required permission.
    #[error("permission {0:?} required")]
    Forbidden(Permission),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A geometry could not be written as GeoJSON.
    #[error(transparent)]
    Encode(#[from] GeoJsonError),
}

impl ApiError {
    /// HTTP status code of the error.
    pub const fn status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::Store(_) | Self::Encode(_) => 500,
        }
    }
}

/// Model permissions, with anonymous read-only access.
pub fn check_permission(actor: &Actor, method: Method) -> Result<(), ApiError> {
    let Some(permission) = method.required_permission() else {
        return Ok(());
    };
    if actor.has_permission(permission) {
        Ok(())
    } else if actor.is_authenticated() {
        Err(ApiError::Forbidden(permission))
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Existing, published areas in `api_srid`.
///
/// `practices` is the raw comma-separated filter; absent means no filter.
pub fn list_sensitive_areas<S>(
    store: &S,
    actor: &Actor,
    method: Method,
    practices: Option<&str>,
    api_srid: Srid,
) -> Result<FeatureCollection, ApiError>
where
    S: AreaStore + ?Sized,
{
    check_permission(actor, method)?;
    let query = AreaQuery::existing()
        .published()
        .maybe_practices(practices.map(PracticeFilter::parse))
        .transform(api_srid);
    let areas = store.select(&query)?;
    debug!("listing {} sensitive areas", areas.len());
    Ok(feature_collection(&areas, api_properties)?)
}

/// Existing, published areas intersecting the path of a public trek.
///
/// A trek that is missing, deleted or unpublished yields
/// [`ApiError::NotFound`] alike.
pub fn list_trek_sensitive_areas<S>(
    store: &S,
    actor: &Actor,
    method: Method,
    trek_id: u64,
    api_srid: Srid,
) -> Result<FeatureCollection, ApiError>
where
    S: AreaStore + TrekStore + ?Sized,
{
    check_permission(actor, method)?;
    let trek = store
        .existing_trek(trek_id)?
        .filter(|trek| trek.is_public())
        .ok_or(ApiError::NotFound)?;
    let query = AreaQuery::existing().published().transform(api_srid);
    let areas = store.intersecting(&trek.path, trek.srid, &query)?;
    debug!("trek {trek_id} crosses {} sensitive areas", areas.len());
    Ok(feature_collection(&areas, api_properties)?)
}
