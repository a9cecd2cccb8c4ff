//! Species, practices and the category that selects a form variant.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Activity tag attached to a species, e.g. `"Pedestrian"` or `"Climbing"`.
///
/// Public listings filter areas by practice name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Practice {
    pub id: u64,
    pub name: String,
}

impl Practice {
    /// Construct a practice.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Category of a [`Species`].
///
/// Regulatory species describe regulation zones rather than habitats and are
/// edited through a form carrying regulation metadata.
///
/// # Examples
/// ```
/// use sensitivity_core::SpeciesCategory;
///
/// assert_eq!(SpeciesCategory::Regulatory.id(), 2);
/// assert_eq!("2".parse::<SpeciesCategory>(), Ok(SpeciesCategory::Regulatory));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpeciesCategory {
    /// Wildlife species with a habitat.
    #[default]
    Species,
    /// Regulation zone.
    Regulatory,
}

/// Error returned when a category identifier is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown species category '{0}'")]
pub struct UnknownCategory(pub String);

impl SpeciesCategory {
    /// Stable numeric identifier, also used as the `category` query value.
    pub const fn id(self) -> u8 {
        match self {
            Self::Species => 1,
            Self::Regulatory => 2,
        }
    }

    /// Resolve a category from its numeric identifier.
    pub fn from_id(id: i64) -> Result<Self, UnknownCategory> {
        match id {
            1 => Ok(Self::Species),
            2 => Ok(Self::Regulatory),
            other => Err(UnknownCategory(other.to_string())),
        }
    }

    /// Lowercase label used in serialised payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Regulatory => "regulatory",
        }
    }
}

impl fmt::Display for SpeciesCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeciesCategory {
    type Err = UnknownCategory;

    /// Parse the numeric identifier exactly as it appears in a query string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::Species),
            "2" => Ok(Self::Regulatory),
            other => Err(UnknownCategory(other.to_owned())),
        }
    }
}

/// Months of the year during which a species is sensitive.
///
/// Stored as a 12-bit mask, January in the lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Period(u16);

impl Period {
    const ALL: u16 = 0x0fff;

    /// Period covering every month.
    pub const fn all_year() -> Self {
        Self(Self::ALL)
    }

    /// Build a period from its raw bit mask, ignoring bits beyond December.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL)
    }

    /// Build a period from twelve monthly flags.
    pub fn from_months(months: [bool; 12]) -> Self {
        let bits = months
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0_u16, |acc, (idx, _)| acc | (1 << idx));
        Self(bits)
    }

    /// Raw bit mask.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether `month` (1-based) is part of the period.
    pub const fn contains(self, month: u8) -> bool {
        month >= 1 && month <= 12 && self.0 & (1 << (month - 1)) != 0
    }

    /// Monthly flags, January first.
    pub fn months(self) -> [bool; 12] {
        let mut months = [false; 12];
        for (idx, slot) in months.iter_mut().enumerate() {
            *slot = self.0 & (1 << idx) != 0;
        }
        months
    }
}

/// A species (or regulation) that sensitive areas protect.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Species {
    pub id: u64,
    pub name: String,
    pub category: SpeciesCategory,
    pub practices: BTreeSet<Practice>,
    pub period: Period,
    /// Information page for the public.
    pub url: Option<String>,
    /// Buffer radius in metres applied to point areas.
    pub radius: Option<u32>,
}

impl Species {
    /// Construct a species with no practices, an all-year period and no
    /// optional metadata.
    pub fn new(id: u64, name: impl Into<String>, category: SpeciesCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            practices: BTreeSet::new(),
            period: Period::all_year(),
            url: None,
            radius: None,
        }
    }

    /// Attach practices, replacing any existing ones.
    #[must_use]
    pub fn with_practices<I>(mut self, practices: I) -> Self
    where
        I: IntoIterator<Item = Practice>,
    {
        self.practices = practices.into_iter().collect();
        self
    }

    /// Whether this species describes a regulation zone.
    pub const fn is_regulatory(&self) -> bool {
        matches!(self.category, SpeciesCategory::Regulatory)
    }

    /// Whether any practice of this species carries one of `names`.
    pub fn has_any_practice<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .any(|name| self.practices.iter().any(|practice| practice.name == name))
    }

    /// Practice names in stable order.
    pub fn practice_names(&self) -> Vec<&str> {
        self.practices.iter().map(|p| p.name.as_str()).collect()
    }
}
