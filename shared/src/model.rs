use serde::{Deserialize, Serialize};
use std::fmt;

/// Country label used whenever a record does not name one.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ItemId);
typed_id!(Route);
typed_id!(SessionId);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

// --- Raw records (external contract, read-only) ---

/// Scalar as it arrives from either acquisition path: the query service
/// sends numbers, the snapshot generator sometimes stringifies them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Categorical field: usually a comma-joined string, occasionally an array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawList {
    Joined(String),
    Items(Vec<Option<RawScalar>>),
}

/// One vehicle brand or model record exactly as produced upstream.
///
/// Every field is optional; the normalizer owns all defaulting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub id: Option<RawScalar>,
    /// `"brand"` or `"model"`; inferred from `brand` when absent.
    pub kind: Option<String>,
    #[serde(alias = "title", alias = "brandName", alias = "modelName")]
    pub name: Option<String>,
    /// Owning brand name, models only.
    pub brand: Option<String>,
    pub country: Option<String>,
    #[serde(alias = "fuelType")]
    pub fuel_types: Option<RawList>,
    #[serde(alias = "bodyType", alias = "chassisTypes", alias = "chassisType")]
    pub body_types: Option<RawList>,
    #[serde(alias = "driveType", alias = "drivetrainTypes", alias = "drivetrainType")]
    pub drive_types: Option<RawList>,
    #[serde(alias = "yearFrom", alias = "startYear", alias = "minYear")]
    pub year_min: Option<RawScalar>,
    #[serde(alias = "yearTo", alias = "endYear", alias = "maxYear")]
    pub year_max: Option<RawScalar>,
    #[serde(alias = "minSeats")]
    pub seats_min: Option<RawScalar>,
    #[serde(alias = "maxSeats")]
    pub seats_max: Option<RawScalar>,
    #[serde(alias = "imageUrl", alias = "logo", alias = "logoUrl")]
    pub image: Option<String>,
    #[serde(alias = "imageLowRes", alias = "thumbnail", alias = "placeholder")]
    pub image_low_res: Option<String>,
}

// --- Normalized view model ---

#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Brand,
    Model,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySets {
    pub fuel_types: Vec<String>,
    pub body_types: Vec<String>,
    pub drive_types: Vec<String>,
}

/// Production years; 0 marks an unknown bound.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Upper bound used for overlap tests. A known start with no end year
    /// is a model still in production.
    #[must_use]
    pub const fn effective_max(self) -> i32 {
        if self.max == 0 && self.min != 0 {
            i32::MAX
        } else {
            self.max
        }
    }

    #[must_use]
    pub const fn overlaps(self, min: i32, max: i32) -> bool {
        self.effective_max() >= min && self.min <= max
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeatRange {
    pub min: u32,
    pub max: u32,
}

impl SeatRange {
    #[must_use]
    pub const fn contains(self, seats: u32) -> bool {
        self.min <= seats && seats <= self.max
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRefs {
    /// Display-ready URL, empty when the record has no usable image.
    pub primary: String,
    pub low_res: Option<String>,
}

/// Normalized, total projection of a [`RawRecord`].
///
/// No field is ever missing: absent source values become empty strings,
/// zeroes, or [`UNKNOWN_COUNTRY`], so filtering and sorting never deal with
/// absence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    /// Owning brand for models, empty for brands.
    pub brand: String,
    pub country: String,
    pub categories: CategorySets,
    pub years: YearRange,
    pub seats: SeatRange,
    pub images: ImageRefs,
}

impl CatalogItem {
    pub fn has_image(&self) -> bool {
        !self.images.primary.is_empty()
    }
}
