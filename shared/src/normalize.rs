use std::num::NonZeroUsize;

use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;
use crate::model::{
    CatalogItem, CategorySets, ImageRefs, ItemId, ItemKind, RawList, RawRecord, RawScalar,
    SeatRange, YearRange, UNKNOWN_COUNTRY,
};
use crate::ConfigError;

/// Rewrites image references from either acquisition path into
/// display-ready absolute URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageResolver {
    base: Url,
}

impl ImageResolver {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Never fails: anything that cannot be turned into an http(s) or data
    /// URL resolves to an empty string.
    #[must_use]
    pub fn resolve(&self, source: Option<&str>) -> String {
        let Some(src) = source.map(str::trim).filter(|s| !s.is_empty()) else {
            return String::new();
        };

        if src.starts_with("data:image/") {
            return src.to_string();
        }

        if let Some(rest) = src.strip_prefix("//") {
            return Url::parse(&format!("https://{rest}"))
                .map(String::from)
                .unwrap_or_default();
        }

        match Url::parse(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url.into(),
            Ok(_) => String::new(),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base
                .join(src.trim_start_matches('/'))
                .map(String::from)
                .unwrap_or_default(),
            Err(_) => String::new(),
        }
    }
}

/// Converts raw records into [`CatalogItem`]s in fixed-size chunks.
#[derive(Clone, Debug)]
pub struct Normalizer {
    chunk_size: NonZeroUsize,
    images: ImageResolver,
}

impl Normalizer {
    pub fn new(chunk_size: NonZeroUsize, images: ImageResolver) -> Self {
        Self { chunk_size, images }
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.chunk_size(),
            ImageResolver::new(config.image_base()?),
        ))
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    pub fn images(&self) -> &ImageResolver {
        &self.images
    }

    #[instrument(skip_all, fields(records = raw.len(), chunk_size = self.chunk_size.get()))]
    pub fn normalize(&self, raw: &[RawRecord]) -> Vec<CatalogItem> {
        let mut out = Vec::with_capacity(raw.len());
        for (chunk_index, chunk) in raw.chunks(self.chunk_size.get()).enumerate() {
            self.normalize_chunk(chunk, chunk_index, &mut out);
        }
        debug!(items = out.len(), "normalized records");
        out
    }

    /// Same output as [`Normalizer::normalize`], yielding to the scheduler
    /// between chunks so large inputs never monopolize the thread.
    #[instrument(skip_all, fields(records = raw.len(), chunk_size = self.chunk_size.get()))]
    pub async fn normalize_cooperative(&self, raw: &[RawRecord]) -> Vec<CatalogItem> {
        let mut out = Vec::with_capacity(raw.len());
        for (chunk_index, chunk) in raw.chunks(self.chunk_size.get()).enumerate() {
            if chunk_index > 0 {
                tokio::task::yield_now().await;
            }
            self.normalize_chunk(chunk, chunk_index, &mut out);
        }
        out
    }

    fn normalize_chunk(&self, chunk: &[RawRecord], chunk_index: usize, out: &mut Vec<CatalogItem>) {
        let offset = chunk_index * self.chunk_size.get();
        out.extend(
            chunk
                .iter()
                .enumerate()
                .map(|(i, record)| normalize_record(record, offset + i, &self.images)),
        );
    }
}

/// Total projection of one record. `index` is the record's position in the
/// input and only feeds the fallback id.
#[must_use]
pub fn normalize_record(raw: &RawRecord, index: usize, images: &ImageResolver) -> CatalogItem {
    let kind = infer_kind(raw);
    let title = clean_text(raw.name.as_deref());

    let id = raw
        .id
        .as_ref()
        .and_then(scalar_text)
        .map_or_else(|| ItemId(format!("{kind}-{index}")), ItemId);

    let country = raw
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string();

    let low_res = images.resolve(raw.image_low_res.as_deref());

    CatalogItem {
        id,
        kind,
        title,
        brand: clean_text(raw.brand.as_deref()),
        country,
        categories: CategorySets {
            fuel_types: split_list(raw.fuel_types.as_ref()),
            body_types: split_list(raw.body_types.as_ref()),
            drive_types: split_list(raw.drive_types.as_ref()),
        },
        years: YearRange {
            min: parse_int(raw.year_min.as_ref()),
            max: parse_int(raw.year_max.as_ref()),
        },
        seats: SeatRange {
            min: parse_count(raw.seats_min.as_ref()),
            max: parse_count(raw.seats_max.as_ref()),
        },
        images: ImageRefs {
            primary: images.resolve(raw.image.as_deref()),
            low_res: (!low_res.is_empty()).then_some(low_res),
        },
    }
}

fn infer_kind(raw: &RawRecord) -> ItemKind {
    match raw.kind.as_deref().map(str::trim) {
        Some(k) if k.eq_ignore_ascii_case("model") => ItemKind::Model,
        Some(k) if k.eq_ignore_ascii_case("brand") => ItemKind::Brand,
        _ if raw.brand.as_deref().is_some_and(|b| !b.trim().is_empty()) => ItemKind::Model,
        _ => ItemKind::Brand,
    }
}

fn clean_text(s: Option<&str>) -> String {
    s.map(str::trim).unwrap_or_default().to_string()
}

fn scalar_text(value: &RawScalar) -> Option<String> {
    let text = match value {
        RawScalar::Int(i) => i.to_string(),
        RawScalar::Float(f) if f.is_finite() => f.to_string(),
        RawScalar::Text(s) => s.trim().to_string(),
        RawScalar::Float(_) | RawScalar::Bool(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Splits a delimiter-joined categorical field on `,`. Entries are trimmed,
/// empties dropped, source order kept.
#[must_use]
pub fn split_list(list: Option<&RawList>) -> Vec<String> {
    match list {
        None => Vec::new(),
        Some(RawList::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(RawList::Items(items)) => items
            .iter()
            .flatten()
            .filter_map(scalar_text)
            .collect(),
    }
}

/// Defensive integer parse: leading sign and digits of a string, truncated
/// floats, anything else (or out of range) is 0.
#[must_use]
pub fn parse_int(value: Option<&RawScalar>) -> i32 {
    match value {
        Some(RawScalar::Int(i)) => i32::try_from(*i).unwrap_or(0),
        #[allow(clippy::cast_possible_truncation)]
        Some(RawScalar::Float(f)) if f.is_finite() && f.abs() < f64::from(i32::MAX) => *f as i32,
        Some(RawScalar::Text(s)) => parse_leading_int(s),
        _ => 0,
    }
}

fn parse_count(value: Option<&RawScalar>) -> u32 {
    u32::try_from(parse_int(value)).unwrap_or(0)
}

fn parse_leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i32>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) => 0,
    }
}
