use std::borrow::Cow;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::collate::{eq_ignore_case, fold, CollationKey};
use crate::model::{CatalogItem, YearRange};

/// Categorical value that means "no restriction".
pub const ALL_SENTINEL: &str = "all";

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterQuery {
    pub text: Option<String>,
    pub fuel_type: Option<String>,
    pub body_type: Option<String>,
    pub seat_count: Option<u32>,
    /// Inclusive `[min, max]`; reversed bounds are swapped.
    pub year_range: Option<(i32, i32)>,
}

impl FilterQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// True when at least one predicate restricts the result.
    pub fn is_active(&self) -> bool {
        self.compile().is_some()
    }

    fn compile(&self) -> Option<Predicates> {
        let predicates = Predicates {
            text: self
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(fold),
            fuel_type: active_category(self.fuel_type.as_deref()),
            body_type: active_category(self.body_type.as_deref()),
            seat_count: self.seat_count,
            years: self
                .year_range
                .map(|(a, b)| if a <= b { (a, b) } else { (b, a) }),
        };
        (!predicates.is_empty()).then_some(predicates)
    }
}

fn active_category(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL_SENTINEL))
        .map(str::to_string)
}

struct Predicates {
    text: Option<String>,
    fuel_type: Option<String>,
    body_type: Option<String>,
    seat_count: Option<u32>,
    years: Option<(i32, i32)>,
}

impl Predicates {
    fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.fuel_type.is_none()
            && self.body_type.is_none()
            && self.seat_count.is_none()
            && self.years.is_none()
    }

    fn matches(&self, item: &CatalogItem) -> bool {
        if let Some(text) = &self.text {
            if !fold(&item.title).contains(text.as_str()) {
                return false;
            }
        }
        if let Some((min, max)) = self.years {
            if !item.years.overlaps(min, max) {
                return false;
            }
        }
        if let Some(fuel) = &self.fuel_type {
            if !item.categories.fuel_types.iter().any(|f| eq_ignore_case(f, fuel)) {
                return false;
            }
        }
        if let Some(body) = &self.body_type {
            if !item.categories.body_types.iter().any(|b| eq_ignore_case(b, body)) {
                return false;
            }
        }
        if let Some(seats) = self.seat_count {
            if !item.seats.contains(seats) {
                return false;
            }
        }
        true
    }
}

/// Applies every active predicate (ANDed, case-insensitive).
///
/// With no active predicate the input slice itself is returned, borrowed,
/// without scanning it.
pub fn filter<'a>(records: &'a [CatalogItem], query: &FilterQuery) -> Cow<'a, [CatalogItem]> {
    match query.compile() {
        None => Cow::Borrowed(records),
        Some(p) => Cow::Owned(records.iter().filter(|item| p.matches(item)).cloned().collect()),
    }
}

/// Chunked variant of [`filter`]; output is identical for any chunk size.
pub fn filter_chunked<'a>(
    records: &'a [CatalogItem],
    query: &FilterQuery,
    chunk_size: NonZeroUsize,
) -> Cow<'a, [CatalogItem]> {
    let Some(p) = query.compile() else {
        return Cow::Borrowed(records);
    };

    let mut out = Vec::new();
    for chunk in records.chunks(chunk_size.get()) {
        out.extend(chunk.iter().filter(|item| p.matches(item)).cloned());
    }
    Cow::Owned(out)
}

/// Same output as [`filter_chunked`], yielding to the scheduler between
/// chunks. An inactive query still returns the input borrowed, unscanned.
pub async fn filter_cooperative<'a>(
    records: &'a [CatalogItem],
    query: &FilterQuery,
    chunk_size: NonZeroUsize,
) -> Cow<'a, [CatalogItem]> {
    let Some(p) = query.compile() else {
        return Cow::Borrowed(records);
    };

    let mut out = Vec::new();
    for (i, chunk) in records.chunks(chunk_size.get()).enumerate() {
        if i > 0 {
            tokio::task::yield_now().await;
        }
        out.extend(chunk.iter().filter(|item| p.matches(item)).cloned());
    }
    Cow::Owned(out)
}

pub fn matches(item: &CatalogItem, query: &FilterQuery) -> bool {
    query.compile().map_or(true, |p| p.matches(item))
}

/// Why an empty result is empty. Neither case is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    /// Nothing to show and nothing filtered: the source itself is empty.
    NoData,
    /// Search or a filter is active and nothing matched.
    NoMatches,
}

#[must_use]
pub fn classify_empty(result_len: usize, query: &FilterQuery) -> Option<EmptyState> {
    match (result_len, query.is_active()) {
        (0, true) => Some(EmptyState::NoMatches),
        (0, false) => Some(EmptyState::NoData),
        _ => None,
    }
}

/// Choices for the filter controls, derived from the unfiltered set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFacets {
    pub fuel_types: Vec<String>,
    pub body_types: Vec<String>,
    pub years: Option<YearRange>,
    pub max_seats: u32,
}

impl FilterFacets {
    pub fn from_items(items: &[CatalogItem]) -> Self {
        let years = items
            .iter()
            .map(|i| i.years)
            .filter(|y| y.min != 0 || y.max != 0)
            .fold(None, |acc: Option<YearRange>, y| {
                let lo = if y.min == 0 { y.max } else { y.min };
                let hi = y.max.max(y.min);
                Some(match acc {
                    None => YearRange::new(lo, hi),
                    Some(a) => YearRange::new(a.min.min(lo), a.max.max(hi)),
                })
            });

        Self {
            fuel_types: distinct(items.iter().flat_map(|i| &i.categories.fuel_types)),
            body_types: distinct(items.iter().flat_map(|i| &i.categories.body_types)),
            years,
            max_seats: items.iter().map(|i| i.seats.max).max().unwrap_or(0),
        }
    }
}

/// Case-insensitive dedupe keeping the first spelling, in collation order.
fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<String> = values
        .filter(|v| seen.insert(fold(v)))
        .cloned()
        .collect();
    out.sort_by_cached_key(|v| CollationKey::new(v));
    out
}
