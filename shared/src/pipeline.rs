//! Normalize → filter → sort/group → paginate, owned by one session.
//!
//! Derived stages are keyed on the source revision they were computed from.
//! Any change upstream (new records, new query, new ordering) drops the
//! derived results and recomputes them; nothing is patched in place.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::{
    classify_empty, filter_chunked, filter_cooperative, EmptyState, FilterFacets, FilterQuery,
};
use crate::group::{
    sort_and_group, sort_and_group_cooperative, take_prefix, total_len, Group, OrderBy,
};
use crate::model::{CatalogItem, RawRecord};
use crate::normalize::Normalizer;
use crate::paginate::{AdvanceTicket, PageMode, Paginator};
use crate::source::{SourceSnapshot, Strategy};
use crate::SourceError;

/// Everything the rendering surface needs, in one value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadModel {
    /// `None` until a session is mounted.
    pub strategy: Option<Strategy>,
    /// Visible prefix of the result, sectioned when grouping is on.
    pub groups: Vec<Group>,
    pub is_grouped: bool,
    pub is_loading: bool,
    pub error: Option<SourceError>,
    pub visible_page: usize,
    pub visible_count: usize,
    pub total: usize,
    pub has_more: bool,
    pub is_advancing: bool,
    pub is_paged: bool,
    pub empty_state: Option<EmptyState>,
    pub facets: FilterFacets,
}

impl ReadModel {
    pub fn visible_items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }
}

#[derive(Debug, Clone)]
struct Normalized {
    revision: u64,
    items: Arc<[CatalogItem]>,
    facets: FilterFacets,
}

#[derive(Debug, Clone)]
pub struct PipelineState {
    normalizer: Normalizer,
    query: FilterQuery,
    order: OrderBy,
    grouped: bool,
    normalized: Option<Normalized>,
    groups: Option<Arc<[Group]>>,
    paginator: Paginator,
}

impl PipelineState {
    pub fn new(normalizer: Normalizer, mode: PageMode) -> Self {
        Self {
            normalizer,
            query: FilterQuery::default(),
            order: OrderBy::default(),
            grouped: true,
            normalized: None,
            groups: None,
            paginator: Paginator::new(mode),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    pub fn order(&self) -> (OrderBy, bool) {
        (self.order, self.grouped)
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Returns true if the query changed. A change resets paging so old page
    /// boundaries never apply to the new result.
    pub fn set_query(&mut self, query: FilterQuery) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query;
        self.invalidate_groups();
        true
    }

    pub fn set_order(&mut self, order: OrderBy, grouped: bool) -> bool {
        if self.order == order && self.grouped == grouped {
            return false;
        }
        self.order = order;
        self.grouped = grouped;
        self.invalidate_groups();
        true
    }

    fn invalidate_groups(&mut self) {
        self.groups = None;
        self.paginator.reset();
    }

    pub fn reset(&mut self) {
        self.paginator.reset();
    }

    /// True when `revision` is newer than what has been normalized.
    pub fn is_stale(&self, revision: u64) -> bool {
        self.normalized.as_ref().map_or(true, |n| revision > n.revision)
    }

    /// Installs items normalized elsewhere (e.g. cooperatively) for
    /// `revision`. Returns false, leaving the pipeline untouched, when a
    /// revision at least as new is already installed.
    pub fn install(&mut self, revision: u64, items: Vec<CatalogItem>) -> bool {
        if !self.is_stale(revision) {
            debug!(revision, "ignored items for an older revision");
            return false;
        }
        let facets = FilterFacets::from_items(&items);
        self.normalized = Some(Normalized {
            revision,
            items: Arc::from(items),
            facets,
        });
        self.groups = None;
        true
    }

    /// Brings every derived stage up to date with `revision`.
    pub fn refresh(&mut self, revision: u64, raw: &[RawRecord]) {
        if self.is_stale(revision) {
            let items = self.normalizer.normalize(raw);
            self.install(revision, items);
        }
        self.groups();
    }

    /// [`PipelineState::refresh`] for async callers: every stage yields to
    /// the scheduler between chunks.
    pub async fn refresh_cooperative(&mut self, revision: u64, raw: &[RawRecord]) {
        if self.is_stale(revision) {
            let items = self.normalizer.normalize_cooperative(raw).await;
            self.install(revision, items);
        }
        if self.groups.is_some() {
            return;
        }
        let items = self.items();
        let chunk = self.normalizer.chunk_size();
        let filtered = filter_cooperative(&items, &self.query, chunk).await;
        let groups = sort_and_group_cooperative(&filtered, self.order, self.grouped, chunk).await;
        self.store_groups(items.len(), filtered.len(), groups);
    }

    fn items(&self) -> Arc<[CatalogItem]> {
        self.normalized
            .as_ref()
            .map_or_else(|| Arc::from(Vec::new()), |n| Arc::clone(&n.items))
    }

    fn groups(&mut self) -> Arc<[Group]> {
        if let Some(groups) = &self.groups {
            return Arc::clone(groups);
        }
        let items = self.items();
        let filtered = filter_chunked(&items, &self.query, self.normalizer.chunk_size());
        let groups = sort_and_group(&filtered, self.order, self.grouped);
        self.store_groups(items.len(), filtered.len(), groups)
    }

    fn store_groups(&mut self, items: usize, matched: usize, groups: Vec<Group>) -> Arc<[Group]> {
        let groups: Arc<[Group]> = Arc::from(groups);
        debug!(items, matched, groups = groups.len(), "recomputed result groups");
        self.groups = Some(Arc::clone(&groups));
        groups
    }

    pub fn total(&mut self) -> usize {
        total_len(&self.groups())
    }

    pub fn begin_advance(&mut self) -> Option<AdvanceTicket> {
        let total = self.total();
        self.paginator.begin_advance(total)
    }

    pub fn finish_advance(&mut self, ticket: AdvanceTicket) -> bool {
        self.paginator.finish_advance(ticket)
    }

    /// Read model over `source`. The caller must have brought the pipeline
    /// up to date with `source.revision` first.
    pub fn read_model(&mut self, source: &SourceSnapshot) -> ReadModel {
        let groups = self.groups();
        let total = total_len(&groups);
        let visible_count = self.paginator.visible_len(total);
        let empty_state = if source.is_loading || source.error.is_some() {
            None
        } else {
            classify_empty(total, &self.query)
        };

        ReadModel {
            strategy: Some(source.strategy),
            groups: take_prefix(&groups, visible_count),
            is_grouped: self.grouped,
            is_loading: source.is_loading,
            error: source.error.clone(),
            visible_page: self.paginator.current_page(),
            visible_count,
            total,
            has_more: self.paginator.has_more(total),
            is_advancing: self.paginator.is_advancing(),
            is_paged: matches!(self.paginator.mode(), PageMode::Paged { .. }),
            empty_state,
            facets: self
                .normalized
                .as_ref()
                .map(|n| n.facets.clone())
                .unwrap_or_default(),
        }
    }
}
