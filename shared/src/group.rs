use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::collate::CollationKey;
use crate::model::{CatalogItem, UNKNOWN_COUNTRY};

/// Label for titles that do not start with a letter or digit.
pub const MISC_LABEL: &str = "#";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Name,
    Country,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
    pub items: Vec<CatalogItem>,
}

impl Group {
    pub fn implicit(items: Vec<CatalogItem>) -> Self {
        Self {
            label: String::new(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn group_label(item: &CatalogItem, order: OrderBy) -> String {
    match order {
        OrderBy::Name => item
            .title
            .chars()
            .next()
            .filter(|c| c.is_alphanumeric())
            .map_or_else(|| MISC_LABEL.to_string(), |c| c.to_uppercase().collect()),
        OrderBy::Country => {
            let country = item.country.trim();
            if country.is_empty() {
                UNKNOWN_COUNTRY.to_string()
            } else {
                country.to_string()
            }
        }
    }
}

type Keyed<'a> = (CollationKey, CollationKey, &'a CatalogItem, String);

fn keyed(item: &CatalogItem, order: OrderBy) -> Keyed<'_> {
    let label = group_label(item, order);
    (
        CollationKey::new(&label),
        CollationKey::new(&item.title),
        item,
        label,
    )
}

/// Orders `records` by `order` and, when `grouped`, partitions them into
/// labeled sections. Ungrouped output is a single group with an empty label.
///
/// Items sort by title within a section, with the id as the last tiebreak
/// so identical input always yields identical output.
pub fn sort_and_group(records: &[CatalogItem], order: OrderBy, grouped: bool) -> Vec<Group> {
    let keys = records.iter().map(|item| keyed(item, order)).collect();
    arrange(keys, order, grouped)
}

/// Same output as [`sort_and_group`]. Collation keys are built `chunk_size`
/// records at a time, yielding to the scheduler between chunks and again
/// before the sort.
pub async fn sort_and_group_cooperative(
    records: &[CatalogItem],
    order: OrderBy,
    grouped: bool,
    chunk_size: NonZeroUsize,
) -> Vec<Group> {
    let mut keys = Vec::with_capacity(records.len());
    for chunk in records.chunks(chunk_size.get()) {
        keys.extend(chunk.iter().map(|item| keyed(item, order)));
        tokio::task::yield_now().await;
    }
    arrange(keys, order, grouped)
}

fn arrange(mut keys: Vec<Keyed<'_>>, order: OrderBy, grouped: bool) -> Vec<Group> {
    // Sections must be contiguous, so the label leads whenever it matters.
    let by_section = grouped || order == OrderBy::Country;
    keys.sort_by(|a, b| {
        let section = if by_section {
            a.0.cmp(&b.0)
        } else {
            std::cmp::Ordering::Equal
        };
        section
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.id.cmp(&b.2.id))
    });

    if !grouped {
        return vec![Group::implicit(
            keys.into_iter().map(|(_, _, item, _)| item.clone()).collect(),
        )];
    }

    let mut groups: Vec<Group> = Vec::new();
    for (_, _, item, label) in keys {
        match groups.last_mut() {
            Some(group) if group.label == label => group.items.push(item.clone()),
            _ => groups.push(Group {
                label,
                items: vec![item.clone()],
            }),
        }
    }
    groups
}

/// Total number of items across groups.
pub fn total_len(groups: &[Group]) -> usize {
    groups.iter().map(Group::len).sum()
}

/// The first `limit` items of the flattened groups, keeping section
/// labels. Sections that end up empty are dropped.
pub fn take_prefix(groups: &[Group], limit: usize) -> Vec<Group> {
    let mut remaining = limit;
    let mut out = Vec::new();
    for group in groups {
        if remaining == 0 {
            break;
        }
        let take = group.items.len().min(remaining);
        if take == 0 {
            continue;
        }
        remaining -= take;
        out.push(Group {
            label: group.label.clone(),
            items: group.items[..take].to_vec(),
        });
    }
    out
}
