//! Tag-set reconciliation: the minimal add/remove delta that converges a
//! question's current tags to the requested ones.

use uuid::Uuid;

use crate::database::models::{tag_key, Tag};

/// Requested names with blanks dropped and case-insensitive duplicates
/// collapsed onto their first spelling.
pub fn normalize(names: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        let key = tag_key(trimmed);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(trimmed.to_string());
    }
    out
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Names not currently attached, in request order.
    pub to_add: Vec<String>,
    /// Attached tag ids whose names are no longer requested.
    pub to_remove: Vec<Uuid>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

pub fn diff(current: &[Tag], requested: &[String]) -> TagDiff {
    let requested = normalize(requested);
    let wanted: Vec<String> = requested.iter().map(|n| tag_key(n)).collect();
    let attached: Vec<String> = current.iter().map(|t| tag_key(&t.name)).collect();

    TagDiff {
        to_add: requested
            .into_iter()
            .zip(&wanted)
            .filter(|(_, key)| !attached.contains(*key))
            .map(|(name, _)| name)
            .collect(),
        to_remove: current
            .iter()
            .filter(|t| !wanted.contains(&tag_key(&t.name)))
            .map(|t| t.id)
            .collect(),
    }
}

/// One change to a tag row's usage counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStep {
    /// Find-or-create by name and count one more question.
    Attach(String),
    /// Count one question less.
    Detach(Uuid),
}

/// Counter changes sorted by tag key. Every writer touches tag rows in this
/// order, so two transactions naming the same tags never wait on each other
/// in a cycle.
pub fn lock_order(attach: &[String], detach: &[Tag]) -> Vec<TagStep> {
    let mut keyed: Vec<(String, TagStep)> = attach
        .iter()
        .map(|name| (tag_key(name), TagStep::Attach(name.clone())))
        .chain(detach.iter().map(|t| (tag_key(&t.name), TagStep::Detach(t.id))))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, step)| step).collect()
}
