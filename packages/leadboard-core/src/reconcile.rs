/// Drag reconciliation.
///
/// The board widget hands back the labels it was given, regrouped and
/// reordered by the user. This module rebuilds the record store from that
/// output:
///
/// - returned containers map to store groups by position; headers are
///   display text only
/// - each label is resolved to a lead through the id it carries, never by
///   its visible text
/// - every lead of the prior store ends up exactly once in the result,
///   unless its label became unreadable, in which case the configured
///   [`UnresolvedPolicy`] applies and the outcome is flagged as degraded
///
/// Reconciliation is all-or-nothing: on error the caller keeps its prior
/// store, which this module never mutates.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::diff;
use crate::identity;
use crate::label::LabelCodec;
use crate::types::{BoardContainer, Group, Lead, RecordStore};

/// What to do with a label whose lead cannot be found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedPolicy {
    /// Leave the card out. Its lead is gone from the store.
    #[default]
    Drop,
    /// Keep a stub lead named after the card's first line, under a fresh id.
    Fabricate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReconcileWarning {
    /// A label did not resolve to any known lead and was left out.
    #[serde(rename_all = "camelCase")]
    UnresolvedLabel { group: String, label: String },
    /// A label did not resolve and a stub lead was created in its place.
    #[serde(rename_all = "camelCase")]
    FabricatedRecord {
        group: String,
        id: String,
        name: String,
    },
    /// The same lead showed up twice; only the first copy was kept.
    #[serde(rename_all = "camelCase")]
    DuplicateLabel { group: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Board returned {actual} columns, expected {expected}")]
    GroupCountMismatch { expected: usize, actual: usize },

    #[error("{} lead(s) missing from the board without a matching card: {}", ids.len(), ids.join(", "))]
    RecordsLost { ids: Vec<String> },

    #[error("Store holds more than one lead with id: {}", ids.join(", "))]
    DuplicateIds { ids: Vec<String> },
}

/// A successfully reconciled store.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub store: RecordStore,
    /// Grouping or order differs from the prior store.
    pub changed: bool,
    pub warnings: Vec<ReconcileWarning>,
    /// Prior leads that no longer appear in `store`.
    pub lost: Vec<String>,
    /// Stub leads created under [`UnresolvedPolicy::Fabricate`].
    pub fabricated: Vec<String>,
}

impl Reconciliation {
    /// True when the result is not a pure permutation of the prior store.
    pub fn is_degraded(&self) -> bool {
        !self.lost.is_empty() || !self.fabricated.is_empty()
    }
}

/// Rebuild `prior` from the widget output `returned`.
pub fn reconcile(
    prior: &RecordStore,
    returned: &[BoardContainer],
    codec: &dyn LabelCodec,
    policy: UnresolvedPolicy,
) -> Result<Reconciliation, ReconcileError> {
    if returned.len() != prior.groups.len() {
        log::warn!(
            "[leadboard.reconcile] Board returned {} columns, expected {}; keeping current store",
            returned.len(),
            prior.groups.len()
        );
        return Err(ReconcileError::GroupCountMismatch {
            expected: prior.groups.len(),
            actual: returned.len(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: Vec<String> = prior
        .ids()
        .filter(|id| !seen.insert(*id))
        .map(str::to_string)
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        duplicates.dedup();
        log::warn!(
            "[leadboard.reconcile] Ids shared by several leads: {}; keeping current store",
            duplicates.join(", ")
        );
        return Err(ReconcileError::DuplicateIds { ids: duplicates });
    }

    let lookup: HashMap<&str, &Lead> = prior
        .groups
        .iter()
        .flat_map(|g| g.leads.iter())
        .map(|l| (l.id.as_str(), l))
        .collect();

    let mut placed: HashSet<&str> = HashSet::with_capacity(lookup.len());
    let mut taken_ids: HashSet<String> = lookup.keys().map(|id| id.to_string()).collect();
    let mut warnings = Vec::new();
    let mut fabricated = Vec::new();
    let mut unresolved = 0usize;
    let mut groups = Vec::with_capacity(prior.groups.len());

    for (prior_group, container) in prior.groups.iter().zip(returned) {
        let mut leads = Vec::with_capacity(container.items.len());

        for label in &container.items {
            let decoded = codec.decode(label);
            let found = decoded
                .id
                .as_deref()
                .and_then(|id| lookup.get_key_value(id));

            match found {
                Some((&id, &lead)) => {
                    if placed.insert(id) {
                        leads.push(lead.clone());
                    } else {
                        log::warn!(
                            "[leadboard.reconcile] Duplicate card for lead {} in {:?}, keeping first",
                            id,
                            prior_group.key
                        );
                        warnings.push(ReconcileWarning::DuplicateLabel {
                            group: prior_group.key.clone(),
                            id: id.to_string(),
                        });
                    }
                }
                None => {
                    unresolved += 1;
                    match policy {
                        UnresolvedPolicy::Drop => {
                            log::warn!(
                                "[leadboard.reconcile] Unresolvable card in {:?} dropped: {:?}",
                                prior_group.key,
                                label
                            );
                            warnings.push(ReconcileWarning::UnresolvedLabel {
                                group: prior_group.key.clone(),
                                label: label.clone(),
                            });
                        }
                        UnresolvedPolicy::Fabricate => {
                            let id = identity::generate_unique_id(&taken_ids);
                            taken_ids.insert(id.clone());
                            let mut name = decoded.display_name();
                            if name.is_empty() {
                                name = label.trim().to_string();
                            }
                            log::warn!(
                                "[leadboard.reconcile] Unresolvable card in {:?} replaced by stub {} ({:?})",
                                prior_group.key,
                                id,
                                name
                            );
                            let mut stub = Lead::new(id.clone(), name.clone());
                            stub.fabricated = true;
                            leads.push(stub);
                            warnings.push(ReconcileWarning::FabricatedRecord {
                                group: prior_group.key.clone(),
                                id: id.clone(),
                                name,
                            });
                            fabricated.push(id);
                        }
                    }
                }
            }
        }

        groups.push(Group {
            key: prior_group.key.clone(),
            leads,
        });
    }

    // Every lead that did not come back must be explained by an unreadable card.
    let lost: Vec<String> = prior
        .ids()
        .filter(|id| !placed.contains(id))
        .map(str::to_string)
        .collect();
    if lost.len() > unresolved {
        log::warn!(
            "[leadboard.reconcile] {} lead(s) missing from board output, {} unreadable card(s); keeping current store",
            lost.len(),
            unresolved
        );
        return Err(ReconcileError::RecordsLost { ids: lost });
    }

    let store = RecordStore { groups };
    let changed = diff::changed(prior, &store);
    if !lost.is_empty() {
        log::warn!(
            "[leadboard.reconcile] Degraded reconciliation, lost leads: {}",
            lost.join(", ")
        );
    }

    Ok(Reconciliation {
        store,
        changed,
        warnings,
        lost,
        fabricated,
    })
}
