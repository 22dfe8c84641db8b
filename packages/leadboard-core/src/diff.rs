/// Lead-level diff between two store versions.
///
/// Leads are matched by id only. Display names are never compared, so two
/// leads called "Acme" stay two leads.
use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Lead, RecordStore};

/// A single lead change between two store versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordChange {
    #[serde(rename_all = "camelCase")]
    Added { id: String, group: String },
    #[serde(rename_all = "camelCase")]
    Removed { id: String, group: String },
    #[serde(rename_all = "camelCase")]
    Moved {
        id: String,
        from_group: String,
        to_group: String,
        from_index: usize,
        to_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    Modified { id: String, group: String },
}

/// Where a lead sits in a store.
#[derive(Debug, Clone)]
pub struct Placement<'a> {
    pub group: &'a str,
    pub index: usize,
    pub lead: &'a Lead,
}

/// Map of id -> placement for every lead in the store.
pub fn placements(store: &RecordStore) -> HashMap<&str, Placement<'_>> {
    let mut map = HashMap::new();
    for group in &store.groups {
        for (index, lead) in group.leads.iter().enumerate() {
            map.insert(
                lead.id.as_str(),
                Placement {
                    group: group.key.as_str(),
                    index,
                    lead,
                },
            );
        }
    }
    map
}

/// Whether two stores differ in grouping or order.
///
/// Compares the ordered id sequence of every group, so a pure reorder
/// within one group counts as a change. Field contents are not compared.
pub fn changed(old: &RecordStore, new: &RecordStore) -> bool {
    old.groups.len() != new.groups.len()
        || old.groups.iter().zip(&new.groups).any(|(a, b)| {
            a.key != b.key
                || a.leads.len() != b.leads.len()
                || a.leads.iter().zip(&b.leads).any(|(x, y)| x.id != y.id)
        })
}

/// Compute the changes between two store versions, in store order.
pub fn diff_stores(old: &RecordStore, new: &RecordStore) -> Vec<RecordChange> {
    let old_map = placements(old);
    let new_map = placements(new);
    let mut changes = Vec::new();

    for group in &old.groups {
        for (index, lead) in group.leads.iter().enumerate() {
            match new_map.get(lead.id.as_str()) {
                None => changes.push(RecordChange::Removed {
                    id: lead.id.clone(),
                    group: group.key.clone(),
                }),
                Some(now) => {
                    if now.group != group.key || now.index != index {
                        changes.push(RecordChange::Moved {
                            id: lead.id.clone(),
                            from_group: group.key.clone(),
                            to_group: now.group.to_string(),
                            from_index: index,
                            to_index: now.index,
                        });
                    }
                    if now.lead != lead {
                        changes.push(RecordChange::Modified {
                            id: lead.id.clone(),
                            group: now.group.to_string(),
                        });
                    }
                }
            }
        }
    }

    for group in &new.groups {
        for lead in &group.leads {
            if !old_map.contains_key(lead.id.as_str()) {
                changes.push(RecordChange::Added {
                    id: lead.id.clone(),
                    group: group.key.clone(),
                });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Group;

    fn make_store(groups: Vec<(&str, Vec<(&str, &str)>)>) -> RecordStore {
        RecordStore {
            groups: groups
                .into_iter()
                .map(|(key, leads)| Group {
                    key: key.to_string(),
                    leads: leads
                        .into_iter()
                        .map(|(id, name)| Lead::new(id, name))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_no_changes() {
        let store = make_store(vec![("Todo", vec![("a1", "Acme")]), ("Done", vec![])]);
        assert!(!changed(&store, &store));
        assert!(diff_stores(&store, &store).is_empty());
    }

    #[test]
    fn test_reorder_within_group_is_a_change() {
        let old = make_store(vec![("Todo", vec![("a1", "Acme"), ("b2", "Beta")])]);
        let new = make_store(vec![("Todo", vec![("b2", "Beta"), ("a1", "Acme")])]);
        assert!(changed(&old, &new));
        let changes = diff_stores(&old, &new);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| matches!(c, RecordChange::Moved { .. })));
    }

    #[test]
    fn test_move_across_groups() {
        let old = make_store(vec![("Todo", vec![("a1", "Acme")]), ("Done", vec![])]);
        let new = make_store(vec![("Todo", vec![]), ("Done", vec![("a1", "Acme")])]);
        assert!(changed(&old, &new));
        assert_eq!(
            diff_stores(&old, &new),
            vec![RecordChange::Moved {
                id: "a1".to_string(),
                from_group: "Todo".to_string(),
                to_group: "Done".to_string(),
                from_index: 0,
                to_index: 0,
            }]
        );
    }

    #[test]
    fn test_same_names_are_tracked_by_id() {
        let old = make_store(vec![("Todo", vec![("a1", "Acme")]), ("Done", vec![("b2", "Acme")])]);
        let new = make_store(vec![("Todo", vec![("b2", "Acme")]), ("Done", vec![("a1", "Acme")])]);
        assert!(changed(&old, &new));
        assert_eq!(diff_stores(&old, &new).len(), 2);
    }

    #[test]
    fn test_added_removed_modified() {
        let old = make_store(vec![("Todo", vec![("a1", "Acme"), ("b2", "Beta")])]);
        let new = make_store(vec![("Todo", vec![("a1", "Acme Corp"), ("c3", "Gamma")])]);
        let changes = diff_stores(&old, &new);
        assert_eq!(
            changes,
            vec![
                RecordChange::Modified {
                    id: "a1".to_string(),
                    group: "Todo".to_string(),
                },
                RecordChange::Removed {
                    id: "b2".to_string(),
                    group: "Todo".to_string(),
                },
                RecordChange::Added {
                    id: "c3".to_string(),
                    group: "Todo".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_field_edit_alone_is_not_a_reorder() {
        let old = make_store(vec![("Todo", vec![("a1", "Acme")])]);
        let new = make_store(vec![("Todo", vec![("a1", "Acme Corp")])]);
        assert!(!changed(&old, &new));
    }

    #[test]
    fn test_group_count_difference_is_a_change() {
        let old = make_store(vec![("Todo", vec![])]);
        let new = make_store(vec![("Todo", vec![]), ("Done", vec![])]);
        assert!(changed(&old, &new));
    }

    #[test]
    fn test_change_serializes_tagged() {
        let change = RecordChange::Moved {
            id: "a1".to_string(),
            from_group: "Todo".to_string(),
            to_group: "Done".to_string(),
            from_index: 1,
            to_index: 0,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "moved");
        assert_eq!(json["fromGroup"], "Todo");
        assert_eq!(json["toIndex"], 0);
    }
}
