use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identity;

/// One pipeline entity (a sales lead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Set only on stubs synthesized from a card label that no longer
    /// resolves to a known lead. Such a lead has lost every field but its name.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fabricated: bool,
}

impl Lead {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            contact: String::new(),
            price: String::new(),
            email: String::new(),
            phone: String::new(),
            website: String::new(),
            notes: String::new(),
            tag: String::new(),
            created_at: None,
            fabricated: false,
        }
    }
}

/// Form input for a lead that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub notes: String,
}

impl LeadDraft {
    pub fn into_lead(self, id: String) -> Lead {
        Lead {
            id,
            name: self.name.trim().to_string(),
            contact: self.contact,
            price: self.price,
            email: self.email,
            phone: self.phone,
            website: self.website,
            notes: self.notes,
            tag: String::new(),
            created_at: None,
            fabricated: false,
        }
    }
}

/// Partial edit of a lead. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub price: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub tag: Option<String>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the patch. Returns true when any field actually changed.
    pub fn apply(&self, lead: &mut Lead) -> bool {
        let mut changed = false;
        let fields: [(&Option<String>, &mut String); 8] = [
            (&self.name, &mut lead.name),
            (&self.contact, &mut lead.contact),
            (&self.price, &mut lead.price),
            (&self.email, &mut lead.email),
            (&self.phone, &mut lead.phone),
            (&self.website, &mut lead.website),
            (&self.notes, &mut lead.notes),
            (&self.tag, &mut lead.tag),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                if *slot != *value {
                    *slot = value.clone();
                    changed = true;
                }
            }
        }
        changed
    }
}

/// A named, ordered pipeline column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    #[serde(default)]
    pub leads: Vec<Lead>,
}

impl Group {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            leads: Vec::new(),
        }
    }
}

/// The authoritative record store: every lead lives in exactly one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStore {
    pub groups: Vec<Group>,
}

impl RecordStore {
    /// Empty store with one group per key, in order.
    pub fn with_groups<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: keys.into_iter().map(Group::new).collect(),
        }
    }

    pub fn group(&self, key: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.key == key)
    }

    pub fn group_mut(&mut self, key: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.key == key)
    }

    /// Total number of leads across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.leads.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.leads.is_empty())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.leads.iter())
            .map(|l| l.id.as_str())
    }

    /// Ordered id sequence of each group.
    pub fn id_sequences(&self) -> Vec<Vec<&str>> {
        self.groups
            .iter()
            .map(|g| g.leads.iter().map(|l| l.id.as_str()).collect())
            .collect()
    }

    /// Locate a lead: (group index, position within the group).
    pub fn position(&self, id: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, g)| {
            g.leads
                .iter()
                .position(|l| l.id == id)
                .map(|pos| (gi, pos))
        })
    }

    pub fn lead(&self, id: &str) -> Option<&Lead> {
        self.position(id)
            .map(|(gi, pos)| &self.groups[gi].leads[pos])
    }

    pub fn lead_mut(&mut self, id: &str) -> Option<&mut Lead> {
        let (gi, pos) = self.position(id)?;
        Some(&mut self.groups[gi].leads[pos])
    }

    pub fn remove(&mut self, id: &str) -> Option<Lead> {
        let (gi, pos) = self.position(id)?;
        Some(self.groups[gi].leads.remove(pos))
    }

    /// Rearrange the groups to exactly `keys`, in that order.
    /// Missing groups are created empty. Leads of groups not named in `keys`
    /// are appended to the first group; their ids are returned.
    /// An empty `keys` leaves the store untouched.
    pub fn conform_to(&mut self, keys: &[String]) -> Vec<String> {
        if keys.is_empty() {
            return Vec::new();
        }
        let mut old: Vec<Group> = std::mem::take(&mut self.groups);
        let mut groups: Vec<Group> = keys
            .iter()
            .map(|key| match old.iter().position(|g| &g.key == key) {
                Some(i) => old.remove(i),
                None => Group::new(key.clone()),
            })
            .collect();

        let mut orphans = Vec::new();
        if let Some(first) = groups.first_mut() {
            for group in old {
                for lead in group.leads {
                    orphans.push(lead.id.clone());
                    first.leads.push(lead);
                }
            }
        }
        self.groups = groups;
        orphans
    }

    /// Give a fresh id to every lead whose id is `unusable` or already used
    /// by an earlier lead. Returns `(old, new)` pairs in store order.
    pub fn reassign_ids(&mut self, unusable: impl Fn(&str) -> bool) -> Vec<(String, String)> {
        let mut taken: HashSet<String> = self.ids().map(str::to_string).collect();
        let mut seen: HashSet<String> = HashSet::with_capacity(taken.len());
        let mut reassigned = Vec::new();
        for lead in self.groups.iter_mut().flat_map(|g| g.leads.iter_mut()) {
            if !unusable(&lead.id) && seen.insert(lead.id.clone()) {
                continue;
            }
            let fresh = identity::generate_unique_id(&taken);
            taken.insert(fresh.clone());
            seen.insert(fresh.clone());
            let old = std::mem::replace(&mut lead.id, fresh.clone());
            reassigned.push((old, fresh));
        }
        reassigned
    }
}

/// One column as exchanged with the drag-and-drop board widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardContainer {
    pub header: String,
    pub items: Vec<String>,
}

/// Summary row for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub index: usize,
    pub key: String,
    pub header: String,
    pub lead_count: usize,
}
