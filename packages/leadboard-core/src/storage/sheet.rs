/// Tabular sheet backend.
///
/// The board is stored as one row per lead under a fixed header:
///
///   Status | Name | Price | Contact | Email | Phone | Website | Notes | ID
///
/// `Status` holds the group key. Saving clears the sheet and rewrites every
/// row. The transport to the actual sheet service sits behind
/// [`SheetClient`].
use std::collections::HashSet;

use super::{RecordBackend, StorageError};
use crate::identity;
use crate::types::{Lead, RecordStore};

pub const SHEET_HEADER: [&str; 9] = [
    "Status", "Name", "Price", "Contact", "Email", "Phone", "Website", "Notes", "ID",
];

/// Access to a remote sheet: read all rows, or replace all rows.
pub trait SheetClient {
    fn read_rows(&mut self) -> Result<Vec<Vec<String>>, StorageError>;

    fn replace_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StorageError>;
}

/// Sheet held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemorySheet {
    pub rows: Vec<Vec<String>>,
}

impl SheetClient for InMemorySheet {
    fn read_rows(&mut self) -> Result<Vec<Vec<String>>, StorageError> {
        Ok(self.rows.clone())
    }

    fn replace_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StorageError> {
        self.rows = rows.to_vec();
        Ok(())
    }
}

/// Flatten a store into sheet rows, header first.
pub fn store_to_rows(store: &RecordStore) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(store.len() + 1);
    rows.push(SHEET_HEADER.iter().map(|h| h.to_string()).collect());
    for group in &store.groups {
        for lead in &group.leads {
            rows.push(vec![
                group.key.clone(),
                lead.name.clone(),
                lead.price.clone(),
                lead.contact.clone(),
                lead.email.clone(),
                lead.phone.clone(),
                lead.website.clone(),
                lead.notes.clone(),
                lead.id.clone(),
            ]);
        }
    }
    rows
}

struct Columns {
    status: usize,
    name: usize,
    price: Option<usize>,
    contact: Option<usize>,
    email: Option<usize>,
    phone: Option<usize>,
    website: Option<usize>,
    notes: Option<usize>,
    id: Option<usize>,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, StorageError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| {
                StorageError::InvalidData(format!("sheet header has no {:?} column", name))
            })
        };
        Ok(Self {
            status: required("Status")?,
            name: required("Name")?,
            price: find("Price"),
            contact: find("Contact"),
            email: find("Email"),
            phone: find("Phone"),
            website: find("Website"),
            notes: find("Notes"),
            id: find("ID"),
        })
    }
}

fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Rebuild a store from sheet rows (header first).
///
/// Columns are found by header name, in any order. Rows without a name are
/// skipped. Rows without a usable or unique ID get a fresh one. Rows whose
/// status names no known group land in the first group.
pub fn rows_to_store(
    rows: &[Vec<String>],
    group_keys: &[String],
) -> Result<RecordStore, StorageError> {
    let mut store = RecordStore::with_groups(group_keys.iter().cloned());
    let Some((header, body)) = rows.split_first() else {
        return Ok(store);
    };
    if store.groups.is_empty() {
        return Err(StorageError::InvalidData("no groups configured".to_string()));
    }
    let cols = Columns::locate(header)?;

    let mut seen: HashSet<String> = HashSet::new();
    for (line, row) in body.iter().enumerate() {
        let name = cell(row, Some(cols.name));
        if name.is_empty() {
            if row.iter().any(|v| !v.trim().is_empty()) {
                log::warn!(
                    "[leadboard.storage.sheet] Row {} has no name, skipping",
                    line + 2
                );
            }
            continue;
        }

        let mut id = cell(row, cols.id);
        if identity::id_problem(&id).is_some() || seen.contains(&id) {
            let fresh = identity::generate_unique_id(&seen);
            if !id.is_empty() {
                log::warn!(
                    "[leadboard.storage.sheet] Row {} id {:?} unusable, assigned {}",
                    line + 2,
                    id,
                    fresh
                );
            }
            id = fresh;
        }
        seen.insert(id.clone());

        let lead = Lead {
            price: cell(row, cols.price),
            contact: cell(row, cols.contact),
            email: cell(row, cols.email),
            phone: cell(row, cols.phone),
            website: cell(row, cols.website),
            notes: cell(row, cols.notes),
            ..Lead::new(id, name)
        };

        let status = cell(row, Some(cols.status));
        let index = match store.groups.iter().position(|g| g.key == status) {
            Some(index) => index,
            None => {
                log::warn!(
                    "[leadboard.storage.sheet] Row {} has unknown status {:?}, placing in {:?}",
                    line + 2,
                    status,
                    store.groups[0].key
                );
                0
            }
        };
        store.groups[index].leads.push(lead);
    }

    Ok(store)
}

pub struct SheetBackend<C: SheetClient> {
    client: C,
    group_keys: Vec<String>,
}

impl<C: SheetClient> SheetBackend<C> {
    pub fn new(client: C, group_keys: Vec<String>) -> Self {
        Self { client, group_keys }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: SheetClient> RecordBackend for SheetBackend<C> {
    fn load(&mut self) -> Result<Option<RecordStore>, StorageError> {
        let rows = self.client.read_rows()?;
        if rows.is_empty() {
            return Ok(None);
        }
        rows_to_store(&rows, &self.group_keys).map(Some)
    }

    fn save(&mut self, store: &RecordStore) -> Result<(), StorageError> {
        let rows = store_to_rows(store);
        self.client.replace_rows(&rows)?;
        log::debug!(
            "[leadboard.storage.sheet] Rewrote sheet with {} leads",
            rows.len() - 1
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "sheet".to_string()
    }
}
