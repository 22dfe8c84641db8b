/// One user's board session.
///
/// Owns the record store, the label codec and the storage backend. Every
/// interaction runs synchronously: mutate the store, then write the whole
/// store back. A failed write keeps the change in memory, marks the session
/// dirty and is retried by the next mutating call.
use serde::Serialize;

use crate::config::{BoardConfig, ConfigError};
use crate::diff::{self, RecordChange};
use crate::identity;
use crate::label::{LabelCodec, LabelError};
use crate::reconcile::{self, ReconcileError, ReconcileWarning};
use crate::storage::{RecordBackend, StorageError};
use crate::types::{BoardContainer, GroupSummary, Lead, LeadDraft, LeadPatch, RecordStore};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Lead name must not be empty")]
    EmptyName,

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("No trash group is configured")]
    NoTrashGroup,
}

/// Whether the latest change reached the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Persistence {
    Saved,
    /// Nothing needed writing.
    Unchanged,
    /// Kept in memory only; retried on the next change.
    Pending { reason: String },
}

impl Persistence {
    pub fn is_pending(&self) -> bool {
        matches!(self, Persistence::Pending { .. })
    }
}

/// Result of applying a board drag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragOutcome {
    pub changed: bool,
    pub degraded: bool,
    pub changes: Vec<RecordChange>,
    pub warnings: Vec<ReconcileWarning>,
    pub persistence: Persistence,
}

pub struct BoardSession {
    config: BoardConfig,
    store: RecordStore,
    codec: Box<dyn LabelCodec>,
    backend: Box<dyn RecordBackend>,
    dirty: bool,
}

impl BoardSession {
    /// Validate the config, load the stored board and align it with the
    /// configured groups.
    pub fn open(config: BoardConfig, mut backend: Box<dyn RecordBackend>) -> Result<Self, SessionError> {
        config.validate()?;
        let codec = config.build_codec()?;

        let mut store = match backend.load()? {
            Some(store) => store,
            None => config.empty_store(),
        };
        let delimiter = config.delimiter.as_str();
        let reassigned = store.reassign_ids(|id| {
            identity::id_problem(id).is_some() || id.contains(delimiter)
        });
        for (old, new) in &reassigned {
            log::warn!(
                "[leadboard.session] Lead id {:?} is unusable or not unique, reassigned {}",
                old,
                new
            );
        }
        let orphans = store.conform_to(&config.group_keys());
        if !orphans.is_empty() {
            log::warn!(
                "[leadboard.session] {} lead(s) from unconfigured groups moved to {:?}: {}",
                orphans.len(),
                config.groups[0].key,
                orphans.join(", ")
            );
        }
        log::info!(
            "[leadboard.session] Opened board from {} with {} leads in {} groups",
            backend.describe(),
            store.len(),
            store.groups.len()
        );

        Ok(Self {
            config,
            store,
            codec,
            backend,
            // Ids or groups were repaired, so the stored layout is stale.
            dirty: !orphans.is_empty() || !reassigned.is_empty(),
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Changes exist that have not been written to the backend.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn summaries(&self) -> Vec<GroupSummary> {
        self.store
            .groups
            .iter()
            .enumerate()
            .map(|(index, g)| GroupSummary {
                index,
                key: g.key.clone(),
                header: self.config.header_for(&g.key).to_string(),
                lead_count: g.leads.len(),
            })
            .collect()
    }

    /// Board payload for the widget: one container per group, one label per lead.
    pub fn render(&mut self) -> Result<Vec<BoardContainer>, SessionError> {
        self.codec.begin_render();
        let mut board = Vec::with_capacity(self.store.groups.len());
        for group in &self.store.groups {
            let items = group
                .leads
                .iter()
                .map(|lead| self.codec.encode(lead))
                .collect::<Result<Vec<_>, _>>()?;
            board.push(BoardContainer {
                header: self.config.header_for(&group.key).to_string(),
                items,
            });
        }
        Ok(board)
    }

    /// Apply the widget's regrouped labels. On error the store is untouched.
    pub fn apply_drag(&mut self, returned: &[BoardContainer]) -> Result<DragOutcome, SessionError> {
        let result = reconcile::reconcile(
            &self.store,
            returned,
            self.codec.as_ref(),
            self.config.unresolved_policy,
        )?;
        let degraded = result.is_degraded();

        if !result.changed {
            let persistence = if self.dirty {
                self.persist()
            } else {
                Persistence::Unchanged
            };
            return Ok(DragOutcome {
                changed: false,
                degraded,
                changes: Vec::new(),
                warnings: result.warnings,
                persistence,
            });
        }

        let changes = diff::diff_stores(&self.store, &result.store);
        log::info!(
            "[leadboard.session] Drag applied: {} change(s){}",
            changes.len(),
            if degraded { ", degraded" } else { "" }
        );
        self.store = result.store;
        self.dirty = true;
        let persistence = self.persist();

        Ok(DragOutcome {
            changed: true,
            degraded,
            changes,
            warnings: result.warnings,
            persistence,
        })
    }

    /// Add a lead at the end of the first group.
    pub fn add_lead(&mut self, draft: LeadDraft) -> Result<(String, Persistence), SessionError> {
        let key = self.config.groups[0].key.clone();
        self.add_lead_to(&key, draft)
    }

    pub fn add_lead_to(
        &mut self,
        group_key: &str,
        draft: LeadDraft,
    ) -> Result<(String, Persistence), SessionError> {
        if draft.name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        let taken = self.store.ids().map(str::to_string).collect();
        let id = identity::generate_unique_id(&taken);
        let mut lead = draft.into_lead(id.clone());
        lead.created_at = Some(chrono::Local::now().to_rfc3339());

        let group = self
            .store
            .group_mut(group_key)
            .ok_or_else(|| SessionError::GroupNotFound(group_key.to_string()))?;
        log::info!(
            "[leadboard.session] Added lead {} ({:?}) to {:?}",
            id,
            lead.name,
            group_key
        );
        group.leads.push(lead);
        self.dirty = true;
        Ok((id, self.persist()))
    }

    pub fn edit_lead(&mut self, id: &str, patch: &LeadPatch) -> Result<Persistence, SessionError> {
        if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
            return Err(SessionError::EmptyName);
        }
        let lead = self
            .store
            .lead_mut(id)
            .ok_or_else(|| SessionError::LeadNotFound(id.to_string()))?;
        if !patch.apply(lead) {
            return Ok(self.persist_if_dirty());
        }
        log::info!("[leadboard.session] Edited lead {}", id);
        self.dirty = true;
        Ok(self.persist())
    }

    pub fn delete_lead(&mut self, id: &str) -> Result<(Lead, Persistence), SessionError> {
        let lead = self
            .store
            .remove(id)
            .ok_or_else(|| SessionError::LeadNotFound(id.to_string()))?;
        log::info!("[leadboard.session] Deleted lead {} ({:?})", id, lead.name);
        self.dirty = true;
        Ok((lead, self.persist()))
    }

    pub fn trash_count(&self) -> usize {
        self.config
            .trash_group
            .as_deref()
            .and_then(|key| self.store.group(key))
            .map_or(0, |g| g.leads.len())
    }

    /// Remove every lead in the trash group. Returns how many were removed.
    pub fn empty_trash(&mut self) -> Result<(usize, Persistence), SessionError> {
        let key = self
            .config
            .trash_group
            .clone()
            .ok_or(SessionError::NoTrashGroup)?;
        let group = self
            .store
            .group_mut(&key)
            .ok_or_else(|| SessionError::GroupNotFound(key.clone()))?;
        let removed = std::mem::take(&mut group.leads).len();
        if removed == 0 {
            return Ok((0, self.persist_if_dirty()));
        }
        log::info!("[leadboard.session] Emptied trash, {} lead(s) removed", removed);
        self.dirty = true;
        Ok((removed, self.persist()))
    }

    /// Retry a pending write.
    pub fn flush(&mut self) -> Persistence {
        self.persist_if_dirty()
    }

    fn persist_if_dirty(&mut self) -> Persistence {
        if self.dirty {
            self.persist()
        } else {
            Persistence::Unchanged
        }
    }

    fn persist(&mut self) -> Persistence {
        match self.backend.save(&self.store) {
            Ok(()) => {
                self.dirty = false;
                Persistence::Saved
            }
            Err(e) => {
                log::warn!(
                    "[leadboard.session] Could not save to {}, change kept in memory: {}",
                    self.backend.describe(),
                    e
                );
                self.dirty = true;
                Persistence::Pending {
                    reason: e.to_string(),
                }
            }
        }
    }
}
