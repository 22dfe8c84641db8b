/// Board configuration shared by every front end.
use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::label::{DelimitedCodec, LabelCodec, LabelError, TokenCodec, DEFAULT_DELIMITER};
use crate::reconcile::UnresolvedPolicy;
use crate::types::RecordStore;

/// One pipeline column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Stable key under which the column's leads are stored.
    pub key: String,
    /// Column title shown on the board. Defaults to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl GroupConfig {
    pub fn new(key: &str, header: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            header: header.map(ToOwned::to_owned),
        }
    }

    pub fn header(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.key)
    }
}

/// How card labels carry lead identity through the board widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecKind {
    /// The lead id is the label's terminal token.
    #[default]
    Delimited,
    /// Hashed id tokens resolved through a side table.
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one group must be configured")]
    NoGroups,

    #[error("Group key must not be empty")]
    EmptyGroupKey,

    #[error("Group {0:?} is configured more than once")]
    DuplicateGroup(String),

    #[error("Trash group {0:?} is not one of the configured groups")]
    UnknownTrashGroup(String),

    #[error(transparent)]
    Label(#[from] LabelError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
    /// Key of the column whose leads are cleared by "empty trash".
    #[serde(default = "default_trash_group")]
    pub trash_group: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub unresolved_policy: UnresolvedPolicy,
    #[serde(default)]
    pub codec: CodecKind,
    /// Local JSON store location. Front ends pick a default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

const TRASH_GROUP: &str = "Prullenbak 🗑️";

fn default_groups() -> Vec<GroupConfig> {
    vec![
        GroupConfig::new("Te benaderen", Some("Te benaderen 🔵")),
        GroupConfig::new("Opgevolgd", Some("Opgevolgd 🟣")),
        GroupConfig::new("Geland", Some("Geland 🟢")),
        GroupConfig::new("Geen interesse", Some("Geen interesse ⚪")),
        GroupConfig::new(TRASH_GROUP, None),
    ]
}

fn default_trash_group() -> Option<String> {
    Some(TRASH_GROUP.to_string())
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            groups: default_groups(),
            trash_group: default_trash_group(),
            delimiter: default_delimiter(),
            unresolved_policy: UnresolvedPolicy::default(),
            codec: CodecKind::default(),
            store_path: None,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.key.trim().is_empty() {
                return Err(ConfigError::EmptyGroupKey);
            }
            if !seen.insert(group.key.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.key.clone()));
            }
        }
        if let Some(trash) = &self.trash_group {
            if !seen.contains(trash.as_str()) {
                return Err(ConfigError::UnknownTrashGroup(trash.clone()));
            }
        }
        if self.delimiter.is_empty() {
            return Err(LabelError::EmptyDelimiter.into());
        }
        Ok(())
    }

    pub fn group_keys(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.key.clone()).collect()
    }

    /// Board title of the group stored under `key`, or the key itself.
    pub fn header_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.groups
            .iter()
            .find(|g| g.key == key)
            .map(GroupConfig::header)
            .unwrap_or(key)
    }

    /// Empty store with every configured group.
    pub fn empty_store(&self) -> RecordStore {
        RecordStore::with_groups(self.group_keys())
    }

    pub fn build_codec(&self) -> Result<Box<dyn LabelCodec>, LabelError> {
        Ok(match self.codec {
            CodecKind::Delimited => Box::new(DelimitedCodec::new(&self.delimiter)?),
            CodecKind::Token => Box::new(TokenCodec::new(&self.delimiter)?),
        })
    }
}
