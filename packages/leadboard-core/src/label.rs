/// Card labels: the text a lead is turned into for the board widget.
///
/// The widget only moves opaque strings around, so every label carries the
/// lead's identity as its terminal token, after the last occurrence of a
/// private delimiter:
///
///   Bakkerij Jansen
///   👤 Peter | € 500 ||3f9a0c1d
///
/// Parsing anchors on the last delimiter, so the delimiter may appear in
/// the visible text and whitespace around the token is ignored.
use std::collections::BTreeMap;

use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::identity;
use crate::types::Lead;

pub const DEFAULT_DELIMITER: &str = "||";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("Label delimiter must not be empty")]
    EmptyDelimiter,

    #[error("Lead {id:?} cannot be labeled: {reason}")]
    UnlabelableId { id: String, reason: String },
}

/// A label taken apart again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLabel {
    /// Lead id, when the label still carries a recognizable one.
    pub id: Option<String>,
    /// Visible part of the label, without the identity token.
    pub text: String,
}

impl DecodedLabel {
    /// First visible line, NFC-normalized with whitespace collapsed.
    /// Used as the name of a stub lead when the id is gone.
    pub fn display_name(&self) -> String {
        let first = self.text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        first
            .nfc()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Turns leads into widget labels and back.
pub trait LabelCodec {
    /// Called once before each render pass.
    fn begin_render(&mut self) {}

    fn encode(&mut self, lead: &Lead) -> Result<String, LabelError>;

    fn decode(&self, label: &str) -> DecodedLabel;
}

/// Visible card text: name on the first line, contact and price below.
pub fn card_text(lead: &Lead) -> String {
    let price = if lead.price.trim().is_empty() {
        "-"
    } else {
        lead.price.as_str()
    };
    format!("{}\n👤 {} | {}", lead.name, lead.contact, price)
}

fn tail_pattern(delimiter: &str) -> Result<Regex, LabelError> {
    if delimiter.is_empty() {
        return Err(LabelError::EmptyDelimiter);
    }
    // Greedy prefix: the token is whatever follows the LAST delimiter.
    let pattern = format!(r"(?s)\A(.*){}\s*(\S+)\s*\z", regex::escape(delimiter));
    Ok(Regex::new(&pattern).expect("escaped delimiter always forms a valid pattern"))
}

fn split_tail(re: &Regex, label: &str) -> (String, Option<String>) {
    match re.captures(label) {
        Some(caps) => (caps[1].trim_end().to_string(), Some(caps[2].to_string())),
        None => (label.trim_end().to_string(), None),
    }
}

/// Embeds the lead id directly in the label.
#[derive(Debug, Clone)]
pub struct DelimitedCodec {
    delimiter: String,
    tail: Regex,
}

impl DelimitedCodec {
    pub fn new(delimiter: &str) -> Result<Self, LabelError> {
        Ok(Self {
            delimiter: delimiter.to_string(),
            tail: tail_pattern(delimiter)?,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl Default for DelimitedCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            tail: tail_pattern(DEFAULT_DELIMITER).expect("default delimiter is not empty"),
        }
    }
}

impl LabelCodec for DelimitedCodec {
    fn encode(&mut self, lead: &Lead) -> Result<String, LabelError> {
        let reason = identity::id_problem(&lead.id).map(str::to_string).or_else(|| {
            lead.id
                .contains(&self.delimiter)
                .then(|| format!("id contains the label delimiter {:?}", self.delimiter))
        });
        if let Some(reason) = reason {
            return Err(LabelError::UnlabelableId {
                id: lead.id.clone(),
                reason,
            });
        }
        Ok(format!("{} {}{}", card_text(lead), self.delimiter, lead.id))
    }

    fn decode(&self, label: &str) -> DecodedLabel {
        let (text, id) = split_tail(&self.tail, label);
        DecodedLabel { id, text }
    }
}

/// Keeps lead ids out of the widget entirely. Each lead travels as `c`
/// followed by a hex prefix of the SHA-256 of its id, so a lead keeps its
/// token from one render to the next. Tokens resolve only against leads of
/// the latest render, and only when exactly one of them matches.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    delimiter: String,
    tail: Regex,
    /// id digest -> lead id, for the latest render only
    table: BTreeMap<String, String>,
}

const TOKEN_MARK: char = 'c';
const TOKEN_MIN_HEX: usize = 8;

fn id_digest(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hex::encode(hasher.finalize())
}

impl TokenCodec {
    pub fn new(delimiter: &str) -> Result<Self, LabelError> {
        Ok(Self {
            delimiter: delimiter.to_string(),
            tail: tail_pattern(delimiter)?,
            table: BTreeMap::new(),
        })
    }

    /// Number of leads labeled by the current render.
    pub fn issued(&self) -> usize {
        self.table.len()
    }

    /// Table entries whose digest starts with `prefix`.
    fn matching<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        self.table
            .range(prefix.to_string()..)
            .take_while(move |(digest, _)| digest.starts_with(prefix))
    }
}

impl LabelCodec for TokenCodec {
    fn begin_render(&mut self) {
        self.table.clear();
    }

    fn encode(&mut self, lead: &Lead) -> Result<String, LabelError> {
        if let Some(reason) = identity::id_problem(&lead.id) {
            return Err(LabelError::UnlabelableId {
                id: lead.id.clone(),
                reason: reason.to_string(),
            });
        }
        let digest = id_digest(&lead.id);
        // Lengthen past any other lead of this render sharing the prefix.
        let mut len = TOKEN_MIN_HEX;
        while len < digest.len()
            && self
                .matching(&digest[..len])
                .any(|(other, _)| *other != digest)
        {
            len += 2;
        }
        let token = format!("{}{}", TOKEN_MARK, &digest[..len]);
        self.table.insert(digest, lead.id.clone());
        Ok(format!("{} {}{}", card_text(lead), self.delimiter, token))
    }

    fn decode(&self, label: &str) -> DecodedLabel {
        let (text, token) = split_tail(&self.tail, label);
        let id = token.and_then(|token| {
            let prefix = token.strip_prefix(TOKEN_MARK)?;
            if prefix.len() < TOKEN_MIN_HEX || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            let prefix = prefix.to_ascii_lowercase();
            let mut found = self.matching(&prefix).map(|(_, id)| id);
            let unique = match (found.next(), found.next()) {
                (Some(id), None) => Some(id.clone()),
                _ => None,
            };
            unique
        });
        DecodedLabel { id, text }
    }
}
