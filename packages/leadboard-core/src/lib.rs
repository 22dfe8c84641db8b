pub mod config;
pub mod diff;
pub mod identity;
pub mod label;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod types;

pub use config::BoardConfig;
pub use reconcile::{reconcile, ReconcileError, Reconciliation, UnresolvedPolicy};
pub use session::{BoardSession, DragOutcome, Persistence, SessionError};
pub use types::{BoardContainer, Group, Lead, LeadDraft, LeadPatch, RecordStore};
