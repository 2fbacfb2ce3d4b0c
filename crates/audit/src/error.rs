use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit log at '{path}': {reason}")]
    Open { path: String, reason: String },

    #[error("high-severity entry could not be enqueued: flush channel is gone")]
    ChannelClosed,

    #[error("entry {index} previous_entry_hash does not match entry {prev_index}'s entry_hash")]
    ChainBreak { index: usize, prev_index: usize },

    #[error("entry {index} entry_hash does not match its recomputed hash (tampered)")]
    EntryTampered { index: usize },

    #[error("entry {index} could not be parsed: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("entry {0} is first in the log but carries a previous_entry_hash")]
    UnexpectedPreviousHash(usize),
}
