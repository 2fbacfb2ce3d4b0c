use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use kernel_core::AuditEntry;
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::entry::{build_entry, compute_entry_hash, Severity};
use crate::error::AuditError;
use kernel_core::Direction;

/// Entries queued faster than the flush thread drains them back up here
/// before a low-severity entry is dropped.
const CHANNEL_CAPACITY: usize = 4096;

struct Chain {
    tail_hash: Option<String>,
}

/// Tamper-evident, append-only, hash-chained audit log (spec §4.J).
///
/// Hash chaining is computed synchronously, under `chain`, at append
/// time; only the file write happens off the request-critical path, on
/// a background flush thread. This keeps queued entries in chain order
/// even when producers race each other, since the enqueue happens
/// inside the same critical section that advances the chain.
pub struct AuditLog {
    chain: Mutex<Chain>,
    sender: SyncSender<AuditEntry>,
    dropped_low_severity: Arc<AtomicU64>,
    flush_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuditLog {
    /// Opens (creating if absent) the log file at `path`, seeds the
    /// chain from its existing tail, and spawns the background flush
    /// thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let tail_hash = seed_from_tail(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AuditError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let (sender, receiver) = sync_channel(CHANNEL_CAPACITY);
        let dropped_low_severity = Arc::new(AtomicU64::new(0));
        let handle = spawn_flush_thread(file, receiver);

        Ok(Self {
            chain: Mutex::new(Chain { tail_hash }),
            sender,
            dropped_low_severity,
            flush_handle: Mutex::new(Some(handle)),
        })
    }

    /// In-memory only, for tests and short-lived processes that don't
    /// need a file-backed log.
    pub fn in_memory() -> (Self, Receiver<AuditEntry>) {
        let (sender, receiver) = sync_channel(CHANNEL_CAPACITY);
        let log = Self {
            chain: Mutex::new(Chain { tail_hash: None }),
            sender,
            dropped_low_severity: Arc::new(AtomicU64::new(0)),
            flush_handle: Mutex::new(None),
        };
        (log, receiver)
    }

    /// Appends an entry. High severity blocks the caller until there is
    /// room in the channel (a durable log can never silently lose a
    /// high-severity record); low severity uses a non-blocking send and
    /// drops (counting) the entry if the channel is full, per spec.md §5.
    pub fn append(
        &self,
        severity: Severity,
        direction: Direction,
        subject: &str,
        action: Option<&str>,
        allowed: bool,
        violations: Vec<String>,
        payload_hash: Option<String>,
    ) -> Result<String, AuditError> {
        let mut chain = self.chain.lock();
        let entry = build_entry(
            direction,
            subject,
            action,
            allowed,
            violations,
            payload_hash,
            chain.tail_hash.clone(),
        );
        let entry_hash = entry.entry_hash.clone();

        match severity {
            Severity::High => {
                self.sender.send(entry).map_err(|_| AuditError::ChannelClosed)?;
            }
            Severity::Low => match self.sender.try_send(entry) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped_low_severity.fetch_add(1, Ordering::Relaxed);
                    warn!("audit log queue full, dropped low-severity entry");
                }
                Err(TrySendError::Disconnected(_)) => return Err(AuditError::ChannelClosed),
            },
        }

        chain.tail_hash = Some(entry_hash.clone());
        Ok(entry_hash)
    }

    pub fn dropped_low_severity_count(&self) -> u64 {
        self.dropped_low_severity.load(Ordering::Relaxed)
    }

    pub fn current_tail_hash(&self) -> Option<String> {
        self.chain.lock().tail_hash.clone()
    }

    /// Drops the sender half, letting the flush thread drain and exit,
    /// then joins it. Call on shutdown; safe to skip in short-lived
    /// tests using [`AuditLog::in_memory`].
    pub fn shutdown(self) {
        drop(self.sender);
        if let Some(handle) = self.flush_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn spawn_flush_thread(mut file: File, receiver: Receiver<AuditEntry>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Ok(entry) = receiver.recv() {
            if let Err(e) = write_entry(&mut file, &entry) {
                error!(error = %e, "failed to flush audit entry to disk");
            }
        }
    })
}

fn write_entry(file: &mut File, entry: &AuditEntry) -> std::io::Result<()> {
    let line = serde_json::to_string(entry)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()
}

/// Reads the existing log (if any) to recover the current chain tail,
/// so a restarted process continues the same hash chain rather than
/// starting a fresh one.
fn seed_from_tail(path: &PathBuf) -> Result<Option<String>, AuditError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| AuditError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mut tail = None;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AuditError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| AuditError::Malformed {
            index,
            reason: e.to_string(),
        })?;
        tail = Some(entry.entry_hash);
    }
    Ok(tail)
}

/// Verifies every entry's hash and the chain linking it to its
/// predecessor. Returns the index of the first broken or tampered
/// entry, if any.
pub fn verify_integrity(entries: &[AuditEntry]) -> Result<(), AuditError> {
    let mut previous: Option<&str> = None;
    for (index, entry) in entries.iter().enumerate() {
        match (&entry.previous_entry_hash, previous) {
            (None, None) => {}
            (Some(got), Some(expected)) if got == expected => {}
            (Some(_), Some(_)) => return Err(AuditError::ChainBreak { index, prev_index: index - 1 }),
            (None, Some(_)) => return Err(AuditError::ChainBreak { index, prev_index: index - 1 }),
            (Some(_), None) => return Err(AuditError::UnexpectedPreviousHash(index)),
        }
        let recomputed = compute_entry_hash(entry);
        if recomputed != entry.entry_hash {
            return Err(AuditError::EntryTampered { index });
        }
        previous = Some(&entry.entry_hash);
    }
    Ok(())
}

/// Reads an audit log file back into memory, for verification or
/// recovery tooling. Not on the request-critical path.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AuditError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AuditError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| AuditError::Malformed {
            index,
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
