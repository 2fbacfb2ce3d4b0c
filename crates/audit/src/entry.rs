use kernel_core::{now_unix_ms, format_rfc3339_ms, AuditEntry, Direction};

/// Severity governs back-pressure behavior at enqueue time (spec.md §5,
/// §9): high-severity entries block the producer until there is room;
/// low-severity entries are dropped (and counted) when the queue is
/// full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    High,
}

/// Builds a finalized [`AuditEntry`]: `entry_hash` is computed over the
/// canonical form of every other field, and `previous_entry_hash` chains
/// it to whatever the caller passed as the current tail.
pub fn build_entry(
    direction: Direction,
    subject: &str,
    action: Option<&str>,
    allowed: bool,
    violations: Vec<String>,
    payload_hash: Option<String>,
    previous_entry_hash: Option<String>,
) -> AuditEntry {
    let mut entry = AuditEntry {
        timestamp: format_rfc3339_ms(now_unix_ms()),
        direction,
        subject: subject.to_string(),
        action: action.map(str::to_string),
        allowed,
        violations,
        payload_hash,
        previous_entry_hash,
        entry_hash: String::new(),
    };
    entry.entry_hash = compute_entry_hash(&entry);
    entry
}

/// SHA-256 of the canonical form of `entry` with `entry_hash` stripped.
pub fn compute_entry_hash(entry: &AuditEntry) -> String {
    let mut value = serde_json::to_value(entry).expect("AuditEntry has no non-serializable fields");
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("entry_hash");
    }
    kernel_core::canonical::sha256_hex(&value).expect("audit entry has no cycles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_hash_is_stable_for_identical_content() {
        let a = build_entry(Direction::Ingress, "alice", Some("read"), true, vec![], None, None);
        let b = build_entry(Direction::Ingress, "alice", Some("read"), true, vec![], None, None);
        // timestamps may legitimately differ; compare everything else.
        assert_eq!(a.subject, b.subject);
        assert_eq!(compute_entry_hash(&a).len(), 64);
    }

    #[test]
    fn chained_entries_carry_forward_the_previous_hash() {
        let first = build_entry(Direction::Ingress, "alice", None, true, vec![], None, None);
        let second = build_entry(
            Direction::Egress,
            "alice",
            None,
            true,
            vec![],
            None,
            Some(first.entry_hash.clone()),
        );
        assert_eq!(second.previous_entry_hash.as_deref(), Some(first.entry_hash.as_str()));
    }
}
