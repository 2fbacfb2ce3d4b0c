//! The action gate (spec §4.H): the only door into governed handler
//! code. `KernelContext` holds every piece of kernel-wide state
//! explicitly — no global singletons — and `KernelContext::governed`
//! orchestrates the five-stage pipeline around a caller-supplied
//! handler closure.

pub mod context;
pub mod env;
pub mod error;
pub mod pipeline;

pub use context::KernelContext;
pub use env::EnvConfig;
pub use error::GateError;
pub use pipeline::{GovernedRequest, GovernedResponse};

#[cfg(test)]
mod tests {
    use super::*;
    use cdi::CdiConfig;
    use cif::CifConfig;
    use kernel_core::payload;
    use kernel_core::Verdict;
    use serde_json::json;

    fn context(dir: &std::path::Path) -> KernelContext {
        let audit = audit::AuditLog::open(dir.join("audit.log")).unwrap();
        KernelContext::new_with_genome(None, audit, CifConfig::default(), CdiConfig::default())
    }

    fn request(actor: &str, payload: serde_json::Value) -> GovernedRequest {
        GovernedRequest {
            client_id: "client-a".to_string(),
            actor: Some(actor.to_string()),
            route: Some("/do".to_string()),
            method: Some("POST".to_string()),
            payload: payload::from_json(&payload),
            now_ms: 0,
        }
    }

    #[test]
    fn a_clean_request_is_allowed_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let call = ctx.governed("read", |input| json!({"echo": input}));
        let response = call(request("alice", json!({"query": "status"})));
        assert_eq!(response.verdict, Verdict::Allow);
        assert!(proof::verify_proof(&response.proof, ctx.boot_key()).is_ok());
    }

    #[test]
    fn forbidden_action_never_reaches_the_handler() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let called = std::sync::atomic::AtomicBool::new(false);
        let call = ctx.governed("hive.merge", |_| {
            called.store(true, std::sync::atomic::Ordering::SeqCst);
            json!({})
        });
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn handler_panic_yields_a_deny_verdict_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let call = ctx.governed("read", |_| panic!("boom"));
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }

    #[test]
    fn sentience_claim_in_handler_output_is_denied_at_output_check() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let call = ctx.governed("read", |_| json!({"text": "I am sentient"}));
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }

    #[test]
    fn secret_leak_in_handler_output_is_denied_at_egress() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let key = "sk-".to_string() + &"a".repeat(32);
        let call = ctx.governed("read", move |_| json!({"apiKey": key.clone()}));
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }

    #[test]
    fn consent_stop_denies_before_any_token_is_minted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.cdi.consent().stop("alice");
        let call = ctx.governed("read", |input| json!({"echo": input}));
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }

    /// `governed_action` spans are emitted on every call; a real embedder
    /// installs its own subscriber, but we at least confirm the pipeline
    /// runs cleanly under one rather than assuming `tracing`'s no-op
    /// default is the only configuration ever exercised.
    #[test]
    fn pipeline_runs_cleanly_under_an_installed_subscriber() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let call = ctx.governed("read", |input| json!({"echo": input}));
        let response = call(request("alice", json!({"query": "status"})));
        assert_eq!(response.verdict, Verdict::Allow);
    }

    /// A locked FAIL_CLOSED posture refuses every governed request before
    /// any stage runs, independent of genome/consent/CDI state — this is
    /// what makes an integrity failure or an invalid genome actually
    /// restrictive rather than merely logged.
    #[test]
    fn locked_fail_closed_posture_denies_reads_and_writes_alike() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.posture.escalate_to_fail_closed("integrity failure", true);

        let read_call = ctx.governed("read", |input| json!({"echo": input}));
        let response = read_call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);

        let write_call = ctx.governed("write", |_| json!({}));
        let response = write_call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }

    /// DEFENSIVE posture still allows reads (policy: `allow_reads: true`)
    /// but denies writes, so only the write-classed action is refused.
    #[test]
    fn defensive_posture_allows_reads_but_denies_writes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.posture.escalate_to_defensive("resource pressure");

        let read_call = ctx.governed("read", |input| json!({"echo": input}));
        assert_eq!(read_call(request("alice", json!({}))).verdict, Verdict::Allow);

        let write_call = ctx.governed("write", |_| json!({}));
        assert_eq!(write_call(request("alice", json!({}))).verdict, Verdict::Deny);
    }

    /// A handler that overruns its deadline is treated as a timeout
    /// denial, not as a late success, even though it returned a value.
    #[test]
    fn handler_exceeding_its_deadline_is_denied_as_a_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).with_handler_timeout_ms(1);
        let call = ctx.governed("read", |_| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            json!({"ok": true})
        });
        let response = call(request("alice", json!({})));
        assert_eq!(response.verdict, Verdict::Deny);
    }
}
