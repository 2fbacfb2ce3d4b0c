//! The action gate: orchestrates the five-stage pipeline (spec §4.H).
//!
//! `KernelContext::governed` is the only way a handler is ever invoked.
//! Handlers are plain closures, never exported as routes in their own
//! right, so a call path that bypassed the gate would be a structural,
//! reviewable defect rather than a runtime possibility to guard
//! against.

use std::panic::{self, AssertUnwindSafe};

use audit::Severity;
use cdi::ActionContext;
use cif::{EgressContext, IngressContext};
use kernel_core::payload::{self, PayloadRef};
use kernel_core::{Direction, GovernanceProof, Verdict};
use proof::ProofBuilder;
use rand::RngCore;
use serde_json::{json, Value};
use tokens::Expected;
use tracing::warn;

use crate::context::KernelContext;

/// One external, governed request.
pub struct GovernedRequest {
    pub client_id: String,
    pub actor: Option<String>,
    pub route: Option<String>,
    pub method: Option<String>,
    pub payload: PayloadRef,
    pub now_ms: u64,
}

#[derive(Debug, Clone)]
pub struct GovernedResponse {
    pub verdict: Verdict,
    pub body: Value,
    pub proof: GovernanceProof,
}

impl KernelContext {
    /// `governed(action_id, handler)` returns a closure implementing
    /// every step of spec.md §4.H in order. Any step's failure produces
    /// a denial proof, records it to the audit log, and short-circuits
    /// — the handler is never invoked for a request that failed
    /// ingress or the pre-action check.
    pub fn governed<'a, H>(
        &'a self,
        action_id: &'a str,
        handler: H,
    ) -> impl Fn(GovernedRequest) -> GovernedResponse + 'a
    where
        H: Fn(&Value) -> Value + 'a,
    {
        move |request| self.run_governed(action_id, &handler, request)
    }

    fn run_governed(
        &self,
        action_id: &str,
        handler: &dyn Fn(&Value) -> Value,
        request: GovernedRequest,
    ) -> GovernedResponse {
        let request_id = random_request_id();
        let span = tracing::info_span!("governed_action", request_id = %request_id, action_id = %action_id);
        let _guard = span.enter();

        // Step 1: request_fingerprint = SHA-256(canonical(request)).
        // A cyclic or otherwise non-canonicalizable payload folds into
        // the same malformed outcome cif.ingress would produce.
        let envelope = match payload::to_canonical_value(&request.payload) {
            Ok(p) => json!({
                "action": action_id,
                "actor": request.actor,
                "route": request.route,
                "method": request.method,
                "payload": p,
            }),
            Err(_) => Value::Null,
        };
        let fingerprint = kernel_core::canonical::sha256_hex(&envelope).unwrap_or_default();

        let mut builder = ProofBuilder::new(request_id, fingerprint.clone());

        // Posture precondition: a locked FAIL_CLOSED (or a DEFENSIVE
        // posture denying this operation's class) refuses the request
        // before any stage runs, per spec.md §4.I / §7. Side-effecting
        // actions are treated as writes; unregistered actions are
        // treated as writes too, since an unknown action is the more
        // restrictive case to assume.
        let operation = match registry::validate(action_id) {
            Ok(entry) if !entry.side_effect => posture::Operation::Read,
            _ => posture::Operation::Write,
        };
        if let Err(_posture_err) = self.posture.assert_allowed(operation) {
            warn!(posture = ?self.posture.current(), "request refused by posture policy");
            let _ = builder.add_stage(
                kernel_core::STAGE_CIF_INGRESS,
                &envelope,
                &json!({"allowed": false, "violations": [kernel_core::codes::POSTURE_VIOLATION]}),
            );
            self.record_audit(
                Direction::Ingress,
                request.actor.as_deref().unwrap_or(&request.client_id),
                Some(action_id),
                false,
                vec![kernel_core::codes::POSTURE_VIOLATION.to_string()],
            );
            return self.deny(builder, Verdict::Deny);
        }

        // Step 3: cif.ingress.
        let ingress_ctx = IngressContext {
            client_id: request.client_id.clone(),
            payload: request.payload.clone(),
            now_ms: request.now_ms,
        };
        let ingress_result = self.cif.ingress(ingress_ctx);
        let _ = builder.add_stage(
            kernel_core::STAGE_CIF_INGRESS,
            &envelope,
            &json!({
                "allowed": ingress_result.allowed,
                "quarantined": ingress_result.quarantined,
                "violations": ingress_result.violations,
            }),
        );
        self.record_audit(
            Direction::Ingress,
            request.actor.as_deref().unwrap_or(&request.client_id),
            Some(action_id),
            ingress_result.allowed,
            ingress_result.violations.clone(),
        );
        if !ingress_result.allowed {
            return self.deny(builder, Verdict::Deny);
        }

        // Step 4: cdi.check_action.
        let action_ctx = ActionContext {
            actor: request.actor.clone(),
            action: action_id.to_string(),
            route: request.route.clone(),
            method: request.method.clone(),
            request_hash: fingerprint.clone(),
        };
        let action_result = self.cdi.check_action(&action_ctx, self.genome.as_ref(), &self.boot_key);
        let _ = builder.add_stage(
            kernel_core::STAGE_CDI_ACTION,
            &json!({"action": action_id, "actor": request.actor}),
            &json!({"verdict": verdict_str(action_result.verdict), "reason": action_result.reason}),
        );
        self.record_audit(
            Direction::Action,
            request.actor.as_deref().unwrap_or(&request.client_id),
            Some(action_id),
            action_result.verdict == Verdict::Allow,
            action_result.reason.clone().into_iter().collect(),
        );
        if action_result.verdict != Verdict::Allow {
            return self.deny(builder, action_result.verdict);
        }

        // Step 5: assert token validity before invoking the handler.
        let Some(token) = action_result.capability_token else {
            warn!("cdi allowed the action but minted no token");
            let _ = builder.add_stage(
                kernel_core::STAGE_HANDLER,
                &Value::Null,
                &json!({"error": kernel_core::codes::TOKEN_MISSING}),
            );
            return self.deny(builder, Verdict::Deny);
        };
        let expected = Expected {
            action_id: Some(action_id.to_string()),
            actor: request.actor.clone(),
        };
        if let Err(e) = self
            .token_validator
            .validate(&token, &self.boot_key, &expected, true)
        {
            warn!(error = %e, "capability token failed validation, refusing to invoke handler");
            let _ = builder.add_stage(
                kernel_core::STAGE_HANDLER,
                &json!({"token_id": token.token_id}),
                &json!({"error": kernel_core::codes::TOKEN_INVALID, "reason": e.to_string()}),
            );
            return self.deny(builder, Verdict::Deny);
        }

        let handler_input = ingress_result.sanitized_payload.clone();
        let started = std::time::Instant::now();
        let handler_output = match panic::catch_unwind(AssertUnwindSafe(|| handler(&handler_input))) {
            Ok(output) => output,
            Err(_) => {
                warn!("handler panicked");
                let _ = builder.add_stage(
                    kernel_core::STAGE_HANDLER,
                    &handler_input,
                    &json!({"error": "HANDLER_PANIC"}),
                );
                return self.deny(builder, Verdict::Deny);
            }
        };
        if started.elapsed().as_millis() as u64 > self.handler_timeout_ms {
            warn!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                budget_ms = self.handler_timeout_ms,
                "handler exceeded its deadline, discarding result"
            );
            let _ = builder.add_stage(
                kernel_core::STAGE_HANDLER,
                &handler_input,
                &json!({"error": kernel_core::codes::HANDLER_TIMEOUT}),
            );
            return self.deny(builder, Verdict::Deny);
        }
        let _ = builder.add_stage(kernel_core::STAGE_HANDLER, &handler_input, &handler_output);

        // Step 6: cdi.check_output.
        let output_result = self.cdi.check_output(&handler_output, None);
        let _ = builder.add_stage(
            kernel_core::STAGE_CDI_OUTPUT,
            &handler_output,
            &json!({"allowed": output_result.allowed, "violations": output_result.violations}),
        );
        self.record_audit(
            Direction::Output,
            request.actor.as_deref().unwrap_or(&request.client_id),
            Some(action_id),
            output_result.allowed,
            output_result.violations.clone(),
        );
        if !output_result.allowed {
            return self.deny(builder, Verdict::Deny);
        }

        // Step 7: cif.egress.
        let egress_ctx = EgressContext {
            payload: payload::from_json(&output_result.redacted_response),
        };
        let egress_result = self.cif.egress(egress_ctx);
        let _ = builder.add_stage(
            kernel_core::STAGE_CIF_EGRESS,
            &output_result.redacted_response,
            &json!({"allowed": egress_result.allowed, "violations": egress_result.violations}),
        );
        self.record_audit(
            Direction::Egress,
            request.actor.as_deref().unwrap_or(&request.client_id),
            Some(action_id),
            egress_result.allowed,
            egress_result.violations.clone(),
        );
        if !egress_result.allowed {
            return self.deny(builder, Verdict::Deny);
        }

        // Step 8: allow.
        builder.set_verdict(Verdict::Allow);
        let proof = builder
            .build(&self.boot_key)
            .expect("every stage hash was computed from canonicalizable values");

        GovernedResponse {
            verdict: Verdict::Allow,
            body: egress_result.sanitized_payload,
            proof,
        }
    }

    fn deny(&self, mut builder: ProofBuilder, verdict: Verdict) -> GovernedResponse {
        builder.set_verdict(verdict);
        let proof = builder
            .build(&self.boot_key)
            .expect("denial proofs always carry at least one stage");
        GovernedResponse {
            verdict,
            body: Value::Null,
            proof,
        }
    }

    fn record_audit(
        &self,
        direction: Direction,
        subject: &str,
        action: Option<&str>,
        allowed: bool,
        violations: Vec<String>,
    ) {
        let severity = if allowed { Severity::Low } else { Severity::High };
        if let Err(e) = self
            .audit
            .append(severity, direction, subject, action, allowed, violations, None)
        {
            warn!(error = %e, "failed to append audit entry");
        }
    }
}

fn verdict_str(v: Verdict) -> &'static str {
    match v {
        Verdict::Allow => "allow",
        Verdict::Deny => "deny",
        Verdict::Uncertain => "uncertain",
    }
}

fn random_request_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
