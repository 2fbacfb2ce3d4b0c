use kernel_core::{CapabilityToken, Genome, TokenContext, Verdict};
use proof::BootKey;
use tracing::{debug, warn};

use crate::codes;
use crate::forbidden;
use crate::Cdi;

#[derive(Debug, Clone)]
pub struct ActionContext {
    pub actor: Option<String>,
    pub action: String,
    pub route: Option<String>,
    pub method: Option<String>,
    pub request_hash: String,
}

#[derive(Debug, Clone)]
pub struct CheckActionResult {
    pub verdict: Verdict,
    pub reason: Option<String>,
    pub capability_token: Option<CapabilityToken>,
}

impl CheckActionResult {
    fn deny(code: &str, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason: Some(format!("[{code}] {}", reason.into())),
            capability_token: None,
        }
    }

    fn uncertain(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Uncertain,
            reason: Some(format!("[{}] {}", codes::CDI_UNCERTAIN, reason.into())),
            capability_token: None,
        }
    }
}

impl Cdi {
    /// Runs every action-check step in spec.md §4.G order.
    pub fn check_action(
        &self,
        ctx: &ActionContext,
        genome: Option<&Genome>,
        boot_key: &BootKey,
    ) -> CheckActionResult {
        // 1. Consent.
        if let Some(actor) = &ctx.actor {
            match self.consent.state(actor) {
                crate::consent::ConsentState::Stopped => {
                    warn!(actor, "consent-stop active");
                    return CheckActionResult::deny(
                        codes::CDI_CONSENT_STOP,
                        "consent-stop active",
                    );
                }
                crate::consent::ConsentState::Paused => {
                    return CheckActionResult::deny(
                        codes::CDI_CONSENT_STOP,
                        format!("consent is paused for actor '{actor}'"),
                    );
                }
                crate::consent::ConsentState::Active => {}
            }
        }

        // 2. Capability ceiling, only when a genome is loaded.
        if let Some(genome) = genome {
            if let Some(denial) = capability_ceiling_denial(genome, &ctx.action) {
                return denial;
            }
        }

        // 3. Prohibited-class check.
        if let Some(class) = forbidden::lookup(&ctx.action) {
            warn!(action = %ctx.action, "forbidden action class");
            return CheckActionResult::deny(
                codes::CDI_FORBIDDEN_CLASS,
                format!("{} (alternative: {})", class.reason, class.alternative),
            );
        }

        // 4. Uncertainty: required context fields missing.
        let Some(actor) = &ctx.actor else {
            let result = CheckActionResult::uncertain("actor is required but missing");
            return if self.config.strict_mode {
                CheckActionResult {
                    verdict: Verdict::Deny,
                    ..result
                }
            } else {
                result
            };
        };
        if ctx.action.trim().is_empty() {
            let result = CheckActionResult::uncertain("action is required but missing");
            return if self.config.strict_mode {
                CheckActionResult {
                    verdict: Verdict::Deny,
                    ..result
                }
            } else {
                result
            };
        }

        // 5. Mint a token scoped to this action.
        let context = TokenContext {
            route: ctx.route.clone(),
            method: ctx.method.clone(),
            request_hash: ctx.request_hash.clone(),
        };
        match tokens::mint(&ctx.action, actor, context, boot_key, None, None) {
            Ok(token) => {
                debug!(action = %ctx.action, actor, "minted capability token");
                CheckActionResult {
                    verdict: Verdict::Allow,
                    reason: None,
                    capability_token: Some(token),
                }
            }
            Err(e) => CheckActionResult::deny("TOKEN_MINT_FAILED", e.to_string()),
        }
    }
}

fn capability_ceiling_denial(genome: &Genome, action: &str) -> Option<CheckActionResult> {
    for capability in &genome.capabilities {
        if capability.deny_actions.iter().any(|a| a == action) {
            return Some(CheckActionResult::deny(
                codes::CDI_CAPABILITY_CEILING,
                format!("capability '{}' explicitly denies action '{action}'", capability.cap_id),
            ));
        }
    }
    let allowed = genome
        .capabilities
        .iter()
        .any(|c| c.allow_actions.iter().any(|a| a == action));
    if !allowed {
        return Some(CheckActionResult::deny(
            codes::CDI_CAPABILITY_CEILING,
            format!("action '{action}' is not in any capability's allow_actions (capability-ceiling not satisfied)"),
        ));
    }
    None
}
