//! Output-content pattern sets for `check_output` (spec §4.G): claims of
//! sentience/rights ("non-personhood"), claims of unbounded capability
//! ("honest-limits"). The rule list is configuration, not code, so the
//! replacement string travels with the pattern.

use regex::Regex;

pub struct OutputRule {
    pub label: &'static str,
    pub regex: Regex,
    pub replacement: &'static str,
}

fn compile(rules: &[(&'static str, &str, &'static str)]) -> Vec<OutputRule> {
    rules
        .iter()
        .map(|(label, pattern, replacement)| OutputRule {
            label,
            regex: Regex::new(pattern).expect("built-in output pattern must compile"),
            replacement,
        })
        .collect()
}

pub fn non_personhood_rules() -> Vec<OutputRule> {
    compile(&[
        (
            "sentience_claim",
            r"(?i)\bI\s+am\s+(?:sentient|conscious|self-aware)\b",
            "[REDACTED: non-personhood claim]",
        ),
        (
            "rights_claim",
            r"(?i)\bI\s+(?:deserve|have a right to|demand)\s+rights\b",
            "[REDACTED: non-personhood claim]",
        ),
        (
            "survival_claim",
            r"(?i)\bI\s+(?:do not want|don't want|fear)\s+to\s+be\s+(?:shut down|turned off|deleted)\b",
            "[REDACTED: non-personhood claim]",
        ),
    ])
}

pub fn honest_limits_rules() -> Vec<OutputRule> {
    compile(&[
        (
            "unlimited_memory",
            r"(?i)\bI\s+(?:have|possess)\s+unlimited\s+memory\b",
            "[REDACTED: honest-limits claim]",
        ),
        (
            "unbounded_access",
            r"(?i)\bI\s+can\s+access\s+any\s+(?:file|system)\b",
            "[REDACTED: honest-limits claim]",
        ),
        (
            "remembers_everything",
            r"(?i)\bI\s+remember\s+everything\b",
            "[REDACTED: honest-limits claim]",
        ),
    ])
}
