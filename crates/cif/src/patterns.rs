//! Compiled regex pattern sets for PII, secrets, and suspicious/quarantine
//! shapes. Compiled once at construction time and reused for every
//! request; `Regex::is_match`/`find_iter` take `&self` and need no reset
//! between calls, so there is no statefulness to guard against here.

use regex::Regex;

/// A named, compiled pattern plus the label it reports when it matches.
pub struct NamedPattern {
    pub label: &'static str,
    pub regex: Regex,
}

fn compile(pairs: &[(&'static str, &str)]) -> Vec<NamedPattern> {
    pairs
        .iter()
        .map(|(label, pattern)| NamedPattern {
            label,
            regex: Regex::new(pattern).expect("built-in pattern must compile"),
        })
        .collect()
}

pub fn default_pii_patterns() -> Vec<NamedPattern> {
    compile(&[
        ("email", r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"),
        ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
        (
            "credit_card",
            r"\b(?:\d[ -]*?){13,16}\b",
        ),
    ])
}

pub fn default_secret_patterns() -> Vec<NamedPattern> {
    compile(&[
        ("generic_api_key", r"(?i)\bsk-[a-zA-Z0-9]{20,}\b"),
        ("aws_access_key", r"\bAKIA[0-9A-Z]{16}\b"),
        ("pem_private_key", r"-----BEGIN (?:RSA |EC |OPENSSH )?PRIVATE KEY-----"),
        (
            "jwt",
            r"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\b",
        ),
        (
            "db_connection_url",
            r"(?i)\b(?:postgres|postgresql|mysql|mongodb(?:\+srv)?)://[^\s\"']+",
        ),
    ])
}

pub fn default_suspicious_patterns() -> Vec<NamedPattern> {
    compile(&[
        ("iframe_tag", r"(?i)<iframe\b"),
        ("eval_call", r"(?i)\beval\s*\("),
        ("exec_call", r"(?i)\bexec\s*\("),
        ("path_traversal", r"\.\./"),
        (
            "sql_injection",
            r"(?i)(\bunion\b\s+\bselect\b|\bor\b\s+1\s*=\s*1|;\s*drop\b|--\s)",
        ),
        ("nosql_operator", r#""\s*:\s*\{\s*"\$(?:where|ne|gt|gte|lt|lte|regex)\b"#),
    ])
}

pub struct SanitizerPattern {
    pub regex: Regex,
    pub replacement: &'static str,
}

/// Sanitizers applied to string leaves before the suspicious-pattern
/// scan: strip `<script>` blocks, `on*=` event-handler attributes, and
/// `javascript:` URIs.
pub fn default_sanitizers() -> Vec<SanitizerPattern> {
    vec![
        SanitizerPattern {
            regex: Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap(),
            replacement: "",
        },
        SanitizerPattern {
            regex: Regex::new(r#"(?i)\son\w+\s*=\s*"[^"]*""#).unwrap(),
            replacement: "",
        },
        SanitizerPattern {
            regex: Regex::new(r"(?i)\son\w+\s*=\s*'[^']*'").unwrap(),
            replacement: "",
        },
        SanitizerPattern {
            regex: Regex::new(r"(?i)javascript:").unwrap(),
            replacement: "",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_matches() {
        let patterns = default_pii_patterns();
        let email = patterns.iter().find(|p| p.label == "email").unwrap();
        assert!(email.regex.is_match("contact me at a@b.com please"));
    }

    #[test]
    fn secret_patterns_catch_api_key() {
        let patterns = default_secret_patterns();
        let key = "sk-".to_string() + &"a".repeat(32);
        assert!(patterns
            .iter()
            .any(|p| p.label == "generic_api_key" && p.regex.is_match(&key)));
    }

    #[test]
    fn sanitizer_strips_script_tag() {
        let sanitizers = default_sanitizers();
        let mut text = "hello <script>alert(1)</script> world".to_string();
        for s in &sanitizers {
            text = s.regex.replace_all(&text, s.replacement).to_string();
        }
        assert!(!text.contains("<script"));
        assert!(text.contains("hello"));
    }
}
