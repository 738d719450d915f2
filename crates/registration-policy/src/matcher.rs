//! Compiled password matcher.

use std::collections::BTreeSet;

/// Fully resolved password policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    pub min_len: usize,
    pub max_len: usize,
    pub min_upper: usize,
    pub min_lower: usize,
    pub min_digits: usize,
    pub min_special: usize,
    pub allowed_special: BTreeSet<char>,
}

impl CompiledPolicy {
    /// Render the operator-facing pattern for this policy.
    pub(crate) fn render_pattern(&self) -> String {
        let quoted: String = self
            .allowed_special
            .iter()
            .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
            .collect();

        let mut pattern = format!("^(?=.{{{},{}}})", self.min_len, self.max_len);

        let classes = [
            (self.min_upper, "[A-Z]".to_string()),
            (self.min_lower, "[a-z]".to_string()),
            (self.min_digits, "\\d".to_string()),
            (self.min_special, format!("[{}]", quoted)),
        ];
        for (count, class) in classes {
            if count > 0 {
                pattern.push_str(&format!("(?=(?:.*{}){{{},}})", class, count));
            }
        }

        pattern.push_str(&format!("[A-Za-z\\d{}]*$", quoted));
        pattern
    }
}

/// Immutable password predicate built from a [`CompiledPolicy`].
///
/// Evaluation is pure and allocation-free, so a matcher can be shared across
/// threads behind an `Arc` without synchronization. Both length bounds are
/// checked directly on the code-point count.
#[derive(Debug, Clone)]
pub struct Matcher {
    policy: CompiledPolicy,
    pattern: String,
}

impl Matcher {
    pub(crate) fn new(policy: CompiledPolicy) -> Self {
        let pattern = policy.render_pattern();
        Self { policy, pattern }
    }

    pub fn policy(&self) -> &CompiledPolicy {
        &self.policy
    }

    /// Human-readable pattern equivalent to [`Matcher::validate`].
    pub fn describe(&self) -> &str {
        &self.pattern
    }

    pub fn validate(&self, password: &str) -> bool {
        let policy = &self.policy;
        let mut len = 0usize;
        let (mut upper, mut lower, mut digits, mut special) = (0usize, 0usize, 0usize, 0usize);

        for c in password.chars() {
            len += 1;
            if c.is_ascii_uppercase() {
                upper += 1;
            } else if c.is_ascii_lowercase() {
                lower += 1;
            } else if c.is_ascii_digit() {
                digits += 1;
            } else if policy.allowed_special.contains(&c) {
                special += 1;
            } else {
                return false;
            }
        }

        len >= policy.min_len
            && len <= policy.max_len
            && upper >= policy.min_upper
            && lower >= policy.min_lower
            && digits >= policy.min_digits
            && special >= policy.min_special
    }
}
