//! Compiles the active parameter set into a [`Matcher`].

use crate::error::{PolicyError, PolicyResult};
use crate::key::{ParameterKey, ValueKind};
use crate::matcher::{CompiledPolicy, Matcher};
use crate::model::ParameterRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Compile the given active records into a matcher.
///
/// Records under unrecognized keys are ignored. Unparseable values fall back
/// to the key's default with a warning. Fails with
/// [`PolicyError::Inconsistent`] when the minimum length exceeds the maximum.
pub fn compile(records: &[ParameterRecord]) -> PolicyResult<Matcher> {
    let raw = collect_raw_values(records);

    let min_len = resolve_integer(&raw, ParameterKey::MinLength);
    let max_len = resolve_integer(&raw, ParameterKey::MaxLength);
    if min_len > max_len {
        tracing::error!(min_len, max_len, "Password policy minimum length exceeds maximum length");
        return Err(PolicyError::Inconsistent { min_len, max_len });
    }

    let policy = CompiledPolicy {
        min_len,
        max_len,
        min_upper: resolve_integer(&raw, ParameterKey::MinUppercase),
        min_lower: resolve_integer(&raw, ParameterKey::MinLowercase),
        min_digits: resolve_integer(&raw, ParameterKey::MinDigits),
        min_special: resolve_integer(&raw, ParameterKey::MinSpecial),
        allowed_special: resolve_special(&raw),
    };

    let required = [
        policy.min_upper,
        policy.min_lower,
        policy.min_digits,
        policy.min_special,
    ]
    .into_iter()
    .fold(0usize, usize::saturating_add);
    if required > policy.max_len {
        tracing::warn!(
            required,
            max_len = policy.max_len,
            "Password policy class minimums exceed the maximum length; no password can satisfy it"
        );
    }

    let matcher = Matcher::new(policy);
    tracing::info!(pattern = %matcher.describe(), "Compiled password policy");
    Ok(matcher)
}

fn collect_raw_values(records: &[ParameterRecord]) -> BTreeMap<ParameterKey, &str> {
    let mut raw = BTreeMap::new();
    for record in records.iter().filter(|r| r.active) {
        match record.recognized_key() {
            Some(key) => {
                if raw.insert(key, record.value.as_str()).is_some() {
                    tracing::warn!(key = %key, "Multiple active records for policy key; using the last one");
                }
            }
            None => {
                tracing::debug!(key = %record.key, "Ignoring unrecognized policy key");
            }
        }
    }
    raw
}

fn resolve_integer(raw: &BTreeMap<ParameterKey, &str>, key: ParameterKey) -> usize {
    let fallback = || {
        key.default_value()
            .parse::<usize>()
            .unwrap_or_default()
    };
    let Some(value) = raw.get(&key) else {
        return fallback();
    };
    let lower = match key.kind() {
        ValueKind::Integer { min } => min,
        ValueKind::CharacterSet => 0,
    };

    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed >= lower => parsed,
        Ok(parsed) => {
            tracing::warn!(
                key = %key,
                value = parsed,
                minimum = lower,
                default = key.default_value(),
                "Policy value below its minimum; using default"
            );
            fallback()
        }
        Err(_) => {
            tracing::warn!(
                key = %key,
                value = %value,
                default = key.default_value(),
                "Policy value is not a non-negative integer; using default"
            );
            fallback()
        }
    }
}

fn resolve_special(raw: &BTreeMap<ParameterKey, &str>) -> BTreeSet<char> {
    let key = ParameterKey::AllowedSpecial;
    match raw.get(&key) {
        Some(value) if !value.is_empty() => value.chars().collect(),
        Some(_) => {
            tracing::warn!(
                key = %key,
                default = key.default_value(),
                "Allowed special characters are empty; using default"
            );
            key.default_value().chars().collect()
        }
        None => key.default_value().chars().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn records(pairs: &[(&str, &str)]) -> Vec<ParameterRecord> {
        let now = Utc::now();
        pairs
            .iter()
            .enumerate()
            .map(|(i, (key, value))| ParameterRecord {
                id: i as i64 + 1,
                type_id: i as i64 + 1,
                key: key.to_string(),
                description: None,
                value: value.to_string(),
                active: true,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn empty_set_compiles_to_defaults() {
        let matcher = compile(&[]).unwrap();
        let policy = matcher.policy();
        assert_eq!(policy.min_len, 8);
        assert_eq!(policy.max_len, 30);
        assert_eq!(policy.min_upper, 0);
        assert_eq!(policy.allowed_special, "-.#$%&".chars().collect());
        assert!(matcher.validate("abcdefgh"));
    }

    #[test]
    fn inconsistent_lengths_fail() {
        let err = compile(&records(&[
            ("password.min.length", "40"),
            ("password.max.length", "30"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::Inconsistent {
                min_len: 40,
                max_len: 30
            }
        ));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let matcher = compile(&records(&[
            ("password.min.length", "eight"),
            ("password.max.length", "-3"),
            ("password.min.digits", "2x"),
            ("password.allowed.special", ""),
        ]))
        .unwrap();
        let policy = matcher.policy();
        assert_eq!(policy.min_len, 8);
        assert_eq!(policy.max_len, 30);
        assert_eq!(policy.min_digits, 0);
        assert_eq!(policy.allowed_special, "-.#$%&".chars().collect());
    }

    #[test]
    fn zero_length_bound_falls_back() {
        let matcher = compile(&records(&[("password.min.length", "0")])).unwrap();
        assert_eq!(matcher.policy().min_len, 8);
    }

    #[test]
    fn unrecognized_keys_do_not_affect_the_policy() {
        let base = compile(&records(&[("password.min.length", "6")])).unwrap();
        let with_extra = compile(&records(&[
            ("password.min.length", "6"),
            ("some.other.key", "xyz"),
        ]))
        .unwrap();
        assert_eq!(base.policy(), with_extra.policy());
        assert_eq!(base.describe(), with_extra.describe());
    }

    #[test]
    fn inactive_records_are_skipped() {
        let mut input = records(&[("password.min.length", "12")]);
        input[0].active = false;
        assert_eq!(compile(&input).unwrap().policy().min_len, 8);
    }

    #[test]
    fn maximum_length_is_enforced_without_a_guard() {
        let matcher = compile(&records(&[
            ("password.min.length", "4"),
            ("password.max.length", "6"),
        ]))
        .unwrap();
        assert!(matcher.validate("abcdef"));
        assert!(!matcher.validate("abcdefg"));
        assert!(!matcher.describe().contains("(?!"));
    }

    #[test]
    fn largest_integer_maximum_compiles() {
        let max = usize::MAX.to_string();
        let matcher = compile(&records(&[("password.max.length", max.as_str())])).unwrap();
        assert_eq!(matcher.policy().max_len, usize::MAX);
        assert!(matcher.validate("abcdefgh"));
        assert!(matcher.describe().contains(&format!("{{8,{}}}", usize::MAX)));
    }

    #[test]
    fn huge_class_minimums_do_not_overflow() {
        let max = usize::MAX.to_string();
        let matcher = compile(&records(&[
            ("password.min.uppercase", max.as_str()),
            ("password.min.lowercase", max.as_str()),
        ]))
        .unwrap();
        assert_eq!(matcher.policy().min_upper, usize::MAX);
        assert!(!matcher.validate("ABCdef123"));
    }

    #[test]
    fn very_large_maximum_compiles_without_allocating() {
        let matcher = compile(&records(&[("password.max.length", "100000000000")])).unwrap();
        assert_eq!(matcher.policy().max_len, 100_000_000_000);
        assert!(matcher.validate("Password1#"));
    }

    #[test]
    fn duplicate_distinct_specials_collapse_into_a_set() {
        let matcher = compile(&records(&[("password.allowed.special", "##&&")])).unwrap();
        assert_eq!(matcher.policy().allowed_special.len(), 2);
    }
}
