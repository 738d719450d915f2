//! Recognized policy parameter keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of the value stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Non-negative integer with a lower bound.
    Integer { min: usize },
    /// Non-empty string of characters, treated as a literal set.
    CharacterSet,
}

/// Closed set of parameter keys that influence password validation.
///
/// Records stored under any other key are kept but ignored by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterKey {
    #[serde(rename = "password.min.length")]
    MinLength,
    #[serde(rename = "password.max.length")]
    MaxLength,
    #[serde(rename = "password.min.uppercase")]
    MinUppercase,
    #[serde(rename = "password.min.lowercase")]
    MinLowercase,
    #[serde(rename = "password.min.digits")]
    MinDigits,
    #[serde(rename = "password.min.special")]
    MinSpecial,
    #[serde(rename = "password.allowed.special")]
    AllowedSpecial,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 7] = [
        ParameterKey::MinLength,
        ParameterKey::MaxLength,
        ParameterKey::MinUppercase,
        ParameterKey::MinLowercase,
        ParameterKey::MinDigits,
        ParameterKey::MinSpecial,
        ParameterKey::AllowedSpecial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKey::MinLength => "password.min.length",
            ParameterKey::MaxLength => "password.max.length",
            ParameterKey::MinUppercase => "password.min.uppercase",
            ParameterKey::MinLowercase => "password.min.lowercase",
            ParameterKey::MinDigits => "password.min.digits",
            ParameterKey::MinSpecial => "password.min.special",
            ParameterKey::AllowedSpecial => "password.allowed.special",
        }
    }

    /// Look up a recognized key by its dotted name.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ParameterKey::MinLength | ParameterKey::MaxLength => ValueKind::Integer { min: 1 },
            ParameterKey::MinUppercase
            | ParameterKey::MinLowercase
            | ParameterKey::MinDigits
            | ParameterKey::MinSpecial => ValueKind::Integer { min: 0 },
            ParameterKey::AllowedSpecial => ValueKind::CharacterSet,
        }
    }

    /// Value used when the key has no active record or its value is unusable.
    pub fn default_value(&self) -> &'static str {
        match self {
            ParameterKey::MinLength => "8",
            ParameterKey::MaxLength => "30",
            ParameterKey::MinUppercase
            | ParameterKey::MinLowercase
            | ParameterKey::MinDigits
            | ParameterKey::MinSpecial => "0",
            ParameterKey::AllowedSpecial => "-.#$%&",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ParameterKey::MinLength => "minimum password length",
            ParameterKey::MaxLength => "maximum password length",
            ParameterKey::MinUppercase => "minimum number of uppercase letters",
            ParameterKey::MinLowercase => "minimum number of lowercase letters",
            ParameterKey::MinDigits => "minimum number of digits",
            ParameterKey::MinSpecial => "minimum number of special characters",
            ParameterKey::AllowedSpecial => "special characters a password may contain",
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the recognized keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized policy key: {}", self.0)
    }
}

impl std::error::Error for UnknownKey {}

impl FromStr for ParameterKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownKey(s.to_string()))
    }
}
