//! # Compact and Jurisdiction Codes
//!
//! A compact is the multi-jurisdiction licensing agreement that forms the
//! top-level tenant boundary (`aslp`, `octp`, `coun`). A jurisdiction is a
//! member state or territory, identified by its lowercase postal
//! abbreviation (`oh`, `ky`, `dc`). License types are keyed by a short
//! lowercase abbreviation (`slp`, `aud`, `ot`).
//!
//! All three appear verbatim inside record keys, so their constructors
//! reject anything that could collide with a key delimiter (`#`, `/`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

fn validate_code(
    kind: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, CoreError> {
    let normalized = value.trim().to_ascii_lowercase();
    let reject = |reason: String| CoreError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason,
    };
    if normalized.len() < min || normalized.len() > max {
        return Err(reject(format!("length must be between {min} and {max}")));
    }
    if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(reject("only ASCII letters and digits are allowed".to_string()));
    }
    Ok(normalized)
}

/// Code of a licensing compact, e.g. `aslp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompactCode(String);

impl CompactCode {
    /// Validate and normalize (lowercase) a compact code.
    pub fn new(code: &str) -> Result<Self, CoreError> {
        validate_code("compact", code, 2, 12).map(Self)
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Postal abbreviation of a member jurisdiction, e.g. `oh`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
    /// Validate and normalize (lowercase) a jurisdiction abbreviation.
    pub fn new(code: &str) -> Result<Self, CoreError> {
        let normalized = validate_code("jurisdiction", code, 2, 2)?;
        if !normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::InvalidIdentifier {
                kind: "jurisdiction",
                value: code.to_string(),
                reason: "postal abbreviations are alphabetic".to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// The normalized abbreviation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Abbreviation of a license type within a compact, e.g. `slp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseTypeAbbr(String);

impl LicenseTypeAbbr {
    /// Validate and normalize (lowercase) a license type abbreviation.
    pub fn new(abbr: &str) -> Result<Self, CoreError> {
        validate_code("license type abbreviation", abbr, 1, 12).map(Self)
    }

    /// The normalized abbreviation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! code_conversions {
    ($name:ident) => {
        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

code_conversions!(CompactCode);
code_conversions!(Jurisdiction);
code_conversions!(LicenseTypeAbbr);
