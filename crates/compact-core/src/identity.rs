//! # Record Identifiers
//!
//! Newtype wrappers for the UUID-keyed identifiers in the licensing core.
//! You cannot pass an `InvestigationId` where an `AdverseActionId` is
//! expected, even though both are UUIDs underneath.
//!
//! `Display` renders the bare hyphenated UUID because these values are
//! embedded verbatim in partition and sort keys.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its hyphenated string form.
            pub fn parse(s: &str) -> Result<Self, CoreError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidIdentifier {
                        kind: $kind,
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a licensed provider (the root aggregate).
    ProviderId,
    "provider id"
);

uuid_identifier!(
    /// Unique identifier for an adverse action (encumbrance) record.
    AdverseActionId,
    "adverse action id"
);

uuid_identifier!(
    /// Unique identifier for an investigation record.
    InvestigationId,
    "investigation id"
);
