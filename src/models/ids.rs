//! Strongly-typed ID wrappers for all entity types
//!
//! Using newtype wrappers prevents accidentally mixing up IDs from different
//! entity types at compile time. The wrapped value is an opaque string so that
//! documents written by other tools keep their ids verbatim; freshly minted ids
//! look like `u_1a2b3c4d5e6f`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of hex characters taken from a random UUID for a new id
const ID_HEX_LEN: usize = 12;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                let hex = Uuid::new_v4().simple().to_string();
                Self(format!("{}_{}", $prefix, &hex[..ID_HEX_LEN]))
            }

            /// Get the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId, "u");
define_id!(GroupId, "g");
define_id!(TransactionId, "t");
define_id!(PaymentId, "p");
