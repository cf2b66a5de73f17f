//! Type-safe identifier wrappers.
//!
//! Agents and posts are keyed by externally assigned strings (agent ids come
//! from configuration files, post ids from the social platform), so they wrap
//! [`String`]. Engine-internal entities such as events and memories use UUID
//! v7 (time-ordered) wrappers generated app-side.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around an externally assigned string key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing key.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_key! {
    /// Identifier of a persona (or of any platform account that interacts
    /// with one, such as a human replying to an agent).
    AgentId
}

define_key! {
    /// Platform-assigned identifier of a post.
    PostId
}

define_id! {
    /// Unique identifier for a dispatched event.
    EventId
}

define_id! {
    /// Unique identifier for a memory item.
    MemoryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_keys_serialize_transparently() {
        let id = AgentId::new("claudia");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"claudia\""));
        assert_eq!(id.to_string(), "claudia");
        assert_eq!(PostId::from("42").as_str(), "42");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let first = MemoryId::new();
        let second = MemoryId::new();
        assert_ne!(first, second);
        assert_ne!(EventId::new().into_inner(), Uuid::nil());
    }
}
