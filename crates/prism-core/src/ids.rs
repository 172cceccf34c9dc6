use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! branded_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

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

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(ResourceId, "res");

/// Stable token identifying an immutable record (content-hash-like).
/// Tokens originate from providers and are never minted by the engine.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectToken(String);

impl SubjectToken {
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for navigation hints and logs.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Display for SubjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_has_prefix() {
        let id = ResourceId::new();
        assert!(id.as_str().starts_with("res_"), "got: {id}");
    }

    #[test]
    fn resource_ids_are_unique() {
        let a = ResourceId::new();
        let b = ResourceId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = ResourceId::new();
        let s = id.to_string();
        let parsed: ResourceId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn resource_id_serde_roundtrip() {
        let id = ResourceId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn subject_token_equality_is_by_value() {
        let a = SubjectToken::from_raw("f00dfeedcafe");
        let b = SubjectToken::from_raw("f00dfeedcafe");
        assert_eq!(a, b);
    }

    #[test]
    fn subject_token_short() {
        let t = SubjectToken::from_raw("0123456789abcdef");
        assert_eq!(t.short(), "01234567");

        let tiny = SubjectToken::from_raw("ab");
        assert_eq!(tiny.short(), "ab");
    }

    #[test]
    fn subject_token_serde_is_transparent() {
        let t = SubjectToken::from_raw("deadbeef");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#""deadbeef""#);
    }
}
