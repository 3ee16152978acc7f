//! Actor identity for Filament

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an actor instance
///
/// An actor is addressed by its type name and an opaque id unique within that
/// type. Immutable after creation.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActorId {
    actor_type: String,
    id: String,
}

impl ActorId {
    /// Create a new ActorId with validation
    ///
    /// # Errors
    /// Returns an error if the type or id is empty, exceeds its length limit,
    /// or contains invalid characters.
    pub fn new(actor_type: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let actor_type = actor_type.into();
        let id = id.into();

        if actor_type.is_empty() || id.is_empty() {
            return Err(Error::InvalidActorId {
                id: format!("{}:{}", actor_type, id),
                reason: "actor type and id must not be empty".into(),
            });
        }

        if actor_type.len() > ACTOR_TYPE_LENGTH_BYTES_MAX {
            return Err(Error::InvalidActorId {
                id: format!("{}:{}", actor_type, id),
                reason: format!(
                    "actor type length {} exceeds limit {}",
                    actor_type.len(),
                    ACTOR_TYPE_LENGTH_BYTES_MAX
                ),
            });
        }

        if id.len() > ACTOR_ID_LENGTH_BYTES_MAX {
            return Err(Error::InvalidActorId {
                id: format!("{}:{}", actor_type, id),
                reason: format!(
                    "id length {} exceeds limit {}",
                    id.len(),
                    ACTOR_ID_LENGTH_BYTES_MAX
                ),
            });
        }

        // Alphanumeric plus dash, underscore, dot; ids double as storage keys.
        let valid_chars = |s: &str| {
            s.chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        };

        if !valid_chars(&actor_type) {
            return Err(Error::InvalidActorId {
                id: format!("{}:{}", actor_type, id),
                reason: "actor type contains invalid characters".into(),
            });
        }

        if !valid_chars(&id) {
            return Err(Error::InvalidActorId {
                id: format!("{}:{}", actor_type, id),
                reason: "id contains invalid characters".into(),
            });
        }

        Ok(Self { actor_type, id })
    }

    /// Get the actor type name
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// Get the id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the full qualified name (`type:id`)
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.actor_type, self.id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actor_type, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_valid() {
        let id = ActorId::new("SmartBulb", "bulb-1").unwrap();
        assert_eq!(id.actor_type(), "SmartBulb");
        assert_eq!(id.id(), "bulb-1");
        assert_eq!(id.qualified_name(), "SmartBulb:bulb-1");
    }

    #[test]
    fn test_actor_id_invalid_chars() {
        assert!(ActorId::new("SmartBulb", "bulb/1").is_err());
        assert!(ActorId::new("Smart Bulb", "bulb1").is_err());
    }

    #[test]
    fn test_actor_id_empty() {
        assert!(ActorId::new("", "bulb1").is_err());
        assert!(ActorId::new("SmartBulb", "").is_err());
    }

    #[test]
    fn test_actor_id_too_long() {
        let long_id = "a".repeat(ACTOR_ID_LENGTH_BYTES_MAX + 1);
        let result = ActorId::new("SmartBulb", long_id);
        assert!(matches!(result, Err(Error::InvalidActorId { .. })));
    }

    #[test]
    fn test_actor_id_display() {
        let id = ActorId::new("ns", "id").unwrap();
        assert_eq!(format!("{}", id), "ns:id");
    }
}
