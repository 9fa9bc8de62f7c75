//! Application instance identity.

use std::fmt;

use uuid::Uuid;

/// Unique identifier of a running application instance.
///
/// Identifiers are UUIDv7, so they sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate a new unique instance ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for InstanceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
    }

    #[test]
    fn test_instance_id_display_is_uuid() {
        let id = InstanceId::new();
        let parsed: Uuid = id.to_string().parse().unwrap();
        assert_eq!(&parsed, id.as_uuid());
        assert_eq!(parsed.get_version_num(), 7);
    }
}
