use serde::{Deserialize, Serialize};
use std::fmt;

/// Mint a short room id: the first eight hex digits of a v4 UUID.
pub fn new_room_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Relay-side identity of one connected channel. Never sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_length() {
        assert_eq!(new_room_id().len(), 8);
    }

    #[test]
    fn room_id_is_hex() {
        let id = new_room_id();
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn room_id_is_unique() {
        assert_ne!(new_room_id(), new_room_id());
    }

    #[test]
    fn participant_id_is_uuid() {
        let pid = ParticipantId::new();
        assert!(uuid::Uuid::parse_str(pid.as_str()).is_ok());
        assert_eq!(pid.to_string(), pid.as_str());
    }

    #[test]
    fn participant_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let p1 = ParticipantId::new();
        set.insert(p1.clone());
        set.insert(p1);
        set.insert(ParticipantId::default());
        assert_eq!(set.len(), 2);
    }
}
