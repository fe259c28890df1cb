//! Store key builders.

use raidforge_protocol::{RoomId, UserId};

pub(crate) fn leader(room_id: &RoomId) -> String {
    format!("room:{room_id}:leader")
}

pub(crate) fn boss(room_id: &RoomId) -> String {
    format!("room:{room_id}:boss")
}

pub(crate) fn member_order(room_id: &RoomId) -> String {
    format!("room:{room_id}:memberOrder")
}

pub(crate) fn members(room_id: &RoomId) -> String {
    format!("room:{room_id}:members")
}

pub(crate) fn battle_state(room_id: &RoomId) -> String {
    format!("room:{room_id}:battleState")
}

pub(crate) fn user_room(user_id: UserId) -> String {
    format!("user:{}:room", user_id.0)
}

/// Pattern matching every room's leader key.
pub(crate) const LEADER_PATTERN: &str = "room:*:leader";

/// Extracts the room id from a `room:{id}:leader` key.
pub(crate) fn room_id_from_leader_key(key: &str) -> Option<RoomId> {
    key.strip_prefix("room:")
        .and_then(|rest| rest.strip_suffix(":leader"))
        .filter(|id| !id.is_empty())
        .map(RoomId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let room = RoomId::new("abc");
        assert_eq!(leader(&room), "room:abc:leader");
        assert_eq!(battle_state(&room), "room:abc:battleState");
        assert_eq!(user_room(UserId(7)), "user:7:room");
    }

    #[test]
    fn test_room_id_from_leader_key() {
        assert_eq!(
            room_id_from_leader_key("room:abc:leader"),
            Some(RoomId::new("abc"))
        );
        assert_eq!(room_id_from_leader_key("room::leader"), None);
        assert_eq!(room_id_from_leader_key("room:abc:boss"), None);
    }
}
