use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::signal::{ConnectionId, PeerInfo};

/// Members of one room, keyed by connection.
#[derive(Debug, Default)]
pub struct Room {
    pub members: HashMap<ConnectionId, String>,
    /// Last chat timestamp handed out in this room.
    last_stamp: Option<DateTime<Utc>>,
}

/// Outcome of removing a member from a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The room still has `remaining` members.
    Left { remaining: usize },
    /// The last member left and the room was deleted.
    Closed,
}

/// Room name to member set. Rooms exist only while they have members.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<String, Room>,
}

impl RoomTable {
    /// Add a member, creating the room if needed, returning the members that were already there.
    pub fn join(&mut self, room: &str, id: ConnectionId, name: &str) -> Vec<PeerInfo> {
        let entry = self.rooms.entry(room.to_string()).or_default();
        let peers = entry
            .members
            .iter()
            .filter(|(member, _)| **member != id)
            .map(|(member, name)| PeerInfo {
                id: *member,
                name: name.clone(),
            })
            .collect();
        entry.members.insert(id, name.to_string());
        peers
    }

    /// Remove a member, deleting the room once it is empty.
    ///
    /// Returns `None` when the room or the member did not exist.
    pub fn leave(&mut self, room: &str, id: &ConnectionId) -> Option<Departure> {
        let entry = self.rooms.get_mut(room)?;
        entry.members.remove(id)?;
        if entry.members.is_empty() {
            self.rooms.remove(room);
            Some(Departure::Closed)
        } else {
            Some(Departure::Left {
                remaining: entry.members.len(),
            })
        }
    }

    /// Current members of a room; empty for a room that does not exist.
    pub fn members<'a>(&'a self, room: &str) -> impl Iterator<Item = (ConnectionId, &'a str)> + 'a {
        self.rooms
            .get(room)
            .into_iter()
            .flat_map(|room| room.members.iter())
            .map(|(id, name)| (*id, name.as_str()))
    }

    /// Next chat timestamp for a room, never earlier than the previous one.
    pub fn stamp(&mut self, room: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let entry = self.rooms.get_mut(room)?;
        let stamp = match entry.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        entry.last_stamp = Some(stamp);
        Some(stamp)
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn first_join_creates_room() {
        let mut rooms = RoomTable::default();
        let a = ConnectionId::new();

        let peers = rooms.join("demo", a, "Alice");

        assert!(peers.is_empty());
        assert!(rooms.contains("demo"));
        assert_eq!(rooms.members("demo").count(), 1);
    }

    #[test]
    fn join_returns_existing_members_only() {
        let mut rooms = RoomTable::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        rooms.join("demo", a, "Alice");

        let peers = rooms.join("demo", b, "Bob");

        assert_eq!(
            peers,
            vec![PeerInfo {
                id: a,
                name: "Alice".to_string()
            }]
        );
        assert_eq!(rooms.members("demo").count(), 2);
    }

    #[test]
    fn joining_twice_excludes_self() {
        let mut rooms = RoomTable::default();
        let a = ConnectionId::new();
        rooms.join("demo", a, "Alice");

        let peers = rooms.join("demo", a, "Alicia");

        assert!(peers.is_empty());
        assert_eq!(rooms.members("demo").collect::<Vec<_>>(), vec![(a, "Alicia")]);
    }

    #[test]
    fn room_names_are_case_sensitive() {
        let mut rooms = RoomTable::default();
        rooms.join("Demo", ConnectionId::new(), "Alice");
        rooms.join("demo", ConnectionId::new(), "Bob");
        assert_eq!(rooms.len(), 2);
    }

    #[test]
    fn last_leave_deletes_room() {
        let mut rooms = RoomTable::default();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        rooms.join("demo", a, "Alice");
        rooms.join("demo", b, "Bob");

        assert_eq!(rooms.leave("demo", &b), Some(Departure::Left { remaining: 1 }));
        assert_eq!(rooms.leave("demo", &a), Some(Departure::Closed));
        assert!(!rooms.contains("demo"));
        assert!(rooms.is_empty());
        assert_eq!(rooms.members("demo").count(), 0);
    }

    #[test]
    fn leave_on_missing_room_or_member_is_noop() {
        let mut rooms = RoomTable::default();
        let a = ConnectionId::new();
        assert_eq!(rooms.leave("nowhere", &a), None);

        rooms.join("demo", a, "Alice");
        assert_eq!(rooms.leave("demo", &ConnectionId::new()), None);
        assert_eq!(rooms.members("demo").count(), 1);
    }

    #[test]
    fn stamps_never_go_backwards() {
        let mut rooms = RoomTable::default();
        rooms.join("demo", ConnectionId::new(), "Alice");
        let now = Utc::now();

        let first = rooms.stamp("demo", now).unwrap();
        let second = rooms.stamp("demo", now - Duration::seconds(5)).unwrap();
        let third = rooms.stamp("demo", now + Duration::seconds(1)).unwrap();

        assert_eq!(first, now);
        assert_eq!(second, now);
        assert_eq!(third, now + Duration::seconds(1));
        assert_eq!(rooms.stamp("nowhere", now), None);
    }
}
