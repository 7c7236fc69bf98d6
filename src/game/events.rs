//! # Event Bus
//!
//! Registry of listeners for the game's dispatch phases.
//!
//! Listeners are identified by a [`ListenerId`] and belong to the object that
//! owns them. The bus only records who listens to what; delivery is done by
//! the game state, which takes each listening trait out of its owner, runs it
//! and puts it back.

use crate::ObjId;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Phases listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Fired once per game turn after every actor has acted
    EndOfRound,
    /// Fired for an object's own listeners just before it leaves the game
    Death,
}

/// Handle of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone)]
struct Registration {
    id: ListenerId,
    event: EventType,
    owner: ObjId,
}

/// Session-scoped listener registry.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh listener id without subscribing it.
    pub fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Allocates an id and subscribes it in one step.
    pub fn register(&mut self, event: EventType, owner: ObjId) -> ListenerId {
        let id = self.allocate();
        self.subscribe(id, event, owner);
        id
    }

    /// Subscribes an id to an event. Subscribing the same id twice is a no-op.
    pub fn subscribe(&mut self, id: ListenerId, event: EventType, owner: ObjId) -> bool {
        if self
            .registrations
            .iter()
            .any(|r| r.id == id && r.event == event)
        {
            warn!(
                "Listener {:?} of object {} already registered for {:?}",
                id, owner, event
            );
            return false;
        }
        self.registrations.push(Registration { id, event, owner });
        true
    }

    /// Drops every subscription of an id. Unknown ids are ignored.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        let removed = self.registrations.len() != before;
        if !removed {
            debug!("Listener {:?} was not registered", id);
        }
        removed
    }

    /// Drops every subscription owned by an object.
    pub fn unregister_owner(&mut self, owner: ObjId) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.owner != owner);
        before - self.registrations.len()
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.registrations.iter().any(|r| r.id == id)
    }

    pub fn owner_of(&self, id: ListenerId) -> Option<ObjId> {
        self.registrations
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.owner)
    }

    /// Snapshot of the listeners for an event, in registration order.
    pub fn listeners(&self, event: EventType) -> Vec<(ListenerId, ObjId)> {
        self.registrations
            .iter()
            .filter(|r| r.event == event)
            .map(|r| (r.id, r.owner))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_snapshot_order() {
        let mut bus = EventBus::new();
        let a = bus.register(EventType::EndOfRound, 1);
        let b = bus.register(EventType::EndOfRound, 2);
        let c = bus.register(EventType::Death, 1);
        assert_eq!(bus.listeners(EventType::EndOfRound), vec![(a, 1), (b, 2)]);
        assert_eq!(bus.listeners(EventType::Death), vec![(c, 1)]);
    }

    #[test]
    fn test_duplicate_subscription_is_ignored() {
        let mut bus = EventBus::new();
        let id = bus.register(EventType::EndOfRound, 7);
        assert!(!bus.subscribe(id, EventType::EndOfRound, 7));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let mut bus = EventBus::new();
        let id = bus.register(EventType::EndOfRound, 7);
        assert!(bus.unregister(id));
        assert!(!bus.unregister(id));
        assert!(!bus.is_registered(id));
    }

    #[test]
    fn test_unregister_owner() {
        let mut bus = EventBus::new();
        bus.register(EventType::EndOfRound, 7);
        bus.register(EventType::Death, 7);
        let other = bus.register(EventType::EndOfRound, 8);
        assert_eq!(bus.unregister_owner(7), 2);
        assert_eq!(bus.listeners(EventType::EndOfRound), vec![(other, 8)]);
    }
}
