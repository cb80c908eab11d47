use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SyncError;
use crate::event::{Event, EventKind, EventTag};
use crate::net::Value;
use crate::world::{BasicEntity, EntityKind, EntityTag};

type DecodeFn = fn(&[Value]) -> Result<Box<dyn Event>, SyncError>;

fn decode_boxed<E: EventKind>(payload: &[Value]) -> Result<Box<dyn Event>, SyncError> {
    E::decode(payload).map(|event| Box::new(event) as Box<dyn Event>)
}

/// Entity kinds and event kinds both peers agree on. Built once at startup,
/// then shared read-only.
pub struct Protocol {
    entity_kinds: HashMap<EntityTag, Arc<dyn EntityKind>>,
    events: HashMap<EventTag, DecodeFn>,
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entity_tags: Vec<_> = self.entity_kinds.keys().collect();
        entity_tags.sort();
        let mut event_tags: Vec<_> = self.events.keys().collect();
        event_tags.sort();
        f.debug_struct("Protocol")
            .field("entity_kinds", &entity_tags)
            .field("events", &event_tags)
            .finish()
    }
}

impl Protocol {
    pub fn builder() -> ProtocolBuilder {
        ProtocolBuilder::new()
    }

    pub fn entity_kind(&self, tag: EntityTag) -> Result<Arc<dyn EntityKind>, SyncError> {
        self.entity_kinds
            .get(&tag)
            .cloned()
            .ok_or(SyncError::UnknownEntityType(tag))
    }

    pub fn decode_event(
        &self,
        tag: EventTag,
        payload: &[Value],
    ) -> Result<Box<dyn Event>, SyncError> {
        let decode = self
            .events
            .get(&tag)
            .ok_or(SyncError::UnknownEventType(tag))?;
        decode(payload)
    }
}

impl Default for Protocol {
    fn default() -> Self {
        let mut entity_kinds: HashMap<EntityTag, Arc<dyn EntityKind>> = HashMap::new();
        entity_kinds.insert(BasicEntity::TAG, Arc::new(BasicEntity));
        Self {
            entity_kinds,
            events: HashMap::new(),
        }
    }
}

pub struct ProtocolBuilder {
    protocol: Protocol,
}

impl ProtocolBuilder {
    fn new() -> Self {
        Self {
            protocol: Protocol::default(),
        }
    }

    /// Registers an entity kind. Tag 0 is the built-in [`BasicEntity`] and
    /// may be overridden once.
    pub fn entity(mut self, tag: EntityTag, kind: impl EntityKind + 'static) -> Self {
        let previous = self.protocol.entity_kinds.insert(tag, Arc::new(kind));
        if let Some(previous) = previous {
            assert!(
                tag == BasicEntity::TAG && previous.name() == "basic",
                "entity tag {tag} registered twice"
            );
        }
        self
    }

    pub fn event<E: EventKind>(mut self) -> Self {
        let previous = self.protocol.events.insert(E::TAG, decode_boxed::<E>);
        assert!(previous.is_none(), "event tag {} registered twice", E::TAG);
        self
    }

    pub fn build(self) -> Arc<Protocol> {
        Arc::new(self.protocol)
    }
}
