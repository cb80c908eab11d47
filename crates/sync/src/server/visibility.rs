use std::sync::Arc;

use crate::event::Event;
use crate::net::{EntityUpdate, EventRecord, EventScope, ScopedEvent};
use crate::simulation::SimulationContext;
use crate::world::{EntityId, EntityKind, Player, State};

/// An event drained from a queue together with its wire form.
#[derive(Debug)]
pub(crate) struct OutboundEvent {
    event: Box<dyn Event>,
    record: EventRecord,
}

impl OutboundEvent {
    pub(crate) fn new(event: Box<dyn Event>) -> Self {
        let record = EventRecord {
            tag: event.tag(),
            payload: event.payload(),
        };
        Self { event, record }
    }

    fn visible_record(&self, observer: &Player) -> Option<EventRecord> {
        self.event
            .is_visible_to(observer)
            .then(|| self.record.clone())
    }
}

/// One entity's contribution to a tick broadcast, before per-observer
/// filtering.
#[derive(Debug)]
pub(crate) struct EntityFrame {
    id: EntityId,
    kind: Arc<dyn EntityKind>,
    public: State,
    events: Vec<OutboundEvent>,
}

/// Closes the tick for every entity and gathers what observers may see.
pub(crate) fn record_entities(ctx: &mut SimulationContext) -> Vec<EntityFrame> {
    let (tick, full_tick) = (ctx.clock().wrapped(), ctx.clock().full());
    let mut frames = Vec::with_capacity(ctx.entities().len());

    for id in ctx.entities().ids() {
        let Ok(tag) = ctx.entity(id).map(|entity| entity.kind()) else {
            continue;
        };
        let kind = match ctx.protocol().entity_kind(tag) {
            Ok(kind) => kind,
            Err(e) => {
                log::error!("Entity {} skipped in tick broadcast: {}", id, e);
                continue;
            }
        };
        let Ok(entity) = ctx.entity_mut(id) else {
            continue;
        };

        entity.record_tick(tick, full_tick);
        let public = kind.public_state(entity);
        let events = entity
            .take_events()
            .into_iter()
            .map(OutboundEvent::new)
            .collect();
        frames.push(EntityFrame {
            id,
            kind,
            public,
            events,
        });
    }

    frames
}

/// Builds the entity list for one observer. Hidden entities keep their slot
/// but lose their state; friends always get the private state.
pub(crate) fn entity_updates(
    ctx: &SimulationContext,
    observer: &Player,
    frames: &[EntityFrame],
) -> Vec<EntityUpdate> {
    frames
        .iter()
        .filter_map(|frame| {
            let entity = ctx.entities().get(frame.id)?;
            let visible = frame.kind.is_visible_to(entity, observer);
            let state = if frame.kind.is_friend_of(entity, observer) {
                Some(frame.kind.private_state(entity))
            } else if visible {
                Some(frame.public)
            } else {
                None
            };

            Some(EntityUpdate {
                id: frame.id.0,
                visible,
                state: state.map(|s| s.to_array()),
                events: frame
                    .events
                    .iter()
                    .filter_map(|e| e.visible_record(observer))
                    .collect(),
            })
        })
        .collect()
}

pub(crate) fn scoped_events(
    observer: &Player,
    events: &[(EventScope, OutboundEvent)],
) -> Vec<ScopedEvent> {
    events
        .iter()
        .filter_map(|(scope, event)| {
            event.visible_record(observer).map(|record| ScopedEvent {
                scope: *scope,
                event: record,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::event::EventTag;
    use crate::net::Value;
    use crate::protocol::Protocol;
    use crate::simulation::{OpenLevel, Role};
    use crate::world::{Entity, PlayerId};

    /// Visible only to players with an even id; owners see an offset state.
    #[derive(Debug)]
    struct Shy;

    impl EntityKind for Shy {
        fn name(&self) -> &'static str {
            "shy"
        }

        fn is_visible_to(&self, _entity: &Entity, observer: &Player) -> bool {
            observer.id().is_some_and(|id| id.0 % 2 == 0)
        }

        fn private_state(&self, entity: &Entity) -> State {
            let mut state = *entity.state();
            state.position.z += 100.0;
            state
        }
    }

    #[derive(Debug)]
    struct Whisper(PlayerId);

    impl Event for Whisper {
        fn tag(&self) -> EventTag {
            1
        }

        fn payload(&self) -> Vec<Value> {
            vec![Value::from(self.0.0 as f64)]
        }

        fn is_visible_to(&self, observer: &Player) -> bool {
            observer.id() == Some(self.0)
        }
    }

    fn setup() -> (SimulationContext, PlayerId, PlayerId, EntityId) {
        let mut ctx = SimulationContext::new(
            Role::Server,
            GameConfig::default(),
            Protocol::builder().entity(5, Shy).build(),
            Box::new(OpenLevel),
        );
        let even = ctx.add_player(Player::new("even")).unwrap();
        let odd = ctx.add_player(Player::new("odd")).unwrap();
        let entity = ctx
            .add_entity(Entity::new(5, State::new(1.0, 2.0, 3.0, 0.0), 40))
            .unwrap();
        (ctx, even, odd, entity)
    }

    #[test]
    fn hidden_entities_keep_their_slot_without_state() {
        let (mut ctx, even, odd, _) = setup();
        let frames = record_entities(&mut ctx);

        let seen = entity_updates(&ctx, ctx.player(even).unwrap(), &frames);
        assert_eq!(seen[0].state, Some([1.0, 2.0, 3.0, 0.0]));
        assert!(seen[0].visible);

        let hidden = entity_updates(&ctx, ctx.player(odd).unwrap(), &frames);
        assert_eq!(hidden.len(), 1);
        assert!(!hidden[0].visible);
        assert_eq!(hidden[0].state, None);
    }

    #[test]
    fn owners_get_private_state_even_when_hidden() {
        let (mut ctx, _, odd, entity) = setup();
        ctx.set_controlled_entity(odd, Some(entity)).unwrap();
        let frames = record_entities(&mut ctx);

        let update = &entity_updates(&ctx, ctx.player(odd).unwrap(), &frames)[0];
        assert!(!update.visible);
        assert_eq!(update.state, Some([1.0, 2.0, 103.0, 0.0]));
    }

    #[test]
    fn events_are_filtered_per_observer() {
        let (mut ctx, even, odd, entity) = setup();
        ctx.entity_mut(entity)
            .unwrap()
            .push_event(Box::new(Whisper(odd)));
        let frames = record_entities(&mut ctx);

        let to_even = entity_updates(&ctx, ctx.player(even).unwrap(), &frames);
        let to_odd = entity_updates(&ctx, ctx.player(odd).unwrap(), &frames);
        assert!(to_even[0].events.is_empty());
        assert_eq!(to_odd[0].events.len(), 1);

        let scoped = vec![(EventScope::Game, OutboundEvent::new(Box::new(Whisper(even))))];
        assert_eq!(scoped_events(ctx.player(even).unwrap(), &scoped).len(), 1);
        assert!(scoped_events(ctx.player(odd).unwrap(), &scoped).is_empty());
    }

    #[test]
    fn recording_pushes_history() {
        let (mut ctx, _, _, entity) = setup();
        ctx.clock_mut().advance();
        record_entities(&mut ctx);
        let record = ctx.entity(entity).unwrap().history().latest().copied().unwrap();
        assert_eq!(record.full_tick, 1);
        assert_eq!(record.tick, 1);
    }
}
