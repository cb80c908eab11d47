use crate::error::SyncError;
use crate::event::{Event, EventKind, EventTag};
use crate::net::Value;
use crate::simulation::SimulationContext;
use crate::world::{EntityId, SlotId};

/// Entity event sent by a client when its walker tries to tag someone. The
/// server resolves it against rewound positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tag;

impl Tag {
    pub const REACH: f32 = 1.5;
}

impl Event for Tag {
    fn tag(&self) -> EventTag {
        <Self as EventKind>::TAG
    }

    fn payload(&self) -> Vec<Value> {
        Vec::new()
    }

    fn apply_to_entity(
        &self,
        ctx: &mut SimulationContext,
        entity: EntityId,
        tick: u64,
    ) -> Result<(), SyncError> {
        if !ctx.is_server() {
            return Ok(());
        }

        let origin = ctx.entity(entity)?.state().position;
        let nearest = ctx
            .entities()
            .iter()
            .filter(|&(id, _)| id != entity)
            .map(|(id, other)| (id, other.state().position.distance(origin)))
            .filter(|&(_, distance)| distance <= Self::REACH)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((target, _)) => {
                log::info!("Entity {} tagged {} at tick {}", entity, target, tick);
                ctx.push_event(Box::new(Tagged {
                    tagger: entity,
                    target,
                }));
            }
            None => log::debug!("Entity {} missed at tick {}", entity, tick),
        }
        Ok(())
    }
}

impl EventKind for Tag {
    const TAG: EventTag = 1;

    fn decode(_payload: &[Value]) -> Result<Self, SyncError> {
        Ok(Self)
    }
}

/// Game event announcing a successful tag to everyone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tagged {
    pub tagger: EntityId,
    pub target: EntityId,
}

impl Event for Tagged {
    fn tag(&self) -> EventTag {
        <Self as EventKind>::TAG
    }

    fn payload(&self) -> Vec<Value> {
        vec![
            Value::from(f64::from(self.tagger.0)),
            Value::from(f64::from(self.target.0)),
        ]
    }

    fn apply_to_game(&self, ctx: &mut SimulationContext, tick: u64) -> Result<(), SyncError> {
        if !ctx.is_server() {
            log::info!("{} was tagged by {} (tick {})", self.target, self.tagger, tick);
        }
        Ok(())
    }
}

impl EventKind for Tagged {
    const TAG: EventTag = 2;

    fn decode(payload: &[Value]) -> Result<Self, SyncError> {
        let id = |index: usize| {
            payload
                .get(index)
                .and_then(Value::as_f64)
                .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(n))
                .map(|n| EntityId::from_index(n as usize))
                .ok_or_else(|| SyncError::invalid("tagged payload needs two entity ids"))
        };
        Ok(Self {
            tagger: id(0)?,
            target: id(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaLevel, Walker, protocol};
    use crate::config::GameConfig;
    use crate::simulation::Role;
    use crate::world::{Entity, State};

    fn server_with(positions: &[(f32, f32)]) -> (SimulationContext, Vec<EntityId>) {
        let mut ctx = SimulationContext::new(
            Role::Server,
            GameConfig::default(),
            protocol(),
            Box::new(ArenaLevel::new()),
        );
        let ids = positions
            .iter()
            .map(|&(x, y)| {
                ctx.add_entity(Entity::new(Walker::TAG, State::new(x, y, 0.0, 0.0), 8))
                    .unwrap()
            })
            .collect();
        (ctx, ids)
    }

    #[test]
    fn tag_hits_the_nearest_entity_in_reach() {
        let (mut ctx, ids) = server_with(&[(0.0, 0.0), (1.4, 0.0), (0.5, 0.5), (9.0, 9.0)]);
        Tag.apply_to_entity(&mut ctx, ids[0], 7).unwrap();

        let events = ctx.take_events();
        assert_eq!(events.len(), 1);
        let tagged = Tagged::decode(&events[0].payload()).unwrap();
        assert_eq!(tagged, Tagged { tagger: ids[0], target: ids[2] });
    }

    #[test]
    fn tag_out_of_reach_misses() {
        let (mut ctx, ids) = server_with(&[(0.0, 0.0), (3.0, 0.0)]);
        Tag.apply_to_entity(&mut ctx, ids[0], 7).unwrap();
        assert!(ctx.take_events().is_empty());
    }

    #[test]
    fn tagged_payload_must_hold_ids() {
        assert!(Tagged::decode(&[Value::from(1.0)]).is_err());
        assert!(Tagged::decode(&[Value::from(1.5), Value::from(2.0)]).is_err());
        assert!(Tagged::decode(&[Value::from("a"), Value::from(2.0)]).is_err());
    }
}
