use crate::error::SyncError;
use crate::event::Event;
use crate::net::Tick;
use crate::simulation::SimulationContext;
use crate::world::EntityId;

/// Moves every entity except `acting` back to its recorded state at the
/// wrapped server `tick`. Returns the ids that were rewound.
pub fn rewind(ctx: &mut SimulationContext, tick: Tick, acting: EntityId) -> Vec<EntityId> {
    let ids: Vec<EntityId> = ctx
        .entities()
        .ids()
        .into_iter()
        .filter(|&id| id != acting)
        .collect();
    for &id in &ids {
        if let Ok(entity) = ctx.entity_mut(id) {
            entity.rewind(tick);
        }
    }
    ids
}

/// Restores entities moved by [`rewind`].
pub fn forward(ctx: &mut SimulationContext, rewound: &[EntityId]) {
    for &id in rewound {
        if let Ok(entity) = ctx.entity_mut(id) {
            entity.forward();
        }
    }
}

/// Applies an entity event against the world as the acting client saw it at
/// `tick`, then puts every other entity back.
pub fn apply_rewound(
    ctx: &mut SimulationContext,
    tick: Tick,
    acting: EntityId,
    event: &dyn Event,
) -> Result<(), SyncError> {
    let rewound = rewind(ctx, tick, acting);
    let full_tick = ctx.clock().full();
    let result = event.apply_to_entity(ctx, acting, full_tick);
    forward(ctx, &rewound);
    result
}
