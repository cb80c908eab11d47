use std::sync::Arc;

use crate::config::GameConfig;
use crate::error::SyncError;
use crate::event::Event;
use crate::protocol::Protocol;
use crate::simulation::{Level, TickClock};
use crate::world::{Entity, EntityId, Player, PlayerId, SlotRegistry, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Everything a simulation step reads or writes, shared by the server and
/// the client cores.
///
/// Player and entity links are plain ids. They are only changed through
/// [`set_controlled_entity`](Self::set_controlled_entity) and
/// [`release_entity`](Self::release_entity), which update both ends.
#[derive(Debug)]
pub struct SimulationContext {
    role: Role,
    config: GameConfig,
    protocol: Arc<Protocol>,
    clock: TickClock,
    players: SlotRegistry<Player>,
    entities: SlotRegistry<Entity>,
    level: Box<dyn Level>,
    events: Vec<Box<dyn Event>>,
}

impl SimulationContext {
    pub fn new(
        role: Role,
        config: GameConfig,
        protocol: Arc<Protocol>,
        level: Box<dyn Level>,
    ) -> Self {
        Self {
            role,
            players: SlotRegistry::new(config.max_players as usize),
            entities: SlotRegistry::new(config.max_entities as usize),
            clock: TickClock::new(),
            config,
            protocol,
            level,
            events: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_server(&self) -> bool {
        self.role == Role::Server
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Adopts a new config. Registries are rebuilt empty at the new sizes.
    pub fn reconfigure(&mut self, config: GameConfig) {
        self.config = config;
        self.players.resize(config.max_players as usize);
        self.entities.resize(config.max_entities as usize);
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    pub fn level(&self) -> &dyn Level {
        self.level.as_ref()
    }

    pub fn level_mut(&mut self) -> &mut dyn Level {
        self.level.as_mut()
    }

    pub fn players(&self) -> &SlotRegistry<Player> {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, SyncError> {
        self.players.require(id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, SyncError> {
        self.players.require_mut(id)
    }

    pub fn entities(&self) -> &SlotRegistry<Entity> {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, SyncError> {
        self.entities.require(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SyncError> {
        self.entities.require_mut(id)
    }

    pub fn add_player(&mut self, player: Player) -> Result<PlayerId, SyncError> {
        self.players.add(player)
    }

    pub fn insert_player(&mut self, id: PlayerId, player: Player) -> Result<(), SyncError> {
        self.players.insert_at(id, player)
    }

    /// Unlinks the player's entity, then drops the player.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player, SyncError> {
        self.set_controlled_entity(id, None)?;
        self.players.remove(id)
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, SyncError> {
        self.protocol.entity_kind(entity.kind())?;
        self.entities.add(entity)
    }

    pub fn insert_entity(&mut self, id: EntityId, entity: Entity) -> Result<(), SyncError> {
        self.protocol.entity_kind(entity.kind())?;
        self.entities.insert_at(id, entity)
    }

    /// Unlinks the entity's owner, then drops the entity.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, SyncError> {
        self.release_entity(id)?;
        self.entities.remove(id)
    }

    /// Points `player` at `entity` (or at nothing), detaching whatever either
    /// side was linked to before.
    pub fn set_controlled_entity(
        &mut self,
        player: PlayerId,
        entity: Option<EntityId>,
    ) -> Result<(), SyncError> {
        if let Some(entity) = entity {
            self.entities.require(entity)?;
        }
        let previous = self.players.require(player)?.controlled_entity();
        if previous == entity {
            return Ok(());
        }

        if let Some(previous) = previous
            && let Some(old) = self.entities.get_mut(previous)
        {
            old.set_owner(None);
        }
        if let Some(entity) = entity {
            self.release_entity(entity)?;
            self.entities.require_mut(entity)?.set_owner(Some(player));
        }
        self.players
            .require_mut(player)?
            .set_controlled_entity(entity);
        Ok(())
    }

    /// Detaches the entity from its owner, if any.
    pub fn release_entity(&mut self, entity: EntityId) -> Result<(), SyncError> {
        let owner = self.entities.require(entity)?.owner();
        if let Some(owner) = owner {
            if let Some(player) = self.players.get_mut(owner) {
                player.set_controlled_entity(None);
            }
            self.entities.require_mut(entity)?.set_owner(None);
        }
        Ok(())
    }

    /// Queues a game-wide event for the next broadcast.
    pub fn push_event(&mut self, event: Box<dyn Event>) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Box<dyn Event>> {
        std::mem::take(&mut self.events)
    }

    /// Clears every player, entity, queued event and the clock.
    pub fn clear(&mut self) {
        self.players.clear();
        self.entities.clear();
        self.events.clear();
        self.clock.reset();
    }

    /// Runs `velocity` through level collision and integrates it.
    pub fn integrate(&mut self, id: EntityId, mut velocity: State) -> Result<(), SyncError> {
        let entity = self.entities.require_mut(id)?;
        self.level.apply_entity_collision(entity, &mut velocity);
        entity.integrate(velocity);
        Ok(())
    }

    /// Every player paired with the entity it controls.
    pub fn links(&self) -> Vec<(PlayerId, Option<EntityId>)> {
        self.players
            .iter()
            .map(|(id, player)| (id, player.controlled_entity()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::OpenLevel;

    fn context() -> SimulationContext {
        SimulationContext::new(
            Role::Server,
            GameConfig::default(),
            Protocol::builder().build(),
            Box::new(OpenLevel),
        )
    }

    fn assert_links_consistent(ctx: &SimulationContext) {
        for (player, entity) in ctx.links() {
            if let Some(entity) = entity {
                assert_eq!(ctx.entity(entity).unwrap().owner(), Some(player));
            }
        }
        for (entity_id, entity) in ctx.entities().iter() {
            if let Some(owner) = entity.owner() {
                assert_eq!(
                    ctx.player(owner).unwrap().controlled_entity(),
                    Some(entity_id)
                );
            }
        }
    }

    #[test]
    fn linking_updates_both_sides() {
        let mut ctx = context();
        let p = ctx.add_player(Player::new("a")).unwrap();
        let e = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();

        ctx.set_controlled_entity(p, Some(e)).unwrap();
        assert_eq!(ctx.player(p).unwrap().controlled_entity(), Some(e));
        assert_eq!(ctx.entity(e).unwrap().owner(), Some(p));
        assert_links_consistent(&ctx);
    }

    #[test]
    fn entity_changing_hands_detaches_old_owner() {
        let mut ctx = context();
        let a = ctx.add_player(Player::new("a")).unwrap();
        let b = ctx.add_player(Player::new("b")).unwrap();
        let e = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();
        let f = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();

        ctx.set_controlled_entity(a, Some(e)).unwrap();
        ctx.set_controlled_entity(b, Some(f)).unwrap();
        ctx.set_controlled_entity(b, Some(e)).unwrap();

        assert_eq!(ctx.player(a).unwrap().controlled_entity(), None);
        assert_eq!(ctx.entity(f).unwrap().owner(), None);
        assert_eq!(ctx.entity(e).unwrap().owner(), Some(b));
        assert_links_consistent(&ctx);
    }

    #[test]
    fn removing_either_side_unlinks() {
        let mut ctx = context();
        let p = ctx.add_player(Player::new("a")).unwrap();
        let e = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();
        ctx.set_controlled_entity(p, Some(e)).unwrap();

        ctx.remove_entity(e).unwrap();
        assert_eq!(ctx.player(p).unwrap().controlled_entity(), None);

        let e = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();
        ctx.set_controlled_entity(p, Some(e)).unwrap();
        ctx.remove_player(p).unwrap();
        assert_eq!(ctx.entity(e).unwrap().owner(), None);
        assert_links_consistent(&ctx);
    }

    #[test]
    fn unknown_entity_kind_is_refused() {
        let mut ctx = context();
        assert!(matches!(
            ctx.add_entity(Entity::new(42, State::ZERO, 40)),
            Err(SyncError::UnknownEntityType(42))
        ));
    }

    #[test]
    fn reconfigure_resizes_and_clears() {
        let mut ctx = context();
        ctx.add_player(Player::new("a")).unwrap();
        ctx.reconfigure(GameConfig {
            max_players: 2,
            ..Default::default()
        });
        assert!(ctx.players().is_empty());
        assert_eq!(ctx.players().capacity(), 2);
    }

    #[test]
    fn integrate_moves_entity() {
        let mut ctx = context();
        let e = ctx.add_entity(Entity::new(0, State::ZERO, 40)).unwrap();
        ctx.integrate(e, State::new(1.0, 2.0, 0.0, 0.5)).unwrap();
        assert_eq!(*ctx.entity(e).unwrap().state(), State::new(1.0, 2.0, 0.0, 0.5));
    }
}
