use std::sync::Arc;

use crate::client::{InputSource, prediction};
use crate::config::GameConfig;
use crate::error::SyncError;
use crate::event::{Event, EventTarget};
use crate::net::{
    ClientMessage, Connection, EntityUpdate, EventRecord, EventScope, ScopedEvent, ServerMessage,
    Tick, Value,
};
use crate::protocol::Protocol;
use crate::simulation::{Level, Role, SimulationContext, TickClock};
use crate::world::{Entity, EntityId, Player, PlayerId, State};

/// Client-side mirror of the server's world. Steps once per received tick
/// broadcast and predicts the locally controlled entity in between.
pub struct Client {
    ctx: SimulationContext,
    link: Option<Box<dyn Connection>>,
    input: Box<dyn InputSource>,
    name: String,
    local_player: Option<PlayerId>,
    round_trip: i32,
    rejection: Option<String>,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        protocol: Arc<Protocol>,
        level: Box<dyn Level>,
        input: Box<dyn InputSource>,
    ) -> Self {
        Self {
            ctx: SimulationContext::new(Role::Client, GameConfig::default(), protocol, level),
            link: None,
            input,
            name: name.into(),
            local_player: None,
            round_trip: -1,
            rejection: None,
        }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn local_player(&self) -> Option<PlayerId> {
        self.local_player
    }

    /// The entity the local player currently controls.
    pub fn controlled_entity(&self) -> Option<EntityId> {
        self.local_player
            .and_then(|id| self.ctx.players().get(id))
            .and_then(Player::controlled_entity)
    }

    /// Round-trip estimate reported by the server, `-1` while unknown.
    pub fn round_trip(&self) -> i32 {
        self.round_trip
    }

    /// Why the server refused our join, if it did.
    pub fn rejection(&self) -> Option<&str> {
        self.rejection.as_deref()
    }

    pub fn on_connected(&mut self, link: Box<dyn Connection>) {
        self.link = Some(link);
        self.round_trip = -1;
        self.rejection = None;
        self.send(&ClientMessage::Join {
            name: self.name.clone(),
        });
    }

    /// Handles one frame from the server. Failures are logged; the world
    /// keeps whatever state it had.
    pub fn on_message(&mut self, frame: &[u8]) -> Result<(), SyncError> {
        let result = ServerMessage::deserialize(frame)
            .map_err(|e| SyncError::invalid(format!("undecodable frame: {e}")))
            .and_then(|message| self.handle_message(message));
        if let Err(e) = &result {
            match e {
                SyncError::NotFound { .. } => log::error!("Server message failed: {}", e),
                _ => log::warn!("Server message dropped: {}", e),
            }
        }
        result
    }

    /// Tears down the mirrored world.
    pub fn on_close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close("client closed");
        }
        self.ctx.clear();
        self.ctx.level_mut().restore(&[]);
        self.local_player = None;
        log::info!("Disconnected");
    }

    /// Sends an event stamped with the current tick.
    pub fn send_event(&mut self, target: EventTarget, event: &dyn Event) {
        let message = ClientMessage::Event {
            tick: self.ctx.clock().wrapped(),
            target: target.to_wire(),
            event: EventRecord {
                tag: event.tag(),
                payload: event.payload(),
            },
        };
        self.send(&message);
    }

    fn handle_message(&mut self, message: ServerMessage) -> Result<(), SyncError> {
        match message {
            ServerMessage::GameSetup {
                tick,
                config,
                level,
            } => self.on_setup(tick, config, &level),
            ServerMessage::PlayerJoin {
                id,
                name,
                is_private,
                is_spectator,
                data,
            } => {
                let mut player = if is_private {
                    Player::local(name)
                } else {
                    Player::new(name)
                };
                player.set_spectator(is_spectator);
                player.set_data(data);
                self.on_player_join(PlayerId(id), player)
            }
            ServerMessage::PlayerLeave { id } => {
                let player = self.ctx.remove_player(PlayerId(id))?;
                if self.local_player == Some(PlayerId(id)) {
                    self.local_player = None;
                }
                log::info!("Player {} \"{}\" left", id, player.name());
                Ok(())
            }
            ServerMessage::PlayerSpectate { id, is_spectator } => {
                self.ctx
                    .player_mut(PlayerId(id))?
                    .set_spectator(is_spectator);
                Ok(())
            }
            ServerMessage::EntityAdd {
                id,
                kind,
                owner,
                state,
            } => {
                let entity = Entity::new(
                    kind,
                    State::from_array(state),
                    self.ctx.config().state_buffer_size(),
                );
                let id = EntityId(id);
                self.ctx.insert_entity(id, entity)?;
                if let Some(owner) = owner {
                    self.ctx.set_controlled_entity(PlayerId(owner), Some(id))?;
                }
                log::debug!("Entity {} added (kind {})", id, kind);
                Ok(())
            }
            ServerMessage::EntityRemove { id } => {
                self.ctx.remove_entity(EntityId(id))?;
                log::debug!("Entity {} removed", id);
                Ok(())
            }
            ServerMessage::EntitySetPlayer { entity, player } => match player {
                Some(player) => self
                    .ctx
                    .set_controlled_entity(PlayerId(player), Some(EntityId(entity))),
                None => self.ctx.release_entity(EntityId(entity)),
            },
            ServerMessage::GameTick {
                confirmed_tick,
                entities,
                round_trip,
            } => {
                self.on_tick(confirmed_tick, &entities);
                self.round_trip = round_trip;
                Ok(())
            }
            ServerMessage::GameEvents { tick, events } => {
                self.on_events(tick, &events);
                Ok(())
            }
            ServerMessage::Ping { timestamp } => {
                self.send(&ClientMessage::Pong { timestamp });
                Ok(())
            }
            ServerMessage::JoinRejected { reason } => {
                log::warn!("Join rejected: {}", reason);
                self.rejection = Some(reason);
                Ok(())
            }
        }
    }

    fn on_setup(&mut self, tick: Tick, config: GameConfig, level: &[Value]) -> Result<(), SyncError> {
        config
            .validate()
            .map_err(|e| SyncError::invalid(format!("server config rejected: {e}")))?;
        self.ctx.reconfigure(config);
        *self.ctx.clock_mut() = TickClock::starting_at(tick);
        self.ctx.level_mut().restore(level);
        self.local_player = None;
        log::info!("Game setup at tick {} ({} Hz)", tick, config.tick_rate);
        Ok(())
    }

    fn on_player_join(&mut self, id: PlayerId, player: Player) -> Result<(), SyncError> {
        log::info!(
            "Player {} \"{}\" joined{}",
            id,
            player.name(),
            if player.is_spectator() { " as spectator" } else { "" }
        );
        let is_local = player.is_local();
        self.ctx.insert_player(id, player)?;
        if is_local {
            self.local_player = Some(id);
        }
        Ok(())
    }

    fn on_tick(&mut self, confirmed_tick: Tick, updates: &[EntityUpdate]) {
        self.ctx.clock_mut().advance();
        let controlled = self.controlled_entity();

        for update in updates {
            let id = EntityId(update.id);
            if let Err(e) = self.apply_update(id, update, confirmed_tick, controlled) {
                log::error!("Tick update for entity {} failed: {}", id, e);
                continue;
            }

            let full_tick = self.ctx.clock().full();
            for record in &update.events {
                let result = self
                    .ctx
                    .protocol()
                    .decode_event(record.tag, &record.payload)
                    .and_then(|event| event.apply_to_entity(&mut self.ctx, id, full_tick));
                if let Err(e) = result {
                    log::warn!("Entity event {} on {} dropped: {}", record.tag, id, e);
                }
            }
        }
    }

    fn apply_update(
        &mut self,
        id: EntityId,
        update: &EntityUpdate,
        confirmed_tick: Tick,
        controlled: Option<EntityId>,
    ) -> Result<(), SyncError> {
        let entity = self.ctx.entity_mut(id)?;
        let shown = entity.visible() == Some(false) && update.visible;
        entity.set_visible(update.visible);

        let Some(state) = update.state.map(State::from_array) else {
            return Ok(());
        };

        if controlled == Some(id) {
            let tick = self.ctx.clock().wrapped();
            prediction::reconcile(&mut self.ctx, id, confirmed_tick, &state)?;
            let delta = prediction::predict(&mut self.ctx, id, tick, self.input.as_mut())?;
            self.send(&ClientMessage::State {
                tick,
                delta: delta.to_array(),
            });
        } else {
            entity.follow(state);
        }

        // A freshly shown entity has no meaningful previous state.
        if shown {
            self.ctx.entity_mut(id)?.apply_state(state);
        }
        Ok(())
    }

    fn on_events(&mut self, tick: Tick, events: &[ScopedEvent]) {
        let full_tick = self.ctx.clock().full();
        for scoped in events {
            let result = self
                .ctx
                .protocol()
                .decode_event(scoped.event.tag, &scoped.event.payload)
                .and_then(|event| match scoped.scope {
                    EventScope::Game => event.apply_to_game(&mut self.ctx, full_tick),
                    EventScope::Player(player) => {
                        event.apply_to_player(&mut self.ctx, PlayerId(player), full_tick)
                    }
                });
            if let Err(e) = result {
                log::warn!(
                    "Event {} from tick {} dropped: {}",
                    scoped.event.tag,
                    tick,
                    e
                );
            }
        }
    }

    fn send(&mut self, message: &ClientMessage) {
        let Some(link) = self.link.as_mut() else {
            log::debug!("Not connected, dropping {:?}", message);
            return;
        };
        let frame = match message.serialize() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to encode message: {}", e);
                return;
            }
        };
        if let Err(e) = link.send(frame) {
            log::warn!("Send failed, dropping connection: {}", e);
            self.link = None;
        }
    }
}
