use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::config::GameConfig;
use crate::error::SyncError;
use crate::event::{Event, EventTarget};
use crate::net::{
    ClientMessage, Connection, EventRecord, EventScope, PING_WINDOW_MS, ServerMessage, Tick,
};
use crate::protocol::Protocol;
use crate::server::events::{CloseReason, ConnectionEvent, ConnectionId};
use crate::server::lag;
use crate::server::visibility::{self, OutboundEvent};
use crate::simulation::{Level, Role, SimulationContext};
use crate::world::{
    Entity, EntityId, EntityKind, EntityTag, Player, PlayerId, State, is_valid_name,
};

struct Peer {
    link: Box<dyn Connection>,
    address: String,
    player: Option<PlayerId>,
}

/// Authoritative simulation host. Transport glue feeds it connection,
/// message and close events; a scheduler calls [`step`](Self::step) at the
/// configured rate.
pub struct Server {
    ctx: SimulationContext,
    peers: BTreeMap<ConnectionId, Peer>,
    next_connection: u64,
    failed: Vec<ConnectionId>,
    pending_events: VecDeque<ConnectionEvent>,
    started: Instant,
}

impl Server {
    pub fn new(
        config: GameConfig,
        protocol: Arc<Protocol>,
        level: Box<dyn Level>,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            ctx: SimulationContext::new(Role::Server, config, protocol, level),
            peers: BTreeMap::new(),
            next_connection: 0,
            failed: Vec::new(),
            pending_events: VecDeque::new(),
            started: Instant::now(),
        })
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Direct access for game rules. Links and registry membership should go
    /// through the server methods so clients hear about them.
    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }

    pub fn config(&self) -> &GameConfig {
        self.ctx.config()
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    pub fn player_count(&self) -> usize {
        self.ctx.players().len()
    }

    pub fn player_of(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.peers.get(&connection).and_then(|peer| peer.player)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ConnectionEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn on_connection(
        &mut self,
        link: Box<dyn Connection>,
        address: impl Into<String>,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        let address = address.into();
        log::info!("Client connected {} from {}", id, address);

        self.peers.insert(
            id,
            Peer {
                link,
                address: address.clone(),
                player: None,
            },
        );
        self.pending_events.push_back(ConnectionEvent::Connected {
            connection: id,
            address,
        });
        id
    }

    /// Decodes and handles one frame. Errors are logged and, where the
    /// error calls for it, the connection is closed before returning.
    pub fn on_message(&mut self, connection: ConnectionId, frame: &[u8]) -> Result<(), SyncError> {
        if !self.peers.contains_key(&connection) {
            log::debug!("Dropping frame for unknown connection {}", connection);
            return Ok(());
        }

        let result = ClientMessage::deserialize(frame)
            .map_err(|e| SyncError::invalid(format!("undecodable frame: {e}")))
            .and_then(|message| self.handle_message(connection, message));

        if let Err(err) = &result {
            self.report(connection, err);
        }
        self.close_failed();
        result
    }

    pub fn on_close(&mut self, connection: ConnectionId, reason: &str) {
        self.disconnect(connection, CloseReason::Remote(reason.to_owned()));
        self.close_failed();
    }

    /// One scheduled step. With nobody joined the tick counters fall back
    /// to zero instead of advancing. Every link is flushed either way.
    pub fn step(&mut self) {
        if self.ctx.players().is_empty() {
            self.ctx.clock_mut().reset();
        } else {
            self.tick();
        }
        self.flush_links();
        self.close_failed();
    }

    fn tick(&mut self) {
        let previous_tick = self.ctx.clock().wrapped();

        let mut scoped: Vec<(EventScope, OutboundEvent)> = self
            .ctx
            .take_events()
            .into_iter()
            .map(|event| (EventScope::Game, OutboundEvent::new(event)))
            .collect();

        self.ctx.clock_mut().advance();
        let tick = self.ctx.clock().wrapped();
        let full_tick = self.ctx.clock().full();

        for id in self.ctx.players().ids() {
            if let Ok(player) = self.ctx.player_mut(id) {
                scoped.extend(
                    player
                        .take_events()
                        .into_iter()
                        .map(|event| (EventScope::Player(id.0), OutboundEvent::new(event))),
                );
            }
        }

        let frames = visibility::record_entities(&mut self.ctx);
        let ping_due = full_tick % self.ctx.config().tick_rate as u64 == 0;
        let timestamp = self.ping_timestamp();

        let mut outgoing = Vec::with_capacity(self.peers.len());
        for (&connection, peer) in &self.peers {
            let Some(observer) = peer.player.and_then(|id| self.ctx.players().get(id)) else {
                continue;
            };

            let confirmed_tick = observer
                .controlled_entity()
                .and_then(|id| self.ctx.entities().get(id))
                .and_then(Entity::client_tick)
                .unwrap_or(previous_tick);

            let mut messages = vec![ServerMessage::GameTick {
                confirmed_tick,
                entities: visibility::entity_updates(&self.ctx, observer, &frames),
                round_trip: observer.round_trip(),
            }];

            let events = visibility::scoped_events(observer, &scoped);
            if !events.is_empty() {
                messages.push(ServerMessage::GameEvents { tick, events });
            }
            if ping_due {
                messages.push(ServerMessage::Ping { timestamp });
            }
            outgoing.push((connection, messages));
        }

        for (connection, messages) in outgoing {
            for message in &messages {
                self.send(connection, message);
            }
        }
        log::trace!("Tick {} ({}) sent", tick, full_tick);
    }

    /// Spawns an entity and announces it to every player.
    pub fn add_entity(&mut self, kind: EntityTag, state: State) -> Result<EntityId, SyncError> {
        let entity = Entity::new(kind, state, self.ctx.config().state_buffer_size());
        let id = self.ctx.add_entity(entity)?;
        log::info!("Entity {} added (kind {})", id, kind);

        let kind = self.ctx.protocol().entity_kind(kind)?;
        for (connection, observer) in self.observers() {
            let Some(observer) = self.ctx.players().get(observer) else {
                continue;
            };
            let message = self.entity_add_message(id, kind.as_ref(), observer)?;
            self.send(connection, &message);
        }
        self.close_failed();
        Ok(id)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, SyncError> {
        let entity = self.ctx.remove_entity(id)?;
        log::info!("Entity {} removed", id);
        self.broadcast(&ServerMessage::EntityRemove { id: id.0 });
        self.close_failed();
        Ok(entity)
    }

    /// Hands `entity` to `player`, or takes the player's entity away.
    pub fn set_controlled_entity(
        &mut self,
        player: PlayerId,
        entity: Option<EntityId>,
    ) -> Result<(), SyncError> {
        let current = self.ctx.player(player)?;
        if entity.is_some() && current.is_spectator() {
            return Err(SyncError::invalid(format!(
                "player {player} is spectating and cannot control an entity"
            )));
        }
        let previous = current.controlled_entity();
        self.ctx.set_controlled_entity(player, entity)?;

        let message = match (entity, previous) {
            (Some(entity), _) => ServerMessage::EntitySetPlayer {
                entity: entity.0,
                player: Some(player.0),
            },
            (None, Some(previous)) => ServerMessage::EntitySetPlayer {
                entity: previous.0,
                player: None,
            },
            (None, None) => return Ok(()),
        };
        self.broadcast(&message);
        self.close_failed();
        Ok(())
    }

    /// Switches `player` between playing and spectating. Spectators give
    /// up their entity.
    pub fn set_spectator(&mut self, player: PlayerId, spectator: bool) -> Result<(), SyncError> {
        if self.ctx.player(player)?.is_spectator() == spectator {
            return Ok(());
        }
        if spectator {
            self.set_controlled_entity(player, None)?;
        }
        self.ctx.player_mut(player)?.set_spectator(spectator);
        log::info!(
            "Player {} is now {}",
            player,
            if spectator { "spectating" } else { "playing" }
        );
        self.broadcast(&ServerMessage::PlayerSpectate {
            id: player.0,
            is_spectator: spectator,
        });
        self.close_failed();
        Ok(())
    }

    /// Queues a game-wide event for the next tick.
    pub fn send_event(&mut self, event: Box<dyn Event>) {
        self.ctx.push_event(event);
    }

    pub fn send_player_event(
        &mut self,
        player: PlayerId,
        event: Box<dyn Event>,
    ) -> Result<(), SyncError> {
        self.ctx.player_mut(player)?.push_event(event);
        Ok(())
    }

    pub fn send_entity_event(
        &mut self,
        entity: EntityId,
        event: Box<dyn Event>,
    ) -> Result<(), SyncError> {
        self.ctx.entity_mut(entity)?.push_event(event);
        Ok(())
    }

    /// Closes every connection.
    pub fn shutdown(&mut self) {
        let connections: Vec<ConnectionId> = self.peers.keys().copied().collect();
        for connection in connections {
            self.disconnect(connection, CloseReason::Shutdown);
        }
        self.failed.clear();
    }

    fn handle_message(
        &mut self,
        connection: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), SyncError> {
        match message {
            ClientMessage::Join { name } => self.on_join(connection, name),
            ClientMessage::Pong { timestamp } => self.on_pong(connection, timestamp),
            ClientMessage::State { tick, delta } => self.on_state(connection, tick, delta),
            ClientMessage::Event {
                tick,
                target,
                event,
            } => self.on_event(connection, tick, target, event),
        }
    }

    fn on_join(&mut self, connection: ConnectionId, name: String) -> Result<(), SyncError> {
        if self.player_of(connection).is_some() {
            log::warn!("Connection {} joined twice, ignoring", connection);
            return Ok(());
        }

        let capacity = self.ctx.players().capacity();
        if self.ctx.players().is_full() {
            let reason = format!("server full ({capacity} players)");
            self.send(
                connection,
                &ServerMessage::JoinRejected {
                    reason: reason.clone(),
                },
            );
            self.pending_events.push_back(ConnectionEvent::JoinRejected { connection, reason });
            return Err(SyncError::CapacityExceeded { capacity });
        }

        if !is_valid_name(&name) {
            return Err(SyncError::invalid(format!("invalid player name {name:?}")));
        }

        self.send_world(connection)?;

        let id = self.ctx.add_player(Player::new(name.clone()))?;
        if let Some(peer) = self.peers.get_mut(&connection) {
            peer.player = Some(id);
        }

        let player = self.ctx.player(id)?;
        let data = player.data().to_vec();
        let is_spectator = player.is_spectator();
        for (observer_connection, observer) in self.observers() {
            self.send(
                observer_connection,
                &ServerMessage::PlayerJoin {
                    id: id.0,
                    name: name.clone(),
                    is_private: observer == id,
                    is_spectator,
                    data: data.clone(),
                },
            );
        }

        log::info!("Player {} \"{}\" joined via {}", id, name, connection);
        self.pending_events.push_back(ConnectionEvent::PlayerJoined {
            connection,
            player: id,
            name,
        });
        Ok(())
    }

    /// Setup, existing players and existing entities for a new joiner.
    fn send_world(&mut self, connection: ConnectionId) -> Result<(), SyncError> {
        let mut messages = vec![ServerMessage::GameSetup {
            tick: self.ctx.clock().wrapped(),
            config: *self.ctx.config(),
            level: self.ctx.level().serialize(),
        }];

        for (id, player) in self.ctx.players().iter() {
            messages.push(ServerMessage::PlayerJoin {
                id: id.0,
                name: player.name().to_owned(),
                is_private: false,
                is_spectator: player.is_spectator(),
                data: player.data().to_vec(),
            });
        }

        for (id, entity) in self.ctx.entities().iter() {
            let kind = self.ctx.protocol().entity_kind(entity.kind())?;
            messages.push(ServerMessage::EntityAdd {
                id: id.0,
                kind: entity.kind(),
                owner: entity.owner().map(|owner| owner.0),
                state: kind.public_state(entity).to_array(),
            });
        }

        for message in &messages {
            self.send(connection, message);
        }
        Ok(())
    }

    fn on_pong(&mut self, connection: ConnectionId, timestamp: u16) -> Result<(), SyncError> {
        let Some(player) = self.player_of(connection) else {
            log::warn!("Pong without player from {}", connection);
            return Ok(());
        };
        if u64::from(timestamp) > PING_WINDOW_MS {
            return Err(SyncError::invalid(format!("pong timestamp {timestamp} out of range")));
        }

        let now = self.elapsed_ms() % PING_WINDOW_MS;
        let sample = (now + PING_WINDOW_MS - u64::from(timestamp)) % PING_WINDOW_MS;
        self.ctx.player_mut(player)?.observe_round_trip(sample as f64);
        Ok(())
    }

    fn on_state(
        &mut self,
        connection: ConnectionId,
        tick: Tick,
        delta: [f32; 4],
    ) -> Result<(), SyncError> {
        let delta = State::from_array(delta);
        if !delta.is_finite() {
            return Err(SyncError::invalid("state delta is not finite"));
        }

        let Some(entity_id) = self.controlled_entity_of(connection) else {
            log::warn!("State update without controlled entity from {}", connection);
            return Ok(());
        };

        let config = *self.ctx.config();
        let entity = self.ctx.entity_mut(entity_id)?;
        entity.advance_client_tick(tick)?;
        let velocity = entity.state().velocity(&delta, &config);
        self.ctx.integrate(entity_id, velocity)
    }

    fn on_event(
        &mut self,
        connection: ConnectionId,
        tick: Tick,
        target: u8,
        record: EventRecord,
    ) -> Result<(), SyncError> {
        let target = EventTarget::from_wire(target)?;
        let event = self
            .ctx
            .protocol()
            .decode_event(record.tag, &record.payload)?;
        let full_tick = self.ctx.clock().full();

        match target {
            EventTarget::Game => event.apply_to_game(&mut self.ctx, full_tick),
            EventTarget::Player => {
                let Some(player) = self.player_of(connection) else {
                    log::warn!("Player event without player from {}", connection);
                    return Ok(());
                };
                event.apply_to_player(&mut self.ctx, player, full_tick)
            }
            EventTarget::Entity => {
                let Some(entity) = self.controlled_entity_of(connection) else {
                    log::warn!("Entity event without controlled entity from {}", connection);
                    return Ok(());
                };
                let last = self.ctx.entity(entity)?.client_tick();
                if last != Some(tick) {
                    return Err(SyncError::StaleOrForgedTick {
                        last,
                        received: tick,
                    });
                }
                lag::apply_rewound(&mut self.ctx, tick, entity, event.as_ref())
            }
        }
    }

    fn report(&mut self, connection: ConnectionId, err: &SyncError) {
        if err.closes_connection() {
            log::warn!("Closing {}: {}", connection, err);
            self.disconnect(connection, CloseReason::InvalidMessage(err.to_string()));
            return;
        }
        match err {
            SyncError::NotFound { .. } => log::error!("{}: {}", connection, err),
            _ => log::warn!("Dropped message from {}: {}", connection, err),
        }
    }

    fn disconnect(&mut self, connection: ConnectionId, reason: CloseReason) {
        let Some(mut peer) = self.peers.remove(&connection) else {
            return;
        };
        peer.link.close(reason.as_str());

        if let Some(player) = peer.player
            && let Err(e) = self.drop_player(connection, player)
        {
            log::error!("Failed to remove player {}: {}", player, e);
        }

        log::info!(
            "Client {} ({}) disconnected: {}",
            connection,
            peer.address,
            reason.as_str()
        );
        self.pending_events
            .push_back(ConnectionEvent::Disconnected { connection, reason });
    }

    /// Removes a player along with the entity it controls.
    fn drop_player(&mut self, connection: ConnectionId, player: PlayerId) -> Result<(), SyncError> {
        if let Some(entity) = self.ctx.player(player)?.controlled_entity() {
            self.ctx.remove_entity(entity)?;
            log::info!("Entity {} removed", entity);
            self.broadcast(&ServerMessage::EntityRemove { id: entity.0 });
        }

        let removed = self.ctx.remove_player(player)?;
        self.broadcast(&ServerMessage::PlayerLeave { id: player.0 });
        log::info!("Player {} \"{}\" left", player, removed.name());
        self.pending_events.push_back(ConnectionEvent::PlayerLeft {
            connection,
            player,
            name: removed.name().to_owned(),
        });
        Ok(())
    }

    fn close_failed(&mut self) {
        while let Some(connection) = self.failed.pop() {
            self.disconnect(connection, CloseReason::SendFailed);
        }
    }

    fn send(&mut self, connection: ConnectionId, message: &ServerMessage) {
        let frame = match message.serialize() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to encode message for {}: {}", connection, e);
                return;
            }
        };
        self.send_frame(connection, frame);
    }

    fn send_frame(&mut self, connection: ConnectionId, frame: Vec<u8>) {
        let Some(peer) = self.peers.get_mut(&connection) else {
            return;
        };
        if let Err(e) = peer.link.send(frame) {
            log::warn!("Send to {} failed: {}", connection, e);
            if !self.failed.contains(&connection) {
                self.failed.push(connection);
            }
        }
    }

    fn flush_links(&mut self) {
        for (&connection, peer) in self.peers.iter_mut() {
            if let Err(e) = peer.link.flush() {
                log::warn!("Flush to {} failed: {}", connection, e);
                if !self.failed.contains(&connection) {
                    self.failed.push(connection);
                }
            }
        }
    }

    /// Sends one encoded copy of `message` to every joined player.
    fn broadcast(&mut self, message: &ServerMessage) {
        let frame = match message.serialize() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to encode broadcast: {}", e);
                return;
            }
        };
        for (connection, _) in self.observers() {
            self.send_frame(connection, frame.clone());
        }
    }

    /// Joined connections with their players.
    fn observers(&self) -> Vec<(ConnectionId, PlayerId)> {
        self.peers
            .iter()
            .filter_map(|(&connection, peer)| peer.player.map(|player| (connection, player)))
            .collect()
    }

    fn controlled_entity_of(&self, connection: ConnectionId) -> Option<EntityId> {
        self.player_of(connection)
            .and_then(|player| self.ctx.players().get(player))
            .and_then(Player::controlled_entity)
    }

    fn entity_add_message(
        &self,
        id: EntityId,
        kind: &dyn EntityKind,
        observer: &Player,
    ) -> Result<ServerMessage, SyncError> {
        let entity = self.ctx.entity(id)?;
        let state = if kind.is_friend_of(entity, observer) {
            kind.private_state(entity)
        } else {
            kind.public_state(entity)
        };
        Ok(ServerMessage::EntityAdd {
            id: id.0,
            kind: entity.kind(),
            owner: entity.owner().map(|owner| owner.0),
            state: state.to_array(),
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn ping_timestamp(&self) -> u16 {
        (self.elapsed_ms() % PING_WINDOW_MS) as u16
    }
}
