use std::f32::consts::TAU;

use ticksync::arena::Walker;
use ticksync::{ConnectionEvent, PlayerId, Server, State, SyncError};

const SPAWN_RADIUS: f32 = 10.0;

/// Arena game rules: every joining player gets a walker.
pub fn apply(server: &mut Server) {
    let events: Vec<ConnectionEvent> = server.drain_events().collect();
    for event in events {
        match event {
            ConnectionEvent::PlayerJoined { player, name, .. } => {
                if let Err(e) = spawn_walker(server, player) {
                    log::error!("Could not spawn a walker for \"{}\": {}", name, e);
                }
            }
            ConnectionEvent::JoinRejected { connection, reason } => {
                log::warn!("Turned away {}: {}", connection, reason);
            }
            ConnectionEvent::Connected { .. }
            | ConnectionEvent::PlayerLeft { .. }
            | ConnectionEvent::Disconnected { .. } => {}
        }
    }
}

fn spawn_walker(server: &mut Server, player: PlayerId) -> Result<(), SyncError> {
    let slots = server.config().max_players.max(1) as f32;
    let angle = TAU * f32::from(player.0) / slots;
    let spawn = State::new(
        angle.cos() * SPAWN_RADIUS,
        angle.sin() * SPAWN_RADIUS,
        0.0,
        angle + std::f32::consts::PI,
    );

    let entity = server.add_entity(Walker::TAG, spawn)?;
    server.set_controlled_entity(player, Some(entity))
}
