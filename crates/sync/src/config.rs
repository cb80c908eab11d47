use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::SyncError;

pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Shared simulation parameters. The server owns the authoritative copy and
/// ships it to every client in the setup message.
#[derive(
    Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
#[rkyv(derive(Debug))]
#[serde(default)]
pub struct GameConfig {
    pub tick_rate: u32,
    pub max_players: u32,
    pub max_player_speed: f32,
    pub max_state_buffer_size: u32,
    pub max_entities: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_players: 8,
            max_player_speed: 10.0,
            max_state_buffer_size: 40,
            max_entities: 255,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(SyncError::InvalidConfig(format!(
                "tick rate must be within 1..=1000, got {}",
                self.tick_rate
            )));
        }
        if self.max_players == 0 || self.max_players > u16::MAX as u32 {
            return Err(SyncError::InvalidConfig(format!(
                "max players must be within 1..=65535, got {}",
                self.max_players
            )));
        }
        if self.max_entities == 0 || self.max_entities > u16::MAX as u32 {
            return Err(SyncError::InvalidConfig(format!(
                "max entities must be within 1..=65535, got {}",
                self.max_entities
            )));
        }
        // Lag compensation matches on the wrapped tick, so the history must
        // never hold two records with the same wrapped value.
        if self.max_state_buffer_size == 0 || self.max_state_buffer_size > 255 {
            return Err(SyncError::InvalidConfig(format!(
                "state buffer size must be within 1..=255, got {}",
                self.max_state_buffer_size
            )));
        }
        if !self.max_player_speed.is_finite() || self.max_player_speed < 0.0 {
            return Err(SyncError::InvalidConfig(format!(
                "max player speed must be a non-negative number, got {}",
                self.max_player_speed
            )));
        }
        Ok(())
    }

    /// Milliseconds per simulation step.
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / self.tick_rate as f64
    }

    /// Whole ticks needed to cover `ms` milliseconds, rounded up.
    pub fn ticks_for_ms(&self, ms: u32) -> u32 {
        (ms as f64 / self.tick_interval_ms()).ceil() as u32
    }

    pub fn state_buffer_size(&self) -> usize {
        self.max_state_buffer_size as usize
    }
}
