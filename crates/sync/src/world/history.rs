use std::collections::VecDeque;

use crate::net::Tick;
use crate::world::State;

/// Authoritative state of one entity at the end of a server tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateRecord {
    pub tick: Tick,
    pub full_tick: u64,
    pub client_tick: Option<Tick>,
    pub state: State,
}

/// Rolling per-entity history used to rewind entities for lag compensation.
#[derive(Debug)]
pub struct StateHistory {
    records: VecDeque<StateRecord>,
    max_size: usize,
}

impl StateHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn push(&mut self, record: StateRecord) {
        self.records.push_back(record);
        while self.records.len() > self.max_size {
            self.records.pop_front();
        }
    }

    /// Newest record stamped with the wrapped server `tick`.
    pub fn find(&self, tick: Tick) -> Option<&StateRecord> {
        self.records.iter().rev().find(|record| record.tick == tick)
    }

    pub fn latest(&self) -> Option<&StateRecord> {
        self.records.back()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateRecord> + '_ {
        self.records.iter()
    }
}
