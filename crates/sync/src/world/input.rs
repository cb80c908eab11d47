use std::collections::VecDeque;

use crate::net::Tick;

/// Raw input captured on a client tick. Its meaning belongs to the entity
/// kind that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSample {
    pub tick: Tick,
    pub values: Vec<f32>,
}

impl InputSample {
    pub fn new(tick: Tick, values: Vec<f32>) -> Self {
        Self { tick, values }
    }

    pub fn value(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }
}

/// Inputs applied locally but not yet confirmed by the server, oldest first.
#[derive(Debug)]
pub struct InputBuffer {
    samples: VecDeque<InputSample>,
    max_size: usize,
}

impl InputBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn push(&mut self, sample: InputSample) {
        while self.samples.len() >= self.max_size.max(1) {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Index of the newest sample taken at `tick`.
    pub fn position_of(&self, tick: Tick) -> Option<usize> {
        self.samples.iter().rposition(|sample| sample.tick == tick)
    }

    /// Samples recorded after the sample at `index`.
    pub fn after(&self, index: usize) -> impl Iterator<Item = &InputSample> + '_ {
        self.samples.iter().skip(index + 1)
    }

    /// Drops every sample up to and including `index`.
    pub fn confirm_through(&mut self, index: usize) {
        let count = (index + 1).min(self.samples.len());
        self.samples.drain(..count);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputSample> + '_ {
        self.samples.iter()
    }
}
