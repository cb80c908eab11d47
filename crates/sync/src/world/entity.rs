use crate::error::SyncError;
use crate::event::Event;
use crate::net::Tick;
use crate::world::{
    EntityId, EntityTag, InputBuffer, PlayerId, Slotted, State, StateHistory, StateRecord,
};

/// A simulated object. Behavior comes from its kind, looked up by `kind`.
#[derive(Debug)]
pub struct Entity {
    id: Option<EntityId>,
    kind: EntityTag,
    owner: Option<PlayerId>,
    state: State,
    previous: State,
    inputs: InputBuffer,
    history: StateHistory,
    client_tick: Option<Tick>,
    saved: Option<State>,
    visible: Option<bool>,
    events: Vec<Box<dyn Event>>,
}

impl Entity {
    pub fn new(kind: EntityTag, state: State, buffer_size: usize) -> Self {
        Self {
            id: None,
            kind,
            owner: None,
            state,
            previous: state,
            inputs: InputBuffer::new(buffer_size),
            history: StateHistory::new(buffer_size),
            client_tick: None,
            saved: None,
            visible: None,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn kind(&self) -> EntityTag {
        self.kind
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// Only the simulation context may relink, so both sides stay in sync.
    pub(crate) fn set_owner(&mut self, owner: Option<PlayerId>) {
        self.owner = owner;
        self.client_tick = None;
        self.inputs.clear();
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn previous_state(&self) -> &State {
        &self.previous
    }

    /// Marks the current state as the interpolation origin.
    pub fn settle(&mut self) {
        self.previous = self.state;
    }

    /// Snaps to `state` with no interpolation from the old one.
    pub fn apply_state(&mut self, state: State) {
        self.state = state;
        self.previous = state;
    }

    /// Adopts a remote authoritative state, keeping the old one for
    /// interpolation.
    pub fn follow(&mut self, state: State) {
        self.previous = self.state;
        self.state = state;
    }

    /// Integrates a velocity already passed through level collision.
    pub(crate) fn integrate(&mut self, velocity: State) {
        self.state.update(&velocity);
    }

    pub fn inputs(&self) -> &InputBuffer {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut InputBuffer {
        &mut self.inputs
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Closes a server tick: the current state becomes both the interpolation
    /// origin and the newest history record.
    pub fn record_tick(&mut self, tick: Tick, full_tick: u64) {
        self.previous = self.state;
        self.history.push(StateRecord {
            tick,
            full_tick,
            client_tick: self.client_tick,
            state: self.state,
        });
    }

    pub fn client_tick(&self) -> Option<Tick> {
        self.client_tick
    }

    /// Accepts the next client tick. After the first update each tick must be
    /// exactly one step past the last, wrapping at 256.
    pub fn advance_client_tick(&mut self, tick: Tick) -> Result<(), SyncError> {
        if let Some(last) = self.client_tick
            && tick.wrapping_sub(last) != 1
        {
            return Err(SyncError::StaleOrForgedTick {
                last: Some(last),
                received: tick,
            });
        }
        self.client_tick = Some(tick);
        Ok(())
    }

    /// Saves the present state and jumps to the state recorded at the wrapped
    /// server `tick`. With no matching record the present state stays.
    pub fn rewind(&mut self, tick: Tick) {
        self.saved = Some(self.state);
        if let Some(record) = self.history.find(tick) {
            self.state = record.state;
        }
    }

    pub fn forward(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.state = saved;
        }
    }

    pub fn is_rewound(&self) -> bool {
        self.saved.is_some()
    }

    /// Visibility as last reported by the server; `None` before the first
    /// report.
    pub fn visible(&self) -> Option<bool> {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = Some(visible);
    }

    pub fn push_event(&mut self, event: Box<dyn Event>) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Box<dyn Event>> {
        std::mem::take(&mut self.events)
    }
}

impl Slotted for Entity {
    type Id = EntityId;

    fn set_slot(&mut self, id: Option<EntityId>) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with_history() -> Entity {
        let mut entity = Entity::new(0, State::ZERO, 40);
        for full in 1..=5u64 {
            entity.state_mut().position.x = full as f32;
            entity.record_tick(full as Tick, full);
        }
        entity.state_mut().position.x = 99.0;
        entity
    }

    #[test]
    fn first_client_tick_is_accepted() {
        let mut entity = Entity::new(0, State::ZERO, 40);
        assert!(entity.advance_client_tick(200).is_ok());
        assert_eq!(entity.client_tick(), Some(200));
    }

    #[test]
    fn client_tick_must_step_by_one() {
        let mut entity = Entity::new(0, State::ZERO, 40);
        entity.advance_client_tick(254).unwrap();
        entity.advance_client_tick(255).unwrap();
        entity.advance_client_tick(0).unwrap();

        assert!(matches!(
            entity.advance_client_tick(0),
            Err(SyncError::StaleOrForgedTick {
                last: Some(0),
                received: 0
            })
        ));
        assert!(entity.advance_client_tick(5).is_err());
        assert!(entity.advance_client_tick(255).is_err());
        assert_eq!(entity.client_tick(), Some(0));
    }

    #[test]
    fn relinking_forgets_client_tick() {
        let mut entity = Entity::new(0, State::ZERO, 40);
        entity.advance_client_tick(10).unwrap();
        entity.set_owner(Some(PlayerId(1)));
        assert_eq!(entity.client_tick(), None);
    }

    #[test]
    fn rewind_then_forward_restores() {
        let mut entity = entity_with_history();
        entity.rewind(3);
        assert_eq!(entity.state().position.x, 3.0);
        assert!(entity.is_rewound());
        entity.forward();
        assert_eq!(entity.state().position.x, 99.0);
        assert!(!entity.is_rewound());
    }

    #[test]
    fn rewind_without_record_keeps_state() {
        let mut entity = entity_with_history();
        entity.rewind(77);
        assert_eq!(entity.state().position.x, 99.0);
        entity.forward();
        assert_eq!(entity.state().position.x, 99.0);
    }

    #[test]
    fn record_tick_stamps_client_tick() {
        let mut entity = Entity::new(0, State::ZERO, 40);
        entity.advance_client_tick(9).unwrap();
        entity.record_tick(4, 260);
        let record = entity.history().latest().unwrap();
        assert_eq!(record.client_tick, Some(9));
        assert_eq!(record.full_tick, 260);
        assert_eq!(record.tick, 4);
    }
}
