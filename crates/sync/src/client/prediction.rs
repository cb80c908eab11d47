use crate::client::InputSource;
use crate::error::SyncError;
use crate::net::Tick;
use crate::simulation::SimulationContext;
use crate::world::{EntityId, InputSample, State};

/// Rebases the controlled entity on the server's confirmed position, then
/// replays every input the server has not confirmed yet.
pub fn reconcile(
    ctx: &mut SimulationContext,
    id: EntityId,
    confirmed_tick: Tick,
    server_state: &State,
) -> Result<(), SyncError> {
    let entity = ctx.entity_mut(id)?;
    entity.state_mut().merge(server_state);
    entity.settle();

    let pending: Vec<InputSample> = match entity.inputs().position_of(confirmed_tick) {
        Some(index) => {
            let pending = entity.inputs().after(index).cloned().collect();
            entity.inputs_mut().confirm_through(index);
            pending
        }
        None => entity.inputs().iter().cloned().collect(),
    };

    for sample in &pending {
        apply_input(ctx, id, sample, true)?;
    }
    Ok(())
}

/// Samples, records and applies this tick's input. Returns the delta to
/// report to the server.
pub fn predict(
    ctx: &mut SimulationContext,
    id: EntityId,
    tick: Tick,
    source: &mut dyn InputSource,
) -> Result<State, SyncError> {
    let entity = ctx.entity_mut(id)?;
    let values = source.sample(entity, tick).unwrap_or_default();
    let sample = InputSample::new(tick, values);
    entity.inputs_mut().push(sample.clone());

    apply_input(ctx, id, &sample, false)?;

    let entity = ctx.entity(id)?;
    Ok(entity.state().diff(entity.previous_state()))
}

/// Heading never gets corrected by the server, so a replayed input only
/// re-applies its positional part.
fn apply_input(
    ctx: &mut SimulationContext,
    id: EntityId,
    sample: &InputSample,
    replay: bool,
) -> Result<(), SyncError> {
    let config = *ctx.config();
    let entity = ctx.entity_mut(id)?;
    entity.settle();
    let kind = ctx.protocol().entity_kind(ctx.entity(id)?.kind())?;

    let mut velocity = State::ZERO;
    kind.apply_input(&mut velocity, sample, &config);
    if replay {
        velocity.heading = 0.0;
    }
    ctx.integrate(id, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::protocol::Protocol;
    use crate::simulation::{OpenLevel, Role};
    use crate::world::{Entity, EntityKind};

    /// Moves `values[0]` along x per tick and turns by `values[1]`.
    #[derive(Debug)]
    struct Slider;

    impl EntityKind for Slider {
        fn name(&self) -> &'static str {
            "slider"
        }

        fn apply_input(&self, velocity: &mut State, input: &InputSample, _config: &GameConfig) {
            velocity.position.x = input.value(0);
            velocity.heading = input.value(1);
        }
    }

    fn context() -> (SimulationContext, EntityId) {
        let mut ctx = SimulationContext::new(
            Role::Client,
            GameConfig::default(),
            Protocol::builder().entity(1, Slider).build(),
            Box::new(OpenLevel),
        );
        let id = ctx.add_entity(Entity::new(1, State::ZERO, 40)).unwrap();
        (ctx, id)
    }

    fn step(ctx: &mut SimulationContext, id: EntityId, tick: Tick, dx: f32) -> State {
        let mut source = move |_: &Entity, _: Tick| Some(vec![dx, 0.0]);
        predict(ctx, id, tick, &mut source).unwrap()
    }

    #[test]
    fn server_correction_wins_without_pending_input() {
        let (mut ctx, id) = context();
        for tick in 1..=5 {
            step(&mut ctx, id, tick, 2.0);
        }
        assert_eq!(ctx.entity(id).unwrap().state().position.x, 10.0);

        reconcile(&mut ctx, id, 5, &State::new(9.0, 0.0, 0.0, 0.0)).unwrap();

        let entity = ctx.entity(id).unwrap();
        assert_eq!(entity.state().position.x, 9.0);
        assert!(entity.inputs().is_empty());
    }

    #[test]
    fn unconfirmed_inputs_are_replayed_on_top() {
        let (mut ctx, id) = context();
        for tick in 1..=5 {
            step(&mut ctx, id, tick, 1.0);
        }

        // Server only saw ticks 1..=3 and nudged the entity.
        reconcile(&mut ctx, id, 3, &State::new(2.5, 0.0, 0.0, 0.0)).unwrap();

        let entity = ctx.entity(id).unwrap();
        assert_eq!(entity.state().position.x, 4.5);
        let left: Vec<Tick> = entity.inputs().iter().map(|s| s.tick).collect();
        assert_eq!(left, vec![4, 5]);
    }

    #[test]
    fn unmatched_confirmation_replays_everything() {
        let (mut ctx, id) = context();
        for tick in 10..=12 {
            step(&mut ctx, id, tick, 1.0);
        }
        reconcile(&mut ctx, id, 200, &State::ZERO).unwrap();
        assert_eq!(ctx.entity(id).unwrap().state().position.x, 3.0);
        assert_eq!(ctx.entity(id).unwrap().inputs().len(), 3);
    }

    #[test]
    fn replay_keeps_local_heading() {
        let (mut ctx, id) = context();
        let mut turn = |_: &Entity, _: Tick| Some(vec![0.0, 0.25]);
        predict(&mut ctx, id, 1, &mut turn).unwrap();
        predict(&mut ctx, id, 2, &mut turn).unwrap();
        assert_eq!(ctx.entity(id).unwrap().state().heading, 0.5);

        reconcile(&mut ctx, id, 1, &State::new(0.0, 0.0, 0.0, 9.0)).unwrap();
        assert_eq!(ctx.entity(id).unwrap().state().heading, 0.5);
    }

    #[test]
    fn idle_ticks_still_leave_a_confirmation_point() {
        let (mut ctx, id) = context();
        step(&mut ctx, id, 1, 3.0);
        let mut idle = crate::client::Idle;
        let delta = predict(&mut ctx, id, 2, &mut idle).unwrap();
        assert_eq!(delta.position.x, 0.0);

        reconcile(&mut ctx, id, 2, &State::new(3.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(ctx.entity(id).unwrap().state().position.x, 3.0);
    }

    #[test]
    fn reported_delta_is_this_ticks_motion() {
        let (mut ctx, id) = context();
        step(&mut ctx, id, 1, 1.0);
        let delta = step(&mut ctx, id, 2, 0.5);
        assert_eq!(delta.position.x, 0.5);
        assert_eq!(delta.heading, 0.0);
    }
}
