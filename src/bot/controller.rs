use tracing::debug;

use crate::bot::direction::resolve;
use crate::client::MotionConfig;
use crate::codec::{decode, ParsedCommand, Vec3};
use crate::protocol::mailbox::MailboxReader;

/// Source of a forward vector (camera, head, body)
pub trait Facing {
    fn forward(&self) -> Vec3;
}

/// The agent being moved
///
/// `apply_delta` is where a physics-aware mover would slide along
/// obstacles; plain targets just add the delta to their position.
pub trait Target: Facing {
    fn apply_delta(&mut self, delta: Vec3);
}

/// Travel left over from the last accepted step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    /// Meters still to travel, never negative
    pub distance_remaining: f32,
    /// Horizontal local direction; zero means "straight ahead"
    pub current_direction: Vec3,
}

impl MotionState {
    pub fn is_traveling(&self) -> bool {
        self.distance_remaining > 0.0
    }
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Command decoded from the mailbox this tick, if any
    pub consumed: Option<ParsedCommand>,
    /// World-space delta handed to the target
    pub delta: Vec3,
}

/// Turns mailbox messages into stepped motion, one tick at a time
pub struct MotionController {
    config: MotionConfig,
    mailbox: MailboxReader,
    state: MotionState,
}

impl MotionController {
    pub fn new(config: MotionConfig, mailbox: MailboxReader) -> Self {
        Self {
            config,
            mailbox,
            state: MotionState::default(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_traveling(&self) -> bool {
        self.state.is_traveling()
    }

    /// Drop any step in progress.
    pub fn reset(&mut self) {
        self.state = MotionState::default();
    }

    /// Step length committed by a command
    pub fn step_distance(&self, cmd: &ParsedCommand) -> f32 {
        let vel_factor = (cmd.vel / 127.0).clamp(0.0, 1.0);
        let speed_factor = cmd.speed.clamp(0.0, 1.0);
        let factor =
            1.0 + self.config.vel_weight * vel_factor + self.config.speed_weight * speed_factor;
        (self.config.base_step * factor).max(0.0)
    }

    /// Replace the current step with one derived from `cmd`.
    pub fn apply_command(&mut self, cmd: &ParsedCommand) {
        let note = cmd.note_name();
        let step = self.step_distance(cmd);
        self.state = MotionState {
            distance_remaining: step,
            current_direction: resolve(note.as_deref(), &self.config.note_directions),
        };

        if self.config.debug {
            debug!(
                note = note.as_deref().unwrap_or("-"),
                vel = cmd.vel,
                speed = cmd.speed,
                step,
                dir = %self.state.current_direction,
                "step"
            );
        }
    }

    /// Advance one frame.
    ///
    /// Drains the mailbox first, so a message arriving mid-tick waits for
    /// the next one. `facing` overrides the target's own forward when set.
    pub fn tick(
        &mut self,
        dt: f32,
        target: &mut dyn Target,
        facing: Option<&dyn Facing>,
    ) -> TickOutcome {
        let consumed = self.mailbox.take().filter(|raw| !raw.is_empty()).map(|raw| {
            let cmd = decode(&raw);
            self.apply_command(&cmd);
            cmd
        });

        let forward = horizontal_forward(match facing {
            Some(facing) => facing.forward(),
            None => target.forward(),
        });

        let delta = self.advance(dt, forward);
        if delta != Vec3::ZERO {
            target.apply_delta(delta);
        }

        TickOutcome { consumed, delta }
    }

    /// Integrate the current step for `dt` seconds along `forward`.
    fn advance(&mut self, dt: f32, forward: Vec3) -> Vec3 {
        if !self.state.is_traveling() {
            return Vec3::ZERO;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let dir = if self.state.current_direction.is_degenerate() {
            forward
        } else {
            to_world_direction(forward, self.state.current_direction)
        };

        let step = self.state.distance_remaining.min(self.config.move_speed.max(0.0) * dt);
        self.state.distance_remaining = (self.state.distance_remaining - step).max(0.0);
        dir * step
    }
}

/// Horizontal unit forward, or world forward if `raw` points straight up
/// or down.
pub fn horizontal_forward(raw: Vec3) -> Vec3 {
    let fwd = raw.project_on_plane(Vec3::UP).normalized();
    if fwd.is_degenerate() {
        Vec3::FORWARD
    } else {
        fwd
    }
}

/// Rotate a local direction (x = right, z = forward) into world space.
pub fn to_world_direction(forward: Vec3, local: Vec3) -> Vec3 {
    let forward = forward.normalized();
    let right = Vec3::UP.cross(forward).normalized();
    let dir = right * local.x + forward * local.z;
    if dir.is_degenerate() {
        forward
    } else {
        dir.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::direction::NoteDirection;
    use crate::protocol::mailbox::{self, MailboxWriter};

    const EPS: f32 = 1e-5;

    struct Body {
        position: Vec3,
        forward: Vec3,
        moves: usize,
    }

    impl Body {
        fn facing(forward: Vec3) -> Self {
            Self { position: Vec3::ZERO, forward, moves: 0 }
        }
    }

    impl Facing for Body {
        fn forward(&self) -> Vec3 {
            self.forward
        }
    }

    impl Target for Body {
        fn apply_delta(&mut self, delta: Vec3) {
            self.position += delta;
            self.moves += 1;
        }
    }

    struct Camera(Vec3);

    impl Facing for Camera {
        fn forward(&self) -> Vec3 {
            self.0
        }
    }

    fn controller(config: MotionConfig) -> (MotionController, MailboxWriter) {
        let (writer, reader) = mailbox::channel();
        (MotionController::new(config, reader), writer)
    }

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.distance_to(b) < EPS, "{a} != {b}");
    }

    #[test]
    fn test_step_magnitude() {
        let (ctrl, _) = controller(MotionConfig::default());
        let cmd = ParsedCommand { vel: 127.0, speed: 1.0, ..Default::default() };
        assert!((ctrl.step_distance(&cmd) - 1.0).abs() < EPS);

        let cmd = ParsedCommand { vel: 500.0, speed: -3.0, ..Default::default() };
        assert!((ctrl.step_distance(&cmd) - 0.75).abs() < EPS);

        assert!((ctrl.step_distance(&ParsedCommand::default()) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_tick_clamps_to_remaining_distance() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish("vel:127,speed:1;C4".into());
        let outcome = ctrl.tick(1.0, &mut body, None);

        assert!(outcome.consumed.is_some());
        assert_close(outcome.delta, Vec3::new(0.0, 0.0, 1.0));
        assert_close(body.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(ctrl.state().distance_remaining, 0.0);
        assert!(!ctrl.is_traveling());

        let outcome = ctrl.tick(1.0, &mut body, None);
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(body.moves, 1);
    }

    #[test]
    fn test_travel_spreads_over_ticks() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        // 0.5 * (1 + 0.5 * 1) = 0.75m at 2 m/s
        writer.publish("speed:1;D2".into());
        for _ in 0..3 {
            ctrl.tick(0.1, &mut body, None);
        }
        assert!((ctrl.state().distance_remaining - 0.15).abs() < EPS);
        ctrl.tick(0.1, &mut body, None);
        assert_eq!(ctrl.state().distance_remaining, 0.0);
        assert_close(body.position, Vec3::new(0.75, 0.0, 0.0));
    }

    #[test]
    fn test_zero_dt_does_not_move() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish("vel:64;E3".into());
        let before = ctrl.tick(0.0, &mut body, None);
        assert!(before.consumed.is_some());
        assert_eq!(before.delta, Vec3::ZERO);
        assert_eq!(body.moves, 0);
        assert!(ctrl.is_traveling());

        ctrl.tick(f32::NAN, &mut body, None);
        ctrl.tick(-1.0, &mut body, None);
        assert_eq!(body.position, Vec3::ZERO);
    }

    #[test]
    fn test_last_message_wins() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish("vel:127,speed:1;E4".into());
        writer.publish(";F4".into());
        let outcome = ctrl.tick(10.0, &mut body, None);

        assert_eq!(outcome.consumed.unwrap().note.as_deref(), Some("F4"));
        assert_close(body.position, Vec3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn test_new_message_interrupts_step() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish("vel:127,speed:1;C4".into());
        ctrl.tick(0.25, &mut body, None);
        assert!((ctrl.state().distance_remaining - 0.5).abs() < EPS);

        writer.publish(";E4".into());
        ctrl.tick(0.0, &mut body, None);
        let state = ctrl.state();
        assert!((state.distance_remaining - 0.5).abs() < EPS);
        assert_eq!(state.current_direction, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_unmatched_note_travels_forward() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::new(1.0, 0.0, 0.0));

        writer.publish("vel:0".into());
        ctrl.tick(1.0, &mut body, None);
        assert_eq!(ctrl.state().current_direction, Vec3::ZERO);
        assert_close(body.position, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_facing_overrides_target_forward() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);
        // Looking down and to the left: projects to -X.
        let camera = Camera(Vec3::new(-1.0, -1.0, 0.0));

        writer.publish(";C4".into());
        ctrl.tick(1.0, &mut body, Some(&camera as &dyn Facing));
        assert_close(body.position, Vec3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn test_local_direction_is_relative_to_forward() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        // Facing +X, "right" is -Z.
        let mut body = Body::facing(Vec3::new(1.0, 0.0, 0.0));

        writer.publish(";D4".into());
        ctrl.tick(1.0, &mut body, None);
        assert_close(body.position, Vec3::new(0.0, 0.0, -0.5));
    }

    #[test]
    fn test_diagonal_is_normalized() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish(";G4".into());
        ctrl.tick(1.0, &mut body, None);
        let h = 0.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert_close(body.position, Vec3::new(h, 0.0, h));
    }

    #[test]
    fn test_degenerate_forward_falls_back_to_world_forward() {
        assert_eq!(horizontal_forward(Vec3::UP), Vec3::FORWARD);
        assert_eq!(horizontal_forward(Vec3::new(0.0, -3.0, 0.0)), Vec3::FORWARD);
        assert_close(horizontal_forward(Vec3::new(0.0, 1.0, -2.0)), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_to_world_direction_degenerate_local() {
        let fwd = Vec3::new(0.0, 0.0, -1.0);
        // Sums to zero in world space: falls back to forward.
        assert_eq!(to_world_direction(fwd, Vec3::new(0.0, 0.0, 0.0)), fwd);
        assert_close(to_world_direction(fwd, Vec3::new(1.0, 0.0, 0.0)), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_custom_table() {
        let config = MotionConfig {
            note_directions: vec![NoteDirection::new("C#", -1.0, 0.0)],
            ..Default::default()
        };
        let (mut ctrl, writer) = controller(config);
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish("midi:61".into());
        ctrl.tick(1.0, &mut body, None);
        assert_close(body.position, Vec3::new(-0.5, 0.0, 0.0));

        writer.publish("midi:60".into());
        ctrl.tick(1.0, &mut body, None);
        assert_close(body.position, Vec3::new(-0.5, 0.0, 0.5));
    }

    #[test]
    fn test_empty_message_is_skipped() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);

        writer.publish(String::new());
        let outcome = ctrl.tick(1.0, &mut body, None);
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(ctrl.state(), MotionState::default());
        assert_eq!(body.position, Vec3::ZERO);
    }

    #[test]
    fn test_reset() {
        let (mut ctrl, writer) = controller(MotionConfig::default());
        let mut body = Body::facing(Vec3::FORWARD);
        writer.publish(";A0".into());
        ctrl.tick(0.0, &mut body, None);
        assert!(ctrl.is_traveling());
        ctrl.reset();
        assert_eq!(ctrl.state(), MotionState::default());
    }
}
