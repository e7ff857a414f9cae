//! Hold-to-scroll acceleration.
//!
//! Holding a scroll key opens a session that speeds up along an ease-out
//! curve until it caps out after one second, advancing the page each
//! animation tick independently of the tick rate. Tuning lives in one place
//! so both directions and every caller stay consistent.

use std::time::Instant;

pub mod tuning {
    /// Page units advanced per reference frame at the start of a hold.
    pub const BASE_SPEED: f64 = 16.0;
    /// Cap reached after [`RAMP_MS`] of sustained hold.
    pub const MAX_SPEED: f64 = 72.0;
    /// Ramp duration from base to max speed (ms).
    pub const RAMP_MS: u64 = 1000;
    /// Reference frame length the speeds are expressed against (ms).
    pub const FRAME_MS: f64 = 16.0;
    /// Quiet period after the last raw scroll event before it settles (ms).
    pub const SCROLL_SETTLE_MS: u64 = 120;
    /// Quiet period after the last document mutation before it settles (ms).
    pub const MUTATION_SETTLE_MS: u64 = 150;
    /// Viewport fraction advanced per key press when key-release reporting
    /// is unavailable and holds cannot be tracked.
    pub const TAP_FRACTION: f64 = 0.7;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn sign(self) -> f64 {
        match self {
            ScrollDirection::Up => -1.0,
            ScrollDirection::Down => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Session {
    direction: ScrollDirection,
    started_at: Instant,
    last_tick: Instant,
}

/// At most one session is active; the opposite direction replaces it.
#[derive(Debug, Default)]
pub struct ScrollController {
    session: Option<Session>,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        self.session.map(|s| s.direction)
    }

    /// Key-down. Returns `true` when a new session started (key repeats in
    /// the same direction are absorbed into the running session).
    pub fn press(&mut self, direction: ScrollDirection, now: Instant) -> bool {
        if let Some(session) = self.session {
            if session.direction == direction {
                return false;
            }
        }
        self.session = Some(Session {
            direction,
            started_at: now,
            last_tick: now,
        });
        true
    }

    /// Key-up. Only stops the session if it is still running in that
    /// direction; the release of a replaced key must not kill its successor.
    pub fn release(&mut self, direction: ScrollDirection) {
        if self.session.map(|s| s.direction) == Some(direction) {
            self.session = None;
        }
    }

    /// Window focus loss cancels whatever is running.
    pub fn blur(&mut self) {
        self.session = None;
    }

    /// Advance the session to `now`; the returned delta (page units, signed)
    /// is what the page should scroll by for this tick.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let session = self.session.as_mut()?;
        let held_ms = now.duration_since(session.started_at).as_secs_f64() * 1000.0;
        let delta_ms = now.duration_since(session.last_tick).as_secs_f64() * 1000.0;
        session.last_tick = now;
        let speed = speed_after(held_ms);
        Some(session.direction.sign() * speed * delta_ms / tuning::FRAME_MS)
    }
}

fn ease_out(progress: f64) -> f64 {
    let inverse = 1.0 - progress.clamp(0.0, 1.0);
    1.0 - inverse * inverse * inverse
}

/// Speed (page units per reference frame) after holding for `held_ms`.
pub fn speed_after(held_ms: f64) -> f64 {
    let progress = held_ms / tuning::RAMP_MS as f64;
    tuning::BASE_SPEED + (tuning::MAX_SPEED - tuning::BASE_SPEED) * ease_out(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn speed_starts_at_base_and_caps_at_max() {
        assert!((speed_after(0.0) - tuning::BASE_SPEED).abs() < 1e-9);
        assert!((speed_after(tuning::RAMP_MS as f64) - tuning::MAX_SPEED).abs() < 1e-9);
        assert!((speed_after(5000.0) - tuning::MAX_SPEED).abs() < 1e-9);
    }

    #[test]
    fn speed_is_monotonic_over_the_ramp() {
        let mut last = 0.0;
        for ms in (0..=1000).step_by(50) {
            let speed = speed_after(ms as f64);
            assert!(speed >= last, "speed dipped at {ms} ms");
            last = speed;
        }
    }

    #[test]
    fn repeat_press_keeps_the_running_session() {
        let mut controller = ScrollController::new();
        let start = Instant::now();
        assert!(controller.press(ScrollDirection::Down, start));
        assert!(!controller.press(ScrollDirection::Down, start + Duration::from_millis(400)));
        // Still ramping from the original start time: well past base speed.
        let delta = controller
            .tick(start + Duration::from_millis(800))
            .expect("active session");
        assert!(delta > tuning::BASE_SPEED * 800.0 / tuning::FRAME_MS / 2.0);
    }

    #[test]
    fn opposite_direction_replaces_the_session() {
        let mut controller = ScrollController::new();
        let start = Instant::now();
        controller.press(ScrollDirection::Down, start);
        assert!(controller.press(ScrollDirection::Up, start + Duration::from_millis(500)));
        assert_eq!(controller.direction(), Some(ScrollDirection::Up));
        let delta = controller
            .tick(start + Duration::from_millis(516))
            .expect("active session");
        assert!(delta < 0.0);
    }

    #[test]
    fn release_of_a_replaced_key_is_ignored() {
        let mut controller = ScrollController::new();
        let start = Instant::now();
        controller.press(ScrollDirection::Down, start);
        controller.press(ScrollDirection::Up, start);
        controller.release(ScrollDirection::Down);
        assert!(controller.is_active());
        controller.release(ScrollDirection::Up);
        assert!(!controller.is_active());
    }

    #[test]
    fn blur_cancels_the_session() {
        let mut controller = ScrollController::new();
        controller.press(ScrollDirection::Down, Instant::now());
        controller.blur();
        assert!(controller.tick(Instant::now()).is_none());
    }

    #[test]
    fn ticks_are_frame_rate_independent() {
        // Past the ramp the speed is constant, so two 8 ms ticks must cover
        // the same distance as one 16 ms tick.
        let start = Instant::now();
        let settled = start + Duration::from_secs(2);

        let mut halves = ScrollController::new();
        halves.press(ScrollDirection::Down, start);
        halves.tick(settled);
        let a = halves.tick(settled + Duration::from_millis(8)).unwrap();
        let b = halves.tick(settled + Duration::from_millis(16)).unwrap();

        let mut whole = ScrollController::new();
        whole.press(ScrollDirection::Down, start);
        whole.tick(settled);
        let c = whole.tick(settled + Duration::from_millis(16)).unwrap();

        assert!((a + b - c).abs() < 1e-6);
    }
}
