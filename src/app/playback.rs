use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineState {
    Idle,
    Playing,
    Paused,
    Closed,
}

/// Identity token for the active story/session. Every index change, resume,
/// and close issues a fresh ticket, so a tick scheduled against an earlier
/// story is rejected instead of mutating the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TickTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Progress advanced but the story is still running.
    Ticking,
    /// The story completed and the engine moved to the next one in-group.
    StoryAdvanced,
    /// The last story in the group completed; cross-group navigation is the
    /// coordinator's call.
    GroupComplete,
    /// Stale ticket or engine not playing; nothing was mutated.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Moved,
    GroupComplete,
}

/// Timer state machine for one group's stories. All wall-clock math runs off
/// an injected `Instant` so tests can simulate time exactly.
pub(crate) struct PlaybackEngine {
    state: EngineState,
    durations: Vec<f64>,
    story_index: usize,
    baseline: Instant,
    progress: f64,
    ticket: u64,
}

impl PlaybackEngine {
    pub(crate) fn new() -> Self {
        Self {
            state: EngineState::Idle,
            durations: Vec::new(),
            story_index: 0,
            baseline: Instant::now(),
            progress: 0.0,
            ticket: 0,
        }
    }

    /// Begin playing a group. `start_index` is clamped into bounds.
    pub(crate) fn start(&mut self, durations: Vec<f64>, start_index: usize, now: Instant) {
        if durations.is_empty() {
            self.close();
            return;
        }
        self.story_index = start_index.min(durations.len() - 1);
        self.durations = durations;
        self.state = EngineState::Playing;
        self.reset_story(now);
    }

    pub(crate) fn ticket(&self) -> TickTicket {
        TickTicket(self.ticket)
    }

    pub(crate) fn state(&self) -> EngineState {
        self.state
    }

    pub(crate) fn story_index(&self) -> usize {
        self.story_index
    }

    pub(crate) fn progress(&self) -> f64 {
        self.progress
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    /// Recompute progress from the time baseline and auto-advance at 1.0.
    pub(crate) fn tick(&mut self, ticket: TickTicket, now: Instant) -> TickOutcome {
        if self.state != EngineState::Playing || ticket.0 != self.ticket {
            return TickOutcome::Stale;
        }

        let elapsed = now.duration_since(self.baseline).as_secs_f64();
        self.progress = (elapsed / self.current_duration()).min(1.0);
        if self.progress < 1.0 {
            return TickOutcome::Ticking;
        }

        if self.story_index + 1 < self.durations.len() {
            self.story_index += 1;
            self.reset_story(now);
            TickOutcome::StoryAdvanced
        } else {
            // Invalidate the ticket: no further tick may touch the finished
            // story while the coordinator decides what comes next.
            self.ticket += 1;
            TickOutcome::GroupComplete
        }
    }

    /// Capture the exact progress fraction at pause time.
    pub(crate) fn pause(&mut self, now: Instant) {
        if self.state != EngineState::Playing {
            return;
        }
        let elapsed = now.duration_since(self.baseline).as_secs_f64();
        self.progress = (elapsed / self.current_duration()).min(1.0);
        self.state = EngineState::Paused;
        self.ticket += 1;
    }

    /// Resume from the captured fraction: the baseline is shifted back by the
    /// already-elapsed share of the duration, so playback continues from the
    /// visual point rather than from zero or from wall-clock-since-pause.
    pub(crate) fn resume(&mut self, now: Instant) {
        if self.state != EngineState::Paused {
            return;
        }
        let consumed = Duration::from_secs_f64(self.progress * self.current_duration());
        self.baseline = now - consumed;
        self.state = EngineState::Playing;
        self.ticket += 1;
    }

    pub(crate) fn advance(&mut self, now: Instant) -> StepOutcome {
        if !self.is_active() {
            return StepOutcome::GroupComplete;
        }
        if self.story_index + 1 < self.durations.len() {
            self.story_index += 1;
            self.state = EngineState::Playing;
            self.reset_story(now);
            StepOutcome::Moved
        } else {
            StepOutcome::GroupComplete
        }
    }

    pub(crate) fn retreat(&mut self, now: Instant) -> StepOutcome {
        if !self.is_active() {
            return StepOutcome::GroupComplete;
        }
        if self.story_index > 0 {
            self.story_index -= 1;
            self.state = EngineState::Playing;
            self.reset_story(now);
            StepOutcome::Moved
        } else {
            StepOutcome::GroupComplete
        }
    }

    /// Total, immediate teardown: no tick may fire after this.
    pub(crate) fn close(&mut self) {
        self.state = EngineState::Closed;
        self.progress = 0.0;
        self.ticket += 1;
    }

    fn is_active(&self) -> bool {
        matches!(self.state, EngineState::Playing | EngineState::Paused)
    }

    fn current_duration(&self) -> f64 {
        self.durations
            .get(self.story_index)
            .copied()
            .filter(|d| *d > 0.0)
            .unwrap_or(5.0)
    }

    /// Progress never carries over between stories.
    fn reset_story(&mut self, now: Instant) {
        self.progress = 0.0;
        self.baseline = now;
        self.ticket += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn auto_advances_through_unequal_durations_then_reports_group_complete() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0, 7.0], 0, base);

        assert_eq!(engine.tick(engine.ticket(), at(base, 2.5)), TickOutcome::Ticking);
        assert!((engine.progress() - 0.5).abs() < 1e-9);

        assert_eq!(engine.tick(engine.ticket(), at(base, 5.0)), TickOutcome::StoryAdvanced);
        assert_eq!(engine.story_index(), 1);
        assert_eq!(engine.progress(), 0.0, "progress resets on story change");

        // The second story runs a full 7s from its own baseline.
        assert_eq!(engine.tick(engine.ticket(), at(base, 11.0)), TickOutcome::Ticking);
        assert_eq!(engine.tick(engine.ticket(), at(base, 12.0)), TickOutcome::GroupComplete);
        assert_eq!(engine.story_index(), 1);
    }

    #[test]
    fn pause_then_resume_continues_from_captured_progress() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![10.0], 0, base);

        engine.pause(at(base, 4.0));
        assert!(engine.is_paused());
        assert!((engine.progress() - 0.4).abs() < 1e-9);

        // A long wall-clock gap while paused must not count.
        engine.resume(at(base, 60.0));
        let outcome = engine.tick(engine.ticket(), at(base, 61.0));
        assert_eq!(outcome, TickOutcome::Ticking);
        assert!((engine.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stale_ticket_never_mutates_state() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0, 5.0], 0, base);

        let old_ticket = engine.ticket();
        engine.advance(at(base, 1.0));
        assert_eq!(engine.story_index(), 1);

        // A tick scheduled against the previous story arrives late.
        assert_eq!(engine.tick(old_ticket, at(base, 20.0)), TickOutcome::Stale);
        assert_eq!(engine.progress(), 0.0);
        assert_eq!(engine.story_index(), 1);
    }

    #[test]
    fn no_tick_fires_after_close() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0], 0, base);
        let ticket = engine.ticket();

        engine.close();
        assert_eq!(engine.state(), EngineState::Closed);
        assert_eq!(engine.tick(ticket, at(base, 10.0)), TickOutcome::Stale);
        assert_eq!(engine.tick(engine.ticket(), at(base, 10.0)), TickOutcome::Stale);
    }

    #[test]
    fn ticks_while_paused_are_ignored() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0], 0, base);

        engine.pause(at(base, 1.0));
        assert_eq!(engine.tick(engine.ticket(), at(base, 4.0)), TickOutcome::Stale);
        assert!((engine.progress() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn retreat_resets_progress_and_stops_at_group_start() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0, 5.0], 1, base);

        engine.tick(engine.ticket(), at(base, 2.0));
        assert!(engine.progress() > 0.0);

        assert_eq!(engine.retreat(at(base, 2.0)), StepOutcome::Moved);
        assert_eq!(engine.story_index(), 0);
        assert_eq!(engine.progress(), 0.0);

        assert_eq!(engine.retreat(at(base, 3.0)), StepOutcome::GroupComplete);
    }

    #[test]
    fn start_clamps_out_of_bounds_index() {
        let base = Instant::now();
        let mut engine = PlaybackEngine::new();
        engine.start(vec![5.0, 5.0], 9, base);
        assert_eq!(engine.story_index(), 1);
    }
}
