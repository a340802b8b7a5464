use std::time::{Duration, Instant};

/// Commit distances for classification. Defaults match the touch-screen
/// pixel values; the TUI substitutes cell-scaled ones since terminal cells
/// are far coarser than pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GestureThresholds {
    pub(crate) move_slop: f64,
    pub(crate) swipe_commit: f64,
    pub(crate) dismiss_commit: f64,
    pub(crate) long_press_delay: Duration,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            move_slop: 10.0,
            swipe_commit: 50.0,
            dismiss_commit: 100.0,
            long_press_delay: Duration::from_millis(150),
        }
    }
}

impl GestureThresholds {
    pub(crate) fn cell_scaled() -> Self {
        Self {
            move_slop: 2.0,
            swipe_commit: 6.0,
            dismiss_commit: 4.0,
            ..Self::default()
        }
    }
}

/// Every pointer interaction resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GestureIntent {
    TapPrevStory,
    TapNextStory,
    /// Hold past the delay: pause and hide chrome until release.
    LongPressStart,
    LongPressEnd,
    SwipeNextGroup,
    SwipePrevGroup,
    Dismiss,
    NoOp,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    origin_x: f64,
    origin_y: f64,
    started: Instant,
    long_press_fired: bool,
    moved_past_slop: bool,
}

/// Classifies raw pointer samples with dominant-axis disambiguation.
/// `poll` must be called from the event loop so a stationary hold can fire
/// the long-press without a dedicated timer.
pub(crate) struct GestureInterpreter {
    thresholds: GestureThresholds,
    touch: Option<ActiveTouch>,
}

impl GestureInterpreter {
    pub(crate) fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            touch: None,
        }
    }

    pub(crate) fn pointer_down(&mut self, x: f64, y: f64, now: Instant) {
        self.touch = Some(ActiveTouch {
            origin_x: x,
            origin_y: y,
            started: now,
            long_press_fired: false,
            moved_past_slop: false,
        });
    }

    pub(crate) fn pointer_move(&mut self, x: f64, y: f64) {
        let slop = self.thresholds.move_slop;
        if let Some(touch) = self.touch.as_mut()
            && ((x - touch.origin_x).abs() > slop || (y - touch.origin_y).abs() > slop)
        {
            // Movement cancels a pending long-press; one that already fired
            // stays active until release so the engine stays paused.
            touch.moved_past_slop = true;
        }
    }

    /// Fires `LongPressStart` once when the pointer has been held stationary
    /// past the delay.
    pub(crate) fn poll(&mut self, now: Instant) -> Option<GestureIntent> {
        let delay = self.thresholds.long_press_delay;
        if let Some(touch) = self.touch.as_mut()
            && !touch.long_press_fired
            && !touch.moved_past_slop
            && now.duration_since(touch.started) >= delay
        {
            touch.long_press_fired = true;
            return Some(GestureIntent::LongPressStart);
        }
        None
    }

    /// Resolve the interaction. Axis dominance is compared before any outcome
    /// commits, so a mostly-horizontal drag can never dismiss and a
    /// mostly-vertical one can never change groups.
    pub(crate) fn pointer_up(
        &mut self,
        x: f64,
        y: f64,
        now: Instant,
        surface_width: f64,
    ) -> GestureIntent {
        let Some(touch) = self.touch.take() else {
            return GestureIntent::NoOp;
        };

        let dx = x - touch.origin_x;
        let dy = y - touch.origin_y;
        let (abs_x, abs_y) = (dx.abs(), dy.abs());

        if abs_x > self.thresholds.swipe_commit && abs_x > abs_y {
            return if dx < 0.0 {
                GestureIntent::SwipeNextGroup
            } else {
                GestureIntent::SwipePrevGroup
            };
        }
        if dy > self.thresholds.dismiss_commit && abs_y > abs_x {
            return GestureIntent::Dismiss;
        }
        if touch.long_press_fired {
            return GestureIntent::LongPressEnd;
        }
        if abs_x <= self.thresholds.move_slop
            && abs_y <= self.thresholds.move_slop
            && now.duration_since(touch.started) < self.thresholds.long_press_delay
        {
            return tap_region(touch.origin_x, surface_width);
        }
        GestureIntent::NoOp
    }
}

/// Left 30% goes back, right 30% goes forward, the middle is inert.
fn tap_region(x: f64, surface_width: f64) -> GestureIntent {
    if surface_width <= 0.0 {
        return GestureIntent::NoOp;
    }
    let fraction = x / surface_width;
    if fraction < 0.3 {
        GestureIntent::TapPrevStory
    } else if fraction > 0.7 {
        GestureIntent::TapNextStory
    } else {
        GestureIntent::NoOp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 400.0;

    fn interpreter() -> GestureInterpreter {
        GestureInterpreter::new(GestureThresholds::default())
    }

    fn quick_release(start_x: f64, end: (f64, f64)) -> GestureIntent {
        let base = Instant::now();
        let mut gestures = interpreter();
        gestures.pointer_down(start_x, 200.0, base);
        gestures.pointer_move(end.0, end.1);
        gestures.pointer_up(end.0, end.1, base + Duration::from_millis(80), WIDTH)
    }

    #[test]
    fn taps_resolve_by_horizontal_region() {
        assert_eq!(quick_release(50.0, (50.0, 200.0)), GestureIntent::TapPrevStory);
        assert_eq!(quick_release(350.0, (350.0, 200.0)), GestureIntent::TapNextStory);
        assert_eq!(quick_release(200.0, (200.0, 200.0)), GestureIntent::NoOp);
    }

    #[test]
    fn dominant_horizontal_swipe_selects_group_navigation() {
        // dx = -90, dy = -5: next group, never a dismiss.
        assert_eq!(quick_release(300.0, (210.0, 195.0)), GestureIntent::SwipeNextGroup);
        // dx = +90: previous group.
        assert_eq!(quick_release(100.0, (190.0, 195.0)), GestureIntent::SwipePrevGroup);
    }

    #[test]
    fn dominant_downward_swipe_dismisses() {
        assert_eq!(quick_release(200.0, (205.0, 350.0)), GestureIntent::Dismiss);
        // Upward vertical movement is not a dismiss.
        assert_eq!(quick_release(200.0, (205.0, 50.0)), GestureIntent::NoOp);
    }

    #[test]
    fn ambiguous_movement_resolves_to_noop() {
        // Past slop but under every commit threshold.
        assert_eq!(quick_release(200.0, (225.0, 220.0)), GestureIntent::NoOp);
    }

    #[test]
    fn stationary_hold_fires_long_press_once_then_ends_on_release() {
        let base = Instant::now();
        let mut gestures = interpreter();
        gestures.pointer_down(200.0, 200.0, base);

        assert_eq!(gestures.poll(base + Duration::from_millis(100)), None);
        assert_eq!(
            gestures.poll(base + Duration::from_millis(160)),
            Some(GestureIntent::LongPressStart)
        );
        assert_eq!(gestures.poll(base + Duration::from_millis(300)), None, "fires once");

        let intent = gestures.pointer_up(201.0, 200.0, base + Duration::from_millis(400), WIDTH);
        assert_eq!(intent, GestureIntent::LongPressEnd);
    }

    #[test]
    fn movement_cancels_pending_long_press() {
        let base = Instant::now();
        let mut gestures = interpreter();
        gestures.pointer_down(200.0, 200.0, base);
        gestures.pointer_move(230.0, 200.0);

        assert_eq!(gestures.poll(base + Duration::from_millis(200)), None);
    }

    #[test]
    fn swipe_after_long_press_still_resolves_to_swipe() {
        let base = Instant::now();
        let mut gestures = interpreter();
        gestures.pointer_down(300.0, 200.0, base);
        assert_eq!(
            gestures.poll(base + Duration::from_millis(200)),
            Some(GestureIntent::LongPressStart)
        );

        gestures.pointer_move(210.0, 198.0);
        let intent = gestures.pointer_up(210.0, 198.0, base + Duration::from_millis(600), WIDTH);
        assert_eq!(intent, GestureIntent::SwipeNextGroup);
    }

    #[test]
    fn slow_stationary_release_after_cancelled_press_is_noop() {
        let base = Instant::now();
        let mut gestures = interpreter();
        gestures.pointer_down(350.0, 200.0, base);
        gestures.pointer_move(330.0, 200.0);
        gestures.pointer_move(350.0, 200.0);

        // Held past the tap window without a long press (movement cancelled
        // it): not a tap, not a swipe.
        let intent = gestures.pointer_up(350.0, 200.0, base + Duration::from_millis(500), WIDTH);
        assert_eq!(intent, GestureIntent::NoOp);
    }
}
