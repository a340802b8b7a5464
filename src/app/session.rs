use std::time::Instant;

use super::catalog::{Author, Catalog, Story, StoryGroup};
use super::chain::{ChainEndPolicy, ChainKind, ChainSnapshot, Chains};
use super::gesture::{GestureIntent, GestureInterpreter, GestureThresholds};
use super::playback::{PlaybackEngine, StepOutcome, TickOutcome};
use super::viewed::ViewedMemory;

/// Fire-and-forget notifications drained by the caller; delivery is never
/// awaited by the playback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutboundEvent {
    ContentViewed { group_id: String },
}

/// Everything the presentation surface needs to render one frame, with no
/// state-machine logic of its own.
pub(crate) struct ViewFrame<'a> {
    pub(crate) author: Option<&'a Author>,
    pub(crate) group: &'a StoryGroup,
    pub(crate) story: &'a Story,
    pub(crate) story_index: usize,
    pub(crate) story_count: usize,
    pub(crate) posted_age: String,
    pub(crate) progress: f64,
    pub(crate) paused: bool,
    pub(crate) chrome_hidden: bool,
    pub(crate) has_prev_group: bool,
    pub(crate) has_next_group: bool,
}

/// One viewing session: owns the frozen chain snapshot, the playback engine,
/// and the gesture interpreter, and translates intents into transitions.
pub(crate) struct ViewerSession {
    snapshot: ChainSnapshot,
    /// Frozen seen chain, present only under `ContinueIntoSeen` when the
    /// session opened on the unseen chain.
    fallthrough: Option<ChainSnapshot>,
    engine: PlaybackEngine,
    gestures: GestureInterpreter,
    active_group: String,
    chrome_hidden: bool,
    hold_active: bool,
    closed: bool,
    status: Option<String>,
    events: Vec<OutboundEvent>,
}

impl ViewerSession {
    /// Open a session at `group_id`. The chain the group currently belongs to
    /// is frozen here and never rebuilt for the session's lifetime. Returns
    /// `None` when the group is not in the eligible set.
    pub(crate) fn open(
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        chains: &Chains,
        group_id: &str,
        story_hint: Option<usize>,
        policy: ChainEndPolicy,
        thresholds: GestureThresholds,
        now: Instant,
    ) -> Option<Self> {
        catalog.group(group_id)?;
        let kind = chains.chain_for(group_id)?;
        let snapshot = chains.snapshot(kind);
        let fallthrough = (policy == ChainEndPolicy::ContinueIntoSeen
            && snapshot.kind() == ChainKind::Unseen)
            .then(|| chains.snapshot(ChainKind::Seen));

        let mut session = Self {
            snapshot,
            fallthrough,
            engine: PlaybackEngine::new(),
            gestures: GestureInterpreter::new(thresholds),
            active_group: group_id.to_string(),
            chrome_hidden: false,
            hold_active: false,
            closed: false,
            status: None,
            events: Vec::new(),
        };
        if !session.enter_group(catalog, viewed, group_id, story_hint, now) {
            return None;
        }
        Some(session)
    }

    /// Per-group entry sequence, shared by `open` and every cross-group move:
    /// mark seen immediately, publish the location, start the engine.
    fn enter_group(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        group_id: &str,
        story_hint: Option<usize>,
        now: Instant,
    ) -> bool {
        let Some(group) = catalog.group(group_id) else {
            // Deleted between chain build and entry: resolve to close.
            self.close(viewed);
            return false;
        };

        let start_index = match story_hint {
            Some(hint) if hint < group.stories.len() => hint,
            _ => viewed.first_unseen_index(group),
        };

        viewed.record_view(&group.id, &group.latest_story().id);
        viewed.publish_location(&group.id, start_index);
        self.events.push(OutboundEvent::ContentViewed {
            group_id: group.id.clone(),
        });

        self.active_group = group.id.clone();
        self.chrome_hidden = false;
        self.hold_active = false;
        self.engine.start(group.durations(), start_index, now);
        true
    }

    /// Drive the recurring tick and the long-press clock. Called from the
    /// event loop at sub-frame granularity.
    pub(crate) fn poll(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        now: Instant,
    ) {
        if self.closed {
            return;
        }
        if let Some(GestureIntent::LongPressStart) = self.gestures.poll(now) {
            self.engine.pause(now);
            self.chrome_hidden = true;
            self.hold_active = true;
        }
        if self.engine.tick(self.engine.ticket(), now) == TickOutcome::GroupComplete {
            self.leave_group_forward(catalog, viewed, now);
        }
    }

    pub(crate) fn on_pointer_down(&mut self, x: f64, y: f64, now: Instant) {
        self.gestures.pointer_down(x, y, now);
    }

    pub(crate) fn on_pointer_move(&mut self, x: f64, y: f64) {
        self.gestures.pointer_move(x, y);
    }

    pub(crate) fn on_pointer_up(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        x: f64,
        y: f64,
        now: Instant,
        surface_width: f64,
    ) {
        let intent = self.gestures.pointer_up(x, y, now, surface_width);
        // Any release ends an active hold: chrome comes back and playback
        // resumes from the captured fraction before the intent applies.
        if self.hold_active {
            self.hold_active = false;
            self.chrome_hidden = false;
            self.engine.resume(now);
        }
        match intent {
            GestureIntent::TapNextStory => self.advance_story(catalog, viewed, now),
            GestureIntent::TapPrevStory => self.retreat_story(catalog, viewed, now),
            GestureIntent::SwipeNextGroup => self.swipe_next_group(catalog, viewed, now),
            GestureIntent::SwipePrevGroup => self.swipe_prev_group(catalog, viewed, now),
            GestureIntent::Dismiss => self.close(viewed),
            GestureIntent::LongPressEnd | GestureIntent::LongPressStart | GestureIntent::NoOp => {}
        }
    }

    /// Next story in-group; at the group's end, consult the frozen snapshot.
    pub(crate) fn advance_story(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        now: Instant,
    ) {
        if self.closed {
            return;
        }
        if self.engine.advance(now) == StepOutcome::GroupComplete {
            self.leave_group_forward(catalog, viewed, now);
        }
    }

    /// Previous story in-group; at the group's start, move to the previous
    /// group or stay put.
    pub(crate) fn retreat_story(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        now: Instant,
    ) {
        if self.closed {
            return;
        }
        if self.engine.retreat(now) == StepOutcome::GroupComplete {
            let prev = self.snapshot.neighbors(&self.active_group).prev;
            if let Some(prev) = prev {
                self.enter_group(catalog, viewed, &prev, None, now);
            }
        }
    }

    pub(crate) fn toggle_pause(&mut self, now: Instant) {
        if self.engine.is_paused() {
            self.engine.resume(now);
        } else {
            self.engine.pause(now);
        }
    }

    /// Total, synchronous teardown; the snapshot dies with the session value.
    pub(crate) fn close(&mut self, viewed: &mut ViewedMemory) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.engine.close();
        viewed.clear_location();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn active_group(&self) -> &str {
        &self.active_group
    }

    pub(crate) fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    pub(crate) fn take_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn frame<'a>(&self, catalog: &'a Catalog) -> Option<ViewFrame<'a>> {
        if self.closed {
            return None;
        }
        let group = catalog.group(&self.active_group)?;
        let story = group.stories.get(self.engine.story_index())?;
        let neighbors = self.snapshot.neighbors(&self.active_group);
        let has_next_group = neighbors.next.is_some()
            || self
                .fallthrough
                .as_ref()
                .is_some_and(|chain| chain.first().is_some());

        Some(ViewFrame {
            author: catalog.author_for_group(group),
            story_index: self.engine.story_index(),
            story_count: group.stories.len(),
            posted_age: super::catalog::format_posted_display(
                story.posted_at,
                group.is_pinned,
                chrono::Utc::now(),
            ),
            group,
            story,
            progress: self.engine.progress(),
            paused: self.engine.is_paused(),
            chrome_hidden: self.chrome_hidden,
            has_prev_group: neighbors.prev.is_some(),
            has_next_group,
        })
    }

    /// Forward exit from a finished group: next neighbor, then the frozen
    /// fallthrough chain, then session end.
    fn leave_group_forward(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        now: Instant,
    ) {
        let next = self.snapshot.neighbors(&self.active_group).next;
        if let Some(next) = next {
            self.enter_group(catalog, viewed, &next, None, now);
            return;
        }
        if self.switch_to_fallthrough(catalog, viewed, now) {
            return;
        }
        self.close(viewed);
    }

    /// Swipe toward a missing neighbor is a no-op with resistance feedback,
    /// never an error and never a close.
    fn swipe_next_group(&mut self, catalog: &Catalog, viewed: &mut ViewedMemory, now: Instant) {
        let next = self.snapshot.neighbors(&self.active_group).next;
        if let Some(next) = next {
            self.enter_group(catalog, viewed, &next, None, now);
            return;
        }
        if !self.switch_to_fallthrough(catalog, viewed, now) {
            self.status = Some("No more stories ahead.".to_string());
        }
    }

    fn swipe_prev_group(&mut self, catalog: &Catalog, viewed: &mut ViewedMemory, now: Instant) {
        let prev = self.snapshot.neighbors(&self.active_group).prev;
        if let Some(prev) = prev {
            self.enter_group(catalog, viewed, &prev, None, now);
        } else {
            self.status = Some("Already at the first group.".to_string());
        }
    }

    fn switch_to_fallthrough(
        &mut self,
        catalog: &Catalog,
        viewed: &mut ViewedMemory,
        now: Instant,
    ) -> bool {
        let Some(chain) = self.fallthrough.take() else {
            return false;
        };
        let Some(first) = chain.first().map(str::to_string) else {
            return false;
        };
        self.snapshot = chain;
        self.enter_group(catalog, viewed, &first, None, now)
    }
}
