#![forbid(unsafe_code)]

//! The walkthrough controller.
//!
//! [`Walkthrough`] owns the navigation state for one mounted walkthrough and
//! drives the injected [`Router`] and [`Analytics`] collaborators.
//!
//! # Lifecycle
//!
//! 1. [`Walkthrough::mount`]: Build state, install the keyboard listener,
//!    run the first route reconciliation.
//! 2. [`Walkthrough::sync_route`]: Call whenever the host router's readiness
//!    or query changes; it only acts when those dependencies changed.
//! 3. Input: [`next`](Walkthrough::next), [`back`](Walkthrough::back),
//!    [`handle_key`](Walkthrough::handle_key),
//!    [`next_note`](Walkthrough::next_note), pointer events, etc.
//! 4. [`Walkthrough::view`]: Snapshot for rendering.
//! 5. [`Walkthrough::unmount`]: Remove the listener and hand back the
//!    collaborators. All navigation state is discarded.
//!
//! # Analytics guarantees (per mount)
//!
//! | Event | Fires |
//! |-------|-------|
//! | `walkthrough_viewed` | once, when the router is first seen ready |
//! | `walkthrough_step_viewed` | once per distinct step id, after ready |
//! | `walkthrough_step_next_clicked` / `_back_clicked` | per successful transition |
//! | `walkthrough_completed` | once, when the last step first becomes active after ready |
//! | `walkthrough_exit_cta_clicked` | per exit action |

use std::collections::HashSet;

use serde_json::Value;
use stu_core::event::{Event, FocusTarget, KeyEvent, PointerEvent, PointerEventKind};
use stu_core::geometry::{Offset, Point};

use crate::analytics::{Analytics, EventName, Properties};
use crate::annotation::{
    AnnotationOverlay, BubbleKey, NoteAdvance, PlacementLayout, PREVIOUS_NOTE_LABEL,
};
use crate::config::WalkthroughConfig;
use crate::route_sync::{self, RouteWatch, StepLookup};
use crate::router::Router;
use crate::step::{Bubble, StepDefinition, StepRegistry};
use crate::transition::{self, Direction, StepTransition, TransitionInput, TransitionRequest};
use crate::view::{BubbleView, EMPTY_MESSAGE, StepNotice, StepView, WalkthroughView};

/// Identifies the installed keyboard listener.
///
/// A new generation is installed whenever the active step changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerToken {
    pub generation: u64,
    pub step_index: usize,
}

#[derive(Debug, Default)]
struct KeyListenerSlot {
    generations: u64,
    active: Option<ListenerToken>,
}

impl KeyListenerSlot {
    fn install(&mut self, step_index: usize) {
        let token = ListenerToken {
            generation: self.generations,
            step_index,
        };
        self.generations += 1;
        if let Some(prev) = self.active.replace(token) {
            tracing::trace!(
                target: "stu.walkthrough.keyboard",
                removed = prev.generation,
                installed = token.generation,
                step_index,
                "keyboard listener reinstalled"
            );
        }
    }

    fn remove(&mut self) -> Option<ListenerToken> {
        self.active.take()
    }
}

#[derive(Debug, Default)]
struct Tracking {
    ready_seen: bool,
    viewed_steps: HashSet<String>,
    completed: bool,
}

#[derive(Debug, Default)]
struct NavigationState {
    active_index: usize,
    overlay: AnnotationOverlay,
    route_watch: RouteWatch,
    notice: Option<StepNotice>,
    tracking: Tracking,
    keyboard: KeyListenerSlot,
}

pub struct Walkthrough<R: Router, A: Analytics> {
    registry: StepRegistry,
    router: R,
    analytics: A,
    config: WalkthroughConfig,
    state: NavigationState,
}

impl<R: Router, A: Analytics> Walkthrough<R, A> {
    pub fn mount(registry: StepRegistry, router: R, analytics: A, config: WalkthroughConfig) -> Self {
        let mut walkthrough = Self {
            registry,
            router,
            analytics,
            config,
            state: NavigationState::default(),
        };
        let _span = tracing::debug_span!(
            target: "stu.walkthrough",
            "mount",
            steps = walkthrough.registry.len()
        )
        .entered();

        if walkthrough.registry.is_empty() {
            tracing::info!(target: "stu.walkthrough", "no steps registered; showing empty state");
            return walkthrough;
        }
        if walkthrough.config.keyboard {
            walkthrough.state.keyboard.install(0);
        }
        walkthrough.sync_route();
        walkthrough
    }

    /// Tear down and return the collaborators.
    pub fn unmount(mut self) -> (R, A) {
        if let Some(token) = self.state.keyboard.remove() {
            tracing::debug!(
                target: "stu.walkthrough.keyboard",
                generation = token.generation,
                "keyboard listener removed"
            );
        }
        tracing::info!(
            target: "stu.walkthrough",
            step_index = self.state.active_index,
            "walkthrough unmounted"
        );
        (self.router, self.analytics)
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Mutable router access for host-driven changes; call
    /// [`sync_route`](Self::sync_route) afterwards.
    ///
    /// The next `sync_route` always reconciles, even if readiness and the
    /// `step` value look unchanged.
    pub fn router_mut(&mut self) -> &mut R {
        self.state.route_watch.invalidate();
        &mut self.router
    }

    pub fn analytics(&self) -> &A {
        &self.analytics
    }

    pub fn config(&self) -> &WalkthroughConfig {
        &self.config
    }

    pub fn active_index(&self) -> usize {
        self.state.active_index
    }

    pub fn active_step(&self) -> Option<&StepDefinition> {
        self.registry.get(self.state.active_index)
    }

    pub fn bubble_index(&self) -> usize {
        self.state.overlay.bubble_index()
    }

    pub fn keyboard_listener(&self) -> Option<ListenerToken> {
        self.state.keyboard.active
    }

    pub fn notice(&self) -> Option<&StepNotice> {
        self.state.notice.as_ref()
    }

    // ── Route synchronization ────────────────────────────────────────────

    /// Reconcile the active step with the router.
    ///
    /// Does nothing unless readiness or the `step` query value changed since
    /// the last call. Returns whether a reconciliation ran.
    pub fn sync_route(&mut self) -> bool {
        if self.registry.is_empty() {
            return false;
        }
        let ready = self.router.is_ready();
        let requested = self
            .router
            .query()
            .first(&self.config.step_param)
            .map(str::to_string);
        if !self.state.route_watch.observe(ready, requested.as_deref()) {
            return false;
        }

        let Some(resolution) = route_sync::resolve(
            ready,
            self.router.query(),
            &self.config.step_param,
            &self.registry,
            self.state.active_index,
        ) else {
            return false;
        };

        self.set_active_index(resolution.index);
        if let StepLookup::NotFound(requested) = &resolution.lookup {
            tracing::warn!(
                target: "stu.walkthrough.route",
                requested = %requested,
                fallback = %resolution.step_id,
                "unknown step in URL; showing first step"
            );
            self.state.notice = Some(StepNotice::StepNotFound {
                requested: requested.clone(),
            });
        }
        if resolution.rewrite {
            self.write_url(&resolution.step_id);
        }
        if ready && !self.state.tracking.ready_seen {
            self.state.tracking.ready_seen = true;
            let source = self
                .router
                .query()
                .first(&self.config.source_param)
                .unwrap_or(self.config.default_source.as_str())
                .to_string();
            self.track(
                EventName::WalkthroughViewed,
                props([("source", Value::from(source))]),
            );
        }
        self.track_step_views();
        true
    }

    // ── Step transitions ─────────────────────────────────────────────────

    pub fn next(&mut self) -> bool {
        self.transition(TransitionRequest::Next, TransitionInput::Button)
            .is_some()
    }

    pub fn back(&mut self) -> bool {
        self.transition(TransitionRequest::Back, TransitionInput::Button)
            .is_some()
    }

    /// Jump to `index` (clamped).
    pub fn go_to(&mut self, index: usize) -> bool {
        self.transition(TransitionRequest::To(index), TransitionInput::Jump)
            .is_some()
    }

    /// Keyboard listener. Returns whether the key moved the walkthrough.
    pub fn handle_key(&mut self, key: &KeyEvent, focus: FocusTarget) -> bool {
        if self.state.keyboard.active.is_none() {
            return false;
        }
        let Some(direction) = transition::keyboard_direction(key, focus) else {
            return false;
        };
        let request = match direction {
            Direction::Next => TransitionRequest::Next,
            Direction::Back => TransitionRequest::Back,
        };
        self.transition(request, TransitionInput::Keyboard).is_some()
    }

    /// Dispatch a host event.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(key, focus) => self.handle_key(key, *focus),
            Event::Pointer(pointer) => self.handle_pointer(pointer),
        }
    }

    fn transition(
        &mut self,
        request: TransitionRequest,
        input: TransitionInput,
    ) -> Option<StepTransition> {
        let planned = transition::plan(self.state.active_index, self.registry.len(), request)?;
        let from_id = self.registry.get(planned.from)?.id.clone();
        let to_id = self.registry.get(planned.to)?.id.clone();
        let _span = tracing::debug_span!(
            target: "stu.walkthrough",
            "transition",
            from = %from_id,
            to = %to_id,
            input = input.as_str()
        )
        .entered();

        self.set_active_index(planned.to);
        self.write_url(&to_id);

        let event = match planned.direction {
            Direction::Next => EventName::WalkthroughStepNextClicked,
            Direction::Back => EventName::WalkthroughStepBackClicked,
        };
        self.track(
            event,
            props([
                ("from_step_id", Value::from(from_id)),
                ("to_step_id", Value::from(to_id)),
                ("to_step_position", Value::from(planned.to + 1)),
                ("input", Value::from(input.as_str())),
            ]),
        );
        self.track_step_views();
        Some(planned)
    }

    fn set_active_index(&mut self, index: usize) -> bool {
        if index == self.state.active_index {
            return false;
        }
        self.state.active_index = index;
        self.state.overlay.reset_for_step();
        self.state.notice = None;
        if self.state.keyboard.active.is_some() {
            self.state.keyboard.install(index);
        }
        true
    }

    // ── Annotation bubbles ───────────────────────────────────────────────

    /// Primary bubble control: next note, next step, or exit.
    pub fn next_note(&mut self) -> Option<NoteAdvance> {
        let step = self.active_step()?;
        let bubble_count = step.bubble_count();
        let has_next_step = self.state.active_index + 1 < self.registry.len();
        let advance = self.state.overlay.next_note(bubble_count, has_next_step);
        match advance {
            NoteAdvance::NextNote => {}
            NoteAdvance::NextStep => {
                self.transition(TransitionRequest::Next, TransitionInput::Note);
            }
            NoteAdvance::Exit => {
                self.exit();
            }
        }
        Some(advance)
    }

    pub fn prev_note(&mut self) -> bool {
        self.state.overlay.prev_note()
    }

    /// Exit call to action: track and navigate away.
    pub fn exit(&mut self) -> bool {
        let Some(step_id) = self.active_step().map(|step| step.id.clone()) else {
            return false;
        };
        self.track(
            EventName::WalkthroughExitCtaClicked,
            props([("step_id", Value::from(step_id.clone()))]),
        );
        let route = self.config.exit_route();
        tracing::info!(
            target: "stu.walkthrough",
            step_id = %step_id,
            href = %route,
            "leaving walkthrough"
        );
        if let Err(err) = self.router.push(route) {
            tracing::warn!(target: "stu.walkthrough.route", error = %err, "exit navigation failed");
        }
        true
    }

    fn active_bubble(&self) -> Option<(BubbleKey, Bubble)> {
        let step = self.active_step()?;
        let bubble = step
            .effective_bubbles()
            .into_iter()
            .nth(self.state.overlay.bubble_index())?;
        Some((BubbleKey::new(step.id.clone(), bubble.id.clone()), bubble))
    }

    pub fn bubble_offset(&self) -> Option<Offset> {
        let (key, bubble) = self.active_bubble()?;
        Some(self.state.overlay.offset(&key, bubble.default_offset()))
    }

    /// Pointer down on the active bubble's drag handle.
    pub fn pointer_down(&mut self, pointer_id: i32, at: Point) -> bool {
        let Some((key, bubble)) = self.active_bubble() else {
            return false;
        };
        self.state
            .overlay
            .pointer_down(pointer_id, at, key, bubble.default_offset())
    }

    pub fn pointer_move(&mut self, pointer_id: i32, at: Point) -> Option<Offset> {
        self.state.overlay.pointer_move(pointer_id, at)
    }

    /// Pointer up or cancel.
    pub fn pointer_release(&mut self, pointer_id: i32) -> bool {
        self.state.overlay.pointer_release(pointer_id)
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        match event.kind {
            PointerEventKind::Down => self.pointer_down(event.pointer_id, event.position),
            PointerEventKind::Move => self
                .pointer_move(event.pointer_id, event.position)
                .is_some(),
            PointerEventKind::Up | PointerEventKind::Cancel => {
                self.pointer_release(event.pointer_id)
            }
        }
    }

    /// Restore the active bubble's declared offset.
    pub fn reset_position(&mut self) -> bool {
        let Some((key, bubble)) = self.active_bubble() else {
            return false;
        };
        self.state
            .overlay
            .reset_position(&key, bubble.default_offset())
    }

    // ── Analytics ────────────────────────────────────────────────────────

    fn track_step_views(&mut self) {
        if !self.state.tracking.ready_seen {
            return;
        }
        let index = self.state.active_index;
        let Some(step) = self.registry.get(index) else {
            return;
        };
        let step_id = step.id.clone();
        let chapter = step.chapter.label();
        if self.state.tracking.viewed_steps.insert(step_id.clone()) {
            self.track(
                EventName::WalkthroughStepViewed,
                props([
                    ("step_id", Value::from(step_id)),
                    ("step_position", Value::from(index + 1)),
                    ("chapter", Value::from(chapter)),
                ]),
            );
        }
        if Some(index) == self.registry.last_index() && !self.state.tracking.completed {
            self.state.tracking.completed = true;
            self.track(
                EventName::WalkthroughCompleted,
                props([("total_steps", Value::from(self.registry.len()))]),
            );
        }
    }

    fn track(&self, event: EventName, properties: Properties) {
        tracing::debug!(target: "stu.walkthrough.analytics", event = event.as_str(), "track");
        self.analytics.track(event, properties);
    }

    /// Point the URL at `step_id`. On success the written value becomes the
    /// last observed dependency, so a later external change back to the
    /// previous value still reconciles.
    fn write_url(&mut self, step_id: &str) {
        match route_sync::write_step(&mut self.router, &self.config.step_param, step_id) {
            Ok(()) => {
                self.state
                    .route_watch
                    .observe(self.router.is_ready(), Some(step_id));
            }
            Err(err) => {
                tracing::warn!(
                    target: "stu.walkthrough.route",
                    step_id,
                    error = %err,
                    "step URL update failed"
                );
            }
        }
    }

    // ── View ─────────────────────────────────────────────────────────────

    pub fn view(&self) -> WalkthroughView {
        let Some(step) = self.active_step() else {
            return WalkthroughView::Empty {
                message: EMPTY_MESSAGE.to_string(),
            };
        };
        let index = self.state.active_index;
        let total = self.registry.len();
        let bubbles = step.effective_bubbles();
        let count = bubbles.len();
        let bubble_index = self.state.overlay.bubble_index().min(count.saturating_sub(1));
        let bubble = &bubbles[bubble_index];

        let key = BubbleKey::new(step.id.clone(), bubble.id.clone());
        let default = bubble.default_offset();
        let offset = self.state.overlay.offset(&key, default);
        let placement = bubble.resolved_placement();
        let layout = PlacementLayout::for_placement(placement);
        let primary = NoteAdvance::resolve(bubble_index, count, index + 1 < total);

        WalkthroughView::Active(Box::new(StepView {
            step_id: step.id.clone(),
            title: step.title.clone(),
            chapter: step.chapter,
            chapter_label: step.chapter.label(),
            position: index + 1,
            total,
            screen: step.render.render(),
            event_context: step.event_context.clone(),
            bubble: BubbleView {
                bubble_id: bubble.id.clone(),
                title: bubble.title.clone(),
                text: bubble.text.clone(),
                index: bubble_index,
                count,
                placement,
                layout,
                offset,
                transform: layout.css_transform(offset),
                dragging: self.state.overlay.is_dragging(),
                can_reset: offset != default,
                can_go_previous: bubble_index > 0,
                previous_label: PREVIOUS_NOTE_LABEL,
                primary,
                primary_label: primary.label(&self.config.exit_label).to_string(),
                exit_visible: primary == NoteAdvance::Exit,
            },
            can_go_back: index > 0,
            can_go_next: index + 1 < total,
            notice: self.state.notice.clone(),
        }))
    }
}

fn props<const N: usize>(pairs: [(&str, Value); N]) -> Properties {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecordingAnalytics;
    use crate::router::MemoryRouter;
    use crate::step::{Chapter, ScreenContent, ScreenKind};
    use stu_core::event::KeyCode;

    fn registry() -> StepRegistry {
        let screen = || ScreenContent::new(ScreenKind::RecruiterDashboard, "Pipeline");
        StepRegistry::new(vec![
            StepDefinition::new("one", Chapter::Overview, "One", screen)
                .bubble(Bubble::new("a", "A", "first"))
                .bubble(Bubble::new("b", "B", "second")),
            StepDefinition::new("two", Chapter::Recruiter, "Two", screen),
            StepDefinition::new("three", Chapter::Pilot, "Three", screen),
        ])
        .unwrap()
    }

    fn mount(href: &str) -> Walkthrough<MemoryRouter, RecordingAnalytics> {
        Walkthrough::mount(
            registry(),
            MemoryRouter::new(href),
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        )
    }

    #[test]
    fn keyboard_listener_follows_active_step() {
        let mut wt = mount("/w?step=one");
        let first = wt.keyboard_listener().unwrap();
        assert_eq!(first.step_index, 0);
        assert!(wt.next());
        let second = wt.keyboard_listener().unwrap();
        assert_eq!(second.step_index, 1);
        assert!(second.generation > first.generation);
        assert!(!wt.handle_key(&KeyEvent::new(KeyCode::Char('k')), FocusTarget::Document));
        assert_eq!(wt.keyboard_listener(), Some(second));
    }

    #[test]
    fn keyboard_disabled_by_config() {
        let config = WalkthroughConfig {
            keyboard: false,
            ..WalkthroughConfig::default()
        };
        let mut wt = Walkthrough::mount(
            registry(),
            MemoryRouter::new("/w"),
            RecordingAnalytics::new(),
            config,
        );
        assert!(wt.keyboard_listener().is_none());
        assert!(!wt.handle_key(&KeyEvent::new(KeyCode::Right), FocusTarget::Document));
        assert_eq!(wt.active_index(), 0);
    }

    #[test]
    fn sync_ignores_unchanged_dependencies() {
        let mut wt = mount("/w?step=two");
        assert_eq!(wt.active_index(), 1);
        assert!(!wt.sync_route());
        assert!(wt.router().replaced().is_empty());
    }

    #[test]
    fn external_navigation_moves_step() {
        let mut wt = mount("/w?step=one");
        let query = wt.router().query().clone().with("step", "three");
        wt.router_mut().set_query(query);
        assert!(wt.sync_route());
        assert_eq!(wt.active_index(), 2);
        assert_eq!(wt.analytics().count(EventName::WalkthroughCompleted), 1);
        // Not a click: no next/back events.
        assert_eq!(
            wt.analytics().count(EventName::WalkthroughStepNextClicked),
            0
        );
    }

    #[test]
    fn history_back_to_previous_step_reconciles() {
        let mut wt = mount("/w?step=one");
        assert!(wt.next());
        assert!(!wt.sync_route());

        // Host router changed underneath, without going through router_mut.
        let query = wt.router.query().clone().with("step", "one");
        wt.router.set_query(query);
        assert!(wt.sync_route());
        assert_eq!(wt.active_index(), 0);
        assert_eq!(wt.router().replaced().len(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_observation() {
        let mut router = MemoryRouter::new("/w?step=one");
        router.fail_replace("blocked by host");
        let mut wt = Walkthrough::mount(
            registry(),
            router,
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        assert!(wt.next());
        // URL still names `one`, unchanged since the last observation.
        assert!(!wt.sync_route());
        assert_eq!(wt.active_index(), 1);
    }

    #[test]
    fn router_mut_forces_reconcile() {
        let mut wt = mount("/w?step=two");
        assert!(!wt.sync_route());
        wt.router_mut();
        assert!(wt.sync_route());
        assert_eq!(wt.active_index(), 1);
        assert!(wt.router().replaced().is_empty());
    }

    #[test]
    fn router_failure_does_not_block_navigation() {
        let mut router = MemoryRouter::new("/w?step=one");
        router.fail_replace("blocked by host");
        let mut wt = Walkthrough::mount(
            registry(),
            router,
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        assert!(wt.next());
        assert_eq!(wt.active_index(), 1);
        assert_eq!(wt.router().query().first("step"), Some("one"));
    }

    #[test]
    fn go_to_reports_jump_input() {
        let mut wt = mount("/w?step=one");
        assert!(wt.go_to(7));
        assert_eq!(wt.active_index(), 2);
        let events = wt.analytics().events();
        let jump = events
            .iter()
            .find(|e| e.event == EventName::WalkthroughStepNextClicked)
            .unwrap();
        assert_eq!(jump.property("input"), Some(&Value::from("jump")));
        assert_eq!(jump.property("to_step_position"), Some(&Value::from(3)));
    }

    #[test]
    fn exit_pushes_configured_route() {
        let mut wt = mount("/w?step=three");
        assert_eq!(wt.next_note(), Some(NoteAdvance::Exit));
        assert_eq!(wt.router().pushed()[0].href(), "/#pilot");
        assert_eq!(
            wt.analytics().count(EventName::WalkthroughExitCtaClicked),
            1
        );
    }

    #[test]
    fn unmount_removes_listener_and_returns_collaborators() {
        let wt = mount("/w");
        assert!(wt.keyboard_listener().is_some());
        let (router, analytics) = wt.unmount();
        assert_eq!(router.query().first("step"), Some("one"));
        assert_eq!(analytics.count(EventName::WalkthroughViewed), 1);
    }

    #[test]
    fn notice_cleared_after_navigation() {
        let mut wt = mount("/w?step=nope");
        assert_eq!(
            wt.notice(),
            Some(&StepNotice::StepNotFound {
                requested: "nope".into()
            })
        );
        // The rewritten URL was already observed; re-running is a no-op.
        assert!(!wt.sync_route());
        assert!(wt.notice().is_some());
        assert!(wt.next());
        assert!(wt.notice().is_none());
    }

    #[test]
    #[tracing_test::traced_test]
    fn unknown_step_logs_warning() {
        let _wt = mount("/w?step=ghost");
        assert!(logs_contain("unknown step in URL"));
        assert!(logs_contain("ghost"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn failed_exit_navigation_is_logged() {
        let mut router = MemoryRouter::new("/w?step=three");
        router.fail_push("offline");
        let mut wt = Walkthrough::mount(
            registry(),
            router,
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        assert!(wt.exit());
        assert!(logs_contain("exit navigation failed"));
        assert_eq!(
            wt.analytics().count(EventName::WalkthroughExitCtaClicked),
            1
        );
    }

    #[test]
    fn drag_released_on_step_change() {
        let mut wt = mount("/w?step=one");
        assert!(wt.pointer_down(1, Point::new(0, 0)));
        assert!(wt.next());
        assert_eq!(wt.pointer_move(1, Point::new(10, 10)), None);
        assert!(wt.pointer_down(2, Point::new(0, 0)));
    }
}
