#![forbid(unsafe_code)]

//! Property tests for walkthrough navigation.
//!
//! Arbitrary sequences of input never push the active step out of range,
//! never fire completion more than once, and a drag followed by a reset
//! always lands back on the declared offset.

use proptest::prelude::*;
use stu_core::event::{FocusTarget, KeyCode, KeyEvent};
use stu_core::geometry::{Offset, Point};
use stu_walkthrough::step::{ScreenContent, ScreenKind};
use stu_walkthrough::{
    Bubble, Chapter, EventName, MemoryRouter, RecordingAnalytics, Router, StepDefinition,
    StepRegistry, Walkthrough, WalkthroughConfig,
};

#[derive(Debug, Clone)]
enum Action {
    Next,
    Back,
    GoTo(usize),
    NextNote,
    PrevNote,
    ArrowLeft,
    ArrowRight,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Next),
        Just(Action::Back),
        (0usize..12).prop_map(Action::GoTo),
        Just(Action::NextNote),
        Just(Action::PrevNote),
        Just(Action::ArrowLeft),
        Just(Action::ArrowRight),
    ]
}

fn registry(bubble_counts: &[usize]) -> StepRegistry {
    let steps = bubble_counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            let mut step = StepDefinition::new(format!("s{i}"), Chapter::Student, "Step", || {
                ScreenContent::new(ScreenKind::PracticePlan, "Plan")
            });
            for b in 0..*count {
                step = step.bubble(
                    Bubble::new(format!("b{b}"), "Note", "Text").offset(b as i32 * 3, -(b as i32)),
                );
            }
            step
        })
        .collect();
    StepRegistry::new(steps).unwrap()
}

fn apply(wt: &mut Walkthrough<MemoryRouter, RecordingAnalytics>, action: &Action) {
    match action {
        Action::Next => {
            wt.next();
        }
        Action::Back => {
            wt.back();
        }
        Action::GoTo(index) => {
            wt.go_to(*index);
        }
        Action::NextNote => {
            // Exit would navigate away; stop short of it.
            let view = wt.view();
            if !view.step().is_some_and(|s| s.bubble.exit_visible) {
                wt.next_note();
            }
        }
        Action::PrevNote => {
            wt.prev_note();
        }
        Action::ArrowLeft => {
            wt.handle_key(&KeyEvent::new(KeyCode::Left), FocusTarget::Document);
        }
        Action::ArrowRight => {
            wt.handle_key(&KeyEvent::new(KeyCode::Right), FocusTarget::Document);
        }
    }
}

proptest! {
    #[test]
    fn active_step_stays_in_range(
        counts in prop::collection::vec(0usize..4, 1..6),
        actions in prop::collection::vec(action(), 0..40),
    ) {
        let total = counts.len();
        let mut wt = Walkthrough::mount(
            registry(&counts),
            MemoryRouter::new("/walkthrough"),
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        for action in &actions {
            apply(&mut wt, action);
            prop_assert!(wt.active_index() < total);
            let bubbles = wt.active_step().unwrap().bubble_count();
            prop_assert!(wt.bubble_index() < bubbles);
            let expected = wt.active_step().unwrap().id.clone();
            prop_assert_eq!(wt.router().query().first("step"), Some(expected.as_str()));
        }
        prop_assert!(wt.analytics().count(EventName::WalkthroughCompleted) <= 1);
        prop_assert_eq!(wt.analytics().count(EventName::WalkthroughViewed), 1);
    }

    #[test]
    fn step_viewed_never_repeats(
        actions in prop::collection::vec(action(), 0..40),
    ) {
        let mut wt = Walkthrough::mount(
            registry(&[2, 1, 0, 3]),
            MemoryRouter::new("/walkthrough?step=s1"),
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        for action in &actions {
            apply(&mut wt, action);
        }
        let mut seen: Vec<String> = wt
            .analytics()
            .events()
            .into_iter()
            .filter(|e| e.event == EventName::WalkthroughStepViewed)
            .filter_map(|e| e.properties.get("step_id").and_then(|v| v.as_str().map(String::from)))
            .collect();
        let len = seen.len();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), len);
    }

    #[test]
    fn drag_then_reset_has_no_drift(
        start in (-2_000i32..2_000, -2_000i32..2_000),
        moves in prop::collection::vec((-2_000i32..2_000, -2_000i32..2_000), 1..10),
        bubble in 0usize..3,
    ) {
        let mut wt = Walkthrough::mount(
            registry(&[3]),
            MemoryRouter::new("/walkthrough"),
            RecordingAnalytics::new(),
            WalkthroughConfig::default(),
        );
        for _ in 0..bubble {
            wt.next_note();
        }
        let declared = wt.bubble_offset().unwrap();
        prop_assert_eq!(declared, Offset::new(bubble as i32 * 3, -(bubble as i32)));

        let origin = Point::new(start.0, start.1);
        prop_assert!(wt.pointer_down(7, origin));
        let mut last = declared;
        for (x, y) in &moves {
            last = wt.pointer_move(7, Point::new(*x, *y)).unwrap();
            prop_assert_eq!(last, declared + (Point::new(*x, *y) - origin));
        }
        prop_assert!(wt.pointer_release(7));
        prop_assert_eq!(wt.bubble_offset(), Some(last));

        wt.reset_position();
        prop_assert_eq!(wt.bubble_offset(), Some(declared));
    }
}
