#![forbid(unsafe_code)]

//! End-to-end behavior of the OTP box mounted in a program.
//!
//! Every test runs on virtual time with an in-memory clipboard and focus
//! tracker, so timer-driven behavior (auto-focus, blur grace, polling,
//! delayed completion) is deterministic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use otpbox_core::clipboard::{ClipboardError, MemoryClipboard, NoClipboard};
use otpbox_core::event::{Event, KeyCode, KeyEvent};
use otpbox_core::focus::FocusTracker;
use otpbox_runtime::{Program, ProgramConfig, ReadMode};
use otpbox_widgets::otp_box::Banner;
use otpbox_widgets::{
    OtpBox, OtpBoxConfig, OtpBoxEvent, OtpMsg, PatternKind, ValidationError, Validator,
};
use proptest::prelude::*;

type Harness = Program<OtpBox, MemoryClipboard, FocusTracker>;

const TICK: Duration = Duration::from_millis(100);
const POLL: Duration = Duration::from_secs(2);

fn mount(config: OtpBoxConfig, clipboard: &MemoryClipboard) -> Harness {
    let widget = OtpBox::new(config).unwrap();
    Program::new(widget, clipboard.clone(), FocusTracker::new())
}

fn mount_quiet(config: OtpBoxConfig) -> Harness {
    mount(
        config.with_clipboard_detection(false),
        &MemoryClipboard::new(),
    )
}

fn type_digits(p: &mut Harness, digits: &str) {
    for d in digits.chars() {
        p.handle_event(Event::Key(KeyEvent::new(KeyCode::Char(d))));
        p.pump();
    }
}

fn completes(p: &Harness) -> Vec<String> {
    p.model()
        .events()
        .iter()
        .filter_map(|e| match e {
            OtpBoxEvent::Complete(v) => Some(v.clone()),
            OtpBoxEvent::Change(_) => None,
        })
        .collect()
}

fn changes(p: &Harness) -> usize {
    p.model()
        .events()
        .iter()
        .filter(|e| matches!(e, OtpBoxEvent::Change(_)))
        .count()
}

fn banner_display(p: &Harness) -> Option<String> {
    match p.model().watcher().banner() {
        Banner::Visible { display, .. } => Some(display.clone()),
        Banner::Hidden => None,
    }
}

// --- scenarios ---

#[test]
fn clipboard_sentence_is_proposed_and_accepted() {
    let clipboard = MemoryClipboard::with_text("Your code is 482913, use it now");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();

    assert_eq!(banner_display(&p).as_deref(), Some("482 913"));
    assert_eq!(p.model().status(), "Found Simple 6-digit: 482 913");

    p.send(OtpMsg::Accept);
    assert_eq!(p.model().value(), "482913");
    assert!(completes(&p).is_empty(), "completion is delayed");

    p.advance(TICK);
    assert_eq!(completes(&p), vec!["482913".to_string()]);
    assert_eq!(banner_display(&p), None);
}

#[test]
fn required_and_touched_empty_box_is_required_error() {
    let mut p = mount_quiet(OtpBoxConfig::new().with_required(true));
    assert_eq!(Validator::validate(p.model()), None);

    p.send(OtpMsg::TriggerValidation);
    assert_eq!(Validator::validate(p.model()), Some(ValidationError::Required));
    assert!(p.model().should_show_input_error());
}

#[test]
fn partial_value_is_incomplete() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.send(OtpMsg::SetValue("4829".into()));
    assert_eq!(
        Validator::validate(p.model()),
        Some(ValidationError::Incomplete {
            expected: 6,
            actual: 4
        })
    );
    assert!(p.model().events().is_empty());
}

#[test]
fn typing_six_digits_raises_six_changes_and_one_completion() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.advance(TICK);
    assert_eq!(p.model().focused_index(), Some(0));

    type_digits(&mut p, "482913");

    assert_eq!(changes(&p), 6);
    assert_eq!(completes(&p), vec!["482913".to_string()]);
    let focus_moves: Vec<usize> = p.focus().history().iter().map(|c| c.index).collect();
    assert_eq!(focus_moves, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn higher_priority_pattern_later_in_text_wins() {
    let clipboard = MemoryClipboard::with_text("Verification code:482913abc or 111 222");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert_eq!(banner_display(&p).as_deref(), Some("111 222"));
    assert_eq!(p.model().status(), "Found Spaced format: 111 222");
}

#[test]
fn first_bare_run_wins() {
    let clipboard = MemoryClipboard::with_text("backup code 111111 or use 222222");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert_eq!(banner_display(&p).as_deref(), Some("111 111"));
}

// --- clipboard watcher ---

#[test]
fn dismissed_code_is_not_reproposed() {
    let clipboard = MemoryClipboard::with_text("482913");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    p.send(OtpMsg::Dismiss);
    assert_eq!(p.model().status(), "Auto-fill dismissed");

    p.advance(POLL);
    assert_eq!(clipboard.reads(), 2);
    assert_eq!(banner_display(&p), None);

    clipboard.set_text("again: 482913");
    p.advance(POLL);
    assert_eq!(banner_display(&p), None);
    assert_eq!(p.model().status(), "Auto-fill dismissed");
}

#[test]
fn scanning_same_text_twice_is_stable() {
    let mut widget = OtpBox::new(OtpBoxConfig::default()).unwrap();
    widget.scan("482913");
    widget.dismiss();
    let first = widget.scan("482913");
    let second = widget.scan("482913");
    assert_eq!(first, second);
    assert!(!widget.watcher().banner().is_visible());
}

#[test]
fn manual_check_clears_dismissals() {
    let clipboard = MemoryClipboard::with_text("482913");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    p.send(OtpMsg::Dismiss);

    p.send(OtpMsg::CheckClipboard);
    assert_eq!(p.model().status(), "Checking clipboard...");
    p.pump();
    assert_eq!(banner_display(&p).as_deref(), Some("482 913"));
}

#[test]
fn manual_check_without_code_reports_none_found() {
    let clipboard = MemoryClipboard::with_text("hello");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert_eq!(p.model().status(), "No 6-digit OTP found in clipboard");

    p.send(OtpMsg::CheckClipboard);
    p.pump();
    assert_eq!(p.model().status(), "No valid OTP found in clipboard");
}

#[test]
fn filled_cells_block_proposals() {
    let clipboard = MemoryClipboard::new();
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    p.send(OtpMsg::SetValue("12".into()));
    clipboard.set_text("482913");

    p.send(OtpMsg::CheckClipboard);
    p.pump();
    assert_eq!(banner_display(&p), None);
    assert_eq!(p.model().status(), "No valid OTP found in clipboard");
}

#[test]
fn polling_survives_read_errors() {
    let clipboard = MemoryClipboard::new();
    clipboard.fail_with(ClipboardError::PermissionDenied);
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert!(p.model().clipboard_checked());
    assert_eq!(
        p.model().status(),
        "Clipboard access denied. Please paste manually."
    );

    p.advance(POLL);
    assert_eq!(clipboard.reads(), 2);
    assert_eq!(p.active_subscriptions(), 1);

    clipboard.set_text("482-913");
    p.advance(POLL);
    assert_eq!(banner_display(&p).as_deref(), Some("482 913"));
}

#[test]
fn polling_waits_for_window_focus_and_empty_cells() {
    let clipboard = MemoryClipboard::new();
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert_eq!(clipboard.reads(), 1);

    p.focus_mut().set_window_focused(false);
    p.advance(POLL);
    assert_eq!(clipboard.reads(), 1);

    p.focus_mut().set_window_focused(true);
    p.send(OtpMsg::SetValue("1".into()));
    p.advance(POLL);
    assert_eq!(clipboard.reads(), 1);

    p.send(OtpMsg::SetValue(String::new()));
    p.advance(POLL);
    assert_eq!(clipboard.reads(), 2);
}

#[test]
fn clock_jump_polls_the_clipboard_once() {
    let clipboard = MemoryClipboard::new();
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    assert_eq!(clipboard.reads(), 1);

    p.advance(Duration::from_secs(60));
    assert_eq!(clipboard.reads(), 2);

    p.advance(POLL);
    assert_eq!(clipboard.reads(), 3);
}

#[test]
fn detection_disabled_never_reads() {
    let clipboard = MemoryClipboard::with_text("482913");
    let mut p = mount(
        OtpBoxConfig::new().with_clipboard_detection(false),
        &clipboard,
    );
    p.advance(POLL * 3);
    p.send(OtpMsg::CheckClipboard);
    p.pump();
    assert_eq!(clipboard.reads(), 0);
    assert_eq!(p.active_subscriptions(), 0);
    assert!(p.model().view().banner.is_none());
}

#[test]
fn clear_rechecks_clipboard() {
    let clipboard = MemoryClipboard::with_text("482913");
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    p.send(OtpMsg::Accept);
    p.advance(TICK);

    clipboard.set_text("135790");
    p.send(OtpMsg::Clear);
    assert!(p.model().is_empty());
    assert_eq!(p.model().status(), "OTP cleared");

    p.advance(TICK);
    assert_eq!(banner_display(&p).as_deref(), Some("135 790"));
}

#[test]
fn teardown_stops_polling() {
    let clipboard = MemoryClipboard::new();
    let mut p = mount(OtpBoxConfig::default(), &clipboard);
    p.pump();
    p.teardown();
    assert_eq!(p.active_subscriptions(), 0);

    clipboard.set_text("482913");
    p.advance(POLL * 5);
    assert_eq!(clipboard.reads(), 1);
    assert_eq!(banner_display(&p), None);
}

#[test]
fn background_reads_reach_the_widget() {
    let widget = OtpBox::new(OtpBoxConfig::default()).unwrap();
    let mut p = Program::with_config(
        widget,
        MemoryClipboard::with_text("OTP: 482913"),
        FocusTracker::new(),
        ProgramConfig::default().with_read_mode(ReadMode::Background),
    );
    assert!(p.wait_for_read(Duration::from_secs(5)));
    assert_eq!(
        p.model().watcher().banner(),
        &Banner::Visible {
            code: "482913".into(),
            display: "482 913".into(),
            label: PatternKind::Bare.label(6),
        }
    );
}

// --- focus and touched ---

#[test]
fn blur_outside_marks_touched_after_grace() {
    let mut p = mount_quiet(OtpBoxConfig::new().with_required(true));
    p.advance(TICK);

    p.focus_mut().focus_elsewhere();
    p.send(OtpMsg::Blur(0));
    p.advance(TICK - Duration::from_millis(1));
    assert!(!p.model().is_touched());

    p.advance(Duration::from_millis(1));
    assert!(p.model().is_touched());
    assert_eq!(p.model().errors(), Some(&ValidationError::Required));
    assert_eq!(
        p.model().view().error.as_deref(),
        Some("OTP is required")
    );
}

#[test]
fn moving_between_cells_does_not_touch() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.advance(TICK);

    p.send(OtpMsg::Blur(0));
    p.send(OtpMsg::Key {
        index: 0,
        key: KeyEvent::new(KeyCode::Right),
    });
    p.pump();
    p.advance(TICK);

    assert!(!p.model().is_touched());
    assert_eq!(p.model().focused_index(), Some(1));
}

#[test]
fn terminal_focus_loss_is_a_blur() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.advance(TICK);
    p.focus_mut().focus_elsewhere();
    p.handle_event(Event::Focus(false));
    p.advance(TICK);
    assert!(p.model().is_touched());
    assert_eq!(p.model().focused_index(), None);
}

#[test]
fn auto_focus_can_be_disabled() {
    let mut p = mount_quiet(OtpBoxConfig::new().with_auto_focus(false));
    p.advance(TICK * 5);
    assert!(p.focus().history().is_empty());
}

#[test]
fn backspace_walks_back_through_cells() {
    let mut p = mount_quiet(OtpBoxConfig::new().with_length(4));
    p.advance(TICK);
    type_digits(&mut p, "123");
    assert_eq!(p.model().focused_index(), Some(3));

    p.handle_event(Event::Key(KeyEvent::new(KeyCode::Backspace)));
    p.pump();
    assert_eq!(p.model().value(), "12");
    assert_eq!(p.model().focused_index(), Some(2));
}

// --- paste ---

#[test]
fn non_digit_paste_fills_nothing() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.advance(TICK);
    p.handle_event(Event::Paste("abc-def".into()));
    assert!(p.model().is_empty());
    assert!(completes(&p).is_empty());
}

#[test]
fn full_paste_completes() {
    let mut p = mount_quiet(OtpBoxConfig::new());
    p.advance(TICK);
    p.handle_event(Event::Paste("482 913".into()));
    p.pump();
    assert_eq!(completes(&p), vec!["482913".to_string()]);
    assert_eq!(p.model().focused_index(), Some(5));
}

// --- form adapter ---

#[test]
fn value_sink_sees_every_edit() {
    use otpbox_widgets::ValueAccessor;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut p = mount_quiet(OtpBoxConfig::new().with_length(2));
    p.model_mut()
        .register_on_change(Box::new(move |v| sink.lock().unwrap().push(v.to_string())));
    p.advance(TICK);
    type_digits(&mut p, "12");
    assert_eq!(*seen.lock().unwrap(), vec!["1", "12", "12"]);
}

// --- logging ---

mod logging {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::registry::LookupSpan;

    #[derive(Debug, Clone)]
    struct Captured {
        level: tracing::Level,
        message: String,
    }

    struct Capture {
        events: Arc<Mutex<Vec<Captured>>>,
        spans: Arc<Mutex<Vec<String>>>,
    }

    struct MessageVisitor(String);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S> tracing_subscriber::Layer<S> for Capture
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.spans
                .lock()
                .unwrap()
                .push(attrs.metadata().name().to_string());
        }

        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.events.lock().unwrap().push(Captured {
                level: *event.metadata().level(),
                message: visitor.0,
            });
        }
    }

    fn capture<F: FnOnce()>(f: F) -> (Vec<String>, Vec<Captured>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let spans = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Capture {
            events: events.clone(),
            spans: spans.clone(),
        });
        tracing::subscriber::with_default(subscriber, f);
        let spans = spans.lock().unwrap().clone();
        let events = events.lock().unwrap().clone();
        (spans, events)
    }

    #[test]
    fn clipboard_failure_is_logged_as_warning() {
        let (_, events) = capture(|| {
            let widget = OtpBox::new(OtpBoxConfig::default()).unwrap();
            let mut p = Program::new(widget, NoClipboard, FocusTracker::new());
            p.pump();
            assert_eq!(
                p.model().status(),
                "Clipboard access denied. Please paste manually."
            );
        });
        assert!(events.iter().any(|e| {
            e.level == tracing::Level::WARN && e.message == "clipboard access failed"
        }));
    }

    #[test]
    fn edits_open_spans() {
        let (spans, _) = capture(|| {
            let mut p = mount_quiet(OtpBoxConfig::new());
            p.advance(TICK);
            type_digits(&mut p, "4");
        });
        assert!(spans.iter().any(|s| s == "otp_box.edit"));
    }
}

// --- properties ---

proptest! {
    #[test]
    fn write_fills_iff_leading_digits(len in 1usize..9, value in "[0-9x]{0,10}") {
        let mut widget = OtpBox::new(
            OtpBoxConfig::new().with_length(len).with_clipboard_detection(false),
        ).unwrap();
        widget.write(&value);
        let leading: Vec<char> = value.chars().take(len).collect();
        let expected = leading.len() == len && leading.iter().all(char::is_ascii_digit);
        prop_assert_eq!(widget.is_filled(), expected);
        prop_assert_eq!(widget.cells().len(), len);
    }

    #[test]
    fn accept_round_trips_proposed_digits(code in "[0-9]{6}") {
        let mut widget = OtpBox::new(OtpBoxConfig::default()).unwrap();
        widget.handle_clipboard_read(Ok(format!("Your code is {code}.")));
        prop_assert!(widget.watcher().banner().is_visible());
        let _ = widget.accept();
        prop_assert_eq!(widget.value(), code);
    }

    #[test]
    fn completion_only_when_filled(keys in proptest::collection::vec(0u8..12, 0..20)) {
        let mut widget = OtpBox::new(
            OtpBoxConfig::new().with_length(4).with_clipboard_detection(false),
        ).unwrap();
        let mut index = 0usize;
        for k in keys {
            let code = match k {
                0..=9 => KeyCode::Char(char::from(b'0' + k)),
                10 => KeyCode::Backspace,
                _ => KeyCode::Left,
            };
            let _ = widget.handle_key_press(&KeyEvent::new(code), index);
            index = match code {
                KeyCode::Char(_) => (index + 1).min(3),
                KeyCode::Backspace | KeyCode::Left => index.saturating_sub(1),
                _ => index,
            };
            for event in widget.take_events() {
                if let OtpBoxEvent::Complete(v) = event {
                    prop_assert_eq!(v.len(), 4);
                    prop_assert!(widget.is_filled());
                }
            }
        }
    }
}
