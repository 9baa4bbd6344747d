#![forbid(unsafe_code)]

//! Tracing output of the action manager.
//!
//! Verify that traversals open `undo`/`redo`/`rollback` spans carrying the
//! task label, that their completion events are nested inside those spans,
//! and that declined and faulted actions surface at WARN and ERROR.
//!
//! Run:
//!   cargo test -p fieldnote-undo --test tracing_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use fieldnote_undo::{ActionError, ActionManager, FnAction, ManagerConfig, UndoResult};

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
    parent_span_name: Option<String>,
}

/// A tracing Layer that records spans and events.
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct CaptureHandle {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn event(&self, message: &str) -> Option<CapturedEvent> {
        self.events().into_iter().find(|e| e.message == message)
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
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
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);

        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
            parent_span_name,
        });
    }
}

fn with_captured<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = Capture {
        spans: spans.clone(),
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    CaptureHandle { spans, events }
}

fn noop(name: &str) -> Box<FnAction> {
    Box::new(FnAction::new(name).with_undo(|| Ok(())).with_redo(|| Ok(())))
}

fn manager() -> ActionManager {
    ActionManager::new(ManagerConfig::default().with_refresh_threshold(usize::MAX))
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn undo_and_redo_open_labelled_spans() {
    let handle = with_captured(|| {
        let mut mgr = manager();
        mgr.begin_task("Undo Gloss", "Redo Gloss").unwrap();
        mgr.add_action(noop("gloss")).unwrap();
        mgr.add_action(noop("pos")).unwrap();
        mgr.end_task().unwrap();
        mgr.undo().unwrap();
        mgr.redo().unwrap();
    });

    let spans = handle.spans();
    let undo = spans.iter().find(|s| s.name == "undo").expect("undo span");
    assert_eq!(undo.fields.get("label").map(String::as_str), Some("Undo Gloss"));
    assert_eq!(undo.fields.get("actions").map(String::as_str), Some("2"));

    let redo = spans.iter().find(|s| s.name == "redo").expect("redo span");
    assert_eq!(redo.fields.get("label").map(String::as_str), Some("Redo Gloss"));
}

#[test]
fn completion_events_nest_inside_traversal_spans() {
    let handle = with_captured(|| {
        let mut mgr = manager();
        mgr.begin_task("A", "A").unwrap();
        mgr.add_action(noop("a")).unwrap();
        mgr.end_task().unwrap();
        mgr.undo().unwrap();
        mgr.redo().unwrap();
    });

    let undone = handle.event("undo finished").expect("undo finished event");
    assert_eq!(undone.parent_span_name.as_deref(), Some("undo"));
    assert_eq!(undone.level, tracing::Level::DEBUG);
    assert_eq!(undone.fields.get("redo_len").map(String::as_str), Some("1"));

    let redone = handle.event("redo finished").expect("redo finished event");
    assert_eq!(redone.parent_span_name.as_deref(), Some("redo"));

    let completed = handle.event("task completed").expect("task completed event");
    assert_eq!(completed.parent_span_name, None);
}

#[test]
fn declined_action_warns_and_fault_errors() {
    let handle = with_captured(|| {
        let mut mgr = manager();
        mgr.begin_task("Declines", "Declines").unwrap();
        mgr.add_action(Box::new(
            FnAction::new("locked").with_undo(|| Err(ActionError::failed("locked"))),
        ))
        .unwrap();
        mgr.end_task().unwrap();
        assert_eq!(mgr.undo(), Ok(UndoResult::Failed));

        mgr.begin_task("Faults", "Faults").unwrap();
        mgr.add_action(Box::new(
            FnAction::new("offline").with_undo(|| Err(ActionError::fault("offline"))),
        ))
        .unwrap();
        mgr.end_task().unwrap();
        assert_eq!(mgr.undo(), Ok(UndoResult::Error));
    });

    let declined = handle.event("action declined").expect("declined event");
    assert_eq!(declined.level, tracing::Level::WARN);
    assert_eq!(declined.fields.get("reason").map(String::as_str), Some("locked"));
    assert_eq!(declined.parent_span_name.as_deref(), Some("undo"));

    let fault = handle
        .event("action fault; history is now suspect")
        .expect("fault event");
    assert_eq!(fault.level, tracing::Level::ERROR);
    assert_eq!(fault.fields.get("reason").map(String::as_str), Some("offline"));
}

#[test]
fn rollback_span_records_depths() {
    let handle = with_captured(|| {
        let mut mgr = manager();
        mgr.begin_task("A", "A").unwrap();
        mgr.begin_task("B", "B").unwrap();
        mgr.add_action(noop("b")).unwrap();
        mgr.rollback(0).unwrap();
    });

    let rollback = handle
        .spans()
        .into_iter()
        .find(|s| s.name == "rollback")
        .expect("rollback span");
    assert_eq!(rollback.fields.get("from").map(String::as_str), Some("2"));
    assert_eq!(rollback.fields.get("to").map(String::as_str), Some("0"));

    let finished = handle.event("rollback finished").expect("rollback finished");
    assert_eq!(finished.parent_span_name.as_deref(), Some("rollback"));
}

#[test]
fn recording_stays_below_warn() {
    let handle = with_captured(|| {
        let mut mgr = manager();
        for i in 0..5 {
            mgr.begin_task(format!("T{i}"), format!("T{i}")).unwrap();
            mgr.add_action(noop("x")).unwrap();
            mgr.end_task().unwrap();
        }
        let m = mgr.mark();
        mgr.begin_task("after", "after").unwrap();
        mgr.add_action(noop("y")).unwrap();
        mgr.end_task().unwrap();
        assert!(mgr.collapse_to_mark(&m, "merged", "merged"));
        mgr.commit().unwrap();
    });

    let noisy: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.level <= tracing::Level::WARN)
        .collect();
    assert!(noisy.is_empty(), "unexpected warnings: {noisy:?}");
    assert!(handle.event("committed history").is_some());
}
