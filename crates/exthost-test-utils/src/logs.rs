//! Capture the `tracing` events emitted while a closure runs.
//!
//! ```ignore
//! let (report, logs) = capture_logs(|| manager.load_all());
//! assert!(logs.contains(Level::INFO, "Enabled extension: A v1.0"));
//! ```

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    /// The formatted message.
    pub message: String,
    /// Structured fields other than the message, in recording order.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a structured field, rendered with `Debug`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Every event recorded by [`capture_logs`], in emission order.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    events: Vec<CapturedEvent>,
}

impl CapturedLogs {
    pub fn events(&self) -> &[CapturedEvent] {
        &self.events
    }

    /// Messages emitted at exactly `level`.
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.events
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.as_str())
            .collect()
    }

    /// Whether some event at `level` has a message containing `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.find(level, needle).is_some()
    }

    /// First event at `level` whose message contains `needle`.
    pub fn find(&self, level: Level, needle: &str) -> Option<&CapturedEvent> {
        self.events
            .iter()
            .find(|event| event.level == level && event.message.contains(needle))
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct EventVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Vec<(String, String)>,
}

impl Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut EventVisitor {
            message: &mut message,
            fields: &mut fields,
        });
        self.events
            .lock()
            .expect("log capture mutex poisoned")
            .push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                message,
                fields,
            });
    }
}

/// Run `f` with a thread-local subscriber that records every event.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        events: Arc::clone(&events),
    });

    let result = tracing::subscriber::with_default(subscriber, f);

    let events = events
        .lock()
        .expect("log capture mutex poisoned")
        .clone();
    (result, CapturedLogs { events })
}
