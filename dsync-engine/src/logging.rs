//! Session log formatting.
//!
//! Provides a tracing layer that renders every event as
//! `timestamp - session - LEVEL - message` and hands the line to a writer.
//! The session reporter installs one instance for the log file and one for
//! the console.

use std::fmt::Write as FmtWrite;
use std::io::Write;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A tracing layer that writes one formatted line per event.
pub struct SessionLayer<W> {
    session: String,
    make_writer: W,
}

impl<W> SessionLayer<W> {
    pub fn new(session: impl Into<String>, make_writer: W) -> Self {
        Self {
            session: session.into(),
            make_writer,
        }
    }
}

/// Render one log line, newline included.
pub fn format_line(session: &str, level: &tracing::Level, message: &str) -> String {
    let now = chrono::Local::now();
    format!(
        "{} - {} - {} - {}\n",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        session,
        level,
        message
    )
}

impl<S, W> Layer<S> for SessionLayer<W>
where
    S: Subscriber,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::new();
        event.record(&mut visitor);

        let line = format_line(&self.session, event.metadata().level(), &visitor.finish());
        let mut writer = self.make_writer.make_writer();
        // Sink errors are dropped
        let _ = writer.write_all(line.as_bytes());
    }
}

/// Visitor for extracting the message and extra fields from a tracing event.
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
            fields: String::new(),
        }
    }

    fn push_field(&mut self, name: &str, value: &dyn std::fmt::Display) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }

    /// Message first, then `key=value` fields.
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), &format_args!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), &value);
        }
    }
}
