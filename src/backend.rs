//! Level-gated writes through `tracing`
//!
//! Every registry owns its own [`Dispatch`] built on the `tracing-subscriber`
//! fmt subscriber, so it can be rebuilt on every setup call without touching
//! the process-wide default subscriber.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

use crate::color::{BRIGHT_CYAN, BRIGHT_GREEN, BRIGHT_RED, BRIGHT_YELLOW, RESET};
use crate::printf::{sprintf, Arg};
use crate::rotation::RotatingWriter;
use crate::severity::Severity;

/// Timestamp at the start of every line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Collects the message and severity of an event
#[derive(Default)]
struct LineVisitor {
    message: String,
    severity: Option<Severity>,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "severity" => self.severity = value.parse().ok(),
            "message" => self.message.push_str(value),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        }
    }
}

/// Line layout: `<timestamp> <SEVERITY> <message>`
///
/// The message is written verbatim. The stock fmt formatter escapes control
/// characters in messages, which would defeat the color decoration.
struct LineFormat {
    ansi: bool,
}

impl LineFormat {
    fn label_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error | Severity::Fatal => BRIGHT_RED,
            Severity::Warning => BRIGHT_YELLOW,
            Severity::Info => BRIGHT_GREEN,
            Severity::Debug | Severity::Trace => BRIGHT_CYAN,
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let severity = visitor.severity.unwrap_or(Severity::Info);
        let label = severity.as_str().to_ascii_uppercase();
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);

        if self.ansi {
            write!(
                writer,
                "{} {}{:>7}{} ",
                timestamp,
                Self::label_color(severity),
                label,
                RESET
            )?;
        } else {
            write!(writer, "{} {:>7} ", timestamp, label)?;
        }
        writeln!(writer, "{}", visitor.message)
    }
}

/// Destination of formatted log lines
#[derive(Clone)]
pub enum Sink {
    /// Process stdout
    Stdout,
    /// Time-rotated files
    File(Arc<Mutex<RotatingWriter>>),
    /// Any other writer, e.g. a capture buffer
    Writer(Arc<Mutex<Box<dyn Write + Send>>>),
}

impl Sink {
    /// Wrap a rotating file writer
    pub fn file(writer: RotatingWriter) -> Self {
        Sink::File(Arc::new(Mutex::new(writer)))
    }

    /// Wrap an arbitrary writer
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Sink::Writer(Arc::new(Mutex::new(Box::new(writer))))
    }

    /// Whether lines go to rotated files
    pub fn is_file(&self) -> bool {
        matches!(self, Sink::File(_))
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Stdout => f.write_str("Stdout"),
            Sink::File(writer) => match writer.lock() {
                Ok(writer) => f.debug_tuple("File").field(&writer.current_path()).finish(),
                Err(_) => f.write_str("File(<poisoned>)"),
            },
            Sink::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Per-event writer handed to the fmt subscriber
///
/// Each event arrives as one complete line. Write errors are swallowed, a
/// failing sink must never take the caller down.
pub struct SinkWriter {
    sink: Sink,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.sink {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(buf);
                let _ = out.flush();
            }
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(buf);
                    let _ = file.flush();
                }
            }
            Sink::Writer(writer) => {
                if let Ok(mut writer) = writer.lock() {
                    let _ = writer.write_all(buf);
                    let _ = writer.flush();
                }
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.sink {
            Sink::Stdout => io::stdout().flush(),
            Sink::File(file) => match file.lock() {
                Ok(mut file) => file.flush(),
                Err(_) => Ok(()),
            },
            Sink::Writer(writer) => match writer.lock() {
                Ok(mut writer) => writer.flush(),
                Err(_) => Ok(()),
            },
        }
    }
}

/// Writer factory for tracing-subscriber
struct SinkWriterMaker {
    sink: Sink,
}

impl<'a> MakeWriter<'a> for SinkWriterMaker {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            sink: self.sink.clone(),
        }
    }
}

/// Level filter handed to the subscriber for a minimum severity
pub fn level_filter(min_severity: Severity) -> LevelFilter {
    LevelFilter::from_level(min_severity.tracing_level())
}

/// The logging backend of one registry
pub struct Backend {
    dispatch: Dispatch,
    sink: Sink,
    min_severity: Severity,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("sink", &self.sink)
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

impl Backend {
    /// Build a backend writing to `sink`
    ///
    /// `ansi` turns on coloring of the severity label.
    pub fn new(sink: Sink, min_severity: Severity, ansi: bool) -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(SinkWriterMaker { sink: sink.clone() })
            .with_ansi(ansi)
            .with_max_level(level_filter(min_severity))
            .event_format(LineFormat { ansi })
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
            sink,
            min_severity,
        }
    }

    /// The sink lines are written to
    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Minimum severity that gets written
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Whether a message of `severity` passes the filter
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Render `format` with `args` and write it at `severity`
    pub fn write(&self, severity: Severity, format: &str, args: &[Arg]) {
        if !self.enabled(severity) {
            return;
        }
        let message = sprintf(format, args);
        let name = severity.as_str();

        tracing::dispatcher::with_default(&self.dispatch, || match severity {
            Severity::Trace => tracing::trace!(severity = name, "{}", message),
            Severity::Debug => tracing::debug!(severity = name, "{}", message),
            Severity::Info => tracing::info!(severity = name, "{}", message),
            Severity::Warning => tracing::warn!(severity = name, "{}", message),
            Severity::Error | Severity::Fatal => tracing::error!(severity = name, "{}", message),
        });
    }

    /// Flush the sink
    pub fn flush(&self) {
        let _ = SinkWriter {
            sink: self.sink.clone(),
        }
        .flush();
    }
}
