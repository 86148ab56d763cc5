//! Sinks and the registry that decides which of them receive events.

use std::fmt::Display;
use std::io::Write;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::error::SinkWriteError;
use crate::event::{format_timestamp, TraceEvent};
use crate::severity::Severity;
use crate::target::TargetImpl;

/// The kinds of sink a facade can own. There is at most one sink of every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    File,
    Console,
}

impl SinkKind {
    /// The capitalized name used in the enable/disable events.
    pub fn label(self) -> &'static str {
        match self {
            SinkKind::File => "File",
            SinkKind::Console => "Console",
        }
    }
}

impl Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::File => f.write_str("file"),
            SinkKind::Console => f.write_str("console"),
        }
    }
}

/// The line layout a sink renders events with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `{timestamp} {LEVEL:<8} | {file:<20}:{line:<5} | {function:<25} {message}`, followed by
    /// the error's call stack if the event carries one.
    File,
    /// `{timestamp} [{LEVEL:<8}] {message}`, followed by an empty line.
    Console,
}

impl Layout {
    /// Render `event`. The final line feed is left to the writer.
    pub fn render(self, event: &TraceEvent) -> String {
        match self {
            Layout::File => {
                let mut line = format!(
                    "{} {:<8} | {:<20}:{:<5} | {:<25} {}",
                    format_timestamp(event.time),
                    event.severity,
                    event.file_name(),
                    event.location.line(),
                    event.origin.function,
                    event.message
                );
                if let Some(error) = &event.error {
                    line.push('\n');
                    line.push_str(error.stack.trim_end());
                }

                line
            }
            Layout::Console => format!(
                "{} [{:<8}] {}\n",
                format_timestamp(event.time),
                event.severity,
                event.message
            ),
        }
    }
}

/// An output destination with its own threshold and layout.
#[derive(Debug)]
pub struct Sink {
    kind: SinkKind,
    threshold: Severity,
    layout: Layout,
    /// `None` once the destination has been released. A released sink can't be attached again.
    target: Option<TargetImpl>,
}

impl Sink {
    pub fn new(kind: SinkKind, threshold: Severity, layout: Layout, target: TargetImpl) -> Self {
        Self {
            kind,
            threshold,
            layout,
            target: Some(target),
        }
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_released(&self) -> bool {
        self.target.is_none()
    }

    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }

    /// Write a single event. Writes to a released sink are silently dropped.
    fn write(&mut self, event: &TraceEvent) -> std::io::Result<()> {
        let Some(target) = self.target.as_mut() else {
            return Ok(());
        };

        let rendered = self.layout.render(event);
        if self.layout == Layout::Console {
            if let Some(color_writer) = target.color_writer().filter(|w| w.supports_color()) {
                return write_colored(color_writer, event.severity, &rendered);
            }
        }

        let writer = target.writer();
        writeln!(writer, "{rendered}")?;
        writer.flush()
    }

    /// Flush and drop the destination. Returns the result of the final flush, or `None` if the
    /// sink had already been released.
    fn release(&mut self) -> Option<std::io::Result<()>> {
        self.target.take().map(|mut target| target.writer().flush())
    }
}

/// Write a console line with only its severity label colored.
fn write_colored(
    color_writer: &mut dyn WriteColor,
    severity: Severity,
    rendered: &str,
) -> std::io::Result<()> {
    let label_start = rendered.find('[').map_or(0, |idx| idx + 1);
    let label_end = label_start + severity.label().len();
    color_writer.write_all(rendered[..label_start].as_bytes())?;
    color_writer.set_color(&severity_color(severity))?;
    color_writer.write_all(rendered[label_start..label_end].as_bytes())?;
    color_writer.reset()?;
    color_writer.write_all(rendered[label_end..].as_bytes())?;
    color_writer.write_all(b"\n")?;
    color_writer.flush()
}

fn severity_color(severity: Severity) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match severity {
        Severity::Debug => spec.set_fg(Some(Color::Blue)),
        Severity::Info => spec.set_fg(Some(Color::Green)),
        Severity::Warning => spec.set_fg(Some(Color::Yellow)),
        Severity::Error => spec.set_fg(Some(Color::Red)),
        Severity::Critical => spec.set_fg(Some(Color::Red)).set_bold(true),
    };

    spec
}

/// Owns the configured sinks and tracks which of them are attached. Attachment order is dispatch
/// order.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: Vec<Sink>,
    attached: Vec<SinkKind>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a sink to the registry without attaching it. Replaces and releases an existing sink of
    /// the same kind, returning the error if releasing it failed.
    pub fn register(&mut self, sink: Sink) -> Result<(), SinkWriteError> {
        let kind = sink.kind();
        self.detach(kind);
        match self.sinks.iter_mut().find(|s| s.kind() == kind) {
            Some(existing) => {
                let released = existing.release();
                *existing = sink;
                match released {
                    Some(Err(error)) => Err(SinkWriteError { sink: kind, error }),
                    _ => Ok(()),
                }
            }
            None => {
                self.sinks.push(sink);
                Ok(())
            }
        }
    }

    pub fn get(&self, kind: SinkKind) -> Option<&Sink> {
        self.sinks.iter().find(|s| s.kind() == kind)
    }

    /// Whether a sink of this kind exists and could be attached.
    pub fn can_attach(&self, kind: SinkKind) -> bool {
        self.get(kind).map_or(false, |sink| !sink.is_released())
    }

    pub fn is_attached(&self, kind: SinkKind) -> bool {
        self.attached.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    /// The attached sinks, in dispatch order.
    pub fn attached(&self) -> &[SinkKind] {
        &self.attached
    }

    /// Attach a registered sink. Returns `false` if it was already attached, was never registered,
    /// or has been released.
    pub fn attach(&mut self, kind: SinkKind) -> bool {
        if self.is_attached(kind) || !self.can_attach(kind) {
            return false;
        }

        self.attached.push(kind);
        true
    }

    /// Detach a sink. Returns `false` if it wasn't attached.
    pub fn detach(&mut self, kind: SinkKind) -> bool {
        match self.attached.iter().position(|k| *k == kind) {
            Some(idx) => {
                self.attached.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Detach the most recently attached sink and release its destination. Returns the sink's kind
    /// and the result of its final flush, or `None` once nothing is attached.
    pub fn detach_last(&mut self) -> Option<(SinkKind, std::io::Result<()>)> {
        let kind = self.attached.pop()?;
        let released = self
            .sinks
            .iter_mut()
            .find(|s| s.kind() == kind)
            .and_then(Sink::release)
            .unwrap_or(Ok(()));

        Some((kind, released))
    }

    /// Detach every sink in reverse attachment order and release all destinations, including
    /// those of sinks that were registered but not attached. Safe to call more than once. Final
    /// flushes that failed are returned.
    pub fn detach_all(&mut self) -> Vec<SinkWriteError> {
        let mut failures = Vec::new();
        while let Some((kind, released)) = self.detach_last() {
            if let Err(error) = released {
                failures.push(SinkWriteError { sink: kind, error });
            }
        }
        for sink in &mut self.sinks {
            if let Some(Err(error)) = sink.release() {
                failures.push(SinkWriteError {
                    sink: sink.kind(),
                    error,
                });
            }
        }

        failures
    }

    /// Write `event` to every attached sink whose threshold it meets, skipping `exclude`. A sink
    /// failing to write doesn't stop the others, the failures are returned instead.
    pub fn dispatch(&mut self, event: &TraceEvent, exclude: &[SinkKind]) -> Vec<SinkWriteError> {
        let mut failures = Vec::new();
        for kind in &self.attached {
            if exclude.contains(kind) {
                continue;
            }

            let Some(sink) = self.sinks.iter_mut().find(|s| s.kind() == *kind) else {
                continue;
            };
            if !sink.accepts(event.severity) {
                continue;
            }

            if let Err(error) = sink.write(event) {
                failures.push(SinkWriteError { sink: *kind, error });
            }
        }

        failures
    }
}
