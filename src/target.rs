//! The destinations sinks write to.

use std::fmt::Debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use termcolor::{ColorChoice, StandardStream, WriteColor};

/// Whether STDERR gets colors. Depends on the environment and on whether STDERR is a terminal, so
/// this is only computed once.
static STDERR_COLOR_CHOICE: Lazy<ColorChoice> = Lazy::new(stderr_color_support);

/// How an existing log file is treated when the file sink is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Keep the existing contents and write after them.
    #[default]
    Append,
    /// Start from an empty file.
    Truncate,
}

/// Where the console sink writes to.
pub enum ConsoleTarget {
    /// Write to STDERR, with colors if the environment allows it.
    Stderr,
    /// Write to an arbitrary writer. Useful for capturing console output.
    Writer(Box<dyn Write + Send>),
}

impl Debug for ConsoleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleTarget::Stderr => f.write_str("Stderr"),
            ConsoleTarget::Writer(_) => f.debug_tuple("Writer").field(&"<writer>").finish(),
        }
    }
}

/// An in-memory writer that can be cloned and read back while the logger holds a copy.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The opened destination of a sink, ready to be written to.
pub enum TargetImpl {
    /// Writes to STDERR. May use colors depending on the environment.
    Stderr(BufWriter<StandardStream>),
    /// Writes to the log file.
    File(BufWriter<File>),
    /// Writes to a caller supplied writer.
    Writer(Box<dyn Write + Send>),
}

impl Debug for TargetImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetImpl::Stderr(stderr) => f
                .debug_tuple("Stderr")
                .field(if stderr.get_ref().supports_color() {
                    &"<stderr stream with color support>"
                } else {
                    &"<stderr stream>"
                })
                .finish(),
            TargetImpl::File(file) => f.debug_tuple("File").field(file).finish(),
            TargetImpl::Writer(_) => f.debug_tuple("Writer").field(&"<writer>").finish(),
        }
    }
}

impl TargetImpl {
    /// Construct a [`TargetImpl`] that writes to STDERR with optional color support determined by
    /// the environment.
    pub fn new_stderr() -> Self {
        TargetImpl::Stderr(BufWriter::with_capacity(
            1024,
            StandardStream::stderr(*STDERR_COLOR_CHOICE),
        ))
    }

    /// Construct a [`TargetImpl`] for doing buffered writes to a file. The file is created if it
    /// doesn't exist yet.
    pub fn new_file_path<P: AsRef<Path>>(path: P, mode: WriteMode) -> Result<Self, std::io::Error> {
        let mut options = File::options();
        options.create(true);
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.write(true).truncate(true),
        };
        let file = options.open(path)?;

        Ok(Self::File(BufWriter::with_capacity(1024, file)))
    }

    pub fn for_console(target: ConsoleTarget) -> Self {
        match target {
            ConsoleTarget::Stderr => Self::new_stderr(),
            ConsoleTarget::Writer(writer) => Self::Writer(writer),
        }
    }

    /// A writer that can be written to using the [`write!()`] and [`writeln!()`] macros.
    pub fn writer(&mut self) -> &mut dyn Write {
        match self {
            TargetImpl::Stderr(ref mut stderr) => stderr,
            TargetImpl::File(ref mut file) => file,
            TargetImpl::Writer(ref mut writer) => writer,
        }
    }

    /// The color writer for writing terminal colors. Returns `None` if [`writer()`][Self::writer()]
    /// would return a writer for anything other than an STDERR stream.
    pub fn color_writer(&mut self) -> Option<&mut dyn WriteColor> {
        match self {
            TargetImpl::Stderr(ref mut stderr) => Some(stderr.get_mut()),
            TargetImpl::File(_) | TargetImpl::Writer(_) => None,
        }
    }
}

/// Whether to use colors when outputting to STDERR. Considers the `CLICOLOR`, `CLICOLOR_FORCE`, and
/// `NO_COLOR` environment variables, and whether or not STDERR is attached to a real TTY.
fn stderr_color_support() -> ColorChoice {
    if let Ok(value) = std::env::var("CLICOLOR_FORCE") {
        if value.trim() != "0" {
            return ColorChoice::Always;
        }
    }

    if let Ok(value) = std::env::var("NO_COLOR") {
        if value.trim() != "0" {
            return ColorChoice::Never;
        }
    }

    if let Ok(value) = std::env::var("CLICOLOR") {
        if value.trim() == "0" {
            return ColorChoice::Never;
        }
    }

    // If `CLICOLOR` is unset or set to a truthy value, and colors aren't forced, then terminal
    // support determines whether or not colors are used
    if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}
