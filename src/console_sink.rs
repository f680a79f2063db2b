// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::buffer::LogBuffer;
use crate::config::{Buffering, ColorMode, Config};
use crate::error::SinkError;
use crate::log_record::LogRecord;
use crate::severity::Severity;
use crate::sink::SinkEnv;
use std::fmt::Write as _;
#[cfg(not(target_arch = "wasm32"))]
use std::io::{IsTerminal, Write};

/// Which standard stream the console sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsoleStream {
    #[default]
    Stderr,
    Stdout,
}

/**
Writes each record as one line to stdout or stderr.

The line is rendered with the active format program into a stack buffer and written with a
single `write_all` while the stream is locked, so lines from concurrent threads never interleave.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsoleSink {
    stream: ConsoleStream,
    buffering: Buffering,
    colorized: bool,
}

impl ConsoleSink {
    /// `ColorMode::Auto` is resolved here, against whether `stream` is a terminal.
    pub fn new(stream: ConsoleStream, buffering: Buffering, color: ColorMode) -> Self {
        let colorized = match color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_terminal(stream),
        };
        Self {
            stream,
            buffering,
            colorized,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let stream = if config.console_use_stdout {
            ConsoleStream::Stdout
        } else {
            ConsoleStream::Stderr
        };
        Self::new(stream, config.console_buffering, config.colorized_output)
    }

    /// The minimal sink used before logging is initialized: stderr, no color.
    pub const fn fallback() -> Self {
        Self {
            stream: ConsoleStream::Stderr,
            buffering: Buffering::Default,
            colorized: false,
        }
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }

    pub fn is_colorized(&self) -> bool {
        self.colorized
    }

    /// Renders `record` followed by a newline into `line`.
    pub(crate) fn render_line(
        &self,
        record: &LogRecord<'_>,
        env: &SinkEnv<'_>,
        line: &mut LogBuffer<'_>,
    ) -> Result<(), SinkError> {
        let color = self.colorized.then(|| record.severity().color_code());
        let result = (|| {
            if let Some(color) = color {
                line.write_str(color)?;
            }
            env.format.render(record, &mut *line)?;
            if color.is_some() {
                line.write_str(Severity::reset_color_code())?;
            }
            line.write_str("\n")
        })();
        if result.is_err() {
            line.finish()?;
        }
        Ok(())
    }

    pub fn consume(&self, record: &LogRecord<'_>, env: &SinkEnv<'_>) -> Result<(), SinkError> {
        let mut line = LogBuffer::new(env.allocator);
        self.render_line(record, env, &mut line)?;
        self.write_line(record.severity(), &line)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write_line(&self, _severity: Severity, line: &LogBuffer<'_>) -> Result<(), SinkError> {
        match self.stream {
            ConsoleStream::Stderr => {
                // stderr is unbuffered in every mode
                let mut lock = std::io::stderr().lock();
                lock.write_all(line.as_bytes())?;
            }
            ConsoleStream::Stdout => {
                let mut lock = std::io::stdout().lock();
                lock.write_all(line.as_bytes())?;
                match self.buffering {
                    // std's stdout is line-buffered already
                    Buffering::Default => {}
                    Buffering::Unbuffered | Buffering::LineBuffered => lock.flush()?,
                }
            }
        }
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    fn write_line(&self, severity: Severity, line: &LogBuffer<'_>) -> Result<(), SinkError> {
        let msg = wasm_bindgen::JsValue::from_str(line.as_str().trim_end_matches('\n'));
        match severity {
            Severity::Debug => web_sys::console::debug_1(&msg),
            Severity::Info | Severity::Unset => web_sys::console::info_1(&msg),
            Severity::Warn => web_sys::console::warn_1(&msg),
            Severity::Error | Severity::Fatal => web_sys::console::error_1(&msg),
        }
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn prepare_to_die(&self) -> Result<(), SinkError> {
        match self.stream {
            ConsoleStream::Stderr => std::io::stderr().flush()?,
            ConsoleStream::Stdout => std::io::stdout().flush()?,
        }
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn prepare_to_die(&self) -> Result<(), SinkError> {
        //nothing to do since the browser console is unbuffered
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn is_terminal(stream: ConsoleStream) -> bool {
    match stream {
        ConsoleStream::Stderr => std::io::stderr().is_terminal(),
        ConsoleStream::Stdout => std::io::stdout().is_terminal(),
    }
}

#[cfg(target_arch = "wasm32")]
fn is_terminal(_stream: ConsoleStream) -> bool {
    false
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(ConsoleStream::Stderr, Buffering::Default, ColorMode::Auto)
    }
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// - Copy: the sink is three small values; the stream handle is looked up per write.
// - Default: stderr, default buffering, color auto-detected.
// - Display: NOT implemented - no meaningful string representation for a console sink
