// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Output format compiler.

A template such as `"[{severity}] [{time}] [{name}]: {message}"` is compiled once into a
[FormatProgram]: a list of steps that either copy a literal span of the template or write one
field of the record.  Rendering walks the steps; it never re-parses the template.

Unrecognized `{...}` spans and an unterminated `{` are kept as literal text.
*/

use crate::error::FormatError;
use crate::log_record::LogRecord;
use std::fmt::{self, Write};

pub const DEFAULT_TEMPLATE: &str = "[{severity}] [{time}] [{name}]: {message}";

/// Longest template accepted by [FormatProgram::compile].
pub const MAX_TEMPLATE_LEN: usize = 2048;

const START_DELIMITER: char = '{';
const END_DELIMITER: char = '}';

/// A record field a template can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Severity,
    /// Seconds since the epoch with nanosecond fraction, `1700000000.123456789`.
    Time,
    TimeAsNanoseconds,
    Name,
    Message,
    Function,
    File,
    Line,
}

impl Field {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "severity" => Field::Severity,
            "time" => Field::Time,
            "time_as_nanoseconds" => Field::TimeAsNanoseconds,
            "name" => Field::Name,
            "message" => Field::Message,
            "function" | "function_name" => Field::Function,
            "file" | "file_name" => Field::File,
            "line" | "line_number" => Field::Line,
            _ => return None,
        })
    }

    fn write<W: Write + ?Sized>(self, record: &LogRecord<'_>, out: &mut W) -> fmt::Result {
        match self {
            Field::Severity => out.write_str(record.severity().as_str()),
            Field::Time => {
                let nanos = record.nanos_since_epoch();
                write!(out, "{}.{:09}", nanos / 1_000_000_000, nanos % 1_000_000_000)
            }
            Field::TimeAsNanoseconds => write!(out, "{}", record.nanos_since_epoch()),
            Field::Name => out.write_str(record.name()),
            Field::Message => out.write_str(record.message()),
            Field::Function => out.write_str(record.location().function()),
            Field::File => out.write_str(record.location().file()),
            Field::Line => write!(out, "{}", record.location().line()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Copy `template[start..end]`.
    Literal { start: usize, end: usize },
    Field(Field),
}

/**
A compiled output format.

Programs are immutable; [crate::LoggingContext] shares the active one behind an `Arc` and swaps
it wholesale on reconfiguration.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProgram {
    template: Box<str>,
    steps: Box<[Step]>,
}

impl FormatProgram {
    /// Compiles `template`.  Fails only for empty or oversized templates.
    pub fn compile(template: &str) -> Result<Self, FormatError> {
        if template.is_empty() {
            return Err(FormatError::Empty);
        }
        if template.len() > MAX_TEMPLATE_LEN {
            return Err(FormatError::TooLong {
                len: template.len(),
                max: MAX_TEMPLATE_LEN,
            });
        }

        let mut steps = Vec::new();
        let mut literal_start = 0;
        let mut cursor = 0;
        while let Some(offset) = template[cursor..].find(START_DELIMITER) {
            let open = cursor + offset;
            let Some(len) = template[open + 1..].find(END_DELIMITER) else {
                break;
            };
            let close = open + 1 + len;
            // an unknown token leaves the whole `{...}` span in the pending literal
            if let Some(field) = Field::from_token(&template[open + 1..close]) {
                if literal_start < open {
                    steps.push(Step::Literal {
                        start: literal_start,
                        end: open,
                    });
                }
                steps.push(Step::Field(field));
                literal_start = close + 1;
            }
            cursor = close + 1;
        }
        if literal_start < template.len() {
            steps.push(Step::Literal {
                start: literal_start,
                end: template.len(),
            });
        }

        Ok(Self {
            template: Box::from(template),
            steps: steps.into_boxed_slice(),
        })
    }

    /**
    Compiles `template`, falling back to [DEFAULT_TEMPLATE] when it cannot be used.

    The error, if any, is returned alongside the program so the caller can record it as a
    warning instead of failing.
    */
    pub fn compile_or_default(template: &str) -> (Self, Option<FormatError>) {
        match Self::compile(template) {
            Ok(program) => (program, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the program refers to `field` at least once.
    pub fn uses(&self, field: Field) -> bool {
        self.steps.iter().any(|s| *s == Step::Field(field))
    }

    /// Writes `record` according to the program.
    pub fn render<W: Write + ?Sized>(&self, record: &LogRecord<'_>, out: &mut W) -> fmt::Result {
        for step in self.steps.iter() {
            match *step {
                Step::Literal { start, end } => out.write_str(&self.template[start..end])?,
                Step::Field(field) => field.write(record, out)?,
            }
        }
        Ok(())
    }
}

impl Default for FormatProgram {
    fn default() -> Self {
        let steps = [
            Step::Literal { start: 0, end: 1 },
            Step::Field(Field::Severity),
            Step::Literal { start: 11, end: 14 },
            Step::Field(Field::Time),
            Step::Literal { start: 20, end: 23 },
            Step::Field(Field::Name),
            Step::Literal { start: 29, end: 32 },
            Step::Field(Field::Message),
        ];
        Self {
            template: Box::from(DEFAULT_TEMPLATE),
            steps: Box::new(steps),
        }
    }
}
