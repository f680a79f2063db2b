// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Configuration resolved at initialization.

[Config] is a plain struct.  Build one by hand, or read it from the environment with
[Config::from_env].  Environment variables carry a `NODELOG_` prefix:

| Variable | Effect |
|---|---|
| `NODELOG_CONSOLE_USE_STDOUT` | `1` routes the console sink to stdout instead of stderr |
| `NODELOG_CONSOLE_BUFFERING` | unset: default, `0`: unbuffered, `1`: line-buffered |
| `NODELOG_COLORIZED_OUTPUT` | unset: auto-detect, `0`: never, `1`: always |
| `NODELOG_OUTPUT_FORMAT` | template for the format compiler |
| `NODELOG_LOG_LEVEL_OVERRIDES` | `name:=level` pairs, or a bare `level` for the default |
| `NODELOG_LOG_DIRECTORY` | base directory for the external backend |

Resolution is fail-soft.  A value that cannot be understood is reported as a [ConfigError]
and the option keeps its default.
*/

use crate::error::ConfigError;
use crate::external_sink::ExternalBackend;
use crate::name::LoggerName;
use crate::severity::Severity;
use std::path::PathBuf;
use std::sync::Arc;

pub const ENV_PREFIX: &str = "NODELOG_";

const CONSOLE_USE_STDOUT: &str = "CONSOLE_USE_STDOUT";
const CONSOLE_BUFFERING: &str = "CONSOLE_BUFFERING";
const COLORIZED_OUTPUT: &str = "COLORIZED_OUTPUT";
const OUTPUT_FORMAT: &str = "OUTPUT_FORMAT";
const LOG_LEVEL_OVERRIDES: &str = "LOG_LEVEL_OVERRIDES";
const LOG_DIRECTORY: &str = "LOG_DIRECTORY";

/// Default log directory, relative to the home directory.
pub const HOME_LOG_DIR: &str = ".nodelog/log";

/// How the console sink buffers stdout.  stderr is never buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Buffering {
    /// Whatever the platform does.
    #[default]
    Default,
    Unbuffered,
    LineBuffered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    /// Color only when the selected stream is a terminal.
    #[default]
    Auto,
    Never,
    Always,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub console_enabled: bool,
    pub publish_enabled: bool,
    pub console_use_stdout: bool,
    pub console_buffering: Buffering,
    pub colorized_output: ColorMode,
    /// `None` uses [crate::format::DEFAULT_TEMPLATE].
    pub output_format: Option<String>,
    /// `None` uses [crate::DEFAULT_SEVERITY].
    pub default_level: Option<Severity>,
    /// Applied in order; a later entry for the same name wins.
    pub level_overrides: Vec<(String, Severity)>,
    /// `None` asks [DefaultLogDir].  Only consulted when an external backend is configured.
    pub log_directory: Option<PathBuf>,
    pub external_backend: Option<Arc<dyn ExternalBackend>>,
    /// Values that were ignored while this config was read.  `init` reports them.
    pub warnings: Vec<ConfigError>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            console_enabled: true,
            publish_enabled: true,
            console_use_stdout: false,
            console_buffering: Buffering::Default,
            colorized_output: ColorMode::Auto,
            output_format: None,
            default_level: None,
            level_overrides: Vec::new(),
            log_directory: None,
            external_backend: None,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /**
    Reads the `NODELOG_` variables from the process environment.

    Every value that had to be ignored is kept in [Config::warnings].
    */
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /**
    Like [Config::from_env], reading through `lookup` instead of the process environment.

    `lookup` receives the full variable name, prefix included.
    */
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |option: &str| {
            let mut key = String::with_capacity(ENV_PREFIX.len() + option.len());
            key.push_str(ENV_PREFIX);
            key.push_str(option);
            lookup(&key).filter(|v| !v.is_empty())
        };
        let mut config = Config::default();
        let mut warnings = Vec::new();

        if let Some(value) = get(CONSOLE_USE_STDOUT) {
            match parse_switch(CONSOLE_USE_STDOUT, &value) {
                Ok(on) => config.console_use_stdout = on,
                Err(e) => warnings.push(e),
            }
        }
        if let Some(value) = get(CONSOLE_BUFFERING) {
            match parse_switch(CONSOLE_BUFFERING, &value) {
                Ok(true) => config.console_buffering = Buffering::LineBuffered,
                Ok(false) => config.console_buffering = Buffering::Unbuffered,
                Err(e) => warnings.push(e),
            }
        }
        if let Some(value) = get(COLORIZED_OUTPUT) {
            match parse_switch(COLORIZED_OUTPUT, &value) {
                Ok(true) => config.colorized_output = ColorMode::Always,
                Ok(false) => config.colorized_output = ColorMode::Never,
                Err(e) => warnings.push(e),
            }
        }
        config.output_format = get(OUTPUT_FORMAT);
        if let Some(value) = get(LOG_LEVEL_OVERRIDES) {
            let parsed = parse_overrides(&value);
            config.level_overrides = parsed.overrides;
            config.default_level = parsed.default_level;
            warnings.extend(parsed.errors);
        }
        config.log_directory = get(LOG_DIRECTORY).map(PathBuf::from);
        config.warnings = warnings;
        config
    }
}

fn parse_switch(option: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ConfigError::InvalidFlag {
            option,
            value: other.to_string(),
        }),
    }
}

/// The result of [parse_overrides].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOverrides {
    pub overrides: Vec<(String, Severity)>,
    /// The last bare level in the list, if any.
    pub default_level: Option<Severity>,
    /// Entries that were skipped.
    pub errors: Vec<ConfigError>,
}

/**
Parses a level-override list.

Entries are separated by commas or whitespace.  Each entry is either `name:=level`, which
overrides one logger, or a bare `level`, which sets the default.  Bad entries are skipped and
reported; the rest still apply.

```
use nodelog::config::parse_overrides;
use nodelog::Severity;

let parsed = parse_overrides("warn, motion.planner:=debug camera:=bogus");
assert_eq!(parsed.default_level, Some(Severity::Warn));
assert_eq!(parsed.overrides, vec![("motion.planner".to_string(), Severity::Debug)]);
assert_eq!(parsed.errors.len(), 1);
```
*/
pub fn parse_overrides(list: &str) -> ParsedOverrides {
    let mut parsed = ParsedOverrides::default();
    let entries = list
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|e| !e.is_empty());
    for entry in entries {
        match entry.split_once(":=") {
            Some((name, level)) => {
                let name = match LoggerName::new(name) {
                    Ok(name) => name,
                    Err(e) => {
                        parsed.errors.push(e);
                        continue;
                    }
                };
                match level.parse::<Severity>() {
                    Ok(level) => parsed.overrides.push((name.as_str().to_string(), level)),
                    Err(e) => parsed.errors.push(e),
                }
            }
            None if entry.contains(':') || entry.contains('=') => {
                parsed
                    .errors
                    .push(ConfigError::InvalidOverride(entry.to_string()));
            }
            None => match entry.parse::<Severity>() {
                Ok(level) => parsed.default_level = Some(level),
                Err(e) => parsed.errors.push(e),
            },
        }
    }
    parsed
}

/// Resolves where an external backend keeps its files.
pub trait LogDirResolver {
    fn resolve_log_dir(&self) -> Result<PathBuf, ConfigError>;
}

/**
Resolves the log directory from an explicit path, then `$HOME` (`%USERPROFILE%` on Windows)
joined with [HOME_LOG_DIR].
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultLogDir {
    pub explicit: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl DefaultLogDir {
    /// Reads the home directory from the process environment.
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        let home_var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        let home = std::env::var_os(home_var)
            .filter(|h| !h.is_empty())
            .map(PathBuf::from);
        Self { explicit, home }
    }
}

impl LogDirResolver for DefaultLogDir {
    fn resolve_log_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(explicit) = &self.explicit {
            return Ok(explicit.clone());
        }
        self.home
            .as_ref()
            .map(|home| home.join(HOME_LOG_DIR))
            .ok_or(ConfigError::NoHomeDirectory)
    }
}
