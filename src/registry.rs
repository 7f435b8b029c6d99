//! The log registry: configuration, emission lock and backend
//!
//! A [`LogRegistry`] can be created explicitly and passed around, or the
//! process-wide one can be reached through [`LogRegistry::instance`], which is
//! what the `log_*f!` macros use.
//!
//! Setup is meant to run once at start-up before steady-state logging.
//! Configuration sits behind a read/write lock so a late setup call is memory
//! safe, but lines emitted concurrently with it may use either the old or the
//! new configuration.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

use crate::backend::{Backend, Sink};
use crate::caller::{caller_prefix, CallSite};
use crate::color::colorize;
use crate::error::Result;
use crate::printf::Arg;
use crate::rotation::{RotatingWriter, RotationPolicy};
use crate::settings::LogSettings;
use crate::severity::{RotationGranularity, Severity};

static REGISTRY: OnceLock<LogRegistry> = OnceLock::new();

/// Called after a fatal line has been written
pub type FatalHandler = fn();

fn exit_process() {
    std::process::exit(1);
}

struct State {
    settings: LogSettings,
    policy: Option<RotationPolicy>,
    console: Sink,
    backend: Backend,
    on_fatal: FatalHandler,
}

impl State {
    /// Rebuild the backend for the current settings and sink
    fn rebuild(&mut self, sink: Sink) {
        self.backend = Backend::new(
            sink,
            self.settings.min_severity,
            !self.settings.enable_file_output,
        );
    }
}

/// Process-wide logging state
pub struct LogRegistry {
    state: RwLock<State>,
    emit_lock: Mutex<()>,
}

impl Default for LogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRegistry")
            .field("settings", &self.settings())
            .finish()
    }
}

impl LogRegistry {
    /// Create a registry with console output and every severity enabled
    ///
    /// Nothing is pruned until a setup call sets a retention window.
    pub fn new() -> Self {
        let settings = LogSettings {
            retention_days: 0,
            ..LogSettings::default()
        };
        let backend = Backend::new(Sink::Stdout, settings.min_severity, true);
        Self {
            state: RwLock::new(State {
                settings,
                policy: None,
                console: Sink::Stdout,
                backend,
                on_fatal: exit_process,
            }),
            emit_lock: Mutex::new(()),
        }
    }

    /// The process-wide registry, created on first use
    pub fn instance() -> &'static LogRegistry {
        REGISTRY.get_or_init(LogRegistry::new)
    }

    /// Reconfigure the registry
    ///
    /// With file output enabled an empty `output_directory` falls back to the
    /// platform default and lines go to
    /// `<dir>/<lowercase project>/run_<project>.<YYYYMMDDhhmm>`, rotated every
    /// `rotation` period and kept for `retention_days` days. If the log file
    /// cannot be opened the new settings still take effect but lines keep
    /// going to the console, and the error is returned.
    pub fn setup(
        &self,
        project_name: &str,
        enable_file_output: bool,
        output_directory: &str,
        min_severity: Severity,
        retention_days: i64,
        rotation: RotationGranularity,
    ) -> Result<()> {
        let mut settings = LogSettings {
            project_name: project_name.to_string(),
            enable_file_output,
            output_directory: output_directory.to_string(),
            min_severity,
            retention_days,
            rotation,
        };
        if enable_file_output {
            settings.output_directory = settings.effective_output_directory().to_string();
        }

        let policy = settings.rotation_policy();
        let opened = policy.clone().map(RotatingWriter::open).transpose();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.settings = settings;
        match opened {
            Ok(Some(writer)) => {
                state.policy = policy;
                state.rebuild(Sink::file(writer));
                Ok(())
            }
            Ok(None) => {
                state.policy = None;
                let console = state.console.clone();
                state.rebuild(console);
                Ok(())
            }
            Err(err) => {
                state.policy = None;
                let console = state.console.clone();
                state.rebuild(console);
                Err(err)
            }
        }
    }

    /// Replace the console stream, e.g. to capture output
    ///
    /// Takes effect immediately unless file output is active.
    pub fn set_output(&self, writer: impl Write + Send + 'static) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.console = Sink::writer(writer);
        if !state.backend.sink().is_file() {
            let console = state.console.clone();
            state.rebuild(console);
        }
    }

    /// Replace what happens after a fatal line is written
    ///
    /// The default exits the process with status 1.
    pub fn set_fatal_handler(&self, handler: FatalHandler) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.on_fatal = handler;
    }

    /// Snapshot of the current settings
    pub fn settings(&self) -> LogSettings {
        self.read_state().settings.clone()
    }

    /// Configured project name
    pub fn project_name(&self) -> String {
        self.read_state().settings.project_name.clone()
    }

    /// Configured minimum severity
    pub fn log_level(&self) -> Severity {
        self.read_state().settings.min_severity
    }

    /// Configured output directory
    pub fn log_file_path(&self) -> String {
        self.read_state().settings.output_directory.clone()
    }

    /// Rotation policy of the active file sink, if any
    pub fn file_policy(&self) -> Option<RotationPolicy> {
        self.read_state().policy.clone()
    }

    /// Path of the file currently written to, if any
    pub fn current_file(&self) -> Option<PathBuf> {
        match self.read_state().backend.sink() {
            Sink::File(writer) => writer
                .lock()
                .ok()
                .map(|writer| writer.current_path().to_path_buf()),
            _ => None,
        }
    }

    /// Decorate and write one log line
    ///
    /// Console lines get colored; every line except info gets the caller
    /// prefix. A call site whose name cannot be split produces no line at
    /// all, fatal included: the call is dropped rather than written without
    /// a prefix.
    pub fn emit(&self, severity: Severity, site: &CallSite, format: &str, args: &[Arg]) {
        let state = self.read_state();

        let mut decorated = if state.settings.enable_file_output {
            format.to_string()
        } else {
            colorize(format, severity)
        };

        if severity != Severity::Info {
            let Some(prefix) = caller_prefix(site) else {
                return;
            };
            decorated.insert_str(0, &prefix);
        }

        {
            let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
            state.backend.write(severity, &decorated, args);
        }

        if severity == Severity::Fatal {
            state.backend.flush();
            let on_fatal = state.on_fatal;
            drop(state);
            on_fatal();
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
