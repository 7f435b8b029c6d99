//! svclog - leveled, colorized service logging
//!
//! Console output with per-severity color decoration, or time-rotated log
//! files with a stable "latest" alias. Every line except info lines carries a
//! `[pkg--<scope>--][method--<method>--] ` prefix naming the calling function.
//!
//! ```no_run
//! use svclog::{log_errorf, log_infof, RotationGranularity, Severity};
//!
//! svclog::setup_log_tools("Demo", false, "", Severity::Info, 7, RotationGranularity::Daily)
//!     .expect("logging setup");
//! log_infof!("User %s logged in", "alice");
//! log_errorf!("query failed after %d ms", 250);
//! ```

pub mod backend;
pub mod caller;
pub mod color;
pub mod error;
pub mod printf;
pub mod registry;
pub mod rotation;
pub mod settings;
pub mod severity;

#[cfg(test)]
mod test_support;

pub use caller::CallSite;
pub use error::LogError;
pub use printf::{Arg, ToArg};
pub use registry::LogRegistry;
pub use rotation::{RotatingWriter, RotationPolicy};
pub use settings::LogSettings;
pub use severity::{RotationGranularity, Severity};

/// Configure the process-wide registry
///
/// See [`LogRegistry::setup`]. Meant to be called once at start-up, before
/// other threads begin logging.
pub fn setup_log_tools(
    project_name: &str,
    enable_file_output: bool,
    output_directory: &str,
    min_severity: Severity,
    retention_days: i64,
    rotation: RotationGranularity,
) -> error::Result<()> {
    LogRegistry::instance().setup(
        project_name,
        enable_file_output,
        output_directory,
        min_severity,
        retention_days,
        rotation,
    )
}

/// Project name of the process-wide registry
pub fn project_name() -> String {
    LogRegistry::instance().project_name()
}

/// Minimum severity of the process-wide registry
pub fn log_level() -> Severity {
    LogRegistry::instance().log_level()
}

/// Output directory of the process-wide registry
pub fn log_file_path() -> String {
    LogRegistry::instance().log_file_path()
}

#[doc(hidden)]
#[macro_export]
macro_rules! __svclog_emit {
    ($registry:expr, $severity:expr, $fmt:expr $(, $arg:expr)*) => {
        $registry.emit(
            $severity,
            &$crate::call_site!(),
            $fmt,
            &[$($crate::printf::ToArg::to_arg(&$arg)),*],
        )
    };
}

/// Log at info severity: `log_infof!("format", args...)`
///
/// `log_infof!(in registry; "format", args...)` targets a specific registry.
/// Arguments are borrowed, like with `format!`.
#[macro_export]
macro_rules! log_infof {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Info, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Info,
            $fmt $(, $arg)*
        )
    };
}

/// Log at error severity
#[macro_export]
macro_rules! log_errorf {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Error, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Error,
            $fmt $(, $arg)*
        )
    };
}

/// Log at debug severity
#[macro_export]
macro_rules! log_debugf {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Debug, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Debug,
            $fmt $(, $arg)*
        )
    };
}

/// Log at trace severity
#[macro_export]
macro_rules! log_tracef {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Trace, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Trace,
            $fmt $(, $arg)*
        )
    };
}

/// Log at fatal severity, then terminate the process
#[macro_export]
macro_rules! log_fatalf {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Fatal, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Fatal,
            $fmt $(, $arg)*
        )
    };
}

/// Log at warning severity
#[macro_export]
macro_rules! log_warnf {
    (in $registry:expr; $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!($registry, $crate::Severity::Warning, $fmt $(, $arg)*)
    };
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::__svclog_emit!(
            $crate::LogRegistry::instance(),
            $crate::Severity::Warning,
            $fmt $(, $arg)*
        )
    };
}
