//! Time-rotated log files
//!
//! A [`RotatingWriter`] maps one logical log stream onto dated files:
//! `<base>.<YYYYMMDDhhmm>` for the start of the current period, plus a stable
//! alias at `<base>` that always points at the newest file. Files older than
//! the retention window are deleted whenever a new file is started.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime};

use crate::error::{LogError, Result};
use crate::severity::RotationGranularity;

/// strftime pattern appended to the base path of every rotated file
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Prefix of every log file name, followed by the project name
pub const FILE_PREFIX: &str = "run_";

/// Where rotated files go and how long they live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Path every rotated file name starts with
    pub base: PathBuf,
    /// Stable alias for the current file
    pub link: PathBuf,
    /// Length of one rotation period
    pub interval: Duration,
    /// Files older than this are pruned; `None` keeps everything
    pub max_age: Option<Duration>,
}

impl RotationPolicy {
    /// Policy for a project: `<dir>/<lowercase project>/run_<project>`
    ///
    /// A non-positive `retention_days` disables pruning.
    pub fn for_project(
        dir: &Path,
        project_name: &str,
        granularity: RotationGranularity,
        retention_days: i64,
    ) -> Self {
        let base = dir
            .join(project_name.to_lowercase())
            .join(format!("{}{}", FILE_PREFIX, project_name));
        let max_age = u64::try_from(retention_days)
            .ok()
            .filter(|days| *days > 0)
            .map(|days| Duration::from_secs(days.saturating_mul(24 * 60 * 60)));

        Self {
            link: base.clone(),
            base,
            interval: granularity.interval(),
            max_age,
        }
    }

    /// The file name pattern, e.g. `/var/log/demo/run_Demo.%Y%m%d%H%M`
    pub fn pattern(&self) -> String {
        format!("{}.{}", self.base.display(), TIMESTAMP_FORMAT)
    }

    /// Directory holding the rotated files
    pub fn directory(&self) -> &Path {
        self.base.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Start of the period containing `now`
    ///
    /// Periods are aligned to local midnight, so hourly files start on the
    /// hour and daily files at midnight.
    pub fn period_start(&self, now: NaiveDateTime) -> NaiveDateTime {
        let midnight = now.date().and_time(NaiveTime::MIN);
        let step = self.interval.as_secs().max(60) as i64;
        let elapsed = (now - midnight).num_seconds();
        midnight + chrono::Duration::seconds(elapsed / step * step)
    }

    /// Path of the file for the period starting at `start`
    pub fn file_for(&self, start: NaiveDateTime) -> PathBuf {
        let mut name = self.base.as_os_str().to_os_string();
        name.push(".");
        name.push(start.format(TIMESTAMP_FORMAT).to_string());
        PathBuf::from(name)
    }
}

/// Source of the current time, replaceable in tests
pub type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

struct ActiveFile {
    period: NaiveDateTime,
    path: PathBuf,
    file: File,
}

/// A [`Write`] target that rotates, relinks and prunes on schedule
pub struct RotatingWriter {
    policy: RotationPolicy,
    clock: Clock,
    active: ActiveFile,
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("policy", &self.policy)
            .field("current", &self.active.path)
            .finish()
    }
}

impl RotatingWriter {
    /// Open the file for the current period
    ///
    /// Creates the directory, points the alias at the file and prunes expired
    /// files. Failing to create the directory or open the file is an error;
    /// alias and pruning problems are not.
    pub fn open(policy: RotationPolicy) -> Result<Self> {
        Self::with_clock(policy, Box::new(Local::now))
    }

    /// Like [`RotatingWriter::open`] with an explicit clock
    pub fn with_clock(policy: RotationPolicy, clock: Clock) -> Result<Self> {
        let dir = policy.directory().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| LogError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;

        let period = policy.period_start(clock().naive_local());
        let active = open_period(&policy, period)?;
        let writer = Self {
            policy,
            clock,
            active,
        };
        writer.after_rotation();
        Ok(writer)
    }

    /// The rotation policy in force
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> &Path {
        &self.active.path
    }

    fn rotate_if_needed(&mut self) -> Result<()> {
        let period = self.policy.period_start((self.clock)().naive_local());
        if period == self.active.period {
            return Ok(());
        }
        let _ = self.active.file.flush();
        self.active = open_period(&self.policy, period)?;
        self.after_rotation();
        Ok(())
    }

    fn after_rotation(&self) {
        let _ = update_link(&self.active.path, &self.policy.link);
        if let Some(max_age) = self.policy.max_age {
            let _ = cleanup_expired_logs(&self.policy, max_age, &self.active.path);
        }
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed().map_err(io::Error::other)?;
        self.active.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.active.file.flush()
    }
}

fn open_period(policy: &RotationPolicy, period: NaiveDateTime) -> Result<ActiveFile> {
    let path = policy.file_for(period);
    let dir = policy.directory();
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| LogError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LogError::OpenLogFile {
            path: path.clone(),
            source,
        })?;
    Ok(ActiveFile { period, path, file })
}

/// Point `link` at `target`, replacing any previous alias in one rename
#[cfg(unix)]
fn update_link(target: &Path, link: &Path) -> io::Result<()> {
    let mut tmp = link.as_os_str().to_os_string();
    tmp.push("_symlink");
    let tmp = PathBuf::from(tmp);

    // Relative target, both live in the same directory
    let relative = if target.parent() == link.parent() {
        target.file_name().map(PathBuf::from)
    } else {
        None
    };
    let _ = fs::remove_file(&tmp);
    std::os::unix::fs::symlink(relative.as_deref().unwrap_or(target), &tmp)?;
    fs::rename(&tmp, link)
}

/// Best effort alias where symlinks need privileges: a hard link to the file
#[cfg(not(unix))]
fn update_link(target: &Path, link: &Path) -> io::Result<()> {
    let _ = fs::remove_file(link);
    fs::hard_link(target, link)
}

/// Whether `name` is a rotated file of `base_name`: `<base_name>.<digits>`
fn is_rotated_name(name: &str, base_name: &str) -> bool {
    name.strip_prefix(base_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|stamp| !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete rotated files of `policy` last modified more than `max_age` ago
///
/// The alias and `keep` are never touched. Returns the number of files deleted.
pub fn cleanup_expired_logs(
    policy: &RotationPolicy,
    max_age: Duration,
    keep: &Path,
) -> io::Result<usize> {
    let dir = policy.directory();
    if !dir.exists() {
        return Ok(0);
    }
    let Some(base_name) = policy.base.file_name().and_then(|n| n.to_str()) else {
        return Ok(0);
    };

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_rotated_name(name, base_name) => {}
            _ => continue,
        }
        if path == keep || path == policy.link {
            continue;
        }

        // The alias may be a symlink; judge the entry itself
        if let Ok(metadata) = fs::symlink_metadata(&path) {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff && fs::remove_file(&path).is_ok() {
                    deleted_count += 1;
                }
            }
        }
    }

    Ok(deleted_count)
}
