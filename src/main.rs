use std::path::PathBuf;

use anyhow::{Context, Result};

use svclog::{
    log_debugf, log_errorf, log_infof, log_tracef, log_warnf, Arg, LogRegistry, LogSettings,
};

fn main() -> Result<()> {
    // Optional settings file; defaults (console, every severity) otherwise
    let settings = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            LogSettings::load(&path).with_context(|| {
                format!("Failed to load logging settings from {}", path.display())
            })?
        }
        None => LogSettings {
            project_name: "svclog-demo".to_string(),
            ..LogSettings::default()
        },
    };
    let settings = settings
        .with_env_overrides()
        .context("Invalid logging environment override")?;

    settings
        .apply(LogRegistry::instance())
        .context("Failed to set up logging")?;

    if let Some(path) = LogRegistry::instance().current_file() {
        log_infof!("Logging to %s", path.as_path());
    }

    log_tracef!("entering %s", "main");
    log_debugf!("settings: %v", Arg::debug(&settings));
    log_infof!("User %s logged in, %d sessions open", "alice", 3);
    log_warnf!("disk usage at %.1f%%", 91.5);
    log_errorf!("query failed after %d ms", 250);

    Ok(())
}
