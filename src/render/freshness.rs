//! Staleness decisions.
//!
//! A file is stale when its output is missing or older than its input.
//! Configuration changes (templates, site code) can affect every rendered
//! page, so a modified file anywhere under the config directory forces every
//! non-static file stale for the whole pass. `--force` overrides everything.

use std::path::Path;
use std::time::SystemTime;

use tracing::info;
use walkdir::WalkDir;

use crate::config::IgnoreMatcher;

use super::input::FileKind;

/// The per-pass staleness policy, computed once before the workers start.
#[derive(Debug, Clone, Copy)]
pub struct Freshness {
    force: bool,
    config_forced: bool,
}

impl Freshness {
    /// Inspect the config directory and decide the policy for this pass.
    pub fn evaluate(
        config_dir: &Path,
        output_dir: &Path,
        matcher: &IgnoreMatcher,
        force: bool,
    ) -> Self {
        if force {
            return Self {
                force: true,
                config_forced: false,
            };
        }

        // No output directory yet means a first-ever render: every file is
        // stale on its own, and there is nothing to compare config mtimes
        // against.
        let Some(last_render) = mtime(output_dir) else {
            return Self {
                force: false,
                config_forced: false,
            };
        };

        let config_forced = if config_dir.exists() {
            config_modified_since(config_dir, matcher, last_render)
        } else {
            info!("Config directory not found: {}", config_dir.display());
            false
        };

        Self {
            force: false,
            config_forced,
        }
    }

    /// The everything-is-stale policy, used by `--force` shortcuts and the
    /// serve-time single-file re-render.
    pub fn forced() -> Self {
        Self {
            force: true,
            config_forced: false,
        }
    }

    /// Decide staleness for one file from its cached mtimes.
    ///
    /// Static files are exempt from config-forced rebuilds: they are copied
    /// byte for byte, so configuration cannot affect their content.
    pub fn is_stale(
        &self,
        kind: FileKind,
        input_mtime: Option<SystemTime>,
        output_mtime: Option<SystemTime>,
    ) -> bool {
        if self.force {
            return true;
        }

        if self.config_forced && kind != FileKind::Static {
            return true;
        }

        let Some(output) = output_mtime else {
            return true;
        };

        match input_mtime {
            Some(input) => input > output,
            // Unreadable input: treat as stale and let the load stage report
            // the real error.
            None => true,
        }
    }
}

/// Modification time of a path, or `None` if it cannot be read.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Bump the output directory's own mtime after a fully successful pass; it
/// is the reference point for the next pass's config-modified scan.
pub fn touch(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.set_modified(SystemTime::now())
}

/// True when any non-ignored file under `dir` was modified at or after
/// `since`.
fn config_modified_since(dir: &Path, matcher: &IgnoreMatcher, since: SystemTime) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| !matcher.is_ignored(&entry.file_name().to_string_lossy()))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .is_some_and(|modified| modified >= since)
        })
}
