//! Path and URL conversions.
//!
//! This module handles conversions between:
//! - Input file paths (relative paths within the input tree)
//! - Output file paths (where files are written, with `.md` → `.html`)
//! - URL paths (where the rendered file is served, with the site prefix)

use std::path::{Path, PathBuf};

/// Map an input-relative path to its output-relative path.
///
/// Markdown files change extension; everything else is mirrored untouched.
///
/// # Examples
/// ```ignore
/// output_relative("about.md") => "about.html"
/// output_relative("guides/index.md") => "guides/index.html"
/// output_relative("main.css") => "main.css"
/// ```
pub fn output_relative(relative: &Path) -> PathBuf {
    if relative.extension().is_some_and(|e| e == "md") {
        relative.with_extension("html")
    } else {
        relative.to_path_buf()
    }
}

/// Build the site-relative URL for an input-relative path.
///
/// The prefix is prepended verbatim; an empty prefix yields root-relative
/// URLs.
///
/// # Examples
/// ```ignore
/// url_for("about.md", "") => "/about.html"
/// url_for("guides/setup.md", "/docs") => "/docs/guides/setup.html"
/// ```
pub fn url_for(relative: &Path, prefix: &str) -> String {
    let output = output_relative(relative);
    let path = output.to_string_lossy().replace('\\', "/");

    format!("{prefix}/{path}")
}
