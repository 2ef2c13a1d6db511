//! Site configuration.
//!
//! A `SiteConfig` is rebuilt from defaults at the start of every render pass,
//! then mutated by the site's configuration script through an allow-list:
//! user code may touch `title`, `prefix`, `ignored_files`, `page_template`,
//! and `body_template`, and nothing else.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::script::{ScriptError, Value};

/// Conventional location of the site configuration script, relative to the
/// site root.
pub const SITE_SCRIPT: &str = "config/site.conf";

/// Built-in fallback page template, used when the configured page template
/// file does not exist. The body template is spliced in at `@body@`.
pub const DEFAULT_PAGE_TEMPLATE: &str = "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\"/>\n    <title>{{page.title}}</title>\n  </head>\n@body@\n</html>\n";

/// Built-in fallback body template. The converted page content is spliced in
/// at `@content@`.
pub const DEFAULT_BODY_TEMPLATE: &str = "  <body>\n@content@\n  </body>";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Script {
        path: PathBuf,
        source: ScriptError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad ignore pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Site-wide settings.
///
/// `page_template` and `body_template` are paths relative to the site root;
/// the files are loaded (or replaced by the built-in fallbacks) after the
/// configuration script has run.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub title: Option<String>,
    pub prefix: String,
    pub ignored_files: Vec<String>,
    pub page_template: PathBuf,
    pub body_template: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: None,
            prefix: String::new(),
            ignored_files: vec![".git".into(), ".#*".into(), "#*".into()],
            page_template: PathBuf::from("config/page.html"),
            body_template: PathBuf::from("config/body.html"),
        }
    }
}

impl SiteConfig {
    /// Read a `site.*` attribute. Anything outside the allow-list is an
    /// "access not allowed" error, not a missing-attribute error.
    pub fn get_attr(&self, attr: &str) -> Result<Value, ScriptError> {
        match attr {
            "title" => Ok(self.title.clone().into()),
            "prefix" => Ok(Value::Str(self.prefix.clone())),
            "ignored_files" => Ok(Value::List(
                self.ignored_files
                    .iter()
                    .map(|p| Value::Str(p.clone()))
                    .collect(),
            )),
            "page_template" => Ok(Value::Str(self.page_template.display().to_string())),
            "body_template" => Ok(Value::Str(self.body_template.display().to_string())),
            _ => Err(ScriptError::NotAllowed {
                object: "site".into(),
                attr: attr.into(),
            }),
        }
    }

    /// Write a `site.*` attribute, enforcing the allow-list and value types.
    pub fn set_attr(&mut self, attr: &str, value: Value) -> Result<(), ScriptError> {
        let expect_str = |value: &Value| -> Result<String, ScriptError> {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ScriptError::Type(format!(
                    "site.{attr} must be a string, not {}",
                    value.type_name()
                )))
        };

        match attr {
            "title" => {
                self.title = match value {
                    Value::None => None,
                    other => Some(expect_str(&other)?),
                };
            }
            "prefix" => self.prefix = expect_str(&value)?,
            "ignored_files" => {
                let Value::List(items) = value else {
                    return Err(ScriptError::Type(format!(
                        "site.ignored_files must be a list of strings, not {}",
                        value.type_name()
                    )));
                };
                let mut patterns = Vec::with_capacity(items.len());
                for item in items {
                    patterns.push(expect_str(&item)?);
                }
                self.ignored_files = patterns;
            }
            "page_template" => self.page_template = PathBuf::from(expect_str(&value)?),
            "body_template" => self.body_template = PathBuf::from(expect_str(&value)?),
            _ => {
                return Err(ScriptError::NotAllowed {
                    object: "site".into(),
                    attr: attr.into(),
                });
            }
        }

        Ok(())
    }

    /// Compile the ignore patterns into one combined matcher. Run after the
    /// configuration script so user-added patterns are included.
    pub fn ignore_matcher(&self) -> Result<IgnoreMatcher, ConfigError> {
        IgnoreMatcher::compile(&self.ignored_files)
    }
}

/// Shell-style globs compiled to a single anchored regex, matched against
/// file names (not whole paths), the way the ignore list has always worked.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    regex: Option<Regex>,
}

impl IgnoreMatcher {
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        if patterns.is_empty() {
            return Ok(Self { regex: None });
        }

        let alternatives: Vec<String> = patterns.iter().map(|p| glob_to_regex(p)).collect();
        let combined = format!("^(?:{})$", alternatives.join("|"));

        let regex = Regex::new(&combined).map_err(|source| ConfigError::BadPattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self { regex: Some(regex) })
    }

    /// An empty matcher that ignores nothing.
    pub fn empty() -> Self {
        Self { regex: None }
    }

    pub fn is_ignored(&self, file_name: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(file_name))
    }
}

/// Translate one shell glob into regex source. `*` matches any run of
/// characters, `?` matches one, `[..]` classes pass through.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    let mut chars = glob.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if matches!(c, '\\' | '^') {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    // Unbalanced bracket: treat it literally.
                    out.push_str(&regex::escape(&class));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out
}

/// Resolve a template path against the site root and load it, falling back
/// to the built-in skeleton when the file does not exist.
pub fn load_template_text(
    root: &Path,
    template_path: &Path,
    fallback: &str,
) -> Result<String, ConfigError> {
    let path = if template_path.is_absolute() {
        template_path.to_path_buf()
    } else {
        root.join(template_path)
    };

    if !path.exists() {
        return Ok(fallback.to_string());
    }

    std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.prefix, "");
        assert_eq!(config.ignored_files, vec![".git", ".#*", "#*"]);
        assert_eq!(config.page_template, PathBuf::from("config/page.html"));
    }

    #[test]
    fn test_allow_listed_attrs() {
        let mut config = SiteConfig::default();

        config
            .set_attr("prefix", Value::Str("/docs".into()))
            .unwrap();
        assert_eq!(config.prefix, "/docs");
        assert_eq!(config.get_attr("prefix").unwrap(), Value::Str("/docs".into()));

        config.set_attr("title", Value::Str("My Site".into())).unwrap();
        assert_eq!(config.title.as_deref(), Some("My Site"));

        // Unset title reads as none.
        config.set_attr("title", Value::None).unwrap();
        assert_eq!(config.get_attr("title").unwrap(), Value::None);
    }

    #[test]
    fn test_attr_outside_allow_list() {
        let mut config = SiteConfig::default();

        assert!(matches!(
            config.get_attr("output_dir"),
            Err(ScriptError::NotAllowed { .. })
        ));
        assert!(matches!(
            config.set_attr("output_dir", Value::Str("/tmp".into())),
            Err(ScriptError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_attr_type_checks() {
        let mut config = SiteConfig::default();

        assert!(matches!(
            config.set_attr("prefix", Value::Int(3)),
            Err(ScriptError::Type(_))
        ));
        assert!(matches!(
            config.set_attr("ignored_files", Value::Str(".git".into())),
            Err(ScriptError::Type(_))
        ));
        assert!(matches!(
            config.set_attr("ignored_files", Value::List(vec![Value::Int(1)])),
            Err(ScriptError::Type(_))
        ));
    }

    #[test]
    fn test_ignore_matcher() {
        let matcher = IgnoreMatcher::compile(&[
            ".git".to_string(),
            ".#*".to_string(),
            "#*".to_string(),
        ])
        .unwrap();

        assert!(matcher.is_ignored(".git"));
        assert!(matcher.is_ignored("#autosave#"));
        assert!(matcher.is_ignored(".#lock"));
        assert!(!matcher.is_ignored("index.md"));
        assert!(!matcher.is_ignored("git"));
    }

    #[test]
    fn test_ignore_matcher_empty() {
        let matcher = IgnoreMatcher::compile(&[]).unwrap();
        assert!(!matcher.is_ignored("anything"));
    }

    #[test]
    fn test_glob_question_mark_and_class() {
        let matcher =
            IgnoreMatcher::compile(&["?.tmp".to_string(), "[ab].log".to_string()]).unwrap();
        assert!(matcher.is_ignored("x.tmp"));
        assert!(!matcher.is_ignored("xy.tmp"));
        assert!(matcher.is_ignored("a.log"));
        assert!(!matcher.is_ignored("c.log"));
    }

    #[test]
    fn test_load_template_text_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let text = load_template_text(
            dir.path(),
            Path::new("config/page.html"),
            DEFAULT_PAGE_TEMPLATE,
        )
        .unwrap();
        assert_eq!(text, DEFAULT_PAGE_TEMPLATE);
    }

    #[test]
    fn test_load_template_text_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/page.html"), "custom @body@").unwrap();

        let text = load_template_text(
            dir.path(),
            Path::new("config/page.html"),
            DEFAULT_PAGE_TEMPLATE,
        )
        .unwrap();
        assert_eq!(text, "custom @body@");
    }
}
