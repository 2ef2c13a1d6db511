//! Script environments.
//!
//! Three `Host` implementations cover the three places user code runs:
//!
//! - [`ConfigHost`] — the configuration script: `site` is writable through
//!   its allow-list, assignments define site-wide globals.
//! - [`HeaderHost`] — page header blocks, before the pipeline barrier: `site`
//!   is read-only, assignments define page locals, `page.*` writes set
//!   per-page overrides. Only the pure builtins are available.
//! - [`RenderHost`] — template expressions, after the barrier: read-only, but
//!   with the cross-page helpers (`path_nav`, `toc_nav`, `render_template`)
//!   that need every file's processed metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::markdown::{self, Heading};
use crate::script::{CallArgs, Host, ScriptError, Value};
use crate::util;

use super::input::{FileId, FileKind, InputFile};
use super::nav::{self, NavEntry};
use super::pipeline::PassContext;
use super::template::Template;

/// A flat variable namespace.
pub type Bindings = HashMap<String, Value>;

// ---------------------------------------------------------------------------
// Configuration script
// ---------------------------------------------------------------------------

pub struct ConfigHost<'a> {
    pub site: &'a mut SiteConfig,
    pub globals: &'a mut Bindings,
    pub root: &'a Path,
}

impl Host for ConfigHost<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.globals.insert(name.to_string(), value);
        Ok(())
    }

    fn get_attr(&self, object: &str, attr: &str) -> Result<Value, ScriptError> {
        match object {
            "site" => self.site.get_attr(attr),
            _ => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn set_attr(&mut self, object: &str, attr: &str, value: Value) -> Result<(), ScriptError> {
        match object {
            "site" => self.site.set_attr(attr, value),
            _ => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn call(&mut self, function: &str, args: CallArgs) -> Result<Value, ScriptError> {
        match pure_call(function, &args, self.root) {
            Some(result) => result,
            None => Err(render_stage_or_unknown(function)),
        }
    }
}

// ---------------------------------------------------------------------------
// Page headers (Load/Process stage)
// ---------------------------------------------------------------------------

pub struct HeaderHost<'a> {
    pub site: &'a SiteConfig,
    pub globals: &'a Bindings,
    pub root: &'a Path,
    pub url: &'a str,
    pub locals: &'a mut Bindings,
    pub title: &'a mut Option<String>,
    pub page_template: &'a mut Option<PathBuf>,
    pub body_template: &'a mut Option<PathBuf>,
}

impl Host for HeaderHost<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        self.locals.insert(name.to_string(), value);
        Ok(())
    }

    fn get_attr(&self, object: &str, attr: &str) -> Result<Value, ScriptError> {
        match (object, attr) {
            ("site", _) => self.site.get_attr(attr),
            ("page", "title") => Ok(self.title.clone().into()),
            ("page", "url") => Ok(Value::Str(self.url.to_string())),
            ("page", _) => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
            _ => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn set_attr(&mut self, object: &str, attr: &str, value: Value) -> Result<(), ScriptError> {
        let expect_str = |value: Value| -> Result<String, ScriptError> {
            match value {
                Value::Str(s) => Ok(s),
                other => Err(ScriptError::Type(format!(
                    "page.{attr} must be a string, not {}",
                    other.type_name()
                ))),
            }
        };

        match (object, attr) {
            ("page", "title") => {
                *self.title = match value {
                    Value::None => None,
                    other => Some(expect_str(other)?),
                };
                Ok(())
            }
            ("page", "page_template") => {
                *self.page_template = Some(PathBuf::from(expect_str(value)?));
                Ok(())
            }
            ("page", "body_template") => {
                *self.body_template = Some(PathBuf::from(expect_str(value)?));
                Ok(())
            }
            ("site", _) => Err(ScriptError::Type(
                "site settings can only be changed from the configuration script".into(),
            )),
            _ => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn call(&mut self, function: &str, args: CallArgs) -> Result<Value, ScriptError> {
        match pure_call(function, &args, self.root) {
            Some(result) => result,
            None => Err(render_stage_or_unknown(function)),
        }
    }
}

// ---------------------------------------------------------------------------
// Template rendering (Convert/Write stage)
// ---------------------------------------------------------------------------

pub struct RenderHost<'a> {
    site: &'a SiteConfig,
    globals: &'a Bindings,
    root: &'a Path,
    arena: &'a [InputFile],
    file: &'a InputFile,
    headings: &'a [Heading],
}

impl<'a> RenderHost<'a> {
    pub fn new(
        file: &'a InputFile,
        arena: &'a [InputFile],
        headings: &'a [Heading],
        ctx: &PassContext<'a>,
    ) -> Self {
        Self {
            site: ctx.site,
            globals: ctx.globals,
            root: ctx.root,
            arena,
            file,
            headings,
        }
    }

    /// The ancestor trail, root first, ending at the current page.
    fn trail(&self) -> Vec<NavEntry> {
        let mut trail = vec![NavEntry {
            url: self.file.url.clone(),
            title: self.file.title(),
        }];

        let mut current = self.file.parent;
        while let Some(FileId(index)) = current {
            let ancestor = &self.arena[index];
            trail.push(NavEntry {
                url: ancestor.url.clone(),
                title: ancestor.title(),
            });
            current = ancestor.parent;
        }

        trail.reverse();
        trail
    }
}

impl Host for RenderHost<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.file
            .page
            .as_ref()
            .and_then(|page| page.locals.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    fn assign(&mut self, _name: &str, _value: Value) -> Result<(), ScriptError> {
        Err(ScriptError::Type(
            "assignment is not allowed in template expressions".into(),
        ))
    }

    fn get_attr(&self, object: &str, attr: &str) -> Result<Value, ScriptError> {
        match (object, attr) {
            ("site", _) => self.site.get_attr(attr),
            ("page", "title") => Ok(Value::Str(self.file.title())),
            ("page", "url") => Ok(Value::Str(self.file.url.clone())),
            _ => Err(ScriptError::NotAllowed {
                object: object.to_string(),
                attr: attr.to_string(),
            }),
        }
    }

    fn set_attr(&mut self, object: &str, attr: &str, _value: Value) -> Result<(), ScriptError> {
        Err(ScriptError::NotAllowed {
            object: object.to_string(),
            attr: attr.to_string(),
        })
    }

    fn call(&mut self, function: &str, args: CallArgs) -> Result<Value, ScriptError> {
        if let Some(result) = pure_call(function, &args, self.root) {
            return result;
        }

        match function {
            "path_nav" => {
                let start = args.int_opt(0, "start", "path_nav")?;
                let end = args.int_opt(1, "end", "path_nav")?;
                let min = args.int_opt(2, "min", "path_nav")?.unwrap_or(1);

                Ok(Value::Str(nav::path_nav(&self.trail(), start, end, min)))
            }
            "toc_nav" => {
                if self.file.kind != FileKind::Markdown {
                    return Err(ScriptError::Builtin {
                        function: "toc_nav".into(),
                        message: "only available on Markdown pages".into(),
                    });
                }
                Ok(Value::Str(nav::toc_nav(self.headings)))
            }
            "render_template" => {
                let path = args.str_arg(0, "path", "render_template")?;
                let full_path = self.root.join(&path);

                let text = std::fs::read_to_string(&full_path).map_err(|e| {
                    ScriptError::Builtin {
                        function: "render_template".into(),
                        message: format!("failed to read '{path}': {e}"),
                    }
                })?;

                let template =
                    Template::parse(&text, path.clone()).map_err(|e| ScriptError::Builtin {
                        function: "render_template".into(),
                        message: e.to_string(),
                    })?;

                let fragments =
                    template
                        .render_fragments(self)
                        .map_err(|e| ScriptError::Builtin {
                            function: "render_template".into(),
                            message: e.to_string(),
                        })?;

                Ok(Value::Fragments(fragments))
            }
            _ => Err(ScriptError::UnknownFunction(function.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------------

/// The pure builtin set, available in every environment. Returns `None` for
/// names this set does not cover.
fn pure_call(function: &str, args: &CallArgs, root: &Path) -> Option<Result<Value, ScriptError>> {
    let result = match function {
        "include" => include(args, root),
        "convert_markdown" => {
            rendered_arg(args, 0, "content", "convert_markdown")
                .map(|text| Value::Str(markdown::convert(&text).html))
        }
        "strip" => rendered_arg(args, 0, "content", "strip")
            .map(|text| Value::Str(util::strip(&text))),
        "html_escape" => rendered_arg(args, 0, "content", "html_escape")
            .map(|text| Value::Str(util::html_escape(&text))),
        "plural" => plural(args),
        "fail" => {
            match rendered_arg(args, 0, "message", "fail") {
                Ok(message) => Err(ScriptError::Raised(message)),
                Err(e) => Err(e),
            }
        }
        _ => return None,
    };

    Some(result)
}

/// Error for a name outside the current environment's builtin set,
/// distinguishing render-stage helpers called too early from plain unknowns.
fn render_stage_or_unknown(function: &str) -> ScriptError {
    match function {
        "path_nav" | "toc_nav" | "render_template" => ScriptError::Builtin {
            function: function.to_string(),
            message: "only available in template expressions".into(),
        },
        _ => ScriptError::UnknownFunction(function.to_string()),
    }
}

fn include(args: &CallArgs, root: &Path) -> Result<Value, ScriptError> {
    let path = args.str_arg(0, "path", "include")?;

    std::fs::read_to_string(root.join(&path))
        .map(Value::Str)
        .map_err(|e| ScriptError::Builtin {
            function: "include".into(),
            message: format!("failed to read '{path}': {e}"),
        })
}

fn plural(args: &CallArgs) -> Result<Value, ScriptError> {
    let noun = args.str_arg(0, "noun", "plural")?;
    let count = args.int_opt(1, "count", "plural")?.unwrap_or(0);
    let explicit = args.str_opt(2, "plural", "plural")?;

    Ok(Value::Str(util::plural(
        &noun,
        count,
        explicit.as_deref(),
    )))
}

fn rendered_arg(
    args: &CallArgs,
    index: usize,
    name: &str,
    function: &str,
) -> Result<String, ScriptError> {
    match args.get(index, name) {
        Some(value) => Ok(value.render()),
        None => Err(ScriptError::Argument {
            function: function.to_string(),
            message: format!("missing argument '{name}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{self, parse_program};

    fn exec_config(src: &str, site: &mut SiteConfig, globals: &mut Bindings) -> Result<(), ScriptError> {
        let program = parse_program(src)?;
        let mut host = ConfigHost {
            site,
            globals,
            root: Path::new("/nonexistent"),
        };
        script::exec(&program, &mut host)
    }

    #[test]
    fn test_config_sets_allow_listed_settings() {
        let mut site = SiteConfig::default();
        let mut globals = Bindings::new();

        exec_config(
            "site.title = 'My Site'\nsite.prefix = '/docs'\nsite.ignored_files = ['.git']\n",
            &mut site,
            &mut globals,
        )
        .unwrap();

        assert_eq!(site.title.as_deref(), Some("My Site"));
        assert_eq!(site.prefix, "/docs");
        assert_eq!(site.ignored_files, vec![".git"]);
    }

    #[test]
    fn test_config_defines_globals() {
        let mut site = SiteConfig::default();
        let mut globals = Bindings::new();

        exec_config("release = '1.4'\nbanner = 'v' + release\n", &mut site, &mut globals).unwrap();

        assert_eq!(globals["banner"], Value::Str("v1.4".into()));
    }

    #[test]
    fn test_config_rejects_unknown_site_attr() {
        let mut site = SiteConfig::default();
        let mut globals = Bindings::new();

        let err = exec_config("site.workers = 4\n", &mut site, &mut globals).unwrap_err();
        assert!(matches!(err, ScriptError::NotAllowed { .. }));
        assert!(err.to_string().contains("access not allowed: site.workers"));
    }

    #[test]
    fn test_config_rejects_render_stage_helpers() {
        let mut site = SiteConfig::default();
        let mut globals = Bindings::new();

        let err = exec_config("path_nav()\n", &mut site, &mut globals).unwrap_err();
        assert!(err.to_string().contains("only available in template"));
    }

    #[test]
    fn test_header_host_sets_title_and_locals() {
        let site = SiteConfig::default();
        let globals = Bindings::new();
        let mut locals = Bindings::new();
        let mut title = None;
        let mut page_template = None;
        let mut body_template = None;

        let program =
            parse_program("page.title = 'Override'\nedited = 'today'\n").unwrap();
        let mut host = HeaderHost {
            site: &site,
            globals: &globals,
            root: Path::new("/nonexistent"),
            url: "/about.html",
            locals: &mut locals,
            title: &mut title,
            page_template: &mut page_template,
            body_template: &mut body_template,
        };
        script::exec(&program, &mut host).unwrap();

        assert_eq!(title.as_deref(), Some("Override"));
        assert_eq!(locals["edited"], Value::Str("today".into()));
    }

    #[test]
    fn test_header_host_cannot_write_site() {
        let site = SiteConfig::default();
        let globals = Bindings::new();
        let mut locals = Bindings::new();
        let mut title = None;
        let mut page_template = None;
        let mut body_template = None;

        let program = parse_program("site.prefix = '/hijacked'\n").unwrap();
        let mut host = HeaderHost {
            site: &site,
            globals: &globals,
            root: Path::new("/nonexistent"),
            url: "/about.html",
            locals: &mut locals,
            title: &mut title,
            page_template: &mut page_template,
            body_template: &mut body_template,
        };
        assert!(script::exec(&program, &mut host).is_err());
    }

    #[test]
    fn test_pure_builtins() {
        let root = Path::new("/nonexistent");

        let args = CallArgs {
            positional: vec![Value::Str("  x  ".into())],
            named: vec![],
        };
        assert_eq!(
            pure_call("strip", &args, root).unwrap().unwrap(),
            Value::Str("x".into())
        );

        let args = CallArgs {
            positional: vec![Value::Str("a < b".into())],
            named: vec![],
        };
        assert_eq!(
            pure_call("html_escape", &args, root).unwrap().unwrap(),
            Value::Str("a &lt; b".into())
        );

        let args = CallArgs {
            positional: vec![Value::Str("file".into()), Value::Int(3)],
            named: vec![],
        };
        assert_eq!(
            pure_call("plural", &args, root).unwrap().unwrap(),
            Value::Str("files".into())
        );

        let args = CallArgs {
            positional: vec![Value::Str("# Hi\n".into())],
            named: vec![],
        };
        let Value::Str(html) = pure_call("convert_markdown", &args, root).unwrap().unwrap()
        else {
            panic!("expected a string");
        };
        assert!(html.contains("<h1"));
    }

    #[test]
    fn test_fail_raises_verbatim() {
        let args = CallArgs {
            positional: vec![Value::Str("missing release notes".into())],
            named: vec![],
        };
        let err = pure_call("fail", &args, Path::new("/")).unwrap().unwrap_err();
        assert!(matches!(err, ScriptError::Raised(ref m) if m == "missing release notes"));
    }

    #[test]
    fn test_include_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snippet.html"), "<b>hi</b>").unwrap();

        let args = CallArgs {
            positional: vec![Value::Str("snippet.html".into())],
            named: vec![],
        };
        assert_eq!(
            pure_call("include", &args, dir.path()).unwrap().unwrap(),
            Value::Str("<b>hi</b>".into())
        );
    }
}
