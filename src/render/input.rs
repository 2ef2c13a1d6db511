//! Input files and their per-file pipeline stages.
//!
//! Every discovered file is one `InputFile` in an arena owned by the render
//! pass; parent pointers are arena indices, so the index-page forest is
//! acyclic by construction. The Load/Process stage fills in the transient
//! `PageState`; the Convert/Write stage turns it into output bytes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;

use crate::config::{
    ConfigError, DEFAULT_BODY_TEMPLATE, DEFAULT_PAGE_TEMPLATE, load_template_text,
};
use crate::markdown;
use crate::script::{self, ScriptError};
use crate::util;

use super::env::{Bindings, HeaderHost, RenderHost};
use super::freshness;
use super::paths;
use super::pipeline::PassContext;
use super::template::{Template, TemplateError};

/// First `#`/`##` heading of a Markdown document.
static MD_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:##|#)[ \t]+(.+?)[ \t]*$").unwrap());

/// First `<h1>`/`<h2>` element of an HTML-ish document.
static HTML_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)<(?:h1|h2)\b[^>]*>(.*?)</(?:h1|h2)>").unwrap());

/// Header block: a line of three hyphens, statements, another line of three
/// hyphens, at the very top of the file.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*\r?\n").unwrap());

/// Index into the render pass's file arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

/// Which pipeline a file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Copied byte for byte.
    Static,
    /// Template substitution, no Markdown step.
    Template,
    /// Markdown conversion wrapped in the page/body templates.
    Markdown,
}

impl FileKind {
    /// Classify purely from the path's extension; content is never
    /// inspected.
    pub fn classify(path: &Path) -> FileKind {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") => FileKind::Markdown,
            Some("css" | "csv" | "html" | "js" | "json" | "svg" | "txt") => FileKind::Template,
            _ => FileKind::Static,
        }
    }
}

/// Per-pass page state, produced by the Load/Process stage.
#[derive(Debug)]
pub struct PageState {
    /// Resolved title: header override, else content heading, else filename.
    pub title: String,
    /// Template body text, with the header block stripped.
    pub body: String,
    /// Page-local variables set by header code.
    pub locals: Bindings,
    /// Per-page template overrides set by header code.
    pub page_template: Option<PathBuf>,
    pub body_template: Option<PathBuf>,
}

/// One discovered input file.
#[derive(Debug)]
pub struct InputFile {
    pub kind: FileKind,
    pub input_path: PathBuf,
    pub relative_path: PathBuf,
    pub output_path: PathBuf,
    pub url: String,
    /// Nearest ancestor index file, or `None` at the root.
    pub parent: Option<FileId>,
    pub input_mtime: Option<SystemTime>,
    /// Read once per pass, never re-stated per comparison.
    pub output_mtime: Option<SystemTime>,
    pub stale: bool,
    /// Set when this file's Load/Process stage failed; the write stage
    /// skips it and the pass as a whole fails.
    pub broken: bool,
    pub page: Option<PageState>,
}

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: header: {source}")]
    Header {
        path: PathBuf,
        source: ScriptError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InputFile {
    pub(crate) fn new(
        input_path: PathBuf,
        relative_path: PathBuf,
        parent: Option<FileId>,
        output_dir: &Path,
        prefix: &str,
    ) -> Self {
        let kind = FileKind::classify(&relative_path);
        let output_path = output_dir.join(paths::output_relative(&relative_path));
        let url = paths::url_for(&relative_path, prefix);

        Self {
            kind,
            input_path,
            relative_path,
            output_path,
            url,
            parent,
            input_mtime: None,
            output_mtime: None,
            stale: false,
            broken: false,
            page: None,
        }
    }

    /// The page title, or the file name for files that have none (static
    /// files, or pages whose processing failed).
    pub fn title(&self) -> String {
        match &self.page {
            Some(page) => page.title.clone(),
            None => self.file_name(),
        }
    }

    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Load + Process: stat both sides, read the file, run the header block,
    /// resolve the title. Runs for every file every pass; conversion and
    /// writing happen later, and only for stale files.
    pub(crate) fn process(&mut self, ctx: &PassContext) -> Result<(), ProcessError> {
        tracing::debug!("Processing '{}'", self.input_path.display());

        self.input_mtime = freshness::mtime(&self.input_path);
        self.output_mtime = freshness::mtime(&self.output_path);
        self.stale = ctx
            .freshness
            .is_stale(self.kind, self.input_mtime, self.output_mtime);

        if self.kind == FileKind::Static {
            return Ok(());
        }

        let text =
            std::fs::read_to_string(&self.input_path).map_err(|source| ProcessError::Io {
                path: self.input_path.clone(),
                source,
            })?;

        let (header, body) = split_header(&text);

        let mut locals = Bindings::new();
        let mut explicit_title: Option<String> = None;
        let mut page_template: Option<PathBuf> = None;
        let mut body_template: Option<PathBuf> = None;

        if let Some(code) = header {
            tracing::debug!("Executing page header in '{}'", self.input_path.display());

            let mut run = || -> Result<(), ScriptError> {
                let program = script::parse_program(code)?;
                let mut host = HeaderHost {
                    site: ctx.site,
                    globals: ctx.globals,
                    root: ctx.root,
                    url: &self.url,
                    locals: &mut locals,
                    title: &mut explicit_title,
                    page_template: &mut page_template,
                    body_template: &mut body_template,
                };
                script::exec(&program, &mut host)
            };

            run().map_err(|source| ProcessError::Header {
                path: self.input_path.clone(),
                source,
            })?;
        }

        let title = explicit_title
            .or_else(|| self.content_title(body))
            .unwrap_or_else(|| self.default_title());

        self.page = Some(PageState {
            title,
            body: body.to_string(),
            locals,
            page_template,
            body_template,
        });

        Ok(())
    }

    /// Convert + Write: produce the output bytes and put them on disk,
    /// creating parent directories as needed. Only called for stale files,
    /// after every file's Process stage has finished.
    pub(crate) fn write_output(&self, arena: &[InputFile], ctx: &PassContext) -> Result<(), ProcessError> {
        tracing::debug!("Rendering '{}'", self.output_path.display());

        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ProcessError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if self.kind == FileKind::Static {
            std::fs::copy(&self.input_path, &self.output_path).map_err(|source| {
                ProcessError::Io {
                    path: self.input_path.clone(),
                    source,
                }
            })?;
            return Ok(());
        }

        let Some(page) = &self.page else {
            return Ok(());
        };

        let rendered = self.render_page(page, arena, ctx)?;

        std::fs::write(&self.output_path, rendered).map_err(|source| ProcessError::Io {
            path: self.output_path.clone(),
            source,
        })?;

        Ok(())
    }

    fn render_page(
        &self,
        page: &PageState,
        arena: &[InputFile],
        ctx: &PassContext,
    ) -> Result<String, ProcessError> {
        let (text, headings) = match self.kind {
            FileKind::Markdown => {
                let converted = markdown::convert(&page.body);

                let page_text = match &page.page_template {
                    Some(path) => load_template_text(ctx.root, path, DEFAULT_PAGE_TEMPLATE)?,
                    None => ctx.page_template.to_string(),
                };
                let body_text = match &page.body_template {
                    Some(path) => load_template_text(ctx.root, path, DEFAULT_BODY_TEMPLATE)?,
                    None => ctx.body_template.to_string(),
                };

                // The body template wraps the converted content; the page
                // template wraps the body. Both happen textually, before
                // parsing, so template expressions inside them evaluate in
                // this page's environment.
                let spliced =
                    page_text.replace("@body@", &body_text.replace("@content@", &converted.html));

                (spliced, converted.headings)
            }
            FileKind::Template => (page.body.clone(), Vec::new()),
            FileKind::Static => unreachable!("static files are copied, not rendered"),
        };

        let template = Template::parse(&text, self.input_path.display().to_string())?;
        let mut host = RenderHost::new(self, arena, &headings, ctx);

        Ok(template.render(&mut host)?)
    }

    fn content_title(&self, body: &str) -> Option<String> {
        let md = || {
            MD_TITLE_RE
                .captures(body)
                .map(|c| c[1].to_string())
        };
        let html = || {
            HTML_TITLE_RE
                .captures(body)
                .map(|c| c[1].trim().to_string())
        };

        match self.kind {
            FileKind::Markdown => md().or_else(html),
            FileKind::Template
                if self.input_path.extension().is_some_and(|e| e == "html") =>
            {
                html().or_else(md)
            }
            _ => None,
        }
    }

    fn default_title(&self) -> String {
        self.input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(util::title_case)
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

/// Split an optional header block off the top of a source file.
///
/// Returns the header statements (if present) and the remaining template
/// body.
pub fn split_header(text: &str) -> (Option<&str>, &str) {
    match HEADER_RE.captures(text) {
        Some(captures) => {
            let header = captures.get(1).map(|m| m.as_str());
            let body = &text[captures.get(0).map(|m| m.end()).unwrap_or(0)..];
            (header, body)
        }
        None => (None, text),
    }
}
