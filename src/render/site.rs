//! The site and its render passes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{
    ConfigError, DEFAULT_BODY_TEMPLATE, DEFAULT_PAGE_TEMPLATE, SITE_SCRIPT, SiteConfig,
    load_template_text,
};
use crate::script;
use crate::util;

use super::discover::{self, DiscoverError};
use super::env::{Bindings, ConfigHost};
use super::freshness::{self, Freshness};
use super::input::{FileId, InputFile, ProcessError};
use super::pipeline::{self, PassContext};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discover(#[from] DiscoverError),

    /// The single-file re-render path surfaces its one error directly.
    #[error(transparent)]
    File(#[from] ProcessError),

    #[error("rendering failed ({0} error(s))")]
    Failed(usize),

    #[error("failed to update {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A site rooted at a directory with the conventional
/// `config/` / `input/` / `output/` layout.
#[derive(Debug, Clone)]
pub struct Site {
    pub root_dir: PathBuf,
    pub config_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
}

impl Site {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            config_dir: root_dir.join("config"),
            input_dir: root_dir.join("input"),
            output_dir: root_dir.join("output"),
            root_dir,
            workers: 8,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// Run one full render pass.
    ///
    /// Configuration is rebuilt from defaults every pass, the input tree is
    /// rediscovered, and only stale files are written (unless `force`).
    pub fn render(&self, force: bool) -> Result<RenderPass, RenderError> {
        let (config, globals) = self.load_config()?;
        let matcher = config.ignore_matcher()?;

        let page_template =
            load_template_text(&self.root_dir, &config.page_template, DEFAULT_PAGE_TEMPLATE)?;
        let body_template =
            load_template_text(&self.root_dir, &config.body_template, DEFAULT_BODY_TEMPLATE)?;

        info!(
            "Rendering files from '{}' to '{}'",
            self.input_dir.display(),
            self.output_dir.display()
        );

        let mut files = if self.input_dir.exists() {
            discover::discover(&self.input_dir, &self.output_dir, &config.prefix, &matcher)?
        } else {
            warn!("Input directory not found: {}", self.input_dir.display());
            Vec::new()
        };

        if files.is_empty() {
            info!("Rendered 0 output files");
            return Ok(RenderPass::new(self, files, config, globals, page_template, body_template, 0));
        }

        let freshness = Freshness::evaluate(&self.config_dir, &self.output_dir, &matcher, force);

        debug!(
            "Processing {} input {}",
            files.len(),
            util::plural("file", files.len() as i64, None)
        );

        let report = {
            let ctx = PassContext {
                site: &config,
                globals: &globals,
                root: &self.root_dir,
                page_template: &page_template,
                body_template: &body_template,
                freshness,
            };
            pipeline::run(&mut files, &ctx, self.workers)
        };

        if report.errors > 0 {
            return Err(RenderError::Failed(report.errors));
        }

        // The output directory's mtime is the reference point for the next
        // pass's config-modified check.
        if self.output_dir.exists() {
            freshness::touch(&self.output_dir).map_err(|source| RenderError::Io {
                path: self.output_dir.clone(),
                source,
            })?;
        }

        let unchanged = files.len() - report.rendered;
        let unchanged_note = if unchanged > 0 {
            format!(" ({unchanged} unchanged)")
        } else {
            String::new()
        };
        info!(
            "Rendered {} output {}{}",
            report.rendered,
            util::plural("file", report.rendered as i64, None),
            unchanged_note
        );

        Ok(RenderPass::new(
            self,
            files,
            config,
            globals,
            page_template,
            body_template,
            report.rendered,
        ))
    }

    /// Build this pass's configuration: defaults, then the site script's
    /// allow-listed overrides.
    fn load_config(&self) -> Result<(SiteConfig, Bindings), ConfigError> {
        let mut config = SiteConfig::default();
        let mut globals = Bindings::new();

        let script_path = self.root_dir.join(SITE_SCRIPT);
        if script_path.exists() {
            debug!("Executing site configuration in '{}'", script_path.display());

            let text =
                std::fs::read_to_string(&script_path).map_err(|source| ConfigError::Io {
                    path: script_path.clone(),
                    source,
                })?;

            let mut run = || -> Result<(), script::ScriptError> {
                let program = script::parse_program(&text)?;
                let mut host = ConfigHost {
                    site: &mut config,
                    globals: &mut globals,
                    root: &self.root_dir,
                };
                script::exec(&program, &mut host)
            };

            run().map_err(|source| ConfigError::Script {
                path: script_path,
                source,
            })?;
        }

        Ok((config, globals))
    }
}

/// The working set of one render pass, kept alive by the dev server so
/// requests can re-render single files against the same configuration.
#[derive(Debug)]
pub struct RenderPass {
    pub files: Vec<InputFile>,
    pub config: SiteConfig,
    pub globals: Bindings,
    /// Files written by the pass.
    pub rendered: usize,
    index: HashMap<PathBuf, FileId>,
    page_template: String,
    body_template: String,
    root: PathBuf,
}

impl RenderPass {
    fn new(
        site: &Site,
        files: Vec<InputFile>,
        config: SiteConfig,
        globals: Bindings,
        page_template: String,
        body_template: String,
        rendered: usize,
    ) -> Self {
        let index = files
            .iter()
            .enumerate()
            .map(|(i, file)| (file.input_path.clone(), FileId(i)))
            .collect();

        Self {
            files,
            config,
            globals,
            rendered,
            index,
            page_template,
            body_template,
            root: site.root_dir.clone(),
        }
    }

    /// Files discovered but left untouched by the pass.
    pub fn unchanged(&self) -> usize {
        self.files.len() - self.rendered
    }

    pub fn file_id(&self, input_path: &Path) -> Option<FileId> {
        self.index.get(input_path).copied()
    }

    /// Re-render exactly one file: re-process its ancestor index chain (so
    /// parent titles are current), then this file, then write it.
    ///
    /// This is the dev server's on-demand hook — single file, no batching,
    /// no barrier. Returns `false` when the path is not part of this pass's
    /// working set (the caller should fall back to a full render).
    pub fn render_one(&mut self, input_path: &Path) -> Result<bool, RenderError> {
        let Some(FileId(target)) = self.file_id(input_path) else {
            return Ok(false);
        };

        // Split borrows: the context reads config fields while the arena is
        // processed mutably.
        let RenderPass {
            files,
            config,
            globals,
            page_template,
            body_template,
            root,
            ..
        } = self;

        let ctx = PassContext {
            site: &*config,
            globals: &*globals,
            root: root.as_path(),
            page_template: page_template.as_str(),
            body_template: body_template.as_str(),
            freshness: Freshness::forced(),
        };

        let mut chain = vec![target];
        let mut current = files[target].parent;
        while let Some(FileId(ancestor)) = current {
            chain.push(ancestor);
            current = files[ancestor].parent;
        }

        for &id in chain.iter().rev() {
            files[id].process(&ctx)?;
            files[id].broken = false;
        }

        let arena: &[InputFile] = files;
        arena[target].write_output(arena, &ctx)?;

        Ok(true)
    }
}
