//! The incremental rendering engine.
//!
//! A render pass discovers the input tree, classifies every file, resolves
//! the index-page parent hierarchy, decides what is stale, and pushes the
//! stale files through the Load/Process → Convert/Write stages across a pool
//! of workers with a barrier in between.

mod discover;
mod env;
mod freshness;
mod input;
mod nav;
mod paths;
mod pipeline;
mod site;
mod template;

pub use discover::DiscoverError;
pub use env::Bindings;
pub use input::{FileId, FileKind, InputFile, PageState, ProcessError};
pub use site::{RenderError, RenderPass, Site};
pub use template::{Template, TemplateError};
