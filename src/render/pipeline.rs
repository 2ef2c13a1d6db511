//! Work distribution for a render pass.
//!
//! The file arena is split into contiguous batches, one per worker. All
//! workers run Load/Process over their batch; the end of that scope is the
//! global barrier — no file converts or writes until every file's metadata
//! (titles, parents, staleness) is resolved, because cross-page references
//! must see fully-processed siblings. A second scope then runs Convert/Write
//! for the stale files.
//!
//! Workers never touch shared discovery state: stage one hands each worker a
//! disjoint `&mut` chunk of the arena, stage two shares the whole arena
//! immutably. The one shared mutable thing is the error channel.

use std::path::Path;
use std::sync::mpsc;

use tracing::error;

use crate::config::SiteConfig;

use super::env::Bindings;
use super::freshness::Freshness;
use super::input::{InputFile, ProcessError};

/// Everything a worker needs, shared read-only across the pass.
pub struct PassContext<'a> {
    pub site: &'a SiteConfig,
    pub globals: &'a Bindings,
    /// Site root, for `include(..)` and template-path resolution.
    pub root: &'a Path,
    /// Loaded page/body template text (site defaults for this pass).
    pub page_template: &'a str,
    pub body_template: &'a str,
    pub freshness: Freshness,
}

pub struct PassReport {
    /// Files written this pass.
    pub rendered: usize,
    /// Per-file failures, already logged; non-zero fails the pass.
    pub errors: usize,
}

/// Run both pipeline stages over the arena.
///
/// A per-file failure marks the file broken and is pushed on the error
/// channel; the worker carries on with the rest of its batch. The caller
/// fails the overall pass when the report carries errors.
pub fn run(files: &mut [InputFile], ctx: &PassContext, workers: usize) -> PassReport {
    let total = files.len();
    let batch = total.div_ceil(workers.max(1)).max(1);

    let (error_tx, error_rx) = mpsc::channel::<ProcessError>();

    // Stage one: Load + Process, every file. Each worker owns a disjoint
    // slice; files within a batch are processed strictly in order.
    std::thread::scope(|scope| {
        for chunk in files.chunks_mut(batch) {
            let error_tx = error_tx.clone();
            scope.spawn(move || {
                for file in chunk {
                    if let Err(err) = file.process(ctx) {
                        error!("{err}");
                        file.broken = true;
                        let _ = error_tx.send(err);
                    }
                }
            });
        }
    });
    // Scope end is the barrier: every file is processed before any converts.

    // Stage two: Convert + Write, stale files only, arena shared read-only.
    let files = &*files;
    let rendered = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..total)
            .step_by(batch)
            .map(|start| {
                let range = start..(start + batch).min(total);
                let error_tx = error_tx.clone();
                scope.spawn(move || {
                    let mut rendered = 0usize;
                    for id in range {
                        let file = &files[id];
                        if !file.stale || file.broken {
                            continue;
                        }
                        match file.write_output(files, ctx) {
                            Ok(()) => rendered += 1,
                            Err(err) => {
                                error!("{err}");
                                let _ = error_tx.send(err);
                            }
                        }
                    }
                    rendered
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("render worker panicked"))
            .sum()
    });

    drop(error_tx);
    let errors = error_rx.into_iter().count();

    PassReport { rendered, errors }
}
