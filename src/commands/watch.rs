//! Watch command handler
//!
//! File transport: the producer writes images into the graphics directory
//! and this command follows it, printing a display update per change.

use crate::cli::WatchArgs;
use crate::config::Transport;
use crate::server::Engine;

use super::{build_runtime, shutdown_signal, CommandContext};

/// Follow a graphics directory until Ctrl-C
pub fn run_watch(args: &WatchArgs, ctx: &CommandContext) -> crate::Result<String> {
    let mut config = ctx.config.clone();
    config.intake.transport = Transport::File;
    if let Some(dir) = &args.dir {
        config.intake.directory = dir.clone();
    }
    if let Some(width) = args.width {
        config.display.viewport_width = width;
    }

    let directory = config.intake.directory.clone();
    let runtime = build_runtime()?;
    runtime.block_on(async {
        let mut engine = Engine::new(config, ctx.emitter())?;
        engine.set_directory(&directory)?;
        tracing::info!(
            "Watching {} ({} images)",
            directory.display(),
            engine.display_list().len()
        );
        engine.run(shutdown_signal()).await
    })?;

    Ok(String::new())
}
