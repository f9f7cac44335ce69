//! Send command handler

use crate::cli::{OutputFormat, SendArgs};
use crate::producer::send_images;

use super::{build_runtime, to_json, CommandContext};

/// Frame each file and write it to a running server
pub fn run_send(args: &SendArgs, ctx: &CommandContext) -> crate::Result<String> {
    let host = args
        .host
        .clone()
        .unwrap_or_else(|| ctx.config.socket.host.clone());
    let port = args.port.unwrap_or(ctx.config.socket.port);
    let addr = format!("{}:{}", host, port);

    let runtime = build_runtime()?;
    let bytes = runtime.block_on(send_images(&addr, &args.files))?;

    match ctx.format {
        OutputFormat::Json => Ok(format!(
            "{}\n",
            to_json(&serde_json::json!({
                "address": addr,
                "files": args.files.len(),
                "bytes": bytes,
            }))?
        )),
        OutputFormat::Text => Ok(format!(
            "Sent {} files ({} bytes) to {}\n",
            args.files.len(),
            bytes,
            addr
        )),
    }
}
