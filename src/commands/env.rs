//! Env command handler
//!
//! Prints the variables a launcher injects into the producer process so it
//! knows where to send its images.

use crate::cli::{EnvArgs, OutputFormat};
use crate::producer::producer_env;

use super::{to_json, CommandContext};

pub fn run_env(args: &EnvArgs, ctx: &CommandContext) -> crate::Result<String> {
    let mut config = ctx.config.clone();
    if let Some(transport) = args.transport {
        config.intake.transport = transport;
    }
    let env = producer_env(&config);

    match ctx.format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = env
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            Ok(format!("{}\n", to_json(&map)?))
        }
        OutputFormat::Text => Ok(env
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()),
    }
}
