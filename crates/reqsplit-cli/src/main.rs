use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use reqsplit_core::{CommandContext, GlobalOptions, SystemPythonRuntime};

mod cli;
mod dispatch;
mod output;
mod style;

use cli::ReqsplitCli;
use output::{emit_output, OutputOptions};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = ReqsplitCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
    };

    let ctx = CommandContext::new(&global, SystemPythonRuntime::shared())
        .map_err(|err| eyre!("{err:?}"))?;
    let (info, outcome) = dispatch::dispatch_command(&ctx, &cli.command)?;
    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let code = emit_output(&opts, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("reqsplit={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
