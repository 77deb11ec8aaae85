mod cli;
mod decode;
mod error_fmt;
mod logging;
mod run;
mod sink;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOpts;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %format!("{e:#}"), "lcrchar failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Run {
            iterations,
            output,
            print_runtime,
        } => {
            let cfg = load_config(&cli.config)?;
            logging::init_tracing(cli.json, &cli.log_level, &cfg.logging);
            run::run_command(
                &cfg,
                RunOpts {
                    iterations,
                    output,
                    print_runtime,
                    json: cli.json,
                },
            )
        }
        Commands::Decode { file } => {
            logging::init_tracing(cli.json, &cli.log_level, &lcr_config::Logging::default());
            decode::decode_command(&file, cli.json)
        }
        Commands::SelfCheck => {
            let cfg = load_config(&cli.config)?;
            logging::init_tracing(cli.json, &cli.log_level, &cfg.logging);
            run::self_check(&cfg, cli.json)
        }
    }
}

fn load_config(path: &Path) -> Result<lcr_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg: lcr_config::Config = toml::from_str(&text).wrap_err("parsing config")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}
