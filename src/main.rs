//! internal-tls-prepare - stage and validate internal mutual-TLS material

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use internal_tls_prepare::{
    Result,
    cli::{Cli, Command, OutputFormat},
    config::Config,
    setup_tracing,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let result = Config::load(cli.config.as_deref()).and_then(|config| {
        config.validate()?;
        match cli.command {
            Some(Command::Prepare) | None => run_prepare(&config),
            Some(Command::Validate) => run_validate(&config),
            Some(Command::Paths { format }) => run_paths(&config, format),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(check = ?e.check(), file = e.filename(), "{e}");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

/// Stage, then validate what was staged
fn run_prepare(config: &Config) -> Result<()> {
    let tls = config.internal_tls();
    let staged = tls.prepare()?;
    for file in &staged {
        println!(
            "  {:<28} {:?}/{:?}",
            file.filename, file.category, file.owner_group
        );
    }
    tls.validate()?;
    info!(files = staged.len(), "internal TLS prepared");
    Ok(())
}

fn run_validate(config: &Config) -> Result<()> {
    config.internal_tls().validate()?;
    println!("✅ internal TLS material valid");
    Ok(())
}

fn run_paths(config: &Config, format: OutputFormat) -> Result<()> {
    let reqs = config.requirements();
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reqs.paths())
                .map_err(|e| internal_tls_prepare::Error::Config(e.to_string()))?;
            println!("{json}");
        }
        OutputFormat::Text => {
            if reqs.paths().is_empty() {
                println!("internal TLS not enabled");
            }
            for (name, path) in reqs.paths() {
                println!("{name:<36} {}", path.display());
            }
        }
    }
    Ok(())
}
