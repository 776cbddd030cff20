//! obsidian: provision a firmware lineage and protect update bundles
//!
//! ```bash
//! obsidian provision
//! obsidian protect --infile app.bin --outfile app.bundle --version 3 --message "fix boot loop"
//! obsidian inspect app.bundle --json
//! obsidian verify app.bundle --extract app.out
//! ```

use std::process::ExitCode;

use clap::Parser;
use obsidian_cli::{Cli, CliError, CliResult, Command, ToolConfig, commands};
use obsidian_logging::ObsidianSubscriberBuilder;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ToolConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.diagnostic());
            return ExitCode::from(e.exit_code());
        }
    };

    let _guard = match ObsidianSubscriberBuilder::new()
        .with_config(config.logging.clone())
        .try_init()
    {
        Ok(guard) => guard,
        Err(e) => {
            let e = CliError::from(e);
            eprintln!("{}", e.diagnostic());
            return ExitCode::from(e.exit_code());
        }
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // stderr regardless of filters; the event is kept for file output
            eprintln!("{}", e.diagnostic());
            error!(error = %e, "Command failed");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(command: Command, config: &ToolConfig) -> CliResult<()> {
    match command {
        Command::Provision { force } => {
            let public = commands::provision(config, force)?;
            println!(
                "Provisioned lineage {} in {}",
                public.short_id(),
                config.crypto_dir.display()
            );
        }
        Command::Protect {
            infile,
            outfile,
            version,
            message,
        } => {
            let info = commands::protect(config, &infile, &outfile, version, &message)?;
            println!(
                "Wrote {} ({} bytes, version {})",
                outfile.display(),
                info.total_size,
                info.version
            );
        }
        Command::Inspect { bundle, json } => {
            let info = commands::inspect(&bundle)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", info);
            }
        }
        Command::Verify { bundle, extract } => {
            let release = commands::verify(config, &bundle, extract.as_deref())?;
            println!(
                "OK: version {}, {} bytes firmware, message {:?}",
                release.version,
                release.firmware.len(),
                release.message
            );
        }
    }
    Ok(())
}
