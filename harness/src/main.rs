//! plugtest - entry point
//!
//! Runs as an Ansible binary module when invoked through a symlink named
//! after a module, otherwise as a regular command line tool.

use std::env;
use std::process;

use clap::Parser;
use colored::Colorize;
use tracing::info;

use plugtest::cli::{self, Cli, Commands};
use plugtest::errors::HarnessError;
use plugtest::modules::link::module_from_argv0;
use plugtest::modules::ModuleResult;

#[tokio::main]
async fn main() {
    let argv: Vec<String> = env::args().collect();

    // Ansible calls binary modules as `<module path> <args file>`
    if let Some(name) = argv.first().and_then(|arg0| module_from_argv0(arg0)) {
        let code = match argv.get(1) {
            Some(args_file) => cli::run_module(name, args_file.into(), None, false).await,
            None => {
                let error = HarnessError::InvalidArguments("missing arguments file".to_string());
                let result = ModuleResult::failed(name, &error);
                println!("{}", serde_json::to_string(&result).unwrap_or_default());
                result.exit_code()
            }
        };
        process::exit(code);
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Module { name, args_file } => {
            Ok(cli::run_module(name, args_file, cli.log_level, cli.json_logs).await)
        }
        Commands::Drive(args) => {
            cli::run_drive(args, cli.log_level, cli.json_logs, await_shutdown_signal()).await
        }
        Commands::LinkModules { dir } => cli::run_link_modules(dir).await,
        Commands::Version => cli::print_version(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let signals = (signal(SignalKind::terminate()), signal(SignalKind::interrupt()));
        let (mut sigterm, mut sigint) = match signals {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Ctrl+C received, cleaning up...");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, cleaning up...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, cleaning up...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, cleaning up...");
    }
}
