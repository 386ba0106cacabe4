//! Command line interface

use std::future::Future;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use uuid::Uuid;

use crate::driver::{self, CommandZoneBundle, DriveOptions, DriveOutcome};
use crate::host::local::LocalHost;
use crate::logs::{init_logging, LogLevel, LogOptions};
use crate::modules::{self, link, ModuleName};
use crate::settings::Settings;
use crate::utils::version_info;

#[derive(Parser)]
#[command(name = "plugtest", version, about = "Build and test iRODS plugins on provisioned hosts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level, overridden by PLUGTEST_LOG or RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one module on this host, reading its arguments from a JSON file
    Module {
        /// Module name, e.g. irods_test_auth_kerberos
        name: ModuleName,
        /// JSON arguments file
        args_file: PathBuf,
    },

    /// Deploy a zone, run one module on its iCAT server, gather logs and tear down
    Drive(DriveArgs),

    /// Create one symlink per module name pointing at this binary
    LinkModules {
        /// Directory passed to ansible with -M
        dir: PathBuf,
    },

    /// Print version information as JSON
    Version,
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    #[arg(long, alias = "zone_bundle_input")]
    pub zone_bundle_input: PathBuf,

    /// Defaults to a generated name
    #[arg(long, alias = "deployment_name")]
    pub deployment_name: Option<String>,

    #[arg(long, alias = "irods_core_packages_root_directory")]
    pub irods_core_packages_root_directory: PathBuf,

    #[arg(long, alias = "plugin_package_root_directory")]
    pub plugin_package_root_directory: PathBuf,

    #[arg(long, alias = "plugin_package_prefix")]
    pub plugin_package_prefix: String,

    #[arg(long, alias = "ansible_module_to_run")]
    pub ansible_module_to_run: String,

    #[arg(long, alias = "python_test_module_to_run")]
    pub python_test_module_to_run: String,

    #[arg(long, alias = "output_directory")]
    pub output_directory: PathBuf,

    /// Driver settings (JSON)
    #[arg(long, env = "PLUGTEST_SETTINGS")]
    pub settings: Option<PathBuf>,
}

/// Module mode; the result JSON is the only thing written to stdout
pub async fn run_module(
    name: ModuleName,
    args_file: PathBuf,
    log_level: Option<LogLevel>,
    json_logs: bool,
) -> i32 {
    let options = LogOptions {
        log_level: log_level.unwrap_or_default(),
        json_format: json_logs,
        ..Default::default()
    };
    if let Err(e) = init_logging(options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let host = LocalHost::new();
    let result = modules::run_from_file(&host, name, &args_file).await;
    match serde_json::to_string(&result) {
        Ok(line) => println!("{}", line),
        Err(e) => {
            println!(
                r#"{{"failed": true, "changed": false, "msg": "unserializable result: {}"}}"#,
                e
            );
            return 1;
        }
    }
    result.exit_code()
}

/// `plugtest drive`
pub async fn run_drive<F>(
    args: DriveArgs,
    log_level: Option<LogLevel>,
    json_logs: bool,
    shutdown: F,
) -> anyhow::Result<i32>
where
    F: Future<Output = ()> + Send,
{
    let settings = Settings::load(args.settings.as_deref())
        .await
        .context("Failed to read driver settings")?;

    let _guard = init_logging(LogOptions {
        log_level: log_level.unwrap_or_else(|| settings.log_level.clone()),
        stderr: true,
        log_dir: Some(args.output_directory.clone()),
        json_format: json_logs || settings.json_logs,
    })
    .context("Failed to initialize logging")?;

    let modules_dir = settings
        .ansible
        .modules_dir
        .clone()
        .unwrap_or_else(|| driver::default_modules_dir(&args.output_directory));
    let executable = std::env::current_exe().context("Cannot locate the running binary")?;
    link::link_modules(&modules_dir, &executable)
        .await
        .context("Failed to link modules")?;

    let options = DriveOptions {
        zone_bundle_input: args.zone_bundle_input,
        deployment_name: args
            .deployment_name
            .unwrap_or_else(|| format!("plugtest-{}", Uuid::new_v4())),
        irods_core_packages_root_directory: args.irods_core_packages_root_directory,
        plugin_package_root_directory: args.plugin_package_root_directory,
        plugin_package_prefix: args.plugin_package_prefix,
        ansible_module_to_run: args.ansible_module_to_run,
        python_test_module_to_run: args.python_test_module_to_run,
        output_directory: args.output_directory,
        version_key: settings.zone_bundle.version_key.clone(),
    };

    let host = LocalHost::new();
    let bundle = CommandZoneBundle::new(
        &host,
        settings.zone_bundle.clone(),
        settings.ansible.clone(),
        modules_dir,
    );

    let started = Utc::now();
    info!("Starting deployment {}", options.deployment_name);
    let outcome = driver::drive(&host, &bundle, &options, shutdown)
        .await
        .context("Deployment failed")?;

    print_summary(&options, &outcome, (Utc::now() - started).num_seconds());
    Ok(outcome.exit_code())
}

fn status(result: &Result<(), crate::errors::HarnessError>) -> String {
    match result {
        Ok(()) => "ok".green().to_string(),
        Err(e) => format!("{} ({})", "failed".red(), e),
    }
}

fn print_summary(options: &DriveOptions, outcome: &DriveOutcome, seconds: i64) {
    let verdict = if outcome.is_success() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "{} {} / {} in {}s",
        verdict,
        options.ansible_module_to_run.bold(),
        options.python_test_module_to_run,
        seconds
    );
    println!("  task:    {}", status(&outcome.task));
    println!("  gather:  {}", status(&outcome.gather));
    println!("  destroy: {}", status(&outcome.destroy));
    println!("  output:  {}", options.output_directory.display());
}

/// `plugtest link-modules`
pub async fn run_link_modules(dir: PathBuf) -> anyhow::Result<i32> {
    let executable = std::env::current_exe().context("Cannot locate the running binary")?;
    let links = link::link_modules(&dir, &executable).await?;
    for link in links {
        println!("{}", link.display());
    }
    Ok(0)
}

/// `plugtest version`
pub fn print_version() -> anyhow::Result<i32> {
    println!("{}", serde_json::to_string_pretty(&version_info())?);
    Ok(0)
}
