//! VSIX installer CLI entrypoint.
//!
//! This binary resolves a VS Code extension and its dependencies from the
//! Marketplace and installs them through the `code` command line.

use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;
use vsix_installer::artifact::VsixManifestReader;
use vsix_installer::cli::{Cli, Command, InstallArgs};
use vsix_installer::config::InstallerConfig;
use vsix_installer::dirs::{BaseDirs, SystemBaseDirs};
use vsix_installer::error::Result;
use vsix_installer::host::CodeCliHost;
use vsix_installer::output::{outcome_text, plan_text, write_stderr_line};
use vsix_installer::pipeline::{InstallContext, install_package, plan_package};
use vsix_installer::registry::MarketplaceClient;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.args());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(args: &InstallArgs) {
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let args = cli.args();
    let dirs = SystemBaseDirs::new();

    // Step 1: Layer defaults, config file, environment and flags
    let config = load_config(args, &dirs)?;
    let download_dir = config.resolve_download_dir(&dirs)?;

    // Step 2: Wire the Marketplace, manifest reader and editor together
    let registry = MarketplaceClient::new(&config.registry_url, config.timeout());
    let host = CodeCliHost::system(config.code_command.clone());
    let context = InstallContext {
        registry: &registry,
        manifests: &VsixManifestReader,
        host: &host,
        download_dir: &download_dir,
        follow_extension_packs: config.follow_extension_packs,
        install: config.install_settings(),
        quiet: args.quiet,
    };

    // Step 3: Resolve, then install or report
    match &cli.command {
        Command::Install(_) => {
            let outcome = install_package(&args.package, &context, stderr)?;
            if !args.quiet {
                write_stderr_line(stderr, "");
                write_stderr_line(stderr, outcome_text(&outcome));
            }
        }
        Command::Resolve(_) => {
            let plan = plan_package(&args.package, &context, stderr)?;
            write_stderr_line(stderr, "");
            write_stderr_line(stderr, plan_text(&plan));
        }
    }
    Ok(())
}

/// Builds the effective configuration for one invocation.
fn load_config(args: &InstallArgs, dirs: &dyn BaseDirs) -> Result<InstallerConfig> {
    let mut config = InstallerConfig::load(args.config.as_deref(), dirs)?;
    config.apply_env(|key| std::env::var(key).ok());
    args.apply_to(&mut config);
    config.validate()?;
    log_effective_config(&config, args.config.as_ref());
    Ok(config)
}

fn log_effective_config(config: &InstallerConfig, explicit: Option<&Utf8PathBuf>) {
    if let Some(path) = explicit {
        log::debug!("using config file {path}");
    }
    log::debug!(
        "registry {}, install order {}, code command {}",
        config.registry_url,
        config.install_order,
        config.code_command
    );
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
