//! CLI argument definitions for the VSIX installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::InstallerConfig;
use crate::worklist::InstallOrder;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

/// Install VS Code extensions together with their dependencies.
#[derive(Parser, Debug)]
#[command(name = "vsix-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install VS Code extensions together with their dependencies.\n\n",
    "The installer looks up the latest stable version of the requested ",
    "extension in the Marketplace, downloads it, reads the dependencies ",
    "declared in its manifest, and repeats for every dependency that is not ",
    "already installed. The downloaded packages are then installed through ",
    "the `code` command line, dependencies first.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install an extension and its dependencies:\n",
    "    $ vsix-installer install ms-python.python\n\n",
    "  Install from a Marketplace link:\n",
    "    $ vsix-installer install 'https://marketplace.visualstudio.com/items?itemName=ms-python.python'\n\n",
    "  Show what would be installed, without installing:\n",
    "    $ vsix-installer resolve ms-python.python\n\n",
    "  Install into VSCodium:\n",
    "    $ vsix-installer install --code-command codium ms-python.python\n\n",
    "CONFIGURATION:\n",
    "  Settings are read from config.toml in the per-user configuration\n",
    "  directory (or --config FILE). VSIX_INSTALLER_REGISTRY overrides the\n",
    "  registry URL. Command-line flags take precedence over both.",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve and install a package with its dependencies.
    Install(InstallArgs),

    /// Resolve a package and print the discovery and install order.
    Resolve(InstallArgs),
}

/// Arguments shared by the install and resolve commands.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Package identifier (`publisher.name`) or Marketplace item URL.
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Read settings from this file instead of the default location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory for downloaded packages [default: platform cache].
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<Utf8PathBuf>,

    /// Base URL of the extension registry.
    #[arg(long, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Command used to reach the editor [default: code].
    #[arg(long, value_name = "COMMAND")]
    pub code_command: Option<String>,

    /// How to order installs [default: topological].
    #[arg(long, value_enum, value_name = "ORDER")]
    pub install_order: Option<InstallOrder>,

    /// Treat extension pack members as dependencies.
    #[arg(long)]
    pub follow_extension_packs: bool,

    /// Keep downloaded packages after installing them.
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Per-request network timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Return the arguments of the selected subcommand.
    #[must_use]
    pub fn args(&self) -> &InstallArgs {
        match &self.command {
            Command::Install(args) | Command::Resolve(args) => args,
        }
    }
}

impl InstallArgs {
    /// Create arguments for `package` with every flag unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::cli::InstallArgs;
    ///
    /// let args = InstallArgs::new("pub.a");
    /// assert!(!args.keep_artifacts);
    /// assert!(args.registry_url.is_none());
    /// ```
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            config: None,
            download_dir: None,
            registry_url: None,
            code_command: None,
            install_order: None,
            follow_extension_packs: false,
            keep_artifacts: false,
            timeout: None,
            verbosity: 0,
            quiet: false,
        }
    }

    /// Overlay the flags given on the command line onto `config`.
    ///
    /// Boolean flags can only switch a setting on.
    pub fn apply_to(&self, config: &mut InstallerConfig) {
        if let Some(url) = &self.registry_url {
            config.registry_url.clone_from(url);
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir = Some(dir.clone());
        }
        if let Some(command) = &self.code_command {
            config.code_command.clone_from(command);
        }
        if let Some(order) = self.install_order {
            config.install_order = order;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        config.follow_extension_packs |= self.follow_extension_packs;
        config.keep_artifacts |= self.keep_artifacts;
    }

    /// Return the log level selected by `-v` and `-q`.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
