use anyhow::Result;
use cfa_tools::config::FrameworkConfig;
use cfa_tools::framework::{initialize_plugin, uninitialize_plugin};
use cfa_tools::host::memory::MemoryHost;
use cfa_tools::menu::builder::manager_text;
use cfa_tools::plugins::{builtin, PluginDescriptor, PluginRegistry};
use cfa_tools::sanitizer::Sanitizer;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cfa-tools")]
#[command(version, about = "Preview the CFA Tools menu framework outside the host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Plugins directory (overrides config)
    #[arg(short, long)]
    plugins_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the menu tree the framework would build
    Menu,
    /// Summarize loaded plugins
    Plugins {
        #[arg(long)]
        json: bool,
    },
    /// Load every candidate plugin and report failures
    Validate,
    /// Print the active sanitizer signature list
    Signatures,
}

#[derive(Serialize)]
struct PluginSummary<'a> {
    id: &'a str,
    #[serde(flatten)]
    descriptor: &'a PluginDescriptor,
    commands: Vec<&'a str>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => FrameworkConfig::load_from(path)?,
        None => FrameworkConfig::load()?,
    };
    if let Some(dir) = cli.plugins_dir {
        config.plugins_dir = Some(dir);
    }

    match cli.command {
        Commands::Menu => {
            let mut host = MemoryHost::new();
            let framework = initialize_plugin(&mut host, config, builtin::catalog());
            match host.render(&framework.config().menu_name) {
                Some(tree) => print!("{}", tree),
                None => log::warn!("No menu was created"),
            }
            uninitialize_plugin(&mut host, framework);
        }
        Commands::Plugins { json } => {
            let mut registry = PluginRegistry::from_config(&config, builtin::catalog());
            registry.load_all();
            if json {
                let summaries: Vec<PluginSummary> = registry
                    .iter()
                    .map(|p| PluginSummary {
                        id: &p.id,
                        descriptor: &p.descriptor,
                        commands: p.commands.iter().map(|c| c.label.as_str()).collect(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                let title = format!("{} Plugin Manager", config.menu_label);
                print!("{}", manager_text(&title, registry.iter()));
            }
        }
        Commands::Validate => {
            let mut registry = PluginRegistry::from_config(&config, builtin::catalog());
            match registry.plugins_dir() {
                Some(dir) => println!("Plugins directory: {}", dir.display()),
                None => println!("Plugins directory: none"),
            }
            let report = registry.load_all();
            for id in &report.loaded {
                println!("OK      {}", id);
            }
            for error in &report.failed {
                println!("FAILED  {}: {}", error.id(), error);
            }
            println!(
                "{} of {} plugin(s) loaded",
                report.loaded.len(),
                report.loaded.len() + report.failed.len()
            );
            if !report.failed.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Signatures => {
            let sanitizer = Sanitizer::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(sanitizer.signatures())?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
