use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use sitewarden::handlers::{handle_init, handle_list, handle_run};
use sitewarden_core::{ReportRegistry, Settings, print_banner};
use std::path::PathBuf;
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .init();

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = dispatch(&chosen_command, quiet).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("list", _)) => {
            handle_list(&ReportRegistry::standard());
            Ok(())
        }
        Some(("run", primary_command)) => {
            let settings = match primary_command.get_one::<PathBuf>("config") {
                Some(config_path) => Settings::load_from(Some(config_path))?,
                None => Settings::load()?,
            };
            let registry = ReportRegistry::standard();
            handle_run(primary_command, &settings, &registry, quiet).await
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
