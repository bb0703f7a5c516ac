use crate::CLAP_STYLING;
use clap::{arg, command};
use sitewarden_core::config::DEFAULT_CONFIG_DIR;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitewarden")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitewarden")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every request and node visited").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Configuration file (default: ~/.config/sitewarden/config.toml)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a default sitewarden configuration to your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Configuration directory")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite an existing configuration without asking")
                        .required(false),
                ),
        )
        .subcommand(command!("list").about("Show the report dashboard"))
        .subcommand(
            command!("run")
                .about(
                    "Run a report over one or more sites. Without a NAME the dashboard is shown \
                and a report is picked interactively.",
                )
                .arg(arg!([NAME]).required(false).help("Report to run, e.g. 'lists'"))
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .action(clap::ArgAction::Append)
                        .help("Site URL, absolute or server-relative. May be repeated."),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of site URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-r --"recursive")
                        .required(false)
                        .help("Descend into every sub-site")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-s --"search" <TERM>)
                        .required(false)
                        .help("Search term (documents, users, permissions)"),
                )
                .arg(
                    arg!(--"older-than" <DAYS>)
                        .required(false)
                        .help("Only items not modified for this many days")
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(--"include-hidden")
                        .required(false)
                        .help("Include hidden lists")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(arg!(--"sort" <COLUMN>).required(false).help("Sort rows by column key or title"))
                .arg(
                    arg!(--"desc")
                        .required(false)
                        .help("Sort descending")
                        .requires("sort")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"filter" <TEXT>)
                        .required(false)
                        .help("Keep only rows containing this text"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown (default from config)")
                        .value_parser(["text", "json", "csv", "markdown", "md"]),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"act")
                        .required(false)
                        .help("Offer the report's remediation action for each row, one prompt per row")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
