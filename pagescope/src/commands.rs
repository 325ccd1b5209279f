use clap::{arg, command};
use pagescope_core::config::DEFAULT_CONFIG_DIR;
use std::path::PathBuf;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn config_dir_arg() -> clap::Arg {
    arg!(-c --"config-dir" <PATH>)
        .required(false)
        .help("Directory holding the <env>.json settings files")
        .default_value(DEFAULT_CONFIG_DIR)
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagescope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagescope")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Creates the pagescope configuration directory and cache database")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the pagescope configuration directory")
                        .default_value("~/.config/pagescope/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help(
                            "Overwrite existing settings and empty the cache without \
                        prompting.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("analyze")
                .about(
                    "Analyze a single webpage: markup version, title, headings, link health and \
                login form detection.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL of the page to analyze")
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to analyze")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to a file, or into a directory as pagescope-report.<ext> (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async link probe workers")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-links" <NUM>)
                        .required(false)
                        .help("Maximum number of links probed per page")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page fetch and external link timeout in seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"no-cache")
                        .required(false)
                        .help("Skip the result cache for this run")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(config_dir_arg()),
        )
        .subcommand(
            command!("cache")
                .about("Maintain the analysis result cache")
                .subcommand_required(true)
                .subcommand(
                    command!("clear")
                        .about("Remove every cached analysis")
                        .arg(config_dir_arg()),
                )
                .subcommand(
                    command!("prune")
                        .about("Remove expired cached analyses")
                        .arg(config_dir_arg()),
                ),
        )
}
