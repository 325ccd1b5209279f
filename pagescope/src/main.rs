use colored::Colorize;
use pagescope::command_argument_builder;
use pagescope::handlers::{
    handle_analyze, handle_cache, handle_init, init_tracing, logging_settings,
};
use pagescope_core::print_banner;

#[tokio::main]
async fn main() {
    let chosen_command = command_argument_builder().get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_some() {
        init_tracing(&logging_settings(&chosen_command));
    }

    let outcome = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command).await.map(|_| 0),
        Some(("analyze", primary_command)) => handle_analyze(primary_command).await,
        Some(("cache", primary_command)) => handle_cache(primary_command).await,
        // No subcommand provided, just show the banner
        None => return,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(2);
        }
    }
}
