use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pagescope_core::config::{DEFAULT_CONFIG_DIR, LoggingSettings, environment, settings_path};
use pagescope_core::report::{ReportFormat, generate_report, save_report};
use pagescope_core::{Analyzer, LogFormat, NoopCache, PageCache, Settings, SqliteCache};
use pagescope_scanner::{ScanError, validate_url};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Longest URL accepted at the request boundary.
pub const MAX_URL_LENGTH: usize = 2048;

pub const CACHE_DB_NAME: &str = "cache.db";

// Helper functions for analyze handler

/// Reject empty, oversized or non-http(s) input before any analysis runs.
pub fn validate_request_url(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        bail!("URL must not be empty");
    }
    if raw.chars().count() > MAX_URL_LENGTH {
        bail!("URL is longer than {} characters", MAX_URL_LENGTH);
    }
    Ok(validate_url(raw)?)
}

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.clone()])
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow().bold(), line);
    None
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Console => builder.try_init(),
    };
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}

/// Logging settings of the config directory the chosen command points at. Unreadable
/// settings fall back to defaults here; the handler reports them.
pub fn logging_settings(matches: &ArgMatches) -> LoggingSettings {
    let config_dir = match matches.subcommand() {
        Some(("init", args)) => args.get_one::<String>("PATH").map(|raw| expand_dir(raw)),
        Some(("cache", args)) => args.subcommand().map(|(_, action)| config_dir_from(action)),
        Some((_, args)) => Some(config_dir_from(args)),
        None => None,
    };

    config_dir
        .and_then(|dir| Settings::load(&dir, &environment()).ok())
        .unwrap_or_default()
        .logging
}

/// Where `analyze -o` writes: a directory gets `pagescope-report.<ext>` for the chosen format.
pub fn report_path(requested: &Path, format: ReportFormat) -> PathBuf {
    if requested.is_dir() {
        requested.join(format!("pagescope-report.{}", format.extension()))
    } else {
        requested.to_path_buf()
    }
}

fn expand_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn config_dir_from(args: &ArgMatches) -> PathBuf {
    let raw = args
        .get_one::<String>("config-dir")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    expand_dir(raw)
}

/// Flags given on the `analyze` command line take precedence over every settings source.
pub fn apply_cli_overrides(mut settings: Settings, args: &ArgMatches) -> Settings {
    if let Some(workers) = args.get_one::<usize>("workers") {
        settings.analyzer.max_workers = *workers;
    }
    if let Some(max_links) = args.get_one::<usize>("max-links") {
        settings.analyzer.max_links = *max_links;
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        settings.analyzer.link_timeout_secs = *timeout;
    }
    if args.get_flag("no-cache") {
        settings.cache.enabled = false;
    }
    settings.normalized()
}

fn load_settings(args: &ArgMatches) -> Result<Settings> {
    let config_dir = config_dir_from(args);
    let env = environment();
    Settings::load(&config_dir, &env).with_context(|| {
        format!(
            "Failed to load settings from {}",
            settings_path(&config_dir, &env).display()
        )
    })
}

/// Settings written by `init`: defaults with the cache stored next to the settings file.
pub fn initial_settings(config_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.cache.path = config_dir.join(CACHE_DB_NAME).display().to_string();
    settings
}

/// Create `config_dir` and write the default settings for `env` into it.
pub fn write_initial_settings(config_dir: &Path, env: &str) -> Result<PathBuf> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let path = settings_path(config_dir, env);
    let json = initial_settings(config_dir).to_json()?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub async fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  PAGESCOPE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let raw_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = expand_dir(raw_dir);
    let env = environment();
    let settings_file = settings_path(&config_dir, &env);
    let db_path = config_dir.join(CACHE_DB_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if settings_file.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Settings already exist:");
        println!(
            "  {} {}",
            "•".yellow(),
            settings_file.display().to_string().bright_white()
        );
        println!();
        println!("{}", "This operation will overwrite existing files.".yellow());

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    println!("{} Writing settings...", "→".blue());
    let written = write_initial_settings(&config_dir, &env)?;
    println!(
        "  {} {}",
        "✓".green(),
        written.display().to_string().bright_white()
    );

    let db_existed = SqliteCache::exists(&db_path);
    let cache = SqliteCache::open(&db_path)
        .with_context(|| format!("Failed to create cache at {}", db_path.display()))?;

    if db_existed {
        let empty_it = force || {
            println!();
            let response = print_prompt("A cache database already exists. Empty it? [y/N]:")?;
            response == "y" || response == "yes"
        };
        if empty_it {
            let removed = cache.clear().await?;
            println!(
                "{} Removed {} cached analyses",
                "✓".green().bold(),
                removed.to_string().cyan()
            );
        } else {
            println!("{} Keeping existing cache", "→".blue());
        }
    }
    cache.close().await?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config directory: {}",
        "✓".green().bold(),
        config_dir.display().to_string().bright_white()
    );
    println!(
        "{} Settings ({}): {}",
        "✓".green().bold(),
        env,
        written.display().to_string().bright_white()
    );
    println!(
        "{} Cache: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

fn open_cache(settings: &Settings) -> Arc<dyn PageCache> {
    if !settings.cache.enabled {
        return Arc::new(NoopCache);
    }

    let path = settings.cache_path();
    match SqliteCache::open(&path) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache unavailable, continuing without it");
            Arc::new(NoopCache)
        }
    }
}

fn new_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Run `analyze`. Returns the process exit code: 0 when every URL was analyzed, 1 otherwise.
pub async fn handle_analyze(args: &ArgMatches) -> Result<i32> {
    let urls = load_urls_from_source(
        args.get_one::<String>("url"),
        args.get_one::<PathBuf>("hosts-file"),
    )?;
    let format: ReportFormat = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text")
        .parse()
        .map_err(anyhow::Error::msg)?;
    let output = args.get_one::<PathBuf>("output");
    let quiet = args.get_flag("quiet");

    let settings = apply_cli_overrides(load_settings(args)?, args);

    let cache = open_cache(&settings);
    let analyzer = Analyzer::from_settings(&settings, cache)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let spinner = new_spinner(quiet)?;
    let mut results = Vec::with_capacity(urls.len());
    let mut failures = 0usize;

    for url in &urls {
        if let Err(e) = validate_request_url(url) {
            spinner.println(format!("{} {}: {:#}", "✗".red().bold(), url, e));
            failures += 1;
            continue;
        }

        spinner.set_message(format!("Analyzing {}", url));
        match analyzer.analyze(url, &cancel).await {
            Ok(result) => results.push(result),
            Err(ScanError::Cancelled) => {
                spinner.println(format!("{} Analysis cancelled", "✗".red().bold()));
                failures += 1;
                break;
            }
            Err(e) => {
                spinner.println(format!("{} {}: {}", "✗".red().bold(), url, e));
                failures += 1;
            }
        }
    }

    spinner.finish_and_clear();
    ctrl_c.abort();
    analyzer.close().await;

    let report = generate_report(format, &results)?;
    match output {
        Some(requested) => {
            let path = report_path(requested, format);
            save_report(&report, &path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            if !quiet {
                println!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", report),
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

pub async fn handle_cache(args: &ArgMatches) -> Result<i32> {
    let (action, sub_args) = match args.subcommand() {
        Some((action @ ("clear" | "prune"), sub_args)) => (action, sub_args),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    let settings = load_settings(sub_args)?;
    let path = settings.cache_path();
    if !SqliteCache::exists(&path) {
        println!(
            "{} No cache database at {}",
            "→".blue(),
            path.display().to_string().bright_white()
        );
        return Ok(0);
    }

    let cache = SqliteCache::open(&path)
        .with_context(|| format!("Failed to open cache at {}", path.display()))?;
    let removed = if action == "clear" {
        cache.clear().await?
    } else {
        cache.prune().await?
    };
    let remaining = cache.entry_count().await?;
    cache.close().await?;

    println!(
        "{} Removed {} cached analyses ({} remaining)",
        "✓".green().bold(),
        removed.to_string().cyan(),
        remaining.to_string().cyan()
    );
    Ok(0)
}
