use colored::Colorize;

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod report;

pub use analyzer::Analyzer;
pub use cache::{CacheError, NoopCache, PageCache, SqliteCache};
pub use config::{ConfigError, LogFormat, Settings};

pub fn print_banner() {
    let banner = r#"
  ┌─┐┌─┐┌─┐┌─┐┌─┐┌─┐┌─┐┌─┐┌─┐
  ├─┘├─┤│ ┬├┤ └─┐│  │ │├─┘├┤
  ┴  ┴ ┴└─┘└─┘└─┘└─┘└─┘┴  └─┘"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "single page markup and link health analyzer".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
