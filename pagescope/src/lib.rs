pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    load_urls_from_file, load_urls_from_source, parse_url_line, validate_request_url,
};
