pub mod client;
pub mod doctype;
pub mod error;
pub mod links;
pub mod login;
pub mod page;
pub mod prober;
pub mod result;
pub mod structure;
pub mod validate;

pub use client::{HttpClient, ReqwestClient};
pub use error::ScanError;
pub use page::PageSnapshot;
pub use login::DEFAULT_LOGIN_THRESHOLD;
pub use prober::{
    DEFAULT_INTERNAL_LINK_TIMEOUT, DEFAULT_LINK_TIMEOUT, DEFAULT_MAX_LINKS, DEFAULT_WORKERS, Prober,
};
pub use result::{AnalysisResult, HeadingCounts, HtmlVersion, LinkStats};
pub use validate::validate_url;
