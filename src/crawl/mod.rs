//! Web crawling: fetch pages, clean them to text, index them concurrently.

pub mod cleaner;
pub mod crawler;
pub mod fetcher;

pub use cleaner::{CleanedPage, HtmlCleaner};
pub use crawler::{CrawlStats, WebCrawler};
pub use fetcher::{FetchConfig, FetchError, Fetcher, HtmlFetcher};
