//! Scrapes the site search for repositories, issues or wikis matching a set
//! of keywords, routed through caller-supplied proxies. Repository results
//! are enriched with the language breakdown from each repository page.

pub mod api;
pub mod client;
pub mod config;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod manager;

pub use client::{ClientConfig, GithubClient};
pub use data_models::{SearchRequest, SearchResultItem, SearchType};
pub use error::{Result, ScrapeError};
pub use manager::{PageSource, SearchManager};
