//! Pulls result links and language breakdowns out of fetched pages.
//!
//! The selectors below are tied to the site's current markup. When they stop
//! matching, search pages fail loudly with [`ScrapeError::InvalidHtml`].

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::data_models::{LanguageStats, RepositoryDetail};
use crate::error::{Result, ScrapeError};

static RESULTS_LIST: Lazy<Selector> = Lazy::new(|| selector(r#"div[data-testid="results-list"]"#));
static RESULT_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"div[class*="search-title"]"#));
static SIDEBAR_SECTION: Lazy<Selector> = Lazy::new(|| selector("div.Layout-sidebar div"));
static LANGUAGE_ENTRY: Lazy<Selector> = Lazy::new(|| selector("ul > li > a"));

fn selector(css: &str) -> Selector {
    // only called with the literals above
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css}: {e}"))
}

fn child_elements<'a>(element: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Absolute URLs of every result title on a search page, in document order.
pub fn extract_result_urls(base_url: &str, html: &str) -> Result<Vec<String>> {
    let base = Url::parse(base_url).map_err(|source| ScrapeError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;
    let document = Html::parse_document(html);

    let results_list = document
        .select(&RESULTS_LIST)
        .next()
        .ok_or_else(|| ScrapeError::InvalidHtml("results list not found".to_string()))?;

    let mut urls = Vec::new();
    for title in results_list.select(&RESULT_TITLE) {
        let href = child_elements(title, "a")
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| {
                ScrapeError::InvalidHtml("result title without a link".to_string())
            })?;
        let resolved = base.join(href).map_err(|source| ScrapeError::InvalidUrl {
            url: href.to_string(),
            source,
        })?;
        urls.push(resolved.to_string());
    }

    if urls.is_empty() {
        return Err(ScrapeError::InvalidHtml("items section not found".to_string()));
    }
    Ok(urls)
}

/// Language name and percentage pairs from a repository page sidebar. A page
/// without a "Languages" section yields empty stats.
pub fn extract_language_stats(html: &str) -> Result<LanguageStats> {
    let document = Html::parse_document(html);
    let mut stats = LanguageStats::new();

    let sections = document.select(&SIDEBAR_SECTION).filter(|section| {
        child_elements(*section, "h2").any(|h2| text_of(h2) == "Languages")
    });

    for section in sections {
        for ul in child_elements(section, "ul") {
            for entry in ul.select(&LANGUAGE_ENTRY) {
                let mut spans = child_elements(entry, "span").map(text_of);
                let (Some(language), Some(percent)) = (spans.next(), spans.next()) else {
                    return Err(ScrapeError::InvalidHtml(
                        "language entry without name and percentage".to_string(),
                    ));
                };
                let percentage = parse_percentage(&percent)?;
                stats.insert(language, percentage);
            }
        }
    }

    Ok(stats)
}

/// `"97.2%"` becomes `97.2`.
pub fn parse_percentage(raw: &str) -> Result<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|pct| pct.is_finite())
        .ok_or_else(|| ScrapeError::InvalidHtml(format!("unparseable percentage {raw:?}")))
}

/// Second-to-last path segment of a repository URL.
pub fn repository_owner(url: &str) -> String {
    url.rsplit('/').nth(1).unwrap_or_default().to_string()
}

pub fn extract_repository_detail(url: &str, html: &str) -> Result<RepositoryDetail> {
    Ok(RepositoryDetail {
        owner: repository_owner(url),
        language_stats: extract_language_stats(html)?,
    })
}
