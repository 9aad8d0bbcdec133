use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::ValidationError;

/// The kind of result the site search is asked for. The variant name is also
/// the literal value of the `type` query parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    Repositories,
    Wikis,
    Issues,
}

impl SearchType {
    pub const ALL: [SearchType; 3] = [
        SearchType::Repositories,
        SearchType::Wikis,
        SearchType::Issues,
    ];

    pub fn as_query_value(&self) -> &'static str {
        match self {
            SearchType::Repositories => "Repositories",
            SearchType::Wikis => "Wikis",
            SearchType::Issues => "Issues",
        }
    }

    /// Only repository results get a detail page fetched for them.
    pub fn is_enriched(&self) -> bool {
        matches!(self, SearchType::Repositories)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchType::ALL
            .into_iter()
            .find(|t| t.as_query_value() == s)
            .ok_or_else(|| {
                format!("must be one of Repositories, Wikis, Issues (got {s:?})")
            })
    }
}

/// The payload as it arrives, before any checks. Fields stay raw JSON so that
/// a missing or mistyped field becomes a violation on that field rather than
/// a parse failure for the whole payload.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct SearchRequestPayload {
    pub keywords: Option<Value>,
    pub proxies: Option<Value>,
    #[serde(rename = "type")]
    pub search_type: Option<Value>,
}

impl SearchRequestPayload {
    pub fn validate(self) -> Result<SearchRequest, ValidationError> {
        let mut errors = ValidationError::default();

        let keywords = non_empty_list("keywords", self.keywords, &mut errors);
        let proxies = non_empty_list("proxies", self.proxies, &mut errors);
        let search_type = match self.search_type {
            None => {
                errors.push("type", "field required");
                None
            }
            Some(Value::String(raw)) => match raw.parse::<SearchType>() {
                Ok(t) => Some(t),
                Err(message) => {
                    errors.push("type", message);
                    None
                }
            },
            Some(other) => {
                errors.push("type", format!("must be a string (got {other})"));
                None
            }
        };

        match (keywords, proxies, search_type) {
            (Some(keywords), Some(proxies), Some(search_type)) if errors.is_empty() => {
                Ok(SearchRequest {
                    keywords,
                    proxies,
                    search_type,
                })
            }
            _ => Err(errors),
        }
    }
}

fn non_empty_list(
    field: &str,
    value: Option<Value>,
    errors: &mut ValidationError,
) -> Option<Vec<String>> {
    let items = match value {
        None => {
            errors.push(field, "field required");
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.push(field, format!("must be a list of strings (got {other})"));
            return None;
        }
    };

    if items.is_empty() {
        errors.push(field, "must contain at least one item");
        return None;
    }

    let mut list = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => list.push(s),
            other => {
                errors.push(field, format!("must be a list of strings (got item {other})"));
                return None;
            }
        }
    }
    Some(list)
}

/// A validated search request. Both lists are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    keywords: Vec<String>,
    proxies: Vec<String>,
    search_type: SearchType,
}

impl SearchRequest {
    pub fn from_json(payload: &str) -> Result<SearchRequest, ValidationError> {
        // anything but a JSON object is rejected as a whole
        let raw: SearchRequestPayload = serde_json::from_str(payload).map_err(|e| {
            let mut errors = ValidationError::default();
            errors.push("payload", e.to_string());
            errors
        })?;
        raw.validate()
    }

    pub fn new(
        keywords: Vec<String>,
        proxies: Vec<String>,
        search_type: SearchType,
    ) -> Result<SearchRequest, ValidationError> {
        SearchRequestPayload {
            keywords: Some(Value::from(keywords)),
            proxies: Some(Value::from(proxies)),
            search_type: Some(Value::from(search_type.as_query_value())),
        }
        .validate()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// Picks the proxy used for every request of one invocation.
    pub fn pick_proxy(&self) -> &str {
        &self.proxies[fastrand::usize(..self.proxies.len())]
    }
}

/// Language name to percentage, kept in the order the page lists them. A
/// repeated name overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageStats {
    entries: Vec<(String, f64)>,
}

impl LanguageStats {
    pub fn new() -> LanguageStats {
        LanguageStats::default()
    }

    pub fn insert(&mut self, language: String, percentage: f64) {
        match self.entries.iter_mut().find(|(name, _)| *name == language) {
            Some(entry) => entry.1 = percentage,
            None => self.entries.push((language, percentage)),
        }
    }

    pub fn get(&self, language: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, pct)| *pct)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, pct)| (name.as_str(), *pct))
    }
}

impl Serialize for LanguageStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, pct) in &self.entries {
            map.serialize_entry(name, pct)?;
        }
        map.end()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RepositoryDetail {
    pub owner: String,
    pub language_stats: LanguageStats,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchResultItem {
    pub url: String,

    // absent from the record until enrichment sets it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<RepositoryDetail>,
}

impl SearchResultItem {
    pub fn new(url: String) -> SearchResultItem {
        SearchResultItem { url, extra: None }
    }
}
