use std::future::Future;

use futures::future::try_join_all;
use tracing::info;

use crate::client::GithubClient;
use crate::data_models::{SearchRequest, SearchResultItem, SearchType};
use crate::error::Result;
use crate::extractor;

/// Where search and repository pages come from.
pub trait PageSource {
    fn base_url(&self) -> &str;

    fn get_search_results_page(
        &self,
        query: &str,
        search_type: SearchType,
        proxy: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    fn get_repository_page(
        &self,
        repo_url: &str,
        proxy: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl PageSource for GithubClient {
    fn base_url(&self) -> &str {
        &self.config().base_url
    }

    async fn get_search_results_page(
        &self,
        query: &str,
        search_type: SearchType,
        proxy: &str,
    ) -> Result<String> {
        GithubClient::get_search_results_page(self, query, search_type, proxy).await
    }

    async fn get_repository_page(&self, repo_url: &str, proxy: &str) -> Result<String> {
        GithubClient::get_repository_page(self, repo_url, proxy).await
    }
}

/// Runs one search invocation end to end: validate, search every keyword,
/// enrich repository results, hand back the records in submission order.
///
/// Each fan-out joins on the first error. Sibling requests still pending at
/// that point are dropped and nothing partial is returned.
pub struct SearchManager<S = GithubClient> {
    source: S,
}

impl<S: PageSource> SearchManager<S> {
    pub fn new(source: S) -> SearchManager<S> {
        SearchManager { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run(&self, payload: &str) -> Result<Vec<SearchResultItem>> {
        info!("validating search payload");
        let request = SearchRequest::from_json(payload)?;
        self.run_request(&request).await
    }

    pub async fn run_request(&self, request: &SearchRequest) -> Result<Vec<SearchResultItem>> {
        let proxy = request.pick_proxy();
        info!(
            "searching {} keyword(s) for {} via {proxy}",
            request.keywords().len(),
            request.search_type()
        );

        let mut items = self
            .fill_with_base_info(request.keywords(), request.search_type(), proxy)
            .await?;

        if request.search_type().is_enriched() {
            info!("enriching {} repositories", items.len());
            self.extend_repos_with_detail(&mut items, proxy).await?;
        }

        info!("search finished with {} result(s)", items.len());
        Ok(items)
    }

    async fn fill_with_base_info(
        &self,
        keywords: &[String],
        search_type: SearchType,
        proxy: &str,
    ) -> Result<Vec<SearchResultItem>> {
        let pages = try_join_all(keywords.iter().map(|keyword| {
            self.source
                .get_search_results_page(keyword, search_type, proxy)
        }))
        .await?;

        let mut items = Vec::new();
        for page in pages {
            let urls = extractor::extract_result_urls(self.source.base_url(), &page)?;
            items.extend(urls.into_iter().map(SearchResultItem::new));
        }
        Ok(items)
    }

    async fn extend_repos_with_detail(
        &self,
        items: &mut [SearchResultItem],
        proxy: &str,
    ) -> Result<()> {
        let pages = try_join_all(
            items
                .iter()
                .map(|item| self.source.get_repository_page(&item.url, proxy)),
        )
        .await?;

        for (item, page) in items.iter_mut().zip(pages) {
            let detail = extractor::extract_repository_detail(&item.url, &page)?;
            item.extra = Some(detail);
        }
        Ok(())
    }
}
