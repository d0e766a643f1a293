//! HTTP search backend (`GET {base_url}/api/books/search?keyword=...`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::SearchProvider;
use crate::core::SearchConfig;
use crate::model::BookData;

/// Search provider backed by the book search API.
pub struct HttpSearchProvider {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl HttpSearchProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results: 10,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(&config.base_url).with_max_results(config.max_results)
    }

    /// Cap the number of results returned per search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/api/books/search", self.base_url)
    }
}

/// The backend answers with a bare list; the scraper wraps it in `books`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<BookData>),
    Wrapped { books: Vec<BookData> },
}

impl SearchResponse {
    fn into_books(self) -> Vec<BookData> {
        match self {
            Self::List(books) | Self::Wrapped { books } => books,
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<BookData>> {
        let response =
            self.client.get(self.endpoint()).query(&[("keyword", keyword)]).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error ({}): {}", status, body);
        }

        let mut books = response.json::<SearchResponse>().await?.into_books();
        books.truncate(self.max_results);
        Ok(books)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let provider = HttpSearchProvider::new("http://localhost:8000/");
        assert_eq!(provider.endpoint(), "http://localhost:8000/api/books/search");
    }

    #[test]
    fn test_from_config() {
        let config = SearchConfig { max_results: 3, ..SearchConfig::default() };
        let provider = HttpSearchProvider::from_config(&config);
        assert_eq!(provider.max_results, 3);
        assert_eq!(provider.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_response_accepts_both_shapes() {
        let bare: SearchResponse = serde_json::from_str(r#"[{"title":"A"},{"title":"B"}]"#).unwrap();
        assert_eq!(bare.into_books().len(), 2);

        let wrapped: SearchResponse =
            serde_json::from_str(r#"{"books":[{"title":"A","rating":"4.1 out of 5 stars"}]}"#)
                .unwrap();
        let books = wrapped.into_books();
        assert_eq!(books[0].rating.as_deref(), Some("4.1 out of 5 stars"));
    }
}
