//! Competitor book search.
//!
//! The research pipeline depends only on [`SearchProvider`]: given a keyword,
//! return at most N ranked [`BookData`] results, or an empty list when
//! nothing matches.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpSearchProvider;

use async_trait::async_trait;

use crate::model::BookData;

/// Trait for book search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for books matching `keyword`.
    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<BookData>>;

    /// Get the provider name.
    fn name(&self) -> &str;
}

/// Search backend used when none is configured; every search fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn search(&self, _keyword: &str) -> anyhow::Result<Vec<BookData>> {
        anyhow::bail!("No search backend configured")
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_search_always_fails() {
        let result = tokio_test::block_on(NoSearch.search("dragons"));
        let err = tokio_test::assert_err!(result);
        assert!(err.to_string().contains("No search backend"));
        assert_eq!(NoSearch.name(), "none");
    }
}
