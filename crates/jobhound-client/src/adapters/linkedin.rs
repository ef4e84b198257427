use async_trait::async_trait;
use jobhound_core::error::AppError;
use jobhound_core::guard::TransportGuard;
use jobhound_core::http::HttpRequest;
use jobhound_core::models::Job;
use jobhound_core::traits::{HttpTransport, SourceAdapter};
use tokio_util::sync::CancellationToken;

use super::{CardSelectors, fetch_ok, parse_cards};

const NAME: &str = "LinkedIn";
const DEFAULT_BASE_URL: &str = "https://www.linkedin.com/jobs/search";

const SELECTORS: CardSelectors = CardSelectors {
    card: ".base-card",
    title: ".base-search-card__title",
    company: ".base-search-card__subtitle",
    location: ".job-search-card__location",
};

/// LinkedIn's public (logged-out) job search page.
pub struct LinkedInAdapter<T> {
    guard: TransportGuard<T>,
    base_url: String,
}

impl<T: HttpTransport> LinkedInAdapter<T> {
    pub fn new(guard: TransportGuard<T>) -> Self {
        Self {
            guard,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl<T: HttpTransport + 'static> SourceAdapter for LinkedInAdapter<T> {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        location: &str,
    ) -> Result<Vec<Job>, AppError> {
        let request = HttpRequest::get_with_query(
            &self.base_url,
            &[("keywords", query), ("location", location)],
        )?;
        let body = fetch_ok(&self.guard, request, cancel, NAME).await?;
        parse_cards(&body, &SELECTORS, NAME)
    }
}
