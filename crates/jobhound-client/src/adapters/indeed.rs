use async_trait::async_trait;
use jobhound_core::error::AppError;
use jobhound_core::guard::TransportGuard;
use jobhound_core::http::HttpRequest;
use jobhound_core::models::Job;
use jobhound_core::traits::{HttpTransport, SourceAdapter};
use tokio_util::sync::CancellationToken;

use super::{CardSelectors, fetch_ok, parse_cards};

const NAME: &str = "Indeed";
const DEFAULT_BASE_URL: &str = "https://www.indeed.com/jobs";
const SITE_ROOT: &str = "https://www.indeed.com";

const SELECTORS: CardSelectors = CardSelectors {
    card: ".job_seen_beacon",
    title: ".jobTitle span",
    company: ".companyName",
    location: ".companyLocation",
};

/// Indeed's HTML search results.
pub struct IndeedAdapter<T> {
    guard: TransportGuard<T>,
    base_url: String,
}

impl<T: HttpTransport> IndeedAdapter<T> {
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
impl<T: HttpTransport + 'static> SourceAdapter for IndeedAdapter<T> {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        location: &str,
    ) -> Result<Vec<Job>, AppError> {
        let request =
            HttpRequest::get_with_query(&self.base_url, &[("q", query), ("l", location)])?;
        let body = fetch_ok(&self.guard, request, cancel, NAME).await?;

        let mut jobs = parse_cards(&body, &SELECTORS, NAME)?;
        for job in &mut jobs {
            job.url = absolute_url(&job.url);
        }
        Ok(jobs)
    }
}

/// Result links are site-relative (`/rc/clk?jk=...`).
fn absolute_url(href: &str) -> String {
    if href.is_empty() || href.starts_with("http") {
        href.to_string()
    } else {
        format!("{SITE_ROOT}{href}")
    }
}
