use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobhound_core::error::AppError;
use jobhound_core::guard::TransportGuard;
use jobhound_core::http::HttpRequest;
use jobhound_core::models::Job;
use jobhound_core::traits::{HttpTransport, SourceAdapter};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::fetch_ok;

const NAME: &str = "Gupy";
const DEFAULT_BASE_URL: &str = "https://employability-portal.gupy.io/api/v1/jobs";
const PAGE_SIZE: &str = "20";

/// Gupy's public job portal API (JSON).
///
/// The API has no location parameter, so location filtering happens here.
pub struct GupyAdapter<T> {
    guard: TransportGuard<T>,
    base_url: String,
}

impl<T: HttpTransport> GupyAdapter<T> {
    pub fn new(guard: TransportGuard<T>) -> Self {
        Self {
            guard,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at another endpoint, e.g. a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl<T: HttpTransport + 'static> SourceAdapter for GupyAdapter<T> {
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
            &[("jobName", query), ("limit", PAGE_SIZE), ("offset", "0")],
        )?
        .with_header("accept", "application/json");

        let body = fetch_ok(&self.guard, request, cancel, NAME).await?;
        let jobs = parse(&body, location)?;
        tracing::debug!(source = NAME, count = jobs.len(), "Parsed listings");
        Ok(jobs)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Listing>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Listing {
    name: Option<String>,
    career_page_name: Option<String>,
    job_url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    workplace_type: Option<String>,
    is_remote_work: Option<bool>,
    published_date: Option<String>,
    description: Option<String>,
}

/// Decode a search response, keeping listings whose location contains
/// `location` (case-insensitive). An empty `location` keeps everything.
fn parse(body: &str, location: &str) -> Result<Vec<Job>, AppError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| AppError::parse(NAME, e.to_string()))?;
    let wanted = location.trim().to_lowercase();

    let jobs = response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(to_job)
        .filter(|job| wanted.is_empty() || job.location.to_lowercase().contains(&wanted))
        .collect();
    Ok(jobs)
}

fn to_job(listing: Listing) -> Job {
    let location = [&listing.city, &listing.state, &listing.country]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .collect::<Vec<_>>()
        .join(", ");

    Job {
        title: listing.name.unwrap_or_default(),
        company: listing.career_page_name.unwrap_or_default(),
        location,
        url: listing.job_url.unwrap_or_default(),
        description: listing.description.unwrap_or_default(),
        source: NAME.to_string(),
        posted_at: listing.published_date.as_deref().and_then(parse_date),
        job_type: job_type(listing.kind.as_deref().unwrap_or_default()).to_string(),
        work_model: work_model(
            listing.workplace_type.as_deref().unwrap_or_default(),
            listing.is_remote_work.unwrap_or(false),
        )
        .to_string(),
        ..Default::default()
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn work_model(workplace_type: &str, is_remote: bool) -> &'static str {
    match workplace_type.to_ascii_lowercase().as_str() {
        "remote" => "remoto",
        "hybrid" => "hibrido",
        "on-site" => "presencial",
        _ if is_remote => "remoto",
        _ => "",
    }
}

fn job_type(kind: &str) -> &'static str {
    match kind {
        "vacancy_type_effective" => "full-time",
        "vacancy_type_internship" => "estagio",
        "vacancy_type_temporary" => "part-time",
        "vacancy_type_freelance" => "freelance",
        _ => "",
    }
}
