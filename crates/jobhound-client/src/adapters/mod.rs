//! Source adapters for the job sites Jobhound knows about.

mod gupy;
mod indeed;
mod linkedin;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jobhound_core::error::AppError;
use jobhound_core::guard::TransportGuard;
use jobhound_core::http::HttpRequest;
use jobhound_core::models::Job;
use jobhound_core::traits::{HttpTransport, SourceAdapter};
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;

pub use gupy::GupyAdapter;
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;

/// The sites an adapter exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Gupy,
    LinkedIn,
    Indeed,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Gupy, SourceKind::LinkedIn, SourceKind::Indeed];

    /// Sources queried when the user does not pick any.
    pub const DEFAULT: [SourceKind; 1] = [SourceKind::Gupy];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Gupy => "gupy",
            SourceKind::LinkedIn => "linkedin",
            SourceKind::Indeed => "indeed",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gupy" => Ok(SourceKind::Gupy),
            "linkedin" => Ok(SourceKind::LinkedIn),
            "indeed" => Ok(SourceKind::Indeed),
            other => Err(AppError::ConfigError(format!(
                "unknown source '{other}' (expected one of: gupy, linkedin, indeed)"
            ))),
        }
    }
}

/// Build the ordered adapter list for `sources`, all sharing `guard`.
///
/// Repeated kinds are kept once, at their first position.
pub fn registry<T>(guard: &TransportGuard<T>, sources: &[SourceKind]) -> Vec<Arc<dyn SourceAdapter>>
where
    T: HttpTransport + 'static,
{
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(sources.len());
    let mut seen = Vec::with_capacity(sources.len());
    for kind in sources {
        if seen.contains(kind) {
            continue;
        }
        seen.push(*kind);
        let adapter: Arc<dyn SourceAdapter> = match kind {
            SourceKind::Gupy => Arc::new(GupyAdapter::new(guard.clone())),
            SourceKind::LinkedIn => Arc::new(LinkedInAdapter::new(guard.clone())),
            SourceKind::Indeed => Arc::new(IndeedAdapter::new(guard.clone())),
        };
        adapters.push(adapter);
    }
    adapters
}

/// Execute through the guard and return the body of a 200 answer.
async fn fetch_ok<T: HttpTransport>(
    guard: &TransportGuard<T>,
    request: HttpRequest,
    cancel: &CancellationToken,
    source_name: &str,
) -> Result<String, AppError> {
    let response = guard.execute(request, cancel).await?;
    if response.status != 200 {
        return Err(AppError::UnexpectedStatus {
            source_name: source_name.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}

/// CSS selectors locating one listing card and its fields.
struct CardSelectors {
    card: &'static str,
    title: &'static str,
    company: &'static str,
    location: &'static str,
}

/// Extract jobs from a search results page. Cards without a title are skipped.
fn parse_cards(
    html: &str,
    selectors: &CardSelectors,
    source_name: &str,
) -> Result<Vec<Job>, AppError> {
    let card = selector(selectors.card, source_name)?;
    let title = selector(selectors.title, source_name)?;
    let company = selector(selectors.company, source_name)?;
    let location = selector(selectors.location, source_name)?;
    let link = selector("a[href]", source_name)?;

    let document = Html::parse_document(html);
    let jobs = document
        .select(&card)
        .filter_map(|el| {
            let title = first_text(el, &title);
            if title.is_empty() {
                return None;
            }
            Some(Job {
                title,
                company: first_text(el, &company),
                location: first_text(el, &location),
                url: el
                    .select(&link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                source: source_name.to_string(),
                ..Default::default()
            })
        })
        .collect();
    Ok(jobs)
}

fn selector(css: &str, source_name: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::parse(source_name, format!("invalid selector '{css}': {e}")))
}

/// Whitespace-collapsed text of the first match under `el`.
fn first_text(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel)
        .next()
        .map(|m| m.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
