use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// A single job listing produced by a source adapter.
///
/// Tags (`job_type`, `work_model`, `level`) are free-form strings as
/// normalised by each adapter, e.g. `full-time`, `remoto`, `senior`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    /// Name of the adapter that produced this listing.
    pub source: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub job_type: String,
    pub work_model: String,
    pub level: String,
    /// Free text, e.g. "R$ 5.000 - R$ 8.000".
    pub salary: String,
}

impl Job {
    /// All searchable text fields joined by spaces, lowercased.
    pub fn full_text(&self) -> String {
        [
            self.title.as_str(),
            &self.description,
            &self.job_type,
            &self.work_model,
            &self.level,
            &self.location,
            &self.salary,
        ]
        .join(" ")
        .to_lowercase()
    }

    /// Deduplication key: lowercased URL, or `title|company` when the URL is empty.
    pub fn fingerprint(&self) -> String {
        if self.url.is_empty() {
            format!("{}|{}", self.title, self.company).to_lowercase()
        } else {
            self.url.to_lowercase()
        }
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, company: &str, url: &str) -> Job {
        Job {
            title: title.into(),
            company: company.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_prefers_url() {
        let a = job("Eng", "Acme", "https://X.test/1");
        let b = job("Engineer", "Other", "https://x.test/1");
        assert_eq!(a.fingerprint(), "https://x.test/1");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_falls_back_to_title_company() {
        let a = job("Rust Dev", "ACME", "");
        assert_eq!(a.fingerprint(), "rust dev|acme");
        assert_ne!(a.fingerprint(), job("Rust Dev", "Globex", "").fingerprint());
    }

    #[test]
    fn test_full_text_covers_searchable_fields() {
        let j = Job {
            title: "Backend".into(),
            description: "Tokio".into(),
            job_type: "Full-Time".into(),
            work_model: "Remoto".into(),
            level: "Senior".into(),
            location: "São Paulo".into(),
            salary: "R$ 10k".into(),
            company: "NotSearched".into(),
            ..Default::default()
        };
        let text = j.full_text();
        for needle in ["backend", "tokio", "full-time", "remoto", "senior", "são paulo", "r$ 10k"] {
            assert!(text.contains(needle), "missing {needle} in {text}");
        }
        assert!(!text.contains("notsearched"));
    }

    #[test]
    fn test_compute_hash_consistency() {
        let h1 = compute_hash("hello world");
        let h2 = compute_hash("hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, compute_hash("hello"));
    }
}
