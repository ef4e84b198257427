use crate::models::Job;

/// User-supplied filter. Each dimension holds comma-separated alternative
/// terms; an empty dimension does not constrain anything.
///
/// A job matches when every non-empty dimension has at least one term
/// contained in [`Job::full_text`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FilterCriteria {
    /// e.g. `full-time,estagio`
    pub job_type: String,
    /// e.g. `remoto,hibrido`
    pub work_model: String,
    /// e.g. `pleno,senior`
    pub level: String,
    /// Free text matched against the whole listing, typically a city.
    pub region: String,
}

impl FilterCriteria {
    pub fn with_job_type(mut self, terms: impl Into<String>) -> Self {
        self.job_type = terms.into();
        self
    }

    pub fn with_work_model(mut self, terms: impl Into<String>) -> Self {
        self.work_model = terms.into();
        self
    }

    pub fn with_level(mut self, terms: impl Into<String>) -> Self {
        self.level = terms.into();
        self
    }

    pub fn with_region(mut self, terms: impl Into<String>) -> Self {
        self.region = terms.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions().iter().all(|d| d.trim().is_empty())
    }

    pub fn matches(&self, job: &Job) -> bool {
        let text = job.full_text();
        self.dimensions()
            .iter()
            .filter(|d| !d.trim().is_empty())
            .all(|terms| contains_any(&text, terms))
    }

    fn dimensions(&self) -> [&str; 4] {
        [&self.job_type, &self.work_model, &self.level, &self.region]
    }
}

/// Keep only the jobs matching `criteria`, preserving order.
pub fn apply(jobs: Vec<Job>, criteria: &FilterCriteria) -> Vec<Job> {
    if criteria.is_empty() {
        return jobs;
    }
    jobs.into_iter().filter(|j| criteria.matches(j)).collect()
}

/// True if `text` (already lowercased) contains any of the comma-separated terms.
fn contains_any(text: &str, terms: &str) -> bool {
    terms
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .any(|t| !t.is_empty() && text.contains(&t))
}
