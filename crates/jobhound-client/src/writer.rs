//! Result writers: local formats and chat deliveries.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use jobhound_core::error::AppError;
use jobhound_core::http::{HttpMethod, HttpRequest};
use jobhound_core::models::Job;
use jobhound_core::traits::{HttpTransport, ResultWriter};
use serde::Serialize;

const NO_JOBS: &str = "No jobs found.";
const TELEGRAM_API: &str = "https://api.telegram.org";
/// Telegram rejects messages over 4096 characters.
const TELEGRAM_CHUNK: usize = 3800;
/// Discord rejects messages over 2000 characters.
const DISCORD_CHUNK: usize = 1900;

fn io_error(e: std::io::Error) -> AppError {
    AppError::DeliveryError(e.to_string())
}

// ---------------------------------------------------------------------------
// Local formats
// ---------------------------------------------------------------------------

/// Aligned text table, one job per row.
pub struct ConsoleWriter<W> {
    out: Mutex<W>,
}

impl ConsoleWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> ResultWriter for ConsoleWriter<W> {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError> {
        let text = render_table(jobs);
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::DeliveryError("console writer poisoned".into()))?;
        out.write_all(text.as_bytes()).map_err(io_error)?;
        out.flush().map_err(io_error)
    }
}

fn render_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return format!("{NO_JOBS}\n");
    }

    let header = ["SOURCE", "TITLE", "COMPANY", "LOCATION", "URL"];
    let rule = ["------", "-----", "-------", "--------", "---"];
    let rows: Vec<[&str; 5]> = jobs
        .iter()
        .map(|j| [&*j.source, &*j.title, &*j.company, &*j.location, &*j.url])
        .collect();

    let mut widths = [0usize; 5];
    for row in std::iter::once(&header).chain(&rows) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut text = String::new();
    for row in [header, rule].iter().chain(&rows) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i + 1 == row.len() {
                line.push_str(cell);
            } else {
                let pad = widths[i] - cell.chars().count() + 2;
                line.push_str(cell);
                line.extend(std::iter::repeat_n(' ', pad));
            }
        }
        text.push_str(line.trim_end());
        text.push('\n');
    }
    text
}

#[derive(Serialize)]
struct CsvRow<'a> {
    source: &'a str,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    url: &'a str,
    job_type: &'a str,
    work_model: &'a str,
    level: &'a str,
    salary: &'a str,
    posted_at: Option<String>,
}

/// CSV with a header row.
pub struct CsvWriter<W> {
    out: Mutex<W>,
}

impl CsvWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> ResultWriter for CsvWriter<W> {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::DeliveryError("csv writer poisoned".into()))?;
        let mut csv = csv::Writer::from_writer(&mut *out);
        for job in jobs {
            csv.serialize(CsvRow {
                source: &job.source,
                title: &job.title,
                company: &job.company,
                location: &job.location,
                url: &job.url,
                job_type: &job.job_type,
                work_model: &job.work_model,
                level: &job.level,
                salary: &job.salary,
                posted_at: job.posted_at.map(|d| d.to_rfc3339()),
            })
            .map_err(|e| AppError::DeliveryError(format!("CSV write failed: {e}")))?;
        }
        csv.flush().map_err(io_error)
    }
}

/// Pretty-printed JSON array.
pub struct JsonWriter<W> {
    out: Mutex<W>,
}

impl JsonWriter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> ResultWriter for JsonWriter<W> {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError> {
        let text = serde_json::to_string_pretty(jobs)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::DeliveryError("json writer poisoned".into()))?;
        writeln!(out, "{text}").map_err(io_error)?;
        out.flush().map_err(io_error)
    }
}

// ---------------------------------------------------------------------------
// Chat deliveries
// ---------------------------------------------------------------------------

/// Split `header` followed by `entries` into messages of at most `limit`
/// bytes. A single entry larger than `limit` gets a message of its own.
fn chunk_messages(header: &str, entries: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = header.to_string();
    for entry in entries {
        if !current.is_empty() && current.len() + entry.len() > limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(entry);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Escape text for Telegram's MarkdownV2 parse mode.
fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        '\\',
    ];
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inside a MarkdownV2 link target only `)` and `\` need escaping.
fn escape_link_target(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

/// Posts results to a Telegram chat through the Bot API.
pub struct TelegramWriter<T> {
    transport: T,
    token: String,
    chat_id: String,
    api_base: String,
}

impl<T: HttpTransport> TelegramWriter<T> {
    pub fn new(transport: T, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            chat_id: chat_id.into(),
            api_base: TELEGRAM_API.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages(jobs: &[Job]) -> Vec<String> {
        if jobs.is_empty() {
            return vec![escape_markdown_v2(NO_JOBS)];
        }
        let header = format!("*Found {} job\\(s\\):*\n\n", jobs.len());
        let entries: Vec<String> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                let mut entry = format!("*{}\\. {}*\n", i + 1, escape_markdown_v2(&job.title));
                entry.push_str(&format!("Company: {}\n", escape_markdown_v2(&job.company)));
                entry.push_str(&format!("Location: {}\n", escape_markdown_v2(&job.location)));
                entry.push_str(&format!("Source: {}\n", escape_markdown_v2(&job.source)));
                if !job.url.is_empty() {
                    entry.push_str(&format!("[View job]({})\n", escape_link_target(&job.url)));
                }
                entry.push('\n');
                entry
            })
            .collect();
        chunk_messages(&header, &entries, TELEGRAM_CHUNK)
    }

    async fn send(&self, text: String) -> Result<(), AppError> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .with_header("content-type", "application/json")
            .with_body(payload.to_string());

        let response = self.transport.send(&request).await?;
        if response.status != 200 {
            let description = serde_json::from_str::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|v| v["description"].as_str().map(str::to_string))
                .unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "Telegram API error {}: {description}",
                response.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: HttpTransport> ResultWriter for TelegramWriter<T> {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError> {
        let messages = Self::messages(jobs);
        tracing::debug!(count = messages.len(), "Sending Telegram messages");
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }
}

/// Posts results to a Discord channel through a webhook.
pub struct DiscordWriter<T> {
    transport: T,
    webhook_url: String,
}

impl<T: HttpTransport> DiscordWriter<T> {
    pub fn new(transport: T, webhook_url: impl Into<String>) -> Self {
        Self {
            transport,
            webhook_url: webhook_url.into(),
        }
    }

    fn messages(jobs: &[Job]) -> Vec<String> {
        if jobs.is_empty() {
            return vec![NO_JOBS.to_string()];
        }
        let header = format!("**Found {} job(s):**\n\n", jobs.len());
        let entries: Vec<String> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                let mut entry = format!("**{}. {}**\n", i + 1, job.title);
                entry.push_str(&format!("> Company: {}\n", job.company));
                entry.push_str(&format!("> Location: {}\n", job.location));
                if !job.work_model.is_empty() {
                    entry.push_str(&format!("> Work model: {}\n", job.work_model));
                }
                if !job.job_type.is_empty() {
                    entry.push_str(&format!("> Type: {}\n", job.job_type));
                }
                if !job.url.is_empty() {
                    entry.push_str(&format!("> [View job]({})\n", job.url));
                }
                entry.push('\n');
                entry
            })
            .collect();
        chunk_messages(&header, &entries, DISCORD_CHUNK)
    }

    async fn send(&self, content: String) -> Result<(), AppError> {
        let payload = serde_json::json!({ "content": content });
        let request = HttpRequest::new(HttpMethod::Post, self.webhook_url.as_str())
            .with_header("content-type", "application/json")
            .with_body(payload.to_string());

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "Discord API error {}: {message}",
                response.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: HttpTransport> ResultWriter for DiscordWriter<T> {
    async fn write_jobs(&self, jobs: &[Job]) -> Result<(), AppError> {
        let messages = Self::messages(jobs);
        tracing::debug!(count = messages.len(), "Sending Discord messages");
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }
}
