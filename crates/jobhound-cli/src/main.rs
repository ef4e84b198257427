use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use jobhound_client::{
    ConsoleWriter, CsvWriter, DiscordWriter, JsonWriter, RedisStore, ReqwestTransport, SourceKind,
    TelegramWriter, TransportOptions, registry,
};
use jobhound_core::aggregate::{AggregateConfig, Aggregator};
use jobhound_core::cache::ResultCache;
use jobhound_core::filter::{self, FilterCriteria};
use jobhound_core::guard::{GuardConfig, RetryPolicy, TransportGuard};
use jobhound_core::memory_store::MemoryStore;
use jobhound_core::traits::{KeyValueStore, NullStore, ResultWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "jobhound",
    version,
    about = "Search several job sites at once, politely"
)]
struct Cli {
    /// Search terms, e.g. "rust developer"
    #[arg(short, long, env = "JOBHOUND_QUERY", value_parser = non_empty)]
    query: String,

    /// Location to narrow the search to
    #[arg(short, long, env = "JOBHOUND_LOCATION", default_value = "")]
    location: String,

    /// Sources to query (repeatable or comma-separated: gupy, linkedin, indeed)
    #[arg(long = "source", env = "JOBHOUND_SOURCES", value_delimiter = ',')]
    sources: Vec<SourceKind>,

    /// Overall deadline for the search (e.g. 30s, 2m)
    #[arg(long, env = "JOBHOUND_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    timeout: Duration,

    /// Minimum spacing between requests to the same host
    #[arg(long, env = "JOBHOUND_MIN_DELAY", default_value = "2s", value_parser = parse_duration)]
    min_delay: Duration,

    /// Maximum spacing between requests to the same host
    #[arg(long, env = "JOBHOUND_MAX_DELAY", default_value = "5s", value_parser = parse_duration)]
    max_delay: Duration,

    /// Attempts per request when a site answers 429/503
    #[arg(long, env = "JOBHOUND_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// HTTP or SOCKS5 proxy for all source requests
    #[arg(long, env = "PROXY_URL")]
    proxy: Option<String>,

    /// Cache results in Redis
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Cache results in process memory; takes precedence over Redis
    #[arg(long, default_value_t = false)]
    memory_cache: bool,

    /// How long cached results stay valid
    #[arg(long, env = "JOBHOUND_CACHE_TTL", default_value = "1h", value_parser = parse_duration)]
    cache_ttl: Duration,

    /// Job types to keep, comma-separated (e.g. full-time,estagio)
    #[arg(long, env = "JOBHOUND_JOB_TYPE", default_value = "")]
    job_type: String,

    /// Work models to keep, comma-separated (e.g. remoto,hibrido)
    #[arg(long, env = "JOBHOUND_WORK_MODEL", default_value = "")]
    work_model: String,

    /// Seniority levels to keep, comma-separated (e.g. pleno,senior)
    #[arg(long, env = "JOBHOUND_LEVEL", default_value = "")]
    level: String,

    /// Free-text region to keep (e.g. a city)
    #[arg(long, env = "JOBHOUND_REGION", default_value = "")]
    region: String,

    /// Output format for stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Telegram bot token; results are also sent to Telegram when set
    #[arg(long, env = "TELEGRAM_TOKEN", requires = "telegram_chat_id")]
    telegram_token: Option<String>,

    /// Telegram chat to send results to
    #[arg(long, env = "TELEGRAM_CHAT_ID", requires = "telegram_token")]
    telegram_chat_id: Option<String>,

    /// Discord webhook; results are also posted there when set
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    discord_webhook: Option<String>,
}

impl Cli {
    fn filter(&self) -> FilterCriteria {
        FilterCriteria::default()
            .with_job_type(&self.job_type)
            .with_work_model(&self.work_model)
            .with_level(&self.level)
            .with_region(&self.region)
    }

    fn sources(&self) -> Vec<SourceKind> {
        if self.sources.is_empty() {
            SourceKind::DEFAULT.to_vec()
        } else {
            self.sources.clone()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.memory_cache {
        let cache = ResultCache::new(MemoryStore::default(), cli.cache_ttl);
        return search(&cli, Some(cache)).await;
    }

    if let Some(url) = &cli.redis_url {
        match RedisStore::connect(url).await {
            Ok(store) => {
                let cache = ResultCache::new(store, cli.cache_ttl);
                return search(&cli, Some(cache)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, continuing without cache");
            }
        }
    }

    search::<NullStore>(&cli, None).await
}

async fn search<S: KeyValueStore>(cli: &Cli, cache: Option<ResultCache<S>>) -> Result<()> {
    // 1. Transport and guard
    let mut options = TransportOptions::default().with_timeout(cli.timeout);
    if let Some(proxy) = &cli.proxy {
        options = options.with_proxy(proxy);
    }
    let transport =
        ReqwestTransport::with_options(&options).context("Failed to create HTTP client")?;
    let config = GuardConfig::new(cli.min_delay, cli.max_delay)
        .context("Invalid delay range")?
        .with_retry(RetryPolicy::new(cli.max_retries));
    let guard = TransportGuard::new(transport.clone(), config);

    // 2. Fan out to every selected source
    let adapters = registry(&guard, &cli.sources());
    let aggregate_config = AggregateConfig::default().with_timeout(cli.timeout);
    let aggregator = match cache {
        Some(cache) => Aggregator::with_cache(adapters, cache, aggregate_config),
        None => Aggregator::new(adapters, aggregate_config),
    };

    let report = aggregator.run(&cli.query, &cli.location).await;
    if report.duplicates > 0 {
        tracing::info!(duplicates = report.duplicates, "Dropped duplicate listings");
    }

    // 3. Filter
    let jobs = filter::apply(report.jobs, &cli.filter());

    // 4. Deliver
    let stdout: Box<dyn ResultWriter> = match cli.format {
        OutputFormat::Table => Box::new(ConsoleWriter::stdout()),
        OutputFormat::Csv => Box::new(CsvWriter::stdout()),
        OutputFormat::Json => Box::new(JsonWriter::stdout()),
    };
    let mut writers = vec![stdout];
    if let (Some(token), Some(chat_id)) = (&cli.telegram_token, &cli.telegram_chat_id) {
        writers.push(Box::new(TelegramWriter::new(transport.clone(), token, chat_id)));
    }
    if let Some(webhook) = &cli.discord_webhook {
        writers.push(Box::new(DiscordWriter::new(transport.clone(), webhook)));
    }

    let mut failed = 0;
    for writer in &writers {
        if let Err(e) = writer.write_jobs(&jobs).await {
            tracing::error!(error = %e, "Failed to deliver results");
            failed += 1;
        }
    }

    aggregator.flush_cache_writes().await;

    if cli.format == OutputFormat::Table {
        println!("\nTotal: {} job(s) found.", jobs.len());
    } else {
        eprintln!("Total: {} job(s) found.", jobs.len());
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} result writer(s) failed", writers.len());
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, `jobhound=info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("jobhound=info"))
}

fn non_empty(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Parse `500ms`, `30s`, `2m`, `1h` or a bare number of seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (value, unit) = s.split_at(split);
    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(60 * 60))),
        other => Err(format!("unknown duration unit '{other}' in '{s}' (use ms, s, m or h)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("10 days").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn rejects_blank_query() {
        assert!(non_empty("   ").is_err());
        assert_eq!(non_empty(" rust ").unwrap(), "rust");
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "jobhound",
            "-q",
            "rust",
            "-l",
            "SP",
            "--source",
            "gupy,linkedin",
            "--source",
            "indeed",
            "--min-delay",
            "1s",
            "--max-delay",
            "3s",
            "--work-model",
            "remoto",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.query, "rust");
        assert_eq!(
            cli.sources(),
            [SourceKind::Gupy, SourceKind::LinkedIn, SourceKind::Indeed]
        );
        assert_eq!(cli.min_delay, Duration::from_secs(1));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.filter().work_model, "remoto");
    }

    #[test]
    fn memory_cache_can_be_chosen_with_redis_configured() {
        let cli = Cli::try_parse_from([
            "jobhound",
            "-q",
            "rust",
            "--redis-url",
            "redis://127.0.0.1:6379",
            "--memory-cache",
        ])
        .unwrap();
        assert!(cli.memory_cache);
        assert_eq!(cli.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn rust_log_overrides_default_level() {
        use tracing_subscriber::filter::LevelFilter;

        let filter = log_filter(Some("jobhound=debug".to_string()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn huge_delays_are_rejected_by_the_guard() {
        let cli = Cli::try_parse_from([
            "jobhound",
            "-q",
            "rust",
            "--min-delay",
            "9999999999999999h",
            "--max-delay",
            "9999999999999999h",
        ])
        .unwrap();
        assert!(GuardConfig::new(cli.min_delay, cli.max_delay).is_err());
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(Cli::try_parse_from(["jobhound", "-q", "rust", "--source", "monster"]).is_err());
    }

    #[test]
    fn verifies_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
