use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "VITRINEX_DATABASE_URL")]
    pub database_url: String,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub feed: FeedConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub health: HealthConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "VITRINEX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "VITRINEX_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management server (health probes)
    #[arg(long, env = "VITRINEX_MGMT_PORT", default_value_t = 3001)]
    pub mgmt_port: u16,

    /// Per-request timeout in seconds
    #[arg(long, env = "VITRINEX_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "VITRINEX_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Shared secret for verifying marketplace-issued JWTs
    #[arg(long, env = "VITRINEX_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Maximum message length in characters
    #[arg(long, env = "VITRINEX_MAX_CONTENT_CHARS", default_value_t = 4000)]
    pub max_content_chars: usize,

    /// Length of the excerpt stored on the conversation summary
    #[arg(long, env = "VITRINEX_EXCERPT_CHARS", default_value_t = 120)]
    pub excerpt_chars: usize,
}

#[derive(Clone, Debug, Args)]
pub struct FeedConfig {
    /// Deadline for each per-kind feed query in milliseconds
    #[arg(long, env = "VITRINEX_FEED_KIND_TIMEOUT_MS", default_value_t = 2000)]
    pub kind_timeout_ms: u64,

    /// Deadline override for the order feed query in milliseconds
    #[arg(long, env = "VITRINEX_FEED_ORDER_TIMEOUT_MS")]
    pub order_timeout_ms: Option<u64>,

    /// Deadline override for the booking feed query in milliseconds
    #[arg(long, env = "VITRINEX_FEED_BOOKING_TIMEOUT_MS")]
    pub booking_timeout_ms: Option<u64>,

    /// Deadline override for the direct feed query in milliseconds
    #[arg(long, env = "VITRINEX_FEED_DIRECT_TIMEOUT_MS")]
    pub direct_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed per client IP
    #[arg(long, env = "VITRINEX_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance per client IP
    #[arg(long, env = "VITRINEX_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct HealthConfig {
    /// Timeout for the readiness database probe in milliseconds
    #[arg(long, env = "VITRINEX_HEALTH_DB_TIMEOUT_MS", default_value_t = 1000)]
    pub db_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "VITRINEX_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
