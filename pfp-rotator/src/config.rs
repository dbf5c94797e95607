//! Server configuration and CLI argument parsing
//!
//! Configuration comes from command-line arguments and environment variables.
//! Every option has a `PFP_ROTATOR_` variable, except the Bluesky
//! credentials which keep their conventional `BLUESKY_HANDLE` and
//! `BLUESKY_APP_PASSWORD` names.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! Missing credentials do not stop the server from starting. They are
//! reported when a trigger tries to update the profile.
//!
//! # Example Usage
//!
//! ```bash
//! export BLUESKY_HANDLE=me.bsky.social
//! export BLUESKY_APP_PASSWORD=xxxx-xxxx-xxxx-xxxx
//! pfp-rotator --port 8080 --public-limit 3 --public-window 3600
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use pfp_governor::Quota;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted window or sweep interval: one year
const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub http: HttpConfig,
    /// Bluesky account and service
    pub bluesky: BlueskyConfig,
    /// Where avatar and banner images are read from
    pub assets: AssetConfig,
    /// Rate governor settings
    pub governor: GovernorConfig,
    /// Bearer secret required by the authenticated trigger, if any
    pub cron_secret: Option<String>,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Run one update and exit instead of serving
    pub run_once: bool,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Bluesky service and credentials
#[derive(Clone)]
pub struct BlueskyConfig {
    /// PDS base URL, e.g. `https://bsky.social`
    pub service_url: String,
    pub handle: Option<String>,
    pub app_password: Option<String>,
    /// Per-request timeout for upstream calls; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

// Keep the app password out of logs
impl fmt::Debug for BlueskyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlueskyConfig")
            .field("service_url", &self.service_url)
            .field("handle", &self.handle)
            .field(
                "app_password",
                &self.app_password.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Image directories
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub pfp_dir: PathBuf,
    pub banner_dir: PathBuf,
}

/// Rate governor configuration
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Quota applied per identifier on the public trigger
    pub public_quota: Quota,
    /// How often expired records are swept
    pub sweep_interval: Duration,
    /// Expected number of distinct identifiers
    pub capacity: usize,
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables. CLI arguments
/// take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "pfp-rotator",
    about = "Rotate a Bluesky avatar and banner on demand",
    long_about = "Serves a public, rate-limited trigger and an authenticated trigger that \
                  replace the account's avatar (and matching banner) with a random image.\n\n\
                  Environment variables with PFP_ROTATOR_ prefix are supported. CLI arguments \
                  take precedence over environment variables."
)]
pub struct Args {
    // HTTP
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "PFP_ROTATOR_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "PFP_ROTATOR_PORT"
    )]
    pub port: u16,

    // Bluesky
    #[arg(
        long,
        value_name = "URL",
        help = "Bluesky PDS base URL",
        default_value = "https://bsky.social",
        env = "PFP_ROTATOR_SERVICE_URL"
    )]
    pub service_url: String,
    #[arg(
        long,
        value_name = "HANDLE",
        help = "Account handle or DID",
        env = "BLUESKY_HANDLE"
    )]
    pub handle: Option<String>,
    #[arg(
        long,
        value_name = "PASSWORD",
        help = "Account app password",
        env = "BLUESKY_APP_PASSWORD",
        hide_env_values = true
    )]
    pub app_password: Option<String>,
    #[arg(
        long,
        value_name = "SECS",
        help = "Timeout for each upstream request (seconds); unset waits indefinitely",
        env = "PFP_ROTATOR_UPSTREAM_TIMEOUT"
    )]
    pub upstream_timeout: Option<u64>,

    // Assets
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory of candidate avatar images",
        default_value = "pfps",
        env = "PFP_ROTATOR_PFP_DIR"
    )]
    pub pfp_dir: PathBuf,
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory of banners named after their avatar",
        default_value = "banners",
        env = "PFP_ROTATOR_BANNER_DIR"
    )]
    pub banner_dir: PathBuf,

    // Governor
    #[arg(
        long,
        value_name = "N",
        help = "Public trigger: updates allowed per window per client",
        default_value_t = 3,
        env = "PFP_ROTATOR_PUBLIC_LIMIT"
    )]
    pub public_limit: u32,
    #[arg(
        long,
        value_name = "SECS",
        help = "Public trigger: window length (seconds)",
        default_value_t = 3600,
        env = "PFP_ROTATOR_PUBLIC_WINDOW"
    )]
    pub public_window: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Interval between sweeps of expired rate records (seconds)",
        default_value_t = 600,
        env = "PFP_ROTATOR_SWEEP_INTERVAL"
    )]
    pub sweep_interval: u64,
    #[arg(
        long,
        value_name = "SIZE",
        help = "Expected number of distinct clients",
        default_value_t = 10_000,
        env = "PFP_ROTATOR_STORE_CAPACITY"
    )]
    pub store_capacity: usize,

    // Authenticated trigger
    #[arg(
        long,
        value_name = "SECRET",
        help = "Bearer token required by /api/update-pfp; unset leaves it open",
        env = "PFP_ROTATOR_CRON_SECRET",
        hide_env_values = true
    )]
    pub cron_secret: Option<String>,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "PFP_ROTATOR_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "Run a single profile update and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub once: bool,
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if a quota, window or interval is zero, a window or
    /// interval is longer than a year, or the avatar directory is empty.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            http: HttpConfig {
                host: args.host,
                port: args.port,
            },
            bluesky: BlueskyConfig {
                service_url: args.service_url.trim_end_matches('/').to_string(),
                handle: non_empty(args.handle),
                app_password: non_empty(args.app_password),
                timeout: args.upstream_timeout.map(Duration::from_secs),
            },
            assets: AssetConfig {
                pfp_dir: args.pfp_dir,
                banner_dir: args.banner_dir,
            },
            governor: GovernorConfig {
                public_quota: Quota::new(args.public_limit, Duration::from_secs(args.public_window)),
                sweep_interval: Duration::from_secs(args.sweep_interval),
                capacity: args.store_capacity,
            },
            cron_secret: non_empty(args.cron_secret),
            log_level: args.log_level,
            run_once: args.once,
        };

        config.validate()?;

        Ok(config)
    }

    /// Whether both credentials are present
    pub fn has_credentials(&self) -> bool {
        self.bluesky.handle.is_some() && self.bluesky.app_password.is_some()
    }

    fn validate(&self) -> Result<()> {
        let quota = &self.governor.public_quota;
        if quota.max_requests == 0 {
            return Err(anyhow!("--public-limit must be at least 1"));
        }
        if quota.window.is_zero() {
            return Err(anyhow!("--public-window must be at least 1 second"));
        }
        if quota.window.as_secs() > MAX_PERIOD_SECS {
            return Err(anyhow!(
                "--public-window must be at most {} seconds",
                MAX_PERIOD_SECS
            ));
        }
        if self.governor.sweep_interval.is_zero() {
            return Err(anyhow!("--sweep-interval must be at least 1 second"));
        }
        if self.governor.sweep_interval.as_secs() > MAX_PERIOD_SECS {
            return Err(anyhow!(
                "--sweep-interval must be at most {} seconds",
                MAX_PERIOD_SECS
            ));
        }
        if self.bluesky.timeout.is_some_and(|t| t.is_zero()) {
            return Err(anyhow!("--upstream-timeout must be at least 1 second"));
        }
        if self.assets.pfp_dir.as_os_str().is_empty() {
            return Err(anyhow!("--pfp-dir must not be empty"));
        }
        if self.bluesky.service_url.is_empty() {
            return Err(anyhow!("--service-url must not be empty"));
        }

        Ok(())
    }

    fn print_env_vars() {
        println!("pfp-rotator Environment Variables");
        println!("=================================");
        println!();
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Credentials (required to update the profile):");
        println!("  BLUESKY_HANDLE=<handle>                     Account handle or DID");
        println!("  BLUESKY_APP_PASSWORD=<password>             Account app password");
        println!();

        println!("HTTP:");
        println!("  PFP_ROTATOR_HOST=<host>                     HTTP host [default: 127.0.0.1]");
        println!("  PFP_ROTATOR_PORT=<port>                     HTTP port [default: 8080]");
        println!();

        println!("Bluesky:");
        println!(
            "  PFP_ROTATOR_SERVICE_URL=<url>               PDS base URL [default: https://bsky.social]"
        );
        println!(
            "  PFP_ROTATOR_UPSTREAM_TIMEOUT=<secs>         Per-request timeout [default: none]"
        );
        println!();

        println!("Assets:");
        println!("  PFP_ROTATOR_PFP_DIR=<dir>                   Avatar images [default: pfps]");
        println!("  PFP_ROTATOR_BANNER_DIR=<dir>                Banner images [default: banners]");
        println!();

        println!("Rate governor:");
        println!(
            "  PFP_ROTATOR_PUBLIC_LIMIT=<n>                Public updates per window [default: 3]"
        );
        println!(
            "  PFP_ROTATOR_PUBLIC_WINDOW=<secs>            Public window length [default: 3600]"
        );
        println!(
            "  PFP_ROTATOR_SWEEP_INTERVAL=<secs>           Expired record sweep interval [default: 600]"
        );
        println!(
            "  PFP_ROTATOR_STORE_CAPACITY=<size>           Expected distinct clients [default: 10000]"
        );
        println!();

        println!("General:");
        println!(
            "  PFP_ROTATOR_CRON_SECRET=<secret>            Bearer token for /api/update-pfp [default: none]"
        );
        println!(
            "  PFP_ROTATOR_LOG_LEVEL=<level>               Log level: error, warn, info, debug, trace [default: info]"
        );
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
