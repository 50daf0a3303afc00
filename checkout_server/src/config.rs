use std::{env, net::IpAddr, time::Duration};

use checkout_engine::checkout_objects::{FinalizeOptions, DEFAULT_PROCESSING_RETRY_AFTER};
use gateway_tools::GatewayConfig;
use log::*;
use msq_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_MSQ_HOST: &str = "127.0.0.1";
const DEFAULT_MSQ_PORT: u16 = 8370;
pub const DEFAULT_CALLER_ID_HEADER: &str = "X-Msq-User-Id";
pub const DEFAULT_WEBHOOK_HMAC_HEADER: &str = "X-Msq-Signature";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The header the upstream auth proxy uses to tell us who the caller is. Requests to the finalize endpoint without
    /// it are rejected.
    pub caller_id_header: String,
    /// How long callers should wait before retrying while another finalize attempt holds the lock.
    pub processing_retry_after: Duration,
    /// If set, a lock held this long without an order is considered abandoned and may be taken over.
    pub stale_lock_timeout: Option<Duration>,
    pub gateway: GatewayConfig,
    pub webhook: WebhookConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_header: String,
    pub hmac_checks: bool,
    /// If supplied, webhook calls are only accepted from these addresses.
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            hmac_secret: Secret::default(),
            hmac_header: DEFAULT_WEBHOOK_HMAC_HEADER.to_string(),
            hmac_checks: true,
            whitelist: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MSQ_HOST.to_string(),
            port: DEFAULT_MSQ_PORT,
            database_url: String::default(),
            caller_id_header: DEFAULT_CALLER_ID_HEADER.to_string(),
            processing_retry_after: DEFAULT_PROCESSING_RETRY_AFTER,
            stale_lock_timeout: None,
            gateway: GatewayConfig::default(),
            webhook: WebhookConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MSQ_HOST").ok().unwrap_or_else(|| DEFAULT_MSQ_HOST.into());
        let port = env::var("MSQ_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MSQ_PORT. {e} Using the default, {DEFAULT_MSQ_PORT}, instead."
                    );
                    DEFAULT_MSQ_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MSQ_PORT);
        let database_url = env::var("MSQ_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MSQ_DATABASE_URL is not set. Please set it to the URL for the checkout database.");
            String::default()
        });
        let caller_id_header = env::var("MSQ_CALLER_ID_HEADER").ok().unwrap_or_else(|| {
            info!("🪛️ MSQ_CALLER_ID_HEADER is not set. Using {DEFAULT_CALLER_ID_HEADER}.");
            DEFAULT_CALLER_ID_HEADER.to_string()
        });
        let processing_retry_after = env::var("MSQ_PROCESSING_RETRY_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| error!("🪛️ {s} is not a valid value for MSQ_PROCESSING_RETRY_MS. {e} Using the default."))
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROCESSING_RETRY_AFTER);
        let stale_lock_timeout = configure_stale_lock_timeout();
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook = WebhookConfig::from_env_or_defaults();
        let use_x_forwarded_for = parse_boolean_flag(env::var("MSQ_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("MSQ_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            caller_id_header,
            processing_retry_after,
            stale_lock_timeout,
            gateway,
            webhook,
            use_x_forwarded_for,
            use_forwarded,
        }
    }

    pub fn finalize_options(&self) -> FinalizeOptions {
        FinalizeOptions::default()
            .with_processing_retry_after(self.processing_retry_after)
            .with_gateway_timeout(self.gateway.timeout)
            .with_stale_lock_timeout(self.stale_lock_timeout)
    }
}

fn configure_stale_lock_timeout() -> Option<Duration> {
    let value = env::var("MSQ_STALE_LOCK_TIMEOUT_SECS").ok()?;
    match value.parse::<u64>() {
        Ok(0) => {
            info!("🪛️ MSQ_STALE_LOCK_TIMEOUT_SECS is 0. Stale lock takeover is disabled.");
            None
        },
        Ok(secs) => {
            info!("🪛️ Abandoned checkout locks will be taken over after {secs}s");
            Some(Duration::from_secs(secs))
        },
        Err(e) => {
            error!("🪛️ {value} is not a valid value for MSQ_STALE_LOCK_TIMEOUT_SECS. {e} Stale lock takeover is disabled.");
            None
        },
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("MSQ_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ MSQ_WEBHOOK_HMAC_SECRET is not set. Please set it to the webhook signing key for your provider.");
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_header = env::var("MSQ_WEBHOOK_HMAC_HEADER").ok().unwrap_or_else(|| DEFAULT_WEBHOOK_HMAC_HEADER.into());
        let hmac_checks = parse_boolean_flag(env::var("MSQ_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Anyone can trigger checkout finalization via the webhook.");
        }
        let whitelist = env::var("MSQ_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhook calls."
                );
            },
            Some(whitelist) => {
                let list = whitelist.iter().map(|ip| ip.to_string()).collect::<Vec<String>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {list}");
            },
            None => info!("🪛️ No webhook IP whitelist is configured."),
        }
        Self { hmac_secret, hmac_header, hmac_checks, whitelist }
    }
}

/// Parses a comma-separated list of IP addresses. `none`, `false` and `0` disable the whitelist.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!("🪛️ Webhook IP whitelist is disabled.");
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in MSQ_WEBHOOK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}
