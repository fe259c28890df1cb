//! Server configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use raidforge_session::SessionConfig;

use crate::RaidError;
use crate::reward::RewardPolicy;

/// Rules and sizing for the raid coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Room capacity. Default: 4.
    pub max_members: usize,
    /// Members required before the leader may start. Default: 2.
    pub min_members: usize,
    /// Per-room command queue depth. Default: 64.
    pub command_buffer: usize,
    pub rewards: RewardPolicy,
    /// Fixed seed for boss decisions; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_members: 4,
            min_members: 2,
            command_buffer: 64,
            rewards: RewardPolicy::default(),
            rng_seed: None,
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket listen address.
    pub ws_addr: String,
    /// HTTP listen address for `GET /rooms`; `None` disables it.
    pub http_addr: Option<String>,
    /// Connections with no traffic in either direction for this long are
    /// dropped. `None` (the default) keeps connections open indefinitely;
    /// a dropped player forfeits any raid they are in.
    pub idle_timeout: Option<Duration>,
    /// Redis connection string. Without it rooms live in process memory.
    pub redis_url: Option<String>,
    pub session: SessionConfig,
    pub coordinator: CoordinatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_addr: "127.0.0.1:8080".to_string(),
            http_addr: Some("127.0.0.1:8081".to_string()),
            idle_timeout: None,
            redis_url: None,
            session: SessionConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `RAID_*` and `REDIS_URL`, falling back to defaults for
    /// anything unset. Malformed values are errors.
    pub fn from_env() -> Result<Self, RaidError> {
        let defaults = Self::default();

        let ws_addr = env::var("RAID_WS_ADDR").unwrap_or(defaults.ws_addr);
        let http_addr = match env::var("RAID_HTTP_ADDR") {
            Ok(addr) if addr.is_empty() || addr == "off" => None,
            Ok(addr) => Some(addr),
            Err(_) => defaults.http_addr,
        };
        let redis_url = env::var("REDIS_URL").ok().filter(|u| !u.is_empty());

        // 0 or unset: no idle timeout.
        let idle_secs: u64 = parse_var("RAID_IDLE_TIMEOUT_SECS", 0)?;

        let base = defaults.coordinator;
        let coordinator = CoordinatorConfig {
            max_members: parse_var("RAID_MAX_MEMBERS", base.max_members)?,
            min_members: parse_var("RAID_MIN_MEMBERS", base.min_members)?,
            rewards: RewardPolicy {
                win: parse_var("RAID_WIN_REWARD", base.rewards.win)?,
                defeat: parse_var("RAID_DEFEAT_REWARD", base.rewards.defeat)?,
            },
            ..base
        };
        if coordinator.min_members == 0
            || coordinator.min_members > coordinator.max_members
        {
            return Err(RaidError::Config(format!(
                "RAID_MIN_MEMBERS ({}) must be between 1 and RAID_MAX_MEMBERS ({})",
                coordinator.min_members, coordinator.max_members
            )));
        }

        Ok(Self {
            ws_addr,
            http_addr,
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            redis_url,
            session: defaults.session,
            coordinator,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, RaidError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|e| {
            RaidError::Config(format!("{name} must be valid, got '{raw}': {e}"))
        }),
        Err(_) => Ok(default),
    }
}
