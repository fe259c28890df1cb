//! Raid server binary.
//!
//! Configuration comes from the environment (see [`ServerConfig`]). The
//! catalog and sessions are in-process development fixtures; set
//! `RAID_DEV_TOKENS` to a comma-separated list of `token=userId` pairs to
//! seed sessions. Every seeded user owns the whole demo roster.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use raidforge::{
    MemoryCatalog, MemoryLedger, RaidError, RaidServerBuilder, ServerConfig,
};
use raidforge_protocol::{
    PokemonId, PokemonTemplate, SkillId, SkillTemplate, TargetMode, UserId,
};
use raidforge_session::MemorySessionStore;
use raidforge_store::{KvStore, MemoryStore};
use tracing_subscriber::EnvFilter;

/// How often expired session tokens are swept.
const SESSION_SWEEP: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;

    let sessions = Arc::new(MemorySessionStore::new(config.session.clone()));
    let mut users = Vec::new();
    for (token, user_id) in dev_tokens()? {
        sessions.insert(token, user_id).await;
        users.push(user_id);
    }
    if users.is_empty() {
        let user_id = UserId(1);
        let token = sessions.issue(user_id).await;
        tracing::info!(%user_id, %token, "issued development session");
        users.push(user_id);
    }
    let catalog = demo_catalog(&users);
    tokio::spawn(sweep_sessions(Arc::clone(&sessions)));

    match config.redis_url.clone() {
        #[cfg(feature = "redis")]
        Some(url) => {
            let store = raidforge_store::RedisStore::connect(&url).await?;
            serve(&config, store, catalog, sessions).await?;
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!(
                "REDIS_URL is set but redis support is not compiled in; using memory store"
            );
            serve(&config, MemoryStore::new(), catalog, sessions).await?;
        }
        None => serve(&config, MemoryStore::new(), catalog, sessions).await?,
    }
    Ok(())
}

async fn serve<S>(
    config: &ServerConfig,
    store: S,
    catalog: MemoryCatalog,
    sessions: Arc<MemorySessionStore>,
) -> Result<(), RaidError>
where
    S: KvStore + Clone,
{
    let server = RaidServerBuilder::from_config(config)
        .build(store, catalog, Arc::new(MemoryLedger::new()), sessions)
        .await?;
    tracing::info!(
        ws = ?server.local_addr().ok(),
        http = ?server.http_addr(),
        "listening"
    );
    server.run().await
}

async fn sweep_sessions(sessions: Arc<MemorySessionStore>) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP);
    loop {
        ticker.tick().await;
        let purged = sessions.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions swept");
        }
    }
}

/// Parses `RAID_DEV_TOKENS` (`token=userId,...`).
fn dev_tokens() -> Result<Vec<(String, UserId)>, RaidError> {
    let Ok(raw) = env::var("RAID_DEV_TOKENS") else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (token, user) = pair.split_once('=').ok_or_else(|| {
                RaidError::Config(format!("RAID_DEV_TOKENS entry {pair:?} lacks '='"))
            })?;
            let user = user.trim().parse::<u64>().map_err(|e| {
                RaidError::Config(format!("RAID_DEV_TOKENS user {user:?}: {e}"))
            })?;
            Ok((token.trim().to_string(), UserId(user)))
        })
        .collect()
}

fn skill(
    id: u64,
    name: &str,
    damage: u32,
    target_mode: TargetMode,
    max_uses: u32,
) -> SkillTemplate {
    SkillTemplate {
        id: SkillId(id),
        name: name.to_string(),
        damage,
        target_mode,
        max_uses,
    }
}

fn demo_catalog(users: &[UserId]) -> MemoryCatalog {
    let roster = [
        PokemonTemplate {
            id: PokemonId(25),
            name: "Pikachu".into(),
            hp: 60,
            skills: vec![
                skill(1, "Thunder Shock", 20, TargetMode::Single, 10),
                skill(2, "Thunderbolt", 35, TargetMode::Single, 5),
            ],
        },
        PokemonTemplate {
            id: PokemonId(4),
            name: "Charmander".into(),
            hp: 65,
            skills: vec![
                skill(3, "Ember", 20, TargetMode::Single, 10),
                skill(4, "Flamethrower", 35, TargetMode::Single, 5),
            ],
        },
        PokemonTemplate {
            id: PokemonId(7),
            name: "Squirtle".into(),
            hp: 70,
            skills: vec![
                skill(5, "Water Gun", 20, TargetMode::Single, 10),
                skill(6, "Hydro Pump", 40, TargetMode::Single, 3),
            ],
        },
    ];
    let boss = PokemonTemplate {
        id: PokemonId(150),
        name: "Mewtwo".into(),
        hp: 400,
        skills: vec![
            skill(100, "Psycho Cut", 25, TargetMode::Single, 10),
            skill(101, "Psystrike", 20, TargetMode::All, 4),
        ],
    };

    let mut catalog = MemoryCatalog::new().with_template(boss);
    for template in &roster {
        catalog = catalog.with_template(template.clone());
    }
    for &user_id in users {
        for template in &roster {
            catalog = catalog.with_owned(user_id, template.id);
        }
    }
    catalog
}
