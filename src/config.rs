//! Process configuration, read once at startup from the environment.
//!
//! Mirrors the teacher's `std::env::var(...).unwrap_or_else(|| "default")`
//! idiom repeated through `coordinator::main` / `node::main`, collected here
//! into a single struct rather than scattered `env::var` calls at each
//! call site.

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub admin_key: Option<String>,
    pub starting_chips: u64,
    pub min_buy_in_big_blinds: u64,
    pub default_small_blind: u64,
    pub action_timeout_ms: u64,
    pub showdown_cooldown_ms: u64,
    pub max_table_seats: usize,
    pub sit_out_eviction_hands: u32,
    pub max_rebuys: u32,
    pub rate_limit_authenticated_per_min: u32,
    pub rate_limit_chat_per_min: u32,
    pub rate_limit_register_per_min: u32,
    pub rate_limit_public_per_min: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            admin_key: std::env::var("ADMIN_KEY").ok(),
            starting_chips: env_or("STARTING_CHIPS", 1000),
            min_buy_in_big_blinds: env_or("MIN_BUY_IN_BIG_BLINDS", 5),
            default_small_blind: env_or("DEFAULT_SMALL_BLIND", 10),
            action_timeout_ms: env_or("ACTION_TIMEOUT_MS", 15_000),
            showdown_cooldown_ms: env_or("SHOWDOWN_COOLDOWN_MS", 3_000),
            max_table_seats: env_or("MAX_TABLE_SEATS", 6),
            sit_out_eviction_hands: env_or("SIT_OUT_EVICTION_HANDS", 10),
            max_rebuys: env_or("MAX_REBUYS", 3),
            rate_limit_authenticated_per_min: env_or("RATE_LIMIT_AUTHENTICATED_PER_MIN", 60),
            rate_limit_chat_per_min: env_or("RATE_LIMIT_CHAT_PER_MIN", 10),
            rate_limit_register_per_min: env_or("RATE_LIMIT_REGISTER_PER_MIN", 5),
            rate_limit_public_per_min: env_or("RATE_LIMIT_PUBLIC_PER_MIN", 30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
