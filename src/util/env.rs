//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Database URL: `IMDB_ETL_DB_URL`, then `DATABASE_URL`, then a DSN composed
/// from the libpq-style `PG*` variables.
pub fn db_url() -> anyhow::Result<String> {
    init_env();
    for k in ["IMDB_ETL_DB_URL", "DATABASE_URL"] {
        if let Some(v) = env_opt(k) {
            return Ok(v);
        }
    }
    if let Some(dsn) = build_dsn_from_pg_vars() {
        info!(target = "env", "using DSN composed from PG* variables");
        return Ok(dsn);
    }
    Err(anyhow::anyhow!(
        "no database URL configured (set DATABASE_URL or IMDB_ETL_DB_URL)"
    ))
}

fn build_dsn_from_pg_vars() -> Option<String> {
    let host = env_opt("PGHOST")?;
    let user = env_opt("PGUSER")?;
    let password = env_opt("PGPASSWORD");
    let database = env_opt("PGDATABASE").unwrap_or_else(|| "postgres".into());
    let port: u16 = env_parse("PGPORT", 5432);

    // Build via `url::Url` so reserved characters in credentials get percent-encoded.
    let mut out = url::Url::parse("postgresql://localhost").ok()?;
    out.set_username(&user).ok()?;
    if let Some(pass) = password {
        out.set_password(Some(&pass)).ok()?;
    }
    let host_trimmed = host.trim().trim_matches(|c| c == '[' || c == ']');
    if host_trimmed.contains(':') {
        out.set_host(Some(&format!("[{host_trimmed}]"))).ok()?;
    } else {
        out.set_host(Some(host_trimmed)).ok()?;
    }
    out.set_port(Some(port)).ok()?;
    out.set_path(&format!("/{database}"));
    if let Some(mode) = env_opt("PGSSLMODE").filter(|m| m != "disable") {
        out.query_pairs_mut().append_pair("sslmode", &mode);
    }
    Some(out.to_string())
}

pub(crate) fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }
    let val_trim = val.trim();

    // Always redact postgres DSNs even if the key isn't obviously sensitive.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme == "postgres" || scheme == "postgresql" {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }
    val_trim.to_string()
}

/// Log a consolidated, redacted snapshot of the given keys.
pub fn log_snapshot(title: &str, keys: &[&str]) {
    init_env();
    let snapshot: Vec<(String, String)> = keys
        .iter()
        .filter_map(|&k| env_opt(k).map(|v| (k.to_string(), redact_value(k, &v))))
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}
