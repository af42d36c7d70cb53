use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "admin", "password"];

/// Who may create rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCreation {
    Open,
    AdminOnly,
}

impl FromStr for RoomCreation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "anyone" => Ok(RoomCreation::Open),
            "admin" => Ok(RoomCreation::AdminOnly),
            other => bail!("unknown room creation policy {:?} (expected open|admin)", other),
        }
    }
}

/// Scope of the age-confirmation cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeGate {
    Off,
    /// One confirmation for the whole site.
    Global,
    /// One confirmation per room.
    PerRoom,
}

impl FromStr for AgeGate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(AgeGate::Off),
            "global" | "site" => Ok(AgeGate::Global),
            "room" | "per-room" => Ok(AgeGate::PerRoom),
            other => bail!("unknown age gate scope {:?} (expected off|global|room)", other),
        }
    }
}

/// Process-wide settings, built once at startup and never mutated.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub admin_secret: String,
    pub data_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub room_creation: RoomCreation,
    pub age_gate: AgeGate,
    /// Gate raw file and JSON listing routes too.
    pub age_gate_raw_files: bool,
    /// Accept `?admin=<secret>` as an admin credential.
    pub admin_query_token: bool,
    pub cookie_max_age_secs: i64,
}

impl Config {
    /// Defaults for everything except the data root and the secret.
    pub fn new(data_dir: impl Into<PathBuf>, admin_secret: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            admin_secret: admin_secret.into(),
            data_dir: data_dir.into(),
            max_upload_bytes: 50 * 1024 * 1024,
            room_creation: RoomCreation::AdminOnly,
            age_gate: AgeGate::Global,
            age_gate_raw_files: false,
            admin_query_token: false,
            cookie_max_age_secs: 30 * 24 * 3600,
        }
    }

    /// Read `ALCOVE_*` variables. Call `dotenvy::dotenv()` first if a `.env`
    /// file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_secret = lookup("ALCOVE_ADMIN_SECRET").unwrap_or_default();
        if admin_secret.trim().is_empty()
            || PLACEHOLDER_SECRETS.contains(&admin_secret.trim().to_ascii_lowercase().as_str())
        {
            bail!("ALCOVE_ADMIN_SECRET is unset or still a placeholder");
        }

        let data_dir = lookup("ALCOVE_DATA_DIR").unwrap_or_else(|| "./rooms".into());
        let mut config = Config::new(data_dir, admin_secret);

        if let Some(host) = lookup("ALCOVE_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("ALCOVE_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("ALCOVE_PORT={:?} is not a port", port))?;
        }
        if let Some(mb) = lookup("ALCOVE_MAX_UPLOAD_MB") {
            let mb: u64 = mb
                .parse()
                .with_context(|| format!("ALCOVE_MAX_UPLOAD_MB={:?} is not a number", mb))?;
            if mb == 0 {
                bail!("ALCOVE_MAX_UPLOAD_MB must be at least 1");
            }
            config.max_upload_bytes = mb
                .checked_mul(1024 * 1024)
                .with_context(|| format!("ALCOVE_MAX_UPLOAD_MB={} is too large", mb))?;
        }
        if let Some(policy) = lookup("ALCOVE_ROOM_CREATION") {
            config.room_creation = policy.parse()?;
        }
        if let Some(scope) = lookup("ALCOVE_AGE_GATE") {
            config.age_gate = scope.parse()?;
        }
        if let Some(flag) = lookup("ALCOVE_AGE_GATE_RAW_FILES") {
            config.age_gate_raw_files = parse_bool("ALCOVE_AGE_GATE_RAW_FILES", &flag)?;
        }
        if let Some(flag) = lookup("ALCOVE_ADMIN_QUERY_TOKEN") {
            config.admin_query_token = parse_bool("ALCOVE_ADMIN_QUERY_TOKEN", &flag)?;
        }
        if let Some(secs) = lookup("ALCOVE_COOKIE_MAX_AGE_SECS") {
            config.cookie_max_age_secs = secs
                .parse()
                .with_context(|| format!("ALCOVE_COOKIE_MAX_AGE_SECS={:?} is not a number", secs))?;
        }

        Ok(config)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_secret", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("room_creation", &self.room_creation)
            .field("age_gate", &self.age_gate)
            .field("age_gate_raw_files", &self.age_gate_raw_files)
            .field("admin_query_token", &self.admin_query_token)
            .field("cookie_max_age_secs", &self.cookie_max_age_secs)
            .finish()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{}={:?} is not a boolean", key, other),
    }
}
