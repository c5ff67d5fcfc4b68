// Environment-derived runtime configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

const URL_VARS: [&str; 2] = ["BAZUNIA_SUPABASE_URL", "BAZA_SUPABASE_URL"];
const ANON_KEY_VARS: [&str; 2] = ["BAZUNIA_SUPABASE_ANON_KEY", "BAZA_SUPABASE_ANON_KEY"];
const PROVIDER_VARS: [&str; 2] = ["BAZUNIA_PUBLIC_DECK_PROVIDER", "BAZA_PUBLIC_DECK_PROVIDER"];
const CONFIG_ADDR_VAR: &str = "BAZUNIA_CONFIG_ADDR";
const DEFAULT_CONFIG_ADDR: &str = "127.0.0.1:8421";

const URL_PLACEHOLDER: &str = "YOUR_SUPABASE_URL";
const ANON_KEY_PLACEHOLDER: &str = "YOUR_SUPABASE_ANON_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {var}: {value}")]
    InvalidAddr { var: &'static str, value: String },
}

/// Where the public deck catalog comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicDeckProvider {
    #[default]
    Static,
    Supabase,
}

impl PublicDeckProvider {
    /// Anything but a case-insensitive `supabase` selects the static catalog.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("supabase") {
            PublicDeckProvider::Supabase
        } else {
            PublicDeckProvider::Static
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublicDeckProvider::Static => "static",
            PublicDeckProvider::Supabase => "supabase",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub public_deck_provider: PublicDeckProvider,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; the first non-empty name wins.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.is_empty())
        };

        Self {
            supabase_url: first(&URL_VARS).unwrap_or_default(),
            supabase_anon_key: first(&ANON_KEY_VARS).unwrap_or_default(),
            public_deck_provider: first(&PROVIDER_VARS)
                .map(|raw| PublicDeckProvider::parse(&raw))
                .unwrap_or_default(),
        }
    }

    /// Both connection values are set and are not the template placeholders.
    pub fn is_valid(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_url.contains(URL_PLACEHOLDER)
            && !self.supabase_anon_key.contains(ANON_KEY_PLACEHOLDER)
    }
}

/// Bind address of the runtime config endpoint.
pub fn config_server_addr() -> Result<SocketAddr, ConfigError> {
    let raw = std::env::var(CONFIG_ADDR_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_ADDR.to_string());
    raw.parse().map_err(|_| ConfigError::InvalidAddr {
        var: CONFIG_ADDR_VAR,
        value: raw,
    })
}
