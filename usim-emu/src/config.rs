//! Emulator configuration
//!
//! Values come from the command line or environment (see the binary); the
//! defaults and the profile / data directory lookup live here.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// How card sessions map to client connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SessionPolicy {
    /// Every connection gets its own selection state
    #[default]
    PerConnection,
    /// All connections drive one card; commands are serialized
    Shared,
}

impl fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerConnection => f.write_str("per-connection"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Profile describing the card file system
    pub profile: PathBuf,
    /// Base directory for `content_file` / `records_file`; the profile's
    /// directory when None
    pub data_dir: Option<PathBuf>,
    pub session_policy: SessionPolicy,
}

impl Config {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 9999;
    const DEFAULT_PROFILE: &'static str = "profile.json";

    /// Default data directory: `~/.usim-emu` when it exists, else `./data`
    pub fn default_data_dir() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let dir = home.join(".usim-emu");
            if dir.is_dir() {
                return dir;
            }
        }
        PathBuf::from("data")
    }

    /// Resolve profile and data directory from optional overrides.
    ///
    /// The profile defaults to `profile.json` inside the data directory.
    pub fn resolve(profile: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        let profile = profile.unwrap_or_else(|| {
            data_dir
                .clone()
                .unwrap_or_else(Self::default_data_dir)
                .join(Self::DEFAULT_PROFILE)
        });
        Self {
            profile,
            data_dir,
            ..Self::default()
        }
    }

    /// `host:port` to listen on
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            profile: Self::default_data_dir().join(Self::DEFAULT_PROFILE),
            data_dir: None,
            session_policy: SessionPolicy::default(),
        }
    }
}
