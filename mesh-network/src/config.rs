//! Configuration for docmesh transports.
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [channel]
//! channel_name = "team-notes"
//! capacity = 512
//!
//! [peer]
//! peer_id = "laptop"
//! storage_id = "6f1c0a8e-3c1b-4bb5-9d7e-0f6c2b9a4e11"
//! ephemeral = false
//! ```

use mesh_types::{PeerId, PeerMetadata, StorageId};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Channel name used when none is configured.
pub const DEFAULT_CHANNEL_NAME: &str = "broadcast";

/// Options for the broadcast-channel transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastOptions {
    /// Logical channel every instance must share to see each other's
    /// traffic (default: "broadcast").
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    /// Frames a listener may fall behind by before it starts losing them
    /// (default: 256).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl BroadcastOptions {
    /// Use a different channel name.
    pub fn with_channel_name(mut self, name: &str) -> Self {
        self.channel_name = name.to_string();
        self
    }

    /// Use a different listener capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            capacity: default_capacity(),
        }
    }
}

/// How the local peer presents itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PeerSettings {
    /// Fixed peer id (random when absent).
    pub peer_id: Option<String>,
    /// Durable storage key to advertise.
    pub storage_id: Option<StorageId>,
    /// Advertise the peer as ephemeral or durable. Unset leaves the flag
    /// out of the handshake.
    pub ephemeral: Option<bool>,
}

impl PeerSettings {
    /// The configured peer id, or a fresh random one.
    pub fn peer_id(&self) -> PeerId {
        match &self.peer_id {
            Some(id) => PeerId::new(id.as_str()),
            None => PeerId::random(),
        }
    }

    /// The metadata to announce during the handshake.
    pub fn metadata(&self) -> PeerMetadata {
        PeerMetadata {
            storage_id: self.storage_id,
            is_ephemeral: self.ephemeral,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Broadcast channel options.
    #[serde(default)]
    pub channel: BroadcastOptions,
    /// Local peer settings.
    #[serde(default)]
    pub peer: PeerSettings,
}

fn default_channel_name() -> String {
    DEFAULT_CHANNEL_NAME.to_string()
}

fn default_capacity() -> usize {
    256
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_channel_is_broadcast() {
        let options = BroadcastOptions::default();
        assert_eq!(options.channel_name, "broadcast");
        assert_eq!(options.capacity, 256);
    }

    #[test]
    fn builder_overrides_channel() {
        let options = BroadcastOptions::default()
            .with_channel_name("test")
            .with_capacity(8);
        assert_eq!(options.channel_name, "test");
        assert_eq!(options.capacity, 8);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[channel]
channel_name = "team-notes"
capacity = 512

[peer]
peer_id = "laptop"
storage_id = "6f1c0a8e-3c1b-4bb5-9d7e-0f6c2b9a4e11"
ephemeral = true
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.channel.channel_name, "team-notes");
        assert_eq!(config.channel.capacity, 512);
        assert_eq!(config.peer.peer_id(), PeerId::new("laptop"));
        let metadata = config.peer.metadata();
        assert_eq!(
            metadata.storage_id.unwrap().to_string(),
            "6f1c0a8e-3c1b-4bb5-9d7e-0f6c2b9a4e11"
        );
        assert!(metadata.is_ephemeral());
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());

        let config: Config = toml::from_str("[channel]\n").unwrap();
        assert_eq!(config.channel.channel_name, DEFAULT_CHANNEL_NAME);
    }

    #[test]
    fn unset_peer_id_is_random() {
        let settings = PeerSettings::default();
        assert_ne!(settings.peer_id(), settings.peer_id());
    }

    #[test]
    fn unset_ephemeral_is_not_advertised() {
        assert_eq!(PeerSettings::default().metadata(), PeerMetadata::new());

        let config: Config = toml::from_str("[peer]\nephemeral = false\n").unwrap();
        assert_eq!(config.peer.metadata().is_ephemeral, Some(false));
    }

    #[test]
    fn bad_storage_id_fails_to_parse() {
        let result: Result<Config, _> = toml::from_str("[peer]\nstorage_id = \"nope\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[channel]\nchannel_name = \"from-file\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.channel.channel_name, "from-file");
    }

    #[test]
    fn from_file_missing_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/docmesh.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("/nonexistent/docmesh.toml"));
    }

    #[test]
    fn from_file_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[channel\nbroken").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
