//! Protocol constants and the two runtime-loaded JSON registries: block
//! states and packet names. Neither registry is generated at build time —
//! both are plain `serde_json` lookups built once at process startup and
//! shared read-only for the lifetime of the process.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Protocol version this client speaks (game version 1.21.4).
pub const PROTOCOL_VERSION: i32 = 769;

/// Fixed placeholder UUID sent with every Login Start, since this client
/// never authenticates against Mojang and the server is assumed to run in
/// offline mode. Not derived from the player name.
pub const PLACEHOLDER_UUID: u128 = 0xde60_78a8_56ec_4cf9_b883_2a46_025a_e261;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DataError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct BlockStateEntry {
    id: i32,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Deserialize)]
struct BlockEntry {
    states: Vec<BlockStateEntry>,
}

/// A block-id -> name lookup, loaded once from a JSON report mapping
/// `"namespace:name"` to its list of block states.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    names_by_id: HashMap<i32, String>,
}

impl BlockRegistry {
    /// Loads the registry from a JSON report at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let blocks: HashMap<String, BlockEntry> = load_json(path.as_ref())?;
        let mut names_by_id = HashMap::new();
        for (full_name, entry) in blocks {
            let short_name = full_name
                .split_once(':')
                .map_or(full_name.as_str(), |(_, name)| name)
                .to_string();
            for state in &entry.states {
                names_by_id.entry(state.id).or_insert_with(|| short_name.clone());
            }
        }
        Ok(BlockRegistry { names_by_id })
    }

    /// Returns the namespace-stripped name of the first matching state for
    /// `id`, or the decimal id itself if `id` is unknown to the registry.
    #[must_use]
    pub fn name_of(&self, id: i32) -> String {
        self.names_by_id
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PacketEntry {
    protocol_id: i32,
}

type PacketDirectory = HashMap<String, HashMap<String, HashMap<String, PacketEntry>>>;

/// A packet-id -> name lookup, used only to make log lines readable. Never
/// consulted by the connection state machine's dispatch logic.
#[derive(Debug, Default)]
pub struct PacketNameRegistry {
    directory: PacketDirectory,
}

impl PacketNameRegistry {
    /// Loads the registry from a packets.json report at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        Ok(PacketNameRegistry {
            directory: load_json(path.as_ref())?,
        })
    }

    /// Resolves `id` within `phase`/`direction` (e.g. `"play"`,
    /// `"clientbound"`) to `"name id=0x.."`, falling back to just the hex id
    /// if the phase, direction, or id is not in the loaded report.
    #[must_use]
    pub fn name_of(&self, phase: &str, direction: &str, id: i32) -> String {
        self.directory
            .get(phase)
            .and_then(|by_direction| by_direction.get(direction))
            .and_then(|by_name| {
                by_name
                    .iter()
                    .find(|(_, entry)| entry.protocol_id == id)
                    .map(|(name, _)| name.as_str())
            })
            .map_or_else(|| format!("{id:#x}"), |name| format!("{name} id={id:#x}"))
    }
}
