//! Asset metadata
//!
//! Per-asset records kept by the registry, the asset type table and the
//! cheap/expensive change signals (fast metadata and the FNV-1a content hash).

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use core::fmt;
use core::str::FromStr;

use crate::id::AssetId;

/// Kind of asset, decides which importer handles it
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AssetType {
    /// Not an asset type the pipeline knows about
    #[default]
    Unknown,
    /// Images (png, jpg, bmp, tga)
    Texture,
    /// Shader sources (wgsl, glsl)
    Shader,
    /// Sound files (wav, ogg, flac, mp3)
    Audio,
    /// Sprite atlas definitions (.atlas)
    SpriteAtlas,
}

impl AssetType {
    /// Every concrete asset type
    pub const ALL: [AssetType; 4] = [
        AssetType::Texture,
        AssetType::Shader,
        AssetType::Audio,
        AssetType::SpriteAtlas,
    ];

    /// Determine the asset type from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "tga" => AssetType::Texture,
            "wgsl" | "glsl" | "vert" | "frag" | "comp" => AssetType::Shader,
            "wav" | "ogg" | "flac" | "mp3" => AssetType::Audio,
            "atlas" => AssetType::SpriteAtlas,
            _ => AssetType::Unknown,
        }
    }

    /// Determine the asset type from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(AssetType::Unknown)
    }

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Unknown => "unknown",
            AssetType::Texture => "texture",
            AssetType::Shader => "shader",
            AssetType::Audio => "audio",
            AssetType::SpriteAtlas => "sprite_atlas",
        }
    }

    /// Parse a persisted name, mapping anything unrecognised to `Unknown`
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(AssetType::Unknown)
    }

    /// Whether this is a type an importer can handle
    pub fn is_known(&self) -> bool {
        *self != AssetType::Unknown
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(AssetType::Unknown),
            "texture" => Ok(AssetType::Texture),
            "shader" => Ok(AssetType::Shader),
            "audio" => Ok(AssetType::Audio),
            "sprite_atlas" | "spriteatlas" | "atlas" => Ok(AssetType::SpriteAtlas),
            _ => Err(format!("Unknown asset type: {}", s)),
        }
    }
}

/// Fast file metadata: modification time and size.
///
/// Used as the cheap "has this file changed" signal by the registry, the
/// scanner and the hot-reload manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FileStamp {
    /// Modification time in nanoseconds since the unix epoch
    pub mod_time: u64,
    /// File size in bytes
    pub size: u64,
}

impl FileStamp {
    /// Stat a file. Returns `None` if it is missing, unreadable or not a file.
    pub fn read(path: impl AsRef<Path>) -> Option<Self> {
        let meta = std::fs::metadata(path.as_ref()).ok()?;
        if !meta.is_file() {
            return None;
        }
        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Some(Self {
            mod_time,
            size: meta.len(),
        })
    }
}

/// Metadata for one registered asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetMetadata {
    /// Primary key
    pub id: AssetId,
    /// Source path relative to the source directory, `/`-separated
    pub source_path: String,
    /// Project-relative path of the cooked artifact; empty if never imported
    pub imported_path: String,
    /// Asset type
    pub asset_type: AssetType,
    /// Content hash, `None` until computed
    pub source_hash: Option<u64>,
    /// Source modification time (ns since epoch) at registration / last import
    pub source_mod_time: u64,
    /// Source size in bytes at registration / last import
    pub source_size: u64,
    /// Unix seconds of the last successful import, 0 if never
    pub imported_timestamp: u64,
    /// Opaque per-type importer settings (JSON text)
    pub import_settings: String,
    /// Assets this one requires
    pub dependencies: BTreeSet<AssetId>,
    /// Assets that require this one (derived from `dependencies`)
    pub dependents: BTreeSet<AssetId>,
}

impl AssetMetadata {
    /// Create metadata for a freshly registered asset
    pub fn new(id: AssetId, source_path: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            id,
            source_path: source_path.into(),
            imported_path: String::new(),
            asset_type,
            source_hash: None,
            source_mod_time: 0,
            source_size: 0,
            imported_timestamp: 0,
            import_settings: String::new(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    /// Whether the asset has ever been imported
    pub fn is_imported(&self) -> bool {
        !self.imported_path.is_empty()
    }

    /// Stored fast metadata
    pub fn stamp(&self) -> FileStamp {
        FileStamp {
            mod_time: self.source_mod_time,
            size: self.source_size,
        }
    }

    /// Lower-cased extension of the source path
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.source_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit hash of a byte slice
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    fnv1a_update(FNV_OFFSET_BASIS, bytes)
}

fn fnv1a_update(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a 64 over the full content of a file.
///
/// Returns `None` if the file cannot be read. An empty file hashes to the FNV
/// offset basis, so "unreadable" and "empty" stay distinguishable.
pub fn compute_file_hash(path: impl AsRef<Path>) -> Option<u64> {
    let file = File::open(path.as_ref()).ok()?;
    let mut reader = BufReader::new(file);
    let mut buf = [0u8; 64 * 1024];
    let mut hash = FNV_OFFSET_BASIS;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Some(hash),
            Ok(n) => hash = fnv1a_update(hash, &buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }
}

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
