//! Asset identity
//!
//! Every registered asset gets an [`AssetId`] that survives renames and moves.
//! The id is a random (v4) UUID minted once by the registry; the source path is
//! only an index into the registry, never part of the identity.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::fnv1a_64;

/// Unique, rename-stable identifier for an asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Mint a fresh random asset ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil ID, used as the "no asset" sentinel
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an ID from raw 128 bits
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Derive an ID from a path string.
    ///
    /// Kept for projects that still reference assets by path-derived ids. The
    /// result changes whenever the file is renamed or moved, so new assets
    /// should always use [`AssetId::new`].
    pub fn from_path_legacy(path: &str) -> Self {
        let normalized = path.replace('\\', "/");
        let lo = fnv1a_64(normalized.as_bytes());
        let hi = fnv1a_64(&lo.to_le_bytes());
        Self(Uuid::from_u128(((hi as u128) << 64) | lo as u128))
    }

    /// Check if this is a real ID (not nil)
    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }

    /// Underlying UUID
    pub const fn uuid(&self) -> Uuid {
        self.0
    }

    /// Raw 128-bit value
    pub const fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for AssetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique_and_valid() {
        let a = AssetId::new();
        let b = AssetId::new();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert!(!AssetId::nil().is_valid());
        assert_eq!(AssetId::default(), AssetId::nil());
    }

    #[test]
    fn test_text_form_is_canonical_uuid() {
        let id = AssetId::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let text = id.to_string();
        assert_eq!(text, "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(text.parse::<AssetId>().unwrap(), id);
        assert!("not-a-uuid".parse::<AssetId>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let id = AssetId::from_u128(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_legacy_id_is_deterministic_but_path_bound() {
        let a = AssetId::from_path_legacy("textures/a.png");
        assert_eq!(a, AssetId::from_path_legacy("textures/a.png"));
        assert_eq!(a, AssetId::from_path_legacy("textures\\a.png"));
        assert_ne!(a, AssetId::from_path_legacy("textures/b.png"));
    }
}
