//! Audio importer
//!
//! Audio is not transcoded. The source bytes are copied to `<id>.audio` after
//! the container is checked against its magic bytes, and a JSON sidecar
//! `<id>.audio.json` records the format (plus channel layout for WAV).

use serde::{Deserialize, Serialize};

use void_asset::{AssetError, AssetImporter, AssetResult, AssetType, ImportContext, ImportResult};

/// Audio container format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Ogg,
    Flac,
    Mp3,
}

impl AudioFormat {
    /// Detect the container from its leading bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            Some(Self::Wav)
        } else if data.starts_with(b"OggS") {
            Some(Self::Ogg)
        } else if data.starts_with(b"fLaC") {
            Some(Self::Flac)
        } else if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0) {
            Some(Self::Mp3)
        } else {
            None
        }
    }

    /// Format normally stored under this extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "wav" => Some(Self::Wav),
            "ogg" => Some(Self::Ogg),
            "flac" => Some(Self::Flac),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }
}

/// Description written next to the copied audio data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub format: AudioFormat,
    /// Channel count (WAV only, 0 otherwise)
    pub channels: u16,
    /// Samples per second (WAV only, 0 otherwise)
    pub sample_rate: u32,
    /// Bits per sample (WAV only, 0 otherwise)
    pub bits_per_sample: u16,
    /// Size of the copied data in bytes
    pub byte_len: u64,
}

impl AudioInfo {
    /// Inspect audio bytes
    pub fn inspect(data: &[u8], path: &str) -> AssetResult<Self> {
        let format = AudioFormat::detect(data)
            .ok_or_else(|| AssetError::ImportFailed(format!("Unrecognized audio data in {}", path)))?;

        let mut info = Self {
            format,
            channels: 0,
            sample_rate: 0,
            bits_per_sample: 0,
            byte_len: data.len() as u64,
        };
        if format == AudioFormat::Wav {
            info.read_wav_format(data, path)?;
        }
        Ok(info)
    }

    /// Walk RIFF chunks until `fmt `
    fn read_wav_format(&mut self, data: &[u8], path: &str) -> AssetResult<()> {
        let mut pos = 12;
        while pos + 8 <= data.len() {
            let id = &data[pos..pos + 4];
            let len = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]) as usize;
            let body = pos + 8;

            if id == b"fmt " {
                if len < 16 || body + 16 > data.len() {
                    break;
                }
                let fmt = &data[body..body + 16];
                self.channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                self.sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                self.bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
                return Ok(());
            }

            // Chunks are padded to even length
            pos = body.saturating_add(len).saturating_add(len & 1);
        }
        Err(AssetError::ImportFailed(format!("WAV file {} has no valid fmt chunk", path)))
    }
}

/// Importer for audio clips
pub struct AudioImporter;

impl AudioImporter {
    fn cook(&self, ctx: &ImportContext<'_>) -> AssetResult<String> {
        let data = ctx.read_source()?;
        let info = AudioInfo::inspect(&data, &ctx.metadata.source_path)?;

        let expected = ctx.extension().as_deref().and_then(AudioFormat::from_extension);
        if expected.is_some_and(|f| f != info.format) {
            log::warn!(
                "{} contains {:?} data despite its extension",
                ctx.metadata.source_path,
                info.format
            );
        }

        ctx.write_artifact("audio.json", &serde_json::to_vec_pretty(&info)?)?;
        ctx.write_artifact("audio", &data)
    }
}

impl AssetImporter for AudioImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Audio
    }

    fn supported_extensions(&self) -> &[&str] {
        &["wav", "ogg", "flac", "mp3"]
    }

    fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult {
        self.cook(ctx).into()
    }
}
