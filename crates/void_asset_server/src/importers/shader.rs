//! Shader importer for WGSL and GLSL sources
//!
//! The cooked artifact is JSON: the source text, its entry points, a content
//! hash and the includes it pulled in. Every `#include "path"` (or
//! `#import "path"`) that resolves to a registered asset becomes a dependency,
//! so `import_all_with_dependents` reimports every shader that uses an
//! edited header.

use serde::{Deserialize, Serialize};

use void_asset::{fnv1a_64, AssetError, AssetImporter, AssetResult, AssetType, ImportContext, ImportResult};

use super::resolve_reference;

/// Compiled shader ready for GPU upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShaderAsset {
    /// Shader source
    pub source: String,
    /// Entry points discovered
    pub entry_points: Vec<ShaderEntryPoint>,
    /// FNV-1a hash of the source
    pub hash: u64,
    /// Include paths as written in the source
    pub includes: Vec<String>,
}

/// Shader entry point info
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderEntryPoint {
    pub name: String,
    pub stage: ShaderStage,
}

/// Shader stage type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Stage implied by a GLSL file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "vert" => Some(Self::Vertex),
            "frag" => Some(Self::Fragment),
            "comp" => Some(Self::Compute),
            _ => None,
        }
    }
}

/// Per-asset shader settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShaderSettings {
    /// Fail the import when no entry point is found
    pub require_entry_point: bool,
}

/// Importer for shader sources
pub struct ShaderImporter;

impl ShaderImporter {
    /// Parse shader source bytes. `extension` selects GLSL stage detection.
    pub fn parse(data: &[u8], path: &str, extension: &str) -> AssetResult<ShaderAsset> {
        let source = std::str::from_utf8(data)
            .map_err(|e| AssetError::ImportFailed(format!("Invalid UTF-8 in shader {}: {}", path, e)))?
            .to_string();

        let entry_points = if extension == "wgsl" {
            Self::parse_entry_points(&source)
        } else {
            Self::parse_glsl_entry_point(&source, extension)
        };

        Ok(ShaderAsset {
            hash: fnv1a_64(source.as_bytes()),
            includes: Self::parse_includes(&source),
            entry_points,
            source,
        })
    }

    /// Parse @vertex, @fragment, @compute entry points from WGSL source
    fn parse_entry_points(source: &str) -> Vec<ShaderEntryPoint> {
        let mut entry_points = Vec::new();
        let lines: Vec<&str> = source.lines().collect();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            let stage = if trimmed.starts_with("@vertex") {
                ShaderStage::Vertex
            } else if trimmed.starts_with("@fragment") {
                ShaderStage::Fragment
            } else if trimmed.starts_with("@compute") {
                ShaderStage::Compute
            } else {
                continue;
            };

            // The function name is on the same line or the next one
            let search_text = if trimmed.contains("fn ") {
                trimmed
            } else if let Some(next) = lines.get(i + 1) {
                next
            } else {
                continue;
            };

            if let Some(name) = Self::extract_fn_name(search_text) {
                entry_points.push(ShaderEntryPoint {
                    name: name.to_string(),
                    stage,
                });
            }
        }

        entry_points
    }

    /// GLSL has a single `main`; the stage comes from the file extension
    fn parse_glsl_entry_point(source: &str, extension: &str) -> Vec<ShaderEntryPoint> {
        let has_main = source.lines().any(|line| {
            let line = line.trim();
            line.starts_with("void main") && line["void main".len()..].trim_start().starts_with('(')
        });
        match (has_main, ShaderStage::from_extension(extension)) {
            (true, Some(stage)) => vec![ShaderEntryPoint {
                name: "main".to_string(),
                stage,
            }],
            _ => vec![],
        }
    }

    /// Extract function name from a line containing "fn name("
    fn extract_fn_name(line: &str) -> Option<&str> {
        let fn_pos = line.find("fn ")?;
        let after_fn = &line[fn_pos + 3..];
        let name_end = after_fn.find('(')?;
        let name = after_fn[..name_end].trim();
        (!name.is_empty()).then_some(name)
    }

    /// Collect `#include "x"` / `#import "x"` / `#include <x>` targets
    fn parse_includes(source: &str) -> Vec<String> {
        let mut includes = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            let rest = match line
                .strip_prefix("#include")
                .or_else(|| line.strip_prefix("#import"))
            {
                Some(rest) => rest.trim(),
                None => continue,
            };
            let target = match rest.chars().next() {
                Some('"') => rest[1..].split('"').next(),
                Some('<') => rest[1..].split('>').next(),
                _ => None,
            };
            if let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) {
                if !includes.iter().any(|i| i == target) {
                    includes.push(target.to_string());
                }
            }
        }
        includes
    }

    fn cook(&self, ctx: &mut ImportContext<'_>) -> AssetResult<String> {
        let settings: ShaderSettings = ctx.settings()?;
        let data = ctx.read_source()?;
        let ext = ctx.extension().unwrap_or_default();
        let shader = Self::parse(&data, &ctx.metadata.source_path, &ext)?;

        if settings.require_entry_point && shader.entry_points.is_empty() {
            return Err(AssetError::ImportFailed(format!(
                "no entry point found in {}",
                ctx.metadata.source_path
            )));
        }

        ctx.track_dependencies();
        for include in &shader.includes {
            match resolve_reference(ctx, include) {
                Some((_, id)) => ctx.add_dependency(id),
                None => log::warn!(
                    "Unresolved include '{}' in {}",
                    include,
                    ctx.metadata.source_path
                ),
            }
        }

        let json = serde_json::to_vec_pretty(&shader)?;
        ctx.write_artifact("shader.json", &json)
    }
}

impl AssetImporter for ShaderImporter {
    fn asset_type(&self) -> AssetType {
        AssetType::Shader
    }

    fn supported_extensions(&self) -> &[&str] {
        &["wgsl", "glsl", "vert", "frag", "comp"]
    }

    fn import(&self, ctx: &mut ImportContext<'_>) -> ImportResult {
        self.cook(ctx).into()
    }
}
