use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub host: String,
    pub host_version: String,
    pub bridge_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Rgb,
    Cmyk,
    Unknown,
}

/// What a text region reports when probed for its internal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionEncoding {
    Current,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionLevel {
    DisplayAlerts,
    DontDisplayAlerts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    Illustrator10,
    Illustrator13,
    Illustrator16,
    Illustrator17,
    Illustrator24,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverprintMode {
    Preserve,
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpsSaveOptions {
    pub embed_all_fonts: bool,
    pub include_thumbnails: bool,
    pub compatibility_level: Compatibility,
    pub overprint_mode: OverprintMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSaveOptions {
    pub pdf_compatible: bool,
    pub embed_color_profile: bool,
    pub compatibility_level: Compatibility,
}

/// Fresh save options handed to `Engine::save_as`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum FormatOptions {
    Eps(EpsSaveOptions),
    Native(NativeSaveOptions),
}

impl FormatOptions {
    pub fn eps(compatibility_level: Compatibility) -> Self {
        Self::Eps(EpsSaveOptions {
            embed_all_fonts: true,
            include_thumbnails: true,
            compatibility_level,
            overprint_mode: OverprintMode::Preserve,
        })
    }

    pub fn native(compatibility_level: Compatibility) -> Self {
        Self::Native(NativeSaveOptions {
            pdf_compatible: true,
            embed_color_profile: true,
            compatibility_level,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BridgeRequest<'a> {
    pub id: u64,
    pub cmd: &'a str,
    #[serde(flatten)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
