use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use crate::error::AssetError;
use crate::scenario::Scenario;
use crate::timer::Millis;

/// Width and height of one sprite frame in the sheet.
pub const FRAME_SIZE: u32 = 32;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Resolves relative asset paths and inspects sprite sheets.
pub trait AssetResolver {
    fn resolve(&self, relative: &str) -> String;

    /// Pixel width of the image at a resolved URL.
    fn image_width(&self, url: &str) -> Result<u32, AssetError>;
}

/// Frame layout of one sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteInfo {
    pub frame_count: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl SpriteInfo {
    pub fn from_width(image_width: u32) -> Self {
        Self {
            frame_count: (image_width / FRAME_SIZE).max(1),
            frame_width: FRAME_SIZE,
            frame_height: FRAME_SIZE,
        }
    }

    /// Fallback when the sheet cannot be loaded.
    pub fn single_frame() -> Self {
        Self::from_width(FRAME_SIZE)
    }
}

/// A sprite sheet ready to play for one (skin, scenario) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub url: String,
    pub info: SpriteInfo,
    pub frame_interval: Millis,
}

/// Sheet lookups with a per-URL cache. Failed loads are cached as single-frame.
pub struct SpriteLibrary {
    assets: Box<dyn AssetResolver>,
    cache: HashMap<String, SpriteInfo>,
}

impl SpriteLibrary {
    pub fn new(assets: Box<dyn AssetResolver>) -> Self {
        Self {
            assets,
            cache: HashMap::new(),
        }
    }

    pub fn url_for(&self, skin: &str, scenario: Scenario) -> String {
        self.assets
            .resolve(&format!("assets/cats/{skin}/{}", scenario.sprite_file()))
    }

    pub fn sheet(&mut self, skin: &str, scenario: Scenario) -> SpriteSheet {
        let url = self.url_for(skin, scenario);
        let info = self.info(&url);
        SpriteSheet {
            url,
            info,
            frame_interval: scenario.frame_interval(),
        }
    }

    pub fn resolve(&self, relative: &str) -> String {
        self.assets.resolve(relative)
    }

    fn info(&mut self, url: &str) -> SpriteInfo {
        if let Some(info) = self.cache.get(url) {
            return *info;
        }
        let info = match self.assets.image_width(url) {
            Ok(width) => SpriteInfo::from_width(width),
            Err(e) => {
                log::warn!("Sprite load failed, using a single frame: {e}");
                SpriteInfo::single_frame()
            }
        };
        self.cache.insert(url.to_string(), info);
        info
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Assets read from a directory on disk.
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetResolver for DirAssets {
    fn resolve(&self, relative: &str) -> String {
        self.root.join(relative).to_string_lossy().into_owned()
    }

    fn image_width(&self, url: &str) -> Result<u32, AssetError> {
        let mut file = fs::File::open(url).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::Missing(url.to_string()),
            _ => AssetError::Unreadable {
                url: url.to_string(),
                source: e,
            },
        })?;
        let mut header = [0u8; 24];
        file.read_exact(&mut header)
            .map_err(|_| AssetError::NotPng(url.to_string()))?;
        png_width(&header).ok_or_else(|| AssetError::NotPng(url.to_string()))
    }
}

/// Width from a PNG header: signature, IHDR length + tag, then big-endian width.
fn png_width(header: &[u8]) -> Option<u32> {
    if header.len() < 24 || header[..8] != PNG_SIGNATURE || &header[12..16] != b"IHDR" {
        return None;
    }
    Some(u32::from_be_bytes([header[16], header[17], header[18], header[19]]))
}
