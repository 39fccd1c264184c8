//! Precomputed lookup tables for the blending weight pass
//!
//! Tables are cached once loaded. Missing or malformed assets are
//! not fatal: the getters return `None` and the pipeline substitutes a neutral
//! 1x1 white table, which degrades quality but keeps the chain running.

pub mod bake;

use crate::texture::{Texture, TextureDesc};
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const AREA_TABLE_WIDTH: u32 = 160;
pub const AREA_TABLE_HEIGHT: u32 = 560;
pub const AREA_TABLE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg8Unorm;
pub const AREA_SUBTEXTURE_HEIGHT: u32 = 80;

/// Orthogonal patterns: 5x5 blocks of 16x16 texels addressed by sqrt(distance)
pub const ORTHO_BLOCK: u32 = 16;
/// Diagonal patterns: 4x4 blocks of 20x20 texels addressed by distance
pub const DIAG_BLOCK: u32 = 20;
pub const DIAG_OFFSET_X: u32 = 80;

pub const SEARCH_TABLE_SIZE: u32 = 4;
pub const SEARCH_TABLE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Asset paths relative to the table root
pub const AREA_TABLE_PATH: &str = "Textures/T_SMAA_AreaTex.png";
pub const SEARCH_TABLE_PATH: &str = "Textures/T_SMAA_SearchTex.png";

/// The two tables the blending weight pass consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Area,
    Search,
}

impl TableKind {
    pub fn label(self) -> &'static str {
        match self {
            TableKind::Area => "SMAA.AreaTex",
            TableKind::Search => "SMAA.SearchTex",
        }
    }

    pub fn relative_path(self) -> &'static str {
        match self {
            TableKind::Area => AREA_TABLE_PATH,
            TableKind::Search => SEARCH_TABLE_PATH,
        }
    }

    pub fn desc(self) -> TextureDesc {
        let usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        match self {
            TableKind::Area => {
                TextureDesc::new(AREA_TABLE_WIDTH, AREA_TABLE_HEIGHT, AREA_TABLE_FORMAT).with_usage(usage)
            }
            TableKind::Search => {
                TextureDesc::new(SEARCH_TABLE_SIZE, SEARCH_TABLE_SIZE, SEARCH_TABLE_FORMAT).with_usage(usage)
            }
        }
    }
}

/// Where a provider gets its tables from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// PNG assets under `<root>/Textures/`
    Directory(PathBuf),
    /// Generated in process
    Baked,
    /// No tables; the pipeline runs on the neutral fallback
    Unavailable,
}

/// Lookup table provider
///
/// Each table is cached on its first successful load. Until both are present,
/// every `load()` retries whichever is still missing.
pub struct LookupTables {
    source: TableSource,
    area: OnceCell<Texture>,
    search: OnceCell<Texture>,
    attempts: AtomicUsize,
}

impl LookupTables {
    pub fn new(source: TableSource) -> Self {
        Self {
            source,
            area: OnceCell::new(),
            search: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn from_directory(root: impl Into<PathBuf>) -> Self {
        Self::new(TableSource::Directory(root.into()))
    }

    pub fn baked() -> Self {
        Self::new(TableSource::Baked)
    }

    pub fn unavailable() -> Self {
        Self::new(TableSource::Unavailable)
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    /// Resolve any table not loaded yet; a no-op once both are present
    pub fn load(&self) {
        if self.is_loaded() {
            return;
        }
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;

        let mut missing = Vec::new();
        for (cell, kind) in [(&self.area, TableKind::Area), (&self.search, TableKind::Search)] {
            if let Err(e) = cell.get_or_try_init(|| self.resolve(kind)) {
                missing.push(format!("{}: {}", kind.label(), e));
            }
        }

        if missing.is_empty() {
            log::info!("SMAA lookup tables ready ({:?})", self.source);
        } else if attempt == 1 {
            log::warn!(
                "SMAA lookup tables incomplete ({:?}); using neutral fallback. {}",
                self.source,
                missing.join("; ")
            );
        } else {
            log::debug!("SMAA lookup tables still incomplete (attempt {}): {}", attempt, missing.join("; "));
        }
    }

    fn resolve(&self, kind: TableKind) -> Result<Texture> {
        match &self.source {
            TableSource::Directory(root) => {
                let path = root.join(kind.relative_path());
                let texture = load_table(&path, kind)?;
                log::debug!("Loaded {} from {}", kind.label(), path.display());
                Ok(texture)
            }
            TableSource::Baked => match kind {
                TableKind::Area => bake::area_table(),
                TableKind::Search => bake::search_table(),
            },
            TableSource::Unavailable => Err(Error::Asset("no table source configured".to_string())),
        }
    }

    /// The area table, if loaded
    pub fn area_table(&self) -> Option<&Texture> {
        self.area.get()
    }

    /// The search table, if loaded
    pub fn search_table(&self) -> Option<&Texture> {
        self.search.get()
    }

    /// True only when both tables are present
    pub fn is_loaded(&self) -> bool {
        self.area.get().is_some() && self.search.get().is_some()
    }

    /// How many `load()` calls had work to do
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// Decode a table image, converting it to the table format
///
/// The image must have the table's exact dimensions.
pub fn load_table(path: &Path, kind: TableKind) -> Result<Texture> {
    let image = image::open(path)?.to_rgba8();
    let desc = kind.desc();
    if image.dimensions() != (desc.width, desc.height) {
        return Err(Error::Asset(format!(
            "{} is {}x{}, expected {}x{}",
            path.display(),
            image.width(),
            image.height(),
            desc.width,
            desc.height
        )));
    }
    Texture::from_rgba8(kind.label(), desc, image.as_raw())
}

/// Encode a table as PNG (RGB for the area table, greyscale for the search table)
pub fn save_table(texture: &Texture, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let (width, height) = (texture.width(), texture.height());
    let rgba = texture.to_rgba8();

    match texture.format() {
        wgpu::TextureFormat::R8Unorm => {
            let luma: Vec<u8> = rgba.chunks_exact(4).map(|px| px[0]).collect();
            let image = image::GrayImage::from_raw(width, height, luma)
                .ok_or_else(|| Error::Asset("search table buffer size mismatch".to_string()))?;
            image.save(path)?;
        }
        _ => {
            let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
            let image = image::RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| Error::Asset("area table buffer size mismatch".to_string()))?;
            image.save(path)?;
        }
    }
    Ok(())
}

/// Bake both tables and write them under `root` at their asset paths
pub fn write_tables(root: &Path) -> Result<()> {
    let area = bake::area_table()?;
    let search = bake::search_table()?;
    save_table(&area, &root.join(AREA_TABLE_PATH))?;
    save_table(&search, &root.join(SEARCH_TABLE_PATH))?;
    log::info!("Wrote SMAA lookup tables to {}", root.display());
    Ok(())
}

/// 1x1 white stand-in for a missing table
pub fn neutral_table(kind: TableKind) -> Result<Texture> {
    let desc = TextureDesc::new(1, 1, kind.desc().format).with_usage(kind.desc().usage);
    Texture::from_fn(format!("{}.Fallback", kind.label()), desc, |_, _| glam::Vec4::ONE)
}
