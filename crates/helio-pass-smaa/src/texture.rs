//! CPU-resident textures described with wgpu formats
//!
//! Every write is quantized to the texture's format, so a `Rgba8Unorm` target
//! holds exactly the values a GPU render target of that format would.

use crate::{Error, Result};
use glam::Vec4;
use half::f16;
use std::borrow::Cow;

/// Usage of every intermediate the SMAA chain renders into
pub const RENDER_TARGET_USAGE: wgpu::TextureUsages =
    wgpu::TextureUsages::TEXTURE_BINDING.union(wgpu::TextureUsages::RENDER_ATTACHMENT);

/// Texture description, also the key used for pooling
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            usage: RENDER_TARGET_USAGE,
        }
    }

    pub fn with_usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage = usage;
        self
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reject empty extents and formats with no CPU encoding
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidInput(format!(
                "texture extent {}x{} is empty",
                self.width, self.height
            )));
        }
        Encoding::of(self.format).map(|_| ())
    }
}

// ── Format encodings ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Unorm8 { channels: u8 },
    Srgb8,
    Unorm1010102,
    Float16 { channels: u8 },
    Float32 { channels: u8 },
}

impl Encoding {
    fn of(format: wgpu::TextureFormat) -> Result<Self> {
        use wgpu::TextureFormat as F;
        Ok(match format {
            F::R8Unorm => Encoding::Unorm8 { channels: 1 },
            F::Rg8Unorm => Encoding::Unorm8 { channels: 2 },
            F::Rgba8Unorm | F::Bgra8Unorm => Encoding::Unorm8 { channels: 4 },
            F::Rgba8UnormSrgb | F::Bgra8UnormSrgb => Encoding::Srgb8,
            F::Rgb10a2Unorm => Encoding::Unorm1010102,
            F::R16Float => Encoding::Float16 { channels: 1 },
            F::Rgba16Float => Encoding::Float16 { channels: 4 },
            F::R32Float | F::Depth32Float => Encoding::Float32 { channels: 1 },
            F::Rgba32Float => Encoding::Float32 { channels: 4 },
            other => return Err(Error::UnsupportedFormat(other)),
        })
    }

    fn channels(self) -> u8 {
        match self {
            Encoding::Unorm8 { channels }
            | Encoding::Float16 { channels }
            | Encoding::Float32 { channels } => channels,
            Encoding::Srgb8 | Encoding::Unorm1010102 => 4,
        }
    }

    fn is_byte_addressable(self) -> bool {
        matches!(self, Encoding::Unorm8 { .. } | Encoding::Srgb8)
    }

    /// Missing channels read back as (0, 0, 0, 1), like a sampled GPU texture
    fn quantize(self, v: Vec4) -> Vec4 {
        let v = match self.channels() {
            1 => Vec4::new(v.x, 0.0, 0.0, 1.0),
            2 => Vec4::new(v.x, v.y, 0.0, 1.0),
            _ => v,
        };
        match self {
            Encoding::Unorm8 { .. } => Vec4::new(
                unorm(v.x, 255.0),
                unorm(v.y, 255.0),
                unorm(v.z, 255.0),
                unorm(v.w, 255.0),
            ),
            Encoding::Srgb8 => Vec4::new(
                srgb8(v.x),
                srgb8(v.y),
                srgb8(v.z),
                unorm(v.w, 255.0),
            ),
            Encoding::Unorm1010102 => Vec4::new(
                unorm(v.x, 1023.0),
                unorm(v.y, 1023.0),
                unorm(v.z, 1023.0),
                unorm(v.w, 3.0),
            ),
            Encoding::Float16 { .. } => Vec4::new(
                f16::from_f32(v.x).to_f32(),
                f16::from_f32(v.y).to_f32(),
                f16::from_f32(v.z).to_f32(),
                f16::from_f32(v.w).to_f32(),
            ),
            Encoding::Float32 { .. } => v,
        }
    }
}

fn unorm(v: f32, max: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    (v.clamp(0.0, 1.0) * max).round() / max
}

fn srgb8(linear: f32) -> f32 {
    let encoded = unorm(linear_to_srgb(linear), 255.0);
    srgb_to_linear(encoded)
}

pub fn linear_to_srgb(l: f32) -> f32 {
    let l = if l.is_nan() { 0.0 } else { l.clamp(0.0, 1.0) };
    if l <= 0.003_130_8 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

pub fn srgb_to_linear(s: f32) -> f32 {
    if s <= 0.040_45 {
        s / 12.92
    } else {
        ((s + 0.055) / 1.055).powf(2.4)
    }
}

// ── Texture ──────────────────────────────────────────────────────────────────

/// A 2D texture whose texels live in host memory
#[derive(Clone, Debug)]
pub struct Texture {
    label: String,
    desc: TextureDesc,
    encoding: Encoding,
    texels: Vec<Vec4>,
}

impl Texture {
    /// Create a texture cleared to zero
    pub fn new(label: impl Into<String>, desc: TextureDesc) -> Result<Self> {
        desc.validate()?;
        let encoding = Encoding::of(desc.format)?;
        Ok(Self {
            label: label.into(),
            desc,
            encoding,
            texels: vec![encoding.quantize(Vec4::ZERO); desc.texel_count()],
        })
    }

    /// Create a texture by evaluating `f` at every texel
    pub fn from_fn(
        label: impl Into<String>,
        desc: TextureDesc,
        mut f: impl FnMut(u32, u32) -> Vec4,
    ) -> Result<Self> {
        let mut texture = Self::new(label, desc)?;
        for y in 0..desc.height {
            for x in 0..desc.width {
                texture.store(x, y, f(x, y));
            }
        }
        Ok(texture)
    }

    /// Create a texture from tightly packed RGBA8 bytes in logical channel order
    ///
    /// Only 8-bit formats accept bytes; sRGB formats decode them to linear.
    pub fn from_rgba8(label: impl Into<String>, desc: TextureDesc, bytes: &[u8]) -> Result<Self> {
        desc.validate()?;
        let encoding = Encoding::of(desc.format)?;
        if !encoding.is_byte_addressable() {
            return Err(Error::UnsupportedFormat(desc.format));
        }
        if bytes.len() != desc.texel_count() * 4 {
            return Err(Error::InvalidInput(format!(
                "expected {} bytes for a {}x{} RGBA8 image, got {}",
                desc.texel_count() * 4,
                desc.width,
                desc.height,
                bytes.len()
            )));
        }

        let texels = bytes
            .chunks_exact(4)
            .map(|px| {
                let c = Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0;
                let c = if encoding == Encoding::Srgb8 {
                    Vec4::new(srgb_to_linear(c.x), srgb_to_linear(c.y), srgb_to_linear(c.z), c.w)
                } else {
                    c
                };
                encoding.quantize(c)
            })
            .collect();

        Ok(Self {
            label: label.into(),
            desc,
            encoding,
            texels,
        })
    }

    /// Encode as RGBA8 bytes; float formats are clamped to [0, 1]
    pub fn to_rgba8(&self) -> Vec<u8> {
        let byte = |v: f32| if v.is_nan() { 0 } else { (v.clamp(0.0, 1.0) * 255.0).round() as u8 };
        let mut out = Vec::with_capacity(self.texels.len() * 4);
        for t in &self.texels {
            if self.encoding == Encoding::Srgb8 {
                out.extend_from_slice(&[
                    byte(linear_to_srgb(t.x)),
                    byte(linear_to_srgb(t.y)),
                    byte(linear_to_srgb(t.z)),
                    byte(t.w),
                ]);
            } else {
                out.extend_from_slice(&[byte(t.x), byte(t.y), byte(t.z), byte(t.w)]);
            }
        }
        out
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.desc.format
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        self.desc.extent()
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.desc.width && (y as u32) < self.desc.height
    }

    /// Texel at an in-range coordinate
    pub fn load(&self, x: u32, y: u32) -> Vec4 {
        debug_assert!(x < self.desc.width && y < self.desc.height);
        self.texels[(y * self.desc.width + x) as usize]
    }

    /// Texel at a possibly out-of-range coordinate
    pub fn fetch(&self, x: i32, y: i32) -> Option<Vec4> {
        self.contains(x, y).then(|| self.load(x as u32, y as u32))
    }

    /// Texel with clamp-to-edge addressing
    pub fn load_clamped(&self, x: i32, y: i32) -> Vec4 {
        let x = x.clamp(0, self.desc.width as i32 - 1) as u32;
        let y = y.clamp(0, self.desc.height as i32 - 1) as u32;
        self.load(x, y)
    }

    /// Write a texel, quantized to the texture format
    pub fn store(&mut self, x: u32, y: u32, value: Vec4) {
        debug_assert!(x < self.desc.width && y < self.desc.height);
        let index = (y * self.desc.width + x) as usize;
        self.texels[index] = self.encoding.quantize(value);
    }

    /// Relabel and clear for reuse by a later pass
    pub fn reset(&mut self, label: impl Into<String>) {
        self.label = label.into();
        let clear = self.encoding.quantize(Vec4::ZERO);
        self.texels.iter_mut().for_each(|t| *t = clear);
    }
}

// ── Screen-pass views ────────────────────────────────────────────────────────

/// Sub-rectangle of a texture that holds the rendered view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// The whole extent of a texture
    pub fn full(desc: &TextureDesc) -> Self {
        Self::new(0, 0, desc.width, desc.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(&self, desc: &TextureDesc) -> bool {
        self.x as u64 + self.width as u64 <= desc.width as u64
            && self.y as u64 + self.height as u64 <= desc.height as u64
    }
}

/// A texture plus the view rectangle the post-process chain operates on
///
/// Inputs are borrowed from the host; pass outputs are owned. Passing an input
/// through unchanged keeps it borrowed, so identity is observable.
#[derive(Debug, Clone)]
pub struct ScreenPassTexture<'a> {
    pub texture: Cow<'a, Texture>,
    pub view_rect: ViewRect,
}

impl<'a> ScreenPassTexture<'a> {
    pub fn new(texture: &'a Texture, view_rect: ViewRect) -> Self {
        Self {
            texture: Cow::Borrowed(texture),
            view_rect,
        }
    }

    /// Borrow a texture with a view rect covering all of it
    pub fn full(texture: &'a Texture) -> Self {
        Self::new(texture, ViewRect::full(texture.desc()))
    }

    pub fn owned(texture: Texture, view_rect: ViewRect) -> ScreenPassTexture<'static> {
        ScreenPassTexture {
            texture: Cow::Owned(texture),
            view_rect,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.texture, Cow::Borrowed(_))
    }

    /// A non-empty view rect inside the texture
    pub fn is_valid(&self) -> bool {
        !self.view_rect.is_empty() && self.view_rect.fits_within(self.texture.desc())
    }

    pub fn into_texture(self) -> Texture {
        self.texture.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn test_unorm8_quantizes_to_byte_steps() {
        let mut tex = Texture::new("q", TextureDesc::new(1, 1, TextureFormat::Rgba8Unorm)).unwrap();
        tex.store(0, 0, Vec4::new(0.5, 1.7, -0.2, 0.1));
        let t = tex.load(0, 0);
        assert_eq!(t.x, 128.0 / 255.0);
        assert_eq!(t.y, 1.0);
        assert_eq!(t.z, 0.0);
        assert_eq!(t.w, 26.0 / 255.0);
    }

    #[test]
    fn test_single_channel_reads_back_opaque() {
        let mut tex = Texture::new("r", TextureDesc::new(2, 1, TextureFormat::R8Unorm)).unwrap();
        tex.store(1, 0, Vec4::new(1.0, 1.0, 1.0, 0.0));
        assert_eq!(tex.load(0, 0), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(tex.load(1, 0), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_half_float_rounding() {
        let mut tex = Texture::new("h", TextureDesc::new(1, 1, TextureFormat::Rgba16Float)).unwrap();
        tex.store(0, 0, Vec4::splat(0.1));
        assert_eq!(tex.load(0, 0).x, f16::from_f32(0.1).to_f32());
        assert_ne!(tex.load(0, 0).x, 0.1);
    }

    #[test]
    fn test_srgb_bytes_survive_round_trip() {
        let desc = TextureDesc::new(2, 1, TextureFormat::Rgba8UnormSrgb);
        let bytes = [10u8, 128, 250, 255, 0, 77, 3, 128];
        let tex = Texture::from_rgba8("s", desc, &bytes).unwrap();
        assert_eq!(tex.to_rgba8(), bytes.to_vec());
        // Mid-grey sRGB decodes to roughly 21.6% linear
        assert!((tex.load(0, 0).y - 0.2158).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_empty_and_unsupported() {
        assert!(matches!(
            Texture::new("e", TextureDesc::new(0, 4, TextureFormat::Rgba8Unorm)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Texture::new("u", TextureDesc::new(4, 4, TextureFormat::Bc1RgbaUnorm)),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(Texture::from_rgba8("f", TextureDesc::new(1, 1, TextureFormat::Rgba16Float), &[0; 4]).is_err());
        assert!(Texture::from_rgba8("n", TextureDesc::new(2, 2, TextureFormat::Rgba8Unorm), &[0; 4]).is_err());
    }

    #[test]
    fn test_fetch_and_clamp_addressing() {
        let tex = Texture::from_fn("f", TextureDesc::new(3, 2, TextureFormat::R32Float), |x, y| {
            Vec4::splat((x + 10 * y) as f32)
        })
        .unwrap();
        assert_eq!(tex.fetch(-1, 0), None);
        assert_eq!(tex.fetch(2, 1).map(|t| t.x), Some(12.0));
        assert_eq!(tex.load_clamped(7, -3).x, 2.0);
    }

    #[test]
    fn test_reset_clears_contents() {
        let mut tex = Texture::from_fn("a", TextureDesc::new(2, 2, TextureFormat::Rgba8Unorm), |_, _| Vec4::ONE).unwrap();
        tex.reset("b");
        assert_eq!(tex.label(), "b");
        assert!(tex.texels().iter().all(|t| *t == Vec4::ZERO));
    }

    #[test]
    fn test_screen_pass_identity() {
        let tex = Texture::new("c", TextureDesc::new(4, 4, TextureFormat::Rgba8Unorm)).unwrap();
        let view = ScreenPassTexture::new(&tex, ViewRect::new(1, 1, 3, 3));
        assert!(view.is_borrowed());
        assert!(view.is_valid());
        assert!(std::ptr::eq(view.texture(), &tex));
        assert!(!ScreenPassTexture::new(&tex, ViewRect::new(2, 0, 3, 1)).is_valid());
    }
}
