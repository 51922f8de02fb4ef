/// Pixel formats and conversions over raw byte buffers.
///
/// Channel order conventions:
/// - 8-bit-per-channel formats are named in memory order: `R8G8B8A8` stores
///   the bytes R, G, B, A; `A8R8G8B8` stores A, R, G, B. `X` bytes are padding.
/// - 16-bit formats are little-endian `u16` words, named from the most
///   significant bits down: `R5G6B5` keeps red in bits 11..16.
/// - `FloatR32G32B32A32` is four native-endian `f32` values.

use glam::Vec4;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    L8,
    A8,
    R5G6B5,
    B5G6R5,
    A4R4G4B4,
    R8G8B8,
    B8G8R8,
    X8R8G8B8,
    X8B8G8R8,
    A8R8G8B8,
    A8B8G8R8,
    B8G8R8A8,
    R8G8B8A8,
    FloatR32G32B32A32,
}

/// Byte offsets of the channels of an 8-bit-per-channel format.
#[derive(Debug, Clone, Copy)]
struct ByteLayout {
    r: usize,
    g: usize,
    b: usize,
    a: Option<usize>,
}

/// `(shift, bits)` of each channel of a packed 16-bit format; 0 bits = absent.
type PackedLayout = [(u32, u32); 4];

impl PixelFormat {
    pub const ALL: [PixelFormat; 14] = [
        PixelFormat::L8,
        PixelFormat::A8,
        PixelFormat::R5G6B5,
        PixelFormat::B5G6R5,
        PixelFormat::A4R4G4B4,
        PixelFormat::R8G8B8,
        PixelFormat::B8G8R8,
        PixelFormat::X8R8G8B8,
        PixelFormat::X8B8G8R8,
        PixelFormat::A8R8G8B8,
        PixelFormat::A8B8G8R8,
        PixelFormat::B8G8R8A8,
        PixelFormat::R8G8B8A8,
        PixelFormat::FloatR32G32B32A32,
    ];

    /// Bytes per pixel.
    pub fn num_elem_bytes(self) -> usize {
        match self {
            PixelFormat::L8 | PixelFormat::A8 => 1,
            PixelFormat::R5G6B5 | PixelFormat::B5G6R5 | PixelFormat::A4R4G4B4 => 2,
            PixelFormat::R8G8B8 | PixelFormat::B8G8R8 => 3,
            PixelFormat::X8R8G8B8
            | PixelFormat::X8B8G8R8
            | PixelFormat::A8R8G8B8
            | PixelFormat::A8B8G8R8
            | PixelFormat::B8G8R8A8
            | PixelFormat::R8G8B8A8 => 4,
            PixelFormat::FloatR32G32B32A32 => 16,
        }
    }

    pub fn num_elem_bits(self) -> u32 {
        self.num_elem_bytes() as u32 * 8
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::A8
                | PixelFormat::A4R4G4B4
                | PixelFormat::A8R8G8B8
                | PixelFormat::A8B8G8R8
                | PixelFormat::B8G8R8A8
                | PixelFormat::R8G8B8A8
                | PixelFormat::FloatR32G32B32A32
        )
    }

    pub fn is_luminance(self) -> bool {
        self == PixelFormat::L8
    }

    pub fn is_float(self) -> bool {
        self == PixelFormat::FloatR32G32B32A32
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::L8 => "L8",
            PixelFormat::A8 => "A8",
            PixelFormat::R5G6B5 => "R5G6B5",
            PixelFormat::B5G6R5 => "B5G6R5",
            PixelFormat::A4R4G4B4 => "A4R4G4B4",
            PixelFormat::R8G8B8 => "R8G8B8",
            PixelFormat::B8G8R8 => "B8G8R8",
            PixelFormat::X8R8G8B8 => "X8R8G8B8",
            PixelFormat::X8B8G8R8 => "X8B8G8R8",
            PixelFormat::A8R8G8B8 => "A8R8G8B8",
            PixelFormat::A8B8G8R8 => "A8B8G8R8",
            PixelFormat::B8G8R8A8 => "B8G8R8A8",
            PixelFormat::R8G8B8A8 => "R8G8B8A8",
            PixelFormat::FloatR32G32B32A32 => "FloatR32G32B32A32",
        }
    }

    /// 16-bit equivalent used when textures are loaded at 16 bits per pixel.
    ///
    /// Formats without a 16-bit counterpart are returned unchanged.
    pub fn downgrade_to_16bit(self) -> PixelFormat {
        match self {
            PixelFormat::R8G8B8 | PixelFormat::X8R8G8B8 => PixelFormat::R5G6B5,
            PixelFormat::B8G8R8 | PixelFormat::X8B8G8R8 => PixelFormat::B5G6R5,
            PixelFormat::A8R8G8B8
            | PixelFormat::R8G8B8A8
            | PixelFormat::A8B8G8R8
            | PixelFormat::B8G8R8A8 => PixelFormat::A4R4G4B4,
            other => other,
        }
    }

    fn byte_layout(self) -> Option<ByteLayout> {
        let layout = |r, g, b, a| Some(ByteLayout { r, g, b, a });
        match self {
            PixelFormat::R8G8B8 => layout(0, 1, 2, None),
            PixelFormat::B8G8R8 => layout(2, 1, 0, None),
            PixelFormat::X8R8G8B8 => layout(1, 2, 3, None),
            PixelFormat::X8B8G8R8 => layout(3, 2, 1, None),
            PixelFormat::A8R8G8B8 => layout(1, 2, 3, Some(0)),
            PixelFormat::A8B8G8R8 => layout(3, 2, 1, Some(0)),
            PixelFormat::B8G8R8A8 => layout(2, 1, 0, Some(3)),
            PixelFormat::R8G8B8A8 => layout(0, 1, 2, Some(3)),
            _ => None,
        }
    }

    fn packed_layout(self) -> Option<PackedLayout> {
        match self {
            PixelFormat::R5G6B5 => Some([(11, 5), (5, 6), (0, 5), (0, 0)]),
            PixelFormat::B5G6R5 => Some([(0, 5), (5, 6), (11, 5), (0, 0)]),
            PixelFormat::A4R4G4B4 => Some([(8, 4), (4, 4), (0, 4), (12, 4)]),
            _ => None,
        }
    }
}

/// Bytes needed for a `width × height × depth` block of `format`.
pub fn memory_size(width: u32, height: u32, depth: u32, format: PixelFormat) -> usize {
    width as usize * height as usize * depth as usize * format.num_elem_bytes()
}

// ===== PIXEL BOXES =====

/// Read-only view of a block of pixels.
#[derive(Debug, Clone, Copy)]
pub struct PixelBox<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> PixelBox<'a> {
    /// # Errors
    ///
    /// `InvalidArgument` if `data` is not exactly `memory_size` bytes.
    pub fn new(width: u32, height: u32, depth: u32, format: PixelFormat, data: &'a [u8]) -> Result<Self> {
        check_len(width, height, depth, format, data.len())?;
        Ok(Self { width, height, depth, format, data })
    }

    pub fn consecutive_size(&self) -> usize {
        memory_size(self.width, self.height, self.depth, self.format)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }
}

/// Writable view of a block of pixels.
#[derive(Debug)]
pub struct PixelBoxMut<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: PixelFormat,
    pub data: &'a mut [u8],
}

impl<'a> PixelBoxMut<'a> {
    /// # Errors
    ///
    /// `InvalidArgument` if `data` is not exactly `memory_size` bytes.
    pub fn new(width: u32, height: u32, depth: u32, format: PixelFormat, data: &'a mut [u8]) -> Result<Self> {
        check_len(width, height, depth, format, data.len())?;
        Ok(Self { width, height, depth, format, data })
    }

    pub fn as_pixel_box(&self) -> PixelBox<'_> {
        PixelBox {
            width: self.width,
            height: self.height,
            depth: self.depth,
            format: self.format,
            data: &self.data[..],
        }
    }
}

fn check_len(width: u32, height: u32, depth: u32, format: PixelFormat, len: usize) -> Result<()> {
    let expected = memory_size(width, height, depth, format);
    if len != expected {
        crate::engine_bail!("helios3d::PixelBox", InvalidArgument =>
            "{}x{}x{} {} needs {} bytes, got {}",
            width, height, depth, format.name(), expected, len);
    }
    Ok(())
}

// ===== CONVERSION =====

fn to_unorm(value: u32, bits: u32) -> f32 {
    value as f32 / ((1u32 << bits) - 1) as f32
}

fn from_unorm(value: f32, bits: u32) -> u32 {
    let max = ((1u32 << bits) - 1) as f32;
    (value.clamp(0.0, 1.0) * max + 0.5) as u32
}

/// Decode one pixel to RGBA in `[0, 1]` (floats are passed through).
///
/// Missing colour channels read as 0, a missing alpha as 1.
pub fn unpack_color(src: &[u8], format: PixelFormat) -> Vec4 {
    if let Some(layout) = format.byte_layout() {
        return Vec4::new(
            to_unorm(src[layout.r] as u32, 8),
            to_unorm(src[layout.g] as u32, 8),
            to_unorm(src[layout.b] as u32, 8),
            layout.a.map_or(1.0, |a| to_unorm(src[a] as u32, 8)),
        );
    }
    if let Some(layout) = format.packed_layout() {
        let word = u16::from_le_bytes([src[0], src[1]]) as u32;
        let channel = |(shift, bits): (u32, u32), absent: f32| {
            if bits == 0 {
                absent
            } else {
                to_unorm((word >> shift) & ((1 << bits) - 1), bits)
            }
        };
        return Vec4::new(
            channel(layout[0], 0.0),
            channel(layout[1], 0.0),
            channel(layout[2], 0.0),
            channel(layout[3], 1.0),
        );
    }
    match format {
        PixelFormat::L8 => {
            let l = to_unorm(src[0] as u32, 8);
            Vec4::new(l, l, l, 1.0)
        }
        PixelFormat::A8 => Vec4::new(0.0, 0.0, 0.0, to_unorm(src[0] as u32, 8)),
        _ => Vec4::from_array(bytemuck::pod_read_unaligned::<[f32; 4]>(&src[..16])),
    }
}

/// Encode RGBA into one pixel of `format`. Luminance takes the red channel.
pub fn pack_color(color: Vec4, dst: &mut [u8], format: PixelFormat) {
    if let Some(layout) = format.byte_layout() {
        if format.num_elem_bytes() == 4 && layout.a.is_none() {
            // Padding byte
            dst[0] = 0xFF;
        }
        dst[layout.r] = from_unorm(color.x, 8) as u8;
        dst[layout.g] = from_unorm(color.y, 8) as u8;
        dst[layout.b] = from_unorm(color.z, 8) as u8;
        if let Some(a) = layout.a {
            dst[a] = from_unorm(color.w, 8) as u8;
        }
        return;
    }
    if let Some(layout) = format.packed_layout() {
        let channels = [color.x, color.y, color.z, color.w];
        let word = layout
            .iter()
            .zip(channels)
            .filter(|((_, bits), _)| *bits > 0)
            .fold(0u32, |word, (&(shift, bits), value)| word | (from_unorm(value, bits) << shift));
        dst[..2].copy_from_slice(&(word as u16).to_le_bytes());
        return;
    }
    match format {
        PixelFormat::L8 => dst[0] = from_unorm(color.x, 8) as u8,
        PixelFormat::A8 => dst[0] = from_unorm(color.w, 8) as u8,
        _ => dst[..16].copy_from_slice(bytemuck::bytes_of(&color.to_array())),
    }
}

/// Convert `src` into `dst`, pixel by pixel.
///
/// # Errors
///
/// `InvalidArgument` if the boxes differ in size.
pub fn bulk_pixel_conversion(src: &PixelBox, dst: &mut PixelBoxMut) -> Result<()> {
    if (src.width, src.height, src.depth) != (dst.width, dst.height, dst.depth) {
        crate::engine_bail!("helios3d::PixelBox", InvalidArgument =>
            "Cannot convert {}x{}x{} pixels into a {}x{}x{} box",
            src.width, src.height, src.depth, dst.width, dst.height, dst.depth);
    }

    if src.format == dst.format {
        dst.data.copy_from_slice(src.data);
        return Ok(());
    }

    let src_bytes = src.format.num_elem_bytes();
    let dst_bytes = dst.format.num_elem_bytes();
    let dst_format = dst.format;
    for (src_pixel, dst_pixel) in src.data.chunks_exact(src_bytes).zip(dst.data.chunks_exact_mut(dst_bytes)) {
        pack_color(unpack_color(src_pixel, src.format), dst_pixel, dst_format);
    }
    Ok(())
}

/// Scale the colour bytes of every pixel by `gamma`, in place.
///
/// Only 24 and 32-bit formats with 8-bit channels are affected. When a
/// scaled channel would exceed 255 all three are scaled back together so the
/// hue is kept.
pub fn apply_gamma(buffer: &mut [u8], gamma: f32, format: PixelFormat) {
    if gamma == 1.0 {
        return;
    }
    let Some(layout) = format.byte_layout() else {
        return;
    };

    for pixel in buffer.chunks_exact_mut(format.num_elem_bytes()) {
        let r = pixel[layout.r] as f32 * gamma;
        let g = pixel[layout.g] as f32 * gamma;
        let b = pixel[layout.b] as f32 * gamma;

        let max = r.max(g).max(b);
        let scale = if max > 255.0 { 255.0 / max } else { 1.0 };

        pixel[layout.r] = (r * scale) as u8;
        pixel[layout.g] = (g * scale) as u8;
        pixel[layout.b] = (b * scale) as u8;
    }
}

#[cfg(test)]
#[path = "pixel_tests.rs"]
mod tests;
