//! Types related to lightmaps and the light grid.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use image::{Rgb, RgbImage};
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	reader::{BspByteReader, BspParseContext, BspValue},
	BspResult,
};

/// The maximum number of lightmaps a face, vertex, or light volume can blend between.
pub const MAX_LIGHTMAPS: usize = 4;

/// Width and height of a single lightmap page.
pub const LIGHTMAP_SIZE: u32 = 128;
/// Number of bytes in a single lightmap page, `LIGHTMAP_SIZE²` RGB texels.
pub const LIGHTMAP_BYTES: usize = (LIGHTMAP_SIZE * LIGHTMAP_SIZE * 3) as usize;

/// Brightness factor Quake 3 derived games apply to lightmaps, which are stored darkened to leave room for overbright.
pub const LIGHTMAP_GAMMA: f32 = 5.0;

/// Byte that dictates how a specific BSP lightmap appears:
/// - 255 means there is no lightmap.
/// - 0 means normal, unanimated lightmap.
/// - 1 through 254 are styles defined by the game, usually flickering or switchable lights.
///
/// It is recommended to compare these values via the provided methods and constants of this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightmapStyle(pub u8);

impl LightmapStyle {
	/// Unanimated lightmap.
	pub const NORMAL: Self = Self(0);
	/// No lightmap.
	pub const NONE: Self = Self(u8::MAX);
}

impl BspValue for LightmapStyle {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read().map(Self)
	}

	#[inline]
	fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
		1
	}
}

impl std::fmt::Display for LightmapStyle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.0 {
			0 => write!(f, "0 (normal)"),
			255 => write!(f, "255 (no lightmap)"),
			n => n.fmt(f),
		}
	}
}

/// Index of the [`BspLightMap`] a face samples from. Negative values are special cases, see the associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightmapId(pub i32);

impl LightmapId {
	/// No lightmap in this slot.
	pub const NONE: Self = Self(-1);
	/// Lit with a fullbright white image.
	pub const WHITE_IMAGE: Self = Self(-2);
	/// Lit with vertex colors.
	pub const BY_VERTEX: Self = Self(-3);
	/// Drawn as a 2D overlay, unlit.
	pub const TWO_D: Self = Self(-4);

	/// The index into [`BspData::lightmaps`](crate::BspData::lightmaps), if this refers to an actual lightmap.
	#[inline]
	pub fn index(self) -> Option<usize> {
		usize::try_from(self.0).ok()
	}
}

impl Default for LightmapId {
	fn default() -> Self {
		Self::NONE
	}
}

impl BspValue for LightmapId {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read().map(Self)
	}

	#[inline]
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		i32::bsp_struct_size(ctx)
	}
}

/// A single 128x128 RGB lightmap page. Faces address a rectangle of it through their lightmap coordinates.
#[derive(Clone, PartialEq, Eq)]
pub struct BspLightMap {
	pub texels: Box<[u8; LIGHTMAP_BYTES]>,
}

impl BspValue for BspLightMap {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		let mut texels = Box::new([0; LIGHTMAP_BYTES]);
		texels.copy_from_slice(reader.read_bytes(LIGHTMAP_BYTES)?);
		Ok(Self { texels })
	}

	#[inline]
	fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
		LIGHTMAP_BYTES
	}
}

impl BspLightMap {
	/// Returns the texel at the specified coordinates, or `None` if out of bounds.
	#[inline]
	pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
		if x >= LIGHTMAP_SIZE || y >= LIGHTMAP_SIZE {
			return None;
		}
		let i = ((y * LIGHTMAP_SIZE + x) * 3) as usize;
		Some([self.texels[i], self.texels[i + 1], self.texels[i + 2]])
	}

	/// Multiplies every channel by `factor`, clamping to 255.
	pub fn apply_gamma(&mut self, factor: f32) {
		for channel in self.texels.iter_mut() {
			*channel = (*channel as f32 * factor).min(u8::MAX as f32) as u8;
		}
	}

	/// Copy of this lightmap with [`LIGHTMAP_GAMMA`] applied, the way the games display it.
	pub fn gamma_corrected(&self) -> Self {
		let mut lightmap = self.clone();
		lightmap.apply_gamma(LIGHTMAP_GAMMA);
		lightmap
	}

	pub fn to_image(&self) -> RgbImage {
		RgbImage::from_fn(LIGHTMAP_SIZE, LIGHTMAP_SIZE, |x, y| {
			let i = ((y * LIGHTMAP_SIZE + x) * 3) as usize;
			Rgb([self.texels[i], self.texels[i + 1], self.texels[i + 2]])
		})
	}
}

impl std::fmt::Debug for BspLightMap {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "BspLightMap(...) (len: {})", self.texels.len())
	}
}

/// A sample of the light grid, used to light models moving through the world.
#[derive(BspValue, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspLightVolume {
	pub ambient: [[u8; 3]; MAX_LIGHTMAPS],
	pub directional: [[u8; 3]; MAX_LIGHTMAPS],
	pub styles: [LightmapStyle; MAX_LIGHTMAPS],
	/// Direction to the light as spherical coordinates (phi, theta), each scaled to 0..256.
	pub direction: [u8; 2],
}
