//! Data definitions for materials, their surface/content flags, and fog volumes.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use bitflags::bitflags;
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	data::util::FixedStr,
	reader::{BspByteReader, BspParseContext, BspValue},
	BspResult,
};

/// A material (shader) reference. Faces, brushes and brush sides point into the texture lump by index.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspTexture {
	/// Shader name, e.g. `textures/base_wall/concrete`.
	pub name: FixedStr<64>,
	pub surface_flags: SurfaceFlags,
	pub content_flags: ContentFlags,
}

impl BspTexture {
	/// Returns `true` if surfaces using this material shouldn't be drawn at all.
	#[inline]
	pub fn is_no_draw(&self) -> bool {
		self.surface_flags.contains(SurfaceFlags::NODRAW)
	}
}

bitflags! {
	/// Surface flags as written by q3map and its derivatives. Unknown bits are kept as-is.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
	#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
	#[repr(transparent)]
	#[cfg_attr(feature = "bevy_reflect", reflect(opaque))]
	pub struct SurfaceFlags: u32 {
		/// Never give falling damage.
		const NODAMAGE = 0x1;
		/// Affects game physics.
		const SLICK = 0x2;
		/// Lighting from environment map.
		const SKY = 0x4;
		/// Climbable.
		const LADDER = 0x8;
		/// Don't make missile explosions.
		const NOIMPACT = 0x10;
		/// Don't leave missile marks.
		const NOMARKS = 0x20;
		/// Make flesh sounds and effects.
		const FLESH = 0x40;
		/// Don't generate a drawsurface at all.
		const NODRAW = 0x80;
		/// Make a primary bsp splitter.
		const HINT = 0x100;
		/// Completely ignore, allowing non-closed brushes.
		const SKIP = 0x200;
		/// Surface doesn't need a lightmap.
		const NOLIGHTMAP = 0x400;
		/// Generate lighting info at vertices.
		const POINTLIGHT = 0x800;
		/// Clanking footsteps.
		const METALSTEPS = 0x1000;
		/// No footstep sounds.
		const NOSTEPS = 0x2000;
		/// Don't collide against curves with this set.
		const NONSOLID = 0x4000;
		/// Act as a light filter during q3map -light.
		const LIGHTFILTER = 0x8000;
		/// Do per-pixel light shadow casting in q3map.
		const ALPHASHADOW = 0x10000;
		/// Don't dlight even if solid (solid lava, skies).
		const NODLIGHT = 0x20000;
		const DUST = 0x40000;
	}
}

impl BspValue for SurfaceFlags {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read().map(Self::from_bits_retain)
	}

	#[inline]
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		u32::bsp_struct_size(ctx)
	}
}

bitflags! {
	/// Content flags, what the volume behind a surface or inside a brush is made of. Unknown bits are kept as-is.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
	#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
	#[repr(transparent)]
	#[cfg_attr(feature = "bevy_reflect", reflect(opaque))]
	pub struct ContentFlags: u32 {
		// An eye is never valid in a solid
		const SOLID = 0x1;
		const LAVA = 0x8;
		const SLIME = 0x10;
		const WATER = 0x20;
		const FOG = 0x40;

		const NOTTEAM1 = 0x80;
		const NOTTEAM2 = 0x100;
		const NOBOTCLIP = 0x200;

		const AREAPORTAL = 0x8000;

		const PLAYERCLIP = 0x10000;
		const MONSTERCLIP = 0x20000;
		// Bot specific contents types
		const TELEPORTER = 0x40000;
		const JUMPPAD = 0x80000;
		const CLUSTERPORTAL = 0x100000;
		const DONOTENTER = 0x200000;
		const BOTCLIP = 0x400000;
		const MOVER = 0x800000;

		// Removed before bsping an entity
		const ORIGIN = 0x1000000;

		const BODY = 0x2000000;
		const CORPSE = 0x4000000;
		// Brushes not used for the bsp
		const DETAIL = 0x8000000;
		// Brushes used for the bsp
		const STRUCTURAL = 0x10000000;
		// Don't consume surface fragments inside
		const TRANSLUCENT = 0x20000000;
		const TRIGGER = 0x40000000;
		// Don't leave bodies or items (death fog, lava)
		const NODROP = 0x80000000;
	}
}

impl BspValue for ContentFlags {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read().map(Self::from_bits_retain)
	}

	#[inline]
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		u32::bsp_struct_size(ctx)
	}
}

/// A fog volume, attached to the brush that bounds it.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspFog {
	/// Name of the fog shader.
	pub name: FixedStr<64>,
	/// Index of the [`BspBrush`](crate::data::BspBrush) this fog fills.
	pub brush_idx: i32,
	/// The brush side that the fog is seen through, or [`BspFog::NO_VISIBLE_SIDE`].
	pub visible_side: i32,
}

impl BspFog {
	/// The fog has no side it's visible through.
	pub const NO_VISIBLE_SIDE: i32 = -1;

	#[inline]
	pub fn visible_side(&self) -> Option<u32> {
		u32::try_from(self.visible_side).ok()
	}
}
