//! On-disk record shapes of IBSP files that differ from RBSP, and their conversions into the RBSP shapes used in memory.
//!
//! IBSP has a single lightmap per face and vertex, and no draw surface on brush sides.
//! The extra slots are filled with values that mean "unused".

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use glam::{UVec2, Vec2, Vec3};
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	data::{
		lighting::{BspLightVolume, LightmapId, LightmapStyle, MAX_LIGHTMAPS},
		lump::{read_lump, LumpDirectory, LumpKind},
		models::{BspBrushSide, BspFace, BspVertex, FaceType},
	},
	reader::{BspParseContext, BspValue},
	BspFormat, BspResult,
};

/// A record whose IBSP shape is upgraded to a different RBSP shape.
pub trait LegacyRecord: BspValue {
	type Upgraded: BspValue;

	fn upgrade(self) -> Self::Upgraded;
}

/// Reads the legacy records of the `kind` lump, and upgrades each one.
pub fn read_upgraded_lump<L: LegacyRecord>(bsp: &[u8], kind: LumpKind, dir: &LumpDirectory, ctx: &BspParseContext) -> BspResult<Vec<L::Upgraded>> {
	Ok(read_lump::<L>(bsp, kind, dir, ctx)?.into_iter().map(L::upgrade).collect())
}

/// Reads the `kind` lump as `L::Upgraded` directly for RBSP, or upgraded from `L` for IBSP.
pub fn read_format_lump<L: LegacyRecord>(bsp: &[u8], kind: LumpKind, dir: &LumpDirectory, ctx: &BspParseContext) -> BspResult<Vec<L::Upgraded>> {
	match ctx.format {
		BspFormat::Rbsp => read_lump(bsp, kind, dir, ctx),
		BspFormat::Ibsp => read_upgraded_lump::<L>(bsp, kind, dir, ctx),
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyBrushSide {
	pub plane_idx: u32,
	pub texture_idx: i32,
}

impl LegacyRecord for LegacyBrushSide {
	type Upgraded = BspBrushSide;

	fn upgrade(self) -> BspBrushSide {
		BspBrushSide {
			plane_idx: self.plane_idx,
			texture_idx: self.texture_idx,
			draw_surface: BspBrushSide::NO_DRAW_SURFACE,
		}
	}
}

#[derive(BspValue, Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyVertex {
	pub position: Vec3,
	pub tex_coord: Vec2,
	pub lightmap_coord: Vec2,
	pub normal: Vec3,
	pub color: [u8; 4],
}

impl LegacyRecord for LegacyVertex {
	type Upgraded = BspVertex;

	/// The lightmap coordinate goes in slot 0. Colors are left zeroed, vertex lighting isn't carried over.
	fn upgrade(self) -> BspVertex {
		let mut lightmap_coords = [Vec2::ZERO; MAX_LIGHTMAPS];
		lightmap_coords[0] = self.lightmap_coord;

		BspVertex {
			position: self.position,
			tex_coord: self.tex_coord,
			lightmap_coords,
			normal: self.normal,
			colors: [[0; 4]; MAX_LIGHTMAPS],
		}
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyFace {
	pub texture_idx: i32,
	pub fog_idx: i32,
	pub face_type: FaceType,

	pub first_vertex: u32,
	pub num_vertices: u32,
	pub first_index: u32,
	pub num_indices: u32,

	pub lightmap_id: LightmapId,
	pub lightmap_x: u32,
	pub lightmap_y: u32,
	pub lightmap_width: u32,
	pub lightmap_height: u32,

	pub lightmap_origin: Vec3,
	pub lightmap_vecs: [Vec3; 3],

	pub patch_size: UVec2,
}

impl LegacyRecord for LegacyFace {
	type Upgraded = BspFace;

	fn upgrade(self) -> BspFace {
		let mut lightmap_ids = [LightmapId::NONE; MAX_LIGHTMAPS];
		lightmap_ids[0] = self.lightmap_id;
		let mut lightmap_x = [0; MAX_LIGHTMAPS];
		lightmap_x[0] = self.lightmap_x;
		let mut lightmap_y = [0; MAX_LIGHTMAPS];
		lightmap_y[0] = self.lightmap_y;

		BspFace {
			texture_idx: self.texture_idx,
			fog_idx: self.fog_idx,
			face_type: self.face_type,
			first_vertex: self.first_vertex,
			num_vertices: self.num_vertices,
			first_index: self.first_index,
			num_indices: self.num_indices,
			lightmap_styles: [LightmapStyle::NORMAL; MAX_LIGHTMAPS],
			vertex_styles: [LightmapStyle::NORMAL; MAX_LIGHTMAPS],
			lightmap_ids,
			lightmap_x,
			lightmap_y,
			lightmap_width: self.lightmap_width,
			lightmap_height: self.lightmap_height,
			lightmap_origin: self.lightmap_origin,
			lightmap_vecs: self.lightmap_vecs,
			patch_size: self.patch_size,
		}
	}
}

#[derive(BspValue, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyLightVolume {
	pub ambient: [u8; 3],
	pub directional: [u8; 3],
	pub direction: [u8; 2],
}

impl LegacyRecord for LegacyLightVolume {
	type Upgraded = BspLightVolume;

	fn upgrade(self) -> BspLightVolume {
		let mut ambient = [[0; 3]; MAX_LIGHTMAPS];
		ambient[0] = self.ambient;
		let mut directional = [[0; 3]; MAX_LIGHTMAPS];
		directional[0] = self.directional;

		BspLightVolume {
			ambient,
			directional,
			styles: [LightmapStyle::NORMAL; MAX_LIGHTMAPS],
			direction: self.direction,
		}
	}
}

macro_rules! impl_from_legacy {
	($($legacy:ty => $upgraded:ty),* $(,)?) => {$(
		impl From<$legacy> for $upgraded {
			#[inline]
			fn from(value: $legacy) -> Self {
				value.upgrade()
			}
		}
	)*};
}

impl_from_legacy! {
	LegacyBrushSide => BspBrushSide,
	LegacyVertex => BspVertex,
	LegacyFace => BspFace,
	LegacyLightVolume => BspLightVolume,
}
