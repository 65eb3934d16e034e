//! Data definitions for models, brushes, and the drawable surfaces (faces) they're made of.

use std::ops::Range;

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use glam::{UVec2, Vec2, Vec3};
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
	data::{
		lighting::{LightmapId, LightmapStyle, MAX_LIGHTMAPS},
		nodes::BoundingBox,
	},
	reader::{BspByteReader, BspParseContext, BspValue},
	BspResult,
};

/// A model is a set of faces and brushes. Model 0 is the world, the rest are referenced by brush entities as `*1`, `*2`, etc.
#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspModel {
	pub bound: BoundingBox,

	pub first_face: u32,
	pub num_faces: u32,

	pub first_brush: u32,
	pub num_brushes: u32,
}

impl BspModel {
	#[inline]
	pub fn face_range(&self) -> Range<usize> {
		self.first_face as usize..self.first_face as usize + self.num_faces as usize
	}
}

/// A convex volume used for collision.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspBrush {
	pub first_side: u32,
	pub num_sides: u32,
	/// Index of the [`BspTexture`](crate::data::BspTexture) that defines the brush's content flags.
	pub texture_idx: i32,
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspBrushSide {
	/// Index of the [`BspPlane`](crate::data::BspPlane) bounding the brush on this side.
	pub plane_idx: u32,
	pub texture_idx: i32,
	/// Index of the face drawn for this side, or [`BspBrushSide::NO_DRAW_SURFACE`]. IBSP files don't store this.
	pub draw_surface: i32,
}

impl BspBrushSide {
	pub const NO_DRAW_SURFACE: i32 = -1;

	#[inline]
	pub fn draw_surface(&self) -> Option<u32> {
		u32::try_from(self.draw_surface).ok()
	}
}

#[derive(BspValue, Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspVertex {
	pub position: Vec3,
	pub tex_coord: Vec2,
	pub lightmap_coords: [Vec2; MAX_LIGHTMAPS],
	pub normal: Vec3,
	/// RGBA vertex colors, one per lightmap slot.
	pub colors: [[u8; 4]; MAX_LIGHTMAPS],
}

/// How the vertices and indices of a [`BspFace`] should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i32)]
pub enum FaceType {
	#[default]
	Bad = 0,
	/// A triangulated polygon, drawn with its index range.
	Polygon = 1,
	/// A grid of quadratic Bézier control points, see [`BspData::tessellate_patches`](crate::BspData::tessellate_patches).
	Patch = 2,
	/// A triangle mesh, drawn with its index range.
	Mesh = 3,
	/// A single vertex, the origin of a sprite (flare).
	Billboard = 4,
	/// Raven's foliage surfaces.
	Foliage = 5,
}

impl FaceType {
	pub fn from_i32(value: i32) -> Option<Self> {
		Some(match value {
			0 => Self::Bad,
			1 => Self::Polygon,
			2 => Self::Patch,
			3 => Self::Mesh,
			4 => Self::Billboard,
			5 => Self::Foliage,
			_ => return None,
		})
	}
}

/// Unknown types are read as [`FaceType::Bad`] so one odd face doesn't reject the whole map.
impl BspValue for FaceType {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		let value: i32 = reader.read()?;
		Ok(Self::from_i32(value).unwrap_or_else(|| {
			log::warn!("Unknown face type {value}, treating it as bad");
			Self::Bad
		}))
	}

	#[inline]
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		i32::bsp_struct_size(ctx)
	}
}

/// A drawable surface.
#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspFace {
	pub texture_idx: i32,
	/// Index of the [`BspFog`](crate::data::BspFog) this face is in, or -1.
	pub fog_idx: i32,
	pub face_type: FaceType,

	pub first_vertex: u32,
	pub num_vertices: u32,
	/// Index into [`BspData::indices`](crate::BspData::indices). The indices themselves are relative to `first_vertex`.
	pub first_index: u32,
	pub num_indices: u32,

	pub lightmap_styles: [LightmapStyle; MAX_LIGHTMAPS],
	pub vertex_styles: [LightmapStyle; MAX_LIGHTMAPS],
	pub lightmap_ids: [LightmapId; MAX_LIGHTMAPS],
	/// Position of this face's lightmap rectangle within each lightmap page.
	pub lightmap_x: [u32; MAX_LIGHTMAPS],
	pub lightmap_y: [u32; MAX_LIGHTMAPS],
	pub lightmap_width: u32,
	pub lightmap_height: u32,

	// Lightmap projection, only used by the compiler.
	pub lightmap_origin: Vec3,
	pub lightmap_vecs: [Vec3; 3],

	/// Width and height of the control point grid if this is a patch.
	pub patch_size: UVec2,
}

impl BspFace {
	#[inline]
	pub fn vertex_range(&self) -> Range<usize> {
		self.first_vertex as usize..self.first_vertex as usize + self.num_vertices as usize
	}

	#[inline]
	pub fn index_range(&self) -> Range<usize> {
		self.first_index as usize..self.first_index as usize + self.num_indices as usize
	}

	#[inline]
	pub fn is_patch(&self) -> bool {
		self.face_type == FaceType::Patch
	}

	/// Returns the lightmap slots that refer to an actual lightmap page, with the style each is animated with.
	pub fn lightmaps(&self) -> SmallVec<[(LightmapId, LightmapStyle); MAX_LIGHTMAPS]> {
		self.lightmap_ids
			.iter()
			.zip(self.lightmap_styles)
			.filter(|(id, style)| id.index().is_some() && *style != LightmapStyle::NONE)
			.map(|(id, style)| (*id, style))
			.collect()
	}
}
