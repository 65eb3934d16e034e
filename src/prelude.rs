//! Everything needed to load a BSP file and walk its data.

pub use crate::{
	data::{
		BspBrush, BspBrushSide, BspEntities, BspEntity, BspFace, BspFog, BspLeaf, BspLightMap, BspLightVolume, BspModel, BspNode,
		BspNodeRef, BspPlane, BspTexture, BspVertex, BspVisData, FaceType, LightmapId, LightmapStyle, LumpKind,
	},
	BspData, BspFormat, BspParseError, BspResult, LoadState,
};

#[cfg(feature = "meshing")]
pub use crate::mesh::{tessellate_patch, SkippedPatch, TessellateError, TessellationSettings};
