//! Turning curved patch faces in [`BspData`] into triangles.

pub mod patch;

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use patch::{tessellate_patch, TessellateError};

use crate::BspData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TessellationSettings {
	/// Number of segments each 3x3 window of control points is split into along each axis.
	pub level: u32,
}

impl Default for TessellationSettings {
	fn default() -> Self {
		Self { level: 4 }
	}
}

/// A patch face [`BspData::tessellate_patches`] couldn't tessellate. It's left as it was in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedPatch {
	pub face_idx: usize,
	pub error: TessellateError,
}

impl BspData {
	/// Tessellates every patch face in order, turning them into polygons. See [`tessellate_patch`].
	///
	/// Faces that fail are logged, left untouched, and returned.
	pub fn tessellate_patches(&mut self, settings: &TessellationSettings) -> Vec<SkippedPatch> {
		let (extra_vertices, extra_indices) = self
			.faces
			.iter()
			.filter_map(|face| patch::validate_patch(face, &self.vertices, settings.level).ok())
			.fold((0usize, 0usize), |(v, i), (face_v, face_i)| (v + face_v as usize, i + face_i as usize));
		self.vertices.reserve(extra_vertices);
		self.indices.reserve(extra_indices);

		let mut skipped = Vec::new();
		let mut tessellated = 0;

		for (face_idx, face) in self.faces.iter_mut().enumerate() {
			if !face.is_patch() {
				continue;
			}

			match tessellate_patch(face, &mut self.vertices, &mut self.indices, settings.level) {
				Ok(()) => tessellated += 1,
				Err(error) => {
					log::warn!("Skipping patch face {face_idx}: {error}");
					skipped.push(SkippedPatch { face_idx, error });
				}
			}
		}

		log::debug!(
			"Tessellated {tessellated} patches at level {} ({} skipped), {} vertices and {} indices added",
			settings.level,
			skipped.len(),
			extra_vertices,
			extra_indices,
		);

		skipped
	}
}
