//! Quadratic Bézier patch tessellation.
//!
//! A patch face stores a `width x height` grid of control points (both odd), which is split into overlapping 3x3 windows
//! sharing their edge rows and columns. Each window is evaluated into a `(level + 1)²` vertex grid.

use std::ops::{Add, Mul};

use thiserror::Error;

use crate::data::{BspFace, BspVertex, FaceType, MAX_LIGHTMAPS};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TessellateError {
	#[error("Face is not a patch")]
	NotAPatch,
	#[error("Patch control grid is {width}x{height}, both sides must be odd and at least 3")]
	InvalidPatchDimensions { width: u32, height: u32 },
	#[error("Invalid subdivision level {0}, must be at least 1 and small enough for the output to be indexable")]
	InvalidSubdivisionLevel(u32),
	#[error("Patch needs {count} control points from vertex {first_vertex}, but the face has {num_vertices} and there are {available} in total")]
	ControlPointsOutOfBounds {
		first_vertex: u32,
		count: u64,
		num_vertices: u32,
		available: usize,
	},
}

/// How many vertices and indices tessellating a `width x height` patch at `level` produces.
fn output_size(width: u32, height: u32, level: u32) -> Option<(u32, u32)> {
	let windows = ((width - 1) / 2).checked_mul((height - 1) / 2)?;
	let side = level.checked_add(1)?;
	let vertices = windows.checked_mul(side.checked_mul(side)?)?;
	let indices = windows.checked_mul(level.checked_mul(level)?.checked_mul(6)?)?;
	Some((vertices, indices))
}

/// Checks that `face` can be tessellated at `level` with control points from `vertices`,
/// returning the number of vertices and indices it will produce.
pub(crate) fn validate_patch(face: &BspFace, vertices: &[BspVertex], level: u32) -> Result<(u32, u32), TessellateError> {
	if face.face_type != FaceType::Patch {
		return Err(TessellateError::NotAPatch);
	}
	if level == 0 {
		return Err(TessellateError::InvalidSubdivisionLevel(level));
	}

	let (width, height) = (face.patch_size.x, face.patch_size.y);
	if width < 3 || height < 3 || width % 2 == 0 || height % 2 == 0 {
		return Err(TessellateError::InvalidPatchDimensions { width, height });
	}

	let count = width as u64 * height as u64;
	if count > face.num_vertices as u64 || face.first_vertex as u64 + count > vertices.len() as u64 {
		return Err(TessellateError::ControlPointsOutOfBounds {
			first_vertex: face.first_vertex,
			count,
			num_vertices: face.num_vertices,
			available: vertices.len(),
		});
	}

	output_size(width, height, level)
		.filter(|(new_vertices, _)| u32::try_from(vertices.len()).is_ok_and(|len| len.checked_add(*new_vertices).is_some()))
		.ok_or(TessellateError::InvalidSubdivisionLevel(level))
}

/// Tessellates a patch face, appending the generated triangle grid to `vertices` and `indices`.
///
/// On success, `face` is rewritten to point to the new geometry and becomes a [`FaceType::Polygon`],
/// its indices being relative to its new `first_vertex` like every other face.
/// On error nothing is modified.
pub fn tessellate_patch(face: &mut BspFace, vertices: &mut Vec<BspVertex>, indices: &mut Vec<u32>, level: u32) -> Result<(), TessellateError> {
	let (num_vertices, num_indices) = validate_patch(face, vertices, level)?;

	let width = face.patch_size.x as usize;
	let windows_x = (face.patch_size.x - 1) / 2;
	let windows_y = (face.patch_size.y - 1) / 2;
	let control_start = face.first_vertex as usize;
	let side = level + 1;

	let first_vertex = vertices.len();
	let first_index = indices.len();
	vertices.reserve(num_vertices as usize);
	indices.reserve(num_indices as usize);

	for py in 0..windows_y as usize {
		for px in 0..windows_x as usize {
			let controls: [BspVertex; 9] = std::array::from_fn(|k| vertices[control_start + (2 * py + k / 3) * width + 2 * px + k % 3]);
			let base = (py as u32 * windows_x + px as u32) * side * side;

			for i in 0..=level {
				let a = i as f32 / level as f32;
				let rows = [0, 3, 6].map(|row| bezier([&controls[row], &controls[row + 1], &controls[row + 2]], a));

				for j in 0..=level {
					let a = j as f32 / level as f32;
					vertices.push(bezier([&rows[0], &rows[1], &rows[2]], a));
				}
			}

			for i in 0..level {
				for j in 0..level {
					let v = |i: u32, j: u32| base + i * side + j;
					indices.extend([v(i, j), v(i, j + 1), v(i + 1, j + 1), v(i + 1, j + 1), v(i + 1, j), v(i, j)]);
				}
			}
		}
	}

	face.first_vertex = first_vertex as u32;
	face.num_vertices = num_vertices;
	face.first_index = first_index as u32;
	face.num_indices = num_indices;
	face.face_type = FaceType::Polygon;

	Ok(())
}

/// Evaluates the quadratic Bézier curve through `c` at `a`.
fn bezier(c: [&BspVertex; 3], a: f32) -> BspVertex {
	let b = 1. - a;
	let w = [b * b, 2. * a * b, a * a];

	BspVertex {
		position: blend(c, w, |v| v.position),
		tex_coord: blend(c, w, |v| v.tex_coord),
		lightmap_coords: std::array::from_fn(|slot| blend(c, w, |v| v.lightmap_coords[slot])),
		normal: blend(c, w, |v| v.normal),
		colors: std::array::from_fn::<_, MAX_LIGHTMAPS, _>(|slot| {
			std::array::from_fn(|channel| {
				let blended = c[0].colors[slot][channel] as f32 * w[0] + c[1].colors[slot][channel] as f32 * w[1] + c[2].colors[slot][channel] as f32 * w[2];
				blended.round().clamp(0., 255.) as u8
			})
		}),
	}
}

/// Weighted sum of one attribute of the three control points.
#[inline]
fn blend<T: Mul<f32, Output = T> + Add<Output = T>>(c: [&BspVertex; 3], w: [f32; 3], f: impl Fn(&BspVertex) -> T) -> T {
	f(c[0]) * w[0] + f(c[1]) * w[1] + f(c[2]) * w[2]
}
