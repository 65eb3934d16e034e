//! Loading synthetic IBSP and RBSP files built in memory.

use crate::{
	data::{
		lump::{LumpEntry, LUMP_COUNT},
		BspBrushSide, FaceType, LightmapId, LightmapStyle, LumpKind, LIGHTMAP_SIZE,
	},
	BspData, BspFormat, BspParseError, LoadState,
};

use glam::{UVec2, Vec2, Vec3};

/// Little-endian byte writer for building records.
#[derive(Default)]
pub(crate) struct Encoder(pub Vec<u8>);

impl Encoder {
	pub fn i32(mut self, v: i32) -> Self {
		self.0.extend(v.to_le_bytes());
		self
	}
	pub fn u32(mut self, v: u32) -> Self {
		self.0.extend(v.to_le_bytes());
		self
	}
	pub fn f32s(mut self, v: &[f32]) -> Self {
		for v in v {
			self.0.extend(v.to_le_bytes());
		}
		self
	}
	pub fn bytes(mut self, v: &[u8]) -> Self {
		self.0.extend(v);
		self
	}
	pub fn finish(self) -> Vec<u8> {
		self.0
	}
}

/// Builds a BSP file from raw lump contents, laid out back to back after the lump directory.
pub(crate) struct BspBuilder {
	format: BspFormat,
	version: i32,
	lumps: Vec<(LumpKind, Vec<u8>)>,
}

impl BspBuilder {
	pub fn new(format: BspFormat) -> Self {
		Self {
			format,
			version: match format {
				BspFormat::Ibsp => 46,
				BspFormat::Rbsp => 1,
			},
			lumps: Vec::new(),
		}
	}

	pub fn lump(mut self, kind: LumpKind, bytes: Vec<u8>) -> Self {
		self.lumps.push((kind, bytes));
		self
	}

	pub fn build(&self) -> Vec<u8> {
		let mut entries = [LumpEntry::EMPTY; LUMP_COUNT];
		let mut body = Vec::new();
		for (kind, bytes) in &self.lumps {
			entries[*kind as usize] = LumpEntry {
				offset: (self.format.header_size() + body.len()) as u32,
				len: bytes.len() as u32,
			};
			body.extend(bytes);
		}

		let mut out = Encoder::default().bytes(&self.format.magic_number()).i32(self.version);
		for entry in entries.iter().take(self.format.lump_count()) {
			out = out.u32(entry.offset).u32(entry.len);
		}
		out.bytes(&body).finish()
	}
}

/// Overwrites the directory entry for `kind` in a built file.
pub(crate) fn set_lump_entry(bsp: &mut [u8], kind: LumpKind, offset: u32, len: u32) {
	let at = 8 + kind as usize * 8;
	bsp[at..at + 4].copy_from_slice(&offset.to_le_bytes());
	bsp[at + 4..at + 8].copy_from_slice(&len.to_le_bytes());
}

pub(crate) fn texture(name: &str, surface_flags: u32, content_flags: u32) -> Vec<u8> {
	let mut name_bytes = [0; 64];
	name_bytes[..name.len()].copy_from_slice(name.as_bytes());
	Encoder::default().bytes(&name_bytes).u32(surface_flags).u32(content_flags).finish()
}

pub(crate) fn legacy_vertex(position: [f32; 3], tex_coord: [f32; 2], lightmap_coord: [f32; 2], color: [u8; 4]) -> Vec<u8> {
	Encoder::default()
		.f32s(&position)
		.f32s(&tex_coord)
		.f32s(&lightmap_coord)
		.f32s(&[0., 0., 1.])
		.bytes(&color)
		.finish()
}

pub(crate) fn legacy_face(face_type: FaceType, vertices: (u32, u32), indices: (u32, u32), lightmap_id: i32, patch_size: [u32; 2]) -> Vec<u8> {
	Encoder::default()
		.i32(0)
		.i32(-1)
		.i32(face_type as i32)
		.u32(vertices.0)
		.u32(vertices.1)
		.u32(indices.0)
		.u32(indices.1)
		.i32(lightmap_id)
		// Lightmap x, y, width, height.
		.u32(8)
		.u32(16)
		.u32(4)
		.u32(2)
		.f32s(&[1., 2., 3.])
		.f32s(&[1., 0., 0., 0., 1., 0., 0., 0., 1.])
		.u32(patch_size[0])
		.u32(patch_size[1])
		.finish()
}

fn indices(indices: &[u32]) -> Vec<u8> {
	indices.iter().flat_map(|i| i.to_le_bytes()).collect()
}

fn vis(num_clusters: u32, row_size: u32, bits: &[u8]) -> Vec<u8> {
	Encoder::default().u32(num_clusters).u32(row_size).bytes(bits).finish()
}

fn legacy_triangle_bsp() -> BspBuilder {
	BspBuilder::new(BspFormat::Ibsp)
		.lump(LumpKind::Entities, b"{\n\"classname\" \"worldspawn\"\n}\n\0".to_vec())
		.lump(LumpKind::Textures, texture("textures/base/floor", 0, 1))
		.lump(
			LumpKind::Vertices,
			[
				legacy_vertex([0., 0., 0.], [0., 0.], [0.1, 0.2], [255, 0, 0, 255]),
				legacy_vertex([64., 0., 0.], [1., 0.], [0.3, 0.2], [0, 255, 0, 255]),
				legacy_vertex([0., 64., 0.], [0., 1.], [0.1, 0.4], [0, 0, 255, 255]),
			]
			.concat(),
		)
		.lump(LumpKind::Indices, indices(&[0, 1, 2]))
		.lump(LumpKind::Faces, legacy_face(FaceType::Polygon, (0, 3), (0, 3), 0, [0, 0]))
		.lump(LumpKind::BrushSides, Encoder::default().u32(4).i32(0).finish())
		.lump(LumpKind::LightVolumes, vec![10, 20, 30, 40, 50, 60, 7, 8])
		.lump(LumpKind::Lightmaps, vec![3; (LIGHTMAP_SIZE * LIGHTMAP_SIZE * 3) as usize])
		.lump(LumpKind::Visibility, vis(2, 1, &[0b11, 0b10]))
}

#[test]
fn legacy_triangle() {
	let bsp = legacy_triangle_bsp().build();
	let data = BspData::parse(&bsp).unwrap();

	assert_eq!(data.state(), LoadState::Loaded);
	assert_eq!(data.format, Some(BspFormat::Ibsp));
	assert_eq!(data.version, 46);
	assert_eq!(data.entities, "{\n\"classname\" \"worldspawn\"\n}\n");
	assert_eq!(data.parse_entities().unwrap().worldspawn().map(|e| e.properties.len()), Some(1));

	assert_eq!(data.textures.len(), 1);
	assert_eq!(data.textures[0].name.as_str(), "textures/base/floor");
	assert!(!data.textures[0].is_no_draw());

	assert_eq!(data.vertices.len(), 3);
	let vertex = &data.vertices[1];
	assert_eq!(vertex.position, Vec3::new(64., 0., 0.));
	assert_eq!(vertex.tex_coord, Vec2::new(1., 0.));
	assert_eq!(vertex.normal, Vec3::Z);
	assert_eq!(vertex.lightmap_coords, [Vec2::new(0.3, 0.2), Vec2::ZERO, Vec2::ZERO, Vec2::ZERO]);
	assert_eq!(vertex.colors, [[0; 4]; 4]);

	assert_eq!(data.indices, [0, 1, 2]);

	assert_eq!(data.faces.len(), 1);
	let face = &data.faces[0];
	assert_eq!(face.face_type, FaceType::Polygon);
	assert_eq!((face.vertex_range(), face.index_range()), (0..3, 0..3));
	assert_eq!(face.lightmap_ids, [LightmapId(0), LightmapId::NONE, LightmapId::NONE, LightmapId::NONE]);
	assert_eq!(face.lightmap_x, [8, 0, 0, 0]);
	assert_eq!(face.lightmap_y, [16, 0, 0, 0]);
	assert_eq!(face.lightmap_styles, [LightmapStyle::NORMAL; 4]);
	assert_eq!((face.lightmap_width, face.lightmap_height), (4, 2));
	assert_eq!(face.lightmap_origin, Vec3::new(1., 2., 3.));
	assert_eq!(face.lightmap_vecs, [Vec3::X, Vec3::Y, Vec3::Z]);
	assert_eq!(face.lightmaps().len(), 1);
	assert_eq!(data.face_texture(face).map(|t| t.name.to_string()).as_deref(), Some("textures/base/floor"));

	assert_eq!(data.brush_sides.len(), 1);
	assert_eq!(data.brush_sides[0].plane_idx, 4);
	assert_eq!(data.brush_sides[0].draw_surface, BspBrushSide::NO_DRAW_SURFACE);

	assert_eq!(data.light_volumes.len(), 1);
	assert_eq!(data.light_volumes[0].ambient[0], [10, 20, 30]);
	assert_eq!(data.light_volumes[0].directional[0], [40, 50, 60]);
	assert_eq!(data.light_volumes[0].ambient[1], [0; 3]);
	assert_eq!(data.light_volumes[0].direction, [7, 8]);

	assert_eq!(data.lightmaps.len(), 1);
	assert_eq!(data.lightmaps[0].get(5, 5), Some([3; 3]));
	assert_eq!(data.lightmaps[0].gamma_corrected().get(5, 5), Some([15; 3]));

	let vis = &data.visibility;
	assert_eq!(vis.bits.len(), (vis.num_clusters * vis.row_size) as usize);
	assert!(vis.cluster_visible(0, 1));
	assert!(!vis.cluster_visible(1, 0));

	assert!(data.light_array.is_empty());
	assert!(data.planes.is_empty());
	assert!(data.models.is_empty());
}

#[test]
fn extended_records() {
	let vertex = Encoder::default()
		.f32s(&[1., 2., 3.])
		.f32s(&[0.5, 0.5])
		.f32s(&[0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4])
		.f32s(&[0., 1., 0.])
		.bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16])
		.finish();
	let face = Encoder::default()
		.i32(0)
		.i32(-1)
		.i32(FaceType::Mesh as i32)
		.u32(0)
		.u32(1)
		.u32(0)
		.u32(0)
		.bytes(&[0, 1, 255, 255])
		.bytes(&[0, 0, 255, 255])
		.i32(0)
		.i32(1)
		.i32(-1)
		.i32(-1)
		.bytes(&[0; 16 * 2])
		.u32(0)
		.u32(0)
		.f32s(&[0.; 12])
		.u32(0)
		.u32(0)
		.finish();
	let light_volume: Vec<u8> = (0..30).collect();

	let bsp = BspBuilder::new(BspFormat::Rbsp)
		.lump(LumpKind::Vertices, vertex)
		.lump(LumpKind::Faces, face)
		.lump(LumpKind::BrushSides, Encoder::default().u32(1).i32(2).i32(3).finish())
		.lump(LumpKind::LightVolumes, light_volume)
		.lump(LumpKind::LightArray, vec![9, 8, 7, 6])
		.build();
	let data = BspData::parse(&bsp).unwrap();

	assert_eq!(data.format, Some(BspFormat::Rbsp));
	assert_eq!(data.version, 1);
	assert!(data.entities.is_empty());

	let vertex = &data.vertices[0];
	assert_eq!(vertex.lightmap_coords[3], Vec2::new(0.4, 0.4));
	assert_eq!(vertex.normal, Vec3::Y);
	assert_eq!(vertex.colors[2], [9, 10, 11, 12]);

	let face = &data.faces[0];
	assert_eq!(face.face_type, FaceType::Mesh);
	assert_eq!(face.lightmap_styles, [LightmapStyle(0), LightmapStyle(1), LightmapStyle::NONE, LightmapStyle::NONE]);
	assert_eq!(face.lightmaps().as_slice(), [(LightmapId(0), LightmapStyle(0)), (LightmapId(1), LightmapStyle(1))]);
	assert_eq!(face.patch_size, UVec2::ZERO);

	assert_eq!(data.brush_sides[0].draw_surface(), Some(3));

	let volume = &data.light_volumes[0];
	assert_eq!(volume.ambient[1], [3, 4, 5]);
	assert_eq!(volume.directional[0], [12, 13, 14]);
	assert_eq!(volume.styles, [LightmapStyle(24), LightmapStyle(25), LightmapStyle(26), LightmapStyle(27)]);
	assert_eq!(volume.direction, [28, 29]);

	assert_eq!(data.light_array, [9, 8, 7, 6]);
	assert!(data.visibility.is_empty());
}

#[test]
fn header_only() {
	for format in [BspFormat::Ibsp, BspFormat::Rbsp] {
		let bsp = BspBuilder::new(format).build();
		assert_eq!(bsp.len(), format.header_size());

		let data = BspData::parse(&bsp).unwrap();
		assert!(data.is_loaded());
		assert!(data.entities.is_empty());
		assert!(data.vertices.is_empty());
		assert!(data.faces.is_empty());
		assert!(data.lightmaps.is_empty());
		assert_eq!(data.visibility.num_clusters, 0);
		assert!(data.visibility.bits.is_empty());
	}
}

#[test]
fn legacy_vertex_lump_size_mismatch() {
	let mut data = BspData::parse(&legacy_triangle_bsp().build()).unwrap();

	let bsp = BspBuilder::new(BspFormat::Ibsp).lump(LumpKind::Vertices, vec![0; 45]).build();
	let err = data.load(&bsp).unwrap_err();

	assert!(
		matches!(
			err.root(),
			BspParseError::MalformedLump {
				lump: LumpKind::Vertices,
				len: 45,
				record_size: 44
			}
		),
		"{err}"
	);
	assert_eq!(data.state(), LoadState::Unloaded);
	assert!(data.format.is_none());
	assert!(data.vertices.is_empty());
	assert!(data.textures.is_empty());
	assert!(data.entities.is_empty());
}

#[test]
fn extended_size_in_legacy_file() {
	// A whole number of RBSP faces, but not of IBSP ones.
	let bsp = BspBuilder::new(BspFormat::Ibsp).lump(LumpKind::Faces, vec![0; 148]).build();
	let err = BspData::parse(&bsp).unwrap_err();
	assert!(matches!(err.root(), BspParseError::MalformedLump { lump: LumpKind::Faces, .. }), "{err}");
}

#[test]
fn extended_vertex_lump_size_mismatch() {
	let bsp = BspBuilder::new(BspFormat::Rbsp).lump(LumpKind::Vertices, vec![0; 79]).build();
	let err = BspData::parse(&bsp).unwrap_err();
	assert!(
		matches!(
			err.root(),
			BspParseError::MalformedLump {
				lump: LumpKind::Vertices,
				len: 79,
				record_size: 80
			}
		),
		"{err}"
	);

	// Two legacy vertices worth of bytes is still malformed at the extended record size.
	let bsp = BspBuilder::new(BspFormat::Rbsp).lump(LumpKind::Vertices, vec![0; 88]).build();
	assert!(matches!(BspData::parse(&bsp).unwrap_err().root(), BspParseError::MalformedLump { record_size: 80, .. }));
}

#[test]
fn lump_past_end() {
	let mut bsp = legacy_triangle_bsp().build();
	let len = bsp.len() as u32;
	set_lump_entry(&mut bsp, LumpKind::Indices, len - 4, 12);

	let err = BspData::parse(&bsp).unwrap_err();
	assert!(
		matches!(err.root(), BspParseError::TruncatedBuffer { from, to, size } if *from == len as usize - 4 && *to == len as usize + 8 && *size == len as usize),
		"{err}"
	);

	// Even when the length would otherwise be malformed, the bounds are checked first.
	set_lump_entry(&mut bsp, LumpKind::Indices, len, 3);
	assert!(matches!(BspData::parse(&bsp).unwrap_err().root(), BspParseError::TruncatedBuffer { .. }));
}

#[test]
fn truncated_visibility() {
	let bsp = BspBuilder::new(BspFormat::Rbsp).lump(LumpKind::Visibility, vis(3, 1, &[0, 0])).build();
	let err = BspData::parse(&bsp).unwrap_err();
	assert!(matches!(err.root(), BspParseError::TruncatedBuffer { .. }), "{err}");
}

#[test]
fn bad_headers() {
	let err = BspData::parse(b"VBSP\x14\0\0\0").unwrap_err();
	assert!(matches!(err, BspParseError::UnknownFormat { found } if &found == b"VBSP"));

	assert!(matches!(BspData::parse(b"IBS").unwrap_err(), BspParseError::TruncatedBuffer { from: 0, to: 4, size: 3 }));

	// Valid tag, but the lump directory is cut short.
	let mut bsp = BspBuilder::new(BspFormat::Rbsp).build();
	bsp.truncate(BspFormat::Ibsp.header_size());
	assert!(matches!(BspData::parse(&bsp).unwrap_err().root(), BspParseError::TruncatedBuffer { .. }));
}

#[test]
fn unload_and_reload() {
	let mut data = BspData::default();
	assert_eq!(data.state(), LoadState::Unloaded);
	// Unloading something that was never loaded is fine.
	data.unload();

	data.load(&legacy_triangle_bsp().build()).unwrap();
	assert!(data.is_loaded());
	assert_eq!(data.faces.len(), 1);

	// Loading again replaces everything rather than appending.
	data.load(&BspBuilder::new(BspFormat::Rbsp).lump(LumpKind::Indices, indices(&[5])).build()).unwrap();
	assert_eq!(data.format, Some(BspFormat::Rbsp));
	assert!(data.faces.is_empty());
	assert_eq!(data.indices, [5]);

	data.unload();
	assert_eq!(data.state(), LoadState::Unloaded);
	assert!(data.format.is_none());
	assert!(data.indices.is_empty());
	assert_eq!(data.version, 0);
}

#[test]
fn lossy_entities() {
	let bsp = BspBuilder::new(BspFormat::Ibsp).lump(LumpKind::Entities, b"{ \"a\" \"\xFF\" }".to_vec()).build();
	let data = BspData::parse(&bsp).unwrap();
	assert_eq!(data.entities, "{ \"a\" \"\u{FFFD}\" }");
}

#[test]
fn latin1_names() {
	let mut name = [0; 64];
	name[..14].copy_from_slice(b"textures/caf\xE9/");
	let bsp = BspBuilder::new(BspFormat::Ibsp)
		.lump(LumpKind::Textures, Encoder::default().bytes(&name).u32(0).u32(1).finish())
		.lump(LumpKind::Fogs, Encoder::default().bytes(&name).i32(0).i32(-1).finish())
		.build();
	let data = BspData::parse(&bsp).unwrap();

	let texture = &data.textures[0];
	assert_eq!(texture.name.as_bytes()[12], 0xE9);
	assert_eq!(texture.name.as_str(), "textures/caf\u{FFFD}/");
	assert_eq!(data.fogs[0].name, texture.name);
	assert_eq!(data.fogs[0].visible_side(), None);
}

#[cfg(feature = "meshing")]
#[test]
fn tessellate_loaded_patch() {
	use crate::mesh::TessellationSettings;

	let control_points: Vec<u8> = (0..9)
		.flat_map(|i| legacy_vertex([(i % 3) as f32 * 32., (i / 3) as f32 * 32., 0.], [0., 0.], [0., 0.], [255; 4]))
		.collect();
	let bsp = BspBuilder::new(BspFormat::Ibsp)
		.lump(LumpKind::Vertices, control_points)
		.lump(
			LumpKind::Faces,
			[
				legacy_face(FaceType::Patch, (0, 9), (0, 0), LightmapId::NONE.0, [3, 3]),
				legacy_face(FaceType::Patch, (0, 9), (0, 0), LightmapId::NONE.0, [3, 2]),
			]
			.concat(),
		)
		.build();
	let mut data = BspData::parse(&bsp).unwrap();

	let skipped = data.tessellate_patches(&TessellationSettings { level: 3 });
	assert_eq!(skipped.len(), 1);
	assert_eq!(skipped[0].face_idx, 1);

	let face = &data.faces[0];
	assert_eq!(face.face_type, FaceType::Polygon);
	assert_eq!(face.num_vertices, 16);
	assert_eq!(face.num_indices, 54);
	assert_eq!(data.vertices.len(), 9 + 16);
	let corner = &data.vertices[face.vertex_range()][15];
	assert_eq!(corner.position, Vec3::new(64., 64., 0.));
	assert!(data.indices[face.index_range()].iter().all(|i| *i < face.num_vertices));
}
