//! Exports the world geometry of a BSP file as a Wavefront OBJ, along with a material library and the entity text.

use q3bsp::prelude::*;
use std::{
	env, fs,
	io::{self, BufWriter, Write},
	path::{Path, PathBuf},
};

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let mut args = env::args().skip(1);
	let bsp_path = PathBuf::from(args.next().expect("Usage: bsp2obj <map.bsp> [out.obj] [tessellation level]"));
	let obj_path = args.next().map(PathBuf::from).unwrap_or_else(|| bsp_path.with_extension("obj"));
	let settings = match args.next() {
		Some(level) => TessellationSettings {
			level: level.parse().expect("Tessellation level must be a positive integer"),
		},
		None => TessellationSettings::default(),
	};

	let mtl_path = obj_path.with_extension("mtl");
	let entities_path = obj_path.with_file_name(format!(
		"{}_entities.txt",
		obj_path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("map")
	));

	log::info!("Reading BSP {}", bsp_path.display());
	let mut data = BspData::parse(&fs::read(&bsp_path).expect("Failed to read bsp file")).expect("Failed to parse bsp file");

	// Only used to check the entity text is well-formed.
	match data.parse_entities() {
		Ok(entities) => log::info!("{} entities", entities.len()),
		Err(err) => log::warn!("Failed to parse entities: {err}"),
	}

	let skipped = data.tessellate_patches(&settings);
	if !skipped.is_empty() {
		log::warn!("{} patches couldn't be tessellated and won't be exported", skipped.len());
	}

	log::info!("Writing {}", obj_path.display());
	write_file(&obj_path, |w| write_obj(w, &data, &mtl_path)).expect("Failed to write obj file");
	log::info!("Writing {}", mtl_path.display());
	write_file(&mtl_path, |w| write_mtl(w, &data)).expect("Failed to write mtl file");
	log::info!("Writing {}", entities_path.display());
	write_file(&entities_path, |w| write!(w, "// Generated by bsp2obj\n\n{}", data.entities)).expect("Failed to write entity file");
}

fn write_file(path: &Path, f: impl FnOnce(&mut BufWriter<fs::File>) -> io::Result<()>) -> io::Result<()> {
	let mut w = BufWriter::new(fs::File::create(path)?);
	f(&mut w)?;
	w.flush()
}

/// Material names can contain slashes, which most OBJ importers don't like.
fn material_name(texture: &BspTexture) -> String {
	texture.name.as_str().replace('/', "_")
}

fn write_obj(w: &mut impl Write, data: &BspData, mtl_path: &Path) -> io::Result<()> {
	writeln!(w, "# Generated by bsp2obj\n")?;
	if let Some(mtl_name) = mtl_path.file_name() {
		writeln!(w, "mtllib {}\n", mtl_name.to_string_lossy())?;
	}

	// BSP space is Z-up, OBJ is Y-up.
	writeln!(w, "# Begin Vertex Positions for {} vertices.", data.vertices.len())?;
	for v in &data.vertices {
		writeln!(w, "v {:.6} {:.6} {:.6}", v.position.x, v.position.z, -v.position.y)?;
	}
	writeln!(w, "# End Vertex Positions\n")?;

	writeln!(w, "# Begin Vertex UVs for {} vertices.", data.vertices.len())?;
	for v in &data.vertices {
		writeln!(w, "vt {:.6} {:.6}", v.tex_coord.x, 1. - v.tex_coord.y)?;
	}
	writeln!(w, "# End Vertex UVs\n")?;

	writeln!(w, "# Begin Vertex Normals for {} vertices.", data.vertices.len())?;
	for v in &data.vertices {
		writeln!(w, "vn {:.6} {:.6} {:.6}", v.normal.x, v.normal.y, v.normal.z)?;
	}
	writeln!(w, "# End Vertex Normals\n")?;

	writeln!(w, "# Begin Face Definitions for {} faces.", data.faces.len())?;
	let mut surface_count = 0;
	for (face_idx, face) in data.faces.iter().enumerate() {
		let Some(texture) = data.face_texture(face) else {
			writeln!(w, "# skipping surface {face_idx} because its texture index {} is invalid\n", face.texture_idx)?;
			continue;
		};
		if texture.is_no_draw() {
			writeln!(w, "# skipping surface {face_idx} because it has SURF_NODRAW set\n")?;
			continue;
		}
		if face.is_patch() {
			writeln!(w, "# skipping patch surface {face_idx}\n")?;
			continue;
		}
		if face.num_indices == 0 && face.num_vertices == 0 {
			writeln!(w, "# skipping empty surface {face_idx}\n")?;
			continue;
		}
		let Some(indices) = data.indices.get(face.index_range()) else {
			writeln!(w, "# skipping surface {face_idx} because its indices are out of bounds\n")?;
			continue;
		};

		writeln!(
			w,
			"# surface {face_idx} indices: {}[{}], verts: {}[{}]",
			face.first_index, face.num_indices, face.first_vertex, face.num_vertices
		)?;
		writeln!(w, "usemtl {}", material_name(texture))?;
		writeln!(w, "o surf{surface_count}")?;
		surface_count += 1;

		for triangle in indices.chunks_exact(3) {
			// OBJ indices are 1-based. The winding is flipped along with the handedness.
			let [i, j, k] = [triangle[0], triangle[1], triangle[2]].map(|idx| 1 + face.first_vertex as u64 + idx as u64);
			writeln!(w, "f {i}/{i}/{i} {k}/{k}/{k} {j}/{j}/{j}")?;
		}
		writeln!(w)?;
	}
	writeln!(w, "# End Face Definitions\n")?;

	Ok(())
}

fn write_mtl(w: &mut impl Write, data: &BspData) -> io::Result<()> {
	writeln!(w, "# Generated by bsp2obj\n")?;

	for texture in data.textures.iter().filter(|texture| !texture.is_no_draw()) {
		writeln!(w, "newmtl {}", material_name(texture))?;
		writeln!(w, "Ka 1 1 1")?;
		writeln!(w, "Kd 1 1 1")?;
		writeln!(w, "Ks 0 0 0")?;
		writeln!(w, "Ns 10")?;
		writeln!(w, "map_Kd {}\n", texture.name)?;
	}

	Ok(())
}
