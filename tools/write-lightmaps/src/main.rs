use q3bsp::prelude::*;
use std::{env, fs, path::PathBuf};

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let mut args = env::args().skip(1);
	let path = PathBuf::from(args.next().expect("Usage: write-lightmaps <map.bsp> [output directory]"));
	let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("target/lightmaps"));

	log::info!("Reading BSP {}", path.display());
	let data = BspData::parse(&fs::read(&path).expect("Failed to read bsp file")).expect("Failed to parse bsp file");

	fs::create_dir_all(&out_dir).expect("Failed to create output directory");

	for (i, lightmap) in data.lightmaps.iter().enumerate() {
		let out = out_dir.join(format!("lightmap_{i}.png"));
		lightmap
			.gamma_corrected()
			.to_image()
			.save_with_format(&out, image::ImageFormat::Png)
			.unwrap();
	}

	log::info!("Wrote {} lightmaps to {}", data.lightmaps.len(), out_dir.display());
}
