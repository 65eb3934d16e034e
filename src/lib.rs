// Lets `#[derive(BspValue)]` refer to `::q3bsp` from inside this crate too.
extern crate self as q3bsp;

pub mod prelude;

pub mod data;
pub mod reader;

#[cfg(feature = "meshing")]
pub mod mesh;

pub mod util;

#[cfg(test)]
mod loading_tests;

// Re-exports
pub use glam;
pub use image;
pub use smallvec;

use std::fmt;

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use data::{
	legacy::{read_format_lump, LegacyBrushSide, LegacyFace, LegacyLightVolume, LegacyVertex},
	lump::{read_entities, read_lump, LumpDirectory, LumpKind},
	BspBrush, BspBrushSide, BspFace, BspFog, BspLeaf, BspLightMap, BspLightVolume, BspModel, BspNode, BspPlane, BspTexture, BspVertex,
	BspVisData,
};
use reader::{BspByteReader, BspParseContext, BspValue};
use util::display_magic_number;

#[derive(Debug, Clone, Error)]
pub enum BspParseError {
	#[error("Unknown format tag \"{}\", expected \"IBSP\" or \"RBSP\"", display_magic_number(found))]
	UnknownFormat { found: [u8; 4] },
	#[error("{lump} lump is {len} bytes long, which is not a multiple of its record size ({record_size} bytes). Malformed/corrupted BSP?")]
	MalformedLump { lump: LumpKind, len: u32, record_size: usize },
	#[error("Tried to read bytes from {from} to {to} from buffer of size {size}")]
	TruncatedBuffer { from: usize, to: usize, size: usize },

	/// For telling the user exactly where the error occurred in the process.
	#[error("{0} - {1}")]
	DoingJob(String, Box<BspParseError>),
}

impl BspParseError {
	/// The error behind any [`BspParseError::DoingJob`].
	pub fn root(&self) -> &BspParseError {
		let mut err = self;
		loop {
			match err {
				Self::DoingJob(_, child) => err = child,
				_ => return err,
			}
		}
	}
}

pub type BspResult<T> = Result<T, BspParseError>;

pub trait BspParseResultDoingJobExt {
	/// Like `map_err`, but specifically for adding messages to BSP errors to tell the user exactly what was going on when the error occurred.
	fn job(self, job: impl ToString) -> Self;

	/// Like [`job`](Self::job), but only builds the message if there is an error to attach it to.
	fn job_with<S: ToString>(self, job: impl FnOnce() -> S) -> Self;
}

impl<T> BspParseResultDoingJobExt for BspResult<T> {
	#[inline]
	fn job(self, job: impl ToString) -> Self {
		self.map_err(|err| BspParseError::DoingJob(job.to_string(), Box::new(err)))
	}

	#[inline]
	fn job_with<S: ToString>(self, job: impl FnOnce() -> S) -> Self {
		self.map_err(|err| BspParseError::DoingJob(job().to_string(), Box::new(err)))
	}
}

/// The two container variants this crate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BspFormat {
	/// id Software's format, used by Quake 3 and its derivatives. One lightmap per face, no brush side surface references.
	///
	/// This is read into the same in-memory shape as [`BspFormat::Rbsp`], see [`data::legacy`].
	Ibsp,
	/// Raven Software's extension (Jedi Outcast, Jedi Academy, Soldier of Fortune 2), with up to 4 lightmaps per face and vertex.
	Rbsp,
}

impl BspFormat {
	pub const IBSP_MAGIC: [u8; 4] = *b"IBSP";
	pub const RBSP_MAGIC: [u8; 4] = *b"RBSP";

	pub fn from_magic_number(data: [u8; 4]) -> BspResult<Self> {
		match data {
			Self::IBSP_MAGIC => Ok(Self::Ibsp),
			Self::RBSP_MAGIC => Ok(Self::Rbsp),
			_ => Err(BspParseError::UnknownFormat { found: data }),
		}
	}

	#[inline]
	pub fn magic_number(self) -> [u8; 4] {
		match self {
			Self::Ibsp => Self::IBSP_MAGIC,
			Self::Rbsp => Self::RBSP_MAGIC,
		}
	}

	/// How many entries the lump directory of this format holds. IBSP files have no light array lump.
	#[inline]
	pub fn lump_count(self) -> usize {
		match self {
			Self::Ibsp => data::lump::LUMP_COUNT - 1,
			Self::Rbsp => data::lump::LUMP_COUNT,
		}
	}

	/// The size of the header and lump directory, the smallest a file of this format can be.
	#[inline]
	pub fn header_size(self) -> usize {
		8 + self.lump_count() * 8
	}
}

impl fmt::Display for BspFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(display_magic_number(&self.magic_number()).as_str())
	}
}

/// Where a [`BspData`] is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
	/// Nothing is loaded, every collection is empty.
	#[default]
	Unloaded,
	/// A load is in progress.
	Loading,
	/// A file was loaded successfully.
	Loaded,
}

/// The data parsed from a BSP file.
///
/// Both formats are normalized to the extended (RBSP) record shapes, `format` says which one the data came from.
#[derive(Debug, Clone, Default)]
pub struct BspData {
	state: LoadState,

	/// The format of the loaded file, `None` if nothing is loaded.
	pub format: Option<BspFormat>,
	/// Version number from the header, 46 or 47 for Quake 3, 1 for Raven's games.
	pub version: i32,

	/// Essentially an embedded .map file with brush data stripped. See [`BspData::parse_entities`].
	pub entities: String,
	/// Materials (shaders) referenced by faces, brushes and brush sides.
	pub textures: Vec<BspTexture>,
	pub planes: Vec<BspPlane>,
	pub nodes: Vec<BspNode>,
	pub leaves: Vec<BspLeaf>,
	/// Face indices referenced by [`BspLeaf`]s.
	pub leaf_faces: Vec<u32>,
	/// Brush indices referenced by [`BspLeaf`]s.
	pub leaf_brushes: Vec<u32>,
	/// Model 0 is the world, the rest are brush entities referenced with `*N`.
	pub models: Vec<BspModel>,
	pub brushes: Vec<BspBrush>,
	pub brush_sides: Vec<BspBrushSide>,
	/// All vertices, faces reference ranges of this.
	pub vertices: Vec<BspVertex>,
	/// Triangle list indices, relative to the first vertex of the face that references them.
	pub indices: Vec<u32>,
	pub fogs: Vec<BspFog>,
	pub faces: Vec<BspFace>,
	pub lightmaps: Vec<BspLightMap>,
	/// Ambient lighting samples on a regular grid over the world model.
	pub light_volumes: Vec<BspLightVolume>,
	pub visibility: BspVisData,
	/// Raw contents of the RBSP light array lump, always empty for IBSP.
	pub light_array: Vec<u8>,
}

impl BspData {
	/// Parses the data from a BSP file.
	pub fn parse(bsp: &[u8]) -> BspResult<Self> {
		let mut data = Self::default();
		data.load(bsp)?;
		Ok(data)
	}

	/// Loads `bsp` into this instance, replacing anything loaded before.
	///
	/// On error, the data is left unloaded, nothing from a partially read file is kept.
	pub fn load(&mut self, bsp: &[u8]) -> BspResult<()> {
		self.unload();
		self.state = LoadState::Loading;

		match Self::read(bsp) {
			Ok(data) => {
				*self = data;
				log::info!(
					"Loaded {} BSP (version {}): {} faces, {} vertices, {} clusters",
					self.format.map(|format| format.to_string()).unwrap_or_default(),
					self.version,
					self.faces.len(),
					self.vertices.len(),
					self.visibility.num_clusters,
				);
				Ok(())
			}
			Err(err) => {
				self.unload();
				Err(err)
			}
		}
	}

	/// Releases everything loaded, leaving this instance in the [`LoadState::Unloaded`] state. Always succeeds.
	pub fn unload(&mut self) {
		*self = Self::default();
	}

	#[inline]
	pub fn state(&self) -> LoadState {
		self.state
	}

	#[inline]
	pub fn is_loaded(&self) -> bool {
		self.state == LoadState::Loaded
	}

	fn read(bsp: &[u8]) -> BspResult<Self> {
		if bsp.len() < 4 {
			return Err(BspParseError::TruncatedBuffer { from: 0, to: 4, size: bsp.len() });
		}

		let mut magic = [0; 4];
		magic.copy_from_slice(&bsp[0..4]);
		let ctx = BspParseContext {
			format: BspFormat::from_magic_number(magic)?,
		};

		let mut reader = BspByteReader::new(&bsp[4..], &ctx);
		let version: i32 = reader.read().job("Reading header version")?;
		let lump_dir: LumpDirectory = reader.read().job("Reading lump directory")?;

		let data = Self {
			state: LoadState::Loaded,
			format: Some(ctx.format),
			version,

			entities: read_entities(bsp, lump_dir[LumpKind::Entities])?,
			textures: read_lump(bsp, LumpKind::Textures, &lump_dir, &ctx)?,
			planes: read_lump(bsp, LumpKind::Planes, &lump_dir, &ctx)?,
			nodes: read_lump(bsp, LumpKind::Nodes, &lump_dir, &ctx)?,
			leaves: read_lump(bsp, LumpKind::Leaves, &lump_dir, &ctx)?,
			leaf_faces: read_lump(bsp, LumpKind::LeafFaces, &lump_dir, &ctx)?,
			leaf_brushes: read_lump(bsp, LumpKind::LeafBrushes, &lump_dir, &ctx)?,
			models: read_lump(bsp, LumpKind::Models, &lump_dir, &ctx)?,
			brushes: read_lump(bsp, LumpKind::Brushes, &lump_dir, &ctx)?,
			brush_sides: read_format_lump::<LegacyBrushSide>(bsp, LumpKind::BrushSides, &lump_dir, &ctx)?,
			vertices: read_format_lump::<LegacyVertex>(bsp, LumpKind::Vertices, &lump_dir, &ctx)?,
			indices: read_lump(bsp, LumpKind::Indices, &lump_dir, &ctx)?,
			fogs: read_lump(bsp, LumpKind::Fogs, &lump_dir, &ctx)?,
			faces: read_format_lump::<LegacyFace>(bsp, LumpKind::Faces, &lump_dir, &ctx)?,
			lightmaps: read_lump(bsp, LumpKind::Lightmaps, &lump_dir, &ctx)?,
			light_volumes: read_format_lump::<LegacyLightVolume>(bsp, LumpKind::LightVolumes, &lump_dir, &ctx)?,
			visibility: lump_dir[LumpKind::Visibility]
				.get(bsp)
				.and_then(|lump| BspVisData::bsp_parse(&mut BspByteReader::new(lump, &ctx)))
				.job("Reading Visibility lump")?,
			light_array: match ctx.format {
				BspFormat::Rbsp => lump_dir[LumpKind::LightArray].get(bsp).job("Reading Light Array lump")?.to_vec(),
				BspFormat::Ibsp => Vec::new(),
			},
		};

		log::debug!("{} textures", data.textures.len());
		log::debug!("{} planes", data.planes.len());
		log::debug!("{} nodes", data.nodes.len());
		log::debug!("{} leaves", data.leaves.len());
		log::debug!("{} leaf faces", data.leaf_faces.len());
		log::debug!("{} leaf brushes", data.leaf_brushes.len());
		log::debug!("{} models", data.models.len());
		log::debug!("{} brushes", data.brushes.len());
		log::debug!("{} brush sides", data.brush_sides.len());
		log::debug!("{} vertices", data.vertices.len());
		log::debug!("{} indices", data.indices.len());
		log::debug!("{} fogs", data.fogs.len());
		log::debug!("{} faces", data.faces.len());
		log::debug!("{} lightmaps", data.lightmaps.len());
		log::debug!("{} light volumes", data.light_volumes.len());
		log::debug!("{} clusters", data.visibility.num_clusters);

		Ok(data)
	}

	/// Returns the texture `face` is drawn with, if its index is valid.
	#[inline]
	pub fn face_texture(&self, face: &BspFace) -> Option<&BspTexture> {
		usize::try_from(face.texture_idx).ok().and_then(|idx| self.textures.get(idx))
	}
}
