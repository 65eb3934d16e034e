//! The lump directory, and reading homogeneous record arrays out of it.

use std::{borrow::Cow, ops::Index};

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{
	reader::{BspByteReader, BspParseContext, BspValue},
	BspParseError, BspParseResultDoingJobExt, BspResult,
};

/// Number of lumps in the largest (RBSP) directory.
pub const LUMP_COUNT: usize = 18;

/// Every lump, in directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, Display)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "title_case")]
pub enum LumpKind {
	Entities,
	Textures,
	Planes,
	Nodes,
	Leaves,
	LeafFaces,
	LeafBrushes,
	Models,
	Brushes,
	BrushSides,
	Vertices,
	Indices,
	Fogs,
	Faces,
	Lightmaps,
	LightVolumes,
	Visibility,
	/// RBSP only.
	LightArray,
}

#[derive(BspValue, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LumpEntry {
	/// Offset from the start of the file.
	pub offset: u32,
	pub len: u32,
}

impl LumpEntry {
	pub const EMPTY: Self = Self { offset: 0, len: 0 };

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the bytes this entry covers in `data`, or [`BspParseError::TruncatedBuffer`] if it would extend past the end.
	pub fn get<'a>(&self, data: &'a [u8]) -> BspResult<&'a [u8]> {
		let from = self.offset as usize;
		let to = from.saturating_add(self.len as usize);
		if to > data.len() {
			return Err(BspParseError::TruncatedBuffer { from, to, size: data.len() });
		}
		Ok(&data[from..to])
	}
}

/// The directory of lumps following the header. Lumps a format doesn't store are [`LumpEntry::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumpDirectory {
	entries: [LumpEntry; LUMP_COUNT],
}

impl BspValue for LumpDirectory {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		let mut entries = [LumpEntry::EMPTY; LUMP_COUNT];
		for (entry, kind) in entries.iter_mut().zip(LumpKind::iter()).take(reader.ctx.format.lump_count()) {
			*entry = reader.read().job_with(|| format!("Reading {kind} lump entry"))?;
		}
		Ok(Self { entries })
	}

	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		LumpEntry::bsp_struct_size(ctx) * ctx.format.lump_count()
	}
}

impl Index<LumpKind> for LumpDirectory {
	type Output = LumpEntry;

	#[inline]
	fn index(&self, kind: LumpKind) -> &Self::Output {
		&self.entries[kind as usize]
	}
}

/// Reads the `kind` lump as a tightly packed array of `T`.
///
/// The lump has to lie inside `bsp` and be a whole number of `T` records long. An empty lump is an empty array.
pub fn read_lump<T: BspValue>(bsp: &[u8], kind: LumpKind, dir: &LumpDirectory, ctx: &BspParseContext) -> BspResult<Vec<T>> {
	let entry = dir[kind];
	let data = entry.get(bsp).job_with(|| format!("Reading {kind} lump"))?;
	let record_size = T::bsp_struct_size(ctx);

	if record_size == 0 || data.len() % record_size != 0 {
		return Err(BspParseError::MalformedLump {
			lump: kind,
			len: entry.len,
			record_size,
		});
	}

	let count = data.len() / record_size;
	let mut reader = BspByteReader::new(data, ctx);
	let mut out = Vec::with_capacity(count);
	for i in 0..count {
		out.push(reader.read().job_with(|| format!("Reading {kind} lump, record {i}"))?);
	}

	Ok(out)
}

/// Reads the entity lump as text, up to the first NUL.
pub fn read_entities(bsp: &[u8], entry: LumpEntry) -> BspResult<String> {
	let data = entry.get(bsp).job("Reading Entities lump")?;
	let data = data.iter().position(|b| *b == 0).map_or(data, |end| &data[..end]);

	Ok(match String::from_utf8_lossy(data) {
		Cow::Borrowed(s) => s.to_owned(),
		Cow::Owned(s) => {
			log::warn!("Entity lump contains invalid UTF-8, replaced with U+FFFD");
			s
		}
	})
}
