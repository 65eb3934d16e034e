//! Data definitions for visibility data, storing which clusters of the map can be seen from any other.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	reader::{BspByteReader, BspParseContext, BspValue},
	BspParseError, BspParseResultDoingJobExt, BspResult,
};

/// The potentially visible set, as a bit matrix of `num_clusters` rows of `row_size` bytes each.
///
/// An empty visibility lump is read as zero clusters, which engines treat as everything being visible.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspVisData {
	pub num_clusters: u32,
	/// Bytes per cluster row, at least `ceil(num_clusters / 8)`.
	pub row_size: u32,
	/// `num_clusters * row_size` bytes.
	pub bits: Vec<u8>,
}

impl BspValue for BspVisData {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		if reader.is_empty() {
			return Ok(Self::default());
		}

		let num_clusters: u32 = reader.read().job("Reading cluster count")?;
		let row_size: u32 = reader.read().job("Reading row size")?;

		let len = (num_clusters as usize).checked_mul(row_size as usize).ok_or(BspParseError::TruncatedBuffer {
			from: reader.pos(),
			to: usize::MAX,
			size: reader.pos() + reader.len(),
		})?;
		let bits = reader.read_bytes(len).job("Reading visibility bits")?.to_vec();

		Ok(Self {
			num_clusters,
			row_size,
			bits,
		})
	}

	/// Size of the fixed header, the bit matrix that follows is variably sized.
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		u32::bsp_struct_size(ctx) * 2
	}
}

impl BspVisData {
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.num_clusters == 0
	}

	/// The row of visibility bits for `cluster`, bit `j` set meaning cluster `j` is visible from it.
	pub fn row(&self, cluster: u32) -> Option<&[u8]> {
		if cluster >= self.num_clusters {
			return None;
		}
		let start = cluster as usize * self.row_size as usize;
		self.bits.get(start..start + self.row_size as usize)
	}

	/// Returns `true` if cluster `to` is potentially visible from cluster `from`.
	///
	/// With no visibility data, or a negative (invalid) cluster, everything is visible.
	pub fn cluster_visible(&self, from: i32, to: i32) -> bool {
		let (Ok(from), Ok(to)) = (u32::try_from(from), u32::try_from(to)) else {
			return true;
		};
		if self.is_empty() {
			return true;
		}

		self.row(from)
			.and_then(|row| row.get(to as usize / 8))
			.is_some_and(|byte| byte & (1 << (to % 8)) != 0)
	}

	/// Iterates the clusters visible from `cluster`.
	pub fn visible_clusters(&self, cluster: u32) -> impl Iterator<Item = u32> + '_ {
		let row = self.row(cluster).unwrap_or_default();
		(0..self.num_clusters).filter(move |to| row.get(*to as usize / 8).is_some_and(|byte| byte & (1 << (to % 8)) != 0))
	}
}
