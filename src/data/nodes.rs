//! Data definitions for the BSP node tree.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
use glam::{IVec3, Vec3};
use q3bsp_macros::BspValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
	reader::{BspByteReader, BspParseContext, BspValue},
	BspResult,
};

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspPlane {
	pub normal: Vec3,
	pub dist: f32,
}

/// A reference to a [`BspNode`]. Reads an `i32`, if positive it's an index of a node, if negative it's the index of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BspNodeRef {
	/// A reference to a node.
	Node(u32),
	/// A reference to a leaf.
	Leaf(u32),
}

impl BspValue for BspNodeRef {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		Ok(BspNodeRef::from_i32(i32::bsp_parse(reader)?))
	}

	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		i32::bsp_struct_size(ctx)
	}
}

impl BspNodeRef {
	/// Negative values are treated as a leaf index of `-(value + 1)`.
	pub const fn from_i32(value: i32) -> Self {
		if value.is_negative() {
			// Bitwise not handles integer asymmetry and overflow.
			Self::Leaf(!value as u32)
		} else {
			Self::Node(value as u32)
		}
	}

	/// If this reference points to a node, get the index of the node.
	pub fn node(&self) -> Option<u32> {
		match *self {
			Self::Node(i) => Some(i),
			Self::Leaf(_) => None,
		}
	}

	/// If this reference points to a leaf, get the index of the leaf.
	pub fn leaf(&self) -> Option<u32> {
		match *self {
			Self::Leaf(i) => Some(i),
			Self::Node(_) => None,
		}
	}
}

impl From<i32> for BspNodeRef {
	fn from(value: i32) -> Self {
		Self::from_i32(value)
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
	pub min: Vec3,
	pub max: Vec3,
}

/// Integer bounding box, used by nodes and leaves.
#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntBoundingBox {
	pub min: IVec3,
	pub max: IVec3,
}

impl From<IntBoundingBox> for BoundingBox {
	fn from(value: IntBoundingBox) -> Self {
		Self {
			min: value.min.as_vec3(),
			max: value.max.as_vec3(),
		}
	}
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspNode {
	/// Index of the [`BspPlane`] that splits the node.
	pub plane_idx: u32,

	pub front: BspNodeRef,
	pub back: BspNodeRef,

	/// Bounding box of the node and all its children.
	pub bound: IntBoundingBox,
}

#[derive(BspValue, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspLeaf {
	/// Visibility cluster, or [`BspLeaf::NO_CLUSTER`] if the leaf is opaque or outside the map.
	pub cluster: i32,
	/// Area for area portals.
	pub area: i32,

	pub bound: IntBoundingBox,

	/// Index into [`BspData::leaf_faces`](crate::BspData::leaf_faces).
	pub first_leaf_face: u32,
	pub num_leaf_faces: u32,

	/// Index into [`BspData::leaf_brushes`](crate::BspData::leaf_brushes).
	pub first_leaf_brush: u32,
	pub num_leaf_brushes: u32,
}

impl BspLeaf {
	pub const NO_CLUSTER: i32 = -1;

	/// The cluster this leaf belongs to, if any.
	#[inline]
	pub fn cluster(&self) -> Option<u32> {
		u32::try_from(self.cluster).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::BspFormat;

	#[test]
	fn node_ref_from_i32() {
		assert_eq!(BspNodeRef::from_i32(5), BspNodeRef::Node(5));
		assert_eq!(BspNodeRef::from_i32(-1), BspNodeRef::Leaf(0));
		assert_eq!(BspNodeRef::from_i32(-3).leaf(), Some(2));
		assert_eq!(BspNodeRef::from_i32(i32::MIN), BspNodeRef::Leaf(i32::MAX as u32));
	}

	#[test]
	fn record_sizes() {
		let ctx = BspParseContext { format: BspFormat::Rbsp };
		assert_eq!(BspPlane::bsp_struct_size(&ctx), 16);
		assert_eq!(BspNode::bsp_struct_size(&ctx), 36);
		assert_eq!(BspLeaf::bsp_struct_size(&ctx), 48);
	}

	#[test]
	fn leaf_without_cluster() {
		let ctx = BspParseContext { format: BspFormat::Rbsp };
		let mut bytes = [0u8; 48];
		bytes[0..4].copy_from_slice(&BspLeaf::NO_CLUSTER.to_le_bytes());
		bytes[8..12].copy_from_slice(&(-64i32).to_le_bytes());

		let leaf: BspLeaf = BspByteReader::new(&bytes, &ctx).read().unwrap();
		assert_eq!(leaf.cluster(), None);
		assert_eq!(leaf.bound.min.x, -64);
	}
}
