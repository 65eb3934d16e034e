//! Module containing the core of reading a binary BSP file and interpreting it into structured data.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::mem;

use crate::{BspFormat, BspParseError, BspResult};

use glam::{IVec3, UVec2, Vec2, Vec3};

/// Like a [`Cursor`](std::io::Cursor), but i don't have to constantly juggle buffers.
#[derive(Clone)]
pub struct BspByteReader<'a> {
	pub ctx: &'a BspParseContext,
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> BspByteReader<'a> {
	#[inline]
	pub fn new(bytes: &'a [u8], ctx: &'a BspParseContext) -> Self {
		Self { ctx, bytes, pos: 0 }
	}

	fn rest(&self) -> &[u8] {
		&self.bytes[self.pos..]
	}

	/// The number of bytes left to read.
	#[inline]
	pub fn len(&self) -> usize {
		self.rest().len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.rest().is_empty()
	}

	#[inline]
	pub fn read<T: BspValue>(&mut self) -> BspResult<T> {
		T::bsp_parse(self)
	}

	/// Reads `count` bytes, failing with [`BspParseError::TruncatedBuffer`] before touching anything past the end of the buffer.
	#[inline]
	pub fn read_bytes(&mut self, count: usize) -> BspResult<&'a [u8]> {
		let from = self.pos;
		let to = from.checked_add(count).ok_or(BspParseError::TruncatedBuffer {
			from,
			to: usize::MAX,
			size: self.bytes.len(),
		})?;
		if to > self.bytes.len() {
			return Err(BspParseError::TruncatedBuffer {
				from,
				to,
				size: self.bytes.len(),
			});
		}
		let bytes = &self.bytes[from..to];
		self.pos = to;
		Ok(bytes)
	}

	#[inline]
	pub fn pos(&self) -> usize {
		self.pos
	}
}

/// Defines how a type should be read from a BSP file.
pub trait BspValue: Sized {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self>;
	/// The number of bytes this type takes up on disk for the format in `ctx`.
	fn bsp_struct_size(ctx: &BspParseContext) -> usize;
}

macro_rules! impl_bsp_parse_primitive {
	($ty:ty) => {
		impl BspValue for $ty {
			#[inline]
			fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
				// `read_bytes` returns exactly `size_of::<$ty>()` bytes, the conversion can't fail.
				Ok(<$ty>::from_le_bytes(reader.read_bytes(size_of::<$ty>())?.try_into().unwrap()))
			}
			#[inline]
			fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
				size_of::<$ty>()
			}
		}
	};
}

macro_rules! impl_bsp_parse_vector {
	($ty:ty : [$element:ty; $count:expr]) => {
		impl BspValue for $ty {
			fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
				Ok(<$ty>::from_array(reader.read::<[$element; $count]>()?))
			}
			fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
				size_of::<$element>() * $count
			}
		}
	};
}

impl_bsp_parse_primitive!(u16);
impl_bsp_parse_primitive!(u32);

impl_bsp_parse_primitive!(i16);
impl_bsp_parse_primitive!(i32);

impl_bsp_parse_primitive!(f32);

impl BspValue for u8 {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read_bytes(1).map(|bytes| bytes[0])
	}
	#[inline]
	fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
		1
	}
}

impl_bsp_parse_vector!(Vec2: [f32; 2]);
impl_bsp_parse_vector!(Vec3: [f32; 3]);
impl_bsp_parse_vector!(IVec3: [i32; 3]);
impl_bsp_parse_vector!(UVec2: [u32; 2]);

impl<T: BspValue + std::fmt::Debug, const N: usize> BspValue for [T; N] {
	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		// Look ma, no heap allocations!
		let mut out = [(); N].map(|_| mem::MaybeUninit::uninit());
		for (i, slot) in out.iter_mut().enumerate() {
			match reader.read() {
				Ok(value) => {
					slot.write(value);
				}
				Err(err) => {
					// Drop what was already written before bailing.
					for written in &mut out[..i] {
						// SAFETY: Every slot before `i` was initialized above.
						unsafe { written.assume_init_drop() };
					}
					return Err(err);
				}
			}
		}
		// SAFETY: The loop above either initialized all N slots or returned.
		Ok(out.map(|v| unsafe { v.assume_init() }))
	}
	#[inline]
	fn bsp_struct_size(ctx: &BspParseContext) -> usize {
		T::bsp_struct_size(ctx) * N
	}
}

/// Information about the file being parsed, available to every [`BspValue`] through [`BspByteReader::ctx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspParseContext {
	pub format: BspFormat,
}
