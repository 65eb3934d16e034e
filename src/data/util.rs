//! Utilities for BSP data that don't warrant their own modules.

use std::{borrow::Cow, str::FromStr};

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::Reflect;
#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
	reader::{BspByteReader, BspParseContext, BspValue},
	BspResult,
};

/// Fixed-sized, zero-padded string. Usually ASCII, but read as raw bytes so odd names don't fail a load.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct FixedStr<const N: usize> {
	data: [u8; N],
}

impl<const N: usize> BspValue for FixedStr<N> {
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		let s = Self::new(reader.read()?);
		if std::str::from_utf8(s.as_bytes()).is_err() {
			log::warn!("Name {:?} contains invalid UTF-8, replaced with U+FFFD", s.as_str());
		}
		Ok(s)
	}
	#[inline]
	fn bsp_struct_size(_ctx: &BspParseContext) -> usize {
		N
	}
}

impl<const N: usize> FixedStr<N> {
	pub fn new(mut data: [u8; N]) -> Self {
		// Clear any garbage after the '\0' terminator.
		if let Some(index) = data.iter().position(|b| *b == 0) {
			data[index..].fill(0);
		}
		Self { data }
	}

	/// The bytes up to the terminator.
	pub fn as_bytes(&self) -> &[u8] {
		let len = self.data.iter().position(|b| *b == 0).unwrap_or(N);
		&self.data[..len]
	}

	/// The string up to the terminator, with invalid UTF-8 replaced by U+FFFD.
	pub fn as_str(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(self.as_bytes())
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.as_bytes().is_empty()
	}
}

impl<const N: usize> Default for FixedStr<N> {
	fn default() -> Self {
		Self { data: [0; N] }
	}
}

impl<const N: usize> std::fmt::Debug for FixedStr<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.as_str(), f)
	}
}

impl<const N: usize> std::fmt::Display for FixedStr<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.as_str())
	}
}

impl<const N: usize> FromStr for FixedStr<N> {
	type Err = ();

	/// Fails if `s` doesn't fit, or contains a NUL which would cut it short.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.len() > N || s.contains('\0') {
			return Err(());
		}
		let mut data = [0; N];
		data[..s.len()].copy_from_slice(s.as_bytes());

		Ok(Self { data })
	}
}

#[cfg(feature = "serde")]
impl<const N: usize> Serialize for FixedStr<N> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.as_str())
	}
}

#[cfg(feature = "serde")]
impl<'de, const N: usize> Deserialize<'de> for FixedStr<N> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct DataVisitor<const N: usize>;
		impl<const N: usize> de::Visitor<'_> for DataVisitor<N> {
			type Value = FixedStr<N>;
			fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(fmt, "string of at most {N} bytes")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
				FixedStr::from_str(v).map_err(|_| E::custom(format_args!("string was of len {}, when max len is {N}", v.len())))
			}
		}

		deserializer.deserialize_str(DataVisitor::<N>)
	}
}
