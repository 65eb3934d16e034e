//! Parsing of the entity lump, a list of `{ "key" "value" ... }` blocks.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BspData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntityParseError {
	#[error("Unexpected '{found}' at byte {position}")]
	Unexpected { found: char, position: usize },
	#[error("Entity text ended inside an entity")]
	UnexpectedEnd,
}

/// A single entity, e.g. `worldspawn` or `info_player_deathmatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspEntity {
	pub properties: HashMap<String, String>,
}

impl BspEntity {
	#[inline]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.properties.get(key).map(String::as_str)
	}

	#[inline]
	pub fn classname(&self) -> Option<&str> {
		self.get("classname")
	}

	/// If this is a brush entity, the index of the [`BspModel`](crate::data::BspModel) it uses (its `model` is `*N`).
	pub fn model_idx(&self) -> Option<usize> {
		self.get("model")?.strip_prefix('*')?.parse().ok()
	}
}

/// Every entity in the order they appear in the lump.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_more::Deref, derive_more::DerefMut, derive_more::IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BspEntities {
	#[deref]
	#[deref_mut]
	#[into_iterator(owned, ref, ref_mut)]
	pub entities: Vec<BspEntity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
	OutsideEntity,
	InsideEntity,
	InKey,
	AfterKey,
	InValue,
}

impl BspEntities {
	/// Parses entity text. Braces inside quoted strings are part of the string, anything else outside of quotes is ignored.
	pub fn parse(text: &str) -> Result<Self, EntityParseError> {
		use ParseState::*;

		let mut entities = Vec::new();
		let mut properties = HashMap::new();
		let mut state = OutsideEntity;
		let (mut key_start, mut key_end, mut value_start) = (0, 0, 0);

		for (i, c) in text.char_indices() {
			match (state, c) {
				(OutsideEntity, '{') => state = InsideEntity,
				(OutsideEntity, '"' | '}') => return Err(EntityParseError::Unexpected { found: c, position: i }),

				(InsideEntity, '"') => {
					state = InKey;
					key_start = i + 1;
				}
				(InsideEntity, '}') => {
					entities.push(BspEntity {
						properties: std::mem::take(&mut properties),
					});
					state = OutsideEntity;
				}
				(InsideEntity, '{') => return Err(EntityParseError::Unexpected { found: c, position: i }),

				(InKey, '"') => {
					state = AfterKey;
					key_end = i;
				}

				(AfterKey, '"') => {
					state = InValue;
					value_start = i + 1;
				}
				(AfterKey, '{' | '}') => return Err(EntityParseError::Unexpected { found: c, position: i }),

				(InValue, '"') => {
					state = InsideEntity;
					properties.insert(text[key_start..key_end].to_owned(), text[value_start..i].to_owned());
				}

				_ => {}
			}
		}

		if state != OutsideEntity {
			return Err(EntityParseError::UnexpectedEnd);
		}

		Ok(Self { entities })
	}

	/// The first entity with the classname `worldspawn`.
	pub fn worldspawn(&self) -> Option<&BspEntity> {
		self.iter().find(|entity| entity.classname() == Some("worldspawn"))
	}

	pub fn by_classname<'a>(&'a self, classname: &'a str) -> impl Iterator<Item = &'a BspEntity> + 'a {
		self.iter().filter(move |entity| entity.classname() == Some(classname))
	}
}

impl BspData {
	/// Parses [`BspData::entities`].
	pub fn parse_entities(&self) -> Result<BspEntities, EntityParseError> {
		BspEntities::parse(&self.entities)
	}
}
