//! BSP file data definitions.

pub mod entities;
pub mod legacy;
pub mod lighting;
pub mod lump;
pub mod models;
pub mod nodes;
pub mod texture;
pub mod util;
pub mod visdata;

pub use entities::{BspEntities, BspEntity, EntityParseError};
pub use lighting::{BspLightMap, BspLightVolume, LightmapId, LightmapStyle, LIGHTMAP_GAMMA, LIGHTMAP_SIZE, MAX_LIGHTMAPS};
pub use lump::{LumpDirectory, LumpEntry, LumpKind};
pub use models::{BspBrush, BspBrushSide, BspFace, BspModel, BspVertex, FaceType};
pub use nodes::{BoundingBox, BspLeaf, BspNode, BspNodeRef, BspPlane, IntBoundingBox};
pub use texture::{BspFog, BspTexture, ContentFlags, SurfaceFlags};
pub use util::FixedStr;
pub use visdata::BspVisData;
