//! matbake scene host
//!
//! The bake pipeline never touches a 3D application directly. It drives a
//! [`Scene`], a capability interface over the host's registries (objects,
//! materials, texture groups, images, collections), its render engine and
//! its template library.
//!
//! This crate provides:
//!
//! - The host data model and the [`Scene`] trait
//! - [`MemoryScene`], an in-memory host with a JSON document format and a
//!   flat-colour renderer that writes real PNG files
//! - The [`TexturePacker`] contract and [`ShelfPacker`], its bundled
//!   implementation
//!
//! # Example
//!
//! ```
//! use matbake_scene::{Material, MaterialKind, MemoryScene, Object, Scene};
//!
//! let mut scene = MemoryScene::new();
//! let model = scene.add_collection("Model", None).unwrap();
//! let skin = scene.add_material(Material::new("Skin", MaterialKind::RawEligible)).unwrap();
//! let body = scene.add_linked_object(Object::mesh("Body").with_slots([skin]).body(), model).unwrap();
//! assert_eq!(scene.meshes_in(model).unwrap(), vec![body]);
//! ```

pub mod collection;
pub mod error;
pub mod host;
pub mod ids;
pub mod library;
pub mod material;
pub mod memory;
pub mod naming;
pub mod object;
pub mod packer;
pub mod pass;
pub mod render;

pub use collection::{ApplyScale, Collection, ExportObjectType, ExportSettings, PathMode, SmoothType};
pub use error::{ErrorCode, HostError, HostResult};
pub use host::{DataKind, Scene};
pub use ids::{CollectionId, ImageId, MaterialId, ObjectId, TextureGroupId};
pub use library::{TemplateLibrary, FLATTENER_ASSET, SIMPLE_TEMPLATE, SIMPLE_TEMPLATE_EEVEE_MOD};
pub use material::{
    BlendMethod, BlendSettings, Image, ImageNode, Material, MaterialKind, OutputRoute, ShadeNode,
    ShadingGraph, TextureGroup,
};
pub use memory::MemoryScene;
pub use object::{Axis, Modifier, ModifierKind, Object, ObjectKind, ScaleDriver};
pub use packer::{PackReport, PackedImage, ShelfPacker, TexturePacker};
pub use pass::PassType;
pub use render::{ColorMode, LightLevel, RenderEngine, RenderRecord, RenderSettings, ViewportShading};
