//! Typed handles into the scene registries.
//!
//! Data blocks are addressed by id rather than by name because names change
//! during a bake (`-ORG` suffixing, `.001` collisions) while references must
//! stay valid.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! scene_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

scene_id!(
    /// Handle to an object (mesh, armature, camera, empty).
    ObjectId,
    "object"
);
scene_id!(
    /// Handle to a material.
    MaterialId,
    "material"
);
scene_id!(
    /// Handle to the image-bearing sub-graph of a material.
    TextureGroupId,
    "texture_group"
);
scene_id!(
    /// Handle to an image in the image registry.
    ImageId,
    "image"
);
scene_id!(
    /// Handle to a collection.
    CollectionId,
    "collection"
);
