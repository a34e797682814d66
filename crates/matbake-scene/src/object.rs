//! Objects, modifiers and scale drivers.

use serde::{Deserialize, Serialize};

use crate::ids::{MaterialId, ObjectId};

/// What an object holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Mesh,
    Armature,
    Camera { ortho_scale: f64 },
    Empty,
}

/// Scale axis a driver controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// Keeps an object at a 1:1 aspect against the render resolution as seen
/// through an orthographic camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDriver {
    pub axis: Axis,
    pub camera: ObjectId,
}

impl ScaleDriver {
    /// Scale for this driver's axis.
    ///
    /// X: `ortho * rx/ry` when `rx/ry < 1`, otherwise `ortho`.
    /// Y: `ortho * ry/rx` when `ry/rx < 1`, otherwise `ortho`.
    pub fn evaluate(&self, ortho_scale: f64, resolution_x: u32, resolution_y: u32) -> f64 {
        let (along, across) = match self.axis {
            Axis::X => (resolution_x as f64, resolution_y as f64),
            Axis::Y => (resolution_y as f64, resolution_x as f64),
        };
        if across <= 0.0 {
            return ortho_scale;
        }
        let ratio = along / across;
        if ratio < 1.0 {
            ratio * ortho_scale
        } else {
            ortho_scale
        }
    }
}

/// Modifier variants the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierKind {
    Armature {
        #[serde(default)]
        object: Option<ObjectId>,
    },
    /// Outline shell.
    Solidify {
        show_render: bool,
        show_viewport: bool,
    },
    UvWarp {
        #[serde(default)]
        object_from: Option<ObjectId>,
        #[serde(default)]
        object_to: Option<ObjectId>,
    },
    /// External UV flattening transform bound to a UV channel.
    Flatten { uv_channel: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

/// A scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Ordered material slots; order is meaningful and restored after a bake.
    #[serde(default)]
    pub material_slots: Vec<Option<MaterialId>>,
    /// Primary body mesh, as opposed to attachable clothing.
    #[serde(default)]
    pub is_body: bool,
    #[serde(default)]
    pub hide_render: bool,
    #[serde(default)]
    pub location: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    #[serde(default)]
    pub uv_layers: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub drivers: Vec<ScaleDriver>,
    #[serde(default)]
    pub parent: Option<ObjectId>,
}

impl Object {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            material_slots: Vec::new(),
            is_body: false,
            hide_render: false,
            location: [0.0; 3],
            scale: unit_scale(),
            uv_layers: Vec::new(),
            modifiers: Vec::new(),
            drivers: Vec::new(),
            parent: None,
        }
    }

    pub fn mesh(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Mesh)
    }

    pub fn with_slots(mut self, slots: impl IntoIterator<Item = MaterialId>) -> Self {
        self.material_slots = slots.into_iter().map(Some).collect();
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn body(mut self) -> Self {
        self.is_body = true;
        self
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh)
    }

    pub fn is_camera(&self) -> bool {
        matches!(self.kind, ObjectKind::Camera { .. })
    }

    pub fn is_armature(&self) -> bool {
        matches!(self.kind, ObjectKind::Armature)
    }

    pub fn modifier(&self, name: &str) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }

    /// Materials in slot order, skipping empty slots.
    pub fn materials(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.material_slots.iter().flatten().copied()
    }
}
