//! Scene object, modifier and constraint types.

use crate::ObjectId;
use osteoplan_booleans::BooleanOp;
use osteoplan_math::{Mat4, Trs};
use osteoplan_mesh::TriMesh;

/// Named groups the pipeline files objects into. This grouping is the
/// only structure surfaced to the host for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Freshly created objects not yet filed anywhere.
    Unfiled,
    /// The untouched input meshes.
    Original,
    /// Fibula working set (segments, previews).
    FibulaWorking,
    /// Mandible working set (rig, cells, working copies).
    MandibleWorking,
    /// Fibula guide objects.
    FibulaGuides,
    /// Mandible guide and positioning-aid objects.
    MandibleGuides,
    /// Fibula-side cutting planes.
    FibulaCuttingPlanes,
    /// Mandible-side cutting planes.
    MandibleCuttingPlanes,
}

impl Group {
    /// Stable name of the group as surfaced to the host.
    pub fn label(&self) -> &'static str {
        match self {
            Group::Unfiled => "scene",
            Group::Original => "original",
            Group::FibulaWorking => "fibula_working",
            Group::MandibleWorking => "mandible_working",
            Group::FibulaGuides => "guide_fibula",
            Group::MandibleGuides => "guide_mandible",
            Group::FibulaCuttingPlanes => "cutting_planes_fibula",
            Group::MandibleCuttingPlanes => "cutting_planes_mandible",
        }
    }
}

/// How an object is bound to something above it in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentLink {
    /// Regular object parenting. `parent_inverse` is recorded at
    /// parenting time so the child's world transform is preserved.
    Object {
        /// The parent object.
        target: ObjectId,
        /// Inverse of the parent's world matrix at parenting time.
        parent_inverse: Mat4,
    },
    /// Deformed by the scene armature through the object's vertex
    /// groups (used by the partition cells).
    ArmatureDeform,
}

/// Target of a constraint: another object, or an armature joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintTarget {
    /// A scene object.
    Object(ObjectId),
    /// Joint index into the scene armature.
    Joint(usize),
}

/// A live transform binding, evaluated every time a world matrix is
/// requested. Constraints are applied in attachment order.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// World transform becomes `target_world · own_local` ("no inverse"
    /// semantics: the owner's local transform is re-read as being
    /// relative to the target).
    ChildOf {
        /// What the owner follows.
        target: ConstraintTarget,
    },
    /// World-space rotation is replaced by the target's.
    CopyRotation {
        /// Rotation source.
        target: ObjectId,
    },
    /// World-space rotation points the owner's +Y axis at the target.
    TrackTo {
        /// What the owner looks at.
        target: ConstraintTarget,
    },
}

/// An ordered, non-destructive procedural operation on an object's mesh.
///
/// Modifiers only take effect when the mesh is evaluated or explicitly
/// baked; the authored mesh data is untouched until then.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// CSG boolean against another object's evaluated geometry.
    Boolean {
        /// Operation to apply.
        op: BooleanOp,
        /// The operand object.
        operand: ObjectId,
    },
    /// Round-over of sharp edges (evaluated in world space).
    Bevel {
        /// Smoothing pass count.
        segments: u32,
        /// Maximum round-over distance.
        width: f64,
    },
    /// Polygon-count reduction.
    Decimate {
        /// Target triangle ratio in (0, 1].
        ratio: f64,
    },
}

impl Modifier {
    /// Whether this is a boolean modifier.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Modifier::Boolean { .. })
    }
}

/// Binds a subset of an object's vertices to an armature joint for
/// deform parenting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexGroup {
    /// Joint index into the scene armature.
    pub joint: usize,
    /// Vertex indices fully weighted to that joint.
    pub vertices: Vec<u32>,
}

/// A mesh object owned by the scene arena.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Display name (unique within the scene).
    pub name: String,
    /// Authored mesh data in local space.
    pub mesh: TriMesh,
    /// Authored local transform.
    pub transform: Trs,
    /// Optional binding above this object.
    pub parent: Option<ParentLink>,
    /// Live transform constraints, applied in order.
    pub constraints: Vec<Constraint>,
    /// Pending procedural operations, applied in order.
    pub modifiers: Vec<Modifier>,
    /// Joint bindings for armature deform.
    pub vertex_groups: Vec<VertexGroup>,
    /// Group this object is filed into.
    pub group: Group,
    /// Hidden from the viewport (scaffold objects).
    pub hidden: bool,
    /// Drawn as wireframe (limit/difference volumes).
    pub wire: bool,
    /// Display color (RGBA), if assigned.
    pub color: Option<[f32; 4]>,
}

impl SceneObject {
    /// Create an unfiled object with an identity transform.
    pub fn new(name: impl Into<String>, mesh: TriMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform: Trs::identity(),
            parent: None,
            constraints: Vec::new(),
            modifiers: Vec::new(),
            vertex_groups: Vec::new(),
            group: Group::Unfiled,
            hidden: false,
            wire: false,
            color: None,
        }
    }
}
