//! Rig construction: armature, partition cells, carve cells, vector
//! empties and fibula segments.

use crate::{palette, RigError, RigResult};
use osteoplan_booleans::{BooleanOp, BooleanSolver};
use osteoplan_math::{Trs, Vec3};
use osteoplan_mesh::primitives;
use osteoplan_scene::{
    Armature, Constraint, ConstraintTarget, Group, Modifier, ObjectId, ParentLink, Scene,
    SceneObject, VertexGroup,
};
use tracing::info;

/// Distance between adjacent joints along the construction axis (cm).
pub const JOINT_PITCH: f64 = 3.0;

/// Half extent of the partition-cell cross section (cm); generous enough
/// to fully contain a fibula slice.
const CELL_HALF_EXTENT: f64 = 2.0;

/// Triangle budget oversized inputs are decimated down to.
const DECIMATE_TARGET_TRIANGLES: f64 = 10_000.0;

/// In-plane overscale applied to carve cells so boolean faces never
/// coincide with segment boundaries.
const CARVE_OVERSCALE: f64 = 1.2;

/// Options for [`build`].
#[derive(Debug, Clone)]
pub struct RigOptions {
    /// Number of fibula segments; the rig gets `segment_count + 1`
    /// joints.
    pub segment_count: usize,
    /// Joint spacing.
    pub pitch: f64,
    /// Decimate oversized inputs before duplicating them.
    pub auto_decimate: bool,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            segment_count: 3,
            pitch: JOINT_PITCH,
            auto_decimate: false,
        }
    }
}

/// Typed registry of everything the rig build created.
#[derive(Debug, Clone)]
pub struct RigSet {
    /// The untouched fibula input.
    pub fibula_source: ObjectId,
    /// The untouched mandible input.
    pub mandible_source: ObjectId,
    /// Working copy of the fibula.
    pub fibula_copy: ObjectId,
    /// Working copy of the mandible.
    pub mandible_copy: ObjectId,
    /// Mandible preview carrying one difference modifier per carve cell.
    pub mandible_preview: ObjectId,
    /// Partition cells, one per segment.
    pub cells: Vec<ObjectId>,
    /// Carve cells subtracted from the mandible preview.
    pub carve_cells: Vec<ObjectId>,
    /// Vector empties, one per segment.
    pub vectors: Vec<ObjectId>,
    /// Fibula segments, one per segment.
    pub segments: Vec<ObjectId>,
    /// Shared joint display proxy.
    pub joint_shape: ObjectId,
}

impl RigSet {
    /// Number of segments this rig was built with.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Build the rig from the two selected patient meshes.
///
/// Fails with [`RigError::AlreadyBuilt`] if an armature already exists;
/// tear the previous build down first. On success the scene holds the
/// armature plus all working objects, and the returned [`RigSet`] is the
/// registry later stages use.
pub fn build(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    fibula: ObjectId,
    mandible: ObjectId,
    options: &RigOptions,
) -> RigResult<RigSet> {
    if scene.armature.is_some() {
        return Err(RigError::AlreadyBuilt);
    }
    if options.segment_count < 1 {
        return Err(RigError::InvalidSegmentCount(options.segment_count));
    }

    if options.auto_decimate {
        decimate_input(scene, solver, fibula)?;
        decimate_input(scene, solver, mandible)?;
    }

    // File the originals away; everything downstream works on copies.
    for id in [fibula, mandible] {
        let obj = scene.object_mut(id)?;
        obj.group = Group::Original;
    }

    let mandible_copy = scene.duplicate(mandible)?;
    {
        let obj = scene.object_mut(mandible_copy)?;
        obj.name = "mandible_copy".into();
        obj.group = Group::MandibleWorking;
        obj.color = Some(palette::TRANSPARENT_BONE);
    }
    let fibula_copy = scene.duplicate(fibula)?;
    {
        let obj = scene.object_mut(fibula_copy)?;
        obj.name = "fibula_copy".into();
        obj.group = Group::FibulaWorking;
        obj.color = Some(palette::TRANSPARENT_BONE);
    }

    let n = options.segment_count;
    scene.armature = Some(Armature::new(n + 1, options.pitch));

    // Shared display proxy for every joint.
    let mut shape = SceneObject::new(
        "joint_shape",
        primitives::boxed(&Vec3::new(0.4, 0.4, 0.4)),
    );
    shape.hidden = true;
    shape.group = Group::MandibleWorking;
    let joint_shape = scene.add(shape);
    for i in 0..=n {
        scene.armature_mut()?.joint_mut(i)?.visual_proxy = Some(joint_shape);
    }

    let cells = build_partition_cells(scene, n, options.pitch)?;
    let carve_cells = build_carve_cells(scene, &cells)?;

    let mandible_preview = scene.duplicate(mandible_copy)?;
    {
        let obj = scene.object_mut(mandible_preview)?;
        obj.name = "mandible_preview".into();
        for &cell in &carve_cells {
            obj.modifiers.push(Modifier::Boolean {
                op: BooleanOp::Difference,
                operand: cell,
            });
        }
    }

    let vectors = build_vectors(scene, n)?;
    let segments = build_segments(scene, fibula, &vectors, &cells, options.pitch)?;

    // Hide the untouched inputs now that copies exist.
    for id in [fibula, mandible] {
        scene.object_mut(id)?.hidden = true;
    }

    info!(
        segments = n,
        joints = n + 1,
        "rig built"
    );

    Ok(RigSet {
        fibula_source: fibula,
        mandible_source: mandible,
        fibula_copy,
        mandible_copy,
        mandible_preview,
        cells,
        carve_cells,
        vectors,
        segments,
        joint_shape,
    })
}

/// Decimate an oversized input down to the triangle budget, baking the
/// result immediately.
fn decimate_input(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    id: ObjectId,
) -> RigResult<()> {
    let triangles = scene.object(id)?.mesh.triangle_count();
    if triangles == 0 {
        return Ok(());
    }
    let ratio = (DECIMATE_TARGET_TRIANGLES / triangles as f64).min(1.0);
    if ratio >= 1.0 {
        return Ok(());
    }
    scene
        .object_mut(id)?
        .modifiers
        .push(Modifier::Decimate { ratio });
    scene.apply_all_modifiers(id, solver)?;
    info!(object = %scene.object(id)?.name, ratio, "decimated input");
    Ok(())
}

fn build_partition_cells(
    scene: &mut Scene,
    segment_count: usize,
    pitch: f64,
) -> RigResult<Vec<ObjectId>> {
    let mut cells = Vec::with_capacity(segment_count);
    for i in 0..segment_count {
        let (mesh, [lower, upper]) = primitives::partition_cell(pitch, CELL_HALF_EXTENT);
        let mut cell = SceneObject::new(format!("partition_cell.{i}"), mesh);
        cell.transform = Trs::from_translation(Vec3::new(0.0, i as f64 * pitch, 0.0));
        cell.parent = Some(ParentLink::ArmatureDeform);
        cell.vertex_groups = vec![
            VertexGroup {
                joint: i,
                vertices: lower,
            },
            VertexGroup {
                joint: i + 1,
                vertices: upper,
            },
        ];
        cell.hidden = true;
        cell.group = Group::MandibleWorking;
        cells.push(scene.add(cell));
    }
    Ok(cells)
}

/// Duplicate the partition cells into the overscaled carve cells. The
/// last cell keeps unit Y scale so it never reaches past the open end of
/// the chain; the asymmetry is intentional.
fn build_carve_cells(scene: &mut Scene, cells: &[ObjectId]) -> RigResult<Vec<ObjectId>> {
    let mut carve = Vec::with_capacity(cells.len());
    let last = cells.len() - 1;
    for (i, &cell) in cells.iter().enumerate() {
        let dup = scene.duplicate(cell)?;
        let obj = scene.object_mut(dup)?;
        obj.name = format!("mandible_carve_cell.{i}");
        obj.transform.scale = if i == last {
            Vec3::new(CARVE_OVERSCALE, 1.0, CARVE_OVERSCALE)
        } else {
            Vec3::new(CARVE_OVERSCALE, CARVE_OVERSCALE, CARVE_OVERSCALE)
        };
        obj.hidden = true;
        carve.push(dup);
    }
    Ok(carve)
}

/// One vector empty per segment: sits on its start joint and keeps +Y
/// tracking the end joint, so segments hung off it can be translated
/// along the rig without picking up local orientation.
fn build_vectors(scene: &mut Scene, segment_count: usize) -> RigResult<Vec<ObjectId>> {
    let mut vectors = Vec::with_capacity(segment_count);
    for i in 0..segment_count {
        let mut vector = SceneObject::new(format!("vector.{i}"), Default::default());
        vector.constraints = vec![
            Constraint::ChildOf {
                target: ConstraintTarget::Joint(i),
            },
            Constraint::TrackTo {
                target: ConstraintTarget::Joint(i + 1),
            },
        ];
        vector.hidden = true;
        vector.group = Group::MandibleWorking;
        vectors.push(scene.add(vector));
    }
    Ok(vectors)
}

fn build_segments(
    scene: &mut Scene,
    fibula: ObjectId,
    vectors: &[ObjectId],
    cells: &[ObjectId],
    pitch: f64,
) -> RigResult<Vec<ObjectId>> {
    let mut segments = Vec::with_capacity(vectors.len());
    for i in 0..vectors.len() {
        let dup = scene.duplicate(fibula)?;
        let obj = scene.object_mut(dup)?;
        obj.name = format!("fibula_segment.{i}");
        obj.group = Group::MandibleWorking;
        obj.hidden = false;
        obj.color = Some(palette::segment_color(i));

        // Offset along the local Y axis so the segment lines back up
        // with the origin once its vector empty carries it to joint i.
        let offset = Vec3::new(0.0, -(i as f64) * pitch, 0.0);
        let scaled = offset.component_mul(&obj.transform.scale);
        let world_offset = obj.transform.rotation.transform_vector(&scaled);
        obj.transform.translation += world_offset;

        obj.constraints.push(Constraint::ChildOf {
            target: ConstraintTarget::Object(vectors[i]),
        });
        obj.modifiers.insert(
            0,
            Modifier::Boolean {
                op: BooleanOp::Intersect,
                operand: cells[i],
            },
        );
        segments.push(dup);
    }
    Ok(segments)
}
