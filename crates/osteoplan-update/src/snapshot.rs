//! Bit-exact pose snapshots.

use osteoplan_rig::RigSet;
use osteoplan_scene::{ObjectId, Scene, SceneResult};

/// World transforms of all vector empties and fibula segments, stored as
/// raw f64 bit patterns so comparison is exact: any change, however
/// small, counts as a pose change, and recomputing identical matrices
/// stays a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseSnapshot {
    entries: Vec<(ObjectId, [u64; 16])>,
}

impl PoseSnapshot {
    /// Capture the current pose-relevant world transforms, vectors
    /// first, then segments, both in rig order.
    pub fn capture(scene: &Scene, rig: &RigSet) -> SceneResult<Self> {
        let mut entries = Vec::with_capacity(rig.vectors.len() + rig.segments.len());
        for &id in rig.vectors.iter().chain(rig.segments.iter()) {
            let world = scene.world_matrix(id)?;
            let mut bits = [0u64; 16];
            for (slot, value) in bits.iter_mut().zip(world.iter()) {
                *slot = value.to_bits();
            }
            entries.push((id, bits));
        }
        Ok(Self { entries })
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
