#![warn(missing_docs)]

//! Explicit scene-graph arena for the osteoplan pipeline.
//!
//! Replaces host-managed global scene state with an arena of objects
//! addressed by stable ids: every operation takes its inputs explicitly,
//! nothing depends on an ambient "active object" or selection. Objects
//! carry non-destructive modifier stacks and live constraints; evaluation
//! is always an explicit call.

mod armature;
mod error;
mod eval;
mod object;
mod ops;

pub use armature::{Armature, Joint};
pub use error::{SceneError, SceneResult};
pub use object::{
    Constraint, ConstraintTarget, Group, Modifier, ParentLink, SceneObject, VertexGroup,
};
pub use ops::BakeChannels;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to a scene object.
    pub struct ObjectId;
}

/// The object arena plus scene-level armature state.
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, SceneObject>,
    /// The rig, once built.
    pub armature: Option<Armature>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, uniquifying its name, and return its id.
    pub fn add(&mut self, mut object: SceneObject) -> ObjectId {
        object.name = self.unique_name(&object.name);
        self.objects.insert(object)
    }

    /// Borrow an object.
    pub fn object(&self, id: ObjectId) -> SceneResult<&SceneObject> {
        self.objects
            .get(id)
            .ok_or_else(|| SceneError::MissingObject(format!("{id:?}")))
    }

    /// Mutably borrow an object.
    pub fn object_mut(&mut self, id: ObjectId) -> SceneResult<&mut SceneObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| SceneError::MissingObject(format!("{id:?}")))
    }

    /// Whether `id` is still alive.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Remove an object from the arena.
    pub fn remove(&mut self, id: ObjectId) -> SceneResult<SceneObject> {
        self.objects
            .remove(id)
            .ok_or_else(|| SceneError::MissingObject(format!("{id:?}")))
    }

    /// Iterate over all objects.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Ids of all objects filed into `group`.
    pub fn ids_in_group(&self, group: Group) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.group == group)
            .map(|(id, _)| id)
            .collect()
    }

    /// Look an object up by display name.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the arena holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Borrow the armature or report it missing.
    pub fn armature(&self) -> SceneResult<&Armature> {
        self.armature.as_ref().ok_or(SceneError::MissingArmature)
    }

    /// Mutably borrow the armature or report it missing.
    pub fn armature_mut(&mut self) -> SceneResult<&mut Armature> {
        self.armature.as_mut().ok_or(SceneError::MissingArmature)
    }

    /// Produce a name not used by any live object, suffixing `.001`,
    /// `.002`, ... as needed.
    fn unique_name(&self, base: &str) -> String {
        if self.find_by_name(base).is_none() {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}.{n:03}");
            if self.find_by_name(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osteoplan_mesh::TriMesh;

    #[test]
    fn add_and_lookup_by_name() {
        let mut scene = Scene::new();
        let id = scene.add(SceneObject::new("fibula", TriMesh::new()));
        assert_eq!(scene.find_by_name("fibula"), Some(id));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let mut scene = Scene::new();
        scene.add(SceneObject::new("plane", TriMesh::new()));
        let b = scene.add(SceneObject::new("plane", TriMesh::new()));
        let c = scene.add(SceneObject::new("plane", TriMesh::new()));
        assert_eq!(scene.object(b).unwrap().name, "plane.001");
        assert_eq!(scene.object(c).unwrap().name, "plane.002");
    }

    #[test]
    fn removed_ids_are_dead() {
        let mut scene = Scene::new();
        let id = scene.add(SceneObject::new("tmp", TriMesh::new()));
        scene.remove(id).unwrap();
        assert!(!scene.contains(id));
        assert!(matches!(
            scene.object(id),
            Err(SceneError::MissingObject(_))
        ));
    }

    #[test]
    fn group_filter() {
        let mut scene = Scene::new();
        let mut a = SceneObject::new("a", TriMesh::new());
        a.group = Group::FibulaGuides;
        let a = scene.add(a);
        scene.add(SceneObject::new("b", TriMesh::new()));
        assert_eq!(scene.ids_in_group(Group::FibulaGuides), vec![a]);
    }
}
