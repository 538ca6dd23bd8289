use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use generational_arena::Arena;
use glam::Mat4;

use crate::{
    bone::{Bone, BoneId},
    scene::BoneNode,
};

/// Bones of every mesh under one scene node, keyed by name.
///
/// A bone name maps to exactly one record. Storing a bone whose name is
/// already known overwrites that record in place, so every mesh holding its
/// [`BoneId`] sees the most recently stored data.
#[derive(Debug, Clone)]
pub struct Skeleton {
    root: Arc<BoneNode>,
    bones: Arena<Bone>,
    by_name: BTreeMap<String, BoneId>,
    bone_data: Option<BoneData>,
}

/// Derived per-joint data, joints ordered by bone name.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneData {
    pub joints: Vec<BoneId>,
    pub names: Vec<String>,
    /// Nearest ancestor in the hierarchy that is also a joint.
    pub parents: Vec<Option<usize>>,
    pub inverse_bind_matrices: Vec<Mat4>,
    /// Bone space to mesh space.
    pub bind_pose: Vec<Mat4>,
    /// Global transform of the joint's hierarchy node. Falls back to the
    /// bind pose for bones that have no node.
    pub rest_pose: Vec<Mat4>,
}

impl BoneData {
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint_index(&self, id: BoneId) -> Option<usize> {
        self.joints.iter().position(|&joint| joint == id)
    }

    /// Rest pose times inverse bind, per joint.
    pub fn skinning_matrices(&self) -> Vec<Mat4> {
        self.rest_pose
            .iter()
            .zip(&self.inverse_bind_matrices)
            .map(|(rest, inverse_bind)| *rest * *inverse_bind)
            .collect()
    }

    /// Rest pose relative to the parent joint.
    pub fn local_rest_pose(&self, joint: usize) -> Mat4 {
        match self.parents[joint] {
            Some(parent) => self.rest_pose[parent].inverse() * self.rest_pose[joint],
            None => self.rest_pose[joint],
        }
    }
}

impl Skeleton {
    pub fn new(root: Arc<BoneNode>) -> Self {
        Self {
            root,
            bones: Arena::new(),
            by_name: BTreeMap::new(),
            bone_data: None,
        }
    }

    pub fn root(&self) -> &BoneNode {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registers one mesh's bones and returns their ids in the same order.
    pub fn store(&mut self, bones: Vec<Bone>) -> Vec<BoneId> {
        if self.bone_data.take().is_some() {
            log::warn!("bones stored after bone data was calculated, bone data discarded");
        }
        bones
            .into_iter()
            .map(|bone| match self.by_name.get(&bone.name) {
                Some(&id) => {
                    if let Some(slot) = self.bones.get_mut(id.0) {
                        *slot = bone;
                    }
                    id
                }
                None => {
                    let name = bone.name.clone();
                    let id = BoneId(self.bones.insert(bone));
                    self.by_name.insert(name, id);
                    id
                }
            })
            .collect()
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.id_of(name).and_then(|id| self.bone(id))
    }

    /// Bones in name order.
    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> + '_ {
        self.by_name
            .values()
            .filter_map(move |&id| self.bone(id).map(|bone| (id, bone)))
    }

    /// Position of `id` in name order, which is also its joint index in
    /// [`BoneData`].
    pub fn joint_index(&self, id: BoneId) -> Option<usize> {
        self.by_name.values().position(|&joint| joint == id)
    }

    pub fn bone_data(&self) -> Option<&BoneData> {
        self.bone_data.as_ref()
    }

    /// Computes [`BoneData`] from everything stored so far. Run once, after
    /// the last `store`.
    pub fn calculate_bone_data(&mut self) -> &BoneData {
        let mut data = BoneData {
            joints: vec![],
            names: vec![],
            parents: vec![],
            inverse_bind_matrices: vec![],
            bind_pose: vec![],
            rest_pose: vec![],
        };
        for (id, bone) in self.bones() {
            data.joints.push(id);
            data.names.push(bone.name.clone());
            data.inverse_bind_matrices.push(bone.inverse_bind_matrix);
            data.bind_pose.push(bone.bind_matrix());
        }
        data.parents = vec![None; data.joints.len()];
        data.rest_pose = data.bind_pose.clone();

        let joint_by_name: HashMap<&str, usize> = data
            .names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let mut found = vec![false; data.joints.len()];

        let mut stack: Vec<(&BoneNode, Mat4, Option<usize>)> =
            vec![(&*self.root, Mat4::IDENTITY, None)];
        while let Some((node, parent_mat, parent_joint)) = stack.pop() {
            let global = parent_mat * node.transform;
            let mut nearest = parent_joint;
            if let Some(&joint) = joint_by_name.get(node.name.as_str()) {
                if !found[joint] {
                    found[joint] = true;
                    data.rest_pose[joint] = global;
                    data.parents[joint] = parent_joint;
                    nearest = Some(joint);
                }
            }
            for child in &node.children {
                stack.push((child, global, nearest));
            }
        }

        let missing = found.iter().filter(|f| !**f).count();
        if missing > 0 {
            log::debug!("{} bones have no hierarchy node, using bind pose", missing);
        }

        self.bone_data.insert(data)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::bone::VertexWeight;

    fn hierarchy() -> Arc<BoneNode> {
        // root -> hips -> spine, root -> mesh
        let spine = BoneNode::new("spine", Mat4::from_translation(Vec3::Y));
        let mut hips = BoneNode::new("hips", Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        hips.children.push(spine);
        let mut root = BoneNode::new("root", Mat4::from_scale(Vec3::splat(2.0)));
        root.children.push(hips);
        root.children.push(BoneNode::new("mesh", Mat4::IDENTITY));
        Arc::new(root)
    }

    fn bone(name: &str, vertex_id: u32) -> Bone {
        let mut bone = Bone::new(name, Mat4::IDENTITY);
        bone.weights.push(VertexWeight { vertex_id, weight: 1.0 });
        bone
    }

    #[test]
    fn test_store_overwrites_shared_name() {
        let mut skeleton = Skeleton::new(hierarchy());
        let first = skeleton.store(vec![bone("spine", 0), bone("hips", 1)]);
        let second = skeleton.store(vec![bone("spine", 7)]);

        assert_eq!(skeleton.len(), 2);
        assert_eq!(first[0], second[0]);
        let spine = skeleton.bone(first[0]).unwrap();
        assert_eq!(spine.weights, vec![VertexWeight { vertex_id: 7, weight: 1.0 }]);
        assert_eq!(skeleton.bone_by_name("hips").unwrap().weights[0].vertex_id, 1);
    }

    #[test]
    fn test_bones_iterate_in_name_order() {
        let mut skeleton = Skeleton::new(hierarchy());
        skeleton.store(vec![bone("spine", 0), bone("hips", 1), bone("arm", 2)]);
        let names: Vec<&str> = skeleton.bones().map(|(_, b)| b.name.as_str()).collect();
        assert_eq!(names, vec!["arm", "hips", "spine"]);
        let hips = skeleton.id_of("hips").unwrap();
        assert_eq!(skeleton.joint_index(hips), Some(1));
    }

    #[test]
    fn test_calculate_bone_data() {
        let mut skeleton = Skeleton::new(hierarchy());
        let ibm = Mat4::from_translation(Vec3::new(0.0, -6.0, 0.0));
        skeleton.store(vec![Bone::new("spine", ibm), Bone::new("hips", Mat4::IDENTITY)]);
        let data = skeleton.calculate_bone_data().clone();

        assert_eq!(data.names, vec!["hips".to_string(), "spine".to_string()]);
        assert_eq!(data.parents, vec![None, Some(0)]);
        // root scale 2 applies to both translations
        assert!(data.rest_pose[0].abs_diff_eq(
            Mat4::from_scale(Vec3::splat(2.0)) * Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            1e-6
        ));
        let spine_origin = data.rest_pose[1].transform_point3(Vec3::ZERO);
        assert!(spine_origin.abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), 1e-6));
        assert!(data.bind_pose[1].abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 6.0, 0.0)), 1e-6));

        let skinning = data.skinning_matrices();
        assert!(skinning[1]
            .transform_point3(Vec3::new(0.0, 6.0, 0.0))
            .abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), 1e-5));
        assert!(data
            .local_rest_pose(1)
            .abs_diff_eq(Mat4::from_translation(Vec3::Y), 1e-5));
    }

    #[test]
    fn test_bone_without_node_uses_bind_pose() {
        let mut skeleton = Skeleton::new(hierarchy());
        let ibm = Mat4::from_translation(Vec3::new(-3.0, 0.0, 0.0));
        skeleton.store(vec![Bone::new("tail", ibm)]);
        let data = skeleton.calculate_bone_data();
        assert_eq!(data.parents, vec![None]);
        assert!(data.rest_pose[0].abs_diff_eq(ibm.inverse(), 1e-6));
    }

    #[test]
    fn test_store_after_finalize_discards_bone_data() {
        let mut skeleton = Skeleton::new(hierarchy());
        skeleton.store(vec![bone("hips", 0)]);
        skeleton.calculate_bone_data();
        assert!(skeleton.bone_data().is_some());
        skeleton.store(vec![bone("spine", 1)]);
        assert!(skeleton.bone_data().is_none());
    }
}
