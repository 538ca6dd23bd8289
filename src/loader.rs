//! Rebuilds an imported scene as a flat list of [`SceneNode`]s.

use std::sync::Arc;

use glam::Mat4;

use crate::{
    animation::AnimationClip,
    error::{ImportError, TextureError},
    external::{ExternalNode, ExternalScene, SceneImporter},
    flags::ImportFlags,
    gltf_import::GltfImporter,
    material::{read_materials, read_textures, Material, Texture},
    mesh::read_mesh,
    scene::{BoneNode, SceneNode},
    skeleton::Skeleton,
    vfs::{FileBridge, FileProvider},
};

/// Everything produced by one load.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    /// Every node below the root, parents before children.
    pub nodes: Vec<SceneNode>,
    pub materials: Arc<[Material]>,
    pub textures: Arc<[Result<Texture, TextureError>]>,
    pub animations: Vec<AnimationClip>,
}

/// Owns the imported scene and its file bridge for the duration of a load.
struct ImportScope<'p> {
    name: String,
    bridge: FileBridge<'p>,
    scene: ExternalScene,
}

impl Drop for ImportScope<'_> {
    fn drop(&mut self) {
        let open = self.bridge.open_files();
        if open > 0 {
            log::warn!("'{}' released with {} files still open", self.name, open);
        }
        log::debug!("released import of '{}'", self.name);
    }
}

struct Traversal<'s> {
    scene: &'s ExternalScene,
    hierarchy: Arc<BoneNode>,
    materials: Arc<[Material]>,
    textures: Arc<[Result<Texture, TextureError>]>,
}

impl Traversal<'_> {
    fn visit(
        &self,
        node: &ExternalNode,
        parent: Mat4,
        out: &mut Vec<SceneNode>,
    ) -> Result<(), ImportError> {
        let transform = node.transformation * parent;

        let mut skeleton = Skeleton::new(self.hierarchy.clone());
        let mut meshes = Vec::with_capacity(node.meshes.len());
        for &index in &node.meshes {
            let mesh = self
                .scene
                .meshes
                .get(index)
                .ok_or_else(|| ImportError::InvalidMeshIndex {
                    node: node.name.clone(),
                    index,
                    count: self.scene.meshes.len(),
                })?;
            meshes.push(read_mesh(mesh, &mut skeleton)?);
        }
        skeleton.calculate_bone_data();

        log::debug!(
            "node '{}': {} meshes, {} bones",
            node.name,
            meshes.len(),
            skeleton.len()
        );
        out.push(SceneNode {
            name: node.name.clone(),
            transform,
            materials: self.materials.clone(),
            textures: self.textures.clone(),
            meshes,
            skeleton,
        });

        for child in &node.children {
            self.visit(child, transform, out)?;
        }
        Ok(())
    }
}

pub struct SceneLoader<I> {
    importer: I,
}

impl Default for SceneLoader<GltfImporter> {
    fn default() -> Self {
        Self::new(GltfImporter::default())
    }
}

impl<I: SceneImporter> SceneLoader<I> {
    pub fn new(importer: I) -> Self {
        Self { importer }
    }

    pub fn load_scene(
        &self,
        name: &str,
        provider: &dyn FileProvider,
        extra_flags: ImportFlags,
    ) -> Result<LoadedScene, ImportError> {
        let flags = ImportFlags::BASELINE | extra_flags;
        let bridge = FileBridge::new(provider);
        let scene = self
            .importer
            .import(name, flags, &bridge)
            .map_err(|message| ImportError::Import {
                name: name.to_string(),
                message,
            })?;
        let scope = ImportScope {
            name: name.to_string(),
            bridge,
            scene,
        };

        let traversal = Traversal {
            scene: &scope.scene,
            hierarchy: Arc::new(BoneNode::from_external(&scope.scene.root)),
            materials: read_materials(&scope.scene.materials).into(),
            textures: read_textures(&scope.scene.textures).into(),
        };
        let root = &scope.scene.root;
        let mut nodes = vec![];
        for child in &root.children {
            traversal.visit(child, root.transformation, &mut nodes)?;
        }
        let animations: Vec<AnimationClip> = scope
            .scene
            .animations
            .iter()
            .map(AnimationClip::from_external)
            .collect();

        log::info!(
            "loaded '{}': {} nodes, {} meshes, {} materials, {} textures, {} animations",
            name,
            nodes.len(),
            scope.scene.meshes.len(),
            traversal.materials.len(),
            traversal.textures.len(),
            animations.len()
        );
        Ok(LoadedScene {
            nodes,
            materials: traversal.materials,
            textures: traversal.textures,
            animations,
        })
    }

    pub fn load(
        &self,
        name: &str,
        provider: &dyn FileProvider,
        extra_flags: ImportFlags,
    ) -> Result<Vec<SceneNode>, ImportError> {
        Ok(self.load_scene(name, provider, extra_flags)?.nodes)
    }
}

/// Loads `name` with the glTF importer.
pub fn load(
    name: &str,
    provider: &dyn FileProvider,
    extra_flags: ImportFlags,
) -> Result<Vec<SceneNode>, ImportError> {
    SceneLoader::<GltfImporter>::default().load(name, provider, extra_flags)
}

/// Like [`load`], also returning the shared materials, textures and animations.
pub fn load_scene(
    name: &str,
    provider: &dyn FileProvider,
    extra_flags: ImportFlags,
) -> Result<LoadedScene, ImportError> {
    SceneLoader::<GltfImporter>::default().load_scene(name, provider, extra_flags)
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::HashMap};

    use glam::{Vec2, Vec3};

    use super::*;
    use crate::external::{ExternalBone, ExternalMaterial, ExternalMesh};

    struct FakeImporter {
        scene: ExternalScene,
        flags: Cell<ImportFlags>,
    }

    impl FakeImporter {
        fn new(scene: ExternalScene) -> Self {
            Self {
                scene,
                flags: Cell::new(ImportFlags::empty()),
            }
        }
    }

    impl SceneImporter for FakeImporter {
        fn import(
            &self,
            name: &str,
            flags: ImportFlags,
            io: &FileBridge,
        ) -> Result<ExternalScene, String> {
            self.flags.set(flags);
            let file = io.open(name).map_err(|e| e.to_string())?;
            if file.size() == 0 {
                return Err("empty file".to_string());
            }
            Ok(self.scene.clone())
        }
    }

    fn provider() -> HashMap<String, Vec<u8>> {
        HashMap::from([
            ("scene.fake".to_string(), vec![1]),
            ("empty.fake".to_string(), vec![]),
        ])
    }

    fn triangle(name: &str) -> ExternalMesh {
        ExternalMesh {
            name: name.to_string(),
            faces: vec![vec![0, 1, 2]],
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            ..Default::default()
        }
    }

    fn bone(name: &str, weights: Vec<(u32, f32)>) -> ExternalBone {
        ExternalBone {
            name: name.to_string(),
            offset_matrix: Mat4::IDENTITY,
            weights,
        }
    }

    fn two_level_scene() -> ExternalScene {
        let mut b = ExternalNode::new("B", Mat4::from_rotation_z(0.5));
        b.meshes.push(1);
        let mut a = ExternalNode::new("A", Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        a.meshes.push(0);
        a.children.push(b);
        let mut root = ExternalNode::new("root", Mat4::IDENTITY);
        root.children.push(a);
        ExternalScene {
            root,
            meshes: vec![triangle("a"), triangle("b")],
            materials: vec![ExternalMaterial::default()],
            ..Default::default()
        }
    }

    #[test]
    fn test_two_level_hierarchy() {
        let loader = SceneLoader::new(FakeImporter::new(two_level_scene()));
        let nodes = loader
            .load("scene.fake", &provider(), ImportFlags::empty())
            .unwrap();

        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        let a_local = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let b_local = Mat4::from_rotation_z(0.5);
        assert_eq!(nodes[0].transform, a_local);
        assert!(nodes[1].transform.abs_diff_eq(b_local * a_local, 1e-6));
        assert_eq!(nodes[0].meshes[0].name, "a");
        assert_eq!(nodes[1].meshes[0].name, "b");
    }

    #[test]
    fn test_pre_order_and_root_seed() {
        // root -> (A -> A1), B
        let mut a = ExternalNode::new("A", Mat4::IDENTITY);
        a.children.push(ExternalNode::new("A1", Mat4::IDENTITY));
        let mut root = ExternalNode::new("root", Mat4::from_scale(Vec3::splat(2.0)));
        root.children.push(a);
        root.children.push(ExternalNode::new("B", Mat4::IDENTITY));
        let scene = ExternalScene {
            root,
            ..Default::default()
        };

        let loader = SceneLoader::new(FakeImporter::new(scene));
        let nodes = loader
            .load("scene.fake", &provider(), ImportFlags::empty())
            .unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A1", "B"]);
        assert_eq!(nodes[1].transform, Mat4::from_scale(Vec3::splat(2.0)));
    }

    #[test]
    fn test_baseline_flags_always_requested() {
        let importer = FakeImporter::new(two_level_scene());
        let loader = SceneLoader::new(importer);
        loader
            .load("scene.fake", &provider(), ImportFlags::FLIP_UVS)
            .unwrap();
        let flags = loader.importer.flags.get();
        assert!(flags.contains(ImportFlags::BASELINE | ImportFlags::FLIP_UVS));
    }

    #[test]
    fn test_shared_bone_last_write_wins() {
        let mut first = triangle("first");
        first.bones = vec![bone("spine", vec![(0, 1.0)]), bone("hips", vec![(1, 1.0)])];
        let mut second = triangle("second");
        second.bones = vec![bone("spine", vec![(2, 0.5)])];
        let mut node = ExternalNode::new("body", Mat4::IDENTITY);
        node.meshes = vec![0, 1];
        let mut root = ExternalNode::new("root", Mat4::IDENTITY);
        root.children.push(node);
        root.children.push(ExternalNode::new("spine", Mat4::IDENTITY));
        let scene = ExternalScene {
            root,
            meshes: vec![first, second],
            ..Default::default()
        };

        let loader = SceneLoader::new(FakeImporter::new(scene));
        let nodes = loader
            .load("scene.fake", &provider(), ImportFlags::empty())
            .unwrap();
        let body = &nodes[0];
        assert_eq!(body.skeleton.len(), 2);
        assert_eq!(body.meshes[0].bones[0], body.meshes[1].bones[0]);
        let spine = body.skeleton.bone_by_name("spine").unwrap();
        assert_eq!(spine.weights.len(), 1);
        assert_eq!(spine.weights[0].vertex_id, 2);
        assert!(body.has_bones());
        assert_eq!(body.skeleton.bone_data().unwrap().len(), 2);
        // the bone-free node keeps an empty skeleton
        assert!(!nodes[1].has_bones());
    }

    #[test]
    fn test_mesh_without_uvs_or_bones() {
        let mut node = ExternalNode::new("plain", Mat4::IDENTITY);
        node.meshes.push(0);
        let mut root = ExternalNode::new("root", Mat4::IDENTITY);
        root.children.push(node);
        let scene = ExternalScene {
            root,
            meshes: vec![triangle("plain")],
            ..Default::default()
        };

        let loader = SceneLoader::new(FakeImporter::new(scene));
        let nodes = loader
            .load("scene.fake", &provider(), ImportFlags::empty())
            .unwrap();
        let mesh = &nodes[0].meshes[0];
        assert!(mesh.uvs.is_empty());
        assert!(mesh.bones.is_empty());
        assert!(nodes[0].skeleton.is_empty());
    }

    #[test]
    fn test_materials_shared_across_nodes() {
        let mut scene = two_level_scene();
        scene.meshes[0].texture_coords = vec![vec![Vec2::ZERO; 3]];
        let loader = SceneLoader::new(FakeImporter::new(scene));
        let loaded = loader
            .load_scene("scene.fake", &provider(), ImportFlags::empty())
            .unwrap();

        assert_eq!(loaded.materials.len(), 1);
        assert!(Arc::ptr_eq(&loaded.nodes[0].materials, &loaded.nodes[1].materials));
        assert!(Arc::ptr_eq(&loaded.nodes[0].materials, &loaded.materials));
        assert_eq!(
            loaded.nodes[0].material(&loaded.nodes[0].meshes[0]).unwrap().name,
            "material0"
        );
    }

    #[test]
    fn test_import_failure_carries_message() {
        let loader = SceneLoader::new(FakeImporter::new(two_level_scene()));
        let err = loader
            .load("empty.fake", &provider(), ImportFlags::empty())
            .unwrap_err();
        match err {
            ImportError::Import { name, message } => {
                assert_eq!(name, "empty.fake");
                assert_eq!(message, "empty file");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = loader
            .load("missing.fake", &provider(), ImportFlags::empty())
            .unwrap_err();
        assert!(err.to_string().contains("missing.fake"));
    }

    #[test]
    fn test_invalid_mesh_index_fails_whole_load() {
        let mut scene = two_level_scene();
        scene.meshes.truncate(1);
        let loader = SceneLoader::new(FakeImporter::new(scene));
        let err = loader
            .load("scene.fake", &provider(), ImportFlags::empty())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidMeshIndex { index: 1, count: 1, .. }
        ));
    }
}
