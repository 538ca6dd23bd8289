//! Converts scenes produced by an external asset importer into render-ready
//! [`SceneNode`]s: accumulated node transforms, mesh channels, materials,
//! decoded textures, per-node skeletons and keyframe tracks.
//!
//! ```no_run
//! use scene_import::{load, DirectoryProvider, ImportFlags};
//!
//! let provider = DirectoryProvider::new("assets");
//! let nodes = load("lantern.glb", &provider, ImportFlags::GEN_NORMALS)?;
//! for node in &nodes {
//!     println!("{}: {} meshes", node.name, node.meshes.len());
//! }
//! # Ok::<(), scene_import::ImportError>(())
//! ```

pub mod animation;
pub mod bone;
pub mod error;
pub mod external;
pub mod file_formats;
pub mod flags;
pub mod gltf_import;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;
pub mod track;
pub mod vfs;

pub use animation::{AnimationClip, NodeTracks, Trs};
pub use bone::{Bone, BoneId, VertexWeight};
pub use error::{ImportError, TextureError};
pub use external::SceneImporter;
pub use flags::ImportFlags;
pub use gltf_import::GltfImporter;
pub use loader::{load, load_scene, LoadedScene, SceneLoader};
pub use material::{Material, Texture, TextureRef};
pub use mesh::{Aabb, Mesh, SkinBuffers};
pub use scene::{BoneNode, SceneNode};
pub use skeleton::{BoneData, Skeleton};
pub use track::{Interpolate, TimeKey, TrackStore};
pub use vfs::{DirectoryProvider, FileBridge, FileProvider, MemoryFile};
