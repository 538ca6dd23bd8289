use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The external importer could not produce a scene.
    #[error("could not import '{name}': {message}")]
    Import { name: String, message: String },
    #[error("node '{node}' references mesh {index}, but the scene has {count} meshes")]
    InvalidMeshIndex {
        node: String,
        index: usize,
        count: usize,
    },
    #[error("mesh '{mesh}' has a face with {count} indices, expected 3")]
    NonTriangularFace { mesh: String, count: usize },
    #[error("mesh '{mesh}' references vertex {index}, but only has {vertices} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertices: usize,
    },
    #[error("mesh '{mesh}' has {len} {channel} entries for {vertices} vertices")]
    ChannelLength {
        mesh: String,
        channel: &'static str,
        len: usize,
        vertices: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("texture {index} could not be decoded: {message}")]
    Decode { index: usize, message: String },
    #[error("texture {index} has an unsupported format hint '{hint}'")]
    Unsupported { index: usize, hint: String },
}
