use std::fmt;

use glam::Vec4;

use crate::{
    error::TextureError,
    external::{
        EmbeddedTexture, ExternalMaterial, PropertyValue, TextureType, EMBEDDED_TEXTURE_PREFIX,
        MATKEY_COLOR_DIFFUSE, MATKEY_METALLIC_FACTOR, MATKEY_NAME, MATKEY_ROUGHNESS_FACTOR,
        MATKEY_TWOSIDED,
    },
};

/// Where a material's texture comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureRef {
    /// Index into the scene's decoded textures.
    Embedded(usize),
    /// Path relative to the asset, resolved by the caller.
    External(String),
}

impl TextureRef {
    pub fn parse(reference: &str) -> Self {
        reference
            .strip_prefix(EMBEDDED_TEXTURE_PREFIX)
            .and_then(|index| index.parse().ok())
            .map(TextureRef::Embedded)
            .unwrap_or_else(|| TextureRef::External(reference.to_string()))
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureRef::Embedded(index) => write!(f, "{}{}", EMBEDDED_TEXTURE_PREFIX, index),
            TextureRef::External(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub two_sided: bool,
}

impl Material {
    pub fn from_external(index: usize, material: &ExternalMaterial) -> Self {
        let name = match material.property(MATKEY_NAME) {
            Some(PropertyValue::String(name)) => name.clone(),
            _ => format!("material{}", index),
        };
        let slot = |ty| material.texture(ty, 0).map(TextureRef::parse);
        Self {
            name,
            diffuse_texture: slot(TextureType::Diffuse),
            normal_texture: slot(TextureType::Normals),
            metallic_roughness_texture: slot(TextureType::MetallicRoughness),
            base_color: material.color(MATKEY_COLOR_DIFFUSE).unwrap_or(Vec4::ZERO),
            metallic: material.float(MATKEY_METALLIC_FACTOR).unwrap_or(0.0),
            roughness: material.float(MATKEY_ROUGHNESS_FACTOR).unwrap_or(0.0),
            two_sided: material.float(MATKEY_TWOSIDED).is_some_and(|v| v != 0.0),
        }
    }
}

/// Decoded RGBA8 image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn decode_texture(index: usize, texture: &EmbeddedTexture) -> Result<Texture, TextureError> {
    let hint = texture.format_hint.as_str();
    let decoded = match image::ImageFormat::from_extension(hint) {
        Some(format) => image::load_from_memory_with_format(&texture.data, format),
        None => image::load_from_memory(&texture.data),
    };
    let img = decoded.map_err(|e| match e {
        image::ImageError::Unsupported(_) => TextureError::Unsupported {
            index,
            hint: hint.to_string(),
        },
        e => TextureError::Decode {
            index,
            message: e.to_string(),
        },
    })?;
    let rgba = img.to_rgba8();
    Ok(Texture {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

pub fn read_materials(materials: &[ExternalMaterial]) -> Vec<Material> {
    materials
        .iter()
        .enumerate()
        .map(|(index, material)| Material::from_external(index, material))
        .collect()
}

/// Decodes every embedded texture. Failures stay at their index.
pub fn read_textures(textures: &[EmbeddedTexture]) -> Vec<Result<Texture, TextureError>> {
    textures
        .iter()
        .enumerate()
        .map(|(index, texture)| {
            let decoded = decode_texture(index, texture);
            if let Err(e) = &decoded {
                log::warn!("{}", e);
            }
            decoded
        })
        .collect()
}
