use std::path::Path;

use base64::Engine;

use crate::vfs::FileBridge;

/// Resolves `uri` against the directory of the asset named `base`.
pub fn resolve_uri(base: &str, uri: &str) -> String {
    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(uri).to_string_lossy().into_owned(),
        _ => uri.to_string(),
    }
}

/// Decodes a base64 `data:` URI. Returns `None` for any other URI.
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err("data URI without payload".to_string()));
    };
    if !header.ends_with(";base64") {
        return Some(Err(format!("unsupported data URI encoding '{}'", header)));
    }
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| e.to_string()),
    )
}

fn read_uri(base: &str, uri: &str, io: &FileBridge) -> Result<Vec<u8>, String> {
    if let Some(decoded) = decode_data_uri(uri) {
        return decoded;
    }
    let path = resolve_uri(base, uri);
    let mut file = io
        .open(&path)
        .map_err(|e| format!("could not open '{}': {}", path, e))?;
    Ok(file.read_remaining())
}

/// Loads every buffer of the document from the GLB blob, data URIs or files.
pub fn load_buffers(
    document: &gltf::Document,
    mut blob: Option<Vec<u8>>,
    base: &str,
    io: &FileBridge,
) -> Result<Vec<Vec<u8>>, String> {
    let mut buffers = vec![];
    for buffer in document.buffers() {
        let mut data = match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .take()
                .ok_or_else(|| format!("buffer {} refers to a missing GLB blob", buffer.index()))?,
            gltf::buffer::Source::Uri(uri) => read_uri(base, uri, io)?,
        };
        if data.len() < buffer.length() {
            return Err(format!(
                "buffer {} has {} bytes, expected {}",
                buffer.index(),
                data.len(),
                buffer.length()
            ));
        }
        // GLB chunks are padded to four bytes
        data.truncate(buffer.length());
        buffers.push(data);
    }
    Ok(buffers)
}

/// Raw bytes of an image, plus its format hint.
pub fn read_image(
    image: &gltf::Image,
    buffers: &[Vec<u8>],
    base: &str,
    io: &FileBridge,
) -> Result<(Vec<u8>, String), String> {
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers
                .get(view.buffer().index())
                .ok_or_else(|| format!("image {} refers to a missing buffer", image.index()))?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .ok_or_else(|| format!("image {} view is out of bounds", image.index()))?;
            Ok((bytes.to_vec(), format_hint(Some(mime_type), None)))
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            Ok((read_uri(base, uri, io)?, format_hint(mime_type, Some(uri))))
        }
    }
}

fn format_hint(mime_type: Option<&str>, uri: Option<&str>) -> String {
    match mime_type {
        Some("image/png") => "png".to_string(),
        Some("image/jpeg") => "jpg".to_string(),
        _ => uri
            .filter(|uri| !uri.starts_with("data:"))
            .and_then(|uri| Path::new(uri).extension())
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_asset() {
        assert_eq!(resolve_uri("model.gltf", "model.bin"), "model.bin");
        assert_eq!(
            resolve_uri("props/lamp.gltf", "lamp.bin"),
            Path::new("props").join("lamp.bin").to_string_lossy()
        );
    }

    #[test]
    fn test_decode_data_uri() {
        let decoded = decode_data_uri("data:application/octet-stream;base64,AQID").unwrap();
        assert_eq!(decoded, Ok(vec![1, 2, 3]));
        assert!(decode_data_uri("model.bin").is_none());
        assert!(decode_data_uri("data:text/plain,hello").unwrap().is_err());
    }

    #[test]
    fn test_format_hint() {
        assert_eq!(format_hint(Some("image/png"), None), "png");
        assert_eq!(format_hint(None, Some("tex/Albedo.JPG")), "jpg");
        assert_eq!(format_hint(None, Some("data:image/png;base64,AAAA")), "");
    }
}
