/// Mesh and texture loading with observable failures
use std::path::Path;

use crate::error::LoadFailure;
use crate::geometry::Mesh;
use crate::scene::Texture;
use crate::stl;

/// Parse STL bytes fetched from `source_id`
pub fn load_mesh_bytes(source_id: &str, bytes: &[u8]) -> Result<Mesh, LoadFailure> {
    let mesh = stl::parse_stl(bytes).map_err(|source| LoadFailure::Mesh {
        source_id: source_id.to_string(),
        source,
    })?;

    if mesh.is_empty() {
        return Err(LoadFailure::EmptyMesh {
            source_id: source_id.to_string(),
        });
    }

    log::info!("loaded {} triangles from {source_id}", mesh.triangle_count());
    Ok(mesh)
}

pub fn load_mesh_file(path: impl AsRef<Path>) -> Result<Mesh, LoadFailure> {
    let path = path.as_ref();
    let bytes = read(path)?;
    load_mesh_bytes(&path.display().to_string(), &bytes)
}

/// Decode an image into a luminance matcap
pub fn decode_texture(source_id: &str, bytes: &[u8]) -> Result<Texture, LoadFailure> {
    let image = image::load_from_memory(bytes).map_err(|source| LoadFailure::Texture {
        source_id: source_id.to_string(),
        source,
    })?;

    let luma = image.to_luma32f();
    let (width, height) = luma.dimensions();
    Texture::new(width, height, luma.into_raw()).ok_or_else(|| LoadFailure::EmptyTexture {
        source_id: source_id.to_string(),
    })
}

pub fn load_texture_file(path: impl AsRef<Path>) -> Result<Texture, LoadFailure> {
    let path = path.as_ref();
    let bytes = read(path)?;
    decode_texture(&path.display().to_string(), &bytes)
}

fn read(path: &Path) -> Result<Vec<u8>, LoadFailure> {
    std::fs::read(path).map_err(|source| LoadFailure::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_triangle_mesh_is_a_failure() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let err = load_mesh_bytes("empty.stl", &data).unwrap_err();
        assert!(matches!(err, LoadFailure::EmptyMesh { .. }));
    }

    #[test]
    fn test_garbage_mesh_names_source() {
        let err = load_mesh_bytes("models/75.stl", b"nope").unwrap_err();
        assert!(err.to_string().contains("models/75.stl"));
    }

    #[test]
    fn test_garbage_texture_is_a_failure() {
        let err = decode_texture("matcap.jpg", b"not an image").unwrap_err();
        assert!(matches!(err, LoadFailure::Texture { .. }));
    }
}
