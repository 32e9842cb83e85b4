use std::path::Path;

use crate::{AssetError, read_file};

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// 1×1 texture of a single color, used as the fallback binding.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

/// Six square faces of equal size in +X, −X, +Y, −Y, +Z, −Z order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubemapData {
    pub size: u32,
    pub faces: Vec<TextureData>,
}

impl CubemapData {
    pub fn from_faces(faces: Vec<TextureData>) -> Result<Self, AssetError> {
        if faces.len() != 6 {
            return Err(AssetError::InvalidCubemap(format!(
                "expected 6 faces, got {}",
                faces.len()
            )));
        }
        let size = faces[0].width;
        for (i, face) in faces.iter().enumerate() {
            if !face.is_square() || face.width != size {
                return Err(AssetError::InvalidCubemap(format!(
                    "face {i} is {}x{}, expected {size}x{size}",
                    face.width, face.height
                )));
            }
        }
        Ok(Self { size, faces })
    }
}

/// Decode an in-memory PNG/JPEG into RGBA8.
pub fn decode_texture(bytes: &[u8]) -> Result<TextureData, AssetError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(TextureData {
        width,
        height,
        rgba: image.into_raw(),
    })
}

pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData, AssetError> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let texture = decode_texture(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        width = texture.width,
        height = texture.height,
        "texture decoded"
    );
    Ok(texture)
}

pub fn load_cubemap<P: AsRef<Path>>(faces: &[P]) -> Result<CubemapData, AssetError> {
    let decoded = faces
        .iter()
        .map(|face| load_texture(face))
        .collect::<Result<Vec<_>, _>>()?;
    CubemapData::from_faces(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn load_png_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "crate.png", 4, 2);
        let tex = load_texture(&path).unwrap();
        assert_eq!((tex.width, tex.height), (4, 2));
        assert_eq!(tex.rgba.len(), 4 * 2 * 4);
        assert_eq!(&tex.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_texture_reports_path() {
        let err = load_texture("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, AssetError::Read { .. }));
        assert!(err.to_string().contains("here.png"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode_texture(b"not an image"),
            Err(AssetError::Image(_))
        ));
    }

    #[test]
    fn cubemap_requires_six_equal_square_faces() {
        let dir = tempfile::tempdir().unwrap();
        let square: Vec<_> = (0..6)
            .map(|i| write_png(dir.path(), &format!("f{i}.png"), 2, 2))
            .collect();
        let cube = load_cubemap(&square[..]).unwrap();
        assert_eq!(cube.size, 2);
        assert_eq!(cube.faces.len(), 6);

        let too_few = &square[..5];
        assert!(matches!(
            load_cubemap(too_few),
            Err(AssetError::InvalidCubemap(_))
        ));

        let mut mixed = square.clone();
        mixed[3] = write_png(dir.path(), "wide.png", 4, 2);
        assert!(matches!(
            load_cubemap(&mixed[..]),
            Err(AssetError::InvalidCubemap(_))
        ));
    }

    #[test]
    fn solid_texture_is_one_pixel() {
        let t = TextureData::solid([255, 255, 255, 255]);
        assert_eq!(t.rgba.len(), 4);
        assert!(t.is_square());
    }
}
