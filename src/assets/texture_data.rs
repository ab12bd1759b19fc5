//! CPU-side texture preparation
//!
//! Images are decoded, flipped so that texture coordinate `v = 0` addresses
//! the bottom row, and given a full mip chain when both sides are powers of
//! two. Everything here runs on loader threads.

use image::{imageops, RgbaImage};

use crate::error::AssetError;

/// How the GPU should sample an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSampling {
    /// Repeat wrapping with trilinear filtering over the mip chain.
    Mipmapped,
    /// Clamp-to-edge wrapping, linear filtering, no mips.
    ClampLinear,
}

/// RGBA8 pixels ready for upload, level 0 first.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub levels: Vec<Vec<u8>>,
    pub sampling: TextureSampling,
}

impl DecodedImage {
    /// A 1×1 texture of one colour.
    pub fn solid(pixel: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            levels: vec![pixel.to_vec()],
            sampling: TextureSampling::Mipmapped,
        }
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// True when both sides are at most `max` texels.
    pub fn fits_within(&self, max: u32) -> bool {
        self.width <= max && self.height <= max
    }

    /// Size of mip `level`, never smaller than one texel.
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }
}

/// Placeholder shown while a texture is still loading.
pub const LOADING_PIXEL: [u8; 4] = [128, 192, 255, 255];

/// Default diffuse and specular map.
pub const WHITE_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Largest side accepted for a texture or cube face.
pub const MAX_TEXTURE_DIMENSION: u32 = 4096;

pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

fn decode(bytes: &[u8], path: &str) -> Result<RgbaImage, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|source| AssetError::Image {
        path: path.to_string(),
        source,
    })?;

    let (width, height) = (image.width(), image.height());
    if width > MAX_TEXTURE_DIMENSION || height > MAX_TEXTURE_DIMENSION {
        return Err(AssetError::TooLarge {
            path: path.to_string(),
            width,
            height,
            max: MAX_TEXTURE_DIMENSION,
        });
    }
    Ok(image.to_rgba8())
}

/// Builds the mip chain (if allowed) for an already oriented image.
fn prepare(image: RgbaImage) -> DecodedImage {
    let (width, height) = image.dimensions();

    if !(is_power_of_two(width) && is_power_of_two(height)) {
        return DecodedImage {
            width,
            height,
            levels: vec![image.into_raw()],
            sampling: TextureSampling::ClampLinear,
        };
    }

    let mut levels = Vec::new();
    let mut level = image;
    loop {
        let (w, h) = level.dimensions();
        if w == 1 && h == 1 {
            levels.push(level.into_raw());
            break;
        }
        let next = imageops::resize(
            &level,
            (w / 2).max(1),
            (h / 2).max(1),
            imageops::FilterType::Triangle,
        );
        levels.push(level.into_raw());
        level = next;
    }

    DecodedImage {
        width,
        height,
        levels,
        sampling: TextureSampling::Mipmapped,
    }
}

/// Decodes a material texture. The image is flipped vertically.
pub fn decode_texture(bytes: &[u8], path: &str) -> Result<DecodedImage, AssetError> {
    let mut image = decode(bytes, path)?;
    imageops::flip_vertical_in_place(&mut image);
    Ok(prepare(image))
}

/// Decodes one skybox face. Cube faces keep their stored orientation.
pub fn decode_cube_face(bytes: &[u8], path: &str) -> Result<DecodedImage, AssetError> {
    Ok(prepare(decode(bytes, path)?))
}

/// Checks that all six faces agree in size before they are combined.
pub fn check_cube_faces(faces: &[DecodedImage]) -> Result<(), AssetError> {
    if faces.len() != 6 {
        return Err(AssetError::CubemapMismatch(format!(
            "expected 6 faces, got {}",
            faces.len()
        )));
    }
    let (width, height) = (faces[0].width, faces[0].height);
    if let Some(face) = faces.iter().find(|f| f.width != width || f.height != height) {
        return Err(AssetError::CubemapMismatch(format!(
            "{}x{} next to {}x{}",
            face.width, face.height, width, height
        )));
    }
    if width != height {
        return Err(AssetError::CubemapMismatch(format!(
            "faces are {}x{}, cube faces must be square",
            width, height
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    /// Encodes a PNG whose top row is red and the rest blue.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(256));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(300));
    }

    #[test]
    fn test_power_of_two_image_gets_full_mip_chain() {
        let decoded = decode_texture(&png_bytes(8, 4), "wall.png").unwrap();
        assert_eq!(decoded.sampling, TextureSampling::Mipmapped);
        assert_eq!(decoded.mip_level_count(), 4);
        for level in 0..decoded.mip_level_count() {
            let (w, h) = decoded.level_size(level);
            assert_eq!(decoded.levels[level as usize].len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn test_npot_image_is_clamped_without_mips() {
        let decoded = decode_texture(&png_bytes(6, 3), "poster.png").unwrap();
        assert_eq!(decoded.sampling, TextureSampling::ClampLinear);
        assert_eq!(decoded.mip_level_count(), 1);
    }

    #[test]
    fn test_texture_is_flipped_vertically() {
        let decoded = decode_texture(&png_bytes(2, 2), "flag.png").unwrap();
        let level0 = &decoded.levels[0];
        // First stored row is the image's bottom row (blue), last is red.
        assert_eq!(&level0[0..4], &[0, 0, 255, 255]);
        assert_eq!(&level0[8..12], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_cube_face_keeps_orientation() {
        let decoded = decode_cube_face(&png_bytes(2, 2), "top.png").unwrap();
        assert_eq!(&decoded.levels[0][0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = decode_texture(b"not an image", "broken.png").unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let wide = png_bytes(MAX_TEXTURE_DIMENSION + 1, 1);
        let err = decode_texture(&wide, "panorama.png").unwrap_err();
        assert!(matches!(
            err,
            AssetError::TooLarge { width: 4097, height: 1, max: 4096, .. }
        ));
        assert!(matches!(
            decode_cube_face(&wide, "sky.png"),
            Err(AssetError::TooLarge { .. })
        ));

        let edge = decode_texture(&png_bytes(MAX_TEXTURE_DIMENSION, 1), "strip.png").unwrap();
        assert!(edge.fits_within(MAX_TEXTURE_DIMENSION));
        assert!(!edge.fits_within(2048));
    }

    #[test]
    fn test_cube_faces_must_match() {
        let face = DecodedImage::solid([1, 2, 3, 4]);
        let mut faces = vec![face.clone(); 6];
        assert!(check_cube_faces(&faces).is_ok());
        faces[3] = decode_cube_face(&png_bytes(2, 2), "odd.png").unwrap();
        assert!(matches!(
            check_cube_faces(&faces),
            Err(AssetError::CubemapMismatch(_))
        ));
    }
}
