//! # Vertex Data Structures
//!
//! The interleaved vertex format shared by every mesh entity and pipeline.

/// A mesh vertex with position, normal, texture coordinate and colour.
///
/// # Memory Layout
///
/// `#[repr(C)]` keeps the field order, giving a 48 byte stride:
///
/// | location | field      | format    | offset |
/// |----------|------------|-----------|--------|
/// | 0        | `position` | Float32x3 | 0      |
/// | 1        | `normal`   | Float32x3 | 12     |
/// | 2        | `texcoord` | Float32x2 | 24     |
/// | 3        | `color`    | Float32x4 | 32     |
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub color: [f32; 4],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    /// Returns the vertex buffer layout for wgpu rendering.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleaves one geometry's flattened attribute arrays.
///
/// `color` is used only when it has exactly one RGB triple per position;
/// otherwise every vertex is opaque white. Missing or short normal and
/// texcoord arrays are zero-filled.
pub fn interleave(
    position: &[f32],
    normal: Option<&[f32]>,
    texcoord: Option<&[f32]>,
    color: Option<&[f32]>,
) -> Vec<MeshVertex> {
    let count = position.len() / 3;
    let color = color.filter(|c| c.len() == position.len());

    (0..count)
        .map(|i| {
            let p = &position[i * 3..i * 3 + 3];
            MeshVertex {
                position: [p[0], p[1], p[2]],
                normal: read::<3>(normal, i),
                texcoord: read::<2>(texcoord, i),
                color: match color {
                    Some(c) => [c[i * 3], c[i * 3 + 1], c[i * 3 + 2], 1.0],
                    None => [1.0; 4],
                },
            }
        })
        .collect()
}

fn read<const N: usize>(values: Option<&[f32]>, index: usize) -> [f32; N] {
    let mut out = [0.0; N];
    if let Some(chunk) = values.and_then(|v| v.get(index * N..index * N + N)) {
        out.copy_from_slice(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 48);
        assert_eq!(MeshVertex::desc().array_stride, 48);
    }

    #[test]
    fn test_interleave_with_all_attributes() {
        let vertices = interleave(
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            Some(&[0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            Some(&[0.5, 0.25, 1.0, 1.0]),
            Some(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
        );
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [3.0, 4.0, 5.0]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[0].texcoord, [0.5, 0.25]);
        assert_eq!(vertices[1].color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_interleave_defaults() {
        // Colour array does not match the positions, so it is ignored.
        let vertices = interleave(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0], None, Some(&[0.5, 0.5]), Some(&[0.2, 0.2, 0.2]));
        assert_eq!(vertices[0].normal, [0.0; 3]);
        assert_eq!(vertices[0].texcoord, [0.5, 0.5]);
        assert_eq!(vertices[1].texcoord, [0.0, 0.0]);
        assert!(vertices.iter().all(|v| v.color == [1.0; 4]));
    }
}
