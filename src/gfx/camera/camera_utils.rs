use cgmath::{perspective, Deg, Matrix4};

/// Maps OpenGL clip space (z in -1..1) to wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const FIELD_OF_VIEW: Deg<f32> = Deg(60.0);
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 200.0;

/// The main view projection for a surface of the given aspect ratio.
pub fn projection(aspect: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * perspective(FIELD_OF_VIEW, aspect, Z_NEAR, Z_FAR)
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    #[test]
    fn test_projection_depth_range() {
        let proj = projection(1.5);
        let near = proj * Vector4::new(0.0, 0.0, -Z_NEAR, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, -Z_FAR, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_matrix_conversion_is_column_major() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let array = convert_matrix4_to_array(m);
        assert_eq!(array[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
