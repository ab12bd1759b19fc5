//! Wavefront OBJ geometry parser
//!
//! Produces per-material [`Geometry`] groups with flattened, per-vertex
//! attribute arrays that can be interleaved straight into a vertex buffer.
//! Faces are triangulated as fans, which is only correct for convex planar
//! polygons.

use crate::error::AssetError;

use super::directives::{directives, Directive};

const FORMAT: &str = "obj";

/// Flattened attributes of one geometry, three floats per position.
///
/// An attribute that never received data is `None`, never an empty vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub position: Vec<f32>,
    pub texcoord: Option<Vec<f32>>,
    pub normal: Option<Vec<f32>>,
    pub color: Option<Vec<f32>>,
}

/// A run of faces sharing one material.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub data: GeometryData,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.data.position.len() / 3
    }
}

/// Parse result: geometries in file order plus `mtllib` references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    pub geometries: Vec<Geometry>,
    pub material_libs: Vec<String>,
}

#[derive(Default)]
struct Attributes {
    position: Vec<f32>,
    texcoord: Vec<f32>,
    normal: Vec<f32>,
    color: Vec<f32>,
}

struct OpenGeometry {
    object: String,
    groups: Vec<String>,
    material: String,
    attributes: Attributes,
}

/// Parser state. Every pool starts with a zero entry so that OBJ's 1-based
/// indices can be used directly and index 0 resolves to zeros.
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    has_colors: bool,

    object: String,
    groups: Vec<String>,
    material: String,

    current: Option<OpenGeometry>,
    finished: Vec<OpenGeometry>,
    material_libs: Vec<String>,
}

impl ObjBuilder {
    fn new() -> Self {
        Self {
            positions: vec![[0.0; 3]],
            texcoords: vec![[0.0; 2]],
            normals: vec![[0.0; 3]],
            colors: vec![[0.0; 3]],
            has_colors: false,
            object: "default".to_string(),
            groups: vec!["default".to_string()],
            material: "default".to_string(),
            current: None,
            finished: Vec::new(),
            material_libs: Vec::new(),
        }
    }

    fn handle(&mut self, directive: &Directive) -> Result<(), AssetError> {
        match directive.keyword {
            "v" => self.vertex(directive),
            "vn" => {
                let normal = numbers::<3>(directive, 3)?;
                self.normals.push(normal);
                Ok(())
            }
            "vt" => {
                let uv = numbers::<2>(directive, 1)?;
                self.texcoords.push(uv);
                Ok(())
            }
            "f" => self.face(directive),
            "s" => Ok(()),
            "mtllib" => {
                self.material_libs.push(directive.rest.to_string());
                Ok(())
            }
            "usemtl" => {
                self.material = directive.rest.to_string();
                self.close_geometry();
                Ok(())
            }
            "g" => {
                self.groups = directive.args.iter().map(|g| g.to_string()).collect();
                self.close_geometry();
                Ok(())
            }
            "o" => {
                self.object = directive.rest.to_string();
                self.close_geometry();
                Ok(())
            }
            other => {
                log::debug!("Ignoring unhandled OBJ keyword '{}' on line {}", other, directive.line);
                Ok(())
            }
        }
    }

    fn vertex(&mut self, directive: &Directive) -> Result<(), AssetError> {
        let position = numbers::<3>(directive, 3)?;
        self.positions.push(position);

        if directive.args.len() > 3 {
            let mut color = [1.0; 3];
            for (slot, arg) in color.iter_mut().zip(&directive.args[3..]) {
                *slot = number(directive, arg)?;
            }
            self.colors.push(color);
            self.has_colors = true;
        } else {
            self.colors.push([1.0; 3]);
        }
        Ok(())
    }

    fn face(&mut self, directive: &Directive) -> Result<(), AssetError> {
        if directive.args.len() < 3 {
            log::warn!(
                "Skipping face with {} vertices on line {}",
                directive.args.len(),
                directive.line
            );
            return Ok(());
        }

        let corners = directive
            .args
            .iter()
            .map(|reference| self.resolve(directive, reference))
            .collect::<Result<Vec<_>, _>>()?;

        for triangle in 0..corners.len() - 2 {
            self.emit(&corners[0]);
            self.emit(&corners[triangle + 1]);
            self.emit(&corners[triangle + 2]);
        }
        Ok(())
    }

    /// Resolves `pos[/tex][/norm]` into pool indices.
    fn resolve(&self, directive: &Directive, reference: &str) -> Result<Corner, AssetError> {
        let mut parts = reference.split('/');
        let position = match parts.next().filter(|p| !p.is_empty()) {
            Some(raw) => Some(pool_index(directive, raw, self.positions.len())?),
            None => None,
        };
        let texcoord = match parts.next().filter(|p| !p.is_empty()) {
            Some(raw) => Some(pool_index(directive, raw, self.texcoords.len())?),
            None => None,
        };
        let normal = match parts.next().filter(|p| !p.is_empty()) {
            Some(raw) => Some(pool_index(directive, raw, self.normals.len())?),
            None => None,
        };
        Ok(Corner {
            position,
            texcoord,
            normal,
        })
    }

    fn emit(&mut self, corner: &Corner) {
        let geometry = self.current.get_or_insert_with(|| OpenGeometry {
            object: self.object.clone(),
            groups: self.groups.clone(),
            material: self.material.clone(),
            attributes: Attributes::default(),
        });
        let attributes = &mut geometry.attributes;

        if let Some(index) = corner.position {
            attributes.position.extend_from_slice(&self.positions[index]);
            if self.has_colors {
                attributes.color.extend_from_slice(&self.colors[index]);
            }
        }
        if let Some(index) = corner.texcoord {
            attributes.texcoord.extend_from_slice(&self.texcoords[index]);
        }
        if let Some(index) = corner.normal {
            attributes.normal.extend_from_slice(&self.normals[index]);
        }
    }

    /// Geometries are created lazily on the first emitted vertex, so an open
    /// geometry always holds data and can simply be finished.
    fn close_geometry(&mut self) {
        if let Some(geometry) = self.current.take() {
            self.finished.push(geometry);
        }
    }

    fn finish(mut self) -> ObjData {
        self.close_geometry();
        let geometries = self
            .finished
            .into_iter()
            .map(|open| Geometry {
                object: open.object,
                groups: open.groups,
                material: open.material,
                data: GeometryData {
                    position: open.attributes.position,
                    texcoord: non_empty(open.attributes.texcoord),
                    normal: non_empty(open.attributes.normal),
                    color: non_empty(open.attributes.color),
                },
            })
            .collect();

        ObjData {
            geometries,
            material_libs: self.material_libs,
        }
    }
}

struct Corner {
    position: Option<usize>,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

fn non_empty(values: Vec<f32>) -> Option<Vec<f32>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn number(directive: &Directive, raw: &str) -> Result<f32, AssetError> {
    raw.parse::<f32>().map_err(|_| {
        AssetError::parse(
            FORMAT,
            directive.line,
            format!("'{}' is not a number in '{}'", raw, directive.keyword),
        )
    })
}

/// Reads up to `N` numbers, requiring at least `required`. Missing trailing
/// components are zero.
fn numbers<const N: usize>(directive: &Directive, required: usize) -> Result<[f32; N], AssetError> {
    if directive.args.len() < required {
        return Err(AssetError::parse(
            FORMAT,
            directive.line,
            format!(
                "'{}' needs {} values, found {}",
                directive.keyword,
                required,
                directive.args.len()
            ),
        ));
    }

    let mut values = [0.0; N];
    for (slot, raw) in values.iter_mut().zip(&directive.args) {
        *slot = number(directive, raw)?;
    }
    Ok(values)
}

/// Turns a 1-based (or negative, relative) OBJ index into a pool index.
fn pool_index(directive: &Directive, raw: &str, pool_len: usize) -> Result<usize, AssetError> {
    let index: i64 = raw.parse().map_err(|_| {
        AssetError::parse(
            FORMAT,
            directive.line,
            format!("'{}' is not a vertex index", raw),
        )
    })?;

    let resolved = if index < 0 {
        pool_len as i64 + index
    } else {
        index
    };

    if resolved < 0 || resolved >= pool_len as i64 {
        return Err(AssetError::parse(
            FORMAT,
            directive.line,
            format!("index {} is out of range ({} entries)", index, pool_len - 1),
        ));
    }
    Ok(resolved as usize)
}

/// Parses OBJ text into material-grouped geometries.
///
/// # Arguments
/// * `text` - Full contents of the `.obj` file
///
/// # Returns
/// Geometries in file order and the `mtllib` filenames they reference
pub fn parse_obj(text: &str) -> Result<ObjData, AssetError> {
    let mut builder = ObjBuilder::new();
    for directive in directives(text) {
        builder.handle(&directive)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    fn triangle_corners(geometry: &Geometry) -> Vec<[f32; 3]> {
        geometry
            .data
            .position
            .chunks(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    }

    #[test]
    fn test_quad_becomes_fan_of_two_triangles() {
        let obj = parse_obj(QUAD).unwrap();
        assert_eq!(obj.geometries.len(), 1);
        let corners = triangle_corners(&obj.geometries[0]);
        assert_eq!(
            corners,
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_ngon_yields_n_minus_two_triangles() {
        for n in 3..9usize {
            let mut text = String::new();
            for i in 0..n {
                let angle = i as f32 / n as f32 * std::f32::consts::TAU;
                text.push_str(&format!("v {} {} 0\n", angle.cos(), angle.sin()));
            }
            let indices: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
            text.push_str(&format!("f {}\n", indices.join(" ")));

            let obj = parse_obj(&text).unwrap();
            assert_eq!(obj.geometries[0].vertex_count(), (n - 2) * 3);
        }
    }

    #[test]
    fn test_unused_attributes_are_dropped() {
        let obj = parse_obj(QUAD).unwrap();
        let data = &obj.geometries[0].data;
        assert!(data.texcoord.is_none());
        assert!(data.normal.is_none());
        assert!(data.color.is_none());
    }

    #[test]
    fn test_no_geometry_carries_an_empty_array() {
        let text = "\
mtllib room.mtl
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
usemtl A
f 1/1 2/2 3/3
usemtl B
usemtl C
f 1//1 2//1 3//1
g walls
f 1 2 3
";
        let obj = parse_obj(text).unwrap();
        assert_eq!(obj.geometries.len(), 3);
        for geometry in &obj.geometries {
            assert!(!geometry.data.position.is_empty());
            for array in [&geometry.data.texcoord, &geometry.data.normal, &geometry.data.color] {
                if let Some(values) = array {
                    assert!(!values.is_empty());
                }
            }
        }
        assert_eq!(obj.geometries[0].data.texcoord.as_ref().map(Vec::len), Some(6));
        assert!(obj.geometries[0].data.normal.is_none());
        assert!(obj.geometries[1].data.texcoord.is_none());
        assert_eq!(obj.geometries[1].data.normal.as_ref().map(Vec::len), Some(9));
        assert_eq!(obj.material_libs, vec!["room.mtl".to_string()]);
    }

    #[test]
    fn test_material_switch_without_faces_creates_no_geometry() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
usemtl Unused
usemtl Wood
f 1 2 3
";
        let obj = parse_obj(text).unwrap();
        assert_eq!(obj.geometries.len(), 1);
        assert_eq!(obj.geometries[0].material, "Wood");
    }

    #[test]
    fn test_group_and_object_names_are_recorded() {
        let text = "\
o Lamp
g shade cloth
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
        let obj = parse_obj(text).unwrap();
        let geometry = &obj.geometries[0];
        assert_eq!(geometry.object, "Lamp");
        assert_eq!(geometry.groups, vec!["shade".to_string(), "cloth".to_string()]);
        assert_eq!(geometry.material, "default");
    }

    #[test]
    fn test_inline_vertex_colors() {
        let text = "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 1 2 3
";
        let obj = parse_obj(text).unwrap();
        let data = &obj.geometries[0].data;
        assert_eq!(
            data.color.as_deref(),
            Some(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0][..])
        );
        assert_eq!(data.position.len(), 9);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let obj = parse_obj(text).unwrap();
        assert_eq!(
            obj.geometries[0].data.position,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_degenerate_face_is_skipped() {
        let text = "\
v 0 0 0
v 1 0 0
f 1 2
";
        let obj = parse_obj(text).unwrap();
        assert!(obj.geometries.is_empty());
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let text = "v 0 0 0\nf 1 2 3\n";
        match parse_obj(text) {
            Err(AssetError::Parse { format, line, .. }) => {
                assert_eq!(format, "obj");
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keywords_are_ignored() {
        let text = format!("curv 0 1 2\nvp 0.5\n{}", QUAD);
        let obj = parse_obj(&text).unwrap();
        assert_eq!(obj.geometries.len(), 1);
    }
}
