//! Wavefront MTL material library parser
//!
//! Every field is optional so a parsed material can be laid over the default
//! material field by field. Texture maps keep the raw filename; they are
//! resolved against the mesh directory when textures are loaded.

use std::collections::BTreeMap;

use crate::error::AssetError;

use super::directives::{directives, Directive};

const FORMAT: &str = "mtl";

/// Shading parameters of one `newmtl` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialDesc {
    /// `Ns`
    pub shininess: Option<f32>,
    /// `Ka`
    pub ambient: Option<[f32; 3]>,
    /// `Kd`
    pub diffuse: Option<[f32; 3]>,
    /// `Ks`
    pub specular: Option<[f32; 3]>,
    /// `Ke`
    pub emissive: Option<[f32; 3]>,
    /// `map_Kd`
    pub diffuse_map: Option<String>,
    /// `map_Ns`
    pub specular_map: Option<String>,
    /// `map_Bump`
    pub normal_map: Option<String>,
    /// `Ni`
    pub optical_density: Option<f32>,
    /// `d`
    pub opacity: Option<f32>,
    pub illum: Option<i32>,
}

impl MaterialDesc {
    /// Filenames of every texture map this material references.
    pub fn texture_refs(&self) -> impl Iterator<Item = &str> {
        [&self.diffuse_map, &self.specular_map, &self.normal_map]
            .into_iter()
            .filter_map(|map| map.as_deref())
    }
}

/// Material name to parameters. Ordered so loading is deterministic.
pub type Materials = BTreeMap<String, MaterialDesc>;

/// Parses MTL text into a name-keyed material map.
///
/// Directives that appear before any `newmtl` are ignored with a warning and
/// unknown keywords are logged at debug level.
pub fn parse_mtl(text: &str) -> Result<Materials, AssetError> {
    let mut materials = Materials::new();
    let mut current: Option<String> = None;

    for directive in directives(text) {
        if directive.keyword == "newmtl" {
            let name = directive.rest.to_string();
            materials.insert(name.clone(), MaterialDesc::default());
            current = Some(name);
            continue;
        }

        let Some(material) = current.as_ref().and_then(|name| materials.get_mut(name)) else {
            log::warn!(
                "Ignoring '{}' on line {}: no newmtl opened yet",
                directive.keyword,
                directive.line
            );
            continue;
        };

        apply(material, &directive)?;
    }

    Ok(materials)
}

fn apply(material: &mut MaterialDesc, directive: &Directive) -> Result<(), AssetError> {
    match directive.keyword {
        "Ns" => material.shininess = Some(scalar(directive)?),
        "Ka" => material.ambient = Some(color(directive)?),
        "Kd" => material.diffuse = Some(color(directive)?),
        "Ks" => material.specular = Some(color(directive)?),
        "Ke" => material.emissive = Some(color(directive)?),
        "map_Kd" => material.diffuse_map = Some(directive.rest.to_string()),
        "map_Ns" => material.specular_map = Some(directive.rest.to_string()),
        "map_Bump" => material.normal_map = Some(directive.rest.to_string()),
        "Ni" => material.optical_density = Some(scalar(directive)?),
        "d" => material.opacity = Some(scalar(directive)?),
        "illum" => {
            let raw = first_arg(directive)?;
            let model = raw.parse::<i32>().map_err(|_| {
                AssetError::parse(FORMAT, directive.line, format!("'{}' is not an integer", raw))
            })?;
            material.illum = Some(model);
        }
        other => log::debug!(
            "Ignoring unhandled MTL keyword '{}' on line {}",
            other,
            directive.line
        ),
    }
    Ok(())
}

fn first_arg<'a>(directive: &Directive<'a>) -> Result<&'a str, AssetError> {
    directive.args.first().copied().ok_or_else(|| {
        AssetError::parse(
            FORMAT,
            directive.line,
            format!("'{}' needs a value", directive.keyword),
        )
    })
}

fn parse_float(directive: &Directive, raw: &str) -> Result<f32, AssetError> {
    raw.parse::<f32>().map_err(|_| {
        AssetError::parse(
            FORMAT,
            directive.line,
            format!("'{}' is not a number in '{}'", raw, directive.keyword),
        )
    })
}

fn scalar(directive: &Directive) -> Result<f32, AssetError> {
    let raw = first_arg(directive)?;
    parse_float(directive, raw)
}

fn color(directive: &Directive) -> Result<[f32; 3], AssetError> {
    if directive.args.len() < 3 {
        return Err(AssetError::parse(
            FORMAT,
            directive.line,
            format!("'{}' needs three values", directive.keyword),
        ));
    }
    Ok([
        parse_float(directive, directive.args[0])?,
        parse_float(directive, directive.args[1])?,
        parse_float(directive, directive.args[2])?,
    ])
}
