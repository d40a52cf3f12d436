//! OBJ file loader for 3D models
//!
//! Produces de-indexed vertex streams (position, texture coordinate, normal)
//! plus a `u32` index list. Vertices sharing the same `v/vt/vn` triple are
//! emitted once. Polygons are fan-triangulated.

use std::collections::HashMap;

use super::{AssetError, AssetSource};

/// Vertex streams of a loaded model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates (zero when the file has none)
    pub tex_coords: Vec<[f32; 2]>,
    /// Vertex normals (+Y when the file has none)
    pub normals: Vec<[f32; 3]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl ObjData {
    /// Number of unique vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Wavefront OBJ loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load a named OBJ asset
    pub fn load(assets: &dyn AssetSource, name: &str) -> Result<ObjData, AssetError> {
        let text = assets.read_to_string(name)?;
        Self::parse(&text).map_err(|reason| AssetError::InvalidData {
            name: name.to_string(),
            reason,
        })
    }

    /// Parse OBJ text
    pub fn parse(text: &str) -> Result<ObjData, String> {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();

        let mut data = ObjData::default();
        let mut unique: HashMap<(usize, Option<usize>, Option<usize>), u32> = HashMap::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else { continue };
            let args: Vec<&str> = parts.collect();

            match keyword {
                "v" => positions.push(parse_floats::<3>(&args, line_no)?),
                "vn" => normals.push(parse_floats::<3>(&args, line_no)?),
                "vt" => tex_coords.push(parse_floats::<2>(&args, line_no)?),
                "f" => {
                    if args.len() < 3 {
                        return Err(format!("line {}: face needs at least 3 vertices", line_no + 1));
                    }

                    let mut face = Vec::with_capacity(args.len());
                    for corner in &args {
                        let key = parse_corner(corner, positions.len(), tex_coords.len(), normals.len())
                            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;

                        let index = match unique.get(&key) {
                            Some(&index) => index,
                            None => {
                                let (p, t, n) = key;
                                data.positions.push(positions[p]);
                                data.tex_coords.push(t.map_or([0.0, 0.0], |t| tex_coords[t]));
                                data.normals.push(n.map_or([0.0, 1.0, 0.0], |n| normals[n]));
                                let index = (data.positions.len() - 1) as u32;
                                unique.insert(key, index);
                                index
                            }
                        };
                        face.push(index);
                    }

                    for i in 1..face.len() - 1 {
                        data.indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                    }
                }
                _ => {
                    // Ignore groups, materials and smoothing
                }
            }
        }

        if data.indices.is_empty() {
            return Err("No faces found in OBJ data".to_string());
        }

        log::debug!(
            "Parsed OBJ: {} unique vertices, {} triangles",
            data.vertex_count(),
            data.indices.len() / 3
        );
        Ok(data)
    }
}

fn parse_floats<const N: usize>(args: &[&str], line_no: usize) -> Result<[f32; N], String> {
    if args.len() < N {
        return Err(format!("line {}: expected {} components", line_no + 1, N));
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| format!("line {}: invalid number '{}'", line_no + 1, arg))?;
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(raw: &str, len: usize) -> Result<usize, String> {
    let value: i64 = raw.parse().map_err(|_| format!("invalid index '{}'", raw))?;
    let resolved = if value > 0 { value - 1 } else { len as i64 + value };
    if value == 0 || resolved < 0 || resolved as usize >= len {
        return Err(format!("index {} out of bounds", value));
    }
    Ok(resolved as usize)
}

fn parse_corner(
    corner: &str,
    position_count: usize,
    tex_count: usize,
    normal_count: usize,
) -> Result<(usize, Option<usize>, Option<usize>), String> {
    let mut fields = corner.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), position_count)?;
    let tex = match fields.next() {
        Some(raw) if !raw.is_empty() => Some(resolve_index(raw, tex_count)?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(raw) if !raw.is_empty() => Some(resolve_index(raw, normal_count)?),
        _ => None,
    };
    Ok((position, tex, normal))
}
