//! Wavefront OBJ import.
//!
//! Parses the `v` and `f` records of an OBJ file into a [`TriangleMesh`].
//! Texture/normal indices in face records are ignored; polygons are fan
//! triangulated. Supports 1-based and negative (relative) vertex indices.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::Vec3;

use crate::error::{CoreError, Result};
use crate::mesh::TriangleMesh;

/// Load a triangle mesh from an OBJ file on disk.
pub fn load_obj(path: &Path) -> Result<TriangleMesh> {
    let file = File::open(path)?;
    parse_obj(BufReader::new(file))
}

/// Parse OBJ data from any buffered reader.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<TriangleMesh> {
    let mut vertices: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[usize; 3]> = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0f32; 3];
                for coord in &mut coords {
                    let token = tokens.next().ok_or_else(|| CoreError::ObjParse {
                        line: line_no,
                        message: "vertex record with fewer than 3 coordinates".to_string(),
                    })?;
                    *coord = token.parse().map_err(|_| CoreError::ObjParse {
                        line: line_no,
                        message: format!("invalid vertex coordinate '{}'", token),
                    })?;
                }
                vertices.push(Vec3::from_array(coords));
            }
            Some("f") => {
                let mut indices = Vec::with_capacity(4);
                for token in tokens {
                    indices.push(parse_face_index(token, vertices.len(), line_no)?);
                }
                if indices.len() < 3 {
                    return Err(CoreError::ObjParse {
                        line: line_no,
                        message: "face record with fewer than 3 vertices".to_string(),
                    });
                }
                // Fan triangulation
                for i in 1..indices.len() - 1 {
                    triangles.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
            // vn/vt/usemtl/o/g/s and friends are irrelevant here
            _ => {}
        }
    }

    TriangleMesh::new(vertices, triangles)
}

/// Parse one face vertex token (`i`, `i/t`, `i//n`, `i/t/n`, possibly
/// negative) into a 0-based vertex index.
fn parse_face_index(token: &str, vertex_count: usize, line_no: usize) -> Result<usize> {
    let index_part = token.split('/').next().unwrap_or(token);
    let raw: i64 = index_part.parse().map_err(|_| CoreError::ObjParse {
        line: line_no,
        message: format!("invalid face index '{}'", token),
    })?;

    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        vertex_count as i64 + raw
    } else {
        return Err(CoreError::ObjParse {
            line: line_no,
            message: "face index 0 is not valid in OBJ".to_string(),
        });
    };

    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(CoreError::ObjParse {
            line: line_no,
            message: format!("face index '{}' out of range", token),
        });
    }

    Ok(resolved as usize)
}
