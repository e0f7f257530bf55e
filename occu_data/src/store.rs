//! Subject mesh loading with an optional binary cache.
//!
//! OBJ parsing plus BVH construction dominates dataset startup, so the
//! store can persist raw geometry (vertices and indices) to a compact
//! binary file and rebuild acceleration structures from it on later runs.
//! The cache is invalidated whenever a source OBJ is newer than it or the
//! requested subject set changed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glam::Vec3;
use occu_core::{load_obj, TriangleMesh};

use crate::error::{DatasetError, Result};

/// Magic bytes for the mesh cache file.
const CACHE_MAGIC: [u8; 4] = *b"OCMC";

/// Cache format version. Bump on any layout change.
const CACHE_VERSION: u32 = 1;

/// In-memory collection of subject meshes, keyed by subject name.
#[derive(Debug)]
pub struct MeshStore {
    meshes: BTreeMap<String, TriangleMesh>,
}

impl MeshStore {
    /// Load the meshes for `subjects` from `<mesh_root>/<subject>/<subject>.obj`.
    ///
    /// When `cache_path` is given, geometry is read from the cache if it is
    /// fresh, and (re)written after an OBJ load otherwise.
    pub fn load(mesh_root: &Path, subjects: &[String], cache_path: Option<&Path>) -> Result<Self> {
        if let Some(cache) = cache_path {
            if cache_is_fresh(cache, mesh_root, subjects) {
                match read_cache(cache, subjects) {
                    Ok(meshes) => {
                        log::info!("loaded {} meshes from cache {:?}", meshes.len(), cache);
                        return Ok(Self { meshes });
                    }
                    Err(err) => {
                        log::warn!("mesh cache {:?} unreadable, rebuilding: {}", cache, err);
                    }
                }
            }
        }

        let mut meshes = BTreeMap::new();
        for subject in subjects {
            let path = obj_path(mesh_root, subject);
            log::info!("loading mesh for subject {} from {:?}", subject, path);
            let mesh = load_obj(&path).map_err(|err| {
                DatasetError::input(subject, 0, &path, format!("mesh load failed: {}", err))
            })?;
            meshes.insert(subject.clone(), mesh);
        }

        if let Some(cache) = cache_path {
            if let Err(err) = write_cache(cache, &meshes) {
                log::warn!("failed to write mesh cache {:?}: {}", cache, err);
            } else {
                log::info!("wrote mesh cache {:?} ({} meshes)", cache, meshes.len());
            }
        }

        Ok(Self { meshes })
    }

    /// Mesh for a subject, if loaded.
    pub fn get(&self, subject: &str) -> Option<&TriangleMesh> {
        self.meshes.get(subject)
    }

    /// Number of loaded meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Check if no meshes are loaded.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Loaded subject names, sorted.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.meshes.keys().map(String::as_str)
    }
}

fn obj_path(mesh_root: &Path, subject: &str) -> PathBuf {
    mesh_root.join(subject).join(format!("{}.obj", subject))
}

/// A cache is fresh when it exists and no source OBJ is newer than it.
fn cache_is_fresh(cache: &Path, mesh_root: &Path, subjects: &[String]) -> bool {
    let cache_mtime = match mtime(cache) {
        Some(t) => t,
        None => return false,
    };

    subjects.iter().all(|subject| {
        matches!(mtime(&obj_path(mesh_root, subject)), Some(t) if t <= cache_mtime)
    })
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn write_cache(path: &Path, meshes: &BTreeMap<String, TriangleMesh>) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    w.write_all(&CACHE_MAGIC)?;
    w.write_all(&CACHE_VERSION.to_le_bytes())?;
    w.write_all(&(meshes.len() as u32).to_le_bytes())?;

    for (name, mesh) in meshes {
        let name_bytes = name.as_bytes();
        w.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        w.write_all(name_bytes)?;
        w.write_all(&(mesh.num_vertices() as u32).to_le_bytes())?;
        w.write_all(&(mesh.num_faces() as u32).to_le_bytes())?;

        for v in mesh.vertices() {
            w.write_all(&v.x.to_le_bytes())?;
            w.write_all(&v.y.to_le_bytes())?;
            w.write_all(&v.z.to_le_bytes())?;
        }
        for tri in mesh.triangles() {
            for &idx in tri {
                w.write_all(&(idx as u32).to_le_bytes())?;
            }
        }
    }

    w.flush()?;
    Ok(())
}

fn read_cache(path: &Path, subjects: &[String]) -> Result<BTreeMap<String, TriangleMesh>> {
    let mut r = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != CACHE_MAGIC {
        return Err(bad_cache("bad magic bytes"));
    }
    if read_u32(&mut r)? != CACHE_VERSION {
        return Err(bad_cache("version mismatch"));
    }

    let count = read_u32(&mut r)? as usize;
    let mut meshes = BTreeMap::new();

    for _ in 0..count {
        let name_len = read_u16(&mut r)? as usize;
        let mut name_bytes = vec![0u8; name_len];
        r.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes).map_err(|_| bad_cache("non-utf8 name"))?;

        let num_vertices = read_u32(&mut r)? as usize;
        let num_faces = read_u32(&mut r)? as usize;

        let mut vertices = Vec::with_capacity(num_vertices);
        for _ in 0..num_vertices {
            let x = read_f32(&mut r)?;
            let y = read_f32(&mut r)?;
            let z = read_f32(&mut r)?;
            vertices.push(Vec3::new(x, y, z));
        }

        let mut triangles = Vec::with_capacity(num_faces);
        for _ in 0..num_faces {
            let a = read_u32(&mut r)? as usize;
            let b = read_u32(&mut r)? as usize;
            let c = read_u32(&mut r)? as usize;
            triangles.push([a, b, c]);
        }

        meshes.insert(name, TriangleMesh::new(vertices, triangles)?);
    }

    // A cache from a different subject list is stale even if its mtime
    // says otherwise.
    for subject in subjects {
        if !meshes.contains_key(subject) {
            return Err(bad_cache("missing subject"));
        }
    }
    meshes.retain(|name, _| subjects.iter().any(|s| s == name));

    Ok(meshes)
}

fn bad_cache(message: &str) -> DatasetError {
    DatasetError::Io(io::Error::new(io::ErrorKind::InvalidData, message))
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}
