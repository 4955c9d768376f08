//! Model loading boundary and static collision mesh building.
//!
//! Model parsing itself is someone else's job: an `AssetLoader` hands back
//! raw mesh data and this module flattens it into one triangle mesh that the
//! body registry can turn into a fixed collider.

use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::{BodyError, ShapeDesc};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("model has no triangles")]
    EmptyModel,
    #[error("mesh {mesh} references vertex {index} but has only {vertices}")]
    IndexOutOfRange {
        mesh: usize,
        index: u32,
        vertices: usize,
    },
    #[error("model has too many vertices ({0})")]
    TooManyVertices(usize),
    #[error(transparent)]
    Body(#[from] BodyError),
}

/// One mesh of a loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    /// Triangle list indices. `None` means every three positions form a
    /// triangle.
    pub indices: Option<Vec<u32>>,
    /// Mesh-to-model transform.
    pub transform: Mat4,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }
}

/// Loads models. `progress(loaded_bytes, total_bytes)` may be called any
/// number of times while loading.
pub trait AssetLoader {
    fn load(&self, path: &Path, progress: &mut dyn FnMut(u64, u64)) -> Result<ModelData, AssetError>;
}

/// Where a temple model sits in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPlacement {
    pub path: String,
    pub position: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about +Y, in degrees.
    #[serde(default)]
    pub yaw_degrees: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl ModelPlacement {
    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    fn local_transform(&self) -> Mat4 {
        Mat4::from_quat(Quat::from_rotation_y(self.yaw_degrees.to_radians()))
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// Flattens every mesh of `model` into one triangle mesh, relative to the
/// placement origin.
///
/// Each vertex goes through its mesh transform, then the placement scale,
/// then the placement yaw.
pub fn build_collision_mesh(model: &ModelData, placement: &ModelPlacement) -> Result<ShapeDesc, AssetError> {
    let local = placement.local_transform();
    let mut vertices: Vec<[f32; 3]> = Vec::with_capacity(model.vertex_count());
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (mesh_index, mesh) in model.meshes.iter().enumerate() {
        let offset = u32::try_from(vertices.len()).map_err(|_| AssetError::TooManyVertices(vertices.len()))?;
        let count = mesh.positions.len();
        let to_model = local * mesh.transform;
        vertices.extend(mesh.positions.iter().map(|p| to_model.transform_point3(*p).to_array()));

        match &mesh.indices {
            Some(indices) => {
                for tri in indices.chunks_exact(3) {
                    let mut out = [0u32; 3];
                    for (slot, index) in out.iter_mut().zip(tri) {
                        if *index as usize >= count {
                            return Err(AssetError::IndexOutOfRange {
                                mesh: mesh_index,
                                index: *index,
                                vertices: count,
                            });
                        }
                        *slot = offset + index;
                    }
                    triangles.push(out);
                }
            }
            None => {
                let count = u32::try_from(count).map_err(|_| AssetError::TooManyVertices(count))?;
                triangles.extend(
                    (0..count / 3).map(|t| [offset + 3 * t, offset + 3 * t + 1, offset + 3 * t + 2]),
                );
            }
        }
    }

    if vertices.is_empty() || triangles.is_empty() {
        return Err(AssetError::EmptyModel);
    }
    tracing::debug!(
        vertices = vertices.len(),
        triangles = triangles.len(),
        path = %placement.path,
        "collision mesh built"
    );
    Ok(ShapeDesc::TriangleMesh { vertices, triangles })
}

#[derive(Debug, Deserialize)]
struct ModelDocument {
    meshes: Vec<MeshDocument>,
}

#[derive(Debug, Deserialize)]
struct MeshDocument {
    positions: Vec<[f32; 3]>,
    #[serde(default)]
    indices: Option<Vec<u32>>,
    /// Column-major 4x4 matrix.
    #[serde(default)]
    transform: Option<[f32; 16]>,
}

impl From<MeshDocument> for MeshData {
    fn from(doc: MeshDocument) -> Self {
        Self {
            positions: doc.positions.into_iter().map(Vec3::from_array).collect(),
            indices: doc.indices,
            transform: doc
                .transform
                .map_or(Mat4::IDENTITY, |cols| Mat4::from_cols_array(&cols)),
        }
    }
}

/// Reads a minimal JSON mesh format from disk:
///
/// ```json
/// { "meshes": [ { "positions": [[0,0,0], ...], "indices": [0,1,2], "transform": [16 floats] } ] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonModelLoader {
    root: PathBuf,
}

impl JsonModelLoader {
    /// Paths passed to `load` are resolved against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn parse(bytes: &[u8], path: &Path) -> Result<ModelData, AssetError> {
        let doc: ModelDocument = serde_json::from_slice(bytes).map_err(|source| AssetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ModelData {
            meshes: doc.meshes.into_iter().map(MeshData::from).collect(),
        })
    }
}

impl AssetLoader for JsonModelLoader {
    fn load(&self, path: &Path, progress: &mut dyn FnMut(u64, u64)) -> Result<ModelData, AssetError> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full).map_err(|source| AssetError::Io {
            path: full.clone(),
            source,
        })?;

        let total = bytes.len() as u64;
        progress(0, total);
        let model = Self::parse(&bytes, &full)?;
        progress(total, total);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(scale: f32, yaw_degrees: f32) -> ModelPlacement {
        ModelPlacement {
            path: "test.json".to_string(),
            position: [5.0, 0.0, 0.0],
            scale,
            yaw_degrees,
        }
    }

    fn triangle(transform: Mat4, indices: Option<Vec<u32>>) -> MeshData {
        MeshData {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            indices,
            transform,
        }
    }

    fn mesh_parts(shape: ShapeDesc) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        match shape {
            ShapeDesc::TriangleMesh { vertices, triangles } => (vertices, triangles),
            other => panic!("expected a triangle mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_indices_are_offset_per_mesh() {
        let model = ModelData {
            meshes: vec![
                triangle(Mat4::IDENTITY, Some(vec![0, 1, 2])),
                triangle(Mat4::IDENTITY, Some(vec![2, 1, 0])),
            ],
        };
        let (vertices, triangles) = mesh_parts(build_collision_mesh(&model, &placement(1.0, 0.0)).unwrap());
        assert_eq!(vertices.len(), 6);
        assert_eq!(triangles, vec![[0, 1, 2], [5, 4, 3]]);
    }

    #[test]
    fn test_non_indexed_meshes_use_sequential_triples() {
        let mut mesh = triangle(Mat4::IDENTITY, None);
        mesh.positions.extend([Vec3::Y, Vec3::ONE, Vec3::NEG_X, Vec3::NEG_Z]);
        let model = ModelData {
            meshes: vec![triangle(Mat4::IDENTITY, None), mesh],
        };
        let (_, triangles) = mesh_parts(build_collision_mesh(&model, &placement(1.0, 0.0)).unwrap());
        // The trailing vertex of the second mesh does not form a triangle.
        assert_eq!(triangles, vec![[0, 1, 2], [3, 4, 5], [6, 7, 8]]);
    }

    #[test]
    fn test_transform_then_scale_then_yaw() {
        let model = ModelData {
            meshes: vec![triangle(Mat4::from_translation(Vec3::Z), Some(vec![0, 1, 2]))],
        };
        let (vertices, _) = mesh_parts(build_collision_mesh(&model, &placement(2.0, 90.0)).unwrap());

        // (0,0,0) -> (0,0,1) -> (0,0,2) -> yaw 90° about +Y -> (2,0,0)
        let first = Vec3::from_array(vertices[0]);
        assert!(first.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_empty_model_is_an_error() {
        assert!(matches!(
            build_collision_mesh(&ModelData::default(), &placement(1.0, 0.0)),
            Err(AssetError::EmptyModel)
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let model = ModelData {
            meshes: vec![triangle(Mat4::IDENTITY, Some(vec![0, 1, 3]))],
        };
        assert!(matches!(
            build_collision_mesh(&model, &placement(1.0, 0.0)),
            Err(AssetError::IndexOutOfRange { mesh: 0, index: 3, vertices: 3 })
        ));
    }

    #[test]
    fn test_parse_json_document() {
        let json = br#"{
            "meshes": [
                { "positions": [[0,0,0],[1,0,0],[0,0,1]], "indices": [0,1,2] },
                { "positions": [[0,0,0],[1,0,0],[0,0,1]],
                  "transform": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,3,0,1] }
            ]
        }"#;
        let model = JsonModelLoader::parse(json, Path::new("inline.json")).unwrap();

        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.meshes[0].transform, Mat4::IDENTITY);
        assert_eq!(model.meshes[1].indices, None);
        assert_eq!(
            model.meshes[1].transform.transform_point3(Vec3::ZERO),
            Vec3::new(0.0, 3.0, 0.0)
        );
        assert_eq!(model.vertex_count(), 6);
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let loader = JsonModelLoader::new("/nonexistent-temple-assets");
        let mut calls = 0;
        let result = loader.load(Path::new("temple.json"), &mut |_, _| calls += 1);
        assert!(matches!(result, Err(AssetError::Io { .. })));
        assert_eq!(calls, 0);
    }
}
