//! CPU-side mesh geometry
//!
//! [`MeshGeometry`] is what a render node points at when it does not use one
//! of the shared unit primitives: meshes loaded from Wavefront OBJ files and
//! geometry built per instance (inline triangle meshes, sampled surfaces,
//! polylines and decoration grids). Vertices are `Pod` so a backend can upload
//! them with `bytemuck::cast_slice` without copying.

use std::fs;
use std::io;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Vec3};

use crate::AssetError;

/// A mesh vertex with position and normal
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    /// Unit normal, zero for line geometry
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// How the index buffer is interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Topology {
    /// Every three indices form a triangle
    #[default]
    Triangles,
    /// Every two indices form a line segment
    Lines,
}

/// Indexed mesh geometry
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshGeometry {
    /// Load a Wavefront OBJ file
    ///
    /// Positions, normals and polygonal faces are read; faces with more than
    /// three corners are fan-triangulated. Texture coordinates, groups and
    /// material statements are ignored.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse_obj(&source)
    }

    /// Parse OBJ text
    pub fn parse_obj(source: &str) -> Result<Self, AssetError> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut normals: Vec<Vec3> = Vec::new();
        let mut mesh = MeshGeometry::default();

        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or_default();
            let mut tokens = content.split_whitespace();

            match tokens.next() {
                Some("v") => positions.push(parse_vec3(&mut tokens, line)?),
                Some("vn") => normals.push(parse_vec3(&mut tokens, line)?.normalize_or_zero()),
                Some("f") => {
                    let corners = tokens
                        .map(|t| parse_corner(t, positions.len(), normals.len(), line))
                        .collect::<Result<Vec<_>, _>>()?;
                    if corners.len() < 3 {
                        return Err(AssetError::parse(line, "face with fewer than 3 vertices"));
                    }

                    let face_normal = triangle_normal(
                        positions[corners[0].0],
                        positions[corners[1].0],
                        positions[corners[2].0],
                    );
                    let base = mesh.vertices.len() as u32;
                    for &(p, n) in &corners {
                        let normal = n.map(|n| normals[n]).unwrap_or(face_normal);
                        mesh.vertices.push(MeshVertex::new(positions[p], normal));
                    }
                    for k in 1..corners.len() as u32 - 1 {
                        mesh.indices.extend_from_slice(&[base, base + k, base + k + 1]);
                    }
                }
                _ => {}
            }
        }

        if mesh.indices.is_empty() {
            return Err(AssetError::parse(0, "mesh has no faces"));
        }
        Ok(mesh)
    }

    /// Build flat-shaded geometry from an inline triangle list
    pub fn from_triangles(vertices: &[DVec3], triangles: &[[u32; 3]]) -> Result<Self, AssetError> {
        let mut mesh = MeshGeometry::default();
        for (t, tri) in triangles.iter().enumerate() {
            let mut corners = [Vec3::ZERO; 3];
            for (c, &index) in tri.iter().enumerate() {
                corners[c] = vertices
                    .get(index as usize)
                    .map(|v| v.as_vec3())
                    .ok_or_else(|| {
                        AssetError::parse(0, format!("triangle {} references vertex {}", t, index))
                    })?;
            }
            let normal = triangle_normal(corners[0], corners[1], corners[2]);
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend(corners.iter().map(|&p| MeshVertex::new(p, normal)));
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        Ok(mesh)
    }

    /// Triangulate a `nu` x `nv` grid of surface points (row-major in u)
    ///
    /// Normals are averaged over the adjacent triangles.
    pub fn from_surface(nu: u32, nv: u32, points: &[DVec3]) -> Result<Self, AssetError> {
        if nu < 2 || nv < 2 {
            return Err(AssetError::parse(0, format!("surface grid {}x{} is degenerate", nu, nv)));
        }
        let (nu, nv) = (nu as usize, nv as usize);
        let expected = nu
            .checked_mul(nv)
            .filter(|&n| n <= u32::MAX as usize)
            .ok_or_else(|| AssetError::parse(0, format!("surface grid {}x{} is too large", nu, nv)))?;
        if points.len() != expected {
            return Err(AssetError::parse(
                0,
                format!("surface grid {}x{} needs {} points, got {}", nu, nv, expected, points.len()),
            ));
        }

        // Fits in u32 since the point count does
        let at = |u: usize, v: usize| (v * nu + u) as u32;
        let mut indices = Vec::with_capacity((nu - 1) * (nv - 1) * 6);
        for v in 0..nv - 1 {
            for u in 0..nu - 1 {
                let (a, b, c, d) = (at(u, v), at(u + 1, v), at(u + 1, v + 1), at(u, v + 1));
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }

        let positions: Vec<Vec3> = points.iter().map(|p| p.as_vec3()).collect();
        let mut accum = vec![Vec3::ZERO; positions.len()];
        for tri in indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let n = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);
            accum[i0] += n;
            accum[i1] += n;
            accum[i2] += n;
        }

        let vertices = positions
            .iter()
            .zip(&accum)
            .map(|(&p, &n)| MeshVertex::new(p, n.normalize_or_zero()))
            .collect();
        Ok(MeshGeometry {
            vertices,
            indices,
            topology: Topology::Triangles,
        })
    }

    /// Line geometry through the given points
    pub fn polyline(points: &[DVec3], closed: bool) -> Self {
        let vertices: Vec<MeshVertex> = points
            .iter()
            .map(|p| MeshVertex::new(p.as_vec3(), Vec3::ZERO))
            .collect();

        let n = vertices.len() as u32;
        let mut indices = Vec::new();
        for i in 1..n {
            indices.extend_from_slice(&[i - 1, i]);
        }
        if closed && n > 2 {
            indices.extend_from_slice(&[n - 1, 0]);
        }

        MeshGeometry {
            vertices,
            indices,
            topology: Topology::Lines,
        }
    }

    /// Line grid in the local XY plane, centered at the origin
    ///
    /// `nu` cells of width `u_step` along X and `nv` cells of height `v_step`
    /// along Y.
    pub fn grid_lines(u_step: f64, v_step: f64, nu: u32, nv: u32) -> Self {
        let half_u = u_step * nu as f64 * 0.5;
        let half_v = v_step * nv as f64 * 0.5;
        let mut mesh = MeshGeometry {
            topology: Topology::Lines,
            ..Default::default()
        };

        let mut segment = |a: DVec3, b: DVec3| {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.push(MeshVertex::new(a.as_vec3(), Vec3::ZERO));
            mesh.vertices.push(MeshVertex::new(b.as_vec3(), Vec3::ZERO));
            mesh.indices.extend_from_slice(&[base, base + 1]);
        };
        for i in 0..=nu {
            let x = -half_u + i as f64 * u_step;
            segment(DVec3::new(x, -half_v, 0.0), DVec3::new(x, half_v, 0.0));
        }
        for j in 0..=nv {
            let y = -half_v + j as f64 * v_step;
            segment(DVec3::new(-half_u, y, 0.0), DVec3::new(half_u, y, 0.0));
        }
        mesh
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles (0 for line geometry)
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => 0,
        }
    }

    /// Vertex buffer as raw bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3, AssetError> {
    let mut v = [0.0f32; 3];
    for slot in &mut v {
        let token = tokens
            .next()
            .ok_or_else(|| AssetError::parse(line, "expected 3 coordinates"))?;
        *slot = token
            .parse()
            .map_err(|_| AssetError::parse(line, format!("invalid number '{}'", token)))?;
    }
    Ok(Vec3::from_array(v))
}

/// Parse a face corner (`p`, `p/t`, `p//n` or `p/t/n`) into resolved indices
fn parse_corner(
    token: &str,
    position_count: usize,
    normal_count: usize,
    line: usize,
) -> Result<(usize, Option<usize>), AssetError> {
    let mut parts = token.split('/');
    let position = resolve_index(parts.next().unwrap_or_default(), position_count, line)?;
    let _texcoord = parts.next();
    let normal = match parts.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count, line)?),
        _ => None,
    };
    Ok((position, normal))
}

/// OBJ indices are 1-based; negative values count back from the end
fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, AssetError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| AssetError::parse(line, format!("invalid index '{}'", token)))?;
    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(count as i64 + r),
    };
    match resolved {
        Some(i) if i >= 0 && (i as usize) < count => Ok(i as usize),
        _ => Err(AssetError::parse(line, format!("index {} out of range", raw))),
    }
}
