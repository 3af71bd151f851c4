//! Procedural geometry for the table, squares, orbiting bodies and pieces.
//!
//! The scene builder only ever asks a `MeshProvider` for a `(ShapeKind, Colour)`
//! pair and keeps the returned handle. `GpuMeshProvider` generates the geometry
//! here and uploads it into the renderer's `MeshStore`.

use std::f32::consts::{FRAC_PI_2, TAU};

use cks_core::MeshHandle;
use cks_render::{MeshStore, MeshVertex};
use glam::{Vec2, Vec3};

use crate::board::PieceShape;

pub type Colour = [f32; 4];

/// Height of an extruded piece before node scaling. Pieces sit on y = 0 and
/// extrude upward so vertical scaling raises them from the square.
pub const PIECE_HEIGHT: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Axis-aligned box spanning [-1, 1] on every axis.
    Slab,
    /// Unit sphere.
    Sphere,
    Piece(PieceShape),
}

pub trait MeshProvider {
    fn produce_mesh(&mut self, kind: ShapeKind, colour: Colour) -> MeshHandle;
}

pub fn piece_colour(shape: PieceShape) -> Colour {
    match shape {
        PieceShape::Hex => [0.9, 0.9, 0.9, 1.0],
        PieceShape::Star => [0.1, 0.1, 0.9, 1.0],
        PieceShape::Circle => [0.9, 0.0, 0.0, 1.0],
        PieceShape::A => [0.8, 0.9, 0.0, 1.0],
        PieceShape::Triangle => [0.8, 0.0, 0.9, 1.0],
        PieceShape::Pogram => [0.0, 0.9, 0.0, 1.0],
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, colour: Colour) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(MeshVertex {
            position: position.to_array(),
            normal: normal.to_array(),
            color: colour,
        });
        index
    }
}

pub fn generate(kind: ShapeKind, colour: Colour) -> MeshData {
    match kind {
        ShapeKind::Slab => slab(colour),
        ShapeKind::Sphere => sphere(24, 12, colour),
        ShapeKind::Piece(shape) => {
            let (outline, anchor) = piece_outline(shape);
            extrude(&outline, anchor, PIECE_HEIGHT, colour)
        }
    }
}

fn slab(colour: Colour) -> MeshData {
    let mut mesh = MeshData::default();
    // (normal, u) with v = normal x u, so u x v == normal on every face.
    let faces = [
        (Vec3::X, Vec3::Y),
        (-Vec3::X, Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (-Vec3::Y, Vec3::Z),
        (Vec3::Z, Vec3::X),
        (-Vec3::Z, Vec3::X),
    ];
    for (normal, u) in faces {
        let v = normal.cross(u);
        let corners = [
            normal - u - v,
            normal + u - v,
            normal + u + v,
            normal - u + v,
        ];
        let base = mesh.vertices.len() as u32;
        for corner in corners {
            mesh.push_vertex(corner, normal, colour);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

fn sphere(slices: u32, stacks: u32, colour: Colour) -> MeshData {
    let mut mesh = MeshData::default();
    for stack in 0..=stacks {
        let phi = stack as f32 / stacks as f32 * std::f32::consts::PI;
        for slice in 0..=slices {
            let theta = slice as f32 / slices as f32 * TAU;
            let p = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.push_vertex(p, p, colour);
        }
    }
    let row = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * row + slice;
            let b = a + row;
            mesh.indices
                .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    mesh
}

/// Piece footprint in the XZ plane (x, z), plus a point every outline vertex
/// is visible from so the caps can be fanned from it.
fn piece_outline(shape: PieceShape) -> (Vec<Vec2>, Vec2) {
    match shape {
        PieceShape::Hex => (regular_polygon(6, 0.9, 0.0), Vec2::ZERO),
        PieceShape::Triangle => (regular_polygon(3, 0.9, FRAC_PI_2), Vec2::ZERO),
        PieceShape::Star => {
            let points = (0..10)
                .map(|i| {
                    let radius = if i % 2 == 0 { 0.95 } else { 0.4 };
                    let angle = FRAC_PI_2 + i as f32 * TAU / 10.0;
                    Vec2::new(angle.cos(), angle.sin()) * radius
                })
                .collect();
            (points, Vec2::ZERO)
        }
        PieceShape::Pogram => (
            vec![
                Vec2::new(-0.9, -0.5),
                Vec2::new(0.4, -0.5),
                Vec2::new(0.9, 0.5),
                Vec2::new(-0.4, 0.5),
            ],
            Vec2::ZERO,
        ),
        PieceShape::Circle => {
            // Three quarters of a disc; the missing quadrant is x > 0, z < 0.
            let segments = 18;
            let mut points = vec![Vec2::ZERO];
            points.extend((0..=segments).map(|i| {
                let angle = i as f32 / segments as f32 * 1.5 * std::f32::consts::PI;
                Vec2::new(angle.cos(), angle.sin()) * 0.9
            }));
            (points, Vec2::new(-0.3, 0.3))
        }
        PieceShape::A => (
            vec![
                Vec2::new(-0.9, -0.9),
                Vec2::new(-0.5, -0.9),
                Vec2::new(0.0, 0.45),
                Vec2::new(0.5, -0.9),
                Vec2::new(0.9, -0.9),
                Vec2::new(0.2, 0.9),
                Vec2::new(-0.2, 0.9),
            ],
            Vec2::new(0.0, 0.7),
        ),
    }
}

fn regular_polygon(sides: u32, radius: f32, start_angle: f32) -> Vec<Vec2> {
    (0..sides)
        .map(|i| {
            let angle = start_angle + i as f32 * TAU / sides as f32;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Extrude a star-shaped outline from y = 0 to y = `height`.
fn extrude(outline: &[Vec2], anchor: Vec2, height: f32, colour: Colour) -> MeshData {
    let mut points = outline.to_vec();
    if signed_area(&points) < 0.0 {
        points.reverse();
    }
    let n = points.len() as u32;
    let mut mesh = MeshData::default();
    let lift = |p: Vec2, y: f32| Vec3::new(p.x, y, p.y);

    for (y, normal) in [(height, Vec3::Y), (0.0, -Vec3::Y)] {
        let centre = mesh.push_vertex(lift(anchor, y), normal, colour);
        let first = mesh.vertices.len() as u32;
        for &p in &points {
            mesh.push_vertex(lift(p, y), normal, colour);
        }
        for i in 0..n {
            mesh.indices
                .extend_from_slice(&[centre, first + i, first + (i + 1) % n]);
        }
    }

    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let edge = b - a;
        // Counter-clockwise outline: outward is the edge turned clockwise.
        let normal = Vec3::new(edge.y, 0.0, -edge.x).normalize_or_zero();
        let base = mesh.vertices.len() as u32;
        mesh.push_vertex(lift(a, 0.0), normal, colour);
        mesh.push_vertex(lift(b, 0.0), normal, colour);
        mesh.push_vertex(lift(b, height), normal, colour);
        mesh.push_vertex(lift(a, height), normal, colour);
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

fn signed_area(points: &[Vec2]) -> f32 {
    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

/// Generates meshes on demand and uploads them into a `MeshStore`.
pub struct GpuMeshProvider<'a> {
    device: &'a wgpu::Device,
    store: &'a mut MeshStore,
}

impl<'a> GpuMeshProvider<'a> {
    pub fn new(device: &'a wgpu::Device, store: &'a mut MeshStore) -> Self {
        Self { device, store }
    }
}

impl MeshProvider for GpuMeshProvider<'_> {
    fn produce_mesh(&mut self, kind: ShapeKind, colour: Colour) -> MeshHandle {
        let data = generate(kind, colour);
        let label = match kind {
            ShapeKind::Slab => "slab".to_string(),
            ShapeKind::Sphere => "sphere".to_string(),
            ShapeKind::Piece(shape) => format!("piece_{}", shape.label()),
        };
        let id = self
            .store
            .upload(self.device, &label, &data.vertices, &data.indices);
        MeshHandle {
            id,
            index_count: data.indices.len() as u32,
        }
    }
}

/// Records requests and hands out sequential handles without touching a GPU.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingMeshProvider {
    pub requests: Vec<(ShapeKind, Colour)>,
}

#[cfg(test)]
impl MeshProvider for RecordingMeshProvider {
    fn produce_mesh(&mut self, kind: ShapeKind, colour: Colour) -> MeshHandle {
        let id = self.requests.len() as u32;
        self.requests.push((kind, colour));
        MeshHandle {
            id,
            index_count: generate(kind, colour).indices.len() as u32,
        }
    }
}
