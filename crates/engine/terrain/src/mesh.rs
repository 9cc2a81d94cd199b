//! Mesh builder: heightfield tessellation, normals and skirts
//!
//! [`generate`] walks the sampling grid, projects every valid sample through the
//! master locator and builds the vertex, normal and texture-coordinate arrays of
//! a tile. Quads are split along the diagonal with the smaller elevation delta,
//! and boundary skirts are appended as triangle strips.
//!
//! [`update`] is the cheap path: it repositions the existing vertices from new
//! elevation data without touching topology, normals or texture coordinates.

use glam::{DVec3, Vec2, Vec3, Vec4};
use std::sync::Arc;

use crate::binder::TexCoordPlan;
use crate::elevation::ElevationSource;
use crate::locator::Locator;
use crate::sampling::SamplingPlan;

/// How a primitive's indices are assembled into triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Triangles,
    TriangleStrip,
}

/// An indexed primitive set
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub mode: PrimitiveMode,
    pub indices: Vec<u32>,
}

impl Primitive {
    fn new(mode: PrimitiveMode) -> Self {
        Self {
            mode,
            indices: Vec::new(),
        }
    }

    /// Number of triangles this primitive rasterizes
    pub fn triangle_count(&self) -> usize {
        match self.mode {
            PrimitiveMode::Triangles => self.indices.len() / 3,
            PrimitiveMode::TriangleStrip => self.indices.len().saturating_sub(2),
        }
    }
}

/// A skirt vertex and the body vertex it hangs from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkirtVertex {
    /// Grid cell (`row * columns + column`) of the source sample
    pub cell: usize,
    /// Body vertex the skirt vertex was derived from
    pub source: u32,
    /// Index of the skirt vertex itself
    pub vertex: u32,
}

/// Renderable mesh data of one tile
///
/// Positions are relative to the tile center. Texture coordinates are stored
/// once per distinct color source; `tex_coord_slots` maps every color-layer
/// slot to its array.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGeometry {
    pub columns: usize,
    pub rows: usize,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec<Vec2>>,
    pub tex_coord_slots: Vec<usize>,
    /// Overall color
    pub colors: Vec<Vec4>,
    /// Main triangle list first, then one strip per skirt run
    pub primitives: Vec<Primitive>,
    /// Vertex index of every grid cell, `None` for invalid samples
    pub grid_indices: Vec<Option<u32>>,
    pub skirt_vertices: Vec<SkirtVertex>,
    body_vertex_count: usize,
}

impl TerrainGeometry {
    /// Number of vertices generated from valid grid cells
    pub fn body_vertex_count(&self) -> usize {
        self.body_vertex_count
    }

    /// Number of vertices appended for skirts
    pub fn skirt_vertex_count(&self) -> usize {
        self.vertices.len() - self.body_vertex_count
    }

    /// Whether the vertex array extends past the body vertices
    pub fn has_skirt(&self) -> bool {
        self.vertices.len() > self.body_vertex_count
    }

    /// The main triangle list
    pub fn triangles(&self) -> &[u32] {
        self.primitives
            .iter()
            .find(|p| p.mode == PrimitiveMode::Triangles)
            .map(|p| p.indices.as_slice())
            .unwrap_or(&[])
    }

    /// Skirt strips in boundary order
    pub fn skirt_strips(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| p.mode == PrimitiveMode::TriangleStrip)
    }

    /// Texture coordinates used by color-layer `slot`
    pub fn tex_coords_for_layer(&self, slot: usize) -> Option<&[Vec2]> {
        let array = *self.tex_coord_slots.get(slot)?;
        self.tex_coords.get(array).map(Vec::as_slice)
    }

    pub fn stats(&self) -> BuildStats {
        BuildStats {
            body_vertices: self.body_vertex_count,
            skirt_vertices: self.skirt_vertex_count(),
            triangles: self.triangles().len() / 3,
            skirt_strips: self.skirt_strips().count(),
        }
    }
}

/// Summary of a built tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    pub body_vertices: usize,
    pub skirt_vertices: usize,
    pub triangles: usize,
    pub skirt_strips: usize,
}

/// Everything the mesh builder reads
pub struct MeshInput<'a> {
    pub master: &'a Arc<Locator>,
    /// Tile center in model coordinates; vertices are stored relative to it
    pub center: DVec3,
    pub elevation: Option<&'a ElevationSource>,
    pub plan: SamplingPlan,
    pub vertical_scale: f32,
}

impl MeshInput<'_> {
    /// NDC of a grid cell, or `None` if its elevation sample is invalid
    fn cell_ndc(&self, column: usize, row: usize) -> Option<DVec3> {
        let mut ndc = grid_ndc(&self.plan, column, row);
        if let Some(source) = self.elevation {
            let (native_column, native_row) = self.plan.native_index(column, row);
            let value = source.valid_value(native_column, native_row)?;
            ndc.z = (value * self.vertical_scale) as f64;
        }
        Some(ndc)
    }

    fn skirt_height(&self) -> f32 {
        self.elevation.map_or(0.0, ElevationSource::skirt_height)
    }
}

/// Flat NDC of a grid cell
pub fn grid_ndc(plan: &SamplingPlan, column: usize, row: usize) -> DVec3 {
    DVec3::new(
        column as f64 / (plan.columns - 1) as f64,
        row as f64 / (plan.rows - 1) as f64,
        0.0,
    )
}

/// Build a tile mesh from scratch
pub fn generate(input: &MeshInput<'_>, tex_plan: &TexCoordPlan) -> TerrainGeometry {
    let plan = input.plan;
    let (columns, rows) = (plan.columns, plan.rows);
    let skirt_height = input.skirt_height();
    let create_skirt = skirt_height > 0.0;

    let body_capacity = plan.cell_count();
    let skirt_capacity = if create_skirt { 2 * (columns + rows) - 4 } else { 0 };
    let capacity = body_capacity + skirt_capacity;

    let mut vertices: Vec<Vec3> = Vec::with_capacity(capacity);
    let mut normals: Vec<Vec3> = Vec::with_capacity(capacity);
    let mut tex_coords: Vec<Vec<Vec2>> = (0..tex_plan.array_count())
        .map(|_| Vec::with_capacity(capacity))
        .collect();
    let mut elevations: Vec<f32> = Vec::with_capacity(body_capacity);
    let mut grid_indices: Vec<Option<u32>> = vec![None; body_capacity];

    for row in 0..rows {
        for column in 0..columns {
            let Some(ndc) = input.cell_ndc(column, row) else {
                continue;
            };

            grid_indices[row * columns + column] = Some(vertices.len() as u32);

            let model = input.master.local_to_model(ndc);
            vertices.push((model - input.center).as_vec3());

            let flat = DVec3::new(ndc.x, ndc.y, 0.0);
            for (array, coords) in tex_coords.iter_mut().enumerate() {
                coords.push(tex_plan.tex_coord(array, flat));
            }

            elevations.push(ndc.z as f32);

            // Local up: where one unit of elevation moves the sample
            let model_one = input.master.local_to_model(ndc + DVec3::Z);
            normals.push((model_one - model).normalize_or_zero().as_vec3());
        }
    }

    let body_vertex_count = vertices.len();
    let swap_orientation = !input.master.orientation_open_gl();
    let recalc_normals = input.elevation.is_some();

    let mut triangles = Primitive::new(PrimitiveMode::Triangles);
    triangles.indices.reserve((rows - 1) * (columns - 1) * 6);

    let up_normals = if recalc_normals {
        Some(std::mem::replace(&mut normals, vec![Vec3::ZERO; body_vertex_count]))
    } else {
        None
    };

    {
        let mut emit = |a: u32, b: u32, c: u32| {
            triangles.indices.extend_from_slice(&[a, b, c]);
            if recalc_normals {
                let va = vertices[a as usize];
                let face = (vertices[b as usize] - va).cross(vertices[c as usize] - va);
                normals[a as usize] += face;
                normals[b as usize] += face;
                normals[c as usize] += face;
            }
        };

        for row in 0..rows - 1 {
            for column in 0..columns - 1 {
                let (c00, c01) = if swap_orientation {
                    let lower = row * columns + column;
                    (lower + columns, lower)
                } else {
                    let lower = row * columns + column;
                    (lower, lower + columns)
                };
                let (c10, c11) = (c00 + 1, c01 + 1);

                let corners = (
                    grid_indices[c00],
                    grid_indices[c01],
                    grid_indices[c10],
                    grid_indices[c11],
                );

                match corners {
                    (Some(i00), Some(i01), Some(i10), Some(i11)) => {
                        let e00 = elevations[i00 as usize];
                        let e01 = elevations[i01 as usize];
                        let e10 = elevations[i10 as usize];
                        let e11 = elevations[i11 as usize];

                        if (e00 - e11).abs() < (e01 - e10).abs() {
                            emit(i01, i00, i11);
                            emit(i00, i10, i11);
                        } else {
                            emit(i01, i00, i10);
                            emit(i01, i10, i11);
                        }
                    }
                    (i00, i01, i10, i11) => {
                        // Walk 10, 11, 01, 00 so the triangle winds like the full quad
                        let valid: Vec<u32> = [i10, i11, i01, i00].into_iter().flatten().collect();
                        if let &[a, b, c] = valid.as_slice() {
                            emit(a, b, c);
                        }
                    }
                }
            }
        }
    }

    if let Some(up_normals) = up_normals {
        for (normal, up) in normals.iter_mut().zip(up_normals) {
            // Vertices outside every triangle keep their local up vector
            *normal = normal.try_normalize().unwrap_or(up);
        }
    }

    let mut primitives = vec![triangles];
    let mut skirt_vertices = Vec::new();

    if create_skirt {
        let mut skirt_of_cell: Vec<Option<u32>> = vec![None; body_capacity];

        // Counter-clockwise around the tile starting at the south-west corner
        let sides: [Vec<usize>; 4] = [
            (0..columns).collect(),
            (0..rows).map(|r| r * columns + columns - 1).collect(),
            (0..columns).rev().map(|c| (rows - 1) * columns + c).collect(),
            (0..rows).rev().map(|r| r * columns).collect(),
        ];

        for side in sides {
            let mut strip = Primitive::new(PrimitiveMode::TriangleStrip);
            for cell in side {
                let Some(source) = grid_indices[cell] else {
                    // A hole ends the current strip; none spans it
                    if !strip.indices.is_empty() {
                        let fresh = Primitive::new(PrimitiveMode::TriangleStrip);
                        primitives.push(std::mem::replace(&mut strip, fresh));
                    }
                    continue;
                };

                let skirt = match skirt_of_cell[cell] {
                    Some(skirt) => skirt,
                    None => {
                        let skirt = vertices.len() as u32;
                        let normal = normals[source as usize];
                        vertices.push(vertices[source as usize] - normal * skirt_height);
                        normals.push(normal);
                        for coords in tex_coords.iter_mut() {
                            coords.push(coords[source as usize]);
                        }
                        skirt_vertices.push(SkirtVertex {
                            cell,
                            source,
                            vertex: skirt,
                        });
                        skirt_of_cell[cell] = Some(skirt);
                        skirt
                    }
                };

                strip.indices.push(source);
                strip.indices.push(skirt);
            }
            if !strip.indices.is_empty() {
                primitives.push(strip);
            }
        }
    }

    TerrainGeometry {
        columns,
        rows,
        vertices,
        normals,
        tex_coords,
        tex_coord_slots: tex_plan.slots().to_vec(),
        colors: vec![Vec4::ONE],
        primitives,
        grid_indices,
        skirt_vertices,
        body_vertex_count,
    }
}

/// Reposition vertices in place from the current elevation data
///
/// Skirt vertices are offset along the normals carried over from the last
/// full generation. Returns `false` when the sampling grid no longer matches
/// the geometry, in which case a full regeneration is required.
pub fn update(geometry: &mut TerrainGeometry, input: &MeshInput<'_>) -> bool {
    let plan = input.plan;
    if plan.columns != geometry.columns || plan.rows != geometry.rows {
        tracing::warn!(
            geometry_columns = geometry.columns,
            geometry_rows = geometry.rows,
            plan_columns = plan.columns,
            plan_rows = plan.rows,
            "Sampling grid changed; incremental update not possible"
        );
        return false;
    }

    if input.elevation.is_none() {
        return true;
    }

    let skirt_height = input.skirt_height();
    let move_skirt = geometry.has_skirt() && skirt_height > 0.0;

    let mut skirt_of_cell: Vec<Option<u32>> = vec![None; plan.cell_count()];
    if move_skirt {
        for skirt in &geometry.skirt_vertices {
            skirt_of_cell[skirt.cell] = Some(skirt.vertex);
        }
    }

    for row in 0..plan.rows {
        for column in 0..plan.columns {
            let cell = row * plan.columns + column;
            let Some(vertex) = geometry.grid_indices[cell] else {
                continue;
            };
            let Some(ndc) = input.cell_ndc(column, row) else {
                continue;
            };

            let model = input.master.local_to_model(ndc);
            geometry.vertices[vertex as usize] = (model - input.center).as_vec3();

            if let Some(skirt) = skirt_of_cell[cell] {
                let normal = geometry.normals[vertex as usize].as_dvec3();
                let skirt_model = model - normal * skirt_height as f64;
                geometry.vertices[skirt as usize] = (skirt_model - input.center).as_vec3();
            }
        }
    }

    true
}
