//! Scene synchronizer
//!
//! [`SceneSync::bind`] walks the world once and builds a [`SceneGraph`] with
//! one node per visible shape instance, center-of-mass symbol and particle.
//! [`SceneSync::update`] then runs every frame and only rewrites node
//! transforms, recovering what each node draws from its [`NodeBinding`].
//!
//! # Base asset conventions
//!
//! | Shape | Asset | Scale |
//! |---|---|---|
//! | box | cube spanning [-1, 1] | half-lengths |
//! | sphere, ellipsoid | unit sphere | radii |
//! | cylinder | radius 1, height 1 along +Y | (r, h, r) |
//! | capsule | half-length 1 along +Y, unit caps | (r, half_length, r) |
//! | cone | unit cone along +Y | radii |
//! | triangle mesh, OBJ | the mesh itself | stored scale |
//! | line, path, surface | the geometry itself | 1 |
//! | segment | unit segment along +Y | (1, h, 1) |
//! | spring | unit coil along +Y | (r, h, r) |
//! | particle | unit sphere | particle radius |
//! | center of mass | unit triad | symbol size |
//!
//! Cylinders, capsules and link shapes get their orientation from their two
//! end points, not from the shape frame: the rotation maps the asset's +Y
//! onto P1 -> P2.

use std::collections::HashSet;

use glam::{DMat4, DVec3};
use mbviz_core::{
    Body, CloudKey, EntityRef, Frame, ParticleCloud, ShapeGeometry, ShapeInstanceId, VisualMaterial,
    VisualModel, VisualShape, World,
};
use mbviz_math::{NodeTransform, TwoPointGeometry};

use crate::graph::{NodeBinding, NodeGeometry, Primitive, RenderNode, SceneGraph, SceneGroup};
use crate::mesh_cache::path_hash;
use crate::{MeshCache, MeshGeometry, MeshLoader, NodeKey};

/// Synchronizer settings
#[derive(Clone, Debug, PartialEq)]
pub struct SyncParams {
    /// Size of the center-of-mass symbols; 0 disables them
    pub cog_symbol_size: f64,
    /// Draw shapes as wireframe
    pub wireframe: bool,
    /// Load OBJ files on a background thread
    pub async_mesh_loading: bool,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            cog_symbol_size: 0.0,
            wireframe: false,
            async_mesh_loading: false,
        }
    }
}

/// Counters for one update pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Nodes whose transform was rewritten
    pub updated: usize,
    /// Nodes skipped because their entity or shape instance is gone
    pub skipped_stale: usize,
    /// Particle clouds skipped because their particle count changed
    pub skipped_clouds: usize,
    /// Background mesh loads merged at the start of the pass
    pub merged_meshes: usize,
}

/// Builds the render graph and keeps it in sync with the world
pub struct SceneSync {
    params: SyncParams,
    cache: MeshCache,
    loader: Option<MeshLoader>,
    /// Mesh files that failed to load; never retried
    failed_meshes: HashSet<u64>,
    frame_number: u64,
}

impl SceneSync {
    pub fn new(params: SyncParams) -> Self {
        let loader = params.async_mesh_loading.then(MeshLoader::new);
        Self {
            params,
            cache: MeshCache::new(),
            loader,
            failed_meshes: HashSet::new(),
            frame_number: 0,
        }
    }

    pub fn params(&self) -> &SyncParams {
        &self.params
    }

    /// The mesh cache shared by every graph this synchronizer binds
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Number of update passes run so far
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Background mesh loads not yet merged
    pub fn pending_mesh_loads(&self) -> usize {
        self.loader.as_ref().map_or(0, |l| l.in_flight())
    }

    /// Build the render graph for the current world
    ///
    /// Entities without a visual model, invisible shapes, unsupported shapes
    /// and meshes that fail to load are skipped with a log message; binding
    /// itself cannot fail.
    pub fn bind(&mut self, world: &World) -> SceneGraph {
        let mut graph = SceneGraph::new();
        if world.is_empty() {
            log::info!("Binding empty world");
            return graph;
        }

        for (key, body) in world.bodies() {
            if self.params.cog_symbol_size > 0.0 {
                let size = self.params.cog_symbol_size;
                let node = self.new_node(
                    SceneGroup::CentersOfMass,
                    NodeGeometry::Primitive(Primitive::CogSymbol),
                    None,
                    [1.0, 1.0, 1.0],
                    cog_transform(body, size),
                );
                graph.add_node(node, Some(NodeBinding::CenterOfMass { body: key, symbol_size: size }));
            }

            match &body.visual_model {
                Some(model) => self.bind_model(&mut graph, world, EntityRef::Body(key), model),
                None => log::warn!("Body {} has no visual model, skipped", describe_body(body, key)),
            }
        }

        for (key, link) in world.links() {
            let Some(model) = &link.visual_model else {
                log::debug!("Link {:?} has no visual model, skipped", key);
                continue;
            };
            if world.link_endpoints(key).is_none() {
                log::warn!("Link {:?} references a missing body, visual model skipped", key);
                continue;
            }
            self.bind_model(&mut graph, world, EntityRef::Link(key), model);
        }

        for (key, cloud) in world.clouds() {
            match &cloud.visual_model {
                Some(model) => self.bind_cloud(&mut graph, world, key, cloud, model),
                None => log::warn!("Particle cloud {:?} has no visual model, skipped", key),
            }
        }

        log::info!(
            "Bound render graph: {} nodes ({} bodies, {} centers of mass, {} links, {} particles), {} cached meshes",
            graph.node_count(),
            graph.group_len(SceneGroup::Bodies),
            graph.group_len(SceneGroup::CentersOfMass),
            graph.group_len(SceneGroup::Links),
            graph.group_len(SceneGroup::Particles),
            self.cache.len()
        );
        graph
    }

    fn bind_model(&mut self, graph: &mut SceneGraph, world: &World, entity: EntityRef, model: &VisualModel) {
        let group = match entity {
            EntityRef::Link(_) => SceneGroup::Links,
            _ => SceneGroup::Bodies,
        };

        for (id, instance) in model.iter() {
            let Some(shape) = world.shape(instance.shape) else {
                log::warn!("{:?} references a missing shape, skipped", entity);
                continue;
            };
            if !shape.visible {
                log::debug!("Invisible {} on {:?} skipped", shape.kind(), entity);
                continue;
            }
            let Some(transform) = instance_transform(world, entity, id) else {
                log::warn!("Unsupported {} shape on {:?}, skipped", shape.kind(), entity);
                continue;
            };
            let Some(geometry) = self.shape_geometry(graph, world, shape) else {
                continue;
            };

            let (material, color) = resolve_material(world, shape);
            let node = self.new_node(group, geometry, material, color, transform);
            graph.add_node(node, Some(NodeBinding::Shape { entity, instance: id }));
            log::debug!("Bound {} of {:?}", shape.kind(), entity);
        }
    }

    fn bind_cloud(
        &mut self,
        graph: &mut SceneGraph,
        world: &World,
        key: CloudKey,
        cloud: &ParticleCloud,
        model: &VisualModel,
    ) {
        // Particles share one pattern; the first shape only contributes its material
        let (material, color) = model
            .iter()
            .next()
            .and_then(|(_, inst)| world.shape(inst.shape))
            .map(|shape| resolve_material(world, shape))
            .unwrap_or((None, VisualMaterial::default_white().diffuse));

        let mut nodes: Vec<NodeKey> = Vec::with_capacity(cloud.particle_count());
        for index in 0..cloud.particle_count() {
            let Some(transform) = particle_transform(cloud, index) else {
                continue;
            };
            let node = self.new_node(
                SceneGroup::Particles,
                NodeGeometry::Primitive(Primitive::Particle),
                material,
                color,
                transform,
            );
            nodes.push(graph.add_node(node, Some(NodeBinding::Particle { cloud: key, index })));
        }
        log::info!("Bound particle cloud {:?} with {} particles", key, nodes.len());
        graph.record_cloud(key, nodes);
    }

    /// Pick the asset a shape is drawn with, building or loading geometry as needed
    fn shape_geometry(&mut self, graph: &mut SceneGraph, world: &World, shape: &VisualShape) -> Option<NodeGeometry> {
        let built = match &shape.geometry {
            ShapeGeometry::Box { .. } => {
                let dice = shape
                    .primary_material()
                    .and_then(|m| world.material(m))
                    .is_some_and(|m| m.is_cube_texture());
                let primitive = if dice { Primitive::Dice } else { Primitive::Box };
                return Some(NodeGeometry::Primitive(primitive));
            }
            ShapeGeometry::Sphere { .. } | ShapeGeometry::Ellipsoid { .. } => {
                return Some(NodeGeometry::Primitive(Primitive::Sphere))
            }
            ShapeGeometry::Cylinder { .. } => return Some(NodeGeometry::Primitive(Primitive::Cylinder)),
            ShapeGeometry::Capsule { .. } => return Some(NodeGeometry::Primitive(Primitive::Capsule)),
            ShapeGeometry::Cone { .. } => return Some(NodeGeometry::Primitive(Primitive::Cone)),
            ShapeGeometry::Segment => return Some(NodeGeometry::Primitive(Primitive::Segment)),
            ShapeGeometry::Spring { .. } => return Some(NodeGeometry::Primitive(Primitive::SpringCoil)),
            ShapeGeometry::Barrel { .. } => return None,
            ShapeGeometry::ObjFile { path, .. } => return self.obj_geometry(graph, path),
            ShapeGeometry::TriangleMesh { vertices, indices, .. } => {
                MeshGeometry::from_triangles(vertices, indices)
            }
            ShapeGeometry::Surface { nu, nv, points } => MeshGeometry::from_surface(*nu, *nv, points),
            ShapeGeometry::Line { points } => Ok(MeshGeometry::polyline(points, false)),
            ShapeGeometry::Path { points, closed } => Ok(MeshGeometry::polyline(points, *closed)),
        };

        match built {
            Ok(mesh) => Some(NodeGeometry::Mesh(graph.add_geometry(mesh))),
            Err(e) => {
                log::warn!("Invalid {} geometry, skipped: {}", shape.kind(), e);
                None
            }
        }
    }

    fn obj_geometry(&mut self, graph: &mut SceneGraph, path: &std::path::Path) -> Option<NodeGeometry> {
        let hash = path_hash(path);
        if self.failed_meshes.contains(&hash) {
            log::debug!("Mesh {} failed to load earlier, skipped", path.display());
            return None;
        }
        if let Some(mesh) = self.cache.get(hash) {
            return Some(NodeGeometry::Mesh(graph.intern_mesh(hash, mesh)));
        }

        if let Some(loader) = self.loader.as_mut() {
            loader.request(hash, path);
            return Some(NodeGeometry::PendingMesh(hash));
        }

        match self.cache.get_or_load(path) {
            Ok(mesh) => Some(NodeGeometry::Mesh(graph.intern_mesh(hash, mesh))),
            Err(e) => {
                log::warn!("Failed to load mesh {}, shape skipped: {}", path.display(), e);
                self.failed_meshes.insert(hash);
                None
            }
        }
    }

    fn new_node(
        &self,
        group: SceneGroup,
        geometry: NodeGeometry,
        material: Option<mbviz_core::MaterialKey>,
        color: [f32; 3],
        transform: DMat4,
    ) -> RenderNode {
        RenderNode {
            group,
            geometry,
            material,
            color,
            transform,
            wireframe: self.params.wireframe && group != SceneGroup::CentersOfMass,
        }
    }

    /// Refresh every node transform from the current world state
    ///
    /// Never adds or removes nodes. Completed background mesh loads are merged
    /// first, before any node is visited.
    pub fn update(&mut self, graph: &mut SceneGraph, world: &World) -> UpdateStats {
        self.frame_number += 1;
        let mut stats = UpdateStats {
            merged_meshes: self.merge_loaded_meshes(graph),
            ..Default::default()
        };

        let (bindings, clouds, nodes, reported) = graph.update_view();

        for (key, binding) in bindings.iter() {
            let transform = match *binding {
                // Particles are updated per cloud below
                NodeBinding::Particle { .. } => continue,
                NodeBinding::CenterOfMass { body, symbol_size } => {
                    world.body(body).map(|b| cog_transform(b, symbol_size))
                }
                NodeBinding::Shape { entity, instance } => instance_transform(world, entity, instance),
            };

            match (transform, nodes.get_mut(key)) {
                (Some(transform), Some(node)) => {
                    node.transform = transform;
                    stats.updated += 1;
                }
                _ => {
                    if reported.insert(binding.entity()) {
                        log::warn!("Stale render node {:?} ({:?}), not updated", key, binding);
                    } else {
                        log::debug!("Stale render node {:?} ({:?}), not updated", key, binding);
                    }
                    stats.skipped_stale += 1;
                }
            }
        }

        for (cloud_key, cloud_nodes) in clouds.iter() {
            let first_report = reported.insert(EntityRef::Cloud(cloud_key));
            let level = if first_report { log::Level::Warn } else { log::Level::Debug };
            let Some(cloud) = world.cloud(cloud_key) else {
                log::log!(
                    level,
                    "Particle cloud {:?} no longer exists, {} nodes not updated",
                    cloud_key,
                    cloud_nodes.len()
                );
                stats.skipped_stale += cloud_nodes.len();
                continue;
            };
            if cloud.particle_count() != cloud_nodes.len() {
                log::log!(
                    level,
                    "Ill-shaped particle graph for cloud {:?}: {} particles, {} nodes; not updated",
                    cloud_key,
                    cloud.particle_count(),
                    cloud_nodes.len()
                );
                stats.skipped_clouds += 1;
                continue;
            }
            // Healthy again, so a later mismatch is reported afresh
            reported.remove(&EntityRef::Cloud(cloud_key));

            for (index, &key) in cloud_nodes.iter().enumerate() {
                match (particle_transform(cloud, index), nodes.get_mut(key)) {
                    (Some(transform), Some(node)) => {
                        node.transform = transform;
                        stats.updated += 1;
                    }
                    _ => stats.skipped_stale += 1,
                }
            }
        }

        log::trace!("Frame {}: {:?}", self.frame_number, stats);
        stats
    }

    /// Drain finished background loads into the cache and patch pending nodes
    fn merge_loaded_meshes(&mut self, graph: &mut SceneGraph) -> usize {
        let mut merged = 0;
        if let Some(loader) = self.loader.as_mut() {
            for done in loader.poll_all() {
                merged += 1;
                match done.result {
                    Ok(mesh) => {
                        log::info!("Background mesh loaded: {}", done.path.display());
                        self.cache.insert_loaded(done.hash, done.path, mesh);
                    }
                    Err(e) => {
                        log::warn!("Background mesh load failed for {}: {}", done.path.display(), e);
                        self.failed_meshes.insert(done.hash);
                    }
                }
            }
        }

        // Also covers graphs bound before the load finished but merged by another graph
        let pending: Vec<u64> = graph.pending_meshes().collect();
        for hash in pending {
            if let Some(mesh) = self.cache.get(hash) {
                graph.resolve_pending(hash, Some(mesh));
            } else if self.failed_meshes.contains(&hash) {
                graph.resolve_pending(hash, None);
            }
        }
        merged
    }
}

/// World transform of a shape instance, shared by bind and update
///
/// Returns None when the entity, instance or shape no longer exists, or when
/// the shape is not drawable on this kind of entity.
fn instance_transform(world: &World, entity: EntityRef, id: ShapeInstanceId) -> Option<DMat4> {
    match entity {
        EntityRef::Body(key) => {
            let body = world.body(key)?;
            let instance = body.visual_model.as_ref()?.instance(id)?;
            let shape = world.shape(instance.shape)?;
            let frame = body.visual_model_frame().compose(&instance.frame);
            framed_shape_transform(&shape.geometry, &frame)
        }
        EntityRef::Link(key) => {
            let link = world.link(key)?;
            let instance = link.visual_model.as_ref()?.instance(id)?;
            let shape = world.shape(instance.shape)?;
            let (p1, p2) = world.link_endpoints(key)?;
            two_point_shape_transform(&shape.geometry, p1, p2)
        }
        EntityRef::Cloud(_) => None,
    }
}

/// Transform of a shape placed by a frame (body visual models)
fn framed_shape_transform(geometry: &ShapeGeometry, frame: &Frame) -> Option<DMat4> {
    let scale = match geometry {
        ShapeGeometry::Box { half_lengths } => *half_lengths,
        ShapeGeometry::Sphere { radius } => DVec3::splat(*radius),
        ShapeGeometry::Ellipsoid { semi_axes } => *semi_axes,
        ShapeGeometry::Cone { radii } => *radii,
        ShapeGeometry::TriangleMesh { scale, .. } | ShapeGeometry::ObjFile { scale, .. } => *scale,
        ShapeGeometry::Surface { .. } | ShapeGeometry::Line { .. } | ShapeGeometry::Path { .. } => DVec3::ONE,
        ShapeGeometry::Cylinder { radius, p1, p2 } => {
            let axis = axis_geometry(frame, *p1, *p2);
            return Some(axis_transform(&axis, DVec3::new(*radius, axis.height, *radius)));
        }
        ShapeGeometry::Capsule { radius, p1, p2 } => {
            let axis = axis_geometry(frame, *p1, *p2);
            return Some(axis_transform(&axis, DVec3::new(*radius, axis.height * 0.5, *radius)));
        }
        ShapeGeometry::Barrel { .. } | ShapeGeometry::Segment | ShapeGeometry::Spring { .. } => return None,
    };
    Some(NodeTransform::from_frame(frame, scale).to_matrix())
}

/// Transform of a shape spanning two world anchors (link visual models)
fn two_point_shape_transform(geometry: &ShapeGeometry, p1: DVec3, p2: DVec3) -> Option<DMat4> {
    let span = TwoPointGeometry::from_points(p1, p2);
    let scale = match geometry {
        ShapeGeometry::Segment => DVec3::new(1.0, span.height, 1.0),
        ShapeGeometry::Spring { radius, .. } => DVec3::new(*radius, span.height, *radius),
        _ => return None,
    };
    Some(axis_transform(&span, scale))
}

/// Shape-local end points mapped into the world through the shape frame
fn axis_geometry(frame: &Frame, p1: DVec3, p2: DVec3) -> TwoPointGeometry {
    TwoPointGeometry::from_points(frame.transform_point(p1), frame.transform_point(p2))
}

fn axis_transform(axis: &TwoPointGeometry, scale: DVec3) -> DMat4 {
    NodeTransform {
        translation: axis.midpoint,
        rotation: axis.rotation,
        scale,
    }
    .to_matrix()
}

fn cog_transform(body: &Body, symbol_size: f64) -> DMat4 {
    NodeTransform::from_frame(&body.frame, DVec3::splat(symbol_size)).to_matrix()
}

fn particle_transform(cloud: &ParticleCloud, index: usize) -> Option<DMat4> {
    let frame = cloud.particle_frame(index)?;
    Some(DMat4::from_translation(frame.position) * DMat4::from_scale(DVec3::splat(cloud.particle_radius)))
}

/// Material key and diffuse color of a shape, falling back to default white
fn resolve_material(world: &World, shape: &VisualShape) -> (Option<mbviz_core::MaterialKey>, [f32; 3]) {
    let key = shape.primary_material();
    let color = key
        .and_then(|k| world.material(k))
        .map(|m| m.diffuse)
        .unwrap_or(VisualMaterial::default_white().diffuse);
    (key, color)
}

fn describe_body(body: &Body, key: mbviz_core::BodyKey) -> String {
    match &body.name {
        Some(name) => format!("'{}'", name),
        None => format!("{:?}", key),
    }
}
