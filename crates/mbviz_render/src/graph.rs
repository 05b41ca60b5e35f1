//! Persistent render graph
//!
//! The graph is built once by [`SceneSync::bind`](crate::SceneSync::bind) and
//! afterwards only has its node transforms rewritten. Nodes are partitioned
//! into fixed [`SceneGroup`]s for traversal and visibility toggling; the
//! groups do not own anything.
//!
//! Back-references from a node to the entity and shape instance it draws are
//! kept in a typed side table ([`NodeBinding`]) rather than on the node, so a
//! stale reference is a plain lookup miss.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bitflags::bitflags;
use glam::DMat4;
use mbviz_core::{BodyKey, CloudKey, EntityRef, Frame, MaterialKey, ShapeInstanceId};
use mbviz_math::NodeTransform;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::MeshGeometry;

new_key_type! {
    /// Key to a node in the render graph
    pub struct NodeKey;
    /// Key to mesh geometry held by the render graph
    pub struct GeometryKey;
}

/// Top-level partition of render nodes by role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneGroup {
    Bodies,
    CentersOfMass,
    Links,
    Particles,
    Decorations,
}

impl SceneGroup {
    /// All groups in traversal order
    pub const ALL: [SceneGroup; 5] = [
        SceneGroup::Bodies,
        SceneGroup::CentersOfMass,
        SceneGroup::Links,
        SceneGroup::Particles,
        SceneGroup::Decorations,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Visibility flag of this group
    pub fn mask(self) -> GroupMask {
        match self {
            SceneGroup::Bodies => GroupMask::BODIES,
            SceneGroup::CentersOfMass => GroupMask::CENTERS_OF_MASS,
            SceneGroup::Links => GroupMask::LINKS,
            SceneGroup::Particles => GroupMask::PARTICLES,
            SceneGroup::Decorations => GroupMask::DECORATIONS,
        }
    }
}

bitflags! {
    /// Set of visible scene groups
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct GroupMask: u8 {
        const BODIES = 1 << 0;
        const CENTERS_OF_MASS = 1 << 1;
        const LINKS = 1 << 2;
        const PARTICLES = 1 << 3;
        const DECORATIONS = 1 << 4;
    }
}

impl Default for GroupMask {
    fn default() -> Self {
        GroupMask::all()
    }
}

/// Shared unit assets a node can instance
///
/// Each asset is authored at unit size; the node scale stretches it. See
/// [`SceneSync`](crate::SceneSync) for the per-shape conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Cube spanning [-1, 1] on every axis
    Box,
    /// Textured cube used for boxes with a cube texture
    Dice,
    /// Unit sphere
    Sphere,
    /// Radius 1, height 1 along +Y, centered
    Cylinder,
    /// Cylinder part of half-length 1 along +Y with unit caps
    Capsule,
    /// Unit cone along +Y
    Cone,
    /// Unit segment along +Y, centered
    Segment,
    /// Unit coil along +Y, centered
    SpringCoil,
    /// Unit sphere shared by all particles
    Particle,
    /// Axis triad marking a center of mass
    CogSymbol,
}

/// What a node draws
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeGeometry {
    Primitive(Primitive),
    Mesh(GeometryKey),
    /// Waiting for a background load of the mesh with this path hash
    PendingMesh(u64),
    /// The background load failed
    Missing,
}

/// A node of the render graph
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode {
    pub group: SceneGroup,
    pub geometry: NodeGeometry,
    /// Material of the shape, None when the default was used
    pub material: Option<MaterialKey>,
    /// Resolved diffuse color
    pub color: [f32; 3],
    /// World matrix: translate * rotate * scale
    pub transform: DMat4,
    pub wireframe: bool,
}

/// Back-reference from a node to what it represents
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeBinding {
    /// A shape instance in the visual model of a body or link
    Shape {
        entity: EntityRef,
        instance: ShapeInstanceId,
    },
    /// The center-of-mass symbol of a body
    CenterOfMass { body: BodyKey, symbol_size: f64 },
    /// One particle of a cloud
    Particle { cloud: CloudKey, index: usize },
}

impl NodeBinding {
    /// The entity this binding points at
    pub fn entity(&self) -> EntityRef {
        match *self {
            NodeBinding::Shape { entity, .. } => entity,
            NodeBinding::CenterOfMass { body, .. } => EntityRef::Body(body),
            NodeBinding::Particle { cloud, .. } => EntityRef::Cloud(cloud),
        }
    }
}

/// Decorative line grid
#[derive(Clone, Debug, PartialEq)]
pub struct DecoGrid {
    /// Cell width along the grid's local X
    pub u_step: f64,
    /// Cell height along the grid's local Y
    pub v_step: f64,
    pub nu: u32,
    pub nv: u32,
    /// Placement of the grid center
    pub frame: Frame,
    pub color: [f32; 3],
}

/// One entry of a [`TopologySignature`]
pub type TopologyEntry = (SceneGroup, NodeKey, Option<NodeBinding>);

/// Snapshot of graph structure, transform-independent
pub type TopologySignature = Vec<TopologyEntry>;

/// The render graph
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, RenderNode>,
    geometries: SlotMap<GeometryKey, Arc<MeshGeometry>>,
    /// Geometry interned per mesh path hash
    mesh_index: HashMap<u64, GeometryKey>,
    groups: [Vec<NodeKey>; 5],
    bindings: SecondaryMap<NodeKey, NodeBinding>,
    /// Particle nodes per cloud, in particle order, captured at bind
    clouds: SecondaryMap<CloudKey, Vec<NodeKey>>,
    /// Path hashes of meshes still being loaded in the background
    pending: HashSet<u64>,
    /// Entities whose skipped updates were already logged at warn level
    reported: HashSet<EntityRef>,
    visible: GroupMask,
}

impl SceneGraph {
    /// Create an empty graph with all groups visible
    pub fn new() -> Self {
        Self::default()
    }

    // --- construction (bind only) ---

    pub(crate) fn add_node(&mut self, node: RenderNode, binding: Option<NodeBinding>) -> NodeKey {
        let group = node.group;
        if let NodeGeometry::PendingMesh(hash) = node.geometry {
            self.pending.insert(hash);
        }
        let key = self.nodes.insert(node);
        self.groups[group.index()].push(key);
        if let Some(binding) = binding {
            self.bindings.insert(key, binding);
        }
        key
    }

    /// Add per-instance geometry
    pub(crate) fn add_geometry(&mut self, mesh: MeshGeometry) -> GeometryKey {
        self.geometries.insert(Arc::new(mesh))
    }

    /// Geometry for a cached mesh file, shared by every node using that file
    pub(crate) fn intern_mesh(&mut self, hash: u64, mesh: Arc<MeshGeometry>) -> GeometryKey {
        if let Some(&key) = self.mesh_index.get(&hash) {
            return key;
        }
        let key = self.geometries.insert(mesh);
        self.mesh_index.insert(hash, key);
        key
    }

    pub(crate) fn record_cloud(&mut self, cloud: CloudKey, nodes: Vec<NodeKey>) {
        self.clouds.insert(cloud, nodes);
    }

    /// Add a decoration grid; never touched by updates
    pub fn add_deco_grid(&mut self, grid: &DecoGrid) -> NodeKey {
        let geometry = self.add_geometry(MeshGeometry::grid_lines(grid.u_step, grid.v_step, grid.nu, grid.nv));
        let node = RenderNode {
            group: SceneGroup::Decorations,
            geometry: NodeGeometry::Mesh(geometry),
            material: None,
            color: grid.color,
            transform: NodeTransform::from_frame(&grid.frame, glam::DVec3::ONE).to_matrix(),
            wireframe: false,
        };
        self.add_node(node, None)
    }

    // --- update support ---

    /// Split borrows for an update pass: bindings and cloud records are read,
    /// nodes are written
    #[allow(clippy::type_complexity)]
    pub(crate) fn update_view(
        &mut self,
    ) -> (
        &SecondaryMap<NodeKey, NodeBinding>,
        &SecondaryMap<CloudKey, Vec<NodeKey>>,
        &mut SlotMap<NodeKey, RenderNode>,
        &mut HashSet<EntityRef>,
    ) {
        (&self.bindings, &self.clouds, &mut self.nodes, &mut self.reported)
    }

    /// Whether skipped updates of `entity` were already logged at warn level
    pub fn is_reported(&self, entity: EntityRef) -> bool {
        self.reported.contains(&entity)
    }

    /// Mesh hashes that still have pending nodes
    pub fn pending_meshes(&self) -> impl Iterator<Item = u64> + '_ {
        self.pending.iter().copied()
    }

    /// Point every node waiting on `hash` at its geometry, or mark it missing
    ///
    /// Returns the number of nodes patched.
    pub(crate) fn resolve_pending(&mut self, hash: u64, mesh: Option<Arc<MeshGeometry>>) -> usize {
        if !self.pending.remove(&hash) {
            return 0;
        }
        let geometry = match mesh {
            Some(mesh) => NodeGeometry::Mesh(self.intern_mesh(hash, mesh)),
            None => NodeGeometry::Missing,
        };

        let mut patched = 0;
        for node in self.nodes.values_mut() {
            if node.geometry == NodeGeometry::PendingMesh(hash) {
                node.geometry = geometry;
                patched += 1;
            }
        }
        patched
    }

    // --- queries ---

    /// Total number of nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in a group
    pub fn group_len(&self, group: SceneGroup) -> usize {
        self.groups[group.index()].len()
    }

    /// Nodes of a group in insertion order
    pub fn children(&self, group: SceneGroup) -> &[NodeKey] {
        &self.groups[group.index()]
    }

    pub fn node(&self, key: NodeKey) -> Option<&RenderNode> {
        self.nodes.get(key)
    }

    /// Back-reference of a node (None for decorations)
    pub fn binding(&self, key: NodeKey) -> Option<&NodeBinding> {
        self.bindings.get(key)
    }

    pub fn transform(&self, key: NodeKey) -> Option<DMat4> {
        self.nodes.get(key).map(|n| n.transform)
    }

    /// Mesh geometry referenced by a node
    pub fn geometry(&self, key: GeometryKey) -> Option<&MeshGeometry> {
        self.geometries.get(key).map(|g| g.as_ref())
    }

    /// Number of distinct geometries held by the graph
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Particle nodes recorded for a cloud at bind time
    pub fn cloud_nodes(&self, cloud: CloudKey) -> Option<&[NodeKey]> {
        self.clouds.get(cloud).map(|v| v.as_slice())
    }

    /// All nodes bound to an entity
    pub fn nodes_of(&self, entity: EntityRef) -> Vec<NodeKey> {
        self.bindings
            .iter()
            .filter(|(_, b)| b.entity() == entity)
            .map(|(k, _)| k)
            .collect()
    }

    /// Group membership and bindings of every node, in group order
    ///
    /// Two signatures are equal iff the graph structure is unchanged.
    pub fn topology_signature(&self) -> TopologySignature {
        SceneGroup::ALL
            .iter()
            .flat_map(|&group| {
                self.children(group)
                    .iter()
                    .map(move |&key| (group, key, self.bindings.get(key).copied()))
            })
            .collect()
    }

    // --- visibility ---

    pub fn visible_groups(&self) -> GroupMask {
        self.visible
    }

    pub fn set_group_visible(&mut self, group: SceneGroup, visible: bool) {
        self.visible.set(group.mask(), visible);
    }

    pub fn is_group_visible(&self, group: SceneGroup) -> bool {
        self.visible.contains(group.mask())
    }

    /// Nodes of all visible groups, in group order
    pub fn visible_nodes(&self) -> impl Iterator<Item = (NodeKey, &RenderNode)> + '_ {
        SceneGroup::ALL
            .iter()
            .filter(move |g| self.is_group_visible(**g))
            .flat_map(move |&g| self.children(g).iter())
            .filter_map(move |&k| self.nodes.get(k).map(|n| (k, n)))
    }

    // --- removal ---

    /// Remove every node bound to `entity`
    ///
    /// This is the only way nodes leave the graph. Geometry stays allocated.
    /// Returns the number of nodes removed.
    pub fn remove_entity(&mut self, entity: EntityRef) -> usize {
        let doomed = self.nodes_of(entity);
        for &key in &doomed {
            if let Some(node) = self.nodes.remove(key) {
                self.groups[node.group.index()].retain(|k| *k != key);
            }
            self.bindings.remove(key);
        }
        if let EntityRef::Cloud(cloud) = entity {
            self.clouds.remove(cloud);
        }
        self.reported.remove(&entity);
        if !doomed.is_empty() {
            log::info!("Removed {} render nodes of {:?}", doomed.len(), entity);
        }
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use slotmap::SlotMap;

    fn node(group: SceneGroup) -> RenderNode {
        RenderNode {
            group,
            geometry: NodeGeometry::Primitive(Primitive::Box),
            material: None,
            color: [1.0, 1.0, 1.0],
            transform: DMat4::IDENTITY,
            wireframe: false,
        }
    }

    #[test]
    fn test_groups_partition_nodes() {
        let mut bodies: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let body = bodies.insert(());

        let mut graph = SceneGraph::new();
        let shape = graph.add_node(
            node(SceneGroup::Bodies),
            Some(NodeBinding::Shape {
                entity: EntityRef::Body(body),
                instance: ShapeInstanceId(0),
            }),
        );
        let cog = graph.add_node(
            node(SceneGroup::CentersOfMass),
            Some(NodeBinding::CenterOfMass { body, symbol_size: 0.1 }),
        );

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.children(SceneGroup::Bodies), &[shape]);
        assert_eq!(graph.children(SceneGroup::CentersOfMass), &[cog]);
        assert_eq!(graph.group_len(SceneGroup::Links), 0);
        assert_eq!(graph.nodes_of(EntityRef::Body(body)).len(), 2);
    }

    #[test]
    fn test_remove_entity() {
        let mut bodies: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let a = bodies.insert(());
        let b = bodies.insert(());

        let mut graph = SceneGraph::new();
        for body in [a, b] {
            graph.add_node(
                node(SceneGroup::Bodies),
                Some(NodeBinding::Shape {
                    entity: EntityRef::Body(body),
                    instance: ShapeInstanceId(0),
                }),
            );
        }

        assert_eq!(graph.remove_entity(EntityRef::Body(a)), 1);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.group_len(SceneGroup::Bodies), 1);
        assert_eq!(graph.remove_entity(EntityRef::Body(a)), 0);
    }

    #[test]
    fn test_visibility_mask() {
        let mut graph = SceneGraph::new();
        graph.add_node(node(SceneGroup::Bodies), None);
        graph.add_node(node(SceneGroup::CentersOfMass), None);
        assert_eq!(graph.visible_groups(), GroupMask::all());

        graph.set_group_visible(SceneGroup::CentersOfMass, false);
        assert!(!graph.is_group_visible(SceneGroup::CentersOfMass));
        assert_eq!(graph.visible_nodes().count(), 1);

        graph.set_group_visible(SceneGroup::CentersOfMass, true);
        assert_eq!(graph.visible_nodes().count(), 2);
    }

    #[test]
    fn test_deco_grid() {
        let mut graph = SceneGraph::new();
        let key = graph.add_deco_grid(&DecoGrid {
            u_step: 0.5,
            v_step: 0.5,
            nu: 10,
            nv: 10,
            frame: Frame::from_position(DVec3::new(0.0, -1.0, 0.0)),
            color: [0.3, 0.3, 0.3],
        });

        assert_eq!(graph.group_len(SceneGroup::Decorations), 1);
        assert!(graph.binding(key).is_none());
        let t = graph.transform(key).unwrap();
        assert!(t.w_axis.truncate().abs_diff_eq(DVec3::new(0.0, -1.0, 0.0), 1e-12));
        match graph.node(key).unwrap().geometry {
            NodeGeometry::Mesh(g) => assert_eq!(graph.geometry(g).unwrap().indices.len(), 22 * 2),
            other => panic!("Expected Mesh, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_pending() {
        let mut graph = SceneGraph::new();
        let mut pending = node(SceneGroup::Bodies);
        pending.geometry = NodeGeometry::PendingMesh(5);
        let a = graph.add_node(pending.clone(), None);
        let b = graph.add_node(pending, None);
        assert_eq!(graph.pending_meshes().collect::<Vec<_>>(), vec![5]);

        let mesh = Arc::new(MeshGeometry::polyline(&[DVec3::ZERO, DVec3::X], false));
        assert_eq!(graph.resolve_pending(5, Some(mesh)), 2);
        assert_eq!(graph.node(a).unwrap().geometry, graph.node(b).unwrap().geometry);
        assert_eq!(graph.geometry_count(), 1);
        assert_eq!(graph.resolve_pending(5, None), 0);
    }

    #[test]
    fn test_resolve_pending_failure() {
        let mut graph = SceneGraph::new();
        let mut pending = node(SceneGroup::Bodies);
        pending.geometry = NodeGeometry::PendingMesh(9);
        let a = graph.add_node(pending, None);

        graph.resolve_pending(9, None);
        assert_eq!(graph.node(a).unwrap().geometry, NodeGeometry::Missing);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_topology_signature_ignores_transforms() {
        let mut graph = SceneGraph::new();
        let key = graph.add_node(node(SceneGroup::Bodies), None);
        let before = graph.topology_signature();

        let (_, _, nodes, _) = graph.update_view();
        nodes[key].transform = DMat4::from_translation(DVec3::X);

        assert_eq!(graph.topology_signature(), before);
    }
}
