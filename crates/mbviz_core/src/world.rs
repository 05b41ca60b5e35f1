//! World container for physical entities
//!
//! The World owns the body, particle cloud and link arenas together with the
//! shape and material arenas their visual models refer to.

use glam::DVec3;
use slotmap::SlotMap;

use crate::{
    Body, BodyKey, CloudKey, Link, LinkKey, MaterialKey, ParticleCloud, ShapeKey, VisualMaterial,
    VisualShape,
};

/// Configuration for world stepping
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Gravity acceleration
    pub gravity: DVec3,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: DVec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl WorldConfig {
    /// Create a config with the given gravity vector
    pub fn new(gravity: DVec3) -> Self {
        Self { gravity }
    }
}

/// The world containing all bodies, particle clouds and links
pub struct World {
    bodies: SlotMap<BodyKey, Body>,
    clouds: SlotMap<CloudKey, ParticleCloud>,
    links: SlotMap<LinkKey, Link>,
    shapes: SlotMap<ShapeKey, VisualShape>,
    materials: SlotMap<MaterialKey, VisualMaterial>,
    /// Simulated time in seconds
    time: f64,
    /// Stepping configuration
    pub config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world with default configuration
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a new empty world with custom configuration
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            clouds: SlotMap::with_key(),
            links: SlotMap::with_key(),
            shapes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            time: 0.0,
            config,
        }
    }

    // --- materials and shapes ---

    /// Add a material, returning its key
    pub fn add_material(&mut self, material: VisualMaterial) -> MaterialKey {
        self.materials.insert(material)
    }

    /// Get a material by key
    pub fn material(&self, key: MaterialKey) -> Option<&VisualMaterial> {
        self.materials.get(key)
    }

    /// Add a visual shape, returning its key
    pub fn add_shape(&mut self, shape: VisualShape) -> ShapeKey {
        self.shapes.insert(shape)
    }

    /// Get a shape by key
    pub fn shape(&self, key: ShapeKey) -> Option<&VisualShape> {
        self.shapes.get(key)
    }

    /// Get a mutable shape by key
    pub fn shape_mut(&mut self, key: ShapeKey) -> Option<&mut VisualShape> {
        self.shapes.get_mut(key)
    }

    // --- bodies ---

    /// Add a body, returning its key
    pub fn add_body(&mut self, body: Body) -> BodyKey {
        self.bodies.insert(body)
    }

    /// Get a body by key
    pub fn body(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key)
    }

    /// Get a mutable body by key
    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(key)
    }

    /// Remove a body and every link attached to it
    pub fn remove_body(&mut self, key: BodyKey) -> Option<Body> {
        let body = self.bodies.remove(key)?;
        self.links.retain(|_, link| link.body1 != key && link.body2 != key);
        Some(body)
    }

    /// Find a body by name
    pub fn body_by_name(&self, name: &str) -> Option<BodyKey> {
        self.bodies
            .iter()
            .find(|(_, b)| b.name.as_deref() == Some(name))
            .map(|(k, _)| k)
    }

    /// Iterate over bodies in arena order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &Body)> {
        self.bodies.iter()
    }

    /// Number of bodies
    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // --- particle clouds ---

    /// Add a particle cloud, returning its key
    pub fn add_cloud(&mut self, cloud: ParticleCloud) -> CloudKey {
        self.clouds.insert(cloud)
    }

    /// Get a particle cloud by key
    pub fn cloud(&self, key: CloudKey) -> Option<&ParticleCloud> {
        self.clouds.get(key)
    }

    /// Get a mutable particle cloud by key
    pub fn cloud_mut(&mut self, key: CloudKey) -> Option<&mut ParticleCloud> {
        self.clouds.get_mut(key)
    }

    /// Remove a particle cloud
    pub fn remove_cloud(&mut self, key: CloudKey) -> Option<ParticleCloud> {
        self.clouds.remove(key)
    }

    /// Iterate over particle clouds in arena order
    pub fn clouds(&self) -> impl Iterator<Item = (CloudKey, &ParticleCloud)> {
        self.clouds.iter()
    }

    /// Number of particle clouds
    #[inline]
    pub fn cloud_count(&self) -> usize {
        self.clouds.len()
    }

    // --- links ---

    /// Add a link, returning its key
    ///
    /// The link is accepted even if its bodies are missing; it then has no
    /// endpoints and is skipped by anything that needs them.
    pub fn add_link(&mut self, link: Link) -> LinkKey {
        self.links.insert(link)
    }

    /// Get a link by key
    pub fn link(&self, key: LinkKey) -> Option<&Link> {
        self.links.get(key)
    }

    /// Get a mutable link by key
    pub fn link_mut(&mut self, key: LinkKey) -> Option<&mut Link> {
        self.links.get_mut(key)
    }

    /// Remove a link
    pub fn remove_link(&mut self, key: LinkKey) -> Option<Link> {
        self.links.remove(key)
    }

    /// Iterate over links in arena order
    pub fn links(&self) -> impl Iterator<Item = (LinkKey, &Link)> {
        self.links.iter()
    }

    /// Number of links
    #[inline]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Current world-space anchors of a link
    ///
    /// Returns None if the link or either of its bodies no longer exists.
    pub fn link_endpoints(&self, key: LinkKey) -> Option<(DVec3, DVec3)> {
        let link = self.links.get(key)?;
        let b1 = self.bodies.get(link.body1)?;
        let b2 = self.bodies.get(link.body2)?;
        Some((
            b1.frame.transform_point(link.point1),
            b2.frame.transform_point(link.point2),
        ))
    }

    // --- simulation ---

    /// Simulated time in seconds
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Check if the world has no entities
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() && self.clouds.is_empty() && self.links.is_empty()
    }

    /// Advance every body and particle by `dt` seconds
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        let gravity = self.config.gravity;
        let t = self.time;

        for body in self.bodies.values_mut() {
            body.advance(dt, t, gravity);
        }
        for cloud in self.clouds.values_mut() {
            cloud.advance(dt, gravity);
        }
    }

    /// Remove all entities, shapes and materials and reset time
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.clouds.clear();
        self.links.clear();
        self.shapes.clear();
        self.materials.clear();
        self.time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LinkKind, ShapeGeometry};
    use std::f64::consts::FRAC_PI_2;
    use glam::DQuat;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_world_new() {
        let world = World::new();
        assert!(world.is_empty());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.time(), 0.0);
    }

    #[test]
    fn test_world_add_get_body() {
        let mut world = World::new();
        let key = world.add_body(Body::new(DVec3::new(1.0, 2.0, 3.0)).with_name("crank"));

        assert_eq!(world.body_count(), 1);
        assert_eq!(world.body(key).unwrap().position(), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.body_by_name("crank"), Some(key));
        assert_eq!(world.body_by_name("rod"), None);
    }

    #[test]
    fn test_stale_key_after_removal() {
        let mut world = World::new();
        let key = world.add_body(Body::new(DVec3::ZERO));
        assert!(world.remove_body(key).is_some());

        // Reuse the slot; the old key must not resolve to the new body
        let _other = world.add_body(Body::new(DVec3::X));
        assert!(world.body(key).is_none());
    }

    #[test]
    fn test_remove_body_removes_links() {
        let mut world = World::new();
        let a = world.add_body(Body::new(DVec3::ZERO));
        let b = world.add_body(Body::new(DVec3::X));
        let c = world.add_body(Body::new(DVec3::Y));
        world.add_link(Link::new(LinkKind::Spring, a, DVec3::ZERO, b, DVec3::ZERO));
        let kept = world.add_link(Link::new(LinkKind::Distance, b, DVec3::ZERO, c, DVec3::ZERO));

        world.remove_body(a);
        assert_eq!(world.link_count(), 1);
        assert!(world.link(kept).is_some());
    }

    #[test]
    fn test_link_endpoints() {
        let mut world = World::new();
        let a = world.add_body(Body::new(DVec3::ZERO));
        let b = world.add_body(
            Body::new(DVec3::new(0.0, 0.0, 4.0)).with_rotation(DQuat::from_rotation_z(FRAC_PI_2)),
        );
        let link = world.add_link(Link::new(LinkKind::Spring, a, DVec3::ZERO, b, DVec3::X));

        let (p1, p2) = world.link_endpoints(link).unwrap();
        assert!(p1.abs_diff_eq(DVec3::ZERO, EPSILON));
        assert!(p2.abs_diff_eq(DVec3::new(0.0, 1.0, 4.0), EPSILON));
    }

    #[test]
    fn test_link_endpoints_missing_body() {
        let mut world = World::new();
        let a = world.add_body(Body::new(DVec3::ZERO));
        let b = world.add_body(Body::new(DVec3::X));
        let link = world.add_link(Link::new(LinkKind::Spring, a, DVec3::ZERO, b, DVec3::ZERO));

        // Bypass the cascading removal to simulate a dangling reference
        world.bodies.remove(b);
        assert!(world.link_endpoints(link).is_none());
    }

    #[test]
    fn test_step_advances_time_and_gravity() {
        let mut world = World::with_config(WorldConfig::new(DVec3::new(0.0, -10.0, 0.0)));
        let falling = world.add_body(Body::new(DVec3::ZERO));
        let fixed = world.add_body(Body::new(DVec3::ZERO).with_fixed(true));

        world.step(0.1);
        world.step(0.1);

        assert!((world.time() - 0.2).abs() < EPSILON);
        assert!(world.body(falling).unwrap().position().y < 0.0);
        assert_eq!(world.body(fixed).unwrap().position(), DVec3::ZERO);
    }

    #[test]
    fn test_shapes_and_materials() {
        let mut world = World::new();
        let red = world.add_material(VisualMaterial::from_rgb(1.0, 0.0, 0.0));
        let shape = world.add_shape(VisualShape::new(ShapeGeometry::sphere(0.5)).with_material(red));

        assert_eq!(world.shape(shape).unwrap().primary_material(), Some(red));
        assert_eq!(world.material(red).unwrap().diffuse, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_world_clear() {
        let mut world = World::new();
        world.add_body(Body::new(DVec3::ZERO));
        world.add_cloud(ParticleCloud::new(0.1));
        world.step(1.0);

        world.clear();
        assert!(world.is_empty());
        assert_eq!(world.time(), 0.0);
    }
}
