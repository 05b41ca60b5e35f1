//! SceneBuilder - Declarative scene construction
//!
//! Provides a fluent API for building multibody worlds with visual models,
//! plus the built-in masonry demo.

use std::path::PathBuf;

use mbviz_core::{
    Body, BodyKey, Frame, Link, LinkKind, MaterialKey, ParticleCloud, ShapeGeometry, SineMotion,
    VisualMaterial, VisualModel, VisualShape, World, WorldConfig,
};
use mbviz_math::DVec3;

/// Full size of one masonry brick
pub const BRICK_SIZE: DVec3 = DVec3::new(0.25, 0.12, 0.12);

/// Builder for constructing worlds with visual models
///
/// # Example
/// ```ignore
/// let world = SceneBuilder::new()
///     .with_gravity(DVec3::new(0.0, -9.81, 0.0))
///     .add_floor(-1.0, DVec3::new(3.0, 1.0, 3.0))
///     .add_shaken_table(DVec3::new(0.0, -0.9, 0.0), DVec3::new(1.0, 0.2, 1.0), motion)
///     .add_brick_wall(DVec3::new(0.0, -0.8, 0.0), 6, 3, Some(motion))
///     .build();
/// ```
pub struct SceneBuilder {
    world: World,
    last_body: Option<BodyKey>,
}

impl SceneBuilder {
    /// Create a new scene builder with default gravity
    pub fn new() -> Self {
        Self {
            world: World::new(),
            last_body: None,
        }
    }

    /// Use the given gravity (applies to bodies added afterwards as well)
    pub fn with_gravity(mut self, gravity: DVec3) -> Self {
        self.world.config = WorldConfig::new(gravity);
        self
    }

    fn material(&mut self, name: &str, rgb: [f32; 3]) -> MaterialKey {
        self.world
            .add_material(VisualMaterial::from_rgb(rgb[0], rgb[1], rgb[2]).with_name(name))
    }

    fn model(&mut self, geometry: ShapeGeometry, material: Option<MaterialKey>) -> VisualModel {
        let mut shape = VisualShape::new(geometry);
        if let Some(material) = material {
            shape = shape.with_material(material);
        }
        let key = self.world.add_shape(shape);
        VisualModel::new().with_shape(key, Frame::IDENTITY)
    }

    /// Add a fixed floor slab whose top face is at `y`
    pub fn add_floor(mut self, y: f64, half_lengths: DVec3) -> Self {
        let gray = self.material("floor", [0.5, 0.5, 0.55]);
        let model = self.model(ShapeGeometry::Box { half_lengths }, Some(gray));
        let body = Body::new(DVec3::new(0.0, y - half_lengths.y, 0.0))
            .with_name("floor")
            .with_fixed(true)
            .with_visual_model(model);
        self.last_body = Some(self.world.add_body(body));
        self
    }

    /// Add a table of the given full size driven by a prescribed sine motion
    pub fn add_shaken_table(mut self, position: DVec3, size: DVec3, motion: SineMotion) -> Self {
        let wood = self.material("table", [0.55, 0.35, 0.2]);
        let model = self.model(ShapeGeometry::box_from_size(size), Some(wood));
        let body = Body::new(position)
            .with_name("table")
            .with_motion(motion)
            .with_visual_model(model);
        self.last_body = Some(self.world.add_body(body));
        self
    }

    /// Add a running-bond brick wall whose bottom course is centered at `origin`
    ///
    /// Even courses are gray, odd courses red. Without a contact solver the
    /// bricks cannot rest on anything, so they either share `motion` (riding
    /// the table) or stay fixed.
    pub fn add_brick_wall(
        mut self,
        origin: DVec3,
        rows: usize,
        columns: usize,
        motion: Option<SineMotion>,
    ) -> Self {
        let gray = self.material("brick_gray", [0.6, 0.6, 0.6]);
        let red = self.material("brick_red", [0.7, 0.25, 0.2]);
        let brick_gray = self.world.add_shape(
            VisualShape::new(ShapeGeometry::box_from_size(BRICK_SIZE)).with_material(gray),
        );
        let brick_red = self.world.add_shape(
            VisualShape::new(ShapeGeometry::box_from_size(BRICK_SIZE)).with_material(red),
        );

        let width = BRICK_SIZE.x * columns as f64;
        for row in 0..rows {
            let shape = if row % 2 == 0 { brick_gray } else { brick_red };
            // Odd courses are offset by half a brick
            let shift = if row % 2 == 0 { 0.0 } else { BRICK_SIZE.x * 0.5 };
            for column in 0..columns {
                let position = origin
                    + DVec3::new(
                        -width * 0.5 + BRICK_SIZE.x * (column as f64 + 0.5) + shift,
                        BRICK_SIZE.y * (row as f64 + 0.5),
                        0.0,
                    );
                let mut body = Body::new(position)
                    .with_name(format!("brick_{}_{}", row, column))
                    .with_visual_model(VisualModel::new().with_shape(shape, Frame::IDENTITY));
                body = match motion {
                    Some(motion) => body.with_motion(motion),
                    None => body.with_fixed(true),
                };
                self.last_body = Some(self.world.add_body(body));
            }
        }
        log::debug!("Added {}x{} brick wall", rows, columns);
        self
    }

    /// Add a bob hanging from a fixed anchor by a spring, swinging along X
    pub fn add_spring_pendulum(mut self, anchor: DVec3, length: f64, swing: f64) -> Self {
        let steel = self.material("steel", [0.75, 0.75, 0.8]);
        let anchor_model = self.model(ShapeGeometry::sphere(0.04), Some(steel));
        let top = self.world.add_body(
            Body::new(anchor)
                .with_fixed(true)
                .with_visual_model(anchor_model),
        );

        let bob_model = self.model(ShapeGeometry::sphere(0.1), Some(steel));
        let bob = self.world.add_body(
            Body::new(anchor - DVec3::new(0.0, length, 0.0))
                .with_name("bob")
                .with_motion(SineMotion {
                    axis: DVec3::X,
                    amplitude: swing,
                    frequency: 0.5,
                    phase: 0.0,
                })
                .with_visual_model(bob_model),
        );

        let coil = self.model(ShapeGeometry::spring(0.03), Some(steel));
        self.world.add_link(
            Link::new(LinkKind::Spring, top, DVec3::ZERO, bob, DVec3::ZERO)
                .with_name("pendulum_spring")
                .with_visual_model(coil),
        );
        self.last_body = Some(bob);
        self
    }

    /// Add a weightless ring of particles drifting outward from `center`
    pub fn add_particle_ring(mut self, center: DVec3, count: usize, radius: f64, particle_radius: f64) -> Self {
        let sand = self.material("sand", [0.9, 0.8, 0.5]);
        let model = self.model(ShapeGeometry::sphere(1.0), Some(sand));
        let mut cloud = ParticleCloud::new(particle_radius)
            .with_name("ring")
            .with_gravity(false)
            .with_visual_model(model);
        for i in 0..count {
            let angle = std::f64::consts::TAU * i as f64 / count.max(1) as f64;
            let dir = DVec3::new(angle.cos(), 0.0, angle.sin());
            cloud.add_particle(center + dir * radius, dir * 0.1);
        }
        self.world.add_cloud(cloud);
        self
    }

    /// Add a fixed body showing an OBJ mesh
    pub fn add_mesh_body(mut self, path: impl Into<PathBuf>, position: DVec3, scale: DVec3) -> Self {
        let model = self.model(
            ShapeGeometry::ObjFile {
                path: path.into(),
                scale,
            },
            None,
        );
        let body = Body::new(position).with_fixed(true).with_visual_model(model);
        self.last_body = Some(self.world.add_body(body));
        self
    }

    /// Add a custom body to the scene
    ///
    /// For bodies that don't fit the standard patterns.
    pub fn add_body(mut self, body: Body) -> Self {
        self.last_body = Some(self.world.add_body(body));
        self
    }

    /// Key of the most recently added body
    pub fn last_body(&self) -> Option<BodyKey> {
        self.last_body
    }

    /// Build the scene and return the configured World
    pub fn build(self) -> World {
        self.world
    }

    /// The masonry demo: a brick wall riding a shaken table above a floor,
    /// with a spring pendulum and a particle ring
    pub fn masonry_demo(gravity: DVec3) -> World {
        let shake = SineMotion {
            axis: DVec3::Z,
            amplitude: 0.12,
            frequency: 1.5,
            phase: 0.0,
        };
        let table_top = -0.8;
        SceneBuilder::new()
            .with_gravity(gravity)
            .add_floor(-1.0, DVec3::new(3.0, 1.0, 3.0))
            .add_shaken_table(DVec3::new(0.0, table_top - 0.1, 0.0), DVec3::new(1.0, 0.2, 1.0), shake)
            .add_brick_wall(DVec3::new(0.0, table_top, 0.0), 6, 3, Some(shake))
            .add_spring_pendulum(DVec3::new(1.5, 1.5, 0.0), 1.0, 0.3)
            .add_particle_ring(DVec3::new(-1.5, 0.0, 0.0), 24, 0.4, 0.02)
            .build()
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scene() {
        let world = SceneBuilder::new().build();
        assert!(world.is_empty());
        assert_eq!(world.config.gravity, DVec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_scene_with_gravity() {
        let world = SceneBuilder::new().with_gravity(DVec3::new(0.0, -20.0, 0.0)).build();
        assert_eq!(world.config.gravity.y, -20.0);
    }

    #[test]
    fn test_floor_top_at_y() {
        let builder = SceneBuilder::new().add_floor(-1.0, DVec3::new(3.0, 1.0, 3.0));
        let key = builder.last_body().unwrap();
        let world = builder.build();

        let floor = world.body(key).unwrap();
        assert!(floor.fixed);
        assert_eq!(floor.position(), DVec3::new(0.0, -2.0, 0.0));
        assert_eq!(world.body_by_name("floor"), Some(key));
    }

    #[test]
    fn test_brick_wall() {
        let world = SceneBuilder::new()
            .add_brick_wall(DVec3::ZERO, 4, 3, None)
            .build();

        assert_eq!(world.body_count(), 12);
        let first = world.body(world.body_by_name("brick_0_0").unwrap()).unwrap();
        let above = world.body(world.body_by_name("brick_1_0").unwrap()).unwrap();
        assert!(first.fixed);
        assert!((above.position().x - first.position().x - BRICK_SIZE.x * 0.5).abs() < 1e-12);
        assert!((above.position().y - first.position().y - BRICK_SIZE.y).abs() < 1e-12);
    }

    #[test]
    fn test_spring_pendulum() {
        let world = SceneBuilder::new()
            .add_spring_pendulum(DVec3::new(0.0, 2.0, 0.0), 1.0, 0.2)
            .build();

        assert_eq!(world.body_count(), 2);
        assert_eq!(world.link_count(), 1);
        let (key, _) = world.links().next().unwrap();
        let (p1, p2) = world.link_endpoints(key).unwrap();
        assert!(((p1 - p2).length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_particle_ring() {
        let world = SceneBuilder::new()
            .add_particle_ring(DVec3::ZERO, 8, 0.5, 0.01)
            .build();
        let (_, cloud) = world.clouds().next().unwrap();
        assert_eq!(cloud.particle_count(), 8);
        assert!(!cloud.affected_by_gravity);
        assert!((cloud.particles()[0].position.length() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_masonry_demo() {
        let mut world = SceneBuilder::masonry_demo(DVec3::new(0.0, -9.81, 0.0));
        // floor + table + 18 bricks + anchor + bob
        assert_eq!(world.body_count(), 22);
        assert_eq!(world.cloud_count(), 1);
        assert_eq!(world.link_count(), 1);

        let table = world.body_by_name("table").unwrap();
        let brick = world.body_by_name("brick_0_0").unwrap();
        let gap = world.body(brick).unwrap().position() - world.body(table).unwrap().position();
        world.step(0.05);
        let moved = world.body(brick).unwrap().position() - world.body(table).unwrap().position();
        assert!((gap - moved).length() < 1e-12, "bricks should ride the table");
    }
}
