//! Physical entities: rigid bodies, particle clouds and two-point links
//!
//! Entities are owned by the [`World`](crate::World) arenas. Everything else
//! (the render graph in particular) refers to them through generational keys,
//! so a removed entity turns into a lookup miss instead of a dangling pointer.

use glam::{DQuat, DVec3};
use mbviz_math::Frame;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::VisualModel;

new_key_type! {
    /// Key to a rigid body in the world
    pub struct BodyKey;
    /// Key to a particle cloud in the world
    pub struct CloudKey;
    /// Key to a two-point link in the world
    pub struct LinkKey;
    /// Key to a visual shape in the shape arena
    pub struct ShapeKey;
    /// Key to a visual material in the material arena
    pub struct MaterialKey;
}

/// Non-owning reference to any physical entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Body(BodyKey),
    Cloud(CloudKey),
    Link(LinkKey),
}

/// Prescribed sinusoidal motion of a body around its base position
///
/// offset(t) = axis * amplitude * sin(2 pi frequency t + phase)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SineMotion {
    /// Direction of the oscillation (normalized on use)
    pub axis: DVec3,
    /// Peak displacement
    pub amplitude: f64,
    /// Frequency in Hz
    pub frequency: f64,
    /// Phase in radians
    #[serde(default)]
    pub phase: f64,
}

impl SineMotion {
    /// Displacement from the base position at time `t`
    pub fn offset(&self, t: f64) -> DVec3 {
        let s = (std::f64::consts::TAU * self.frequency * t + self.phase).sin();
        self.axis.normalize_or_zero() * self.amplitude * s
    }
}

/// A rigid body
#[derive(Clone, Debug)]
pub struct Body {
    /// Optional name (for lookup and diagnostics)
    pub name: Option<String>,
    /// Pose of the body reference frame in world space
    pub frame: Frame,
    /// Visual model frame relative to the body frame
    pub visual_frame: Frame,
    /// Linear velocity (units per second)
    pub linear_velocity: DVec3,
    /// Angular velocity in world space (radians per second)
    pub angular_velocity: DVec3,
    /// Fixed bodies never move
    pub fixed: bool,
    /// Prescribed motion; overrides velocity integration
    pub motion: Option<SineMotion>,
    /// Base position for prescribed motion
    base_position: DVec3,
    /// Shapes to render (None = no visual representation)
    pub visual_model: Option<VisualModel>,
}

impl Body {
    /// Create a body at the given position with no visual model
    pub fn new(position: DVec3) -> Self {
        Self {
            name: None,
            frame: Frame::from_position(position),
            visual_frame: Frame::IDENTITY,
            linear_velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            fixed: false,
            motion: None,
            base_position: position,
            visual_model: None,
        }
    }

    /// Set the name of this body
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the body orientation
    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.frame.rotation = rotation;
        self
    }

    /// Attach a visual model
    pub fn with_visual_model(mut self, model: VisualModel) -> Self {
        self.visual_model = Some(model);
        self
    }

    /// Set the visual model frame (relative to the body frame)
    pub fn with_visual_frame(mut self, frame: Frame) -> Self {
        self.visual_frame = frame;
        self
    }

    /// Set the linear velocity
    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Set the angular velocity
    pub fn with_angular_velocity(mut self, angular_velocity: DVec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Mark the body as fixed
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Drive the body with a prescribed sine motion around its current position
    pub fn with_motion(mut self, motion: SineMotion) -> Self {
        self.base_position = self.frame.position;
        self.motion = Some(motion);
        self
    }

    /// Current world position
    #[inline]
    pub fn position(&self) -> DVec3 {
        self.frame.position
    }

    /// Move the body (also resets the base of any prescribed motion)
    pub fn set_position(&mut self, position: DVec3) {
        self.frame.position = position;
        self.base_position = position;
    }

    /// Set the orientation
    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.frame.rotation = rotation.normalize();
    }

    /// World frame of the visual model: body frame composed with the visual frame
    pub fn visual_model_frame(&self) -> Frame {
        self.frame.compose(&self.visual_frame)
    }

    /// Advance the pose by `dt` seconds; `t` is the time after the step
    pub(crate) fn advance(&mut self, dt: f64, t: f64, gravity: DVec3) {
        if self.fixed {
            return;
        }
        if let Some(motion) = self.motion {
            self.frame.position = self.base_position + motion.offset(t);
            return;
        }

        self.linear_velocity += gravity * dt;
        self.frame.position += self.linear_velocity * dt;
        if self.angular_velocity != DVec3::ZERO {
            let spin = DQuat::from_scaled_axis(self.angular_velocity * dt);
            self.frame.rotation = (spin * self.frame.rotation).normalize();
        }
        self.base_position = self.frame.position;
    }
}

/// A single particle of a cloud
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: DVec3,
    pub velocity: DVec3,
}

/// A cloud of identical spherical particles
#[derive(Clone, Debug)]
pub struct ParticleCloud {
    /// Optional name (for lookup and diagnostics)
    pub name: Option<String>,
    /// Particle radius (all particles share it)
    pub particle_radius: f64,
    /// Whether particles are affected by gravity
    pub affected_by_gravity: bool,
    /// Visual model; the cloud is rendered only when present
    pub visual_model: Option<VisualModel>,
    particles: Vec<Particle>,
}

impl ParticleCloud {
    /// Create an empty cloud
    pub fn new(particle_radius: f64) -> Self {
        Self {
            name: None,
            particle_radius,
            affected_by_gravity: true,
            visual_model: None,
            particles: Vec::new(),
        }
    }

    /// Set the name of this cloud
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a visual model
    pub fn with_visual_model(mut self, model: VisualModel) -> Self {
        self.visual_model = Some(model);
        self
    }

    /// Set whether gravity applies
    pub fn with_gravity(mut self, affected: bool) -> Self {
        self.affected_by_gravity = affected;
        self
    }

    /// Add a particle; changes cloud topology (a re-bind is required to render it)
    pub fn add_particle(&mut self, position: DVec3, velocity: DVec3) -> usize {
        self.particles.push(Particle { position, velocity });
        self.particles.len() - 1
    }

    /// Remove a particle by index
    pub fn remove_particle(&mut self, index: usize) -> Option<Particle> {
        (index < self.particles.len()).then(|| self.particles.remove(index))
    }

    /// Number of particles
    #[inline]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// All particles
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// World frame of the i-th particle's visual model
    pub fn particle_frame(&self, index: usize) -> Option<Frame> {
        self.particles.get(index).map(|p| Frame::from_position(p.position))
    }

    pub(crate) fn advance(&mut self, dt: f64, gravity: DVec3) {
        let g = if self.affected_by_gravity { gravity } else { DVec3::ZERO };
        for p in &mut self.particles {
            p.velocity += g * dt;
            p.position += p.velocity * dt;
        }
    }
}

/// Flavor of two-point link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Translational spring-damper-actuator
    Spring,
    /// Distance constraint
    Distance,
}

/// A link between two bodies, anchored at one point on each
#[derive(Clone, Debug)]
pub struct Link {
    /// Optional name (for lookup and diagnostics)
    pub name: Option<String>,
    pub kind: LinkKind,
    pub body1: BodyKey,
    pub body2: BodyKey,
    /// Anchor on body 1, in body 1 coordinates
    pub point1: DVec3,
    /// Anchor on body 2, in body 2 coordinates
    pub point2: DVec3,
    /// Shapes to render between the anchors
    pub visual_model: Option<VisualModel>,
}

impl Link {
    /// Create a link between two body-local anchors
    pub fn new(kind: LinkKind, body1: BodyKey, point1: DVec3, body2: BodyKey, point2: DVec3) -> Self {
        Self {
            name: None,
            kind,
            body1,
            body2,
            point1,
            point2,
            visual_model: None,
        }
    }

    /// Set the name of this link
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a visual model
    pub fn with_visual_model(mut self, model: VisualModel) -> Self {
        self.visual_model = Some(model);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_body_visual_model_frame() {
        let body = Body::new(DVec3::new(1.0, 0.0, 0.0))
            .with_rotation(DQuat::from_rotation_z(FRAC_PI_2))
            .with_visual_frame(Frame::from_position(DVec3::X));

        let f = body.visual_model_frame();
        assert!(f.position.abs_diff_eq(DVec3::new(1.0, 1.0, 0.0), EPSILON));
    }

    #[test]
    fn test_fixed_body_does_not_move() {
        let mut body = Body::new(DVec3::ZERO).with_fixed(true).with_velocity(DVec3::X);
        body.advance(1.0, 1.0, DVec3::new(0.0, -9.81, 0.0));
        assert_eq!(body.position(), DVec3::ZERO);
    }

    #[test]
    fn test_velocity_integration() {
        let mut body = Body::new(DVec3::ZERO).with_velocity(DVec3::new(2.0, 0.0, 0.0));
        body.advance(0.5, 0.5, DVec3::ZERO);
        assert!(body.position().abs_diff_eq(DVec3::new(1.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_angular_velocity_integration() {
        let mut body = Body::new(DVec3::ZERO).with_angular_velocity(DVec3::new(0.0, 0.0, FRAC_PI_2));
        body.advance(1.0, 1.0, DVec3::ZERO);
        let x = body.frame.transform_vector(DVec3::X);
        assert!(x.abs_diff_eq(DVec3::Y, 1e-9), "got {:?}", x);
    }

    #[test]
    fn test_sine_motion() {
        let motion = SineMotion {
            axis: DVec3::new(0.0, 0.0, 2.0),
            amplitude: 0.5,
            frequency: 1.0,
            phase: 0.0,
        };
        let mut body = Body::new(DVec3::new(0.0, 1.0, 0.0)).with_motion(motion);

        body.advance(0.25, 0.25, DVec3::new(0.0, -9.81, 0.0));
        // Quarter period: full amplitude, gravity ignored
        assert!(body.position().abs_diff_eq(DVec3::new(0.0, 1.0, 0.5), EPSILON));
    }

    #[test]
    fn test_particle_topology() {
        let mut cloud = ParticleCloud::new(0.1);
        cloud.add_particle(DVec3::ZERO, DVec3::ZERO);
        cloud.add_particle(DVec3::X, DVec3::ZERO);
        assert_eq!(cloud.particle_count(), 2);

        assert!(cloud.remove_particle(5).is_none());
        assert!(cloud.remove_particle(0).is_some());
        assert_eq!(cloud.particle_count(), 1);
        assert_eq!(cloud.particle_frame(0).unwrap().position, DVec3::X);
    }

    #[test]
    fn test_particles_fall() {
        let mut cloud = ParticleCloud::new(0.1);
        cloud.add_particle(DVec3::ZERO, DVec3::ZERO);
        cloud.advance(1.0, DVec3::new(0.0, -10.0, 0.0));
        assert!(cloud.particles()[0].position.y < 0.0);

        let mut floating = ParticleCloud::new(0.1).with_gravity(false);
        floating.add_particle(DVec3::ZERO, DVec3::ZERO);
        floating.advance(1.0, DVec3::new(0.0, -10.0, 0.0));
        assert_eq!(floating.particles()[0].position, DVec3::ZERO);
    }
}
