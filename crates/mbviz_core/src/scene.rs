//! Scene serialization
//!
//! Provides Scene struct for loading/saving scenes from RON files.
//! Scenes describe materials, shapes, bodies, particle clouds and links by
//! name; [`Scene::instantiate`] resolves the names and builds a [`World`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use glam::DVec3;
use mbviz_math::Frame;
use serde::{Deserialize, Serialize};

use crate::{
    Body, BodyKey, Link, LinkKind, MaterialKey, ParticleCloud, ShapeGeometry, ShapeKey,
    SineMotion, VisualMaterial, VisualModel, VisualShape, World, WorldConfig,
};

/// Serializable frame: position plus an axis-angle rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTemplate {
    #[serde(default)]
    pub position: DVec3,
    #[serde(default = "default_axis")]
    pub axis: DVec3,
    /// Rotation angle in radians
    #[serde(default)]
    pub angle: f64,
}

fn default_axis() -> DVec3 {
    DVec3::Z
}

fn default_true() -> bool {
    true
}

impl Default for FrameTemplate {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            axis: default_axis(),
            angle: 0.0,
        }
    }
}

impl FrameTemplate {
    /// Frame at a position with no rotation
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a runtime frame
    pub fn to_frame(&self) -> Frame {
        Frame::from_axis_angle(self.position, self.axis, self.angle)
    }
}

/// A named shape definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeTemplate {
    pub name: String,
    pub geometry: ShapeGeometry,
    /// Names of materials; the first one is used for rendering
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl ShapeTemplate {
    /// Create a visible shape template without materials
    pub fn new(name: impl Into<String>, geometry: ShapeGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            materials: Vec::new(),
            visible: true,
        }
    }

    /// Add a material by name
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.materials.push(material.into());
        self
    }
}

/// A reference to a named shape placed inside a visual model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeInstanceTemplate {
    pub shape: String,
    #[serde(default)]
    pub frame: FrameTemplate,
}

impl ShapeInstanceTemplate {
    /// Place a named shape at the identity frame
    pub fn new(shape: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            frame: FrameTemplate::default(),
        }
    }
}

/// Serializable rigid body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub frame: FrameTemplate,
    /// Visual model frame relative to the body frame
    #[serde(default)]
    pub visual_frame: FrameTemplate,
    #[serde(default)]
    pub velocity: DVec3,
    #[serde(default)]
    pub angular_velocity: DVec3,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub motion: Option<SineMotion>,
    /// Shapes of the visual model; empty means no visual model
    #[serde(default)]
    pub shapes: Vec<ShapeInstanceTemplate>,
}

impl BodyTemplate {
    /// Create a body template at a position
    pub fn new(position: DVec3) -> Self {
        Self {
            name: None,
            frame: FrameTemplate::at(position),
            visual_frame: FrameTemplate::default(),
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            fixed: false,
            motion: None,
            shapes: Vec::new(),
        }
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a named shape at the identity frame
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shapes.push(ShapeInstanceTemplate::new(shape));
        self
    }

    /// Mark the body as fixed
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }
}

/// Serializable particle cloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTemplate {
    #[serde(default)]
    pub name: Option<String>,
    pub particle_radius: f64,
    /// Initial particle positions
    #[serde(default)]
    pub particles: Vec<DVec3>,
    #[serde(default = "default_true")]
    pub gravity: bool,
    #[serde(default)]
    pub shapes: Vec<ShapeInstanceTemplate>,
}

/// Serializable two-point link between named bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTemplate {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: LinkKind,
    pub body1: String,
    /// Anchor on body 1, in body 1 coordinates
    #[serde(default)]
    pub point1: DVec3,
    pub body2: String,
    /// Anchor on body 2, in body 2 coordinates
    #[serde(default)]
    pub point2: DVec3,
    #[serde(default)]
    pub shapes: Vec<ShapeInstanceTemplate>,
}

/// A serializable scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name (for display/debugging)
    pub name: String,
    /// Named materials (materials without a name cannot be referenced)
    #[serde(default)]
    pub materials: Vec<VisualMaterial>,
    #[serde(default)]
    pub shapes: Vec<ShapeTemplate>,
    #[serde(default)]
    pub bodies: Vec<BodyTemplate>,
    #[serde(default)]
    pub clouds: Vec<CloudTemplate>,
    #[serde(default)]
    pub links: Vec<LinkTemplate>,
    /// Gravity vector (None = world default)
    #[serde(default)]
    pub gravity: Option<DVec3>,
}

impl Scene {
    /// Create a new empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            materials: Vec::new(),
            shapes: Vec::new(),
            bodies: Vec::new(),
            clouds: Vec::new(),
            links: Vec::new(),
            gravity: None,
        }
    }

    /// Load a scene from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneLoadError> {
        let contents = fs::read_to_string(path)?;
        let scene = ron::from_str(&contents)?;
        Ok(scene)
    }

    /// Save a scene to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneSaveError> {
        let pretty = ron::ser::PrettyConfig::new()
            .struct_names(true)
            .enumerate_arrays(false);
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Set the gravity for this scene
    pub fn with_gravity(mut self, gravity: DVec3) -> Self {
        self.gravity = Some(gravity);
        self
    }

    /// Build a world from this scene
    ///
    /// Every referenced material, shape and body name must be defined.
    pub fn instantiate(&self) -> Result<World, SceneError> {
        let config = self.gravity.map(WorldConfig::new).unwrap_or_default();
        let mut world = World::with_config(config);

        let mut materials: HashMap<&str, MaterialKey> = HashMap::new();
        for material in &self.materials {
            let key = world.add_material(material.clone());
            if let Some(name) = material.name.as_deref() {
                materials.insert(name, key);
            }
        }

        let mut shapes: HashMap<&str, ShapeKey> = HashMap::new();
        for template in &self.shapes {
            let mut shape = VisualShape::new(template.geometry.clone()).with_visible(template.visible);
            for name in &template.materials {
                shape = shape.with_material(lookup(&materials, "material", name)?);
            }
            shapes.insert(template.name.as_str(), world.add_shape(shape));
        }

        let mut bodies: HashMap<&str, BodyKey> = HashMap::new();
        for template in &self.bodies {
            let mut body = Body::new(template.frame.position)
                .with_rotation(template.frame.to_frame().rotation)
                .with_visual_frame(template.visual_frame.to_frame())
                .with_velocity(template.velocity)
                .with_angular_velocity(template.angular_velocity)
                .with_fixed(template.fixed);
            if let Some(motion) = template.motion {
                body = body.with_motion(motion);
            }
            if let Some(name) = &template.name {
                body = body.with_name(name.clone());
            }
            if let Some(model) = build_model(&shapes, &template.shapes)? {
                body = body.with_visual_model(model);
            }

            let key = world.add_body(body);
            if let Some(name) = template.name.as_deref() {
                bodies.insert(name, key);
            }
        }

        for template in &self.clouds {
            let mut cloud = ParticleCloud::new(template.particle_radius).with_gravity(template.gravity);
            if let Some(name) = &template.name {
                cloud = cloud.with_name(name.clone());
            }
            for &p in &template.particles {
                cloud.add_particle(p, DVec3::ZERO);
            }
            if let Some(model) = build_model(&shapes, &template.shapes)? {
                cloud = cloud.with_visual_model(model);
            }
            world.add_cloud(cloud);
        }

        for template in &self.links {
            let body1 = lookup(&bodies, "body", &template.body1)?;
            let body2 = lookup(&bodies, "body", &template.body2)?;
            let mut link = Link::new(template.kind, body1, template.point1, body2, template.point2);
            if let Some(name) = &template.name {
                link = link.with_name(name.clone());
            }
            if let Some(model) = build_model(&shapes, &template.shapes)? {
                link = link.with_visual_model(model);
            }
            world.add_link(link);
        }

        log::info!(
            "Instantiated scene '{}': {} bodies, {} clouds, {} links",
            self.name,
            world.body_count(),
            world.cloud_count(),
            world.link_count()
        );
        Ok(world)
    }
}

fn lookup<K: Copy>(map: &HashMap<&str, K>, kind: &'static str, name: &str) -> Result<K, SceneError> {
    map.get(name).copied().ok_or_else(|| SceneError::UnknownReference {
        kind,
        name: name.to_string(),
    })
}

fn build_model(
    shapes: &HashMap<&str, ShapeKey>,
    instances: &[ShapeInstanceTemplate],
) -> Result<Option<VisualModel>, SceneError> {
    if instances.is_empty() {
        return Ok(None);
    }
    let mut model = VisualModel::new();
    for instance in instances {
        let key = lookup(shapes, "shape", &instance.shape)?;
        model.add_shape(key, instance.frame.to_frame());
    }
    Ok(Some(model))
}

/// Error loading a scene
#[derive(Debug)]
pub enum SceneLoadError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// Parse error (invalid RON syntax)
    Parse(ron::error::SpannedError),
}

impl From<io::Error> for SceneLoadError {
    fn from(e: io::Error) -> Self {
        SceneLoadError::Io(e)
    }
}

impl From<ron::error::SpannedError> for SceneLoadError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneLoadError::Parse(e)
    }
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::Io(e) => write!(f, "IO error: {}", e),
            SceneLoadError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Error saving a scene
#[derive(Debug)]
pub enum SceneSaveError {
    /// IO error (permission denied, disk full, etc.)
    Io(io::Error),
    /// Serialization error
    Serialize(ron::Error),
}

impl From<io::Error> for SceneSaveError {
    fn from(e: io::Error) -> Self {
        SceneSaveError::Io(e)
    }
}

impl From<ron::Error> for SceneSaveError {
    fn from(e: ron::Error) -> Self {
        SceneSaveError::Serialize(e)
    }
}

impl std::fmt::Display for SceneSaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneSaveError::Io(e) => write!(f, "IO error: {}", e),
            SceneSaveError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for SceneSaveError {}

/// Unified error type for scene operations
#[derive(Debug)]
pub enum SceneError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// Parse error (invalid RON syntax)
    Parse(ron::error::SpannedError),
    /// Serialization error
    Serialize(ron::Error),
    /// A template names a material, shape or body that is not defined
    UnknownReference { kind: &'static str, name: String },
}

impl From<io::Error> for SceneError {
    fn from(e: io::Error) -> Self {
        SceneError::Io(e)
    }
}

impl From<SceneLoadError> for SceneError {
    fn from(e: SceneLoadError) -> Self {
        match e {
            SceneLoadError::Io(io_err) => SceneError::Io(io_err),
            SceneLoadError::Parse(parse_err) => SceneError::Parse(parse_err),
        }
    }
}

impl From<SceneSaveError> for SceneError {
    fn from(e: SceneSaveError) -> Self {
        match e {
            SceneSaveError::Io(io_err) => SceneError::Io(io_err),
            SceneSaveError::Serialize(ser_err) => SceneError::Serialize(ser_err),
        }
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::Io(e) => write!(f, "IO error: {}", e),
            SceneError::Parse(e) => write!(f, "Parse error: {}", e),
            SceneError::Serialize(e) => write!(f, "Serialize error: {}", e),
            SceneError::UnknownReference { kind, name } => {
                write!(f, "Unknown {} '{}'", kind, name)
            }
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_scene() -> Scene {
        let mut scene = Scene::new("Springs").with_gravity(DVec3::new(0.0, -10.0, 0.0));
        scene.materials.push(VisualMaterial::from_rgb(0.8, 0.2, 0.2).with_name("red"));
        scene
            .shapes
            .push(ShapeTemplate::new("ball", ShapeGeometry::sphere(0.5)).with_material("red"));
        scene.shapes.push(ShapeTemplate::new("coil", ShapeGeometry::spring(0.1)));
        scene
            .bodies
            .push(BodyTemplate::new(DVec3::ZERO).with_name("ground").with_fixed(true));
        scene.bodies.push(
            BodyTemplate::new(DVec3::new(0.0, 0.0, 4.0))
                .with_name("bob")
                .with_shape("ball"),
        );
        scene.links.push(LinkTemplate {
            name: Some("spring".to_string()),
            kind: LinkKind::Spring,
            body1: "ground".to_string(),
            point1: DVec3::ZERO,
            body2: "bob".to_string(),
            point2: DVec3::ZERO,
            shapes: vec![ShapeInstanceTemplate::new("coil")],
        });
        scene
    }

    #[test]
    fn test_scene_new() {
        let scene = Scene::new("Test Scene");
        assert_eq!(scene.name, "Test Scene");
        assert!(scene.bodies.is_empty());
        assert!(scene.gravity.is_none());
    }

    #[test]
    fn test_instantiate() {
        let world = spring_scene().instantiate().unwrap();

        assert_eq!(world.body_count(), 2);
        assert_eq!(world.link_count(), 1);
        assert_eq!(world.config.gravity, DVec3::new(0.0, -10.0, 0.0));

        let ground = world.body_by_name("ground").unwrap();
        assert!(world.body(ground).unwrap().fixed);
        assert!(world.body(ground).unwrap().visual_model.is_none());

        let bob = world.body(world.body_by_name("bob").unwrap()).unwrap();
        let model = bob.visual_model.as_ref().unwrap();
        assert_eq!(model.len(), 1);

        let (_, link) = world.links().next().unwrap();
        let (p1, p2) = world.link_endpoints(world.links().next().unwrap().0).unwrap();
        assert_eq!(link.kind, LinkKind::Spring);
        assert_eq!(p1, DVec3::ZERO);
        assert_eq!(p2, DVec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_instantiate_unknown_shape() {
        let mut scene = spring_scene();
        scene.bodies.push(BodyTemplate::new(DVec3::ZERO).with_shape("anvil"));

        match scene.instantiate() {
            Err(SceneError::UnknownReference { kind, name }) => {
                assert_eq!(kind, "shape");
                assert_eq!(name, "anvil");
            }
            other => panic!("Expected UnknownReference, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_instantiate_unknown_body() {
        let mut scene = spring_scene();
        scene.links[0].body2 = "nobody".to_string();
        let err = scene.instantiate().err().unwrap();
        assert_eq!(err.to_string(), "Unknown body 'nobody'");
    }

    #[test]
    fn test_scene_serialization() {
        let scene = spring_scene();

        let pretty = ron::ser::PrettyConfig::new().struct_names(true);
        let serialized = ron::ser::to_string_pretty(&scene, pretty).unwrap();
        assert!(serialized.contains("Springs"));
        assert!(serialized.contains("Spring"));

        let deserialized: Scene = ron::from_str(&serialized).unwrap();
        assert_eq!(deserialized.name, "Springs");
        assert_eq!(deserialized.bodies, scene.bodies);
        assert_eq!(deserialized.links, scene.links);
        assert_eq!(deserialized.shapes, scene.shapes);
    }

    #[test]
    fn test_parse_scene_file_format() {
        let scene_ron = r#"
Scene(
    name: "Cloud",
    materials: [
        (name: Some("sand"), diffuse: (0.9, 0.8, 0.5)),
    ],
    shapes: [
        (name: "grain", geometry: (type: "Sphere", radius: 0.05), materials: ["sand"]),
        (name: "floor", geometry: (type: "Box", half_lengths: (3.0, 1.0, 3.0))),
    ],
    bodies: [
        (
            name: Some("floor"),
            frame: (position: (0.0, -2.0, 0.0)),
            fixed: true,
            shapes: [(shape: "floor")],
        ),
    ],
    clouds: [
        (
            particle_radius: 0.05,
            particles: [(0.0, 1.0, 0.0), (0.1, 1.0, 0.0)],
            shapes: [(shape: "grain")],
        ),
    ],
)
"#;
        let scene: Scene = ron::from_str(scene_ron).unwrap();
        assert_eq!(scene.materials[0].ambient, [0.1, 0.1, 0.1]);
        assert!(scene.shapes[1].visible);

        let world = scene.instantiate().unwrap();
        let floor = world.body(world.body_by_name("floor").unwrap()).unwrap();
        assert_eq!(floor.position(), DVec3::new(0.0, -2.0, 0.0));

        let (_, cloud) = world.clouds().next().unwrap();
        assert_eq!(cloud.particle_count(), 2);
        assert!(cloud.visual_model.is_some());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("mbviz_test_scene_save.ron");
        spring_scene().save(&path).unwrap();

        let loaded = Scene::load(&path).unwrap();
        assert_eq!(loaded.name, "Springs");
        assert_eq!(loaded.links.len(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Scene::load("/nonexistent/path/scene.ron");
        assert!(matches!(result, Err(SceneLoadError::Io(_))));
    }

    #[test]
    fn test_frame_template_rotation() {
        let frame = FrameTemplate {
            position: DVec3::X,
            axis: DVec3::Z,
            angle: std::f64::consts::FRAC_PI_2,
        }
        .to_frame();
        assert!(frame.transform_vector(DVec3::X).abs_diff_eq(DVec3::Y, 1e-9));
    }
}
