//! Visual models and shape instances

use mbviz_math::Frame;

use crate::ShapeKey;

/// Index of a shape instance inside its owning visual model
///
/// Stable for the lifetime of the model: instances are only ever appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeInstanceId(pub usize);

impl ShapeInstanceId {
    /// Get the raw index
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A shape placed inside a visual model
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeInstance {
    /// The shape definition (may be shared with other instances)
    pub shape: ShapeKey,
    /// Attachment frame relative to the owner's visual model frame
    pub frame: Frame,
}

/// The list of shape instances attached to an entity
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualModel {
    instances: Vec<ShapeInstance>,
}

impl VisualModel {
    /// Create an empty visual model
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a shape with the given local frame, returning the instance id
    pub fn add_shape(&mut self, shape: ShapeKey, frame: Frame) -> ShapeInstanceId {
        let id = ShapeInstanceId(self.instances.len());
        self.instances.push(ShapeInstance { shape, frame });
        id
    }

    /// Builder-style variant of [`add_shape`](Self::add_shape)
    pub fn with_shape(mut self, shape: ShapeKey, frame: Frame) -> Self {
        self.add_shape(shape, frame);
        self
    }

    /// Look up an instance by id
    pub fn instance(&self, id: ShapeInstanceId) -> Option<&ShapeInstance> {
        self.instances.get(id.0)
    }

    /// Iterate over (id, instance) pairs
    pub fn iter(&self) -> impl Iterator<Item = (ShapeInstanceId, &ShapeInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (ShapeInstanceId(i), inst))
    }

    /// Number of shape instances
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the model has no shapes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use slotmap::SlotMap;

    #[test]
    fn test_same_shape_twice() {
        let mut shapes: SlotMap<ShapeKey, ()> = SlotMap::with_key();
        let key = shapes.insert(());

        let mut model = VisualModel::new();
        let a = model.add_shape(key, Frame::IDENTITY);
        let b = model.add_shape(key, Frame::from_position(DVec3::X));

        assert_ne!(a, b);
        assert_eq!(model.len(), 2);
        assert_eq!(model.instance(a).unwrap().shape, model.instance(b).unwrap().shape);
        assert_eq!(model.instance(b).unwrap().frame.position, DVec3::X);
    }

    #[test]
    fn test_missing_instance() {
        let model = VisualModel::new();
        assert!(model.is_empty());
        assert!(model.instance(ShapeInstanceId(3)).is_none());
    }
}
