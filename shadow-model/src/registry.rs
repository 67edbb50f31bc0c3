use crate::Shape;
use std::collections::HashMap;

/// Resolves the document shape for an entity.
pub trait TypeRegistry: Send + Sync {
    /// Resolves the shape of the shadow `name` on entity `id`.
    fn resolve_by_id(&self, id: &str, name: &str) -> Option<Shape>;

    /// Returns a shape by its registered name.
    fn get(&self, name: &str) -> Option<Shape>;
}

/// In-memory [`TypeRegistry`].
///
/// Shapes are registered under their own name. `resolve_by_id` first looks
/// for an explicit `(id, name)` binding and otherwise treats the shadow
/// name as the shape name.
#[derive(Debug, Default, Clone)]
pub struct ShapeRegistry {
    shapes: HashMap<String, Shape>,
    bindings: HashMap<(String, String), String>,
}

impl ShapeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shape under its own name, replacing any previous one.
    pub fn register(&mut self, shape: Shape) -> &mut Self {
        self.shapes.insert(shape.name().to_string(), shape);
        self
    }

    /// Binds the shadow `name` of entity `id` to the shape `shape_name`.
    pub fn bind(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        shape_name: impl Into<String>,
    ) -> &mut Self {
        self.bindings
            .insert((id.into(), name.into()), shape_name.into());
        self
    }

    /// Returns the number of registered shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns true if no shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl TypeRegistry for ShapeRegistry {
    fn resolve_by_id(&self, id: &str, name: &str) -> Option<Shape> {
        let shape_name = self
            .bindings
            .get(&(id.to_string(), name.to_string()))
            .map(String::as_str)
            .unwrap_or(name);
        self.get(shape_name)
    }

    fn get(&self, name: &str) -> Option<Shape> {
        self.shapes.get(name).cloned()
    }
}
