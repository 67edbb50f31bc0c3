use crate::{Model, ModelError, ModelResult, ShadowModel};
use serde::de::DeserializeOwned;
use shadow_merge::{MergeMode, Mergeable, Node, NoopObserver};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Describes one document shape to the layers that cannot name its type.
pub trait ModelShape: Send + Sync + fmt::Debug {
    /// Returns the registered shape name.
    fn name(&self) -> &str;

    /// Returns the empty document of this shape.
    fn zero(&self) -> Model;

    /// Decodes a stored document.
    fn decode(&self, value: serde_json::Value) -> ModelResult<Model>;

    /// Returns true if `model` is a document of this shape.
    fn accepts(&self, model: &Model) -> bool;
}

/// Shared handle to a shape.
pub type Shape = Arc<dyn ModelShape>;

/// Shape of a statically typed document `T`.
pub struct TypedShape<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedShape<T>
where
    T: ShadowModel + Default + DeserializeOwned,
{
    /// Creates a shape called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Creates a shape called `name` behind a shared handle.
    pub fn shared(name: impl Into<String>) -> Shape {
        Arc::new(Self::new(name))
    }
}

impl<T> fmt::Debug for TypedShape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedShape")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ModelShape for TypedShape<T>
where
    T: ShadowModel + Default + DeserializeOwned,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn zero(&self) -> Model {
        Model::new(T::default())
    }

    fn decode(&self, value: serde_json::Value) -> ModelResult<Model> {
        Ok(Model::new(serde_json::from_value::<T>(value)?))
    }

    fn accepts(&self, model: &Model) -> bool {
        model.is::<T>()
    }
}

/// Shape of a runtime-described [`Node`] document.
///
/// The template fixes record field sets and leaf kinds; its values are
/// ignored.
#[derive(Debug, Clone)]
pub struct DescribedShape {
    name: String,
    template: Node,
}

impl DescribedShape {
    /// Creates a shape from a template document.
    pub fn new(name: impl Into<String>, template: Node) -> Self {
        Self {
            name: name.into(),
            template: template.zeroed(),
        }
    }

    /// Creates a shape behind a shared handle.
    pub fn shared(name: impl Into<String>, template: Node) -> Shape {
        Arc::new(Self::new(name, template))
    }

    /// Returns the zeroed template.
    pub fn template(&self) -> &Node {
        &self.template
    }

    fn check(&self, node: &Node) -> ModelResult<()> {
        <Node as Mergeable>::merge(
            &self.template,
            node,
            &mut shadow_merge::MergeContext::new(MergeMode::ServerIsMaster, &mut NoopObserver),
        )
        .map(|_| ())
        .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
    }
}

impl ModelShape for DescribedShape {
    fn name(&self) -> &str {
        &self.name
    }

    fn zero(&self) -> Model {
        Model::new(self.template.clone())
    }

    fn decode(&self, value: serde_json::Value) -> ModelResult<Model> {
        let node: Node = serde_json::from_value(value)?;
        self.check(&node)?;
        Ok(Model::new(node))
    }

    fn accepts(&self, model: &Model) -> bool {
        model
            .downcast_ref::<Node>()
            .is_some_and(|node| self.check(node).is_ok())
    }
}
