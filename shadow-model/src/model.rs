use shadow_merge::{MergeError, MergeMode, MergeObserver, MergeResult, Merged, Mergeable};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Object-safe view of a concrete shadow document type.
///
/// Implemented for every `Mergeable` type that is also serializable,
/// comparable and thread-safe; callers never implement it by hand.
pub trait ShadowModel: Any + Send + Sync + fmt::Debug {
    /// Upcasts for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Returns the concrete type's name, used in shape-mismatch errors.
    fn type_name(&self) -> &'static str;

    /// Merges `new` into `self`. Fails if `new` is a different type.
    fn merge_model(
        &self,
        new: &dyn ShadowModel,
        mode: MergeMode,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>>;

    /// Acknowledges `self` (a desired document) against `reported`.
    fn acknowledge_model(
        &self,
        reported: &dyn ShadowModel,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>>;

    /// Encodes the document as JSON.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    /// Compares with another document of possibly different type.
    fn eq_model(&self, other: &dyn ShadowModel) -> bool;
}

impl<T> ShadowModel for T
where
    T: Mergeable + serde::Serialize + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn merge_model(
        &self,
        new: &dyn ShadowModel,
        mode: MergeMode,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>> {
        let new = downcast::<T>(new)?;
        let merged = shadow_merge::merge(self, new, mode, observer)?;
        Ok(Merged {
            value: Model::new(merged.value),
            dirty: merged.dirty,
        })
    }

    fn acknowledge_model(
        &self,
        reported: &dyn ShadowModel,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>> {
        let reported = downcast::<T>(reported)?;
        let acked = shadow_merge::acknowledge(reported, self, observer)?;
        Ok(Merged {
            value: Model::new(acked.value),
            dirty: acked.dirty,
        })
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn eq_model(&self, other: &dyn ShadowModel) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }
}

fn downcast<T: 'static>(other: &dyn ShadowModel) -> MergeResult<&T> {
    other
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| MergeError::ShapeMismatch {
            path: String::new(),
            expected: std::any::type_name::<T>().to_string(),
            found: other.type_name().to_string(),
        })
}

/// A type-erased, immutable shadow document.
///
/// Cloning is cheap: documents are shared, and merging always builds a new
/// one instead of mutating.
#[derive(Clone)]
pub struct Model(Arc<dyn ShadowModel>);

impl Model {
    /// Wraps a concrete document.
    pub fn new<T: ShadowModel>(doc: T) -> Self {
        Self(Arc::new(doc))
    }

    /// Returns the concrete document if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Returns true if the document is a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Returns the concrete type's name.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Merges `new` into this document.
    pub fn merge(
        &self,
        new: &Model,
        mode: MergeMode,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>> {
        self.0.merge_model(new.0.as_ref(), mode, observer)
    }

    /// Acknowledges this desired document against `reported`.
    pub fn acknowledge(
        &self,
        reported: &Model,
        observer: &mut dyn MergeObserver,
    ) -> MergeResult<Merged<Model>> {
        self.0.acknowledge_model(reported.0.as_ref(), observer)
    }

    /// Encodes the document as JSON.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        self.0.to_json()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_model(other.0.as_ref())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
