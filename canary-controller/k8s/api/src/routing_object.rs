use crate::labels::Labels;
use kube::{
    api::ObjectMeta,
    core::{ApiResource, DynamicObject},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A routing object whose spec is kept as an untyped attribute tree.
///
/// Both gateways and virtual services are represented this way: the
/// controller only ever inspects the handful of spec fields it understands
/// and must write everything else back untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RoutingObject {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: Value,
}

impl RoutingObject {
    pub fn new(metadata: ObjectMeta, spec: Value) -> Self {
        Self { metadata, spec }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn labels(&self) -> Labels {
        self.metadata.labels.clone().into()
    }

    pub fn is_managed(&self) -> bool {
        self.labels().is_managed()
    }

    /// Wraps the object as a `DynamicObject` of the given kind so it can be
    /// submitted to the API server.
    pub fn into_dynamic(self, resource: &ApiResource) -> DynamicObject {
        let Self { metadata, spec } = self;
        let mut obj = DynamicObject::new(metadata.name.as_deref().unwrap_or_default(), resource);
        obj.metadata = metadata;
        obj.data = serde_json::json!({ "spec": spec });
        obj
    }
}

impl From<DynamicObject> for RoutingObject {
    fn from(obj: DynamicObject) -> Self {
        let DynamicObject {
            metadata, mut data, ..
        } = obj;
        let spec = data
            .as_object_mut()
            .and_then(|data| data.remove("spec"))
            .unwrap_or_default();
        Self { metadata, spec }
    }
}
