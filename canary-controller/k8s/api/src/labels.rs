use std::{collections::BTreeMap, sync::Arc};

/// Opts a routing object into canary management. Any value other than
/// `"false"` marks the object as managed.
pub const MANAGED: &str = "io.devtio.canary/managed";

/// Selects the pods that belong to a release.
pub const RELEASE: &str = "release";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

// === Labels ===

impl Labels {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Indicates whether the object carrying these labels participates in
    /// canary management.
    pub fn is_managed(&self) -> bool {
        matches!(self.get(MANAGED), Some(v) if v != "false")
    }
}

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl From<Option<Map>> for Labels {
    #[inline]
    fn from(labels: Option<Map>) -> Self {
        labels.unwrap_or_default().into()
    }
}

impl std::iter::FromIterator<(String, String)> for Labels {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Builds the label selector used to find the pods of a release.
pub fn release_selector(release: &str) -> String {
    format!("{RELEASE}={release}")
}
