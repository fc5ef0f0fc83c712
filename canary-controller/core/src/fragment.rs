use crate::{
    attributes::{AttributeMap, Attributes},
    RELEASE_HEADER,
};
use serde_json::Value;

/// A single entry of a route object's `http` rule list.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Fragment<'a>(&'a AttributeMap);

/// The backend a fragment routes to. Missing fields read as empty.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Destination<'a> {
    pub host: &'a str,
    pub subset: &'a str,
}

/// Iterates over the rule fragments of a route object's spec.
pub(crate) fn fragments(spec: &Value) -> impl Iterator<Item = Fragment<'_>> {
    spec.get_maps("http").map(Fragment)
}

impl<'a> Fragment<'a> {
    /// The release id this fragment appends to responses.
    pub fn release(&self) -> Option<&'a str> {
        self.0
            .get_map("appendHeaders")
            .and_then(|headers| headers.get_str(RELEASE_HEADER))
    }

    /// The first `route` entry that names a destination.
    pub fn destination(&self) -> Option<Destination<'a>> {
        let dst = self
            .0
            .get_maps("route")
            .find_map(|route| route.get_map("destination"))?;
        Some(Destination {
            host: dst.get_str("host").unwrap_or_default(),
            subset: dst.get_str("subset").unwrap_or_default(),
        })
    }

    /// The `headers` blocks of every `match` entry.
    pub fn header_matches(&self) -> impl Iterator<Item = &'a AttributeMap> {
        self.0
            .get_maps("match")
            .filter_map(|m| m.get_map("headers"))
    }

    /// Release ids this fragment matches exactly on the request's release
    /// header.
    pub fn release_matches(&self) -> impl Iterator<Item = &'a str> {
        self.header_matches()
            .filter_map(|headers| headers.get_map(RELEASE_HEADER))
            .filter_map(|m| m.get_str("exact"))
    }
}
