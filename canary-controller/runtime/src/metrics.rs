use crate::core::PatchOutcome;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct ApiMetrics {
    requests: Family<RequestLabels, Counter>,
    patches: Family<PatchLabels, Counter>,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RequestLabels {
    route: &'static str,
    method: String,
    status: String,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct PatchLabels {
    result: &'static str,
}

// === impl ApiMetrics ===

impl ApiMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::<RequestLabels, Counter>::default();
        reg.register(
            "requests",
            "Total number of HTTP API requests handled",
            requests.clone(),
        );

        let patches = Family::<PatchLabels, Counter>::default();
        reg.register(
            "route_updates",
            "Total number of route object updates submitted for releases",
            patches.clone(),
        );

        Self { requests, patches }
    }

    pub(crate) fn request(
        &self,
        route: &'static str,
        method: &http::Method,
        status: http::StatusCode,
    ) {
        self.requests
            .get_or_create(&RequestLabels {
                route,
                method: method.to_string(),
                status: status.as_str().to_string(),
            })
            .inc();
    }

    pub(crate) fn patch_outcomes(&self, outcomes: &[PatchOutcome]) {
        for outcome in outcomes {
            let result = if outcome.is_ok() { "ok" } else { "error" };
            self.patches.get_or_create(&PatchLabels { result }).inc();
        }
    }

    #[cfg(test)]
    pub(crate) fn request_count(
        &self,
        route: &'static str,
        method: &http::Method,
        status: http::StatusCode,
    ) -> u64 {
        self.requests
            .get_or_create(&RequestLabels {
                route,
                method: method.to_string(),
                status: status.as_str().to_string(),
            })
            .get()
    }

    #[cfg(test)]
    pub(crate) fn patch_count(&self, result: &'static str) -> u64 {
        self.patches.get_or_create(&PatchLabels { result }).get()
    }
}
