use canary_controller_k8s_api::RoutingObject;
use tracing::trace;

/// Filters out routing objects that have not opted into canary management.
/// This is the only gate applied before aggregation and patch synthesis.
pub fn managed<'o>(
    objects: impl IntoIterator<Item = &'o RoutingObject>,
) -> impl Iterator<Item = &'o RoutingObject> {
    objects.into_iter().filter(|obj| {
        let managed = obj.is_managed();
        if !managed {
            trace!(name = %obj.name(), "Skipping unmanaged object");
        }
        managed
    })
}
