//! Group tag policies.
//!
//! A group tag clusters instances from the same rollout. It is derived from
//! the instance name, so it depends on a naming scheme this crate does not
//! control; policies are plain functions and can be swapped on the reconciler.

/// Derives a group tag from an instance identity.
pub type GroupTagFn = fn(&str) -> String;

/// Deployment-generated names look like `<deployment>-<replicaset hash>-<pod suffix>`.
/// Returns the second-to-last `-` segment, or an empty tag when there is only one segment.
pub fn replica_set_tag(identity: &str) -> String {
    let mut segments = identity.rsplit('-');
    match (segments.next(), segments.next()) {
        (Some(_), Some(tag)) => tag.to_string(),
        _ => String::new(),
    }
}
