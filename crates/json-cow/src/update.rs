//! The orchestrator: record a mutation procedure, then replay it.

use crate::error::RecordError;
use crate::node::NodeRef;
use crate::recorder::{recorder, Handle};
use crate::replay::{apply_patches, default_clone, CloneFn};

/// Options for [`update_with`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    /// The clone strategy replay uses along touched paths.
    pub clone: CloneFn,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            clone: default_clone,
        }
    }
}

/// Run `mutate` against a tracking handle over `state` and replay the
/// recorded patches onto a copy, returning the new root.
///
/// `state` itself is never written to; untouched subtrees are shared
/// between input and result.
///
/// # Example
///
/// ```
/// use json_cow::{update, Node};
/// use serde_json::json;
///
/// let root = Node::from_value(json!({"a": 1}));
/// let next = update(&root, |h| h.set("a", 2)).unwrap();
///
/// assert_eq!(next.to_value(), json!({"a": 2}));
/// assert_eq!(root.to_value(), json!({"a": 1}));
/// ```
pub fn update<F>(state: &NodeRef, mutate: F) -> Result<NodeRef, RecordError>
where
    F: FnOnce(&Handle),
{
    update_with(state, mutate, UpdateOptions::default())
}

/// [`update`] with an explicit clone strategy.
pub fn update_with<F>(
    state: &NodeRef,
    mutate: F,
    options: UpdateOptions,
) -> Result<NodeRef, RecordError>
where
    F: FnOnce(&Handle),
{
    let recording = recorder(state)?;
    mutate(&recording.handle);
    // Snapshot the list before replay: a sort_by comparator runs during
    // replay and may itself record through a retained handle, which needs
    // the RefCell free.
    let patches = recording.patches.borrow().clone();
    Ok(apply_patches(&patches, state, options.clone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use crate::node::Node;
    use serde_json::json;

    #[test]
    fn update_rejects_scalar_roots() {
        let root = Node::from_value(json!(1));
        assert_eq!(update(&root, |_| {}).unwrap_err(), RecordError::NotComposite);
    }

    #[test]
    fn mutate_return_value_is_ignored() {
        let root = Node::from_value(json!({"a": 1}));
        let next = update(&root, |h| {
            h.set("a", 2);
            // anything computed here is irrelevant to replay
        })
        .unwrap();
        assert_eq!(next.to_value(), json!({"a": 2}));
    }
}
