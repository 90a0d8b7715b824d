//! The recorded edit model.
//!
//! A mutation session produces a single ordered sequence of [`Patch`]
//! records; order is emission order and is the only ordering guarantee.
//! Patches are never deduplicated or coalesced.
//!
//! `ArrayOp` carries its operation as a first-class callable (for `sort_by`
//! it captures the caller's comparator), which is why patches are an
//! in-process structure only and are not serializable.

use crate::error::ReplayError;
use crate::node::NodeRef;
use json_cow_path::Path;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A deferred array mutation, re-invoked against a cloned array at replay
/// time.
pub type ArrayFn = Rc<dyn Fn(&mut Vec<NodeRef>, &[NodeRef]) -> Result<(), ReplayError>>;

/// The patch list shared by every handle of one mutation session.
pub type PatchList = Rc<RefCell<Vec<Patch>>>;

/// One recorded edit.
#[derive(Clone)]
pub enum Patch {
    /// Assign `value` to `prop` on the node addressed by `path`.
    Set {
        path: Path,
        prop: String,
        value: NodeRef,
    },
    /// Remove `prop` from the node addressed by `path`.
    Delete { path: Path, prop: String },
    /// A captured mutating array-method call. `path` addresses the array's
    /// own location; `snapshot` is the raw array as observed at record time
    /// (synthetic-result input, not replay data); `op` performs the real
    /// mutation during replay.
    ArrayOp {
        path: Path,
        snapshot: NodeRef,
        args: Vec<NodeRef>,
        op: ArrayFn,
    },
}

impl Patch {
    /// The tree location this patch addresses.
    pub fn path(&self) -> &Path {
        match self {
            Patch::Set { path, .. } => path,
            Patch::Delete { path, .. } => path,
            Patch::ArrayOp { path, .. } => path,
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Patch::Set { .. } => "set",
            Patch::Delete { .. } => "delete",
            Patch::ArrayOp { .. } => "array_op",
        }
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Set { path, prop, value } => f
                .debug_struct("Set")
                .field("path", path)
                .field("prop", prop)
                .field("value", value)
                .finish(),
            Patch::Delete { path, prop } => f
                .debug_struct("Delete")
                .field("path", path)
                .field("prop", prop)
                .finish(),
            Patch::ArrayOp {
                path,
                snapshot,
                args,
                ..
            } => f
                .debug_struct("ArrayOp")
                .field("path", path)
                .field("snapshot", snapshot)
                .field("args", args)
                .finish_non_exhaustive(),
        }
    }
}

/// An empty, session-fresh patch list.
pub fn new_patch_list() -> PatchList {
    Rc::new(RefCell::new(Vec::new()))
}
