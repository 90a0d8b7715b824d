//! The patch replay engine.
//!
//! Replay folds a patch list onto the original root with copy-on-write
//! semantics: for each patch, every node along the patch's path is cloned
//! shallowly (children shared), the clone chain is stitched back together,
//! and the patch's effect is applied at the terminal node. Sibling subtrees
//! stay reference-identical with the input tree.
//!
//! A failing patch (a deferred array mutation that errors, or a path that
//! cannot be addressed) is logged and dropped; replay continues with the
//! next patch. That is the single accepted partial-failure mode.

use crate::error::ReplayError;
use crate::node::{Node, NodeRef};
use crate::patch::Patch;
use json_cow_path::{format_path, is_integer, PathStep};
use std::rc::Rc;

/// A pluggable shallow-clone strategy.
///
/// The default is the derived clone, which copies the node itself and
/// shares all children.
pub type CloneFn = fn(&Node) -> Node;

/// The default clone strategy: shallow for arrays and objects, plain copy
/// for scalars.
pub fn default_clone(node: &Node) -> Node {
    node.clone()
}

/// Apply a single patch, returning the new root.
///
/// Only the ancestors along `patch.path()` are cloned; everything else is
/// shared with `state`. If the patch cannot be applied the original
/// `state` is returned unchanged (and the failure is logged).
pub fn apply_patch(patch: &Patch, state: &NodeRef, clone_fn: CloneFn) -> NodeRef {
    let mut root = clone_fn(state);
    match walk_and_apply(&mut root, patch, clone_fn) {
        Ok(()) => Rc::new(root),
        Err(error) => {
            tracing::error!(
                op = patch.op_name(),
                path = %format_path(patch.path()),
                %error,
                "replay failed; patch dropped"
            );
            state.clone()
        }
    }
}

/// Apply a patch list in emission order, each result feeding the next
/// call. Later patches see the effects of earlier ones; every path is
/// interpreted against the current top, never a stale session-time state.
pub fn apply_patches(patches: &[Patch], state: &NodeRef, clone_fn: CloneFn) -> NodeRef {
    let mut doc = state.clone();
    for patch in patches {
        doc = apply_patch(patch, &doc, clone_fn);
    }
    doc
}

fn walk_and_apply(root: &mut Node, patch: &Patch, clone_fn: CloneFn) -> Result<(), ReplayError> {
    let mut cur = root;
    for step in patch.path() {
        cur = step_into(cur, step, clone_fn)?;
    }
    match patch {
        Patch::Set { prop, value, .. } => set_prop(cur, prop, value),
        Patch::Delete { prop, .. } => {
            delete_prop(cur, prop);
            Ok(())
        }
        Patch::ArrayOp { op, args, .. } => match cur {
            Node::Array(items) => op(items, args),
            _ => Err(ReplayError::NotAnArray),
        },
    }
}

/// Clone (or synthesize) the child under `key` into the current node and
/// descend into the fresh clone.
fn step_into<'a>(
    cur: &'a mut Node,
    key: &PathStep,
    clone_fn: CloneFn,
) -> Result<&'a mut Node, ReplayError> {
    // A scalar mid-path is replaced by a container that can hold the key.
    if !cur.is_composite() {
        *cur = empty_container(key);
    }
    match cur {
        Node::Object(map) => {
            let child = match map.get(key) {
                Some(existing) => clone_fn(existing),
                None => synthesized_child(key),
            };
            let slot = map
                .entry(key.clone())
                .or_insert_with(|| Rc::new(Node::Null));
            *slot = Rc::new(child);
            Ok(Rc::make_mut(slot))
        }
        Node::Array(items) => {
            let idx: usize = key
                .parse()
                .map_err(|_| ReplayError::InvalidIndex(key.clone()))?;
            if idx >= items.len() {
                items.resize(idx + 1, Rc::new(Node::Null));
            }
            let child = clone_fn(&items[idx]);
            let slot = &mut items[idx];
            *slot = Rc::new(child);
            Ok(Rc::make_mut(slot))
        }
        _ => unreachable!("scalar was replaced above"),
    }
}

/// A missing child is synthesized as an array when its key looks numeric,
/// otherwise as an empty object.
fn synthesized_child(key: &str) -> Node {
    if is_integer(key) {
        Node::Array(Vec::new())
    } else {
        Node::Object(Default::default())
    }
}

/// A container able to hold `key` directly: an array for index-shaped
/// keys, an object otherwise.
fn empty_container(key: &str) -> Node {
    if is_integer(key) {
        Node::Array(Vec::new())
    } else {
        Node::Object(Default::default())
    }
}

fn set_prop(cur: &mut Node, prop: &str, value: &NodeRef) -> Result<(), ReplayError> {
    if !cur.is_composite() {
        *cur = empty_container(prop);
    }
    match cur {
        Node::Object(map) => {
            map.insert(prop.to_string(), value.clone());
            Ok(())
        }
        Node::Array(items) => {
            let idx: usize = prop
                .parse()
                .map_err(|_| ReplayError::InvalidIndex(prop.to_string()))?;
            if idx >= items.len() {
                // Holes past the end become nulls.
                items.resize(idx + 1, Rc::new(Node::Null));
            }
            items[idx] = value.clone();
            Ok(())
        }
        _ => unreachable!("scalar was replaced above"),
    }
}

fn delete_prop(cur: &mut Node, prop: &str) {
    match cur {
        Node::Object(map) => {
            map.shift_remove(prop);
        }
        Node::Array(items) => {
            // Deleting an array slot leaves a hole, which is null here.
            if let Ok(idx) = prop.parse::<usize>() {
                if idx < items.len() {
                    items[idx] = Rc::new(Node::Null);
                }
            }
        }
        _ => {}
    }
}
