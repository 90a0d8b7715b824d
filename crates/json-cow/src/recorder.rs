//! The mutation recorder.
//!
//! A [`Handle`] is a session-scoped stand-in for a composite node of the
//! raw tree. Reads resolve against the pristine snapshot; writes, deletions
//! and mutating array-method calls append patches to the session's shared
//! list and never touch the raw tree. Child handles are created lazily per
//! dereference and are never cached: two reads of the same property yield
//! two distinct, behaviorally equivalent handles.
//!
//! Instead of ambient weak identity tables, every handle carries its
//! association triple directly: the shared patch list, its (fixed) path
//! from the root, and the raw subtree it stands for, plus its parent
//! handle. [`Handle::raw`], [`Handle::path`] and [`Handle::parent`] are the
//! inspection surface over that registry.

use crate::error::RecordError;
use crate::methods::{method_spec, MethodSpec};
use crate::node::{Node, NodeRef};
use crate::patch::{new_patch_list, ArrayFn, Patch, PatchList};
use json_cow_path::{join, parent as parent_path, Path};
use std::cmp::Ordering;
use std::rc::Rc;

/// A tracking handle over one composite node, valid for one mutation
/// session.
#[derive(Debug, Clone)]
pub struct Handle {
    raw: NodeRef,
    path: Path,
    parent: Option<Rc<Handle>>,
    patches: PatchList,
}

/// The result of a read through a handle: either a lazily wrapped composite
/// child or a plain scalar value.
#[derive(Debug, Clone)]
pub enum Entry {
    Node(Handle),
    Value(NodeRef),
}

impl Entry {
    /// The tracking handle, if this entry is a composite.
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Entry::Node(handle) => Some(handle),
            Entry::Value(_) => None,
        }
    }

    /// The scalar value, if this entry is not tracked.
    pub fn value(&self) -> Option<&NodeRef> {
        match self {
            Entry::Node(_) => None,
            Entry::Value(value) => Some(value),
        }
    }

    /// The underlying raw node either way.
    pub fn raw(&self) -> &NodeRef {
        match self {
            Entry::Node(handle) => handle.raw(),
            Entry::Value(value) => value,
        }
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, Entry::Node(_))
    }
}

/// A value being written through a handle. Conversions from handles and
/// entries unwrap to the underlying raw node before the patch is recorded,
/// so a patch never embeds a live handle.
#[derive(Debug, Clone)]
pub struct WriteValue(NodeRef);

impl WriteValue {
    pub(crate) fn into_ref(self) -> NodeRef {
        self.0
    }
}

impl From<NodeRef> for WriteValue {
    fn from(value: NodeRef) -> Self {
        WriteValue(value)
    }
}

impl From<&NodeRef> for WriteValue {
    fn from(value: &NodeRef) -> Self {
        WriteValue(value.clone())
    }
}

impl From<Node> for WriteValue {
    fn from(value: Node) -> Self {
        WriteValue(Rc::new(value))
    }
}

impl From<&Handle> for WriteValue {
    fn from(handle: &Handle) -> Self {
        WriteValue(handle.raw.clone())
    }
}

impl From<Handle> for WriteValue {
    fn from(handle: Handle) -> Self {
        WriteValue(handle.raw)
    }
}

impl From<&Entry> for WriteValue {
    fn from(entry: &Entry) -> Self {
        WriteValue(entry.raw().clone())
    }
}

impl From<Entry> for WriteValue {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Node(handle) => WriteValue(handle.raw),
            Entry::Value(value) => WriteValue(value),
        }
    }
}

impl From<serde_json::Value> for WriteValue {
    fn from(value: serde_json::Value) -> Self {
        WriteValue(Node::from_value(value))
    }
}

impl From<bool> for WriteValue {
    fn from(value: bool) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

impl From<i32> for WriteValue {
    fn from(value: i32) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

impl From<i64> for WriteValue {
    fn from(value: i64) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

impl From<f64> for WriteValue {
    fn from(value: f64) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

impl From<&str> for WriteValue {
    fn from(value: &str) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

impl From<String> for WriteValue {
    fn from(value: String) -> Self {
        WriteValue(Rc::new(Node::from(value)))
    }
}

/// A freshly built recording session: the root handle plus the patch list
/// and path it was created with.
#[derive(Debug, Clone)]
pub struct Recording {
    pub handle: Handle,
    pub patches: PatchList,
    pub path: Path,
}

/// Build a tracking handle over `state` with a fresh patch list at the root
/// path. `state` must be a composite; scalars are never wrapped.
pub fn recorder(state: &NodeRef) -> Result<Recording, RecordError> {
    recorder_at(state, new_patch_list(), Path::new())
}

/// Build a tracking handle that appends to an existing patch list, rooted
/// at `path`. Low-level entry point for callers composing their own
/// sessions.
pub fn recorder_at(
    state: &NodeRef,
    patches: PatchList,
    path: Path,
) -> Result<Recording, RecordError> {
    if !state.is_composite() {
        return Err(RecordError::NotComposite);
    }
    let handle = Handle {
        raw: state.clone(),
        path: path.clone(),
        parent: None,
        patches: patches.clone(),
    };
    Ok(Recording {
        handle,
        patches,
        path,
    })
}

/// Append a `Set` patch at the handle's own slot in its parent, equivalent
/// to assigning `value` through the parent handle. Side-channel for callers
/// holding on to a handle obtained earlier in the session.
pub fn replace(handle: &Handle, value: impl Into<WriteValue>) -> Result<(), RecordError> {
    handle.replace(value)
}

impl Handle {
    /// The raw node this handle stands for (pristine for the whole
    /// session).
    pub fn raw(&self) -> &NodeRef {
        &self.raw
    }

    /// The path from the session root to this handle. Fixed at creation.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The handle this one was dereferenced from, if any.
    pub fn parent(&self) -> Option<&Handle> {
        self.parent.as_deref()
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Read `prop` from the raw target. Reads always see the pre-mutation
    /// snapshot; patches recorded earlier in the session are invisible
    /// here. Composite children come back as fresh handles, scalars (and
    /// explicit nulls) verbatim, absent properties as `None`. Intermediate
    /// containers are never synthesized on read.
    pub fn get(&self, prop: &str) -> Option<Entry> {
        let child = self.raw.get(prop)?;
        Some(self.child_entry(prop, child))
    }

    /// Record `Set{path, prop, value}`. The raw target is not touched; a
    /// read of the same property afterwards still returns the pre-write
    /// value. Handles and entries passed as `value` are unwrapped to their
    /// raw node first.
    pub fn set(&self, prop: &str, value: impl Into<WriteValue>) {
        self.patches.borrow_mut().push(Patch::Set {
            path: self.path.clone(),
            prop: prop.to_string(),
            value: value.into().into_ref(),
        });
    }

    /// Record `Delete{path, prop}`. The raw target is not touched.
    pub fn remove(&self, prop: &str) {
        self.patches.borrow_mut().push(Patch::Delete {
            path: self.path.clone(),
            prop: prop.to_string(),
        });
    }

    /// Method-call dispatch on an array handle.
    ///
    /// Pure methods run immediately against the raw array and record
    /// nothing. Mutating methods record exactly one `ArrayOp` patch and
    /// return the synthetic result from the per-method rule table.
    /// Iterating methods need a visitor and have dedicated typed forms
    /// ([`Handle::for_each`] and friends); naming one here is an error.
    pub fn invoke(&self, method: &str, args: &[NodeRef]) -> Result<NodeRef, RecordError> {
        let Node::Array(items) = &*self.raw else {
            return Err(RecordError::InvalidCallTarget(method.to_string()));
        };
        let spec = method_spec(method)
            .ok_or_else(|| RecordError::UnsupportedMethod(method.to_string()))?;
        match spec {
            MethodSpec::Pure(call) => Ok(call(items, args)),
            MethodSpec::Iterating => Err(RecordError::VisitorRequired(method.to_string())),
            MethodSpec::Mutating { mutate, synthetic } => {
                let op: ArrayFn = Rc::new(mutate);
                self.patches.borrow_mut().push(Patch::ArrayOp {
                    path: self.path.clone(),
                    snapshot: self.raw.clone(),
                    args: args.to_vec(),
                    op,
                });
                Ok(synthetic(&self.raw, items, args))
            }
        }
    }

    /// `sort` with a caller-supplied comparator. Records one `ArrayOp`
    /// whose callable captures the comparator; returns the unmutated array
    /// reference, like `sort` itself.
    pub fn sort_by<F>(&self, compare: F) -> Result<NodeRef, RecordError>
    where
        F: Fn(&Node, &Node) -> Ordering + 'static,
    {
        if !self.raw.is_array() {
            return Err(RecordError::InvalidCallTarget("sort".to_string()));
        }
        let op: ArrayFn = Rc::new(move |items: &mut Vec<NodeRef>, _args: &[NodeRef]| {
            items.sort_by(|a, b| compare(a, b));
            Ok(())
        });
        self.patches.borrow_mut().push(Patch::ArrayOp {
            path: self.path.clone(),
            snapshot: self.raw.clone(),
            args: Vec::new(),
            op,
        });
        Ok(self.raw.clone())
    }

    /// Record `push` and return the synthetic previous length.
    pub fn push(&self, value: impl Into<WriteValue>) -> Result<NodeRef, RecordError> {
        self.invoke("push", &[value.into().into_ref()])
    }

    /// Record `pop` and return the synthetic previous last element.
    pub fn pop(&self) -> Result<NodeRef, RecordError> {
        self.invoke("pop", &[])
    }

    // ── Iterating methods ────────────────────────────────────────────────
    //
    // Executed eagerly against the live array. Composite elements are
    // wrapped in fresh handles (path = array path + index) before reaching
    // the visitor, so any edit the visitor performs is recorded exactly as
    // ordinary traversal would record it. None of these appends a patch by
    // itself.

    pub fn for_each<F>(&self, mut visit: F) -> Result<(), RecordError>
    where
        F: FnMut(Entry, usize),
    {
        for (i, entry) in self.element_entries("for_each")? {
            visit(entry, i);
        }
        Ok(())
    }

    pub fn map<T, F>(&self, mut visit: F) -> Result<Vec<T>, RecordError>
    where
        F: FnMut(Entry, usize) -> T,
    {
        let mut out = Vec::new();
        for (i, entry) in self.element_entries("map")? {
            out.push(visit(entry, i));
        }
        Ok(out)
    }

    pub fn flat_map<T, F>(&self, mut visit: F) -> Result<Vec<T>, RecordError>
    where
        F: FnMut(Entry, usize) -> Vec<T>,
    {
        let mut out = Vec::new();
        for (i, entry) in self.element_entries("flat_map")? {
            out.extend(visit(entry, i));
        }
        Ok(out)
    }

    pub fn filter<F>(&self, mut keep: F) -> Result<Vec<Entry>, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        let mut out = Vec::new();
        for (i, entry) in self.element_entries("filter")? {
            if keep(&entry, i) {
                out.push(entry);
            }
        }
        Ok(out)
    }

    pub fn find<F>(&self, mut matches: F) -> Result<Option<Entry>, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("find")? {
            if matches(&entry, i) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub fn find_index<F>(&self, mut matches: F) -> Result<Option<usize>, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("find_index")? {
            if matches(&entry, i) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Walks back-to-front and stops at the first match, so the visitor
    /// never sees elements before the hit.
    pub fn find_last<F>(&self, mut matches: F) -> Result<Option<Entry>, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("find_last")?.into_iter().rev() {
            if matches(&entry, i) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub fn find_last_index<F>(&self, mut matches: F) -> Result<Option<usize>, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("find_last_index")?.into_iter().rev() {
            if matches(&entry, i) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub fn every<F>(&self, mut check: F) -> Result<bool, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("every")? {
            if !check(&entry, i) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn some<F>(&self, mut check: F) -> Result<bool, RecordError>
    where
        F: FnMut(&Entry, usize) -> bool,
    {
        for (i, entry) in self.element_entries("some")? {
            if check(&entry, i) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// See [`replace`].
    pub fn replace(&self, value: impl Into<WriteValue>) -> Result<(), RecordError> {
        let path = parent_path(&self.path).map_err(|_| RecordError::ReplaceRoot)?;
        let prop = self.path[self.path.len() - 1].clone();
        self.patches.borrow_mut().push(Patch::Set {
            path,
            prop,
            value: value.into().into_ref(),
        });
        Ok(())
    }

    /// The session's patch list (shared with every handle of the session).
    pub fn patches(&self) -> &PatchList {
        &self.patches
    }

    fn child_entry(&self, key: &str, child: &NodeRef) -> Entry {
        if child.is_composite() {
            Entry::Node(Handle {
                raw: child.clone(),
                path: join(&self.path, key),
                parent: Some(Rc::new(self.clone())),
                patches: self.patches.clone(),
            })
        } else {
            Entry::Value(child.clone())
        }
    }

    fn element_entries(&self, method: &str) -> Result<Vec<(usize, Entry)>, RecordError> {
        let Node::Array(items) = &*self.raw else {
            return Err(RecordError::InvalidCallTarget(method.to_string()));
        };
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, child)| (i, self.child_entry(&i.to_string(), child)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_json::json;

    fn session(value: serde_json::Value) -> Recording {
        recorder(&Node::from_value(value)).unwrap()
    }

    fn n(value: serde_json::Value) -> NodeRef {
        Node::from_value(value)
    }

    #[test]
    fn scalars_are_never_wrapped() {
        assert_eq!(
            recorder(&n(json!(42))).unwrap_err(),
            RecordError::NotComposite
        );
        assert!(recorder(&n(json!({"a": 1}))).is_ok());
        assert!(recorder(&n(json!([1]))).is_ok());
    }

    #[test]
    fn reads_see_pre_mutation_snapshot() {
        let rec = session(json!({"a": 1}));
        rec.handle.set("a", 2);
        let entry = rec.handle.get("a").unwrap();
        assert_eq!(entry.raw().as_i64(), Some(1));
        assert_eq!(rec.patches.borrow().len(), 1);
    }

    #[test]
    fn reads_wrap_composites_lazily_and_distinctly() {
        let rec = session(json!({"a": {"b": 1}}));
        let first = rec.handle.get("a").unwrap();
        let second = rec.handle.get("a").unwrap();

        let first = first.handle().unwrap();
        let second = second.handle().unwrap();
        assert_eq!(first.path(), &vec!["a".to_string()]);
        assert_eq!(second.path(), &vec!["a".to_string()]);
        // Same raw target, distinct handle instances.
        assert!(Rc::ptr_eq(first.raw(), second.raw()));
        assert_eq!(first.parent().unwrap().path(), &Vec::<String>::new());
    }

    #[test]
    fn missing_and_scalar_reads() {
        let rec = session(json!({"s": "x", "nil": null}));
        assert!(rec.handle.get("missing").is_none());
        assert!(!rec.handle.get("s").unwrap().is_tracked());
        assert!(rec.handle.get("nil").unwrap().raw().is_null());
    }

    #[test]
    fn writes_unwrap_handles_before_recording() {
        let rec = session(json!({"a": {"b": 1}, "c": 2}));
        let a = rec.handle.get("a").unwrap();
        rec.handle.set("copy", a);

        let patches = rec.patches.borrow();
        let Patch::Set { value, .. } = &patches[0] else {
            panic!("expected a set patch");
        };
        // The stored value is the raw subtree, not a handle wrapper.
        assert!(Rc::ptr_eq(value, rec.handle.raw().get("a").unwrap()));
    }

    #[test]
    fn delete_records_without_mutation() {
        let rec = session(json!({"a": 1}));
        rec.handle.remove("a");
        assert_eq!(rec.handle.raw().to_value(), json!({"a": 1}));
        assert_eq!(rec.patches.borrow()[0].op_name(), "delete");
    }

    #[test]
    fn pure_invoke_records_nothing() {
        let rec = session(json!([3, 1, 2]));
        let out = rec.handle.invoke("slice", &[n(json!(1))]).unwrap();
        assert_eq!(out.to_value(), json!([1, 2]));
        assert!(rec.patches.borrow().is_empty());
    }

    #[test]
    fn mutating_invoke_records_one_patch_and_synthesizes() {
        let rec = session(json!([1, 2, 3]));
        let out = rec.handle.invoke("pop", &[]).unwrap();
        assert_eq!(out.as_i64(), Some(3));
        assert_eq!(rec.handle.raw().to_value(), json!([1, 2, 3]));

        let patches = rec.patches.borrow();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].op_name(), "array_op");
        assert!(patches[0].path().is_empty());
    }

    #[test]
    fn push_returns_previous_length() {
        let rec = session(json!([1, 2]));
        assert_eq!(rec.handle.push(3i64).unwrap().as_i64(), Some(2));
    }

    #[test]
    fn sort_by_returns_unmutated_receiver() {
        let rec = session(json!([3, 1, 2]));
        let echoed = rec
            .handle
            .sort_by(|a, b| b.as_i64().cmp(&a.as_i64()))
            .unwrap();
        assert!(Rc::ptr_eq(&echoed, rec.handle.raw()));
        assert_eq!(rec.patches.borrow().len(), 1);
    }

    #[test]
    fn invoke_usage_errors() {
        let rec = session(json!({"a": 1}));
        assert_eq!(
            rec.handle.invoke("push", &[]).unwrap_err(),
            RecordError::InvalidCallTarget("push".to_string())
        );

        let rec = session(json!([1]));
        assert_eq!(
            rec.handle.invoke("flatten", &[]).unwrap_err(),
            RecordError::UnsupportedMethod("flatten".to_string())
        );
        assert_eq!(
            rec.handle.invoke("map", &[]).unwrap_err(),
            RecordError::VisitorRequired("map".to_string())
        );
    }

    #[test]
    fn iteration_wraps_composite_elements_with_index_paths() {
        let rec = session(json!({"people": [{"name": "a"}, {"name": "b"}, 7]}));
        let people = rec.handle.get("people").unwrap();
        let people = people.handle().unwrap();

        let mut seen = Vec::new();
        people
            .for_each(|entry, i| {
                if let Some(handle) = entry.handle() {
                    seen.push(handle.path().clone());
                    handle.set("name", "renamed");
                } else {
                    seen.push(vec![i.to_string()]);
                }
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                vec!["people".to_string(), "0".to_string()],
                vec!["people".to_string(), "1".to_string()],
                vec!["2".to_string()],
            ]
        );
        // Only the visitor's own writes were recorded.
        assert_eq!(rec.patches.borrow().len(), 2);
        assert_eq!(
            rec.patches.borrow()[0].path(),
            &vec!["people".to_string(), "0".to_string()]
        );
    }

    #[test]
    fn iterating_helpers() {
        let rec = session(json!([1, 2, 3, 4]));
        let h = &rec.handle;

        let doubled = h.map(|e, _| e.raw().as_i64().unwrap() * 2).unwrap();
        assert_eq!(doubled, vec![2, 4, 6, 8]);

        let evens = h.filter(|e, _| e.raw().as_i64().unwrap() % 2 == 0).unwrap();
        assert_eq!(evens.len(), 2);

        let found = h.find(|e, _| e.raw().as_i64() == Some(3)).unwrap();
        assert_eq!(found.unwrap().raw().as_i64(), Some(3));
        assert_eq!(h.find_index(|e, _| e.raw().as_i64() == Some(3)).unwrap(), Some(2));
        assert_eq!(h.find_last(|_, i| i < 2).unwrap().unwrap().raw().as_i64(), Some(2));
        assert_eq!(h.find_last_index(|_, i| i < 2).unwrap(), Some(1));

        assert!(h.every(|e, _| e.raw().as_i64().is_some()).unwrap());
        assert!(h.some(|e, _| e.raw().as_i64() == Some(4)).unwrap());
        assert!(!h.some(|e, _| e.raw().as_i64() == Some(9)).unwrap());

        let pairs = h
            .flat_map(|e, i| vec![i as i64, e.raw().as_i64().unwrap()])
            .unwrap();
        assert_eq!(pairs.len(), 8);

        assert!(rec.patches.borrow().is_empty());
    }

    #[test]
    fn find_last_scans_backwards_and_short_circuits() {
        let rec = session(json!([1, 2, 3, 4]));
        let mut visited = Vec::new();
        let found = rec
            .handle
            .find_last(|e, i| {
                visited.push(i);
                e.raw().as_i64() == Some(2)
            })
            .unwrap();

        assert_eq!(found.unwrap().raw().as_i64(), Some(2));
        // Elements before the hit are never visited.
        assert_eq!(visited, vec![3, 2, 1]);

        visited.clear();
        let idx = rec
            .handle
            .find_last_index(|_, i| {
                visited.push(i);
                i == 2
            })
            .unwrap();
        assert_eq!(idx, Some(2));
        assert_eq!(visited, vec![3, 2]);
    }

    #[test]
    fn replace_targets_parent_slot() {
        let rec = session(json!({"a": {"b": 1}}));
        let a = rec.handle.get("a").unwrap();
        let a = a.handle().unwrap().clone();

        replace(&a, json!({"b": 9})).unwrap();
        let patches = rec.patches.borrow();
        let Patch::Set { path, prop, value } = &patches[0] else {
            panic!("expected a set patch");
        };
        assert!(path.is_empty());
        assert_eq!(prop, "a");
        assert_eq!(value.to_value(), json!({"b": 9}));
    }

    #[test]
    fn replace_on_root_fails() {
        let rec = session(json!({"a": 1}));
        assert_eq!(
            rec.handle.replace(json!(1)).unwrap_err(),
            RecordError::ReplaceRoot
        );
    }

    #[test]
    fn patch_order_is_emission_order() {
        let rec = session(json!({"a": 1, "xs": [1]}));
        rec.handle.set("a", 2);
        rec.handle.remove("a");
        let xs = rec.handle.get("xs").unwrap();
        xs.handle().unwrap().push(2i64).unwrap();
        rec.handle.set("a", 3);

        let names: Vec<_> = rec
            .patches
            .borrow()
            .iter()
            .map(|p| p.op_name())
            .collect();
        assert_eq!(names, vec!["set", "delete", "array_op", "set"]);
    }
}
