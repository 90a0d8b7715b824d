//! Per-method array semantics.
//!
//! Every supported array method falls in exactly one of three categories:
//!
//! - **Pure** — executed immediately against the raw array, result returned
//!   as-is, no patch recorded.
//! - **Mutating** — deferred: one `ArrayOp` patch is recorded and the caller
//!   receives a synthetic result computed from the pre-mutation snapshot
//!   (what the call would have returned had it really run).
//! - **Iterating** — visitor-taking methods, executed eagerly with each
//!   composite element wrapped in a fresh handle.
//!
//! Method identifiers are the snake_cased upstream names. The semantics of
//! the individual operations follow the upstream array behavior: negative
//! indices count from the end, ranges clamp, `concat` flattens array
//! arguments one level, and string coercion renders null as the empty
//! string inside joins.

use crate::error::ReplayError;
use crate::node::{Node, NodeRef};
use serde_json::Number;
use std::cmp::Ordering;
use std::rc::Rc;

/// Which of the three sets a method name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Pure,
    Mutating,
    Iterating,
}

pub(crate) type PureFn = fn(&[NodeRef], &[NodeRef]) -> NodeRef;
pub(crate) type SyntheticFn = fn(&NodeRef, &[NodeRef], &[NodeRef]) -> NodeRef;
pub(crate) type MutateFn = fn(&mut Vec<NodeRef>, &[NodeRef]) -> Result<(), ReplayError>;

/// A classified method: its category plus the functions the recorder and
/// replay engine need for it.
pub(crate) enum MethodSpec {
    Pure(PureFn),
    Mutating {
        mutate: MutateFn,
        synthetic: SyntheticFn,
    },
    Iterating,
}

/// The static classification table.
pub(crate) fn method_spec(name: &str) -> Option<MethodSpec> {
    Some(match name {
        "at" => MethodSpec::Pure(pure::at),
        "slice" => MethodSpec::Pure(pure::slice),
        "concat" => MethodSpec::Pure(pure::concat),
        "entries" => MethodSpec::Pure(pure::entries),
        "includes" => MethodSpec::Pure(pure::includes),
        "join" => MethodSpec::Pure(pure::join),
        "keys" => MethodSpec::Pure(pure::keys),
        "index_of" => MethodSpec::Pure(pure::index_of),
        "last_index_of" => MethodSpec::Pure(pure::last_index_of),
        "to_reversed" => MethodSpec::Pure(pure::to_reversed),
        "to_sorted" => MethodSpec::Pure(pure::to_sorted),
        "to_spliced" => MethodSpec::Pure(pure::to_spliced),
        "to_string" => MethodSpec::Pure(pure::to_string),
        "to_locale_string" => MethodSpec::Pure(pure::to_string),
        "values" => MethodSpec::Pure(pure::values),

        "fill" => MethodSpec::Mutating {
            mutate: mutating::fill,
            synthetic: synthetic::fill,
        },
        "pop" => MethodSpec::Mutating {
            mutate: mutating::pop,
            synthetic: synthetic::pop,
        },
        "push" => MethodSpec::Mutating {
            mutate: mutating::push,
            synthetic: synthetic::prev_len,
        },
        "shift" => MethodSpec::Mutating {
            mutate: mutating::shift,
            synthetic: synthetic::shift,
        },
        "unshift" => MethodSpec::Mutating {
            mutate: mutating::unshift,
            synthetic: synthetic::prev_len,
        },
        "splice" => MethodSpec::Mutating {
            mutate: mutating::splice,
            synthetic: synthetic::splice,
        },
        "sort" => MethodSpec::Mutating {
            mutate: mutating::sort,
            synthetic: synthetic::receiver,
        },
        "reverse" => MethodSpec::Mutating {
            mutate: mutating::reverse,
            synthetic: synthetic::receiver,
        },
        "with" => MethodSpec::Mutating {
            mutate: mutating::with,
            synthetic: synthetic::receiver,
        },

        "for_each" | "find" | "filter" | "find_index" | "find_last" | "find_last_index"
        | "every" | "some" | "map" | "flat_map" => MethodSpec::Iterating,

        _ => return None,
    })
}

/// Classify a method name, if it is supported at all.
pub fn classify(name: &str) -> Option<MethodKind> {
    method_spec(name).map(|spec| match spec {
        MethodSpec::Pure(_) => MethodKind::Pure,
        MethodSpec::Mutating { .. } => MethodKind::Mutating,
        MethodSpec::Iterating => MethodKind::Iterating,
    })
}

// ── Shared helpers ────────────────────────────────────────────────────────

fn null() -> NodeRef {
    Rc::new(Node::Null)
}

fn number(n: i64) -> NodeRef {
    Rc::new(Node::Number(Number::from(n)))
}

fn array(items: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Array(items))
}

fn int_arg(args: &[NodeRef], i: usize) -> Option<i64> {
    match args.get(i).map(|a| &**a) {
        Some(Node::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Normalize a possibly-negative relative index into `0..=len`.
fn rel_index(i: i64, len: usize) -> usize {
    if i < 0 {
        (len as i64 + i).max(0) as usize
    } else {
        (i as usize).min(len)
    }
}

/// The `(start, delete_count)` window of a splice call, with the upstream
/// defaulting rules: no arguments deletes nothing, a lone start deletes to
/// the end, and an explicit count clamps to the remaining length.
fn splice_window(len: usize, args: &[NodeRef]) -> (usize, usize) {
    let start = rel_index(int_arg(args, 0).unwrap_or(0), len);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => int_arg(args, 1).unwrap_or(0).clamp(0, (len - start) as i64) as usize,
    };
    (start, delete_count)
}

/// Element rendering inside a join: null renders empty.
fn join_part(node: &Node) -> String {
    match node {
        Node::Null => String::new(),
        other => string_of(other),
    }
}

/// Standalone string coercion, as used by the default sort order.
fn string_of(node: &Node) -> String {
    match node {
        Node::Null => "null".to_string(),
        Node::Bool(b) => b.to_string(),
        Node::Number(n) => n.to_string(),
        Node::String(s) => s.clone(),
        Node::Array(items) => items
            .iter()
            .map(|c| join_part(c))
            .collect::<Vec<_>>()
            .join(","),
        Node::Object(_) => "[object Object]".to_string(),
    }
}

/// Default element ordering: lexicographic on the string coercion.
pub(crate) fn default_compare(a: &Node, b: &Node) -> Ordering {
    string_of(a).cmp(&string_of(b))
}

// ── Pure methods ──────────────────────────────────────────────────────────

mod pure {
    use super::*;

    pub(crate) fn at(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let i = int_arg(args, 0).unwrap_or(0);
        let len = items.len() as i64;
        let idx = if i < 0 { len + i } else { i };
        if (0..len).contains(&idx) {
            items[idx as usize].clone()
        } else {
            null()
        }
    }

    pub(crate) fn slice(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let len = items.len();
        let start = rel_index(int_arg(args, 0).unwrap_or(0), len);
        let end = rel_index(int_arg(args, 1).unwrap_or(len as i64), len);
        if start < end {
            array(items[start..end].to_vec())
        } else {
            array(Vec::new())
        }
    }

    pub(crate) fn concat(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let mut out = items.to_vec();
        for arg in args {
            match &**arg {
                Node::Array(xs) => out.extend(xs.iter().cloned()),
                _ => out.push(arg.clone()),
            }
        }
        array(out)
    }

    pub(crate) fn entries(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| array(vec![number(i as i64), item.clone()]))
                .collect(),
        )
    }

    pub(crate) fn includes(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let needle = args.first().cloned().unwrap_or_else(null);
        Rc::new(Node::Bool(items.iter().any(|item| *item == needle)))
    }

    pub(crate) fn join(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let sep = args
            .first()
            .and_then(|a| a.as_str().map(str::to_string))
            .unwrap_or_else(|| ",".to_string());
        let joined = items
            .iter()
            .map(|item| join_part(item))
            .collect::<Vec<_>>()
            .join(&sep);
        Rc::new(Node::String(joined))
    }

    pub(crate) fn keys(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        array((0..items.len()).map(|i| number(i as i64)).collect())
    }

    pub(crate) fn index_of(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let needle = args.first().cloned().unwrap_or_else(null);
        let found = items.iter().position(|item| *item == needle);
        number(found.map_or(-1, |i| i as i64))
    }

    pub(crate) fn last_index_of(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let needle = args.first().cloned().unwrap_or_else(null);
        let found = items.iter().rposition(|item| *item == needle);
        number(found.map_or(-1, |i| i as i64))
    }

    pub(crate) fn to_reversed(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        array(items.iter().rev().cloned().collect())
    }

    pub(crate) fn to_sorted(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        let mut out = items.to_vec();
        out.sort_by(|a, b| default_compare(a, b));
        array(out)
    }

    pub(crate) fn to_spliced(items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let mut out = items.to_vec();
        let _ = mutating::splice(&mut out, args);
        array(out)
    }

    pub(crate) fn to_string(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        join(items, &[])
    }

    pub(crate) fn values(items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        array(items.to_vec())
    }
}

// ── Mutating methods (replay side) ────────────────────────────────────────

mod mutating {
    use super::*;

    pub(crate) fn fill(items: &mut Vec<NodeRef>, args: &[NodeRef]) -> Result<(), ReplayError> {
        let len = items.len();
        let value = args.first().cloned().unwrap_or_else(null);
        let start = rel_index(int_arg(args, 1).unwrap_or(0), len);
        let end = rel_index(int_arg(args, 2).unwrap_or(len as i64), len);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
        Ok(())
    }

    pub(crate) fn pop(items: &mut Vec<NodeRef>, _args: &[NodeRef]) -> Result<(), ReplayError> {
        items.pop();
        Ok(())
    }

    pub(crate) fn push(items: &mut Vec<NodeRef>, args: &[NodeRef]) -> Result<(), ReplayError> {
        items.extend_from_slice(args);
        Ok(())
    }

    pub(crate) fn shift(items: &mut Vec<NodeRef>, _args: &[NodeRef]) -> Result<(), ReplayError> {
        if !items.is_empty() {
            items.remove(0);
        }
        Ok(())
    }

    pub(crate) fn unshift(items: &mut Vec<NodeRef>, args: &[NodeRef]) -> Result<(), ReplayError> {
        for (i, arg) in args.iter().enumerate() {
            items.insert(i, arg.clone());
        }
        Ok(())
    }

    pub(crate) fn splice(items: &mut Vec<NodeRef>, args: &[NodeRef]) -> Result<(), ReplayError> {
        let (start, delete_count) = splice_window(items.len(), args);
        let inserted: Vec<NodeRef> = args.iter().skip(2).cloned().collect();
        items.splice(start..start + delete_count, inserted);
        Ok(())
    }

    pub(crate) fn sort(items: &mut Vec<NodeRef>, _args: &[NodeRef]) -> Result<(), ReplayError> {
        items.sort_by(|a, b| default_compare(a, b));
        Ok(())
    }

    pub(crate) fn reverse(items: &mut Vec<NodeRef>, _args: &[NodeRef]) -> Result<(), ReplayError> {
        items.reverse();
        Ok(())
    }

    pub(crate) fn with(items: &mut Vec<NodeRef>, args: &[NodeRef]) -> Result<(), ReplayError> {
        let len = items.len();
        let index = int_arg(args, 0).unwrap_or(0);
        let actual = if index < 0 { len as i64 + index } else { index };
        if !(0..len as i64).contains(&actual) {
            return Err(ReplayError::IndexOutOfBounds { index, len });
        }
        items[actual as usize] = args.get(1).cloned().unwrap_or_else(null);
        Ok(())
    }
}

// ── Synthetic return values for deferred mutations ────────────────────────
//
// Computed from the pre-mutation snapshot, so length-reporting methods
// return the previous length (the mutation has not happened yet).

mod synthetic {
    use super::*;

    pub(crate) fn fill(_raw: &NodeRef, _items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        args.first().cloned().unwrap_or_else(null)
    }

    pub(crate) fn pop(_raw: &NodeRef, items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        items.last().cloned().unwrap_or_else(null)
    }

    pub(crate) fn shift(_raw: &NodeRef, items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        items.first().cloned().unwrap_or_else(null)
    }

    pub(crate) fn prev_len(_raw: &NodeRef, items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        number(items.len() as i64)
    }

    pub(crate) fn splice(_raw: &NodeRef, items: &[NodeRef], args: &[NodeRef]) -> NodeRef {
        let (start, delete_count) = splice_window(items.len(), args);
        array(items[start..start + delete_count].to_vec())
    }

    /// sort / reverse / with hand back the (unmutated) receiver itself.
    pub(crate) fn receiver(raw: &NodeRef, _items: &[NodeRef], _args: &[NodeRef]) -> NodeRef {
        raw.clone()
    }
}
