//! json-cow — copy-on-write updates for JSON-shaped trees.
//!
//! Describe a mutation in ordinary mutate-in-place style against a tracking
//! [`Handle`]; the original tree is never modified. Every read, write,
//! deletion and array-method call through the handle is recorded as a
//! [`Patch`], and the patch list is replayed against a shallow-cloned copy
//! of the original to produce a new root that shares every untouched
//! subtree with the input.
//!
//! ```
//! use json_cow::{update, Node};
//! use serde_json::json;
//!
//! let root = Node::from_value(json!({"user": {"name": "ada"}, "tags": ["x"]}));
//!
//! let next = update(&root, |h| {
//!     let user = h.get("user").unwrap();
//!     user.handle().unwrap().set("name", "grace");
//!     let tags = h.get("tags").unwrap();
//!     tags.handle().unwrap().push("y").unwrap();
//! })
//! .unwrap();
//!
//! assert_eq!(
//!     next.to_value(),
//!     json!({"user": {"name": "grace"}, "tags": ["x", "y"]})
//! );
//! assert_eq!(
//!     root.to_value(),
//!     json!({"user": {"name": "ada"}, "tags": ["x"]})
//! );
//! ```

pub mod error;
pub mod methods;
pub mod node;
pub mod patch;
pub mod recorder;
pub mod replay;
pub mod update;

pub use error::{RecordError, ReplayError};
pub use methods::{classify, MethodKind};
pub use node::{Node, NodeRef};
pub use patch::{new_patch_list, ArrayFn, Patch, PatchList};
pub use recorder::{recorder, recorder_at, replace, Entry, Handle, Recording, WriteValue};
pub use replay::{apply_patch, apply_patches, default_clone, CloneFn};
pub use update::{update, update_with, UpdateOptions};
