//! Tree processing passes.
//!
//! A [`TreeProcessor`] rewrites a map node in place. Processors recurse into
//! nested maps themselves, so that a pass can decide not to descend into a
//! subtree it is about to drop.

use std::fmt;

use crate::node::{ConfigNode, MapNode};

/// A pass applied to each configuration source before merging.
pub trait TreeProcessor: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Rewrites `map` and, recursively, its surviving children.
    fn process(&self, map: &mut MapNode);
}

/// Applies `processor` to every map reachable from `node` without crossing
/// another map (maps are responsible for their own children).
///
/// Arrays are transparent: map elements of an array, including nested arrays,
/// are processed as if they were children of the enclosing map.
pub fn descend<P: TreeProcessor + ?Sized>(node: &mut ConfigNode, processor: &P) {
    match node {
        ConfigNode::Map(map) => processor.process(map),
        ConfigNode::Array(items) => {
            for item in items {
                descend(item, processor);
            }
        }
        ConfigNode::Value(_) => {}
    }
}
