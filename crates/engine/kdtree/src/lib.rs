// Kd-tree crate - spatial index over axis-aligned bounding boxes with
// surface-area-heuristic construction and early-exit ray traversal

mod build;
mod node;
mod traverse;
mod triple;

pub use build::{ExtentInBoxFn, KdBuildError, KdTreeBuilder, ObjectCost, SplitAlgorithm};
pub use node::{Axis, KdNode, KdTree};
pub use traverse::TraverseAction;
