//! Field rewriting over arbitrary JSON trees
//!
//! A [`FieldRewriter`] visits every object and array reachable from the root
//! and applies a [`RewriteRule`] to each object that carries the selection key
//! (every object, for key reordering).
//! Scalars are leaves and are never descended into.

pub mod rewriter;
pub mod rule;

pub use rewriter::{apply, reorder_keys, FieldRewriter, Rewrite};
pub use rule::{KeyOrder, RewriteRule, UnknownKeys};
