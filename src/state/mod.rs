//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `NodeState`: the lifecycle every crawl node moves through
//! - `Node`: per-node holder that validates and logs transitions

mod node_state;

pub use node_state::{Node, NodeKind, NodeState};
