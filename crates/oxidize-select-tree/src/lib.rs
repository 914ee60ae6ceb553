pub mod decision_tree;

pub use decision_tree::*;
