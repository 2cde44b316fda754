// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join trees handed to the compiler

use crate::model::StatementPattern;
use std::fmt;

/// A tree of inner joins over statement patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTree {
    Pattern(StatementPattern),
    Join {
        left: Box<JoinTree>,
        right: Box<JoinTree>,
        /// Variable both sides can be read in order of; requests a merge join
        merge: Option<String>,
    },
}

impl JoinTree {
    pub fn pattern(pattern: StatementPattern) -> Self {
        JoinTree::Pattern(pattern)
    }

    pub fn join(left: JoinTree, right: JoinTree) -> Self {
        JoinTree::Join {
            left: Box::new(left),
            right: Box::new(right),
            merge: None,
        }
    }

    pub fn merge_join(left: JoinTree, right: JoinTree, variable: impl Into<String>) -> Self {
        JoinTree::Join {
            left: Box::new(left),
            right: Box::new(right),
            merge: Some(variable.into()),
        }
    }

    /// Left-deep join of `patterns`; `None` when empty
    pub fn bgp(patterns: Vec<StatementPattern>) -> Option<Self> {
        let mut iter = patterns.into_iter();
        let first = JoinTree::Pattern(iter.next()?);
        Some(iter.fold(first, |tree, pattern| {
            JoinTree::join(tree, JoinTree::Pattern(pattern))
        }))
    }

    /// Both children when this is a join of two patterns
    pub fn as_pattern_pair(&self) -> Option<(&StatementPattern, &StatementPattern, Option<&str>)> {
        match self {
            JoinTree::Join { left, right, merge } => match (left.as_ref(), right.as_ref()) {
                (JoinTree::Pattern(l), JoinTree::Pattern(r)) => Some((l, r, merge.as_deref())),
                _ => None,
            },
            JoinTree::Pattern(_) => None,
        }
    }
}

impl fmt::Display for JoinTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinTree::Pattern(pattern) => write!(f, "({})", pattern),
            JoinTree::Join { left, right, merge } => {
                write!(f, "Join[{} , {}", left, right)?;
                if let Some(var) = merge {
                    write!(f, " merge ?{}", var)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A join tree read as a basic graph pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatBgp {
    /// Patterns in left-to-right order
    pub patterns: Vec<StatementPattern>,
    /// Merge variable of a join over the first two patterns
    pub seed_merge: Option<String>,
    /// Merge hints elsewhere in the tree
    pub other_merges: Vec<String>,
}

/// Collect the patterns of `tree` left to right
pub fn flatten_bgp(tree: &JoinTree) -> FlatBgp {
    let mut flat = FlatBgp {
        patterns: Vec::new(),
        seed_merge: None,
        other_merges: Vec::new(),
    };
    collect(tree, &mut flat);
    flat
}

fn collect(tree: &JoinTree, flat: &mut FlatBgp) {
    match tree {
        JoinTree::Pattern(pattern) => flat.patterns.push(pattern.clone()),
        JoinTree::Join { left, right, merge } => {
            let seeds_chain = flat.patterns.is_empty()
                && matches!(
                    (left.as_ref(), right.as_ref()),
                    (JoinTree::Pattern(_), JoinTree::Pattern(_))
                );
            if let Some(var) = merge {
                if seeds_chain {
                    flat.seed_merge = Some(var.clone());
                } else {
                    flat.other_merges.push(var.clone());
                }
            }
            collect(left, flat);
            collect(right, flat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::pattern;

    #[test]
    fn test_bgp_is_left_deep() {
        let tree = JoinTree::bgp(vec![
            pattern("?a", "ex:p", "?b"),
            pattern("?b", "ex:p", "?c"),
            pattern("?c", "ex:p", "?d"),
        ])
        .unwrap();
        match &tree {
            JoinTree::Join { left, right, .. } => {
                assert!(matches!(left.as_ref(), JoinTree::Join { .. }));
                assert!(matches!(right.as_ref(), JoinTree::Pattern(_)));
            }
            JoinTree::Pattern(_) => panic!("expected a join"),
        }
        assert_eq!(flatten_bgp(&tree).patterns.len(), 3);
        assert!(JoinTree::bgp(Vec::new()).is_none());
    }

    #[test]
    fn test_flatten_locates_seed_merge() {
        let seed = JoinTree::merge_join(
            JoinTree::pattern(pattern("?x", "ex:p", "?y")),
            JoinTree::pattern(pattern("?y", "ex:q", "?z")),
            "y",
        );
        let tree = JoinTree::merge_join(seed, JoinTree::pattern(pattern("?z", "ex:r", "?w")), "z");
        let flat = flatten_bgp(&tree);
        assert_eq!(flat.patterns.len(), 3);
        assert_eq!(flat.seed_merge.as_deref(), Some("y"));
        assert_eq!(flat.other_merges, vec!["z".to_string()]);
    }

    #[test]
    fn test_merge_on_right_subtree_is_not_seed() {
        let right = JoinTree::merge_join(
            JoinTree::pattern(pattern("?y", "ex:q", "?z")),
            JoinTree::pattern(pattern("?z", "ex:r", "?w")),
            "z",
        );
        let tree = JoinTree::join(JoinTree::pattern(pattern("?x", "ex:p", "?y")), right);
        let flat = flatten_bgp(&tree);
        assert_eq!(flat.seed_merge, None);
        assert_eq!(flat.other_merges, vec!["z".to_string()]);
    }
}
