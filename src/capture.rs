//! Capture tries: the minimal shape of the closure a worklet needs.
//!
//! A worklet reading only `a.b` captures `{ a: { b: a.b } }`, never the whole
//! of `a`. Once any path stops at a root (or an inner property), that node is
//! captured whole and no narrower path is recorded beneath it.

use indexmap::IndexMap;
use oxc_ast::ast::{Expression, IdentifierReference};
use serde::{Deserialize, Serialize};

use crate::tables::{CAPTURE_BLACKLIST, REACTIVE_VALUE_PROPERTY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureTrie {
    /// Capture this value whole; holds the access expression that reads it
    /// in the defining scope (`a`, `a.b`).
    Terminal(String),
    /// Capture only these properties.
    Partial(IndexMap<String, CaptureTrie>),
}

impl Default for CaptureTrie {
    fn default() -> Self {
        CaptureTrie::Partial(IndexMap::new())
    }
}

impl CaptureTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one access path, `path[0]` being the root variable.
    ///
    /// Terminal wins both ways: a path passing through a terminal node is
    /// dropped, and a path ending at a node replaces whatever narrower
    /// captures were recorded under it.
    pub fn insert(&mut self, path: &[String]) {
        let mut node = self;
        for (depth, key) in path.iter().enumerate() {
            let children = match node {
                CaptureTrie::Terminal(_) => return,
                CaptureTrie::Partial(children) => children,
            };
            if depth + 1 == path.len() {
                children.insert(key.clone(), CaptureTrie::Terminal(path.join(".")));
                return;
            }
            node = children
                .entry(key.clone())
                .or_insert_with(|| CaptureTrie::Partial(IndexMap::new()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&CaptureTrie> {
        match self {
            CaptureTrie::Terminal(_) => None,
            CaptureTrie::Partial(children) => children.get(key),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureTrie::Terminal(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CaptureTrie::Terminal(_) => false,
            CaptureTrie::Partial(children) => children.is_empty(),
        }
    }

    /// Captured root names, in first-reference order.
    pub fn roots(&self) -> Vec<&str> {
        match self {
            CaptureTrie::Terminal(_) => vec![],
            CaptureTrie::Partial(children) => children.keys().map(|k| k.as_str()).collect(),
        }
    }

    /// Object literal that snapshots the capture in the defining scope, e.g.
    /// `{a: {b: a.b}, c: c}`.
    pub fn closure_source(&self) -> String {
        match self {
            CaptureTrie::Terminal(access) => access.clone(),
            CaptureTrie::Partial(children) => {
                let entries: Vec<String> = children
                    .iter()
                    .map(|(key, child)| format!("{}: {}", key, child.closure_source()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBER CHAINS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub enum ChainLink<'e, 'a> {
    Property { name: &'e str, optional: bool },
    Computed(&'e Expression<'a>),
    Other,
}

/// A member-access chain flattened from its root identifier outward:
/// `a.b[i].c` is root `a` with links `[b, [i], c]`.
#[derive(Debug)]
pub struct MemberChain<'e, 'a> {
    pub root: &'e IdentifierReference<'a>,
    pub links: Vec<ChainLink<'e, 'a>>,
}

impl<'e, 'a> MemberChain<'e, 'a> {
    /// Flattens `expr` if it is a member access rooted at a plain identifier.
    pub fn from_expression(expr: &'e Expression<'a>) -> Option<Self> {
        let mut links = Vec::new();
        let mut current = expr;
        let root = loop {
            match current {
                Expression::StaticMemberExpression(member) => {
                    links.push(ChainLink::Property {
                        name: member.property.name.as_str(),
                        optional: member.optional,
                    });
                    current = &member.object;
                }
                Expression::ComputedMemberExpression(member) => {
                    links.push(ChainLink::Computed(&member.expression));
                    current = &member.object;
                }
                Expression::PrivateFieldExpression(member) => {
                    links.push(ChainLink::Other);
                    current = &member.object;
                }
                Expression::Identifier(ident) => break &**ident,
                _ => return None,
            }
        };
        if links.is_empty() {
            return None;
        }
        links.reverse();
        Some(MemberChain { root, links })
    }

    /// Longest capturable prefix, root included. The walk stops at the
    /// first computed, optional or private link, and at any property that
    /// is reserved or blacklisted.
    pub fn capture_path(&self) -> Vec<String> {
        let mut path = vec![self.root.name.to_string()];
        for link in &self.links {
            match link {
                ChainLink::Property {
                    name,
                    optional: false,
                } if is_capturable_property(name) => path.push((*name).to_string()),
                _ => break,
            }
        }
        path
    }

    /// Property expressions of computed links; these are ordinary reads.
    pub fn computed_expressions(&self) -> impl Iterator<Item = &'e Expression<'a>> + '_ {
        self.links.iter().filter_map(|link| match link {
            ChainLink::Computed(expr) => Some(*expr),
            _ => None,
        })
    }
}

pub fn is_capturable_property(name: &str) -> bool {
    name != REACTIVE_VALUE_PROPERTY && !CAPTURE_BLACKLIST.contains(name)
}
