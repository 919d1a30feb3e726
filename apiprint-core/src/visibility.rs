//! Visibility resolution over the exported type tree.
//!
//! Every type gets exactly one [`VisibilityState`], computed depth-first from
//! the module default. A nested type inherits the member default of its
//! immediately enclosing type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::hints::{self, ObfuscationHint};
use crate::types::{ModuleMetadata, TypeNode, TypeRef};

/// Resolved classification of one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    /// Type and its default-visible members are in the surface.
    Public,
    /// Type is in the surface, members default to excluded.
    MembersPrivate,
    /// Type and everything under it are excluded.
    Private,
}

impl VisibilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityState::Public => "public",
            VisibilityState::MembersPrivate => "members_private",
            VisibilityState::Private => "private",
        }
    }

    /// Whether the type token itself belongs to the surface.
    pub fn is_type_visible(&self) -> bool {
        *self != VisibilityState::Private
    }

    /// Default visibility of members without their own hint.
    pub fn members_default(&self) -> bool {
        *self == VisibilityState::Public
    }
}

/// A type with its resolved identity and state.
#[derive(Clone, Debug)]
pub struct ResolvedType<'a> {
    pub node: &'a TypeNode,
    pub namespace: &'a str,
    /// Simple name, `Outer+Inner` for nested types.
    pub name: String,
    pub state: VisibilityState,
}

impl ResolvedType<'_> {
    /// Reference to this type's generic definition.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.namespace, &self.name).with_args(
            self.node
                .generic_params
                .iter()
                .map(|p| TypeRef::generic_parameter(p))
                .collect(),
        )
    }

    pub fn full_name(&self) -> String {
        self.type_ref().full_name()
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Resolution result: types in walk order plus a lookup by definition key.
#[derive(Debug, Default)]
pub struct VisibilityMap<'a> {
    types: Vec<ResolvedType<'a>>,
    index: HashMap<String, usize>,
}

impl<'a> VisibilityMap<'a> {
    fn push(&mut self, resolved: ResolvedType<'a>) {
        self.index
            .entry(resolved.key())
            .or_insert(self.types.len());
        self.types.push(resolved);
    }

    /// State of the type with the given definition key.
    pub fn state(&self, key: &str) -> Option<VisibilityState> {
        self.index.get(key).map(|&i| self.types[i].state)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType<'a>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Baseline default derived from the module-level hint.
pub fn module_default_visible(module: &ModuleMetadata) -> Result<bool> {
    Ok(!hints::assembly_is_private(&module.attributes, &module.name)?)
}

/// Resolve visibility for exported root types and everything nested in them.
pub fn resolve(roots: &[TypeNode], module_default_visible: bool) -> Result<VisibilityMap<'_>> {
    let mut map = VisibilityMap::default();
    walk(roots, None, None, module_default_visible, &mut map)?;
    Ok(map)
}

fn walk<'a>(
    types: &'a [TypeNode],
    namespace: Option<&'a str>,
    enclosing: Option<&str>,
    parent_default: bool,
    map: &mut VisibilityMap<'a>,
) -> Result<()> {
    for node in types {
        let namespace = namespace.unwrap_or(&node.namespace);
        let name = match enclosing {
            Some(outer) => format!("{}+{}", outer, node.name),
            None => node.name.clone(),
        };

        let hint = hints::visibility_hint(&node.attributes, &format!("type {}.{}", namespace, name))?;
        let debug_only = hints::is_debug_conditional(&node.attributes);

        let own_visible = !debug_only && ObfuscationHint::is_visible(hint.as_ref(), parent_default);
        // A hint that does not apply to members leaves the inherited default alone.
        let members_default = match &hint {
            _ if debug_only => false,
            Some(h) if h.apply_to_members => h.exclude,
            _ => parent_default,
        };

        let state = if !own_visible {
            VisibilityState::Private
        } else if members_default {
            VisibilityState::Public
        } else {
            VisibilityState::MembersPrivate
        };
        debug!("Type {}.{} resolved {}", namespace, name, state.as_str());

        map.push(ResolvedType {
            node,
            namespace,
            name: name.clone(),
            state,
        });

        // Nested types of a hidden type start hidden and must opt back in.
        let nested_default = own_visible && members_default;
        walk(&node.nested, Some(namespace), Some(&name), nested_default, map)?;
    }
    Ok(())
}
