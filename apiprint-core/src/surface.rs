//! Surface extraction: one module in, its signature set out.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{Result, SurfaceError};
use crate::hints::ObfuscationHint;
use crate::provider::ModuleSet;
use crate::render::{SignatureEntry, SignatureRenderer};
use crate::types::ModuleMetadata;
use crate::visibility::{self, VisibilityState};

/// A module-declared exception to the diff.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IgnoreEntry {
    /// Exact token to match.
    pub pattern: String,
    /// Count the token even though it would otherwise be suppressed.
    pub force_included: bool,
}

/// The extracted API surface of one module.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Surface {
    pub module: String,
    pub entries: Vec<SignatureEntry>,
    pub ignores: Vec<IgnoreEntry>,
}

impl Surface {
    /// Surface of a module that does not exist (yet).
    pub fn empty(module: &str) -> Self {
        Self {
            module: module.to_string(),
            ..Default::default()
        }
    }

    /// Tokens that form the contract: public entries plus private entries
    /// re-admitted by a forced ignore entry.
    pub fn public_tokens(&self) -> BTreeSet<&str> {
        let forced: HashSet<&str> = self
            .ignores
            .iter()
            .filter(|i| i.force_included)
            .map(|i| i.pattern.as_str())
            .collect();
        self.entries
            .iter()
            .filter(|e| e.is_public || forced.contains(e.token.as_str()))
            .map(|e| e.token.as_str())
            .collect()
    }

    /// Hex xxh3 digest over the sorted public tokens.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Xxh3::new();
        for token in self.public_tokens() {
            hasher.update(token.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:016x}", hasher.digest())
    }

    pub fn public_count(&self) -> usize {
        self.public_tokens().len()
    }
}

/// Runs resolution and rendering over a loaded module.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceExtractor {
    renderer: SignatureRenderer,
}

impl SurfaceExtractor {
    pub fn new(check_inheritance: bool) -> Self {
        Self {
            renderer: SignatureRenderer::new(check_inheritance),
        }
    }

    /// Extract the full signature set and ignore list of the root module.
    pub fn extract(&self, set: &ModuleSet) -> Result<Surface> {
        let start = Instant::now();
        let module = set.root();
        let default_visible = visibility::module_default_visible(module)?;
        let map = visibility::resolve(set.exported_types(), default_visible)?;

        let mut entries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |entry: SignatureEntry| -> Result<()> {
            if !seen.insert(entry.token.clone()) {
                return Err(SurfaceError::DuplicateToken { token: entry.token });
            }
            entries.push(entry);
            Ok(())
        };

        for resolved in map.iter() {
            push(self.renderer.render_type(resolved, set, &map)?)?;
            if resolved.state == VisibilityState::Private {
                continue;
            }

            let type_name = resolved.full_name();
            let members = set.members(resolved.node, self.renderer.check_inheritance())?;
            for member in &members {
                let rendered =
                    self.renderer
                        .render_member(&type_name, resolved.node, resolved.state, member)?;
                for entry in rendered {
                    push(entry)?;
                }
            }
        }

        let ignores = module_ignores(module)?;
        let surface = Surface {
            module: module.name.clone(),
            entries,
            ignores,
        };
        info!(
            "Extracted {} ({} types, {} public tokens, {} ignores) in {:.1}ms",
            surface.module,
            map.len(),
            surface.public_count(),
            surface.ignores.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(surface)
    }
}

fn module_ignores(module: &ModuleMetadata) -> Result<Vec<IgnoreEntry>> {
    let element = format!("module {}", module.name);
    let hints = ObfuscationHint::decode_all(&module.attributes, &element)?;
    Ok(hints
        .iter()
        .filter_map(|hint| {
            hint.ignore_pattern().map(|pattern| IgnoreEntry {
                pattern: pattern.to_string(),
                force_included: !hint.exclude,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::OBFUSCATION_ATTRIBUTE;
    use crate::types::{
        Accessor, AttrValue, Attribute, ConstValue, FieldDef, MemberNode, MethodDef,
        PropertyDef, TypeKind, TypeNode, TypeRef,
    };

    fn void() -> TypeRef {
        TypeRef::new("System", "Void")
    }

    fn method(name: &str) -> MemberNode {
        MemberNode::Method(MethodDef {
            name: name.to_string(),
            return_type: void(),
            ..Default::default()
        })
    }

    fn hint(exclude: bool) -> Attribute {
        Attribute::new(OBFUSCATION_ATTRIBUTE).named("Exclude", AttrValue::Bool(exclude))
    }

    fn ignore(pattern: &str, exclude: bool) -> Attribute {
        Attribute::new(OBFUSCATION_ATTRIBUTE)
            .named("Exclude", AttrValue::Bool(exclude))
            .named(
                "Feature",
                AttrValue::String(format!("AssemblyCompareIgnore {}", pattern)),
            )
    }

    fn module(types: Vec<TypeNode>) -> ModuleSet {
        let mut module = ModuleMetadata::new("Foo");
        module.types = types;
        ModuleSet::standalone(module)
    }

    fn tokens(surface: &Surface) -> Vec<&str> {
        surface.public_tokens().into_iter().collect()
    }

    #[test]
    fn test_extract_type_and_members() {
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.members = vec![
            method("Baz"),
            MemberNode::Field(FieldDef {
                name: "Max".to_string(),
                field_type: TypeRef::new("System", "Int32"),
                is_static: true,
                constant: Some(ConstValue::Int(42)),
                ..Default::default()
            }),
        ];
        let surface = SurfaceExtractor::new(false).extract(&module(vec![bar])).unwrap();
        assert_eq!(surface.module, "Foo");
        assert_eq!(
            tokens(&surface),
            vec![
                "FIELD|CONST|Foo.Bar.Max:System.Int32=42",
                "METHOD|Foo.Bar.Baz():System.Void",
                "TYPE|Foo.Bar",
            ]
        );
    }

    #[test]
    fn test_private_type_emits_only_hidden_type_token() {
        let mut hidden = TypeNode::new("Foo", "Hidden", TypeKind::Class);
        hidden.attributes = vec![hint(false)];
        hidden.members = vec![method("Secret")];
        let surface = SurfaceExtractor::new(false)
            .extract(&module(vec![hidden]))
            .unwrap();
        assert_eq!(
            surface.entries,
            vec![SignatureEntry::new("TYPE|Foo.Hidden".to_string(), false)]
        );
        assert!(surface.public_tokens().is_empty());
    }

    #[test]
    fn test_members_private_type_keeps_opted_in_members() {
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.attributes = vec![Attribute::new(OBFUSCATION_ATTRIBUTE)
            .named("ApplyToMembers", AttrValue::Bool(false))];
        let mut exposed = MethodDef {
            name: "Exposed".to_string(),
            return_type: void(),
            ..Default::default()
        };
        exposed.attributes = vec![hint(true)];
        bar.members = vec![method("Internal"), MemberNode::Method(exposed)];

        let mut module = ModuleMetadata::new("Foo");
        module.attributes = vec![Attribute::new(crate::hints::OBFUSCATE_ASSEMBLY_ATTRIBUTE)
            .arg(AttrValue::Bool(true))];
        module.types = vec![bar];
        let surface = SurfaceExtractor::new(false)
            .extract(&ModuleSet::standalone(module))
            .unwrap();
        assert_eq!(
            tokens(&surface),
            vec!["METHOD|Foo.Bar.Exposed():System.Void", "TYPE|Foo.Bar"]
        );
    }

    #[test]
    fn test_debug_conditional_member_stays_private() {
        let mut trace = MethodDef {
            name: "Trace".to_string(),
            return_type: void(),
            ..Default::default()
        };
        trace.attributes = vec![
            Attribute::new(crate::hints::CONDITIONAL_ATTRIBUTE)
                .arg(AttrValue::String("DEBUG".to_string())),
            hint(true),
        ];
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.members = vec![MemberNode::Method(trace)];

        let surface = SurfaceExtractor::new(false).extract(&module(vec![bar])).unwrap();
        assert!(surface.entries.contains(&SignatureEntry::new(
            "METHOD|Foo.Bar.Trace():System.Void".to_string(),
            false
        )));
        assert_eq!(tokens(&surface), vec!["TYPE|Foo.Bar"]);
    }

    #[test]
    fn test_hidden_type_hides_unhinted_nested_types() {
        let mut inner = TypeNode::new("Foo", "Inner", TypeKind::Class);
        inner.members = vec![method("Run")];
        let mut outer = TypeNode::new("Foo", "Outer", TypeKind::Class);
        outer.attributes = vec![Attribute::new(OBFUSCATION_ATTRIBUTE)
            .named("Exclude", AttrValue::Bool(false))
            .named("ApplyToMembers", AttrValue::Bool(false))];
        outer.nested = vec![inner];

        let surface = SurfaceExtractor::new(false)
            .extract(&module(vec![outer]))
            .unwrap();
        assert!(surface.public_tokens().is_empty());
    }

    #[test]
    fn test_duplicate_token_is_rejected() {
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.members = vec![method("Baz"), method("Baz")];
        let err = SurfaceExtractor::new(false)
            .extract(&module(vec![bar]))
            .unwrap_err();
        assert!(matches!(err, SurfaceError::DuplicateToken { .. }));
    }

    #[test]
    fn test_inherited_members_and_inheritance_mode() {
        let mut base = TypeNode::new("Foo", "Base", TypeKind::Class);
        base.members = vec![method("Shared")];
        let mut derived = TypeNode::new("Foo", "Derived", TypeKind::Class);
        derived.base = Some(TypeRef::new("Foo", "Base"));
        derived.members = vec![method("Own")];
        let set = module(vec![base, derived]);

        let flat = SurfaceExtractor::new(false).extract(&set).unwrap();
        assert!(flat
            .public_tokens()
            .contains("METHOD|Foo.Derived.Shared():System.Void"));
        assert!(flat.public_tokens().contains("TYPE|Foo.Derived"));

        let tracked = SurfaceExtractor::new(true).extract(&set).unwrap();
        let tracked_tokens = tracked.public_tokens();
        assert!(!tracked_tokens.contains("METHOD|Foo.Derived.Shared():System.Void"));
        assert!(tracked_tokens.contains("METHOD|Foo.Derived.Own():System.Void"));
        assert!(tracked_tokens.contains("TYPE|Foo.Derived|INHERITS:Foo.Base"));
    }

    #[test]
    fn test_property_accessor_entries() {
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.members = vec![MemberNode::Property(PropertyDef {
            name: "Count".to_string(),
            property_type: TypeRef::new("System", "Int32"),
            getter: Some(Accessor::default()),
            ..Default::default()
        })];
        let surface = SurfaceExtractor::new(false).extract(&module(vec![bar])).unwrap();
        assert!(surface
            .public_tokens()
            .contains("PROPERTY|Foo.Bar.Count:System.Int32|GET"));
    }

    #[test]
    fn test_module_ignores_and_whitelist() {
        let mut hidden = TypeNode::new("Foo", "Hidden", TypeKind::Class);
        hidden.attributes = vec![hint(false)];
        let mut module = ModuleMetadata::new("Foo");
        module.attributes = vec![
            ignore("METHOD|Foo.Bar.Baz():System.Void", true),
            ignore("TYPE|Foo.Hidden", false),
            Attribute::new(OBFUSCATION_ATTRIBUTE)
                .named("Feature", AttrValue::String("renaming".to_string())),
        ];
        module.types = vec![hidden];

        let surface = SurfaceExtractor::new(false)
            .extract(&ModuleSet::standalone(module))
            .unwrap();
        assert_eq!(
            surface.ignores,
            vec![
                IgnoreEntry {
                    pattern: "METHOD|Foo.Bar.Baz():System.Void".to_string(),
                    force_included: false,
                },
                IgnoreEntry {
                    pattern: "TYPE|Foo.Hidden".to_string(),
                    force_included: true,
                },
            ]
        );
        assert_eq!(tokens(&surface), vec!["TYPE|Foo.Hidden"]);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let mut bar = TypeNode::new("Foo", "Bar", TypeKind::Class);
        bar.members = vec![method("A"), method("B")];
        let set = module(vec![bar]);
        let extractor = SurfaceExtractor::new(false);
        let first = extractor.extract(&set).unwrap();
        let second = extractor.extract(&set).unwrap();
        assert_eq!(first.entries, second.entries);
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 16);
        assert_ne!(first.fingerprint(), Surface::empty("Foo").fingerprint());
    }
}
