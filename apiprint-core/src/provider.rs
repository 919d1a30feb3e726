//! Metadata provider: loads a module and the dependencies its surface needs.
//!
//! The provider decodes metadata documents only; nothing from an analysed
//! binary is ever executed, so no isolation boundary is required. A loaded
//! [`ModuleSet`] stays valid for as long as the caller holds it.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SurfaceError};
use crate::types::{GenericBindings, MemberNode, ModuleMetadata, TypeNode, TypeRef};

/// Where a module's metadata comes from.
#[derive(Clone, Debug)]
pub enum ModuleSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ModuleSource {
    /// Default resolution directory: the module's own directory for paths,
    /// the working directory for raw bytes.
    pub fn default_search_path(&self) -> PathBuf {
        match self {
            ModuleSource::Path(path) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            ModuleSource::Bytes(_) => PathBuf::from("."),
        }
    }
}

/// Capability surface the extractor needs from a metadata reader.
pub trait MetadataProvider: Sync {
    /// Load a module plus every dependency reachable through base types and
    /// implemented interfaces.
    fn load_module(&self, source: &ModuleSource, search_path: Option<&Path>) -> Result<ModuleSet>;
}

/// A module under analysis together with its resolved dependencies.
#[derive(Clone, Debug)]
pub struct ModuleSet {
    root: Arc<ModuleMetadata>,
    dependencies: HashMap<String, Arc<ModuleMetadata>>,
}

impl ModuleSet {
    /// A set with no dependencies; lookups into other modules fail.
    pub fn standalone(root: ModuleMetadata) -> Self {
        Self {
            root: Arc::new(root),
            dependencies: HashMap::new(),
        }
    }

    /// Add an already-resolved dependency.
    pub fn with_dependency(mut self, module: ModuleMetadata) -> Self {
        self.dependencies
            .insert(module.name.clone(), Arc::new(module));
        self
    }

    pub fn root(&self) -> &ModuleMetadata {
        &self.root
    }

    /// Exported, non-nested types of the module under analysis.
    pub fn exported_types(&self) -> &[TypeNode] {
        &self.root.types
    }

    pub fn dependency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn module(&self, name: Option<&str>) -> Result<&ModuleMetadata> {
        match name {
            None => Ok(&self.root),
            Some(name) if name == self.root.name => Ok(&self.root),
            Some(name) => self
                .dependencies
                .get(name)
                .map(|m| m.as_ref())
                .ok_or_else(|| SurfaceError::MetadataResolution {
                    module: name.to_string(),
                    search_path: PathBuf::new(),
                }),
        }
    }

    /// Resolve a reference made from `context` (`None` = the root module).
    ///
    /// Returns the type and the name of the module declaring it, or `None`
    /// when the module is known but does not declare the type.
    pub fn resolve_type<'a>(
        &'a self,
        reference: &TypeRef,
        context: Option<&'a str>,
    ) -> Result<Option<(&'a TypeNode, Option<&'a str>)>> {
        let module_name: Option<&'a str> = match reference.module.as_deref() {
            Some(name) if name == self.root.name => None,
            Some(name) => Some(
                self.dependencies
                    .get_key_value(name)
                    .map(|(k, _)| k.as_str())
                    .ok_or_else(|| SurfaceError::MetadataResolution {
                        module: name.to_string(),
                        search_path: PathBuf::new(),
                    })?,
            ),
            None => context,
        };
        let module = self.module(module_name)?;
        Ok(find_type(&module.types, &reference.namespace, &reference.name)
            .map(|node| (node, module_name)))
    }

    /// Members visible on `declaring`.
    ///
    /// With `declared_only` this is just the declared list. Otherwise public
    /// instance members inherited along the base chain are appended, with
    /// generic parameters of each base bound to the arguments the derived type
    /// supplies. Constructors and static members are never inherited, and a
    /// base member hidden by an equally-shaped derived member is skipped.
    pub fn members<'a>(
        &'a self,
        declaring: &'a TypeNode,
        declared_only: bool,
    ) -> Result<Vec<Cow<'a, MemberNode>>> {
        let mut result: Vec<Cow<'a, MemberNode>> =
            declaring.members.iter().map(Cow::Borrowed).collect();
        if declared_only {
            return Ok(result);
        }

        let mut seen: HashSet<String> = declaring.members.iter().map(MemberNode::shape_key).collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut context: Option<&'a str> = None;
        let mut next: Option<TypeRef> = declaring.base.clone();

        while let Some(base_ref) = next.take() {
            let Some((base, module)) = self.resolve_type(&base_ref, context)? else {
                debug!("Base type {} not found, stopping", base_ref.full_name());
                break;
            };
            if !visited.insert(format!("{:?}:{}", module, base_ref.definition_key())) {
                break;
            }

            let bindings: GenericBindings = base
                .generic_params
                .iter()
                .cloned()
                .zip(base_ref.generic_args.iter().cloned())
                .collect();

            for member in &base.members {
                if member.is_static() || matches!(member, MemberNode::Constructor(_)) {
                    continue;
                }
                if !seen.insert(member.shape_key()) {
                    continue;
                }
                if bindings.is_empty() {
                    result.push(Cow::Borrowed(member));
                } else {
                    result.push(Cow::Owned(member.substitute(&bindings)));
                }
            }

            next = base.base.as_ref().map(|b| qualify(b.substitute(&bindings), module));
            context = module;
        }

        Ok(result)
    }
}

/// Pin a reference made inside `module` so it stays valid from another context.
fn qualify(mut reference: TypeRef, module: Option<&str>) -> TypeRef {
    if reference.module.is_none() {
        reference.module = module.map(str::to_string);
    }
    reference
}

/// Find a type by namespace and `Outer+Inner` name path.
pub fn find_type<'a>(types: &'a [TypeNode], namespace: &str, name: &str) -> Option<&'a TypeNode> {
    let mut segments = name.split('+');
    let first = segments.next()?;
    let mut current = types
        .iter()
        .find(|t| t.namespace == namespace && t.name == first)?;
    for segment in segments {
        current = current.nested.iter().find(|t| t.name == segment)?;
    }
    Some(current)
}

/// Provider decoding JSON metadata documents.
///
/// Modules registered with [`with_module`](Self::with_module) are resolved
/// directly; anything else is probed as `<name>.exe`, then `<name>.dll`, in
/// the search path.
#[derive(Debug, Default)]
pub struct JsonMetadataProvider {
    registered: HashMap<String, Arc<ModuleMetadata>>,
}

impl JsonMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module for direct resolution.
    pub fn with_module(mut self, module: ModuleMetadata) -> Self {
        self.registered.insert(module.name.clone(), Arc::new(module));
        self
    }

    /// Register every module file found in `dir` for direct resolution.
    pub fn with_reference_dir(mut self, dir: &Path) -> Result<Self> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_module = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("dll") || e.eq_ignore_ascii_case("exe"))
                .unwrap_or(false);
            if is_module {
                let module = Self::decode(&fs::read(&path)?)?;
                debug!("Registered reference {} from {}", module.name, path.display());
                self.registered.insert(module.name.clone(), Arc::new(module));
            }
        }
        Ok(self)
    }

    /// Decode one metadata document.
    pub fn decode(bytes: &[u8]) -> Result<ModuleMetadata> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn locate(&self, name: &str, search_path: &Path) -> Result<Arc<ModuleMetadata>> {
        if let Some(module) = self.registered.get(name) {
            return Ok(Arc::clone(module));
        }

        let mut file = search_path.join(format!("{}.exe", name));
        if !file.exists() {
            file = search_path.join(format!("{}.dll", name));
        }
        let bytes = fs::read(&file).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SurfaceError::MetadataResolution {
                module: name.to_string(),
                search_path: search_path.to_path_buf(),
            },
            _ => SurfaceError::Io(e),
        })?;
        debug!("Resolved module {} from {}", name, file.display());
        Ok(Arc::new(Self::decode(&bytes)?))
    }
}

impl MetadataProvider for JsonMetadataProvider {
    fn load_module(&self, source: &ModuleSource, search_path: Option<&Path>) -> Result<ModuleSet> {
        let search_path = search_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source.default_search_path());
        let root = match source {
            ModuleSource::Path(path) => Self::decode(&fs::read(path)?)?,
            ModuleSource::Bytes(bytes) => Self::decode(bytes)?,
        };

        let mut set = ModuleSet::standalone(root);
        let root = Arc::clone(&set.root);

        // (declaring module, reference, follow base chain)
        let mut pending: Vec<(Option<String>, TypeRef, bool)> = Vec::new();
        collect_refs(&root.types, &mut pending);
        let mut visited: HashSet<(Option<String>, String)> = HashSet::new();

        while let Some((context, reference, follow)) = pending.pop() {
            let module = reference.module.clone().or(context);
            let module = module.filter(|m| *m != root.name);
            if !visited.insert((module.clone(), reference.definition_key())) {
                continue;
            }

            let declaring = match &module {
                None => Arc::clone(&root),
                Some(name) => match set.dependencies.get(name) {
                    Some(loaded) => Arc::clone(loaded),
                    None => {
                        let loaded = self.locate(name, &search_path)?;
                        set.dependencies.insert(name.clone(), Arc::clone(&loaded));
                        loaded
                    }
                },
            };

            if !follow {
                continue;
            }
            if let Some(node) = find_type(&declaring.types, &reference.namespace, &reference.name) {
                if let Some(base) = &node.base {
                    pending.push((module.clone(), base.clone(), true));
                }
            }
        }

        debug!(
            "Loaded module {} with {} dependencies",
            set.root.name,
            set.dependencies.len()
        );
        Ok(set)
    }
}

fn collect_refs(types: &[TypeNode], pending: &mut Vec<(Option<String>, TypeRef, bool)>) {
    for node in types {
        if let Some(base) = &node.base {
            pending.push((None, base.clone(), true));
        }
        for interface in &node.interfaces {
            pending.push((None, interface.clone(), false));
        }
        collect_refs(&node.nested, pending);
    }
}
