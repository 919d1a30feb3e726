//! Data model for module metadata.
//!
//! These types are the read-only projection of a compiled module that the
//! surface extractor consumes: exported types, their declared members,
//! inheritance relations and structured attribute data. They are produced by
//! a [`MetadataProvider`](crate::provider::MetadataProvider) and never mutated
//! by the analysis.

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// A reference to a type, possibly declared in another module.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Declaring module, `None` for the module under analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_args: Vec<TypeRef>,
    /// True for an unbound generic parameter such as `T`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub generic_parameter: bool,
}

impl TypeRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// A generic parameter reference (`T`, `TKey`, ...).
    pub fn generic_parameter(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generic_parameter: true,
            ..Default::default()
        }
    }

    /// Set the declaring module.
    pub fn in_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    /// Set generic arguments.
    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.generic_args = args;
        self
    }

    /// Canonical full name: `<namespace>.<name>` plus `[[<args>]]` for generics.
    ///
    /// A generic parameter renders as just its own name.
    pub fn full_name(&self) -> String {
        if self.generic_parameter {
            return self.name.clone();
        }
        let mut result = self.definition_key();
        if !self.generic_args.is_empty() {
            result.push_str("[[");
            let args: Vec<String> = self.generic_args.iter().map(TypeRef::full_name).collect();
            result.push_str(&args.join(","));
            result.push_str("]]");
        }
        result
    }

    /// Name of the generic definition, without type arguments.
    pub fn definition_key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Replace generic parameters bound in `bindings`.
    pub fn substitute(&self, bindings: &GenericBindings) -> TypeRef {
        if self.generic_parameter {
            if let Some(bound) = bindings.get(&self.name) {
                return bound.clone();
            }
            return self.clone();
        }
        let mut result = self.clone();
        result.generic_args = self
            .generic_args
            .iter()
            .map(|arg| arg.substitute(bindings))
            .collect();
        result
    }
}

/// Generic parameter name to bound type argument.
pub type GenericBindings = std::collections::HashMap<String, TypeRef>;

/// Category of a declared type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

/// A type declared in a module.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TypeNode {
    /// Namespace; ignored for nested types, which use their enclosing type's.
    #[serde(default)]
    pub namespace: String,
    /// Simple name, including any arity suffix (`List`1`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_params: Vec<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<TypeRef>,
    /// All implemented interfaces, in metadata order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeRef>,
    /// Exported nested types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<TypeNode>,
    /// Public members declared on this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl TypeNode {
    pub fn new(namespace: &str, name: &str, kind: TypeKind) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }
}

/// A declared parameter of a method, constructor or indexer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: TypeRef,
    /// Declared position, used for canonical ordering.
    pub position: u32,
}

impl Parameter {
    pub fn new(name: &str, param_type: TypeRef, position: u32) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            position,
        }
    }
}

/// Compile-time constant value of a literal field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Single(f32),
    Double(f64),
    Char(char),
    String(String),
}

/// A field declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_readonly: bool,
    /// Present for literal (constant) fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// A public property accessor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// A property or indexer declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// A method declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub return_type: TypeRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub is_static: bool,
    /// Compiler-generated special name (accessors, operators, event adders).
    #[serde(default)]
    pub special_name: bool,
    /// Number of method-level generic parameters, 0 when not generic.
    #[serde(default)]
    pub generic_arity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// A constructor declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDef {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Static initializer.
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// An event declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    pub handler_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// A declared member of a type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MemberNode {
    Field(FieldDef),
    Property(PropertyDef),
    Method(MethodDef),
    Constructor(ConstructorDef),
    Event(EventDef),
}

impl MemberNode {
    pub fn name(&self) -> &str {
        match self {
            MemberNode::Field(f) => &f.name,
            MemberNode::Property(p) => &p.name,
            MemberNode::Method(m) => &m.name,
            MemberNode::Constructor(c) if c.is_static => ".cctor",
            MemberNode::Constructor(_) => ".ctor",
            MemberNode::Event(e) => &e.name,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            MemberNode::Field(f) => &f.attributes,
            MemberNode::Property(p) => &p.attributes,
            MemberNode::Method(m) => &m.attributes,
            MemberNode::Constructor(c) => &c.attributes,
            MemberNode::Event(e) => &e.attributes,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            MemberNode::Field(f) => f.is_static || f.constant.is_some(),
            MemberNode::Property(p) => p.is_static,
            MemberNode::Method(m) => m.is_static,
            MemberNode::Constructor(c) => c.is_static,
            MemberNode::Event(e) => e.is_static,
        }
    }

    /// Copy of this member with generic parameters of the declaring type bound.
    pub fn substitute(&self, bindings: &GenericBindings) -> MemberNode {
        fn params(parameters: &[Parameter], bindings: &GenericBindings) -> Vec<Parameter> {
            parameters
                .iter()
                .map(|p| Parameter {
                    param_type: p.param_type.substitute(bindings),
                    ..p.clone()
                })
                .collect()
        }

        match self {
            MemberNode::Field(f) => MemberNode::Field(FieldDef {
                field_type: f.field_type.substitute(bindings),
                ..f.clone()
            }),
            MemberNode::Property(p) => MemberNode::Property(PropertyDef {
                property_type: p.property_type.substitute(bindings),
                index_parameters: params(&p.index_parameters, bindings),
                ..p.clone()
            }),
            MemberNode::Method(m) => MemberNode::Method(MethodDef {
                return_type: m.return_type.substitute(bindings),
                parameters: params(&m.parameters, bindings),
                ..m.clone()
            }),
            MemberNode::Constructor(c) => MemberNode::Constructor(ConstructorDef {
                parameters: params(&c.parameters, bindings),
                ..c.clone()
            }),
            MemberNode::Event(e) => MemberNode::Event(EventDef {
                handler_type: e.handler_type.substitute(bindings),
                ..e.clone()
            }),
        }
    }

    /// Identity used to decide whether a derived member hides a base member:
    /// kind, name, method arity and ordered parameter types.
    pub fn shape_key(&self) -> String {
        fn params(parameters: &[Parameter]) -> String {
            let mut ordered: Vec<&Parameter> = parameters.iter().collect();
            ordered.sort_by_key(|p| p.position);
            ordered
                .iter()
                .map(|p| p.param_type.full_name())
                .collect::<Vec<_>>()
                .join(",")
        }

        match self {
            MemberNode::Field(f) => format!("F:{}", f.name),
            MemberNode::Property(p) => format!("P:{}[{}]", p.name, params(&p.index_parameters)),
            MemberNode::Method(m) => {
                format!("M:{}`{}({})", m.name, m.generic_arity, params(&m.parameters))
            }
            MemberNode::Constructor(c) => format!("C:({})", params(&c.parameters)),
            MemberNode::Event(e) => format!("E:{}", e.name),
        }
    }
}

/// A value stored in an attribute's constant-argument table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload; `Null` is accepted as an absent string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            AttrValue::Null => Some(""),
            _ => None,
        }
    }
}

/// A named field/property override on an attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    pub name: String,
    pub value: AttrValue,
}

/// Structured attribute data: type + constructor arguments + named overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructor_args: Vec<AttrValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_args: Vec<NamedArg>,
}

impl Attribute {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    /// Append a constructor argument.
    pub fn arg(mut self, value: AttrValue) -> Self {
        self.constructor_args.push(value);
        self
    }

    /// Append a named argument.
    pub fn named(mut self, name: &str, value: AttrValue) -> Self {
        self.named_args.push(NamedArg {
            name: name.to_string(),
            value,
        });
        self
    }
}

/// One compiled module: its identity, references, module-level attributes
/// and exported top-level types.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    /// Names of modules this module references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Exported, non-nested types.
    #[serde(default)]
    pub types: Vec<TypeNode>,
}

impl ModuleMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}
