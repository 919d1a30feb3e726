//! Canonical signature rendering.
//!
//! Each declared element becomes one or more single-line tokens. The format
//! is persisted and compared across builds, so every rule here is
//! load-bearing: parameter lists are ordered by declared position, names are
//! namespace-qualified, and constant literals are rendered culture-invariant.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hints::{self, ObfuscationHint};
use crate::provider::ModuleSet;
use crate::types::{
    Accessor, ConstValue, ConstructorDef, EventDef, FieldDef, MemberNode, MethodDef, Parameter,
    PropertyDef, TypeNode, TypeRef,
};
use crate::visibility::{ResolvedType, VisibilityMap, VisibilityState};

/// Operator overloads keep their special name in the surface.
const OPERATOR_PREFIX: &str = "op_";

/// One rendered element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub token: String,
    pub is_public: bool,
}

impl SignatureEntry {
    pub fn new(token: String, is_public: bool) -> Self {
        Self { token, is_public }
    }
}

/// Renders types and members into tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureRenderer {
    check_inheritance: bool,
}

impl SignatureRenderer {
    /// With `check_inheritance`, type tokens carry `|INHERITS:` and only
    /// declared members are enumerated.
    pub fn new(check_inheritance: bool) -> Self {
        Self { check_inheritance }
    }

    pub fn check_inheritance(&self) -> bool {
        self.check_inheritance
    }

    /// Render the type token.
    pub fn render_type(
        &self,
        resolved: &ResolvedType<'_>,
        set: &ModuleSet,
        visibility: &VisibilityMap<'_>,
    ) -> Result<SignatureEntry> {
        let mut token = String::from("TYPE|");
        token.push_str(&resolved.full_name());

        if self.check_inheritance {
            if let Some(base) = &resolved.node.base {
                token.push_str("|INHERITS:");
                token.push_str(&base.full_name());
            }
        }

        let mut interfaces = Vec::new();
        for interface in &resolved.node.interfaces {
            if interface_visible(interface, set, visibility)? {
                interfaces.push(interface.full_name());
            }
        }
        if !interfaces.is_empty() {
            token.push_str("|IMPLEMENTS:");
            token.push_str(&interfaces.join(","));
        }

        Ok(SignatureEntry::new(token, resolved.state.is_type_visible()))
    }

    /// Render one member of a type. Returns nothing for elements that are
    /// never part of the contract.
    pub fn render_member(
        &self,
        type_name: &str,
        declaring: &TypeNode,
        state: VisibilityState,
        member: &MemberNode,
    ) -> Result<Vec<SignatureEntry>> {
        let members_default = state.members_default();
        let element = format!("member {}.{}", type_name, member.name());
        let hint = hints::visibility_hint(member.attributes(), &element)?;
        let is_public = !hints::is_debug_conditional(member.attributes())
            && ObfuscationHint::is_visible(hint.as_ref(), members_default);

        let entries = match member {
            MemberNode::Field(field) => {
                if declaring.is_enum() && !member.is_static() {
                    // Underlying value field of an enum
                    return Ok(Vec::new());
                }
                vec![SignatureEntry::new(render_field(type_name, field), is_public)]
            }
            MemberNode::Property(property) => {
                let token = render_property(type_name, property);
                let mut entries = Vec::new();
                if let Some(getter) = &property.getter {
                    let visible =
                        accessor_visible(getter, &format!("{}|GET", element), members_default)?;
                    entries.push(SignatureEntry::new(format!("{}|GET", token), is_public && visible));
                }
                if let Some(setter) = &property.setter {
                    let visible =
                        accessor_visible(setter, &format!("{}|SET", element), members_default)?;
                    entries.push(SignatureEntry::new(format!("{}|SET", token), is_public && visible));
                }
                entries
            }
            MemberNode::Method(method) => {
                if method.special_name && !method.name.starts_with(OPERATOR_PREFIX) {
                    return Ok(Vec::new());
                }
                vec![SignatureEntry::new(render_method(type_name, method), is_public)]
            }
            MemberNode::Constructor(ctor) => {
                if ctor.is_static {
                    // Static initializers are self-contained
                    return Ok(Vec::new());
                }
                vec![SignatureEntry::new(render_constructor(type_name, ctor), is_public)]
            }
            MemberNode::Event(event) => {
                vec![SignatureEntry::new(render_event(type_name, event), is_public)]
            }
        };
        Ok(entries)
    }
}

/// Whether an implemented interface shows up in `|IMPLEMENTS:`.
///
/// Interfaces of the analysed module must resolve to `Public`; interfaces of
/// other modules are visible unless their own hint says otherwise.
fn interface_visible(
    interface: &TypeRef,
    set: &ModuleSet,
    visibility: &VisibilityMap<'_>,
) -> Result<bool> {
    let foreign = interface
        .module
        .as_deref()
        .is_some_and(|m| m != set.root().name);
    if !foreign {
        return Ok(visibility.state(&interface.definition_key()) == Some(VisibilityState::Public));
    }

    match set.resolve_type(interface, None)? {
        Some((node, _)) => {
            let element = format!("type {}", interface.definition_key());
            let hint = hints::visibility_hint(&node.attributes, &element)?;
            Ok(ObfuscationHint::is_visible(hint.as_ref(), true))
        }
        None => Ok(true),
    }
}

fn accessor_visible(accessor: &Accessor, element: &str, members_default: bool) -> Result<bool> {
    let hint = hints::visibility_hint(&accessor.attributes, element)?;
    Ok(ObfuscationHint::is_visible(hint.as_ref(), members_default))
}

/// Comma-joined parameter types ordered by declared position.
pub fn render_parameters(parameters: &[Parameter]) -> String {
    let mut ordered: Vec<&Parameter> = parameters.iter().collect();
    ordered.sort_by_key(|p| p.position);
    ordered
        .iter()
        .map(|p| p.param_type.full_name())
        .collect::<Vec<_>>()
        .join(",")
}

fn render_field(type_name: &str, field: &FieldDef) -> String {
    let mut token = String::from("FIELD|");
    match &field.constant {
        Some(_) => token.push_str("CONST|"),
        None => {
            if field.is_static {
                token.push_str("STATIC|");
            }
            if field.is_readonly {
                token.push_str("READONLY|");
            }
        }
    }
    token.push_str(type_name);
    token.push('.');
    token.push_str(&field.name);
    token.push(':');
    token.push_str(&field.field_type.full_name());
    if let Some(value) = &field.constant {
        token.push('=');
        token.push_str(&render_literal(value));
    }
    token
}

fn render_property(type_name: &str, property: &PropertyDef) -> String {
    let mut token = String::from("PROPERTY|");
    if property.is_static {
        token.push_str("STATIC|");
    }
    if !property.index_parameters.is_empty() {
        token.push('[');
        token.push_str(&render_parameters(&property.index_parameters));
        token.push_str("]|");
    }
    token.push_str(type_name);
    token.push('.');
    token.push_str(&property.name);
    token.push(':');
    token.push_str(&property.property_type.full_name());
    token
}

fn render_method(type_name: &str, method: &MethodDef) -> String {
    let mut token = String::from("METHOD|");
    if method.is_static {
        token.push_str("STATIC|");
    }
    token.push_str(type_name);
    token.push('.');
    token.push_str(&method.name);
    if method.generic_arity > 0 {
        token.push('`');
        token.push_str(&method.generic_arity.to_string());
    }
    token.push('(');
    token.push_str(&render_parameters(&method.parameters));
    token.push_str("):");
    token.push_str(&method.return_type.full_name());
    token
}

fn render_constructor(type_name: &str, ctor: &ConstructorDef) -> String {
    format!("CTOR|{}({})", type_name, render_parameters(&ctor.parameters))
}

fn render_event(type_name: &str, event: &EventDef) -> String {
    let mut token = String::from("EVENT|");
    if event.is_static {
        token.push_str("STATIC|");
    }
    token.push_str(type_name);
    token.push('.');
    token.push_str(&event.name);
    token.push(':');
    token.push_str(&event.handler_type.full_name());
    token
}

/// Render a constant literal.
///
/// Numbers and booleans use invariant text; chars and strings are emitted as
/// quoted JavaScript string literals, with U+FFFE/U+FFFF spelled out.
pub fn render_literal(value: &ConstValue) -> String {
    match value {
        ConstValue::Null => "null".to_string(),
        ConstValue::Bool(true) => "True".to_string(),
        ConstValue::Bool(false) => "False".to_string(),
        ConstValue::Int(v) => v.to_string(),
        ConstValue::UInt(v) => v.to_string(),
        ConstValue::Single(v) => format_float(*v as f64, &format!("{:e}", v), 7),
        ConstValue::Double(v) => format_float(*v, &format!("{:e}", v), 15),
        ConstValue::Char(c) => escape_noncharacters(&javascript_string_encode(&c.to_string())),
        ConstValue::String(s) => escape_noncharacters(&javascript_string_encode(s)),
    }
}

/// Invariant round-trip text for a float.
///
/// `scientific` is the shortest round-trip form (`1.5e20`). Exponents at or
/// above `max_exponent`, or at or below -5, switch to `E+dd` / `E-dd`
/// notation.
fn format_float(value: f64, scientific: &str, max_exponent: i32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    if exponent >= max_exponent || exponent <= -5 {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}{}E{}{:02}", sign, mantissa, exp_sign, exponent.abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let point = exponent + 1;
    let body = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    };
    format!("{}{}", sign, body)
}

/// Quote and escape a string the way browsers expect inside `<script>`.
pub fn javascript_string_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if requires_unicode_escape(c) => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn requires_unicode_escape(c: char) -> bool {
    (c as u32) < 0x20
        || matches!(c, '\'' | '<' | '>' | '&' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn escape_noncharacters(value: &str) -> String {
    value
        .replace('\u{FFFE}', "\\uFFFE")
        .replace('\u{FFFF}', "\\uFFFF")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::OBFUSCATION_ATTRIBUTE;
    use crate::types::{AttrValue, Attribute, ModuleMetadata, TypeKind};
    use crate::visibility::resolve;

    fn int32() -> TypeRef {
        TypeRef::new("System", "Int32")
    }

    fn hidden() -> Attribute {
        Attribute::new(OBFUSCATION_ATTRIBUTE).named("Exclude", AttrValue::Bool(false))
    }

    fn widget() -> TypeNode {
        TypeNode::new("Foo.Bar", "Widget", TypeKind::Class)
    }

    fn render(member: MemberNode) -> Vec<SignatureEntry> {
        SignatureRenderer::new(false)
            .render_member("Foo.Bar.Widget", &widget(), VisibilityState::Public, &member)
            .unwrap()
    }

    fn tokens(member: MemberNode) -> Vec<String> {
        render(member).into_iter().map(|e| e.token).collect()
    }

    #[test]
    fn test_method_token() {
        let method = MemberNode::Method(MethodDef {
            name: "Baz".to_string(),
            return_type: TypeRef::new("System", "Void"),
            ..Default::default()
        });
        assert_eq!(tokens(method), vec!["METHOD|Foo.Bar.Widget.Baz():System.Void"]);
    }

    #[test]
    fn test_generic_static_method_orders_parameters_by_position() {
        let method = MemberNode::Method(MethodDef {
            name: "Map".to_string(),
            return_type: TypeRef::generic_parameter("TOut"),
            parameters: vec![
                Parameter::new("selector", TypeRef::new("System", "Func`2"), 1),
                Parameter::new("source", TypeRef::generic_parameter("TIn"), 0),
            ],
            is_static: true,
            generic_arity: 2,
            ..Default::default()
        });
        assert_eq!(
            tokens(method),
            vec!["METHOD|STATIC|Foo.Bar.Widget.Map`2(TIn,System.Func`2):TOut"]
        );
    }

    #[test]
    fn test_special_names_skipped_except_operators() {
        let getter = MemberNode::Method(MethodDef {
            name: "get_Count".to_string(),
            return_type: int32(),
            special_name: true,
            ..Default::default()
        });
        assert!(tokens(getter).is_empty());

        let op = MemberNode::Method(MethodDef {
            name: "op_Equality".to_string(),
            return_type: TypeRef::new("System", "Boolean"),
            parameters: vec![
                Parameter::new("a", TypeRef::new("Foo.Bar", "Widget"), 0),
                Parameter::new("b", TypeRef::new("Foo.Bar", "Widget"), 1),
            ],
            is_static: true,
            special_name: true,
            ..Default::default()
        });
        assert_eq!(
            tokens(op),
            vec!["METHOD|STATIC|Foo.Bar.Widget.op_Equality(Foo.Bar.Widget,Foo.Bar.Widget):System.Boolean"]
        );
    }

    #[test]
    fn test_constructor_tokens() {
        let ctor = MemberNode::Constructor(ConstructorDef {
            parameters: vec![Parameter::new("size", int32(), 0)],
            ..Default::default()
        });
        assert_eq!(tokens(ctor), vec!["CTOR|Foo.Bar.Widget(System.Int32)"]);

        let cctor = MemberNode::Constructor(ConstructorDef {
            is_static: true,
            ..Default::default()
        });
        assert!(tokens(cctor).is_empty());
    }

    #[test]
    fn test_property_accessors() {
        let property = MemberNode::Property(PropertyDef {
            name: "Count".to_string(),
            property_type: int32(),
            getter: Some(Accessor::default()),
            setter: Some(Accessor {
                attributes: vec![hidden()],
            }),
            ..Default::default()
        });
        let entries = render(property);
        assert_eq!(
            entries,
            vec![
                SignatureEntry::new("PROPERTY|Foo.Bar.Widget.Count:System.Int32|GET".to_string(), true),
                SignatureEntry::new("PROPERTY|Foo.Bar.Widget.Count:System.Int32|SET".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_static_indexer() {
        let property = MemberNode::Property(PropertyDef {
            name: "Item".to_string(),
            property_type: TypeRef::new("System", "String"),
            is_static: true,
            index_parameters: vec![
                Parameter::new("column", int32(), 1),
                Parameter::new("row", TypeRef::new("System", "Int64"), 0),
            ],
            getter: Some(Accessor::default()),
            ..Default::default()
        });
        assert_eq!(
            tokens(property),
            vec!["PROPERTY|STATIC|[System.Int64,System.Int32]|Foo.Bar.Widget.Item:System.String|GET"]
        );
    }

    #[test]
    fn test_field_modifiers() {
        let field = MemberNode::Field(FieldDef {
            name: "Empty".to_string(),
            field_type: TypeRef::new("Foo.Bar", "Widget"),
            is_static: true,
            is_readonly: true,
            ..Default::default()
        });
        assert_eq!(
            tokens(field),
            vec!["FIELD|STATIC|READONLY|Foo.Bar.Widget.Empty:Foo.Bar.Widget"]
        );
    }

    #[test]
    fn test_const_field_literal_is_invariant() {
        let field = MemberNode::Field(FieldDef {
            name: "Max".to_string(),
            field_type: int32(),
            is_static: true,
            constant: Some(ConstValue::Int(42)),
            ..Default::default()
        });
        assert_eq!(tokens(field), vec!["FIELD|CONST|Foo.Bar.Widget.Max:System.Int32=42"]);

        let big = MemberNode::Field(FieldDef {
            name: "Big".to_string(),
            field_type: int32(),
            constant: Some(ConstValue::Int(1_000_000)),
            ..Default::default()
        });
        assert_eq!(tokens(big), vec!["FIELD|CONST|Foo.Bar.Widget.Big:System.Int32=1000000"]);
    }

    #[test]
    fn test_enum_value_field_skipped() {
        let color = TypeNode::new("Foo.Bar", "Color", TypeKind::Enum);
        let renderer = SignatureRenderer::new(false);
        let value_field = MemberNode::Field(FieldDef {
            name: "value__".to_string(),
            field_type: int32(),
            ..Default::default()
        });
        let red = MemberNode::Field(FieldDef {
            name: "Red".to_string(),
            field_type: TypeRef::new("Foo.Bar", "Color"),
            is_static: true,
            constant: Some(ConstValue::Int(1)),
            ..Default::default()
        });
        let state = VisibilityState::Public;
        assert!(renderer
            .render_member("Foo.Bar.Color", &color, state, &value_field)
            .unwrap()
            .is_empty());
        assert_eq!(
            renderer.render_member("Foo.Bar.Color", &color, state, &red).unwrap()[0].token,
            "FIELD|CONST|Foo.Bar.Color.Red:Foo.Bar.Color=1"
        );
    }

    #[test]
    fn test_event_token() {
        let event = MemberNode::Event(EventDef {
            name: "Changed".to_string(),
            handler_type: TypeRef::new("System", "EventHandler"),
            is_static: true,
            ..Default::default()
        });
        assert_eq!(
            tokens(event),
            vec!["EVENT|STATIC|Foo.Bar.Widget.Changed:System.EventHandler"]
        );
    }

    #[test]
    fn test_member_visibility_follows_type_state() {
        let method = MemberNode::Method(MethodDef {
            name: "Baz".to_string(),
            return_type: TypeRef::new("System", "Void"),
            ..Default::default()
        });
        let renderer = SignatureRenderer::new(false);
        let entries = renderer
            .render_member("Foo.Bar.Widget", &widget(), VisibilityState::MembersPrivate, &method)
            .unwrap();
        assert!(!entries[0].is_public);

        let opted_in = MemberNode::Method(MethodDef {
            name: "Baz".to_string(),
            return_type: TypeRef::new("System", "Void"),
            attributes: vec![Attribute::new(OBFUSCATION_ATTRIBUTE)],
            ..Default::default()
        });
        let entries = renderer
            .render_member("Foo.Bar.Widget", &widget(), VisibilityState::MembersPrivate, &opted_in)
            .unwrap();
        assert!(entries[0].is_public);
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(render_literal(&ConstValue::Null), "null");
        assert_eq!(render_literal(&ConstValue::Bool(true)), "True");
        assert_eq!(render_literal(&ConstValue::Int(-7)), "-7");
        assert_eq!(render_literal(&ConstValue::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(render_literal(&ConstValue::Double(1.5)), "1.5");
        assert_eq!(render_literal(&ConstValue::Double(0.0001)), "0.0001");
        assert_eq!(render_literal(&ConstValue::Double(0.00001)), "1E-05");
        assert_eq!(render_literal(&ConstValue::Double(1e15)), "1E+15");
        assert_eq!(render_literal(&ConstValue::Double(123456789012345.0)), "123456789012345");
        assert_eq!(render_literal(&ConstValue::Double(f64::NAN)), "NaN");
        assert_eq!(render_literal(&ConstValue::Single(0.1)), "0.1");
        assert_eq!(render_literal(&ConstValue::Single(1e7)), "1E+07");
        assert_eq!(render_literal(&ConstValue::Char('a')), "\"a\"");
    }

    #[test]
    fn test_string_literal_escaping() {
        let value = ConstValue::String("say \"hi\"\n<tag> it's\u{FFFF}".to_string());
        assert_eq!(
            render_literal(&value),
            "\"say \\\"hi\\\"\\n\\u003ctag\\u003e it\\u0027s\\uFFFF\""
        );
    }

    #[test]
    fn test_type_token_with_inheritance_and_interfaces() {
        let resource = TypeNode::new("Foo.Bar", "IResource", TypeKind::Interface);
        let mut hidden_iface = TypeNode::new("Foo.Bar", "IInternal", TypeKind::Interface);
        hidden_iface.attributes = vec![hidden()];
        let mut widget = widget();
        widget.base = Some(TypeRef::new("System", "Object").in_module("mscorlib"));
        widget.interfaces = vec![
            TypeRef::new("Foo.Bar", "IResource"),
            TypeRef::new("Foo.Bar", "IInternal"),
            TypeRef::new("System", "IDisposable").in_module("mscorlib"),
        ];

        let mut corlib = ModuleMetadata::new("mscorlib");
        corlib.types = vec![TypeNode::new("System", "IDisposable", TypeKind::Interface)];
        let mut module = ModuleMetadata::new("Foo");
        module.types = vec![resource, hidden_iface, widget];
        let set = ModuleSet::standalone(module).with_dependency(corlib);
        let visibility = resolve(set.exported_types(), true).unwrap();
        let resolved = visibility.iter().nth(2).unwrap();

        let plain = SignatureRenderer::new(false)
            .render_type(resolved, &set, &visibility)
            .unwrap();
        assert_eq!(
            plain.token,
            "TYPE|Foo.Bar.Widget|IMPLEMENTS:Foo.Bar.IResource,System.IDisposable"
        );
        assert!(plain.is_public);

        let tracked = SignatureRenderer::new(true)
            .render_type(resolved, &set, &visibility)
            .unwrap();
        assert_eq!(
            tracked.token,
            "TYPE|Foo.Bar.Widget|INHERITS:System.Object|IMPLEMENTS:Foo.Bar.IResource,System.IDisposable"
        );
    }

    #[test]
    fn test_foreign_interface_hidden_by_its_hint() {
        let mut secret = TypeNode::new("Other", "ISecret", TypeKind::Interface);
        secret.attributes = vec![hidden()];
        let mut other = ModuleMetadata::new("Other");
        other.types = vec![secret];

        let mut widget = widget();
        widget.interfaces = vec![TypeRef::new("Other", "ISecret").in_module("Other")];
        let mut module = ModuleMetadata::new("Foo");
        module.types = vec![widget];
        let set = ModuleSet::standalone(module).with_dependency(other);
        let visibility = resolve(set.exported_types(), true).unwrap();
        let resolved = visibility.iter().next().unwrap();

        let entry = SignatureRenderer::new(false)
            .render_type(resolved, &set, &visibility)
            .unwrap();
        assert_eq!(entry.token, "TYPE|Foo.Bar.Widget");
    }
}
