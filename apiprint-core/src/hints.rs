//! Visibility hint decoding.
//!
//! Hints are read straight from the attribute's constant-argument table:
//! constructor arguments first, then named field/property overrides. No
//! attribute object is ever instantiated.

use crate::error::{Result, SurfaceError};
use crate::types::{AttrValue, Attribute};

pub const OBFUSCATION_ATTRIBUTE: &str = "System.Reflection.ObfuscationAttribute";
pub const OBFUSCATE_ASSEMBLY_ATTRIBUTE: &str = "System.Reflection.ObfuscateAssemblyAttribute";
pub const CONDITIONAL_ATTRIBUTE: &str = "System.Diagnostics.ConditionalAttribute";

/// Feature prefix of a module-level ignore declaration.
pub const IGNORE_PREFIX: &str = "AssemblyCompareIgnore ";

/// A decoded obfuscation hint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObfuscationHint {
    /// True keeps the element visible.
    pub exclude: bool,
    pub apply_to_members: bool,
    /// Empty for the canonical visibility hint.
    pub feature: String,
    pub strip_after_obfuscation: bool,
}

impl Default for ObfuscationHint {
    fn default() -> Self {
        Self {
            exclude: true,
            apply_to_members: true,
            feature: String::new(),
            strip_after_obfuscation: true,
        }
    }
}

impl ObfuscationHint {
    /// Decode a single attribute, or `None` if it is not an obfuscation hint.
    pub fn decode(attr: &Attribute, element: &str) -> Result<Option<Self>> {
        if attr.type_name != OBFUSCATION_ATTRIBUTE {
            return Ok(None);
        }
        if !attr.constructor_args.is_empty() {
            return Err(malformed(attr, element, "expects no constructor arguments"));
        }

        let mut hint = Self::default();
        for named in &attr.named_args {
            match named.name.as_str() {
                "Exclude" => hint.exclude = expect_bool(attr, element, &named.value)?,
                "ApplyToMembers" => hint.apply_to_members = expect_bool(attr, element, &named.value)?,
                "StripAfterObfuscation" => {
                    hint.strip_after_obfuscation = expect_bool(attr, element, &named.value)?
                }
                "Feature" => {
                    hint.feature = named
                        .value
                        .as_str()
                        .ok_or_else(|| malformed(attr, element, "Feature must be a string"))?
                        .to_string()
                }
                other => {
                    return Err(malformed(
                        attr,
                        element,
                        &format!("unknown named argument '{}'", other),
                    ))
                }
            }
        }
        Ok(Some(hint))
    }

    /// Decode every obfuscation hint in an attribute list.
    pub fn decode_all(attrs: &[Attribute], element: &str) -> Result<Vec<Self>> {
        let mut hints = Vec::new();
        for attr in attrs {
            if let Some(hint) = Self::decode(attr, element)? {
                hints.push(hint);
            }
        }
        Ok(hints)
    }

    /// Visibility for an element carrying this optional hint.
    pub fn is_visible(hint: Option<&Self>, default_visible: bool) -> bool {
        hint.map_or(default_visible, |h| h.exclude)
    }

    /// Payload of an ignore declaration, if this hint is one.
    pub fn ignore_pattern(&self) -> Option<&str> {
        let prefix_len = IGNORE_PREFIX.len();
        let head = self.feature.get(..prefix_len)?;
        if head.eq_ignore_ascii_case(IGNORE_PREFIX) {
            Some(self.feature[prefix_len..].trim())
        } else {
            None
        }
    }
}

/// The canonical visibility hint (empty feature) on an element.
///
/// More than one is a configuration error.
pub fn visibility_hint(attrs: &[Attribute], element: &str) -> Result<Option<ObfuscationHint>> {
    let mut hints: Vec<ObfuscationHint> = ObfuscationHint::decode_all(attrs, element)?
        .into_iter()
        .filter(|h| h.feature.is_empty())
        .collect();
    match hints.len() {
        0 => Ok(None),
        1 => Ok(hints.pop()),
        count => Err(SurfaceError::DuplicateHint {
            element: element.to_string(),
            count,
        }),
    }
}

/// Whether a module-level hint declares the whole module private.
pub fn assembly_is_private(attrs: &[Attribute], module: &str) -> Result<bool> {
    let mut found = Vec::new();
    for attr in attrs.iter().filter(|a| a.type_name == OBFUSCATE_ASSEMBLY_ATTRIBUTE) {
        let value = match attr.constructor_args.as_slice() {
            [value] => expect_bool(attr, module, value)?,
            _ => return Err(malformed(attr, module, "expects one boolean argument")),
        };
        found.push(value);
    }
    match found.len() {
        0 => Ok(false),
        1 => Ok(found[0]),
        count => Err(SurfaceError::DuplicateHint {
            element: format!("module {}", module),
            count,
        }),
    }
}

/// Whether the element only exists in DEBUG builds.
pub fn is_debug_conditional(attrs: &[Attribute]) -> bool {
    attrs
        .iter()
        .filter(|a| a.type_name == CONDITIONAL_ATTRIBUTE)
        .filter_map(|a| a.constructor_args.first().and_then(AttrValue::as_str))
        .any(|condition| condition.eq_ignore_ascii_case("DEBUG"))
}

fn expect_bool(attr: &Attribute, element: &str, value: &AttrValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| malformed(attr, element, "expected a boolean value"))
}

fn malformed(attr: &Attribute, element: &str, message: &str) -> SurfaceError {
    SurfaceError::MalformedAttribute {
        attribute: attr.type_name.clone(),
        element: element.to_string(),
        message: message.to_string(),
    }
}
