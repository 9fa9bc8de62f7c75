//! Typed binding of configuration trees.
//!
//! Leaves are stored as text, so the deserializer parses them on demand into
//! whatever the target type asks for. A few conversions make string-only
//! sources (environment variables, properties) usable for structured types:
//!
//! - booleans accept `true/false`, `yes/no`, `on/off` and `1/0`;
//! - an empty value is `None` for options and an empty struct or map;
//! - a value requested as a sequence is split on commas.
//!
//! Externally tagged enums are supported: a unit variant is written as its
//! name, other variants as a single-entry map.

use std::fmt;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess,
    SeqAccess, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use thiserror::Error;

use crate::node::{ConfigNode, MapNode};

/// Error raised while binding a tree to a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeError(String);

impl DeError {
    fn mismatch(found: &ConfigNode, expected: &str) -> Self {
        Self(format!("expected {expected}, found {}", found.kind()))
    }

    fn unparsable(text: &str, expected: &str) -> Self {
        Self(format!("cannot parse '{text}' as {expected}"))
    }
}

impl de::Error for DeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Deserializes `T` from a configuration node.
///
/// # Example
///
/// ```
/// use seedstack_config::{from_node, parse_str, Format};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Pool {
///     size: u32,
///     enabled: bool,
/// }
///
/// let node = parse_str("size: '12'\nenabled: on\n", Format::Yaml).unwrap();
/// let pool: Pool = from_node(&node).unwrap();
/// assert_eq!(pool.size, 12);
/// assert!(pool.enabled);
/// ```
pub fn from_node<T: DeserializeOwned>(node: &ConfigNode) -> Result<T, DeError> {
    T::deserialize(node)
}

/// Parses a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

struct ScalarDeserializer<'de> {
    text: &'de str,
}

impl<'de> ScalarDeserializer<'de> {
    fn new(text: &'de str) -> Self {
        Self { text }
    }
}

macro_rules! parse_number {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                let number = self
                    .text
                    .trim()
                    .parse::<$ty>()
                    .map_err(|_| DeError::unparsable(self.text, stringify!($ty)))?;
                visitor.$visit(number)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ScalarDeserializer<'de> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_borrowed_str(self.text)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let flag = parse_bool(self.text).ok_or_else(|| DeError::unparsable(self.text, "bool"))?;
        visitor.visit_bool(flag)
    }

    parse_number! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let mut chars = self.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(DeError::unparsable(self.text, "char")),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_borrowed_bytes(self.text.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        if self.text.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let parts: Vec<&'de str> = if self.text.trim().is_empty() {
            Vec::new()
        } else {
            self.text.split(',').map(str::trim).collect()
        };
        visitor.visit_seq(CommaSeq {
            parts: parts.into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        if self.text.is_empty() {
            visitor.visit_map(NodeMap::empty())
        } else {
            Err(DeError::unparsable(self.text, "map"))
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        let variant: de::value::StrDeserializer<'_, DeError> = self.text.trim().into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        str string identifier
    }
}

struct CommaSeq<'de> {
    parts: std::vec::IntoIter<&'de str>,
}

impl<'de> SeqAccess<'de> for CommaSeq<'de> {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        self.parts
            .next()
            .map(|part| seed.deserialize(ScalarDeserializer::new(part)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.parts.len())
    }
}

struct NodeSeq<'de> {
    items: std::slice::Iter<'de, ConfigNode>,
}

impl<'de> SeqAccess<'de> for NodeSeq<'de> {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        self.items.next().map(|item| seed.deserialize(item)).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct NodeMap<'de> {
    entries: Option<indexmap::map::Iter<'de, String, ConfigNode>>,
    pending: Option<&'de ConfigNode>,
}

impl<'de> NodeMap<'de> {
    fn new(map: &'de MapNode) -> Self {
        Self {
            entries: Some(map.iter()),
            pending: None,
        }
    }

    fn empty() -> Self {
        Self {
            entries: None,
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for NodeMap<'de> {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        let Some((key, value)) = self.entries.as_mut().and_then(Iterator::next) else {
            return Ok(None);
        };
        self.pending = Some(value);
        seed.deserialize(ScalarDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| DeError(String::from("map value requested before its key")))?;
        seed.deserialize(value)
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.as_ref().map(ExactSizeIterator::len)
    }
}

struct NodeEnum<'de> {
    variant: &'de str,
    content: &'de ConfigNode,
}

impl<'de> EnumAccess<'de> for NodeEnum<'de> {
    type Error = DeError;
    type Variant = NodeVariant<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), DeError> {
        let variant = seed.deserialize(ScalarDeserializer::new(self.variant))?;
        Ok((variant, NodeVariant { content: self.content }))
    }
}

struct NodeVariant<'de> {
    content: &'de ConfigNode,
}

impl<'de> VariantAccess<'de> for NodeVariant<'de> {
    type Error = DeError;

    fn unit_variant(self) -> Result<(), DeError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, DeError> {
        seed.deserialize(self.content)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, DeError> {
        Deserializer::deserialize_seq(self.content, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        Deserializer::deserialize_map(self.content, visitor)
    }
}

macro_rules! forward_to_scalar {
    ($($method:ident => $expected:literal),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                match self {
                    ConfigNode::Value(text) => ScalarDeserializer::new(text).$method(visitor),
                    other => Err(DeError::mismatch(other, $expected)),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for &'de ConfigNode {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self {
            ConfigNode::Map(map) => visitor.visit_map(NodeMap::new(map)),
            ConfigNode::Array(items) => visitor.visit_seq(NodeSeq { items: items.iter() }),
            ConfigNode::Value(text) => ScalarDeserializer::new(text).deserialize_any(visitor),
        }
    }

    forward_to_scalar! {
        deserialize_bool => "a boolean",
        deserialize_i8 => "an integer",
        deserialize_i16 => "an integer",
        deserialize_i32 => "an integer",
        deserialize_i64 => "an integer",
        deserialize_u8 => "an integer",
        deserialize_u16 => "an integer",
        deserialize_u32 => "an integer",
        deserialize_u64 => "an integer",
        deserialize_f32 => "a number",
        deserialize_f64 => "a number",
        deserialize_char => "a character",
        deserialize_str => "a string",
        deserialize_string => "a string",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self {
            ConfigNode::Value(text) if text.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self {
            ConfigNode::Array(items) => visitor.visit_seq(NodeSeq { items: items.iter() }),
            ConfigNode::Value(text) => ScalarDeserializer::new(text).deserialize_seq(visitor),
            ConfigNode::Map(_) => Err(DeError::mismatch(self, "a sequence")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self {
            ConfigNode::Map(map) => visitor.visit_map(NodeMap::new(map)),
            ConfigNode::Value(text) => ScalarDeserializer::new(text).deserialize_map(visitor),
            ConfigNode::Array(_) => Err(DeError::mismatch(self, "a map")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match self {
            ConfigNode::Value(text) => {
                ScalarDeserializer::new(text).deserialize_enum(name, variants, visitor)
            }
            ConfigNode::Map(map) if map.len() == 1 => {
                let Some((variant, content)) = map.iter().next() else {
                    return Err(DeError::mismatch(self, "a single-entry map"));
                };
                visitor.visit_enum(NodeEnum { variant, content })
            }
            _ => Err(DeError::mismatch(self, "an enum variant")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_unit()
    }
}

impl<'de> IntoDeserializer<'de, DeError> for &'de ConfigNode {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, Format};
    use serde::Deserialize;
    use std::collections::BTreeMap;

    fn yaml(content: &str) -> ConfigNode {
        parse_str(content, Format::Yaml).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Strict,
        Lenient,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Backend {
        Memory,
        Redis { url: String },
        Sharded(Vec<String>),
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Datasource {
        url: String,
        pool_size: u16,
        timeout: f64,
        #[serde(default)]
        read_only: bool,
        user: Option<String>,
        password: Option<String>,
        mode: Mode,
        hosts: Vec<String>,
    }

    #[test]
    fn test_struct_from_text_leaves() {
        let node = yaml(
            "url: jdbc:h2:mem\npool_size: '8'\ntimeout: 2.5\nuser: sa\n\
             password:\nmode: strict\nhosts: [a, b]\n",
        );
        let datasource: Datasource = from_node(&node).unwrap();
        assert_eq!(
            datasource,
            Datasource {
                url: "jdbc:h2:mem".to_string(),
                pool_size: 8,
                timeout: 2.5,
                read_only: false,
                user: Some("sa".to_string()),
                password: None,
                mode: Mode::Strict,
                hosts: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_comma_separated_sequence() {
        let hosts: Vec<String> = from_node(&ConfigNode::from("a, b ,c")).unwrap();
        assert_eq!(hosts, vec!["a", "b", "c"]);

        let ports: Vec<u16> = from_node(&ConfigNode::from("80,443")).unwrap();
        assert_eq!(ports, vec![80, 443]);

        let empty: Vec<String> = from_node(&ConfigNode::from("")).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_bool_spellings() {
        assert!(from_node::<bool>(&ConfigNode::from("yes")).unwrap());
        assert!(from_node::<bool>(&ConfigNode::from("ON")).unwrap());
        assert!(!from_node::<bool>(&ConfigNode::from("0")).unwrap());
        assert!(from_node::<bool>(&ConfigNode::from("maybe")).is_err());
    }

    #[test]
    fn test_invalid_number_reports_text() {
        let err = from_node::<u8>(&ConfigNode::from("300")).unwrap_err();
        assert!(err.to_string().contains("300"));
        assert!(err.to_string().contains("u8"));
    }

    #[test]
    fn test_kind_mismatch() {
        let err = from_node::<String>(&yaml("a: 1\n")).unwrap_err();
        assert_eq!(err.to_string(), "expected a string, found map");
    }

    #[test]
    fn test_enum_representations() {
        assert_eq!(from_node::<Backend>(&ConfigNode::from("Memory")).unwrap(), Backend::Memory);
        assert_eq!(
            from_node::<Backend>(&yaml("Redis:\n  url: redis://cache\n")).unwrap(),
            Backend::Redis {
                url: "redis://cache".to_string()
            }
        );
        assert_eq!(
            from_node::<Backend>(&yaml("Sharded: [s1, s2]\n")).unwrap(),
            Backend::Sharded(vec!["s1".to_string(), "s2".to_string()])
        );
        assert!(from_node::<Mode>(&ConfigNode::from("unknown")).is_err());
    }

    #[test]
    fn test_map_with_typed_keys() {
        let weights: BTreeMap<u32, String> = from_node(&yaml("1: one\n2: two\n")).unwrap();
        assert_eq!(weights.get(&2).map(String::as_str), Some("two"));
    }

    #[test]
    fn test_empty_value_as_struct_uses_defaults() {
        #[derive(Debug, Deserialize, Default, PartialEq)]
        #[serde(default)]
        struct Section {
            enabled: bool,
            name: String,
        }
        let section: Section = from_node(&ConfigNode::from("")).unwrap();
        assert_eq!(section, Section::default());
    }

    #[test]
    fn test_unknown_fields_rejected_when_denied() {
        #[derive(Debug, Deserialize)]
        #[serde(deny_unknown_fields)]
        #[allow(dead_code)]
        struct Strict {
            name: String,
        }
        let err = from_node::<Strict>(&yaml("name: a\nextra: b\n")).unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_any_value_as_json() {
        let value: serde_json::Value = from_node(&yaml("a: [1, x]\nb: {c: true}\n")).unwrap();
        assert_eq!(value, serde_json::json!({"a": ["1", "x"], "b": {"c": "true"}}));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}
