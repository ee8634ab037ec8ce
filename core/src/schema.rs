//! Schema Registry and Schema Generator.
//!
//! Maps data-model types to JSON Schema documents (represented on top of
//! `utoipa::openapi::schema` types, the same representation the rest of this workspace's
//! corpus converges on) and produces references on demand.

use alloc::{
    borrow::ToOwned,
    boxed::Box,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::any::TypeId;

use base64::Engine as _;
use serde_json::Value;
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema as UtoipaSchema, Type};
use utoipa::openapi::RefOr;

use crate::error::{Error, Result};

/// A single precompiled validation rule, produced once after a [`Schema`] is fully built
/// so request-time validation never re-parses annotation strings.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    /// String length must fall within `[min, max]` (counted in Unicode scalar values).
    Length {
        /// Inclusive lower bound, if any.
        min: Option<usize>,
        /// Inclusive upper bound, if any.
        max: Option<usize>,
    },
    /// Numeric bound, `exclusive` selecting `<`/`>` instead of `<=`/`>=`.
    Minimum {
        /// The bound itself.
        value: f64,
        /// Whether the bound is exclusive.
        exclusive: bool,
    },
    /// See [`CompiledRule::Minimum`].
    Maximum {
        /// The bound itself.
        value: f64,
        /// Whether the bound is exclusive.
        exclusive: bool,
    },
    /// The value must be an integer multiple of this number.
    MultipleOf(f64),
    /// Array item count bounds.
    ItemCount {
        /// Inclusive lower bound, if any.
        min: Option<usize>,
        /// Inclusive upper bound, if any.
        max: Option<usize>,
    },
    /// Array elements must be pairwise distinct.
    UniqueItems,
    /// Object property count bounds.
    PropertyCount {
        /// Inclusive lower bound, if any.
        min: Option<usize>,
        /// Inclusive upper bound, if any.
        max: Option<usize>,
    },
    /// The value, rendered as a string, must match this anchored regular expression.
    Pattern(regex::Regex),
    /// The value must equal one of these (spec.md §4.2 `enum`).
    Enum(Vec<Value>),
    /// The value must satisfy this named string format (spec.md §4.2 `format`).
    Format(StringFormat),
}

impl CompiledRule {
    /// Compile `source` into an anchored [`CompiledRule::Pattern`] — JSON Schema's
    /// `pattern` is a substring search by default, but spec.md §4.3 calls for full-string
    /// matching, so the source is wrapped in `^(?:...)$` before compiling.
    ///
    /// # Errors
    ///
    /// Propagates the underlying regex compile error.
    pub fn pattern(source: &str) -> core::result::Result<Self, regex::Error> {
        regex::Regex::new(&format!("^(?:{source})$")).map(Self::Pattern)
    }
}

/// A `format` annotation value recognized by the validator (spec.md §4.2 `format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// RFC 3339 date-time, e.g. `2024-01-02T03:04:05Z`.
    DateTime,
    /// RFC 3339 full-date, e.g. `2024-01-02`.
    Date,
    /// RFC 3339 full-time, e.g. `03:04:05Z`.
    Time,
    /// A URI with a scheme.
    Uri,
    /// An email address.
    Email,
    /// A UUID.
    Uuid,
    /// An IPv4 address.
    Ipv4,
    /// An IPv6 address.
    Ipv6,
    /// A DNS hostname.
    Hostname,
    /// Base64-encoded binary data.
    Byte,
}

impl StringFormat {
    /// Parse a `#[schema(format = "...")]` tag value into a [`StringFormat`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "date-time" => Some(Self::DateTime),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "uri" => Some(Self::Uri),
            "email" => Some(Self::Email),
            "uuid" => Some(Self::Uuid),
            "ipv4" => Some(Self::Ipv4),
            "ipv6" => Some(Self::Ipv6),
            "hostname" => Some(Self::Hostname),
            "byte" => Some(Self::Byte),
            _ => None,
        }
    }

    /// The canonical JSON Schema name for this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Uri => "uri",
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Hostname => "hostname",
            Self::Byte => "byte",
        }
    }

    /// Whether `value` satisfies this format.
    #[must_use]
    pub fn is_valid(self, value: &str) -> bool {
        match self {
            Self::DateTime => matches_anchored(
                r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$",
                value,
            ),
            Self::Date => matches_anchored(r"^\d{4}-\d{2}-\d{2}$", value),
            Self::Time => {
                matches_anchored(r"^\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$", value)
            }
            Self::Uri => matches_anchored(r"^[a-zA-Z][a-zA-Z0-9+.-]*:\S+$", value),
            Self::Email => matches_anchored(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", value),
            Self::Hostname => is_valid_hostname(value),
            Self::Uuid => uuid::Uuid::parse_str(value).is_ok(),
            Self::Ipv4 => value.parse::<core::net::Ipv4Addr>().is_ok(),
            Self::Ipv6 => value.parse::<core::net::Ipv6Addr>().is_ok(),
            Self::Byte => base64::engine::general_purpose::STANDARD.decode(value).is_ok(),
        }
    }
}

fn matches_anchored(pattern: &str, value: &str) -> bool {
    regex::Regex::new(pattern).is_ok_and(|re| re.is_match(value))
}

fn is_valid_hostname(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

/// A built schema: either a named reference into a [`Registry`] or an inline definition.
#[derive(Debug, Clone)]
pub enum Schema {
    /// `{"$ref": "#/components/schemas/<name>"}`.
    Ref(String),
    /// A fully inline schema.
    Inline(Box<SchemaObject>),
}

impl Schema {
    /// Build a `{type: "string"}` schema, the fallback used for opaque/decay-to-string
    /// types.
    #[must_use]
    pub fn string() -> Self {
        Self::Inline(Box::new(SchemaObject::new(UtoipaSchema::Object(
            ObjectBuilder::new().schema_type(Type::String).build(),
        ))))
    }

    /// Wrap an already-built [`SchemaObject`] as an inline schema.
    ///
    /// Exists so macro-generated code (which runs in an ordinary `std` crate, not this
    /// `no_std` one) never needs to name `alloc::boxed::Box` directly.
    #[must_use]
    pub fn inline(object: SchemaObject) -> Self {
        Self::Inline(Box::new(object))
    }

    /// The name this schema resolves to, if it is a reference.
    #[must_use]
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref(name) => Some(name),
            Self::Inline(_) => None,
        }
    }

    /// Render this schema as a JSON Schema document, resolving `$ref`s against `registry`.
    #[must_use]
    pub fn to_json(&self, registry: &Registry) -> Value {
        match self {
            Self::Ref(name) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    "$ref".to_string(),
                    Value::String(format!("#/components/schemas/{name}")),
                );
                Value::Object(map)
            }
            Self::Inline(object) => object.to_json(registry),
        }
    }
}

/// An inline schema together with its precompiled validation rules.
#[derive(Debug, Clone)]
pub struct SchemaObject {
    /// The underlying `utoipa`/JSON-Schema representation.
    pub raw: RefOr<UtoipaSchema>,
    /// Rules precomputed from the tag annotations so the validator can apply them
    /// without re-deriving them per request.
    pub rules: Vec<CompiledRule>,
    /// Declared-order property list (name, schema) for struct-like schemas. Kept
    /// alongside `raw` because `utoipa`'s builder does not expose iteration order back
    /// out once built.
    pub properties: Vec<(String, Schema)>,
    /// Declared-order required property names.
    pub required: Vec<String>,
    /// `additionalProperties` schema, when it is a schema rather than a bare bool.
    pub additional_properties: Option<AdditionalProperties>,
    /// Array item schema, for array-typed schemas.
    pub items: Option<Box<Schema>>,
    /// Property names flagged `readOnly` (not required when validating in write-to-server
    /// mode).
    pub read_only: Vec<String>,
    /// Property names flagged `writeOnly` (not required when validating in
    /// read-from-server mode).
    pub write_only: Vec<String>,
    /// The decoded `default` tag value (spec.md §4.2 `default`), validated against this
    /// schema at registration time.
    pub default: Option<Value>,
    /// `oneOf`: the value must match exactly one of these schemas.
    pub one_of: Vec<Schema>,
    /// `anyOf`: the value must match at least one of these schemas.
    pub any_of: Vec<Schema>,
    /// `allOf`: the value must match every one of these schemas.
    pub all_of: Vec<Schema>,
    /// `not`: the value must not match this schema.
    pub not: Option<Box<Schema>>,
}

/// The `additionalProperties` keyword: either a boolean gate or a schema every unknown
/// property value must satisfy.
#[derive(Debug, Clone)]
pub enum AdditionalProperties {
    /// `additionalProperties: true|false`.
    Bool(bool),
    /// `additionalProperties: <schema>`.
    Schema(Box<Schema>),
}

impl SchemaObject {
    /// Wrap a raw `utoipa` schema with empty rule/property/required lists.
    #[must_use]
    pub const fn new(schema: UtoipaSchema) -> Self {
        Self {
            raw: RefOr::T(schema),
            rules: Vec::new(),
            properties: Vec::new(),
            required: Vec::new(),
            additional_properties: None,
            items: None,
            read_only: Vec::new(),
            write_only: Vec::new(),
            default: None,
            one_of: Vec::new(),
            any_of: Vec::new(),
            all_of: Vec::new(),
            not: None,
        }
    }

    /// Render this schema object as a JSON Schema document, folding in everything tracked
    /// outside of `raw` (properties, rules, composition, defaults) that `utoipa`'s own
    /// serde impl never sees.
    #[must_use]
    pub fn to_json(&self, registry: &Registry) -> Value {
        let mut map = match serde_json::to_value(&self.raw).unwrap_or(Value::Null) {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        if !self.properties.is_empty() {
            let mut properties = serde_json::Map::new();
            for (name, schema) in &self.properties {
                let mut rendered = schema.to_json(registry);
                if let Value::Object(ref mut prop) = rendered {
                    if self.read_only.iter().any(|n| n == name) {
                        prop.insert("readOnly".to_string(), Value::Bool(true));
                    }
                    if self.write_only.iter().any(|n| n == name) {
                        prop.insert("writeOnly".to_string(), Value::Bool(true));
                    }
                }
                properties.insert(name.clone(), rendered);
            }
            map.insert("properties".to_string(), Value::Object(properties));
        }

        if !self.required.is_empty() {
            map.insert(
                "required".to_string(),
                Value::Array(self.required.iter().cloned().map(Value::String).collect()),
            );
        }

        match &self.additional_properties {
            Some(AdditionalProperties::Bool(allowed)) => {
                map.insert("additionalProperties".to_string(), Value::Bool(*allowed));
            }
            Some(AdditionalProperties::Schema(schema)) => {
                map.insert("additionalProperties".to_string(), schema.to_json(registry));
            }
            None => {}
        }

        if let Some(items) = &self.items {
            map.insert("items".to_string(), items.to_json(registry));
        }

        if let Some(default) = &self.default {
            map.insert("default".to_string(), default.clone());
        }

        for rule in &self.rules {
            match rule {
                CompiledRule::Length { min, max } => {
                    if let Some(min) = min {
                        map.insert("minLength".to_string(), (*min).into());
                    }
                    if let Some(max) = max {
                        map.insert("maxLength".to_string(), (*max).into());
                    }
                }
                CompiledRule::Minimum { value, exclusive } => {
                    let key = if *exclusive { "exclusiveMinimum" } else { "minimum" };
                    map.insert(key.to_string(), json_number(*value));
                }
                CompiledRule::Maximum { value, exclusive } => {
                    let key = if *exclusive { "exclusiveMaximum" } else { "maximum" };
                    map.insert(key.to_string(), json_number(*value));
                }
                CompiledRule::MultipleOf(value) => {
                    map.insert("multipleOf".to_string(), json_number(*value));
                }
                CompiledRule::ItemCount { min, max } => {
                    if let Some(min) = min {
                        map.insert("minItems".to_string(), (*min).into());
                    }
                    if let Some(max) = max {
                        map.insert("maxItems".to_string(), (*max).into());
                    }
                }
                CompiledRule::UniqueItems => {
                    map.insert("uniqueItems".to_string(), Value::Bool(true));
                }
                CompiledRule::PropertyCount { min, max } => {
                    if let Some(min) = min {
                        map.insert("minProperties".to_string(), (*min).into());
                    }
                    if let Some(max) = max {
                        map.insert("maxProperties".to_string(), (*max).into());
                    }
                }
                CompiledRule::Pattern(regex) => {
                    map.insert("pattern".to_string(), Value::String(regex.as_str().to_string()));
                }
                CompiledRule::Enum(values) => {
                    map.insert("enum".to_string(), Value::Array(values.clone()));
                }
                CompiledRule::Format(format) => {
                    map.insert("format".to_string(), Value::String(format.as_str().to_string()));
                }
            }
        }

        if !self.one_of.is_empty() {
            map.insert(
                "oneOf".to_string(),
                Value::Array(self.one_of.iter().map(|s| s.to_json(registry)).collect()),
            );
        }
        if !self.any_of.is_empty() {
            map.insert(
                "anyOf".to_string(),
                Value::Array(self.any_of.iter().map(|s| s.to_json(registry)).collect()),
            );
        }
        if !self.all_of.is_empty() {
            map.insert(
                "allOf".to_string(),
                Value::Array(self.all_of.iter().map(|s| s.to_json(registry)).collect()),
            );
        }
        if let Some(not) = &self.not {
            map.insert("not".to_string(), not.to_json(registry));
        }

        Value::Object(map)
    }
}

/// `serde_json::Value` has no direct `From<f64>` (NaN/infinity have no JSON
/// representation); fall back to `Value::Null` for those rather than panicking.
fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Naming function used to derive a schema's registry key from a Rust type name.
///
/// Strips module-path qualification and indirection, then uppercases the leading
/// character, mirroring spec.md's default namer (`strip indirection, take the base
/// name, uppercase the first rune`).
#[must_use]
pub fn default_namer(rust_type_name: &str) -> String {
    let base = rust_type_name
        .rsplit("::")
        .next()
        .unwrap_or(rust_type_name)
        .trim_start_matches(['&', '*'])
        .trim_start_matches("mut ");
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Maps data-model types to JSON Schema documents.
///
/// Grounded on the teacher's `core/src/openapi.rs` `SchemaCollector` and, more directly,
/// on the pack's `reinhardt-openapi` `SchemaRegistry` (`other_examples/..._registry.rs.rs`),
/// which uses the same `utoipa::openapi::{Schema, RefOr}` representation.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: BTreeMap<String, SchemaObject>,
    reverse: BTreeMap<String, TypeId>,
    seen: BTreeMap<TypeId, String>,
    aliases: BTreeMap<TypeId, TypeId>,
    namer: Option<fn(&str) -> String>,
}

impl Registry {
    /// Create an empty registry using the default namer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the naming function used to turn a type's Rust name into a schema name.
    pub fn set_namer(&mut self, namer: fn(&str) -> String) {
        self.namer = Some(namer);
    }

    fn name_for(&self, rust_type_name: &str) -> String {
        self.namer.unwrap_or(default_namer)(rust_type_name)
    }

    /// Redirect generation so `from` is represented exactly like `to`.
    pub fn register_type_alias(&mut self, from: TypeId, to: TypeId) {
        self.aliases.insert(from, to);
    }

    /// Produce a [`Schema`] for `T`, inserting it into the registry under a generated
    /// name when it is a struct-like composite and returning a `$ref` when `allow_ref`
    /// is true.
    ///
    /// Recursive types are handled by inserting a placeholder schema for `T`'s name
    /// before calling `T::schema`, so a self-reference encountered while building `T`
    /// resolves to `{ref: name}` rather than recursing forever.
    ///
    /// # Errors
    ///
    /// Returns an error if a different type has already claimed the generated name
    /// (spec.md's duplicate-name registration error).
    pub fn schema_for<T: Generate + 'static>(&mut self, allow_ref: bool) -> Result<Schema> {
        let type_id = self.aliased_id::<T>();

        if let Some(existing_name) = self.seen.get(&type_id).cloned() {
            return Ok(if allow_ref {
                Schema::Ref(existing_name)
            } else {
                Schema::Inline(Box::new(self.schemas[&existing_name].clone()))
            });
        }

        if !T::IS_REF_TYPE {
            return T::generate(self);
        }

        let name = self.name_for(T::type_name());
        if let Some(owner) = self.reverse.get(&name) {
            if *owner != type_id {
                return Err(Error::msg(alloc::format!(
                    "duplicate schema name `{name}` produced by two distinct types"
                )));
            }
        }

        self.seen.insert(type_id, name.clone());
        self.reverse.insert(name.clone(), type_id);
        // Placeholder so recursive fields resolve to `{ref: name}` instead of looping.
        self.schemas.insert(
            name.clone(),
            SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build())),
        );

        let built = T::generate(self)?;
        if let Schema::Inline(object) = built {
            self.schemas.insert(name.clone(), *object);
        }

        Ok(if allow_ref {
            Schema::Ref(name)
        } else {
            Schema::Inline(Box::new(self.schemas[&name].clone()))
        })
    }

    fn aliased_id<T: 'static>(&self) -> TypeId {
        let id = TypeId::of::<T>();
        let mut current = id;
        while let Some(next) = self.aliases.get(&current) {
            if *next == current {
                break;
            }
            current = *next;
        }
        current
    }

    /// Dereference a `$ref` name back to its [`SchemaObject`].
    #[must_use]
    pub fn schema_from_ref(&self, name: &str) -> Option<&SchemaObject> {
        self.schemas.get(name)
    }

    /// Reverse lookup: the `TypeId` that produced `name`, if any.
    #[must_use]
    pub fn type_from_ref(&self, name: &str) -> Option<TypeId> {
        self.reverse.get(name).copied()
    }

    /// All named schemas currently stored, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaObject)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of distinct named schemas registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry currently holds no named schemas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Produces a [`Schema`] from a type, inspecting its structure and field annotations.
///
/// Implemented by hand for primitives/std types in [`builtins`]; implemented for
/// application structs by `#[derive(Schema)]` from `breeze-macros`, which performs at
/// compile time the structural walk spec.md describes as runtime reflection (see
/// SPEC_FULL.md §9).
pub trait Generate {
    /// Whether this type "gets a reference": stored under a generated name in the
    /// registry rather than inlined at every use site. True for structs; false for
    /// primitives, strings, and types that decay to a plain scalar schema.
    const IS_REF_TYPE: bool = false;

    /// The Rust type name used to derive a registry key, e.g. via `core::any::type_name`.
    fn type_name() -> &'static str;

    /// Build this type's schema, recursing into the registry for nested ref types.
    ///
    /// # Errors
    ///
    /// Propagates duplicate-name errors encountered while generating nested schemas.
    fn generate(registry: &mut Registry) -> Result<Schema>;

    /// Replace any field still at its zero value with its precomputed `default` tag value
    /// (spec.md §4.6 "Default plan"). The default implementation is a no-op; `#[derive(Schema)]`
    /// overrides it for types with at least one defaulted, non-required field.
    fn apply_defaults(&mut self) {}
}

/// Built-in [`Generate`] implementations for primitives and common std/ecosystem types,
/// grounded on the teacher's `src/openapi/builtins.rs` primitive schema impls.
pub mod builtins {
    use super::{
        ArrayBuilder, Generate, ObjectBuilder, Registry, Result, Schema, SchemaObject, Type,
        UtoipaSchema,
    };
    use alloc::{boxed::Box, string::ToString, vec::Vec};
    use utoipa::openapi::schema::SchemaFormat;
    use utoipa::openapi::KnownFormat;

    macro_rules! scalar_impl {
        ($ty:ty, $schema_ty:expr) => {
            impl Generate for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn generate(_registry: &mut Registry) -> Result<Schema> {
                    Ok(Schema::Inline(Box::new(SchemaObject::new(
                        UtoipaSchema::Object(ObjectBuilder::new().schema_type($schema_ty).build()),
                    ))))
                }
            }
        };
    }

    scalar_impl!(bool, Type::Boolean);
    scalar_impl!(String, Type::String);

    macro_rules! int_impl {
        ($ty:ty, $format:expr, $minimum:expr) => {
            impl Generate for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn generate(_registry: &mut Registry) -> Result<Schema> {
                    let mut builder = ObjectBuilder::new()
                        .schema_type(Type::Integer)
                        .format(Some(SchemaFormat::KnownFormat($format)));
                    if let Some(min) = $minimum {
                        builder = builder.minimum(Some(min));
                    }
                    Ok(Schema::Inline(Box::new(SchemaObject::new(
                        UtoipaSchema::Object(builder.build()),
                    ))))
                }
            }
        };
    }

    int_impl!(i32, KnownFormat::Int32, None::<f64>);
    int_impl!(i64, KnownFormat::Int64, None::<f64>);
    int_impl!(isize, KnownFormat::Int64, None::<f64>);
    int_impl!(u32, KnownFormat::Int32, Some(0.0));
    int_impl!(u64, KnownFormat::Int64, Some(0.0));
    int_impl!(usize, KnownFormat::Int64, Some(0.0));

    macro_rules! float_impl {
        ($ty:ty, $format:expr) => {
            impl Generate for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn generate(_registry: &mut Registry) -> Result<Schema> {
                    Ok(Schema::Inline(Box::new(SchemaObject::new(
                        UtoipaSchema::Object(
                            ObjectBuilder::new()
                                .schema_type(Type::Number)
                                .format(Some(SchemaFormat::KnownFormat($format)))
                                .build(),
                        ),
                    ))))
                }
            }
        };
    }

    float_impl!(f32, KnownFormat::Float);
    float_impl!(f64, KnownFormat::Double);

    impl<T: Generate> Generate for Option<T> {
        fn type_name() -> &'static str {
            T::type_name()
        }

        fn generate(registry: &mut Registry) -> Result<Schema> {
            // Optional-ness is encoded by the caller omitting the field from `required`,
            // not by the schema itself (spec.md "pointers/optionals decay to their
            // pointee type").
            T::generate(registry)
        }
    }

    impl<T: Generate> Generate for Vec<T> {
        fn type_name() -> &'static str {
            T::type_name()
        }

        fn generate(registry: &mut Registry) -> Result<Schema> {
            let item = registry.schema_for_inline::<T>()?;
            Ok(Schema::Inline(Box::new({
                let mut object = SchemaObject::new(UtoipaSchema::Array(
                    ArrayBuilder::new().build(),
                ));
                object.items = Some(Box::new(item));
                object
            })))
        }
    }

    impl<T: Generate, const N: usize> Generate for [T; N] {
        fn type_name() -> &'static str {
            T::type_name()
        }

        fn generate(registry: &mut Registry) -> Result<Schema> {
            let item = registry.schema_for_inline::<T>()?;
            let mut object = SchemaObject::new(UtoipaSchema::Array(
                ArrayBuilder::new().min_items(Some(N)).max_items(Some(N)).build(),
            ));
            object.items = Some(Box::new(item));
            Ok(Schema::Inline(Box::new(object)))
        }
    }
}

impl Registry {
    /// Convenience wrapper used by built-in container impls: always inline, never
    /// registers a name (used for element/item schemas which are not independently
    /// ref-able unless `T::IS_REF_TYPE`).
    ///
    /// # Errors
    ///
    /// Propagates any duplicate-name error from nested generation.
    pub fn schema_for_inline<T: Generate + 'static>(&mut self) -> Result<Schema> {
        self.schema_for::<T>(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtins as _;

    #[derive(Debug)]
    struct Widget {
        name: String,
    }

    impl Generate for Widget {
        const IS_REF_TYPE: bool = true;

        fn type_name() -> &'static str {
            "Widget"
        }

        fn generate(registry: &mut Registry) -> Result<Schema> {
            let mut object = SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build()));
            object
                .properties
                .push(("name".to_string(), registry.schema_for::<String>(true)?));
            object.required.push("name".to_string());
            Ok(Schema::Inline(Box::new(object)))
        }
    }

    #[test]
    fn schema_idempotence() {
        let mut registry = Registry::new();
        let first = registry.schema_for::<Widget>(true).unwrap();
        let len_after_first = registry.len();
        let second = registry.schema_for::<Widget>(true).unwrap();
        assert_eq!(registry.len(), len_after_first);
        assert_eq!(first.ref_name(), second.ref_name());
    }

    #[test]
    fn ref_stability_for_struct_types() {
        let mut registry = Registry::new();
        let schema = registry.schema_for::<Widget>(true).unwrap();
        assert_eq!(schema.ref_name(), Some("Widget"));
        assert!(registry.schema_from_ref("Widget").is_some());
    }

    #[test]
    fn duplicate_name_from_distinct_types_is_an_error() {
        #[derive(Debug)]
        struct OtherWidget;
        impl Generate for OtherWidget {
            const IS_REF_TYPE: bool = true;
            fn type_name() -> &'static str {
                "Widget"
            }
            fn generate(_registry: &mut Registry) -> Result<Schema> {
                Ok(Schema::Inline(Box::new(SchemaObject::new(
                    UtoipaSchema::Object(ObjectBuilder::new().build()),
                ))))
            }
        }

        let mut registry = Registry::new();
        registry.schema_for::<Widget>(true).unwrap();
        assert!(registry.schema_for::<OtherWidget>(true).is_err());
    }
}
