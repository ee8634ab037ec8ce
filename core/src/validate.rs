//! Validator: validates a decoded value against a [`Schema`](crate::schema::Schema).

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use serde_json::Value;
use utoipa::openapi::schema::{Schema as UtoipaSchema, Type};
use utoipa::openapi::RefOr;

use crate::pool::PathBuf;
use crate::schema::{AdditionalProperties, CompiledRule, Registry, Schema, SchemaObject};

/// Which direction a value is being validated in. `readOnly` fields are not required in
/// write mode; `writeOnly` fields are not required in read mode (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Validating a request body / parameters on the way into the server.
    WriteToServer,
    /// Validating a response body on the way out of the server.
    ReadFromServer,
}

/// One validation failure, with a stable path and the offending value.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted/JSON-pointer-like location, e.g. `body.sub.num`.
    pub location: String,
    /// The offending value, rendered as JSON text.
    pub value: String,
    /// Human readable explanation.
    pub message: String,
}

/// The accumulated result of one validation pass. Obtained from a
/// [`ValidatePool`](crate::pool::ValidatePool); reset and returned per request.
#[derive(Debug, Default, Clone)]
pub struct ValidateResult {
    errors: Vec<ValidationError>,
}

impl ValidateResult {
    /// No errors recorded yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record one failure.
    pub fn push(&mut self, location: &str, value: &Value, message: impl Into<String>) {
        self.errors.push(ValidationError {
            location: location.to_string(),
            value: value.to_string(),
            message: message.into(),
        });
    }

    /// All recorded failures, in the order validation encountered them.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Whether validation produced no failures.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Clear all recorded failures, readying this result for reuse.
    pub fn reset(&mut self) {
        self.errors.clear();
    }
}

/// Validates decoded values against [`Schema`]s.
///
/// Never short-circuits on the first error at a given level: every rule violation for a
/// value is collected (spec.md's "Validation completeness" testable property).
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    /// Validate `value` against `schema`, appending any failures found to `result`.
    ///
    /// `path` must be positioned at the location `value` logically occupies (e.g. having
    /// already pushed `"body"`); this function pushes/pops only the segments it
    /// introduces while descending.
    pub fn validate(
        &self,
        value: &Value,
        schema: &Schema,
        registry: &Registry,
        mode: Mode,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        let resolved = match schema {
            Schema::Ref(name) => match registry.schema_from_ref(name) {
                Some(object) => object,
                None => {
                    // Unresolved refs are a schema (registration-time) error, not a
                    // validation error, per spec.md §4.3 — nothing to report here.
                    return;
                }
            },
            Schema::Inline(object) => object,
        };

        self.validate_object(value, resolved, registry, mode, path, result);
    }

    #[allow(clippy::too_many_lines)]
    fn validate_object(
        &self,
        value: &Value,
        schema: &SchemaObject,
        registry: &Registry,
        mode: Mode,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        let RefOr::T(raw) = &schema.raw else {
            return;
        };

        self.validate_composition(value, schema, registry, mode, path, result);

        for rule in &schema.rules {
            if let CompiledRule::Enum(allowed) = rule {
                if !allowed.iter().any(|candidate| candidate == value) {
                    result.push(path.as_str(), value, "value is not one of the allowed values");
                }
            }
        }

        match raw {
            UtoipaSchema::Object(object) => {
                if !schema.properties.is_empty() || object.schema_type == Type::Object.into() {
                    self.validate_object_kind(value, schema, registry, mode, path, result);
                } else if let Some(items) = &schema.items {
                    self.validate_array_kind(value, schema, items, registry, mode, path, result);
                } else {
                    self.validate_scalar(value, schema, path, result);
                }
            }
            UtoipaSchema::Array(_) => {
                if let Some(items) = &schema.items {
                    self.validate_array_kind(value, schema, items, registry, mode, path, result);
                }
            }
            _ => self.validate_scalar(value, schema, path, result),
        }
    }

    /// `oneOf`/`anyOf`/`allOf`/`not` (spec.md §4.2), orthogonal to the value's concrete
    /// type so it runs ahead of the scalar/object/array dispatch above.
    fn validate_composition(
        &self,
        value: &Value,
        schema: &SchemaObject,
        registry: &Registry,
        mode: Mode,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        if !schema.one_of.is_empty() {
            let matches = schema
                .one_of
                .iter()
                .filter(|candidate| self.matches(value, candidate, registry, mode))
                .count();
            if matches != 1 {
                result.push(path.as_str(), value, "value must match exactly one of the allowed schemas");
            }
        }

        if !schema.any_of.is_empty()
            && !schema.any_of.iter().any(|candidate| self.matches(value, candidate, registry, mode))
        {
            result.push(path.as_str(), value, "value must match at least one of the allowed schemas");
        }

        for candidate in &schema.all_of {
            self.validate(value, candidate, registry, mode, path, result);
        }

        if let Some(excluded) = &schema.not {
            if self.matches(value, excluded, registry, mode) {
                result.push(path.as_str(), value, "value must not match the excluded schema");
            }
        }
    }

    /// Whether `value` validates cleanly against `schema`, discarding the details.
    fn matches(&self, value: &Value, schema: &Schema, registry: &Registry, mode: Mode) -> bool {
        let mut scratch_path = PathBuf::new();
        let mut scratch_result = ValidateResult::new();
        self.validate(value, schema, registry, mode, &mut scratch_path, &mut scratch_result);
        scratch_result.is_valid()
    }

    fn validate_object_kind(
        &self,
        value: &Value,
        schema: &SchemaObject,
        registry: &Registry,
        mode: Mode,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        let Value::Object(map) = value else {
            result.push(path.as_str(), value, "expected an object");
            return;
        };

        for name in &schema.required {
            let exempt = match mode {
                Mode::WriteToServer => schema.read_only.iter().any(|f| f == name),
                Mode::ReadFromServer => schema.write_only.iter().any(|f| f == name),
            };
            if exempt {
                continue;
            }
            if !map.contains_key(name) {
                path.push_segment(name);
                result.push(path.as_str(), value, format!("`{name}` is required"));
                path.pop();
            }
        }

        for (name, field_schema) in &schema.properties {
            if let Some(field_value) = map.get(name) {
                path.push_segment(name);
                self.validate(field_value, field_schema, registry, mode, path, result);
                path.pop();
            }
        }

        let declared: Vec<&str> = schema.properties.iter().map(|(n, _)| n.as_str()).collect();
        match &schema.additional_properties {
            Some(AdditionalProperties::Bool(false)) => {
                for key in map.keys() {
                    if !declared.contains(&key.as_str()) {
                        path.push_segment(key);
                        result.push(path.as_str(), value, "unexpected property");
                        path.pop();
                    }
                }
            }
            Some(AdditionalProperties::Schema(extra_schema)) => {
                for (key, field_value) in map {
                    if !declared.contains(&key.as_str()) {
                        path.push_segment(key);
                        self.validate(field_value, extra_schema, registry, mode, path, result);
                        path.pop();
                    }
                }
            }
            Some(AdditionalProperties::Bool(true)) | None => {}
        }

        for rule in &schema.rules {
            if let CompiledRule::PropertyCount { min, max } = rule {
                let count = map.len();
                if min.is_some_and(|min| count < min) || max.is_some_and(|max| count > max) {
                    result.push(path.as_str(), value, "object has the wrong number of properties");
                }
            }
        }
    }

    fn validate_array_kind(
        &self,
        value: &Value,
        schema: &SchemaObject,
        items: &Schema,
        registry: &Registry,
        mode: Mode,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        let Value::Array(elements) = value else {
            result.push(path.as_str(), value, "expected an array");
            return;
        };

        for rule in &schema.rules {
            match rule {
                CompiledRule::ItemCount { min, max } => {
                    let count = elements.len();
                    if min.is_some_and(|min| count < min) {
                        result.push(path.as_str(), value, "too few items");
                    }
                    if max.is_some_and(|max| count > max) {
                        result.push(path.as_str(), value, "too many items");
                    }
                }
                CompiledRule::UniqueItems => {
                    for (i, a) in elements.iter().enumerate() {
                        if elements[..i].iter().any(|b| b == a) {
                            result.push(path.as_str(), value, "items must be unique");
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        for (index, element) in elements.iter().enumerate() {
            path.push_index(index);
            self.validate(element, items, registry, mode, path, result);
            path.pop();
        }
    }

    fn validate_scalar(
        &self,
        value: &Value,
        schema: &SchemaObject,
        path: &mut PathBuf,
        result: &mut ValidateResult,
    ) {
        match value {
            Value::String(s) => {
                let len = s.chars().count();
                for rule in &schema.rules {
                    match rule {
                        CompiledRule::Length { min, max } => {
                            if min.is_some_and(|min| len < min) {
                                result.push(path.as_str(), value, "string is too short");
                            }
                            if max.is_some_and(|max| len > max) {
                                result.push(path.as_str(), value, "string is too long");
                            }
                        }
                        CompiledRule::Pattern(regex) => {
                            if !regex.is_match(s) {
                                result.push(path.as_str(), value, "string does not match the required pattern");
                            }
                        }
                        CompiledRule::Format(format) => {
                            if !format.is_valid(s) {
                                result.push(
                                    path.as_str(),
                                    value,
                                    format!("string does not match the `{}` format", format.as_str()),
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Number(n) => {
                let as_f64 = n.as_f64().unwrap_or(f64::NAN);
                if is_integer_schema(schema) && as_f64.fract() != 0.0 {
                    result.push(path.as_str(), value, "integer value has a non-zero fractional part");
                }
                for rule in &schema.rules {
                    match rule {
                        CompiledRule::Minimum { value: min, exclusive } => {
                            let ok = if *exclusive { as_f64 > *min } else { as_f64 >= *min };
                            if !ok {
                                result.push(path.as_str(), value, "value is below the minimum");
                            }
                        }
                        CompiledRule::Maximum { value: max, exclusive } => {
                            let ok = if *exclusive { as_f64 < *max } else { as_f64 <= *max };
                            if !ok {
                                result.push(path.as_str(), value, "value is above the maximum");
                            }
                        }
                        CompiledRule::MultipleOf(step) => {
                            if *step != 0.0 && (as_f64 / step).fract().abs() > f64::EPSILON {
                                result.push(path.as_str(), value, "value is not a multiple of the required step");
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Bool(_) | Value::Null => {}
            Value::Object(_) | Value::Array(_) => {
                result.push(path.as_str(), value, "expected a scalar value");
            }
        }
    }
}

fn is_integer_schema(schema: &SchemaObject) -> bool {
    matches!(
        &schema.raw,
        RefOr::T(UtoipaSchema::Object(object)) if object.schema_type == Type::Integer.into()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema as CoreSchema, SchemaObject};
    use serde_json::json;
    use utoipa::openapi::schema::ObjectBuilder;

    fn name_schema(min_length: usize) -> CoreSchema {
        let mut object = SchemaObject::new(UtoipaSchema::Object(
            ObjectBuilder::new().schema_type(Type::String).build(),
        ));
        object.rules.push(CompiledRule::Length {
            min: Some(min_length),
            max: None,
        });
        CoreSchema::Inline(alloc::boxed::Box::new(object))
    }

    fn body_schema() -> CoreSchema {
        let mut object = SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build()));
        object.properties.push(("name".into(), name_schema(1)));
        object.required.push("name".into());

        let mut sub = SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build()));
        let mut num = SchemaObject::new(UtoipaSchema::Object(
            ObjectBuilder::new().schema_type(Type::Number).build(),
        ));
        num.rules.push(CompiledRule::Minimum {
            value: 1.0,
            exclusive: false,
        });
        sub.properties
            .push(("num".into(), CoreSchema::Inline(alloc::boxed::Box::new(num))));
        object.properties.push((
            "sub".into(),
            CoreSchema::Inline(alloc::boxed::Box::new(sub)),
        ));

        CoreSchema::Inline(alloc::boxed::Box::new(object))
    }

    #[test]
    fn nested_body_validation_collects_every_violation() {
        let registry = Registry::new();
        let validator = Validator;
        let mut path = PathBuf::new();
        path.push_segment("body");
        let mut result = ValidateResult::new();

        let value = json!({"name": "", "sub": {"num": 0}});
        validator.validate(&value, &body_schema(), &registry, Mode::WriteToServer, &mut path, &mut result);

        let locations: Vec<&str> = result.errors().iter().map(|e| e.location.as_str()).collect();
        assert!(locations.contains(&"body.name"));
        assert!(locations.contains(&"body.sub.num"));
    }

    #[test]
    fn read_only_field_not_required_in_write_mode() {
        let mut object = SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build()));
        object.properties.push(("id".into(), name_schema(0)));
        object.required.push("id".into());
        object.read_only.push("id".into());
        let schema = CoreSchema::Inline(alloc::boxed::Box::new(object));

        let registry = Registry::new();
        let validator = Validator;
        let mut path = PathBuf::new();
        let mut result = ValidateResult::new();
        validator.validate(&json!({}), &schema, &registry, Mode::WriteToServer, &mut path, &mut result);
        assert!(result.is_valid());

        let mut result = ValidateResult::new();
        validator.validate(&json!({}), &schema, &registry, Mode::ReadFromServer, &mut path, &mut result);
        assert!(!result.is_valid());
    }

    #[test]
    fn valid_input_produces_no_errors() {
        let registry = Registry::new();
        let validator = Validator;
        let mut path = PathBuf::new();
        path.push_segment("body");
        let mut result = ValidateResult::new();

        let value = json!({"name": "ok", "sub": {"num": 5}});
        validator.validate(&value, &body_schema(), &registry, Mode::WriteToServer, &mut path, &mut result);

        assert!(result.is_valid());
    }
}
