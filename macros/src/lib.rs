//! Derive macros for `breeze-core`'s [`Generate`], [`OperationInput`] and
//! [`OperationOutput`] traits.
//!
//! These perform, at compile time, the structural walk the specification describes a
//! reference implementation building through runtime reflection: one pass over a
//! struct's fields, emitting the same per-field plan by hand.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type,
};

/// Derives `breeze_core::schema::Generate` for a struct.
///
/// Every field must implement `Generate`. A field is optional (omitted from `required`)
/// when its type is `Option<T>`. Recognized field attributes (`#[schema(...)]` unless
/// noted):
///
/// - `rename = "..."` / `#[serde(rename = "...")]` — override the property name.
/// - `read_only` / `write_only` — mirrors the JSON Schema keywords.
/// - `minimum`/`maximum`/`exclusive_minimum`/`exclusive_maximum`/`multiple_of` — numeric bounds.
/// - `min_length`/`max_length`/`pattern` — string constraints; `pattern` is anchored.
/// - `min_items`/`max_items`/`unique_items` — array constraints.
/// - `enum_values = "[...]"` — a JSON array literal of allowed values.
/// - `format = "..."` — one of the recognized `StringFormat` names.
/// - `encoding = "base64"` — shorthand for `format = "byte"` when no `format` is given.
/// - `required = true|false` — overrides the `Option<T>`-derived requiredness.
/// - `default = "..."` — parsed as JSON, with a fallback to a bare string; validated
///   against the field's schema at registration time, panicking if invalid. Applied to
///   the field at request time unless the field is required (spec.md §4.2 Open Question).
/// - `///` doc comments become the property's `description`.
///
/// Struct-level `#[schema(...)]` attributes: `additional_properties = true|false`,
/// `min_properties`/`max_properties`, and `///` doc comments for the schema's own
/// `description`.
#[proc_macro_derive(Schema, attributes(schema, serde))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_schema(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Parsed `#[schema(...)]` annotation table for one field (spec.md §4.2), beyond
/// rename/read_only/write_only which `field_rename`/`has_flag` already cover.
#[derive(Default)]
struct FieldConstraints {
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    multiple_of: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    unique_items: bool,
    enum_values: Option<String>,
    format: Option<String>,
    encoding: Option<String>,
    required: Option<bool>,
    default: Option<String>,
}

fn parse_f64_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<f64> {
    let lit: syn::Lit = meta.value()?.parse()?;
    match lit {
        syn::Lit::Int(i) => i.base10_parse::<f64>(),
        syn::Lit::Float(f) => f.base10_parse::<f64>(),
        other => Err(syn::Error::new_spanned(other, "expected a numeric literal")),
    }
}

fn parse_usize_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<usize> {
    let lit: syn::LitInt = meta.value()?.parse()?;
    lit.base10_parse::<usize>()
}

fn parse_field_constraints(attrs: &[syn::Attribute]) -> syn::Result<FieldConstraints> {
    let mut out = FieldConstraints::default();
    for attr in attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("minimum") {
                out.minimum = Some(parse_f64_value(&meta)?);
            } else if meta.path.is_ident("maximum") {
                out.maximum = Some(parse_f64_value(&meta)?);
            } else if meta.path.is_ident("exclusive_minimum") {
                out.exclusive_minimum = Some(parse_f64_value(&meta)?);
            } else if meta.path.is_ident("exclusive_maximum") {
                out.exclusive_maximum = Some(parse_f64_value(&meta)?);
            } else if meta.path.is_ident("multiple_of") {
                out.multiple_of = Some(parse_f64_value(&meta)?);
            } else if meta.path.is_ident("min_length") {
                out.min_length = Some(parse_usize_value(&meta)?);
            } else if meta.path.is_ident("max_length") {
                out.max_length = Some(parse_usize_value(&meta)?);
            } else if meta.path.is_ident("pattern") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.pattern = Some(value.value());
            } else if meta.path.is_ident("min_items") {
                out.min_items = Some(parse_usize_value(&meta)?);
            } else if meta.path.is_ident("max_items") {
                out.max_items = Some(parse_usize_value(&meta)?);
            } else if meta.path.is_ident("unique_items") {
                out.unique_items = true;
            } else if meta.path.is_ident("enum_values") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.enum_values = Some(value.value());
            } else if meta.path.is_ident("format") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.format = Some(value.value());
            } else if meta.path.is_ident("encoding") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.encoding = Some(value.value());
            } else if meta.path.is_ident("required") {
                let value: syn::LitBool = meta.value()?.parse()?;
                out.required = Some(value.value());
            } else if meta.path.is_ident("default") {
                let value: syn::LitStr = meta.value()?.parse()?;
                out.default = Some(value.value());
            } else if meta.input.peek(syn::Token![=]) {
                // Skip over `rename`/other keys `field_rename`/`has_flag` already parse.
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Struct-level `#[schema(...)]` keys: `additionalProperties`/`minProperties`/`maxProperties`
/// apply to the whole object, not a single field.
#[derive(Default)]
struct ContainerConstraints {
    additional_properties: Option<bool>,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
}

fn parse_container_constraints(attrs: &[syn::Attribute]) -> syn::Result<ContainerConstraints> {
    let mut out = ContainerConstraints::default();
    for attr in attrs {
        if !attr.path().is_ident("schema") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("additional_properties") {
                let value: syn::LitBool = meta.value()?.parse()?;
                out.additional_properties = Some(value.value());
            } else if meta.path.is_ident("min_properties") {
                out.min_properties = Some(parse_usize_value(&meta)?);
            } else if meta.path.is_ident("max_properties") {
                out.max_properties = Some(parse_usize_value(&meta)?);
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Joins every `///` doc-comment line attached to `attrs`, if any.
fn doc_string(attrs: &[syn::Attribute]) -> Option<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(name_value) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(s),
                ..
            }) = &name_value.value
            {
                lines.push(s.value().trim().to_string());
            }
        }
    }
    (!lines.is_empty()).then(|| lines.join("\n").trim().to_string())
}

fn opt_usize_tokens(value: Option<usize>) -> TokenStream2 {
    match value {
        Some(v) => quote! { Some(#v) },
        None => quote! { None },
    }
}

fn expand_schema(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "`Schema` can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "`Schema` requires named fields",
        ));
    };

    let mut property_stmts = Vec::new();
    let mut apply_default_stmts = Vec::new();
    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_ty = &field.ty;
        let rename = field_rename(&field.attrs)?;
        let wire_name = rename.unwrap_or_else(|| field_ident.to_string());
        let read_only = has_flag(&field.attrs, "read_only")?;
        let write_only = has_flag(&field.attrs, "write_only")?;
        let optional = unwrap_option(field_ty).is_some();
        let constraints = parse_field_constraints(&field.attrs)?;
        let doc = doc_string(&field.attrs);
        let field_required = constraints.required.unwrap_or(!optional);

        let mut rule_stmts = Vec::new();
        if constraints.minimum.is_some() || constraints.exclusive_minimum.is_some() {
            let (value, exclusive) = match (constraints.minimum, constraints.exclusive_minimum) {
                (_, Some(v)) => (v, true),
                (Some(v), None) => (v, false),
                (None, None) => unreachable!(),
            };
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::Minimum { value: #value, exclusive: #exclusive });
            });
        }
        if constraints.maximum.is_some() || constraints.exclusive_maximum.is_some() {
            let (value, exclusive) = match (constraints.maximum, constraints.exclusive_maximum) {
                (_, Some(v)) => (v, true),
                (Some(v), None) => (v, false),
                (None, None) => unreachable!(),
            };
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::Maximum { value: #value, exclusive: #exclusive });
            });
        }
        if let Some(step) = constraints.multiple_of {
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::MultipleOf(#step));
            });
        }
        if constraints.min_length.is_some() || constraints.max_length.is_some() {
            let min = opt_usize_tokens(constraints.min_length);
            let max = opt_usize_tokens(constraints.max_length);
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::Length { min: #min, max: #max });
            });
        }
        if let Some(pattern) = &constraints.pattern {
            rule_stmts.push(quote! {
                inner.rules.push(
                    breeze_core::schema::CompiledRule::pattern(#pattern)
                        .unwrap_or_else(|e| panic!("invalid `pattern` tag value {:?} on `{}`: {}", #pattern, #wire_name, e))
                );
            });
        }
        if constraints.min_items.is_some() || constraints.max_items.is_some() {
            let min = opt_usize_tokens(constraints.min_items);
            let max = opt_usize_tokens(constraints.max_items);
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::ItemCount { min: #min, max: #max });
            });
        }
        if constraints.unique_items {
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::UniqueItems);
            });
        }
        if let Some(raw_values) = &constraints.enum_values {
            rule_stmts.push(quote! {
                {
                    let values: ::std::vec::Vec<serde_json::Value> = serde_json::from_str(#raw_values)
                        .unwrap_or_else(|e| panic!("invalid `enum_values` tag value {:?} on `{}`: {}", #raw_values, #wire_name, e));
                    inner.rules.push(breeze_core::schema::CompiledRule::Enum(values));
                }
            });
        }
        let format_name = constraints.format.clone().or_else(|| {
            (constraints.encoding.as_deref() == Some("base64")).then(|| "byte".to_string())
        });
        if let Some(name) = &format_name {
            rule_stmts.push(quote! {
                inner.rules.push(breeze_core::schema::CompiledRule::Format(
                    breeze_core::schema::StringFormat::from_name(#name)
                        .unwrap_or_else(|| panic!("unknown `format` tag value {:?} on `{}`", #name, #wire_name))
                ));
            });
        }
        let doc_stmt = doc.as_ref().map(|text| {
            quote! {
                if let utoipa::openapi::RefOr::T(UtoipaSchema::Object(ref mut o)) = inner.raw {
                    o.description = Some(#text.into());
                }
            }
        });

        let default_stmt = constraints.default.as_ref().map(|literal| {
            quote! {
                {
                    let decoded: serde_json::Value = serde_json::from_str(#literal)
                        .unwrap_or_else(|_| serde_json::Value::String(#literal.into()));
                    let mut default_path = breeze_core::pool::PathBuf::new();
                    let mut default_result = breeze_core::validate::ValidateResult::new();
                    breeze_core::validate::Validator.validate(
                        &decoded,
                        &field_schema,
                        registry,
                        breeze_core::validate::Mode::WriteToServer,
                        &mut default_path,
                        &mut default_result,
                    );
                    if !default_result.is_valid() {
                        panic!("invalid `default` tag value {:?} on `{}`", #literal, #wire_name);
                    }
                    if let Schema::Inline(ref mut inner) = field_schema {
                        inner.default = Some(decoded);
                    }
                }
            }
        });

        property_stmts.push(quote! {
            {
                let mut field_schema = registry.schema_for::<#field_ty>(true)?;
                if let Schema::Inline(ref mut inner) = field_schema {
                    #(#rule_stmts)*
                    #doc_stmt
                }
                #default_stmt
                object.properties.push((#wire_name.into(), field_schema));
                if #field_required {
                    object.required.push(#wire_name.into());
                }
                if #read_only {
                    object.read_only.push(#wire_name.into());
                }
                if #write_only {
                    object.write_only.push(#wire_name.into());
                }
            }
        });

        if let Some(literal) = &constraints.default {
            if !field_required {
                let assign = if let Some(inner_ty) = unwrap_option(field_ty) {
                    quote! {
                        if self.#field_ident.is_none() {
                            if let Ok(v) = serde_json::from_value::<#inner_ty>(decoded.clone()) {
                                self.#field_ident = Some(v);
                            }
                        }
                    }
                } else {
                    quote! {
                        if self.#field_ident == <#field_ty as ::core::default::Default>::default() {
                            if let Ok(v) = serde_json::from_value::<#field_ty>(decoded.clone()) {
                                self.#field_ident = v;
                            }
                        }
                    }
                };
                apply_default_stmts.push(quote! {
                    {
                        static DEFAULT: ::std::sync::OnceLock<serde_json::Value> = ::std::sync::OnceLock::new();
                        let decoded = DEFAULT.get_or_init(|| {
                            serde_json::from_str(#literal)
                                .unwrap_or_else(|_| serde_json::Value::String(#literal.into()))
                        });
                        #assign
                    }
                });
            }
        }
    }

    let container = parse_container_constraints(&input.attrs)?;
    let struct_doc = doc_string(&input.attrs);

    let additional_properties_stmt = container.additional_properties.map(|b| {
        quote! {
            object.additional_properties = Some(breeze_core::schema::AdditionalProperties::Bool(#b));
        }
    });
    let property_count_stmt = if container.min_properties.is_some() || container.max_properties.is_some() {
        let min = opt_usize_tokens(container.min_properties);
        let max = opt_usize_tokens(container.max_properties);
        Some(quote! {
            object.rules.push(breeze_core::schema::CompiledRule::PropertyCount { min: #min, max: #max });
        })
    } else {
        None
    };
    let struct_doc_stmt = struct_doc.as_ref().map(|text| {
        quote! {
            if let utoipa::openapi::RefOr::T(UtoipaSchema::Object(ref mut o)) = object.raw {
                o.description = Some(#text.into());
            }
        }
    });

    let name_literal = ident.to_string();

    let apply_defaults_fn = (!apply_default_stmts.is_empty()).then(|| {
        quote! {
            fn apply_defaults(&mut self) {
                #(#apply_default_stmts)*
            }
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics breeze_core::schema::Generate for #ident #ty_generics #where_clause {
            const IS_REF_TYPE: bool = true;

            fn type_name() -> &'static str {
                #name_literal
            }

            fn generate(
                registry: &mut breeze_core::schema::Registry,
            ) -> breeze_core::error::Result<breeze_core::schema::Schema> {
                use breeze_core::schema::{Schema, SchemaObject};
                use utoipa::openapi::schema::{ObjectBuilder, Schema as UtoipaSchema};

                let mut object = SchemaObject::new(UtoipaSchema::Object(ObjectBuilder::new().build()));
                #(#property_stmts)*
                #additional_properties_stmt
                #property_count_stmt
                #struct_doc_stmt
                Ok(Schema::inline(object))
            }

            #apply_defaults_fn
        }
    })
}

/// Derives `breeze_core::operation::OperationInput` for a struct.
///
/// A field named (or attributed) `#[body]` holds the decoded request body; it must
/// implement `Generate + Serialize + DeserializeOwned`. Every other field must be
/// attributed `#[param(location = "path" | "query" | "header" | "cookie", ...)]`.
#[proc_macro_derive(OperationInput, attributes(param, body))]
pub fn derive_operation_input(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_operation_input(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct ParamField<'a> {
    ident: &'a syn::Ident,
    ty: &'a Type,
    location: String,
    name: String,
    default: Option<String>,
    hidden: bool,
}

fn expand_operation_input(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "`OperationInput` can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "`OperationInput` requires named fields",
        ));
    };

    let mut body_field: Option<(&syn::Ident, &Type)> = None;
    let mut params = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        if is_body_field(field_ident, &field.attrs) {
            body_field = Some((field_ident, &field.ty));
            continue;
        }
        if let Some(param) = parse_param_attr(field_ident, &field.ty, &field.attrs)? {
            params.push(param);
            continue;
        }
        return Err(syn::Error::new_spanned(
            field,
            "every `OperationInput` field must be named/attributed `#[body]` or attributed `#[param(location = \"...\")]`",
        ));
    }

    let param_spec_stmts: Vec<TokenStream2> = params
        .iter()
        .map(|p| {
            let name = &p.name;
            // `parse_param_attr` already rejected any location outside this set.
            let location = format_ident!(
                "{}",
                match p.location.as_str() {
                    "path" => "Path",
                    "query" => "Query",
                    "header" => "Header",
                    _ => "Cookie",
                }
            );
            let required = p.location == "path" || p.default.is_none();
            let default = match &p.default {
                Some(value) => quote! { Some(#value) },
                None => quote! { None },
            };
            let hidden = p.hidden;
            let ty = p.ty;
            quote! {
                breeze_core::operation::ParamSpec {
                    name: #name,
                    location: breeze_core::operation::ParamLocation::#location,
                    required: #required,
                    default: #default,
                    hidden: #hidden,
                    schema: |registry| registry.schema_for::<#ty>(true),
                }
            }
        })
        .collect();

    let from_values_fields: Vec<TokenStream2> = params
        .iter()
        .map(|p| {
            let ident = p.ident;
            let name = &p.name;
            let ty = p.ty;
            quote! {
                #ident: match params.get(#name) {
                    Some(value) => serde_json::from_value::<#ty>(value.clone())
                        .map_err(|e| breeze_core::error::Error::new(e, breeze_core::StatusCode::BAD_REQUEST))?,
                    None => serde_json::from_value::<#ty>(serde_json::Value::Null)
                        .map_err(|e| breeze_core::error::Error::new(e, breeze_core::StatusCode::BAD_REQUEST))?,
                }
            }
        })
        .collect();

    let (body_spec_tokens, body_assembly) = match body_field {
        Some((body_ident, body_ty)) => {
            let required = unwrap_option(body_ty).is_none();
            (
                quote! {
                    fn body_spec() -> Option<breeze_core::operation::InputBodySpec> {
                        Some(breeze_core::operation::InputBodySpec {
                            content_type: "application/json",
                            required: #required,
                            schema: |registry| registry.schema_for::<#body_ty>(true),
                        })
                    }
                },
                quote! {
                    #body_ident: match body {
                        Some(value) => serde_json::from_value::<#body_ty>(value)
                            .map_err(|e| breeze_core::error::Error::new(e, breeze_core::StatusCode::BAD_REQUEST))?,
                        None => serde_json::from_value::<#body_ty>(serde_json::Value::Null)
                            .map_err(|e| breeze_core::error::Error::new(e, breeze_core::StatusCode::BAD_REQUEST))?,
                    }
                },
            )
        }
        None => (quote! {}, quote! {}),
    };

    let param_specs_fn = if params.is_empty() {
        quote! {}
    } else {
        quote! {
            fn param_specs() -> &'static [breeze_core::operation::ParamSpec] {
                static SPECS: ::std::sync::OnceLock<::std::vec::Vec<breeze_core::operation::ParamSpec>> =
                    ::std::sync::OnceLock::new();
                SPECS.get_or_init(|| ::std::vec![#(#param_spec_stmts),*])
            }
        }
    };

    // A field's own `default` tag (for body sub-fields) lives on the body type's own
    // `Generate::apply_defaults`; this just cascades into it after assembly.
    let apply_defaults_fn = body_field.map(|(body_ident, body_ty)| {
        quote! {
            fn apply_defaults(&mut self) {
                <#body_ty as breeze_core::schema::Generate>::apply_defaults(&mut self.#body_ident);
            }
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics breeze_core::operation::OperationInput for #ident #ty_generics #where_clause {
            #param_specs_fn
            #body_spec_tokens
            #apply_defaults_fn

            fn from_values(
                params: &::std::collections::BTreeMap<::std::string::String, serde_json::Value>,
                body: Option<serde_json::Value>,
            ) -> breeze_core::error::Result<Self> {
                Ok(Self {
                    #(#from_values_fields,)*
                    #body_assembly
                })
            }
        }
    })
}

fn is_body_field(ident: &syn::Ident, attrs: &[syn::Attribute]) -> bool {
    ident.to_string() == "body" || attrs.iter().any(|a| a.path().is_ident("body"))
}

fn parse_param_attr<'a>(
    ident: &'a syn::Ident,
    ty: &'a Type,
    attrs: &[syn::Attribute],
) -> syn::Result<Option<ParamField<'a>>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("param")) else {
        return Ok(None);
    };

    let mut location = None;
    let mut name = None;
    let mut default = None;
    let mut hidden = false;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("location") {
            let value: syn::LitStr = meta.value()?.parse()?;
            location = Some(value.value());
        } else if meta.path.is_ident("name") {
            let value: syn::LitStr = meta.value()?.parse()?;
            name = Some(value.value());
        } else if meta.path.is_ident("default") {
            let value: syn::LitStr = meta.value()?.parse()?;
            default = Some(value.value());
        } else if meta.path.is_ident("hidden") {
            hidden = true;
        } else if meta.path.is_ident("path")
            || meta.path.is_ident("query")
            || meta.path.is_ident("header")
            || meta.path.is_ident("cookie")
        {
            location = Some(meta.path.get_ident().unwrap().to_string());
            if meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                name = Some(value.value());
            }
        }
        Ok(())
    })?;

    let location = location.ok_or_else(|| {
        syn::Error::new_spanned(attr, "`#[param(...)]` requires a location (path/query/header/cookie)")
    })?;
    if !matches!(location.as_str(), "path" | "query" | "header" | "cookie") {
        return Err(syn::Error::new_spanned(
            attr,
            format!("unknown param location `{location}`, expected path/query/header/cookie"),
        ));
    }

    Ok(Some(ParamField {
        ident,
        ty,
        location,
        name: name.unwrap_or_else(|| ident.to_string()),
        default,
        hidden,
    }))
}

fn field_rename(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    for attr in attrs {
        if attr.path().is_ident("schema") || attr.path().is_ident("serde") {
            let mut rename = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                } else if meta.input.peek(syn::Token![=]) {
                    // Skip over other `key = value` attributes we don't recognize.
                    let _: syn::Expr = meta.value()?.parse()?;
                }
                Ok(())
            })?;
            if rename.is_some() {
                return Ok(rename);
            }
        }
    }
    Ok(None)
}

fn has_flag(attrs: &[syn::Attribute], flag: &str) -> syn::Result<bool> {
    for attr in attrs {
        if attr.path().is_ident("schema") {
            let mut found = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(flag) {
                    found = true;
                } else if meta.input.peek(syn::Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                }
                Ok(())
            })?;
            if found {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Derives `breeze_core::operation::OperationOutput` for a struct.
///
/// Recognized fields: `body` (or `#[body]`) is serialized as the response body;
/// `#[status]` overrides the default status per-response; `#[header(name = "...")]`
/// fields become response headers. Every field must be one of these.
#[proc_macro_derive(OperationOutput, attributes(body, status, header))]
pub fn derive_operation_output(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_operation_output(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_operation_output(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "`OperationOutput` can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "`OperationOutput` requires named fields",
        ));
    };

    let mut body_field: Option<(&syn::Ident, &Type)> = None;
    let mut status_field: Option<&syn::Ident> = None;
    let mut header_fields: Vec<(&syn::Ident, String)> = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        if is_body_field(field_ident, &field.attrs) {
            body_field = Some((field_ident, &field.ty));
        } else if field.attrs.iter().any(|a| a.path().is_ident("status")) {
            status_field = Some(field_ident);
        } else if let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("header")) {
            let mut header_name = field_ident.to_string();
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    header_name = value.value();
                }
                Ok(())
            })?;
            header_fields.push((field_ident, header_name));
        } else {
            return Err(syn::Error::new_spanned(
                field,
                "every `OperationOutput` field must be `body`, `#[status]`, or `#[header(...)]`",
            ));
        }
    }

    let body_schema_fn = if let Some((_, body_ty)) = body_field {
        quote! {
            fn body_schema(
                registry: &mut breeze_core::schema::Registry,
            ) -> breeze_core::error::Result<Option<breeze_core::schema::Schema>> {
                Ok(Some(registry.schema_for::<#body_ty>(true)?))
            }
        }
    } else {
        quote! {}
    };

    let status_expr = match status_field {
        Some(ident) => quote! { Some(self.#ident) },
        None => quote! { None },
    };
    let headers_expr: Vec<TokenStream2> = header_fields
        .iter()
        .map(|(ident, name)| {
            quote! {
                (::std::string::String::from(#name), ::std::string::ToString::to_string(&self.#ident))
            }
        })
        .collect();
    let body_expr = match body_field {
        Some((ident, _)) => quote! {
            Some(serde_json::to_value(self.#ident).unwrap_or(serde_json::Value::Null))
        },
        None => quote! { None },
    };

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics breeze_core::operation::OperationOutput for #ident #ty_generics #where_clause {
            #body_schema_fn

            fn into_parts(
                self,
            ) -> (
                Option<breeze_core::StatusCode>,
                ::std::vec::Vec<(::std::string::String, ::std::string::String)>,
                Option<serde_json::Value>,
            ) {
                (#status_expr, ::std::vec![#(#headers_expr),*], #body_expr)
            }
        }
    })
}

/// Returns `Some(inner)` if `ty` is `Option<inner>`.
fn unwrap_option(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
