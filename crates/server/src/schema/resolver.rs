//! Encrypted attribute path resolution from OpenAPI schemas.
//!
//! Given a parsed [`openapiv3::OpenAPI`] document, this module produces the
//! dot-notation paths of every property annotated with `x-encrypted: true`.

use std::collections::BTreeSet;

use openapiv3::{OpenAPI, ReferenceOr, Schema, SchemaKind, Type};

/// Extension key marking a property for encryption.
pub const ENCRYPTED_EXTENSION: &str = "x-encrypted";

/// Walk an [`OpenAPI`] document and collect the paths of all properties marked
/// `x-encrypted: true`, in sorted order.
///
/// The walk starts at every schema in `components/schemas` and recurses into
/// nested object properties. Arrays are not descended into: an encrypted
/// attribute is always addressed by a plain object path.
pub fn resolve_encrypted_paths(api: &OpenAPI) -> Vec<String> {
    let mut paths = BTreeSet::new();

    let Some(components) = &api.components else {
        return Vec::new();
    };

    for schema_ref in components.schemas.values() {
        if let ReferenceOr::Item(schema) = schema_ref {
            walk_schema(schema, "", &mut paths);
        }
    }

    paths.into_iter().collect()
}

fn walk_schema(schema: &Schema, prefix: &str, out: &mut BTreeSet<String>) {
    let SchemaKind::Type(Type::Object(obj)) = &schema.schema_kind else {
        return;
    };

    for (prop_name, prop_ref) in &obj.properties {
        let ReferenceOr::Item(prop_schema) = prop_ref else {
            continue;
        };
        let path = if prefix.is_empty() {
            prop_name.clone()
        } else {
            format!("{prefix}.{prop_name}")
        };

        let encrypted = prop_schema
            .schema_data
            .extensions
            .get(ENCRYPTED_EXTENSION)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if encrypted {
            out.insert(path.clone());
        }

        walk_schema(prop_schema, &path, out);
    }
}
