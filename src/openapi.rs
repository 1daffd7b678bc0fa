//! OpenAPI 3 document generated from the resolved model.

use crate::case::to_camel_case;
use crate::config::{ColumnInfo, KeyCase, Operation, PkType, ResolvedEntity, ResolvedModel, TIMESTAMP_COLUMNS};
use std::collections::BTreeMap;
use utoipa::openapi::path::{
    HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{Array, KnownFormat, ObjectBuilder, SchemaFormat, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    Schema,
};

const JSON: &str = "application/json";

pub fn openapi_document(model: &ResolvedModel, environment: &str) -> OpenApi {
    let mut components = ComponentsBuilder::new();
    let mut items: BTreeMap<String, PathItemBuilder> = BTreeMap::new();

    for e in &model.entities {
        let schema_name = schema_name(e);
        components = components
            .schema(schema_name.clone(), row_schema(e))
            .schema(format!("{}Create", schema_name), write_schema(e, Write::Create))
            .schema(format!("{}Patch", schema_name), write_schema(e, Write::Patch))
            .schema(format!("{}BulkPatch", schema_name), write_schema(e, Write::BulkPatch));
        let collection = format!("/api/{}", e.path_segment);
        let member = format!("/api/{}/{{id}}", e.path_segment);
        let bulk = format!("/api/{}/bulk", e.path_segment);

        for op in Operation::ALL.into_iter().filter(|op| e.allows(*op)) {
            let (path, method) = match op {
                Operation::List => (&collection, HttpMethod::Get),
                Operation::Create => (&collection, HttpMethod::Post),
                Operation::Read => (&member, HttpMethod::Get),
                Operation::Update => (&member, HttpMethod::Patch),
                Operation::Delete => (&member, HttpMethod::Delete),
                Operation::BulkCreate => (&bulk, HttpMethod::Post),
                Operation::BulkUpdate => (&bulk, HttpMethod::Patch),
            };
            let item = items.remove(path).unwrap_or_default();
            items.insert(path.clone(), item.operation(method, operation(e, op, &schema_name)));
        }
    }

    let paths = items
        .into_iter()
        .fold(PathsBuilder::new(), |paths, (path, item)| paths.path(path, item.build()));

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(format!("Resources composed for environment '{}'", environment)))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn schema_name(e: &ResolvedEntity) -> String {
    let mut chars = e.resource.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect::<String>().replace(['-', '.'], "_"),
        None => String::new(),
    }
}

fn key(e: &ResolvedEntity, column: &str) -> String {
    match e.key_case {
        KeyCase::Snake => column.to_string(),
        KeyCase::Camel => to_camel_case(column),
    }
}

fn column_schema(c: &ColumnInfo) -> RefOr<Schema> {
    let t = c.data_type.as_str();
    let b = ObjectBuilder::new();
    let b = if matches!(c.pk_type, Some(PkType::Uuid)) || t.contains("uuid") {
        b.schema_type(Type::String).format(Some(SchemaFormat::KnownFormat(KnownFormat::Uuid)))
    } else if t.contains("bigint") || t.contains("bigserial") || t == "int8" {
        b.schema_type(Type::Integer).format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64)))
    } else if c.is_integer() {
        b.schema_type(Type::Integer).format(Some(SchemaFormat::KnownFormat(KnownFormat::Int32)))
    } else if c.is_bool() {
        b.schema_type(Type::Boolean)
    } else if t.starts_with("timestamp") {
        b.schema_type(Type::String).format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
    } else if t == "date" {
        b.schema_type(Type::String).format(Some(SchemaFormat::KnownFormat(KnownFormat::Date)))
    } else if t.starts_with("float") || t == "real" || t.starts_with("double") {
        b.schema_type(Type::Number).format(Some(SchemaFormat::KnownFormat(KnownFormat::Double)))
    } else if t.starts_with("json") {
        b.schema_type(Type::Object)
    } else {
        // text, varchar, numeric (returned as text) and custom enum types
        b.schema_type(Type::String)
    };
    RefOr::T(Schema::Object(b.build()))
}

fn row_schema(e: &ResolvedEntity) -> RefOr<Schema> {
    let mut b = ObjectBuilder::new().schema_type(Type::Object).description(e.description.clone());
    for c in e.columns.iter().filter(|c| !e.sensitive_columns.contains(&c.name)) {
        let k = key(e, &c.name);
        b = b.property(k.clone(), column_schema(c));
        if !c.nullable {
            b = b.required(k);
        }
    }
    RefOr::T(Schema::Object(b.build()))
}

#[derive(Clone, Copy)]
enum Write {
    Create,
    Patch,
    BulkPatch,
}

/// Request body schema. Timestamps are server-managed; on create only columns that are NOT NULL
/// without a default are required, on patch nothing is (bulk patch items need the key).
fn write_schema(e: &ResolvedEntity, mode: Write) -> RefOr<Schema> {
    let mut b = ObjectBuilder::new().schema_type(Type::Object);
    for c in e.columns.iter().filter(|c| !TIMESTAMP_COLUMNS.contains(&c.name.as_str())) {
        let k = key(e, &c.name);
        b = b.property(k.clone(), column_schema(c));
        let required = match mode {
            Write::Create => !c.nullable && !c.has_default,
            Write::Patch => false,
            Write::BulkPatch => c.name == e.primary_key(),
        };
        if required {
            b = b.required(k);
        }
    }
    RefOr::T(Schema::Object(b.build()))
}

fn envelope(data: RefOr<Schema>) -> RefOr<Schema> {
    let meta = RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::Object).build()));
    let obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("data", data)
        .property("meta", meta)
        .required("data")
        .build();
    RefOr::T(Schema::Object(obj))
}

fn operation(e: &ResolvedEntity, op: Operation, schema_name: &str) -> utoipa::openapi::path::Operation {
    let one: RefOr<Schema> = RefOr::Ref(Ref::from_schema_name(schema_name));
    let many: RefOr<Schema> = RefOr::T(Schema::Array(Array::new(Ref::from_schema_name(schema_name))));

    let mut b = OperationBuilder::new()
        .operation_id(Some(format!("{}_{}", e.resource, op)))
        .summary(Some(format!("{} {}", op, e.resource)))
        .tag(e.module.clone());

    if matches!(op, Operation::Read | Operation::Update | Operation::Delete) {
        let id_column = e.column(e.primary_key());
        let mut p = ParameterBuilder::new()
            .name("id")
            .parameter_in(ParameterIn::Path)
            .required(Required::True);
        if let Some(c) = id_column {
            p = p.schema(Some(column_schema(c)));
        }
        b = b.parameter(p.build());
    }
    if op == Operation::List {
        for name in ["limit", "offset"] {
            b = b.parameter(
                ParameterBuilder::new()
                    .name(name)
                    .parameter_in(ParameterIn::Query)
                    .required(Required::False)
                    .schema(Some(RefOr::T(Schema::Object(
                        ObjectBuilder::new().schema_type(Type::Integer).build(),
                    ))))
                    .build(),
            );
        }
    }

    let input = |suffix: &str| Ref::from_schema_name(format!("{}{}", schema_name, suffix));
    let body: Option<RefOr<Schema>> = match op {
        Operation::Create => Some(RefOr::Ref(input("Create"))),
        Operation::Update => Some(RefOr::Ref(input("Patch"))),
        Operation::BulkCreate => Some(RefOr::T(Schema::Array(Array::new(input("Create"))))),
        Operation::BulkUpdate => Some(RefOr::T(Schema::Array(Array::new(input("BulkPatch"))))),
        _ => None,
    };
    if let Some(schema) = body {
        b = b.request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
                .required(Some(Required::True))
                .build(),
        ));
    }

    let (status, data) = match op {
        Operation::List => ("200", Some(many)),
        Operation::Create => ("201", Some(one)),
        Operation::BulkCreate => ("201", Some(many)),
        Operation::BulkUpdate => ("200", Some(many)),
        Operation::Read | Operation::Update => ("200", Some(one)),
        Operation::Delete => ("204", None),
    };
    let mut response = ResponseBuilder::new().description(format!("{} succeeded", op));
    if let Some(data) = data {
        response = response.content(JSON, ContentBuilder::new().schema(Some(envelope(data))).build());
    }
    b = b.response(status, response.build());
    if op.is_write() {
        b = b.response("422", ResponseBuilder::new().description("validation_error").build());
    }
    if matches!(op, Operation::Read | Operation::Update | Operation::Delete) {
        b = b.response("404", ResponseBuilder::new().description("not_found").build());
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve;
    use crate::registry::{CompositionRoot, Registered};
    use serde_json::json;

    fn model() -> ResolvedModel {
        let mut root = CompositionRoot::default();
        root.entities.insert(
            "example".into(),
            Registered {
                module: "Example".into(),
                sources: vec![],
                definition: serde_json::from_value(json!({
                    "table": "example",
                    "primary_key": "id",
                    "columns": [
                        {"name": "id", "type": "uuid", "nullable": false, "default": {"expression": "gen_random_uuid()"}},
                        {"name": "display_name", "type": "text", "nullable": false},
                        {"name": "secret", "type": "text"}
                    ]
                }))
                .unwrap(),
            },
        );
        root.resources.insert(
            "examples".into(),
            Registered {
                module: "Example".into(),
                sources: vec![],
                definition: serde_json::from_value(json!({
                    "entity": "example",
                    "operations": ["list", "read", "create"],
                    "sensitive_columns": ["secret"],
                    "key_case": "camel"
                }))
                .unwrap(),
            },
        );
        resolve(&root, "public").unwrap()
    }

    #[test]
    fn documents_only_enabled_operations() {
        let doc = serde_json::to_value(openapi_document(&model(), "dev")).unwrap();
        let paths = &doc["paths"];
        assert!(paths["/api/examples"]["get"].is_object());
        assert!(paths["/api/examples"]["post"].is_object());
        assert!(paths["/api/examples/{id}"]["get"].is_object());
        assert!(paths["/api/examples/{id}"].get("delete").is_none());
        assert!(paths.get("/api/examples/bulk").is_none());
    }

    #[test]
    fn write_schemas_only_require_what_the_database_needs() {
        let doc = serde_json::to_value(openapi_document(&model(), "dev")).unwrap();
        let schemas = &doc["components"]["schemas"];
        assert_eq!(schemas["ExamplesCreate"]["required"], json!(["displayName"]));
        assert!(schemas["ExamplesCreate"]["properties"].get("createdAt").is_none());
        assert!(schemas["ExamplesPatch"]
            .get("required")
            .map_or(true, |r| r.as_array().unwrap().is_empty()));
        assert_eq!(
            doc["paths"]["/api/examples"]["post"]["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            json!("#/components/schemas/ExamplesCreate")
        );
    }

    #[test]
    fn row_schema_hides_sensitive_columns_and_uses_key_case() {
        let doc = serde_json::to_value(openapi_document(&model(), "dev")).unwrap();
        let props = &doc["components"]["schemas"]["Examples"]["properties"];
        assert!(props.get("displayName").is_some());
        assert!(props.get("secret").is_none());
        assert_eq!(props["id"]["format"], json!("uuid"));
    }
}
