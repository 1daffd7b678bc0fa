use api_skeleton::config::Operation;
use api_skeleton::service::{ProcessContext, ServiceCatalog, ServiceContainer};
use api_skeleton::{build_composition_root, ddl_statements, resolve};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;

fn modules() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("modules")
}

#[test]
fn shipped_module_composes_in_every_environment() {
    for env in ["dev", "staging", "prod"] {
        let root = build_composition_root(modules(), env).unwrap();
        assert_eq!(root.modules.len(), 1);
        assert!(root.entity("example").is_some());
        assert!(root.resource("examples").is_some());

        let model = resolve(&root, "public").unwrap();
        let entity = model.entity_by_path("examples").unwrap();
        assert!(entity.allows(Operation::BulkUpdate));
        assert!(entity.sensitive_columns.contains(&"internal_note".to_string()));

        let services = ServiceContainer::build(&root, &ServiceCatalog::with_builtins()).unwrap();
        assert_eq!(services.len(), 3);
    }
}

#[test]
fn production_overrides_only_the_default_status() {
    let dev = build_composition_root(modules(), "dev").unwrap();
    let prod = build_composition_root(modules(), "prod").unwrap();

    let values = |root: &api_skeleton::CompositionRoot| root.service("example.defaults").unwrap().arguments["values"].clone();
    assert_eq!(values(&dev), json!({"priority": 3, "status": "draft"}));
    assert_eq!(values(&prod), json!({"priority": 3, "status": "active"}));
    assert_eq!(prod.services["example.defaults"].sources.len(), 2);
    assert_eq!(dev.service("example.slug"), prod.service("example.slug"));
}

#[tokio::test]
async fn processors_prepare_a_create_body() {
    let root = build_composition_root(modules(), "prod").unwrap();
    let services = ServiceContainer::build(&root, &ServiceCatalog::with_builtins()).unwrap();
    let model = resolve(&root, "public").unwrap();
    let entity = model.entity_by_path("examples").unwrap();

    let ctx = ProcessContext {
        resource: &entity.resource,
        operation: Operation::Create,
    };
    let mut body: HashMap<String, Value> = HashMap::from([
        ("name".to_string(), json!("  Launch Plan ")),
        ("description".to_string(), json!("   ")),
    ]);
    services.run(&entity.processors, &ctx, &mut body).await.unwrap();

    assert_eq!(body["name"], json!("Launch Plan"));
    assert_eq!(body["description"], Value::Null);
    assert_eq!(body["status"], json!("active"));
    assert_eq!(body["priority"], json!(3));
    assert_eq!(body["slug"], json!("launch-plan"));
}

#[test]
fn schema_ddl_covers_the_example_table() {
    let root = build_composition_root(modules(), "dev").unwrap();
    let ddl = ddl_statements(&root, "public").join("\n");
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"public\".\"example\""));
    assert!(ddl.contains("example_status_idx"));
    assert!(ddl.contains("\"created_at\" TIMESTAMPTZ"));
}
