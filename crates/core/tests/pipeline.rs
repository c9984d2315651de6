#![allow(clippy::unwrap_used, clippy::expect_used)]

use oaskit_core::ir::{TransformLinks, TypeIr};
use oaskit_core::{
    CompileError, CompileOptions, DeclarationEmitter, Emit, JsonEmitter, compile_json, compile_yaml,
};
use oaskit_runtime::{Direction, TransformKind, TransformProgram, Value, convert_payload};
use pretty_assertions::assert_eq;
use serde_json::json;

const EVENTS: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Events", "version": "0.3.0" },
  "paths": {
    "/events": {
      "get": {
        "operationId": "listEvents",
        "responses": { "200": { "description": "OK", "content": { "application/json": {
          "schema": { "$ref": "#/components/schemas/Page" } } } } }
      }
    },
    "/uploads": {
      "post": {
        "operationId": "upload",
        "requestBody": { "content": { "application/json": { "schema": {
          "type": "object", "properties": { "data": { "type": "string", "format": "byte" } } } } } },
        "responses": { "204": { "description": "Stored" } }
      }
    }
  },
  "components": {
    "schemas": {
      "Page": {
        "type": "object",
        "properties": {
          "items": { "type": "array", "items": { "$ref": "#/components/schemas/Event" } },
          "byId": { "type": "object", "additionalProperties": { "$ref": "#/components/schemas/Event" } },
          "total": { "type": "integer" }
        }
      },
      "Event": {
        "type": "object",
        "required": ["id"],
        "properties": {
          "id": { "type": "string" },
          "createdAt": { "type": "string", "format": "date-time" }
        }
      },
      "Node": {
        "type": "object",
        "properties": {
          "seen": { "type": "string", "format": "date" },
          "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
        }
      },
      "Label": { "type": "string" }
    }
  }
}"##;

fn element(value: &Value, index: usize) -> Option<&Value> {
    match value {
        Value::Array(items) => items.get(index),
        _ => None,
    }
}

#[test]
fn test_types_keep_definition_order_and_shape() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let names: Vec<&str> = list.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Page", "Event", "Node", "Label"]);
    assert_eq!(
        list.type_declaration("Event").unwrap().ty.emit(),
        "{ id: string, createdAt?: string<date-time> }"
    );
}

#[test]
fn test_only_convertible_schemas_have_programs() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let mut date_names: Vec<&str> = list.transforms.names(TransformKind::Date).collect();
    date_names.sort_unstable();
    assert_eq!(date_names, vec!["Event", "Node", "Page"]);
    assert!(!list.transforms.contains(TransformKind::Date, "Label"));
    assert_eq!(list.transforms.names(TransformKind::Binary).count(), 0);
}

#[test]
fn test_response_dates_round_trip() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let response = list.operation("listEvents").unwrap().success_response().unwrap();

    let wire = json!({
        "items": [{ "id": "a", "createdAt": "2020-01-01T00:00:00Z", "note": "kept" }],
        "byId": { "a": { "id": "a", "createdAt": "2021-06-01T12:00:00Z" } },
        "total": 1
    });
    let mut payload = Value::from(wire.clone());
    convert_payload(&list.transforms, &response.transforms, &mut payload, Direction::Inbound);

    let first = element(payload.get("items").unwrap(), 0).unwrap();
    assert_eq!(first.get("createdAt").unwrap().as_date().unwrap().timestamp(), 1_577_836_800);
    assert_eq!(first.get("note"), Some(&Value::from("kept")));
    let by_id = payload.get("byId").unwrap().get("a").unwrap();
    assert!(by_id.get("createdAt").unwrap().as_date().is_some());
    assert_eq!(payload.get("total"), Some(&Value::from(json!(1))));

    convert_payload(&list.transforms, &response.transforms, &mut payload, Direction::Outbound);
    assert_eq!(serde_json::Value::from(payload), wire);
}

#[test]
fn test_payloads_of_other_shapes_are_untouched() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let response = list.operation("listEvents").unwrap().success_response().unwrap();

    for wire in [json!({}), json!({ "items": "not a list" }), json!([1, 2]), json!(null)] {
        let mut payload = Value::from(wire.clone());
        convert_payload(&list.transforms, &response.transforms, &mut payload, Direction::Inbound);
        assert_eq!(payload, Value::from(wire));
    }
}

#[test]
fn test_recursive_schema_converts_every_level() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let wire = json!({
        "seen": "2020-01-02",
        "children": [{ "seen": "2020-01-03", "children": [{ "seen": "2020-01-04" }] }]
    });
    let mut payload = Value::from(wire.clone());
    let mut root = TransformLinks::new();
    root.insert(TransformKind::Date, vec![TransformProgram::reference("Node")]);
    convert_payload(&list.transforms, &root, &mut payload, Direction::Inbound);

    let child = element(payload.get("children").unwrap(), 0).unwrap();
    let grandchild = element(child.get("children").unwrap(), 0).unwrap();
    assert!(payload.get("seen").unwrap().as_day().is_some());
    assert!(child.get("seen").unwrap().as_day().is_some());
    assert!(grandchild.get("seen").unwrap().as_day().is_some());

    // date-only fields go back out without a time part
    convert_payload(&list.transforms, &root, &mut payload, Direction::Outbound);
    assert_eq!(serde_json::Value::from(payload), wire);
}

#[test]
fn test_inline_body_binary_program() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let body = list.operation("upload").unwrap().body.as_ref().unwrap();
    assert!(matches!(body.ty, TypeIr::Object(_)));

    let mut payload = Value::from(json!({ "data": "aGk=" }));
    convert_payload(&list.transforms, &body.transforms, &mut payload, Direction::Inbound);
    assert_eq!(payload.get("data").unwrap().as_binary(), Some(&b"hi"[..]));

    convert_payload(&list.transforms, &body.transforms, &mut payload, Direction::Outbound);
    assert_eq!(payload.get("data"), Some(&Value::from("aGk=")));
}

#[test]
fn test_dangling_reference_aborts() {
    let text = r##"{
  "openapi": "3.1.0",
  "info": { "title": "Broken", "version": "1" },
  "components": { "schemas": {
    "Holder": { "type": "object", "properties": { "x": { "$ref": "#/components/schemas/Missing" } } }
  } }
}"##;
    assert_eq!(
        compile_json(text, &CompileOptions::default()).unwrap_err(),
        CompileError::UnresolvedReference {
            pointer: "#/components/schemas/Missing".into()
        }
    );
}

#[test]
fn test_swagger_documents_are_rejected() {
    let err = compile_json(
        r#"{ "swagger": "2.0", "info": {}, "paths": {} }"#,
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnsupportedSpecVersion {
            found: Some("2.0".into())
        }
    );
}

#[test]
fn test_yaml_and_json_agree() {
    let yaml = r"
openapi: 3.0.0
info:
  title: Events
  version: 0.3.0
components:
  schemas:
    Event:
      type: object
      required: [id]
      properties:
        id: { type: string }
        createdAt: { type: string, format: date-time }
";
    let list = compile_yaml(yaml, &CompileOptions::default()).unwrap();
    let from_json = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    assert_eq!(
        list.type_declaration("Event").unwrap().ty,
        from_json.type_declaration("Event").unwrap().ty
    );
    assert_eq!(
        list.transforms.names(TransformKind::Date).collect::<Vec<_>>(),
        vec!["Event"]
    );
}

#[test]
fn test_json_emitter_output() {
    let list = compile_json(EVENTS, &CompileOptions::default()).unwrap();
    let out = JsonEmitter.emit(&list).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["title"], json!("Events"));
    assert_eq!(parsed["operations"][0]["name"], json!("listEvents"));
    assert_eq!(
        parsed["transforms"]["kinds"]["date"]["Event"],
        json!([[{ "op": "access", "arg": "createdAt" }, { "op": "this" }]])
    );
    assert!(out.ends_with('\n'));
}
