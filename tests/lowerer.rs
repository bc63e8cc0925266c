//! Tests for graph lowering: nodes, flow-control expansion, routes and validation.
mod common;
use common::*;
use kumitate::document::{JoinMode, Position, TriggerKind};
use kumitate::prelude::*;
use serde_json::{Map, Value, json};

fn lower(executable: &Value) -> CompileOutcome<DagDocument> {
    GraphLowerer::default().compile(executable)
}

fn edge_between<'a>(dag: &'a DagDocument, source: &str, target: &str) -> Vec<&'a Edge> {
    dag.edges
        .iter()
        .filter(|e| e.source == source && e.target == target)
        .collect()
}

fn assert_referential_integrity(dag: &DagDocument) {
    for edge in &dag.edges {
        assert!(dag.node(&edge.source).is_some(), "dangling source {}", edge.source);
        assert!(dag.node(&edge.target).is_some(), "dangling target {}", edge.target);
    }
}

#[test]
fn test_linear_routes() {
    let executable = create_executable(
        &["notify", "archive"],
        json!({
            "routes": [
                { "from_ref": "on_email", "to_ref": "notify" },
                { "from_ref": "notify", "to_ref": "archive" }
            ]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.is_success(), "{}", outcome.diagnostics);
    assert!(outcome.diagnostics.warnings.is_empty(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");
    let ids: Vec<&str> = dag.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "a1", "a2"]);
    assert_eq!(dag.edges.len(), 2);
    assert!(dag.edges.iter().all(|e| e.when == "success"));
    assert_eq!(dag.edges[0].id, "e1");
    assert_eq!((dag.edges[0].source.as_str(), dag.edges[0].target.as_str()), ("t1", "a1"));
    assert_eq!((dag.edges[1].source.as_str(), dag.edges[1].target.as_str()), ("a1", "a2"));
    assert_eq!(dag.workflow_id, "wf-graph");
    assert!(dag.user_id.is_none());
}

#[test]
fn test_trigger_and_action_payloads() {
    let mut executable = create_executable(&["notify"], json!(null));
    executable["actions"][0]["output_vars"] = json!(["ts"]);

    let dag = lower(&executable).document.expect("dag");

    let trigger = node_json(&dag.nodes[0]);
    assert_eq!(trigger["type"], json!("trigger"));
    assert_eq!(trigger["data"]["kind"], json!("event_based"));
    assert_eq!(trigger["data"]["provider"], json!("google"));
    assert_eq!(trigger["data"]["toolkit"], json!("gmail"));
    assert_eq!(trigger["data"]["trigger"], json!("new_email"));
    assert_eq!(trigger["data"]["configuration"]["label"], json!("INBOX"));

    let NodeData::Action(action) = &dag.nodes[1].data else {
        panic!("expected an action node");
    };
    assert_eq!(action.provider, "slack");
    assert_eq!(action.tool, "slack");
    assert_eq!(action.action, "post_message");
    assert_eq!(action.connection_id, "conn_slack");
    assert_eq!(action.input_template.required["channel"], json!("#alerts"));
    assert_eq!(action.output_vars, vec!["ts"]);
    assert_eq!(action.timeout_ms, 30000);
}

#[test]
fn test_scheduled_trigger_kind() {
    let mut executable = create_executable(&[], json!(null));
    executable["triggers"][0]["type"] = json!("scheduled");
    executable["triggers"][0]["schedule"] = json!({ "cron": "0 9 * * *" });

    let dag = lower(&executable).document.expect("dag");

    let NodeData::Trigger(trigger) = &dag.nodes[0].data else {
        panic!("expected a trigger node");
    };
    assert_eq!(trigger.kind, TriggerKind::ScheduleBased);
    assert_eq!(trigger.schedule.as_ref().unwrap()["cron"], json!("0 9 * * *"));
}

#[test]
fn test_parallel_fan_out_and_join() {
    let executable = create_executable(
        &["left", "right", "after"],
        json!({
            "parallel_execution": [{
                "local_id": "fan",
                "incoming_ref": "on_email",
                "branches": ["left", "right"],
                "outgoing_ref": "after"
            }],
            "routes": [
                { "from_ref": "left", "to_ref": "fan.join" },
                { "from_ref": "right", "to_ref": "fan.join" }
            ]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.is_success(), "{}", outcome.diagnostics);
    assert!(outcome.diagnostics.warnings.is_empty(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");

    assert_eq!(dag.nodes_of_type(NodeType::Parallel).len(), 1);
    assert_eq!(dag.nodes_of_type(NodeType::Join).len(), 1);

    let NodeData::Parallel(parallel) = &dag.node("par1").unwrap().data else {
        panic!("expected a parallel node");
    };
    assert_eq!(parallel.branches, vec!["a1", "a2"]);
    assert_eq!(parallel.join, "join1");
    let NodeData::Join(join) = &dag.node("join1").unwrap().data else {
        panic!("expected a join node");
    };
    assert_eq!(join.mode, JoinMode::All);
    assert_eq!(join.parallel, "par1");

    let branch_edges: Vec<&Edge> = dag
        .edges
        .iter()
        .filter(|e| e.label.as_deref() == Some("parallel_branch"))
        .collect();
    assert_eq!(branch_edges.len(), 2);
    assert!(branch_edges.iter().all(|e| e.source == "par1" && e.when == "success"));

    assert_eq!(edge_between(&dag, "t1", "par1").len(), 1);
    assert_eq!(edge_between(&dag, "join1", "a3").len(), 1);
    assert_eq!(edge_between(&dag, "a1", "join1").len(), 1);
    assert_referential_integrity(&dag);
}

#[test]
fn test_custom_join_ref() {
    let executable = create_executable(
        &["left", "right"],
        json!({
            "parallel_execution": [{
                "local_id": "fan",
                "incoming_ref": "on_email",
                "branches": ["left", "right"],
                "join_ref": "merge"
            }],
            "routes": [
                { "from_ref": "left", "to_ref": "merge" },
                { "from_ref": "right", "to_ref": "merge" }
            ]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.warnings.is_empty(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");
    assert_eq!(edge_between(&dag, "a2", "join1").len(), 1);
}

#[test]
fn test_unjoined_parallel_branch_is_a_warning() {
    let executable = create_executable(
        &["left", "right"],
        json!({
            "parallel_execution": [{
                "local_id": "fan",
                "incoming_ref": "on_email",
                "branches": ["left", "right"]
            }],
            "routes": [{ "from_ref": "left", "to_ref": "fan.join" }]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.document.is_some());
    let unjoined = outcome
        .diagnostics
        .warnings_with(DiagnosticCode::ParallelBranchUnjoined);
    assert_eq!(unjoined.len(), 1);
    assert!(unjoined[0].message.contains("a2"));
}

#[test]
fn test_conditional_gateway() {
    let executable = create_executable(
        &["urgent", "normal", "ignore"],
        json!({
            "conditions": [{
                "local_id": "check",
                "incoming_ref": "on_email",
                "branches": [
                    { "name": "urgent", "expr": { "op": "eq", "left": "priority", "right": "high" }, "to_ref": "urgent" },
                    { "expr": { "op": "exists", "path": "labels" }, "to_ref": "normal" }
                ],
                "else_ref": "ignore"
            }]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.is_success(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");

    let gateway = dag.node("g1").expect("gateway node");
    assert_eq!(gateway.label, "If");
    let NodeData::GatewayIf(data) = &gateway.data else {
        panic!("expected a gateway node");
    };
    assert_eq!(data.branches[0].name, "urgent");
    assert_eq!(data.branches[0].to.as_deref(), Some("a1"));
    assert_eq!(data.branches[1].name, "branch_2");
    assert_eq!(data.branches[1].to.as_deref(), Some("a2"));
    assert_eq!(data.else_to.as_deref(), Some("a3"));

    assert_eq!(edge_between(&dag, "t1", "g1").len(), 1);
    let urgent = edge_between(&dag, "g1", "a1")[0];
    assert_eq!(urgent.label.as_deref(), Some("urgent"));
    assert_eq!(
        urgent.condition,
        Some(json!({ "op": "eq", "left": "priority", "right": "high" }))
    );
    assert_eq!(edge_between(&dag, "g1", "a2")[0].label.as_deref(), Some("branch_2"));
    let otherwise = edge_between(&dag, "g1", "a3")[0];
    assert_eq!(otherwise.label.as_deref(), Some("else"));
    assert!(otherwise.condition.is_none());
    assert_referential_integrity(&dag);
}

#[test]
fn test_unresolved_branch_target_is_a_warning() {
    let executable = create_executable(
        &["notify"],
        json!({
            "conditions": [{
                "incoming_ref": "on_email",
                "branches": [
                    { "expr": true, "to_ref": "notify" },
                    { "expr": false, "to_ref": "nowhere" }
                ]
            }]
        }),
    );

    let outcome = lower(&executable);

    let dag = outcome.document.expect("dag");
    let unresolved = outcome.diagnostics.warnings_with(DiagnosticCode::UnresolvedRef);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].path, "flow_control.conditions[0].branches[1].to_ref");
    let NodeData::GatewayIf(data) = &dag.node("g1").unwrap().data else {
        panic!("expected a gateway node");
    };
    assert!(data.branches[1].to.is_none());
    assert_eq!(dag.outgoing("g1").len(), 1);
}

#[test]
fn test_loops_with_defaults_and_forward_references() {
    let executable = create_executable(
        &["poll", "handle"],
        json!({
            "conditions": [{
                "incoming_ref": "on_email",
                "branches": [{ "expr": { "var": "retry" }, "to_ref": "retry_loop" }],
                "else_ref": "each_item"
            }],
            "loops": [
                {
                    "kind": "while",
                    "local_id": "retry_loop",
                    "condition": { "var": "pending" },
                    "body_ref": "poll"
                },
                {
                    "kind": "foreach",
                    "local_id": "each_item",
                    "source_array_expr": "{{items}}",
                    "body_ref": "handle"
                }
            ]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.is_success(), "{}", outcome.diagnostics);
    assert!(
        outcome
            .diagnostics
            .warnings_with(DiagnosticCode::UnresolvedRef)
            .is_empty()
    );
    let dag = outcome.document.expect("dag");

    let NodeData::LoopWhile(repeat) = &dag.node("loop1").unwrap().data else {
        panic!("expected a while loop");
    };
    assert_eq!(repeat.max_iterations, 1000);
    assert_eq!(repeat.body_start.as_deref(), Some("a1"));
    assert_eq!(repeat.condition, json!({ "var": "pending" }));

    let NodeData::LoopForeach(each) = &dag.node("loop2").unwrap().data else {
        panic!("expected a foreach loop");
    };
    assert_eq!(each.item_var, "item");
    assert_eq!(each.index_var, "index");
    assert_eq!(each.max_concurrency, 5);
    assert_eq!(each.body_start.as_deref(), Some("a2"));
    assert_eq!(each.source_array_expr, json!("{{items}}"));

    assert_eq!(edge_between(&dag, "g1", "loop1").len(), 1);
    assert_eq!(edge_between(&dag, "g1", "loop2")[0].label.as_deref(), Some("else"));
    assert_eq!(edge_between(&dag, "loop1", "a1")[0].label.as_deref(), Some("loop_body"));
    assert_eq!(edge_between(&dag, "loop2", "a2")[0].label.as_deref(), Some("loop_body"));
}

#[test]
fn test_route_options_are_carried() {
    let executable = create_executable(
        &["notify", "fallback"],
        json!({
            "routes": [
                { "from_ref": "on_email", "to_ref": "notify" },
                {
                    "from_ref": "notify",
                    "to_ref": "fallback",
                    "when": "failure",
                    "condition": { "var": "error" },
                    "label": "on error"
                }
            ]
        }),
    );

    let dag = lower(&executable).document.expect("dag");

    let failure = edge_between(&dag, "a1", "a2")[0];
    assert_eq!(failure.when, "failure");
    assert_eq!(failure.condition, Some(json!({ "var": "error" })));
    assert_eq!(failure.label.as_deref(), Some("on error"));
}

#[test]
fn test_unresolved_routes_are_fatal_and_all_reported() {
    let executable = create_executable(
        &["notify"],
        json!({
            "routes": [
                { "from_ref": "ghost", "to_ref": "notify" },
                { "from_ref": "notify", "to_ref": "phantom" },
                { "from_ref": "on_email", "to_ref": "notify" }
            ]
        }),
    );

    let outcome = lower(&executable);

    assert!(outcome.document.is_none());
    let sources = outcome.diagnostics.errors_with(DiagnosticCode::MissingSourceRef);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].path, "flow_control.routes[0].from_ref");
    let targets = outcome.diagnostics.errors_with(DiagnosticCode::MissingTargetRef);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].path, "flow_control.routes[1].to_ref");
}

#[test]
fn test_depends_on_edges_are_deduplicated() {
    let mut executable = create_executable(
        &["notify", "archive"],
        json!({
            "routes": [
                { "from_ref": "on_email", "to_ref": "notify" },
                { "from_ref": "notify", "to_ref": "archive" }
            ]
        }),
    );
    executable["actions"][1]["depends_on"] = json!(["notify", "notify", "ghost"]);

    let outcome = lower(&executable);

    let dag = outcome.document.expect("dag");
    assert_eq!(edge_between(&dag, "a1", "a2").len(), 1);
    assert_eq!(dag.edges.len(), 2);
    let unresolved = outcome.diagnostics.warnings_with(DiagnosticCode::UnresolvedRef);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].path, "actions[1].depends_on[2]");
}

#[test]
fn test_depends_on_alone_wires_success_edges() {
    let mut executable = create_executable(&["notify", "archive"], json!(null));
    executable["actions"][0]["depends_on"] = json!(["on_email"]);
    executable["actions"][1]["depends_on"] = json!(["notify"]);

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.warnings.is_empty(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");
    assert_eq!(edge_between(&dag, "t1", "a1")[0].when, "success");
    assert_eq!(edge_between(&dag, "a1", "a2")[0].when, "success");
}

#[test]
fn test_orphan_nodes_are_warned() {
    let executable = create_executable(&["notify", "archive"], json!({}));

    let outcome = lower(&executable);

    assert!(outcome.document.is_some());
    let orphans = outcome.diagnostics.warnings_with(DiagnosticCode::OrphanNode);
    let paths: Vec<&str> = orphans.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(paths, vec!["nodes[0]", "nodes[1]", "nodes[2]"]);
}

#[test]
fn test_lone_trigger_is_an_orphan() {
    let outcome = lower(&create_executable(&[], json!(null)));

    assert!(outcome.document.is_some());
    let orphans = outcome.diagnostics.warnings_with(DiagnosticCode::OrphanNode);
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].path, "nodes[0]");
}

#[test]
fn test_missing_exec_block() {
    let mut executable = create_executable(&["notify"], json!(null));
    executable["actions"][0]
        .as_object_mut()
        .unwrap()
        .remove("exec");

    let outcome = lower(&executable);

    assert!(outcome.document.is_none());
    let missing = outcome.diagnostics.errors_with(DiagnosticCode::MissingExecBlock);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].path, "actions[0]");
}

#[test]
fn test_missing_workflow_id() {
    let mut executable = create_executable(&["notify"], json!(null));
    executable.as_object_mut().unwrap().remove("workflow_id");

    let outcome = lower(&executable);

    assert!(outcome.document.is_none());
    assert_eq!(outcome.diagnostics.errors[0].code, DiagnosticCode::MissingRequiredField);
    assert_eq!(outcome.diagnostics.errors[0].path, "workflow_id");
}

#[test]
fn test_malformed_flow_control_is_an_internal_error() {
    let executable = create_executable(&["notify"], json!({ "loops": [{ "kind": "until" }] }));

    let outcome = lower(&executable);

    assert!(outcome.document.is_none());
    assert_eq!(outcome.diagnostics.errors.len(), 1);
    assert_eq!(outcome.diagnostics.errors[0].code, DiagnosticCode::InternalError);
}

#[test]
fn test_layouts() {
    let executable = create_executable(
        &["notify"],
        json!({ "routes": [{ "from_ref": "on_email", "to_ref": "notify" }] }),
    );

    let dagre = lower(&executable).document.unwrap();
    assert_eq!(dagre.ui.layout, LayoutKind::Dagre);
    assert_eq!(dagre.nodes[1].position, Some(Position { x: 0.0, y: 120.0 }));

    let elk = GraphLowerer::builder()
        .with_layout(LayoutKind::Elk)
        .build()
        .compile(&executable)
        .document
        .unwrap();
    assert_eq!(elk.ui.layout, LayoutKind::Elk);
    assert_eq!(elk.nodes[1].position, Some(Position { x: 220.0, y: 0.0 }));

    let manual = GraphLowerer::builder()
        .with_layout(LayoutKind::Manual)
        .build()
        .compile(&executable)
        .document
        .unwrap();
    assert_eq!(manual.ui.layout, LayoutKind::Manual);
    assert!(manual.nodes.iter().all(|n| n.position.is_none()));
}

#[test]
fn test_ui_defaults_only_fill_unset_keys() {
    let mut ui_defaults = Map::new();
    ui_defaults.insert("viewport.zoom".to_string(), json!(2.0));
    ui_defaults.insert("theme.accent".to_string(), json!("#ff0000"));

    let dag = GraphLowerer::builder()
        .with_ui_defaults(ui_defaults)
        .build()
        .compile(&create_executable(&[], json!(null)))
        .document
        .unwrap();

    assert_eq!(dag.ui.viewport.zoom, 1.0);
    assert_eq!(dag.ui.extra["theme"]["accent"], json!("#ff0000"));
}

#[test]
fn test_globals() {
    let plain = GraphLowerer::builder()
        .with_max_parallelism(4)
        .build()
        .compile(&create_executable(&[], json!(null)))
        .document
        .unwrap();
    assert_eq!(plain.globals.max_parallelism, 4);
    assert!(plain.globals.timeout_ms.is_none());

    let mut executable = create_executable(&[], json!(null));
    executable["policies"] = json!({ "max_parallelism": 2, "timeout_ms": 5000 });
    let dag = lower(&executable).document.unwrap();
    assert_eq!(dag.globals.max_parallelism, 2);
    assert_eq!(dag.globals.timeout_ms, Some(5000));
}

#[test]
fn test_labels_and_icons() {
    let mut executable = create_executable(&["notify", "other"], json!(null));
    executable["actions"][1]["name"] = json!("Tell the team");

    let bare = lower(&executable).document.unwrap();
    assert_eq!(bare.nodes[0].label, "gmail: new_email");
    assert_eq!(bare.nodes[1].label, "slack: post_message");
    assert!(bare.nodes[0].icon.is_none());

    let dag = GraphLowerer::builder()
        .with_catalog(&create_catalog())
        .build()
        .compile(&executable)
        .document
        .unwrap();
    assert_eq!(dag.nodes[0].label, "New email");
    assert_eq!(dag.nodes[0].icon.as_deref(), Some("gmail.svg"));
    assert_eq!(dag.nodes[1].label, "Post message");
    assert_eq!(dag.nodes[1].icon.as_deref(), Some("post.svg"));
    assert_eq!(dag.nodes[2].label, "Tell the team");
}

#[test]
fn test_user_id_is_carried() {
    let mut executable = create_executable(&[], json!(null));
    executable["user_id"] = json!("user-42");

    let dag = lower(&executable).document.unwrap();

    assert_eq!(dag.user_id.as_deref(), Some("user-42"));
}

#[test]
fn test_counters_reset_between_compiles() {
    let executable = create_executable(
        &["notify"],
        json!({ "routes": [{ "from_ref": "on_email", "to_ref": "notify" }] }),
    );
    let mut lowerer = GraphLowerer::default();

    let first = lowerer.compile(&executable);
    let second = lowerer.compile(&executable);

    assert_eq!(first.document, second.document);
    assert_eq!(first.diagnostics, second.diagnostics);
    let dag = second.document.unwrap();
    assert_eq!(dag.nodes[0].id, "t1");
    assert_eq!(dag.edges[0].id, "e1");
}

#[test]
fn test_compile_document_matches_raw_compile() {
    let raw = create_executable(
        &["notify"],
        json!({ "routes": [{ "from_ref": "on_email", "to_ref": "notify" }] }),
    );
    let typed: ExecutableDocument = serde_json::from_value(raw.clone()).unwrap();
    let mut lowerer = GraphLowerer::default();

    let from_typed = lowerer.compile_document(&typed);
    let from_raw = lowerer.compile(&raw);

    assert_eq!(from_typed.document, from_raw.document);
}

#[test]
fn test_dag_serializes_type_and_data_side_by_side() {
    let executable = create_executable(
        &["notify"],
        json!({ "routes": [{ "from_ref": "on_email", "to_ref": "notify" }] }),
    );

    let dag = lower(&executable).document.unwrap();
    let value = serde_json::to_value(&dag).unwrap();

    assert_eq!(value["nodes"][1]["id"], json!("a1"));
    assert_eq!(value["nodes"][1]["type"], json!("action"));
    assert_eq!(value["nodes"][1]["data"]["action"], json!("post_message"));
    assert_eq!(value["edges"][0]["when"], json!("success"));
    assert_eq!(value["ui"]["layout"], json!("dagre"));
    assert_eq!(value["globals"]["max_parallelism"], json!(10));
    assert!(value.get("user_id").is_none());
}

#[test]
fn test_numeric_text_in_executable_is_accepted() {
    let mut executable = create_executable(
        &["notify"],
        json!({
            "loops": [{
                "kind": "while",
                "incoming_ref": "on_email",
                "condition": true,
                "body_ref": "notify",
                "max_iterations": "50"
            }]
        }),
    );
    executable["version"] = json!(2.0);
    executable["policies"] = json!({
        "timeout_ms": "5000",
        "max_parallelism": " 3 ",
        "retry": { "max_attempts": "4", "backoff_multiplier": "1.5" }
    });

    let outcome = lower(&executable);

    assert!(outcome.diagnostics.is_success(), "{}", outcome.diagnostics);
    let dag = outcome.document.expect("dag");
    assert_eq!(dag.globals.timeout_ms, Some(5000));
    assert_eq!(dag.globals.max_parallelism, 3);
    let retry = dag.globals.retry.as_ref().unwrap();
    assert_eq!(retry.max_attempts, 4);
    assert_eq!(retry.backoff_multiplier, 1.5);
    assert_eq!(retry.initial_delay_ms, 1000);
    let NodeData::LoopWhile(repeat) = &dag.node("loop1").unwrap().data else {
        panic!("expected a while loop");
    };
    assert_eq!(repeat.max_iterations, 50);
    assert_eq!(serde_json::to_value(&dag).unwrap()["version"], json!(2.0));
}
