//! Common test utilities for building catalogs, contexts and workflow documents.
use kumitate::prelude::*;
use serde_json::{Map, Value, json};

/// Gmail (provider `google`), Slack (provider `slack`) and a cron scheduler.
///
/// `new_email` only supports webhook delivery; `post_message` requires `channel`
/// and `message`.
#[allow(dead_code)]
pub fn create_catalog() -> Catalog {
    serde_json::from_value(json!({
        "providers": {
            "google": {
                "toolkits": {
                    "gmail": {
                        "icon": "gmail.svg",
                        "triggers": [{
                            "id": "gmail_new_email",
                            "slug": "new_email",
                            "name": "New email",
                            "supported_delivery": ["webhook"],
                            "paramSpec": {
                                "label": { "type": "string", "default": "INBOX" },
                                "max_results": { "type": "integer" },
                                "include_spam": { "type": "boolean" }
                            }
                        }],
                        "actions": [{
                            "id": "gmail_send_email",
                            "slug": "send_email",
                            "paramSpec": {
                                "to": { "type": "string", "required": true },
                                "subject": { "type": "string", "required": true, "default": "(no subject)" }
                            }
                        }]
                    }
                }
            },
            "slack": {
                "toolkits": {
                    "slack": {
                        "icon": "slack.svg",
                        "actions": [{
                            "id": "slack_post_message",
                            "slug": "post_message",
                            "name": "Post message",
                            "icon": "post.svg",
                            "paramSpec": {
                                "channel": { "type": "string", "required": true },
                                "message": { "type": "string", "required": true },
                                "tags": { "type": "array" },
                                "priority": { "type": "number" },
                                "unfurl_links": { "type": "boolean" }
                            },
                            "policy": {
                                "timeout_ms": 15000,
                                "rate_limit": { "requests_per_minute": 20 }
                            }
                        }]
                    }
                }
            },
            "scheduler": {
                "toolkits": {
                    "cron": {
                        "triggers": [{
                            "id": "cron_every",
                            "slug": "every",
                            "supported_delivery": ["schedule"],
                            "paramSpec": {
                                "expression": { "type": "string", "default": "0 9 * * *" }
                            }
                        }]
                    }
                }
            }
        }
    }))
    .expect("catalog fixture is valid")
}

/// One connection per provider.
#[allow(dead_code)]
pub fn create_connections() -> Connections {
    serde_json::from_value(json!({
        "conn_gmail": { "provider": "google" },
        "conn_slack": { "provider": "slack" },
        "conn_cron": { "provider": "scheduler" }
    }))
    .expect("connections fixture is valid")
}

#[allow(dead_code)]
pub fn create_answers() -> Map<String, Value> {
    let mut answers = Map::new();
    answers.insert("channel".to_string(), json!("#alerts"));
    answers
}

/// Catalog, user `user-42`, all connections and the `channel` answer.
#[allow(dead_code)]
pub fn create_context() -> CompileContext {
    CompileContext::builder(create_catalog())
        .user(UserInfo {
            id: Some("user-42".to_string()),
            tenant_id: Some("acme".to_string()),
        })
        .connections(create_connections())
        .answers(create_answers())
        .build()
}

/// Gmail `new_email` over webhook feeding a Slack `post_message`.
#[allow(dead_code)]
pub fn create_template() -> Value {
    json!({
        "workflow_id": "wf-mail-to-slack",
        "version": 1,
        "triggers": [{
            "local_id": "on_email",
            "toolkit_slug": "gmail",
            "trigger_ref": "new_email",
            "delivery": "webhook",
            "configuration": { "label": "INBOX" }
        }],
        "actions": [{
            "local_id": "notify",
            "toolkit_slug": "slack",
            "action_ref": "post_message",
            "required_inputs": {
                "channel": "{{channel}}",
                "message": "You have new mail"
            },
            "optional_inputs": {}
        }]
    })
}

#[allow(dead_code)]
pub fn trigger_exec() -> Value {
    json!({
        "provider": "google",
        "trigger_slug": "new_email",
        "configuration": { "label": "INBOX" },
        "connection_id": "conn_gmail"
    })
}

#[allow(dead_code)]
pub fn action_exec() -> Value {
    json!({
        "provider": "slack",
        "action_slug": "post_message",
        "connection_id": "conn_slack",
        "required_inputs": { "channel": "#alerts", "message": "hi" },
        "optional_inputs": {},
        "retry": { "max_attempts": 3, "backoff_multiplier": 2.0, "initial_delay_ms": 1000 },
        "timeout_ms": 30000,
        "rate_limit": { "requests_per_minute": 60 }
    })
}

/// An executable document with trigger `on_email` and one Slack action per
/// entry of `action_ids`, plus the given `flow_control`.
#[allow(dead_code)]
pub fn create_executable(action_ids: &[&str], flow_control: Value) -> Value {
    let actions: Vec<Value> = action_ids
        .iter()
        .map(|id| {
            json!({
                "local_id": id,
                "toolkit_slug": "slack",
                "action_ref": "post_message",
                "required_inputs": { "channel": "#alerts", "message": "hi" },
                "optional_inputs": {},
                "exec": action_exec()
            })
        })
        .collect();

    json!({
        "workflow_id": "wf-graph",
        "version": "v2",
        "triggers": [{
            "local_id": "on_email",
            "toolkit_slug": "gmail",
            "trigger_ref": "new_email",
            "configuration": { "label": "INBOX" },
            "exec": trigger_exec()
        }],
        "actions": actions,
        "flow_control": flow_control
    })
}

/// Serialized form of a node, for asserting on `type` and `data` the way hosts see them.
#[allow(dead_code)]
pub fn node_json(node: &Node) -> Value {
    serde_json::to_value(node).expect("nodes serialize")
}
