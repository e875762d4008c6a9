//! Tool definitions advertised in `tools/list`.

use serde_json::{json, Value};

use crate::mcp::server::{ToolAnnotations, ToolDefinition};

/// How a tool affects Mail.app.
#[derive(Clone, Copy)]
enum Effect {
    /// Reads state; repeating the call returns the same result.
    Read,
    /// Reads state that the user can change between calls (the selection).
    ReadVolatile,
    /// Creates a draft or outgoing message.
    Create,
}

fn tool(name: &str, title: &str, description: &str, effect: Effect, input_schema: Value) -> ToolDefinition {
    let (read_only, idempotent) = match effect {
        Effect::Read => (true, true),
        Effect::ReadVolatile => (true, false),
        Effect::Create => (false, false),
    };

    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
        annotations: Some(ToolAnnotations {
            title: title.to_string(),
            read_only_hint: read_only,
            destructive_hint: false,
            idempotent_hint: idempotent,
            open_world_hint: true,
        }),
    }
}

fn mailbox_path_schema(purpose: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "minItems": 1,
        "description": format!(
            "Path to the mailbox {purpose}, e.g. [\"Inbox\"] or [\"Inbox\", \"GitHub\"] for a nested mailbox. Use the mailboxPath field from get_selected_messages or list_mailboxes."
        )
    })
}

/// Returns the definitions of all Mail tools.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "list_accounts",
            "List Accounts",
            "Lists the email accounts configured in Apple Mail with their names, addresses and enabled state.",
            Effect::Read,
            json!({
                "type": "object",
                "properties": {
                    "enabled": {
                        "type": "boolean",
                        "description": "Only list enabled accounts. Default is false (list all)."
                    }
                }
            }),
        ),
        tool(
            "list_mailboxes",
            "List Mailboxes",
            "Lists all mailboxes (folders) for a specific account in Apple Mail, including nested mailboxes and unread counts.",
            Effect::Read,
            json!({
                "type": "object",
                "properties": {
                    "account": {
                        "type": "string",
                        "description": "Name of the email account"
                    }
                },
                "required": ["account"]
            }),
        ),
        tool(
            "find_unread_mailboxes",
            "Find Mailboxes with Unread Messages",
            "Finds all mailboxes in a given account that have unread messages.",
            Effect::Read,
            json!({
                "type": "object",
                "properties": {
                    "account": {
                        "type": "string",
                        "description": "The name of the email account to search in"
                    }
                },
                "required": ["account"]
            }),
        ),
        tool(
            "get_selected_messages",
            "Get Selected Messages",
            "Gets the currently selected message(s) in the frontmost Mail.app viewer window, with their account, mailbox path and id.",
            Effect::ReadVolatile,
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Maximum number of messages to return. Default is 10."
                    },
                    "start_at": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Index of the first selected message to return. Default is 0."
                    }
                }
            }),
        ),
        tool(
            "get_message_content",
            "Get Message Content",
            "Retrieves the full content (body) of a specific message by its ID from a specific account and mailbox.",
            Effect::Read,
            json!({
                "type": "object",
                "properties": {
                    "account": {
                        "type": "string",
                        "description": "Name of the email account"
                    },
                    "mailbox_path": mailbox_path_schema("containing the message"),
                    "message_id": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "The unique ID of the message to retrieve"
                    }
                },
                "required": ["account", "mailbox_path", "message_id"]
            }),
        ),
        tool(
            "reply_to_message",
            "Reply to Message (Draft)",
            "Creates a reply to a specific message and saves it as a draft in the Drafts mailbox. Mail.app automatically includes the quoted original message. The reply is not sent.",
            Effect::Create,
            json!({
                "type": "object",
                "properties": {
                    "account": {
                        "type": "string",
                        "description": "Name of the email account"
                    },
                    "mailbox_path": mailbox_path_schema("containing the message to reply to"),
                    "message_id": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "The unique ID of the message to reply to"
                    },
                    "reply_content": {
                        "type": "string",
                        "description": "The body of the reply. Mail.app appends the quoted original message."
                    },
                    "opening_window": {
                        "type": "boolean",
                        "description": "Whether to show the window for the reply message. Default is false."
                    },
                    "reply_to_all": {
                        "type": "boolean",
                        "description": "Whether to reply to all recipients. Default is false (reply to sender only)."
                    }
                },
                "required": ["account", "mailbox_path", "message_id", "reply_content"]
            }),
        ),
        tool(
            "create_outgoing_message",
            "Create Outgoing Message",
            "Creates a new outgoing email message and returns its id. The message is saved but not sent. It only exists while Mail.app is running.",
            Effect::Create,
            json!({
                "type": "object",
                "properties": {
                    "subject": {
                        "type": "string",
                        "description": "Subject line of the email"
                    },
                    "content": {
                        "type": "string",
                        "description": "Body text of the email"
                    },
                    "to_recipients": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1,
                        "description": "List of To recipient email addresses"
                    },
                    "cc_recipients": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of CC recipient email addresses (optional)"
                    },
                    "bcc_recipients": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of BCC recipient email addresses (optional)"
                    },
                    "sender": {
                        "type": "string",
                        "description": "Sender email address (optional, uses the default account if omitted)"
                    },
                    "opening_window": {
                        "type": "boolean",
                        "description": "Whether to show the compose window. Default is false."
                    }
                },
                "required": ["subject", "content", "to_recipients"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tool_names_are_unique() {
        let definitions = tool_definitions();
        let names: HashSet<_> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), definitions.len());
        assert_eq!(definitions.len(), 7);
    }

    #[test]
    fn no_tool_is_destructive() {
        for definition in tool_definitions() {
            let annotations = definition.annotations.unwrap();
            assert!(!annotations.destructive_hint, "{}", definition.name);
            assert!(annotations.open_world_hint, "{}", definition.name);
        }
    }

    #[test]
    fn compose_tools_are_not_read_only() {
        for definition in tool_definitions() {
            let read_only = definition.annotations.unwrap().read_only_hint;
            let composes = matches!(
                definition.name.as_str(),
                "reply_to_message" | "create_outgoing_message"
            );
            assert_eq!(read_only, !composes, "{}", definition.name);
        }
    }

    #[test]
    fn definitions_serialise_in_mcp_shape() {
        let value = serde_json::to_value(tool_definitions()).unwrap();
        let first = &value[0];
        assert_eq!(first["name"], "list_accounts");
        assert_eq!(first["inputSchema"]["type"], "object");
        assert_eq!(first["annotations"]["readOnlyHint"], true);
        assert_eq!(first["annotations"]["title"], "List Accounts");
    }

    #[test]
    fn mailbox_inputs_take_a_path_array() {
        for definition in tool_definitions() {
            if !matches!(
                definition.name.as_str(),
                "get_message_content" | "reply_to_message"
            ) {
                continue;
            }
            let properties = &definition.input_schema["properties"];
            assert_eq!(properties["mailbox_path"]["type"], "array", "{}", definition.name);
            assert!(properties.get("mailboxPath").is_none(), "{}", definition.name);
            assert!(properties.get("mailbox").is_none(), "{}", definition.name);
        }
    }
}
