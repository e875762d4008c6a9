//! Mail.app tools exposed over MCP.
//!
//! Each tool validates its JSON arguments, turns them into positional string
//! arguments and runs an embedded JXA script through the [`Executor`].
//! Invalid input is rejected before anything is spawned.
//!
//! | Tool | Script arguments |
//! |------|------------------|
//! | `list_accounts` | enabled |
//! | `list_mailboxes` | account |
//! | `find_unread_mailboxes` | account |
//! | `get_selected_messages` | limit, `start_at` |
//! | `get_message_content` | account, mailbox path (JSON), message id |
//! | `reply_to_message` | account, mailbox path (JSON), message id, content, window, all |
//! | `create_outgoing_message` | subject, content, to, cc, bcc (JSON), sender, window |

mod args;
mod compose;
mod definitions;
mod mailboxes;
mod messages;

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::jxa::Executor;
use crate::mcp::server::ToolCallResult;

pub use definitions::tool_definitions;

/// A validated tool call, ready to hand to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// JXA source of the script.
    pub script: &'static str,
    /// Positional arguments, delivered to `run(argv)`.
    pub args: Vec<String>,
}

impl Invocation {
    fn new(script: &'static str, args: Vec<String>) -> Self {
        Self { script, args }
    }
}

/// Validates `arguments` for the named tool.
///
/// # Errors
///
/// Returns a message describing the first invalid argument, or naming the
/// tool if it is unknown.
pub fn prepare(name: &str, arguments: &Value) -> Result<Invocation, String> {
    match name {
        "list_accounts" => mailboxes::list_accounts(arguments),
        "list_mailboxes" => mailboxes::list_mailboxes(arguments),
        "find_unread_mailboxes" => mailboxes::find_unread_mailboxes(arguments),
        "get_selected_messages" => messages::get_selected_messages(arguments),
        "get_message_content" => messages::get_message_content(arguments),
        "reply_to_message" => compose::reply_to_message(arguments),
        "create_outgoing_message" => compose::create_outgoing_message(arguments),
        _ => Err(format!("Unknown tool: {name}")),
    }
}

/// The Mail.app tool set bound to an executor.
#[derive(Debug, Clone)]
pub struct MailTools {
    executor: Executor,
    timeout: Duration,
}

impl MailTools {
    /// Creates the tool set. `timeout` bounds every tool call.
    #[must_use]
    pub const fn new(executor: Executor, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    /// Runs a tool call.
    ///
    /// Validation failures and script errors both come back as error
    /// results; this never fails at the protocol level.
    pub async fn call(
        &self,
        name: &str,
        arguments: &Value,
        cancel: &CancellationToken,
    ) -> ToolCallResult {
        let invocation = match prepare(name, arguments) {
            Ok(invocation) => invocation,
            Err(message) => {
                tracing::debug!(tool = name, %message, "Rejected tool arguments");
                return ToolCallResult::error(message);
            }
        };

        tracing::debug!(tool = name, args = ?invocation.args, "Running tool script");

        match self
            .executor
            .execute_with_timeout(cancel, self.timeout, invocation.script, &invocation.args)
            .await
        {
            Ok(data) => ToolCallResult::json(&data),
            Err(e) => {
                tracing::warn!(tool = name, kind = ?e.kind(), "Tool call failed");
                ToolCallResult::error(format!("failed to execute {name}: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mcp::server::ToolContent;

    fn text(result: &ToolCallResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[test]
    fn every_definition_has_a_handler() {
        for definition in tool_definitions() {
            let outcome = prepare(&definition.name, &json!({}));
            if let Err(message) = outcome {
                assert!(
                    !message.starts_with("Unknown tool"),
                    "{} has no handler",
                    definition.name
                );
            }
        }
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = prepare("send_everything", &json!({})).unwrap_err();
        assert_eq!(err, "Unknown tool: send_everything");
    }

    #[tokio::test]
    async fn invalid_arguments_do_not_spawn() {
        // The interpreter does not exist; reaching the executor would report
        // a spawn failure instead of the validation message.
        let tools = MailTools::new(
            Executor::with_interpreter("/nonexistent/osascript"),
            Duration::from_secs(1),
        );
        let cancel = CancellationToken::new();

        let result = tools.call("list_mailboxes", &json!({}), &cancel).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "Missing required parameter: account");
    }

    #[tokio::test]
    async fn executor_errors_become_error_results() {
        let tools = MailTools::new(
            Executor::with_interpreter("/nonexistent/osascript"),
            Duration::from_secs(1),
        );
        let cancel = CancellationToken::new();

        let result = tools
            .call("list_accounts", &json!({"enabled": true}), &cancel)
            .await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("failed to execute list_accounts: "));
    }

    #[tokio::test]
    async fn cancelled_call_reports_cancellation() {
        let tools = MailTools::new(
            Executor::with_interpreter("/nonexistent/osascript"),
            Duration::from_secs(1),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = tools.call("list_accounts", &json!({}), &cancel).await;
        assert!(result.is_error);
        assert!(text(&result).contains("cancelled"));
    }
}
