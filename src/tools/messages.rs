//! Reading messages.

use serde_json::Value;

use super::args::{mailbox_path, message_id, optional_u64, required_str};
use super::Invocation;

const GET_SELECTED_MESSAGES_SCRIPT: &str = include_str!("scripts/get_selected_messages.js");
const GET_MESSAGE_CONTENT_SCRIPT: &str = include_str!("scripts/get_message_content.js");

/// Largest page `get_selected_messages` returns.
const MAX_SELECTED_LIMIT: u64 = 100;
const DEFAULT_SELECTED_LIMIT: u64 = 10;

pub fn get_selected_messages(arguments: &Value) -> Result<Invocation, String> {
    let limit = optional_u64(arguments, "limit", DEFAULT_SELECTED_LIMIT)?;
    if !(1..=MAX_SELECTED_LIMIT).contains(&limit) {
        return Err(format!(
            "Parameter 'limit' must be between 1 and {MAX_SELECTED_LIMIT}, got {limit}"
        ));
    }
    let start_at = optional_u64(arguments, "start_at", 0)?;

    Ok(Invocation::new(
        GET_SELECTED_MESSAGES_SCRIPT,
        vec![limit.to_string(), start_at.to_string()],
    ))
}

pub fn get_message_content(arguments: &Value) -> Result<Invocation, String> {
    let account = required_str(arguments, "account")?;
    let path = mailbox_path(arguments, "mailbox_path")?;
    let id = message_id(arguments, "message_id")?;

    Ok(Invocation::new(
        GET_MESSAGE_CONTENT_SCRIPT,
        vec![account.to_string(), path, id.to_string()],
    ))
}
