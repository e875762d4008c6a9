//! Drafting replies and new messages.
//!
//! Neither tool sends anything: the reply is saved to Drafts and the new
//! message stays an unsent outgoing message.

use serde_json::Value;

use super::args::{
    encode_list, flag, mailbox_path, message_id, optional_bool, optional_str, required_str,
    string_list,
};
use super::Invocation;

const REPLY_TO_MESSAGE_SCRIPT: &str = include_str!("scripts/reply_to_message.js");
const CREATE_OUTGOING_MESSAGE_SCRIPT: &str = include_str!("scripts/create_outgoing_message.js");

pub fn reply_to_message(arguments: &Value) -> Result<Invocation, String> {
    let account = required_str(arguments, "account")?;
    let path = mailbox_path(arguments, "mailbox_path")?;
    let id = message_id(arguments, "message_id")?;
    let content = required_str(arguments, "reply_content")?;
    let opening_window = optional_bool(arguments, "opening_window", false)?;
    let reply_to_all = optional_bool(arguments, "reply_to_all", false)?;

    Ok(Invocation::new(
        REPLY_TO_MESSAGE_SCRIPT,
        vec![
            account.to_string(),
            path,
            id.to_string(),
            content.to_string(),
            flag(opening_window),
            flag(reply_to_all),
        ],
    ))
}

pub fn create_outgoing_message(arguments: &Value) -> Result<Invocation, String> {
    let subject = required_str(arguments, "subject")?.trim();
    if subject.is_empty() {
        return Err("Parameter 'subject' cannot be empty or whitespace-only".to_string());
    }
    let content = required_str(arguments, "content")?;

    let to = string_list(arguments, "to_recipients")?;
    if to.is_empty() {
        return Err("Parameter 'to_recipients' must contain at least one address".to_string());
    }
    let cc = string_list(arguments, "cc_recipients")?;
    let bcc = string_list(arguments, "bcc_recipients")?;
    let sender = optional_str(arguments, "sender")?;
    let opening_window = optional_bool(arguments, "opening_window", false)?;

    Ok(Invocation::new(
        CREATE_OUTGOING_MESSAGE_SCRIPT,
        vec![
            subject.to_string(),
            content.to_string(),
            encode_list(&to),
            optional_list(&cc),
            optional_list(&bcc),
            sender.to_string(),
            flag(opening_window),
        ],
    ))
}

/// Empty lists are passed as `""` so the script can skip them.
fn optional_list(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        encode_list(items)
    }
}
