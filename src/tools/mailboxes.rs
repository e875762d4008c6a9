//! Account and mailbox listing.

use serde_json::Value;

use super::args::{flag, optional_bool, required_str};
use super::Invocation;

const LIST_ACCOUNTS_SCRIPT: &str = include_str!("scripts/list_accounts.js");
const LIST_MAILBOXES_SCRIPT: &str = include_str!("scripts/list_mailboxes.js");
const FIND_UNREAD_MAILBOXES_SCRIPT: &str = include_str!("scripts/find_unread_mailboxes.js");

pub fn list_accounts(arguments: &Value) -> Result<Invocation, String> {
    let enabled = optional_bool(arguments, "enabled", false)?;
    Ok(Invocation::new(LIST_ACCOUNTS_SCRIPT, vec![flag(enabled)]))
}

pub fn list_mailboxes(arguments: &Value) -> Result<Invocation, String> {
    let account = required_str(arguments, "account")?;
    Ok(Invocation::new(
        LIST_MAILBOXES_SCRIPT,
        vec![account.to_string()],
    ))
}

pub fn find_unread_mailboxes(arguments: &Value) -> Result<Invocation, String> {
    let account = required_str(arguments, "account")?;
    Ok(Invocation::new(
        FIND_UNREAD_MAILBOXES_SCRIPT,
        vec![account.to_string()],
    ))
}
