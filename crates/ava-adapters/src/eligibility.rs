//! Shared eligibility rules for adapters.
//!
//! Adapters work out whether a message is direct or mentions the bot; the
//! combination with a plugin's static flags is the same everywhere.

use ava_core::{Message, PluginFilter};

/// Returns `true` when a plugin with `filter` may run for `msg`.
///
/// All three restrictions must hold:
/// - channel allowlist empty, or containing `msg.channel`
/// - `only_direct_messages` unset, or the message is direct
/// - `only_mentions` unset, or the message mentions the bot
pub fn is_eligible(filter: &PluginFilter, msg: &Message, is_direct: bool, is_mention: bool) -> bool {
    filter.allows_channel(&msg.channel)
        && (!filter.only_direct_messages || is_direct)
        && (!filter.only_mentions || is_mention)
}
