use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/value environment handed to an adapter or plugin at construction.
///
/// Ordered so that the `-e` flags passed to a plugin container are stable.
pub type Environment = BTreeMap<String, String>;

/// One unit of conversation content, inbound from or outbound to an adapter.
///
/// Never mutated after construction: a reply is a fresh `Message` built with
/// [`Message::reply`], which keeps the originating channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Adapter-specific channel identifier (room, chat ID, DM handle, …).
    pub channel: String,

    /// Plain text content.
    pub body: String,
}

impl Message {
    pub fn new(channel: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            body: body.into(),
        }
    }

    /// Build the reply to this message: same channel, new body.
    pub fn reply(&self, body: impl Into<String>) -> Self {
        Self::new(self.channel.clone(), body)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.channel, self.body)
    }
}

/// Static eligibility flags of a loaded plugin.
///
/// Set once from configuration and never mutated afterwards, so the frozen
/// plugin list can be shared by every dispatch worker without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFilter {
    /// Channels the plugin may run on. Empty means no restriction.
    #[serde(default)]
    pub only_channels: Vec<String>,

    /// Run only for direct messages (adapter-defined).
    #[serde(default)]
    pub only_direct_messages: bool,

    /// Run only when the bot is mentioned (adapter-defined).
    #[serde(default)]
    pub only_mentions: bool,
}

impl PluginFilter {
    /// `true` when the channel allowlist is empty or contains `channel`.
    pub fn allows_channel(&self, channel: &str) -> bool {
        self.only_channels.is_empty() || self.only_channels.iter().any(|c| c == channel)
    }
}

/// Lifecycle of the daemon as a whole.
///
/// `Starting → Running → ShuttingDown → Stopped`; a load failure while
/// `Starting` jumps straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Starting => write!(f, "starting"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::ShuttingDown => write!(f, "shutting_down"),
            DaemonState::Stopped => write!(f, "stopped"),
        }
    }
}
