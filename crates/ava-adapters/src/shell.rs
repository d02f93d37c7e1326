//! Console adapter: reads messages from stdin, writes replies to stdout.
//!
//! Text mode (default), one message per line:
//! - `#ops deploy status` → channel `ops`, body `deploy status`
//! - `hello`              → the direct channel (default `direct`)
//!
//! JSON mode (`SHELL_FORMAT=json`) reads and writes one serialized
//! [`Message`] per line instead.
//!
//! Environment:
//! - `SHELL_NICK`:           name matched by `@nick` mentions (default `ava`)
//! - `SHELL_DIRECT_CHANNEL`: channel treated as a direct conversation
//! - `SHELL_FORMAT`:         `text` or `json`

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ava_core::{Environment, Message, PluginFilter};

use crate::{
    adapter::Adapter,
    eligibility::is_eligible,
    error::AdapterError,
    types::{AdapterEnd, AdapterLink, AdapterSpec, ErrorSink},
};

const DEFAULT_NICK: &str = "ava";
const DEFAULT_DIRECT_CHANNEL: &str = "direct";

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Line encoding used on stdin/stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    Text,
    Json,
}

/// Settings parsed from the adapter environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub nick: String,
    pub direct_channel: String,
    pub format: LineFormat,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            nick: DEFAULT_NICK.to_string(),
            direct_channel: DEFAULT_DIRECT_CHANNEL.to_string(),
            format: LineFormat::Text,
        }
    }
}

impl ShellSettings {
    pub fn from_env(env: &Environment) -> Result<Self, AdapterError> {
        let mut settings = Self::default();
        if let Some(nick) = non_empty(env, "SHELL_NICK") {
            settings.nick = nick.trim_start_matches('@').to_string();
        }
        if let Some(channel) = non_empty(env, "SHELL_DIRECT_CHANNEL") {
            settings.direct_channel = channel.to_string();
        }
        if let Some(format) = non_empty(env, "SHELL_FORMAT") {
            settings.format = match format.to_ascii_lowercase().as_str() {
                "text" => LineFormat::Text,
                "json" => LineFormat::Json,
                other => {
                    return Err(AdapterError::InvalidEnvironment {
                        key: "SHELL_FORMAT".to_string(),
                        reason: format!("expected `text` or `json`, got `{other}`"),
                    })
                }
            };
        }
        Ok(settings)
    }

    /// Decode one input line. Blank lines yield `None`.
    pub fn parse_line(&self, line: &str) -> Result<Option<Message>, AdapterError> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return Ok(None);
        }
        match self.format {
            LineFormat::Json => serde_json::from_str(line)
                .map(Some)
                .map_err(|e| AdapterError::Malformed(e.to_string())),
            LineFormat::Text => {
                let addressed = line
                    .strip_prefix('#')
                    .and_then(|rest| rest.split_once(' '))
                    .filter(|(channel, _)| !channel.is_empty());
                Ok(Some(match addressed {
                    Some((channel, body)) => Message::new(channel, body),
                    None => Message::new(self.direct_channel.clone(), line),
                }))
            }
        }
    }

    /// Encode one reply as an output line (without the newline).
    pub fn format_reply(&self, msg: &Message) -> Result<String, AdapterError> {
        match self.format {
            LineFormat::Json => {
                serde_json::to_string(msg).map_err(|e| AdapterError::Malformed(e.to_string()))
            }
            LineFormat::Text => Ok(msg.to_string()),
        }
    }

    pub fn is_direct(&self, msg: &Message) -> bool {
        msg.channel == self.direct_channel
    }

    pub fn is_mention(&self, msg: &Message) -> bool {
        msg.body.contains(&format!("@{}", self.nick))
    }
}

fn non_empty<'a>(env: &'a Environment, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

struct ShellIo {
    reader: Reader,
    writer: Writer,
}

/// Adapter bound to a line-oriented reader/writer pair (stdin/stdout by
/// default).
pub struct ShellAdapter {
    settings: ShellSettings,
    buffer: usize,
    /// Taken by the first `start`; a second start fails.
    io: Mutex<Option<ShellIo>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
}

impl ShellAdapter {
    pub const NAME: &'static str = "shell";

    /// Registry constructor bound to the process stdin/stdout.
    pub fn factory(spec: &AdapterSpec) -> Result<Arc<dyn Adapter>, AdapterError> {
        let settings = ShellSettings::from_env(&spec.environment)?;
        Ok(Arc::new(Self::with_io(
            settings,
            spec.buffer,
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
        )))
    }

    pub fn with_io(settings: ShellSettings, buffer: usize, reader: Reader, writer: Writer) -> Self {
        Self {
            settings,
            buffer,
            io: Mutex::new(Some(ShellIo { reader, writer })),
            writer_task: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ShellSettings {
        &self.settings
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn start(&self) -> Result<AdapterLink, AdapterError> {
        let io = self
            .io
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| AdapterError::StartFailed("shell adapter already started".into()))?;

        let (link, end) = AdapterLink::pair(self.buffer);
        let AdapterEnd {
            inbound,
            outbound,
            errors,
        } = end;

        tokio::spawn(read_lines(
            self.settings.clone(),
            io.reader,
            inbound,
            errors.clone(),
        ));
        let writer = tokio::spawn(write_replies(
            self.settings.clone(),
            io.writer,
            outbound,
            errors,
        ));
        *self
            .writer_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(writer);

        info!(adapter = Self::NAME, nick = %self.settings.nick, "shell adapter started");
        Ok(link)
    }

    fn should_run(&self, filter: &PluginFilter, msg: &Message) -> bool {
        is_eligible(
            filter,
            msg,
            self.settings.is_direct(msg),
            self.settings.is_mention(msg),
        )
    }

    /// Wait for every queued reply to be written.
    ///
    /// The writer finishes once the dispatch worker has dropped its outbound
    /// sender.
    async fn stop(&self) -> Result<(), AdapterError> {
        let task = self
            .writer_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.await
                .map_err(|e| AdapterError::Io(std::io::Error::other(e)))?;
        }
        Ok(())
    }
}

async fn read_lines(
    settings: ShellSettings,
    reader: Reader,
    inbound: mpsc::Sender<Message>,
    errors: ErrorSink,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match settings.parse_line(&line) {
                Ok(Some(msg)) => {
                    if inbound.send(msg).await.is_err() {
                        debug!(adapter = ShellAdapter::NAME, "dispatch worker gone, stop reading");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = errors.send(e);
                }
            },
            Ok(None) => {
                info!(adapter = ShellAdapter::NAME, "input closed");
                break;
            }
            Err(e) => {
                let _ = errors.send(AdapterError::Io(e));
                break;
            }
        }
    }
}

async fn write_replies(
    settings: ShellSettings,
    mut writer: Writer,
    mut outbound: mpsc::Receiver<Message>,
    errors: ErrorSink,
) {
    while let Some(msg) = outbound.recv().await {
        let line = match settings.format_reply(&msg) {
            Ok(line) => line,
            Err(e) => {
                let _ = errors.send(e);
                continue;
            }
        };
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!(adapter = ShellAdapter::NAME, error = %e, "failed to write reply");
            let _ = errors.send(AdapterError::Io(e));
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn settings_defaults() {
        let settings = ShellSettings::from_env(&Environment::new()).unwrap();
        assert_eq!(settings, ShellSettings::default());
        assert_eq!(settings.nick, "ava");
        assert_eq!(settings.direct_channel, "direct");
    }

    #[test]
    fn settings_from_env() {
        let settings = ShellSettings::from_env(&env(&[
            ("SHELL_NICK", "@bender"),
            ("SHELL_DIRECT_CHANNEL", "dm"),
            ("SHELL_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(settings.nick, "bender");
        assert_eq!(settings.direct_channel, "dm");
        assert_eq!(settings.format, LineFormat::Json);
    }

    #[test]
    fn bad_format_is_rejected() {
        let err = ShellSettings::from_env(&env(&[("SHELL_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidEnvironment { ref key, .. } if key == "SHELL_FORMAT"));
    }

    #[test]
    fn parse_addressed_and_direct_lines() {
        let settings = ShellSettings::default();
        assert_eq!(
            settings.parse_line("#ops deploy now").unwrap(),
            Some(Message::new("ops", "deploy now"))
        );
        assert_eq!(
            settings.parse_line("hello there\r").unwrap(),
            Some(Message::new("direct", "hello there"))
        );
        // no body after the channel: treated as plain text
        assert_eq!(
            settings.parse_line("#ops").unwrap(),
            Some(Message::new("direct", "#ops"))
        );
        assert_eq!(settings.parse_line("   ").unwrap(), None);
    }

    #[test]
    fn parse_json_lines() {
        let settings = ShellSettings {
            format: LineFormat::Json,
            ..Default::default()
        };
        assert_eq!(
            settings
                .parse_line(r#"{"channel":"ops","body":"ping\n"}"#)
                .unwrap(),
            Some(Message::new("ops", "ping\n"))
        );
        assert!(matches!(
            settings.parse_line("not json"),
            Err(AdapterError::Malformed(_))
        ));
    }

    #[test]
    fn direct_and_mention_detection() {
        let settings = ShellSettings::default();
        assert!(settings.is_direct(&Message::new("direct", "x")));
        assert!(!settings.is_direct(&Message::new("ops", "x")));
        assert!(settings.is_mention(&Message::new("ops", "hey @ava, status?")));
        assert!(!settings.is_mention(&Message::new("ops", "hey ava")));
    }

    #[tokio::test]
    async fn should_run_uses_shell_semantics() {
        let (_out, writer) = tokio::io::duplex(64);
        let adapter = ShellAdapter::with_io(
            ShellSettings::default(),
            4,
            Box::new(tokio::io::empty()),
            Box::new(writer),
        );
        let mentions = PluginFilter {
            only_mentions: true,
            ..Default::default()
        };
        let direct = PluginFilter {
            only_direct_messages: true,
            ..Default::default()
        };
        assert!(adapter.should_run(&mentions, &Message::new("ops", "@ava ping")));
        assert!(!adapter.should_run(&mentions, &Message::new("ops", "ping")));
        assert!(adapter.should_run(&direct, &Message::new("direct", "ping")));
        assert!(!adapter.should_run(&direct, &Message::new("ops", "ping")));
    }

    #[tokio::test]
    async fn reads_input_and_writes_replies() {
        let input: &'static [u8] = b"#ops ping\nhello\n\n";
        let (mut out, writer) = tokio::io::duplex(1024);
        let adapter = ShellAdapter::with_io(
            ShellSettings::default(),
            4,
            Box::new(input),
            Box::new(writer),
        );

        let mut link = adapter.start().await.unwrap();
        assert_eq!(link.inbound.recv().await, Some(Message::new("ops", "ping")));
        assert_eq!(
            link.inbound.recv().await,
            Some(Message::new("direct", "hello"))
        );
        // EOF closes the inbound stream
        assert_eq!(link.inbound.recv().await, None);

        link.outbound.send(Message::new("ops", "pong")).await.unwrap();
        drop(link);
        adapter.stop().await.unwrap();
        drop(adapter);

        let mut written = String::new();
        out.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "[ops] pong\n");
    }

    #[tokio::test]
    async fn malformed_json_is_reported_on_error_channel() {
        let input: &'static [u8] = b"oops\n{\"channel\":\"a\",\"body\":\"b\"}\n";
        let (_out, writer) = tokio::io::duplex(64);
        let settings = ShellSettings {
            format: LineFormat::Json,
            ..Default::default()
        };
        let adapter = ShellAdapter::with_io(settings, 4, Box::new(input), Box::new(writer));

        let mut link = adapter.start().await.unwrap();
        assert_eq!(link.inbound.recv().await, Some(Message::new("a", "b")));
        assert!(matches!(
            link.error_events.recv().await,
            Some(AdapterError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn second_start_fails() {
        let (_out, writer) = tokio::io::duplex(64);
        let adapter = ShellAdapter::with_io(
            ShellSettings::default(),
            4,
            Box::new(tokio::io::empty()),
            Box::new(writer),
        );
        let _link = adapter.start().await.unwrap();
        assert!(matches!(
            adapter.start().await,
            Err(AdapterError::StartFailed(_))
        ));
    }
}
