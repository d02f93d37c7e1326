// Test doubles shared by the dispatch and lifecycle tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ava_adapters::{eligibility::is_eligible, Adapter, AdapterEnd, AdapterError, AdapterLink};
use ava_core::{Message, PluginFilter};
use ava_plugins::{Plugin, PluginError};

/// Adapter whose channels are driven by the test.
///
/// Direct messages are channels starting with `dm-`; mentions contain `@bot`.
pub struct TestAdapter {
    name: String,
    link: Mutex<Option<AdapterLink>>,
    fail_start: bool,
    pub stops: AtomicUsize,
}

impl TestAdapter {
    pub fn new(name: &str) -> (Arc<TestAdapter>, AdapterEnd) {
        let (link, end) = AdapterLink::pair(16);
        let adapter = TestAdapter {
            name: name.to_string(),
            link: Mutex::new(Some(link)),
            fail_start: false,
            stops: AtomicUsize::new(0),
        };
        (Arc::new(adapter), end)
    }

    pub fn failing(name: &str) -> Arc<TestAdapter> {
        Arc::new(TestAdapter {
            name: name.to_string(),
            link: Mutex::new(None),
            fail_start: true,
            stops: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Adapter for TestAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<AdapterLink, AdapterError> {
        if self.fail_start {
            return Err(AdapterError::StartFailed("connection refused".into()));
        }
        self.link
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| AdapterError::StartFailed("already started".into()))
    }

    fn should_run(&self, filter: &PluginFilter, msg: &Message) -> bool {
        is_eligible(
            filter,
            msg,
            msg.channel.starts_with("dm-"),
            msg.body.contains("@bot"),
        )
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What a [`ScriptedPlugin`] does when invoked.
#[derive(Clone)]
pub enum Behavior {
    Reply(String),
    Echo,
    Fail,
    SlowReply(Duration, String),
}

/// Ordered record of every invocation: (plugin name, input).
pub type CallLog = Arc<Mutex<Vec<(String, String)>>>;

pub struct ScriptedPlugin {
    name: String,
    filter: PluginFilter,
    behavior: Behavior,
    calls: CallLog,
    stop_log: Option<CallLog>,
    fail_stop: bool,
    pub stops: AtomicUsize,
}

impl ScriptedPlugin {
    pub fn new(name: &str, filter: PluginFilter, behavior: Behavior, calls: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            filter,
            behavior,
            calls: Arc::clone(calls),
            stop_log: None,
            fail_stop: false,
            stops: AtomicUsize::new(0),
        }
    }

    /// Also record every `stop` call, in call order, into `log`.
    pub fn with_stop_log(mut self, log: &CallLog) -> Self {
        self.stop_log = Some(Arc::clone(log));
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> &PluginFilter {
        &self.filter
    }

    async fn run(&self, input: &str) -> Result<String, PluginError> {
        self.calls
            .lock()
            .unwrap()
            .push((self.name.clone(), input.to_string()));
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Echo => Ok(input.to_string()),
            Behavior::Fail => Err(PluginError::Failed {
                exit_code: 1,
                stderr: format!("{} exploded", self.name),
            }),
            Behavior::SlowReply(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.stop_log {
            log.lock()
                .unwrap()
                .push((self.name.clone(), "stop".to_string()));
        }
        if self.fail_stop {
            Err(PluginError::Teardown(format!("{} is stuck", self.name)))
        } else {
            Ok(())
        }
    }
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn only_channels(channels: &[&str]) -> PluginFilter {
    PluginFilter {
        only_channels: channels.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

pub fn names(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
}
