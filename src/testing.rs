// Scripted in-memory engine, bootstrap and URL store. Each records what it was asked to do.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use async_trait::async_trait;

use crate::engine::{EngineBootstrap, ObjectUrls, Transcoder};
use crate::error::MediaError;
use crate::types::MediaUrl;

/// Route `tracing` output through the test harness so failures show the operation log.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Write(String),
    Read(String),
    Delete(String),
    Exec(Vec<String>),
}

#[derive(Default)]
struct EngineInner {
    files: RefCell<HashMap<String, Vec<u8>>>,
    written: RefCell<HashMap<String, Vec<u8>>>,
    calls: RefCell<Vec<Call>>,
    produces: RefCell<Vec<(String, Vec<u8>)>>,
    exit_code: Cell<i32>,
    exec_error: RefCell<Option<String>>,
}

/// In-memory engine. Clones share state, so tests keep one to inspect after handing one off.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    inner: Rc<EngineInner>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the next exec writes into the namespace.
    pub fn producing(self, name: &str, bytes: Vec<u8>) -> Self {
        self.inner
            .produces
            .borrow_mut()
            .push((name.to_string(), bytes));
        self
    }

    pub fn exiting_with(self, code: i32) -> Self {
        self.inner.exit_code.set(code);
        self
    }

    pub fn throwing(self, message: &str) -> Self {
        *self.inner.exec_error.borrow_mut() = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.borrow().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::Delete(n) => Some(n.clone()),
            _ => None,
        })
    }

    pub fn execs(&self) -> Vec<Vec<String>> {
        self.filter(|c| match c {
            Call::Exec(args) => Some(args.clone()),
            _ => None,
        })
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.inner.files.borrow().contains_key(name)
    }

    /// Everything written under `name` during the run, even if later deleted.
    pub fn written(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.written.borrow().get(name).cloned()
    }

    fn filter<T>(&self, f: impl Fn(&Call) -> Option<T>) -> Vec<T> {
        self.inner.calls.borrow().iter().filter_map(f).collect()
    }

    fn record(&self, call: Call) {
        self.inner.calls.borrow_mut().push(call);
    }
}

#[async_trait(?Send)]
impl Transcoder for ScriptedEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MediaError> {
        self.record(Call::Write(name.to_string()));
        self.inner
            .files
            .borrow_mut()
            .insert(name.to_string(), data.to_vec());
        self.inner
            .written
            .borrow_mut()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        self.record(Call::Read(name.to_string()));
        self.inner
            .files
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| MediaError::ReadFailed {
                name: name.to_string(),
                message: "no such file".to_string(),
            })
    }

    async fn delete_file(&self, name: &str) -> Result<(), MediaError> {
        self.record(Call::Delete(name.to_string()));
        match self.inner.files.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(MediaError::Engine(format!("cannot delete {}", name))),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<i32, MediaError> {
        self.record(Call::Exec(args.to_vec()));
        if let Some(message) = self.inner.exec_error.borrow().clone() {
            return Err(MediaError::Engine(message));
        }
        let code = self.inner.exit_code.get();
        if code == 0 {
            let mut files = self.inner.files.borrow_mut();
            for (name, bytes) in self.inner.produces.borrow().iter() {
                files.insert(name.clone(), bytes.clone());
            }
        }
        Ok(code)
    }
}

/// Returns `Pending` once, so a concurrent future gets polled in between.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Bootstrap with per-source failure injection.
#[derive(Default)]
pub struct ScriptedBootstrap {
    engine: ScriptedEngine,
    failing_fetch: RefCell<HashSet<String>>,
    failing_init: RefCell<HashSet<String>>,
    yielding: bool,
    fetched: RefCell<Vec<String>>,
    initialized: Cell<usize>,
}

impl ScriptedBootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out clones of `engine` on every successful init.
    pub fn with_engine(engine: ScriptedEngine) -> Self {
        ScriptedBootstrap {
            engine,
            ..Self::default()
        }
    }

    pub fn failing_fetch(self, base: &str) -> Self {
        self.failing_fetch.borrow_mut().insert(base.to_string());
        self
    }

    pub fn failing_init(self, base: &str) -> Self {
        self.failing_init.borrow_mut().insert(base.to_string());
        self
    }

    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    pub fn heal(&self) {
        self.failing_fetch.borrow_mut().clear();
        self.failing_init.borrow_mut().clear();
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }

    pub fn initialized(&self) -> usize {
        self.initialized.get()
    }

    fn matches(set: &RefCell<HashSet<String>>, url: &str) -> bool {
        set.borrow().iter().any(|base| url.starts_with(base.as_str()))
    }
}

#[async_trait(?Send)]
impl EngineBootstrap for ScriptedBootstrap {
    type Engine = ScriptedEngine;

    async fn fetch_resource(&self, url: &str, _mime: &str) -> Result<String, MediaError> {
        self.fetched.borrow_mut().push(url.to_string());
        if self.yielding {
            YieldOnce(false).await;
        }
        if Self::matches(&self.failing_fetch, url) {
            return Err(MediaError::Engine(format!("HTTP 404 for {}", url)));
        }
        Ok(format!("blob:{}", url))
    }

    async fn initialize(
        &self,
        core_ref: &str,
        _wasm_ref: &str,
        on_progress: &dyn Fn(f64),
    ) -> Result<ScriptedEngine, MediaError> {
        self.initialized.set(self.initialized.get() + 1);
        on_progress(50.0);
        let url = core_ref.trim_start_matches("blob:");
        if Self::matches(&self.failing_init, url) {
            return Err(MediaError::Engine("wasm instantiation failed".to_string()));
        }
        Ok(self.engine.clone())
    }
}

/// Object URL store that hands out `blob:test/<n>` and remembers mime types.
#[derive(Default)]
pub struct ScriptedUrls {
    created: RefCell<Vec<(MediaUrl, String)>>,
    revoked: RefCell<Vec<MediaUrl>>,
    fail_after: Cell<Option<usize>>,
}

impl ScriptedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every create once `count` URLs exist.
    pub fn failing_after(self, count: usize) -> Self {
        self.fail_after.set(Some(count));
        self
    }

    pub fn created(&self) -> Vec<(MediaUrl, String)> {
        self.created.borrow().clone()
    }

    pub fn revoked(&self) -> Vec<MediaUrl> {
        self.revoked.borrow().clone()
    }
}

impl ObjectUrls for ScriptedUrls {
    fn create(&self, _data: &[u8], mime: &str) -> Result<MediaUrl, MediaError> {
        let mut created = self.created.borrow_mut();
        if self.fail_after.get().is_some_and(|limit| created.len() >= limit) {
            return Err(MediaError::Engine("out of memory".to_string()));
        }
        let url = MediaUrl::new(format!("blob:test/{}", created.len()));
        created.push((url.clone(), mime.to_string()));
        Ok(url)
    }

    fn revoke(&self, url: &MediaUrl) {
        self.revoked.borrow_mut().push(url.clone());
    }
}
