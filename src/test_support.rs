//! Test support utilities shared across unit and integration tests.
//!
//! [`FakeOntap`] is an in-memory management plane implementing both
//! [`Transport`] and [`Connector`]. It understands the handful of endpoints
//! the lifecycle manager calls, and can inject failures, latency, delayed
//! visibility of new resources and slow-to-disappear deletions.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use uuid::Uuid;

use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::credential::Credential;
use crate::resource::ManagementEndpoint;
use crate::secret::{SecretError, SecretFuture, SecretSource};
use crate::transport::{
    ApiRequest, ApiResponse, Connector, Method, Transport, TransportError, TransportFuture,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Secret source returning a fixed value and counting lookups.
#[derive(Clone, Debug)]
pub struct StaticSecretSource {
    value: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticSecretSource {
    /// Source that always returns `value`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Source whose secret has no value.
    #[must_use]
    pub fn missing() -> Self {
        Self {
            value: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of lookups performed so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretSource for StaticSecretSource {
    fn fetch<'a>(&'a self, name: &'a str, _region: &'a str) -> SecretFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.value.clone().ok_or_else(|| SecretError::Missing {
                name: name.to_owned(),
            })
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

/// Failure injected by [`FakeOntap`] for matching requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FakeFailure {
    /// Respond with this HTTP status and an ONTAP-style error body.
    Status(u16),
    /// Fail as a connection error.
    Transport,
    /// Fail as a request timeout.
    Timeout,
    /// Respond `200` with a body that is not JSON.
    Garbage,
}

impl FakeFailure {
    fn respond(self) -> Result<ApiResponse, TransportError> {
        match self {
            Self::Status(status) => Ok(error_response(status, "injected failure")),
            Self::Transport => Err(TransportError::Request(String::from(
                "connection reset by peer",
            ))),
            Self::Timeout => Err(TransportError::Timeout(String::from(
                "operation timed out",
            ))),
            Self::Garbage => Ok(ApiResponse {
                status: 200,
                body: String::from("<html>maintenance</html>"),
            }),
        }
    }
}

#[derive(Clone, Debug)]
struct FailureRule {
    method: Method,
    fragment: String,
    failure: FakeFailure,
    skip: usize,
    remaining: Option<usize>,
}

#[derive(Clone, Debug)]
struct Entry {
    uuid: Uuid,
    parent: Option<Uuid>,
    name: String,
    svm: String,
    lag: usize,
    deleted: bool,
}

impl Entry {
    const fn is_listed(&self) -> bool {
        if self.deleted {
            self.lag > 0
        } else {
            self.lag == 0
        }
    }

    /// Lists the entry once, consuming one read of any visibility lag.
    fn read(&mut self) -> Option<Value> {
        let listed = self.is_listed();
        self.lag = self.lag.saturating_sub(1);
        listed.then(|| json!({"uuid": self.uuid, "name": self.name}))
    }
}

#[derive(Debug, Default)]
struct FakeState {
    entries: Vec<Entry>,
    visibility_delay: usize,
    sticky_deletes: usize,
    swallow_creates: bool,
    latency: Option<Duration>,
    failures: Vec<FailureRule>,
    requests: Vec<ApiRequest>,
    passwords: Vec<String>,
}

/// In-memory ONTAP management plane.
///
/// Clones share state, so a test can keep one handle for assertions while the
/// manager owns another as its connector.
#[derive(Clone, Debug, Default)]
pub struct FakeOntap {
    state: Arc<Mutex<FakeState>>,
}

impl FakeOntap {
    /// Creates an empty management plane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visible volume and returns its UUID.
    pub fn add_volume(&self, name: &str, svm: &str) -> Uuid {
        let uuid = Uuid::new_v4();
        lock(&self.state).entries.push(Entry {
            uuid,
            parent: None,
            name: name.to_owned(),
            svm: svm.to_owned(),
            lag: 0,
            deleted: false,
        });
        uuid
    }

    /// Adds a visible snapshot under `volume` and returns its UUID.
    pub fn add_snapshot(&self, volume: Uuid, name: &str) -> Uuid {
        let uuid = Uuid::new_v4();
        let mut state = lock(&self.state);
        let svm = state
            .entries
            .iter()
            .find(|entry| entry.uuid == volume)
            .map(|entry| entry.svm.clone())
            .unwrap_or_default();
        state.entries.push(Entry {
            uuid,
            parent: Some(volume),
            name: name.to_owned(),
            svm,
            lag: 0,
            deleted: false,
        });
        uuid
    }

    /// Hides newly created resources from the next `reads` matching lists.
    pub fn set_visibility_delay(&self, reads: usize) {
        lock(&self.state).visibility_delay = reads;
    }

    /// Keeps deleted resources listed for the next `reads` matching lists.
    /// `usize::MAX` keeps them listed for good.
    pub fn set_sticky_deletes(&self, reads: usize) {
        lock(&self.state).sticky_deletes = reads;
    }

    /// Accepts create calls without ever materialising the resource.
    pub fn set_swallow_creates(&self, swallow: bool) {
        lock(&self.state).swallow_creates = swallow;
    }

    /// Delays every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.state).latency = Some(latency);
    }

    /// Fails the next request whose method matches and whose path contains
    /// `fragment`.
    pub fn fail_next(&self, method: Method, fragment: &str, failure: FakeFailure) {
        self.push_rule(method, fragment, failure, 0, Some(1));
    }

    /// Lets `skip` matching requests through, then fails the next one.
    pub fn fail_after(&self, method: Method, fragment: &str, skip: usize, failure: FakeFailure) {
        self.push_rule(method, fragment, failure, skip, Some(1));
    }

    /// Fails every request whose method matches and whose path contains
    /// `fragment`.
    pub fn fail_always(&self, method: Method, fragment: &str, failure: FakeFailure) {
        self.push_rule(method, fragment, failure, 0, None);
    }

    fn push_rule(
        &self,
        method: Method,
        fragment: &str,
        failure: FakeFailure,
        skip: usize,
        remaining: Option<usize>,
    ) {
        lock(&self.state).failures.push(FailureRule {
            method,
            fragment: fragment.to_owned(),
            failure,
            skip,
            remaining,
        });
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of requests with `method` whose path contains `fragment`.
    #[must_use]
    pub fn count(&self, method: Method, fragment: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|request| request.method == method && request.path.contains(fragment))
            .count()
    }

    /// Number of transports handed out.
    #[must_use]
    pub fn connections(&self) -> usize {
        lock(&self.state).passwords.len()
    }

    /// Passwords presented by each connection, in order.
    #[must_use]
    pub fn passwords(&self) -> Vec<String> {
        lock(&self.state).passwords.clone()
    }

    /// UUID of the live volume called `name`, ignoring visibility lag.
    #[must_use]
    pub fn volume_uuid(&self, name: &str) -> Option<Uuid> {
        lock(&self.state)
            .entries
            .iter()
            .find(|entry| entry.parent.is_none() && !entry.deleted && entry.name == name)
            .map(|entry| entry.uuid)
    }

    /// Reports whether a live snapshot called `name` exists under `volume`.
    #[must_use]
    pub fn has_snapshot(&self, volume: Uuid, name: &str) -> bool {
        lock(&self.state)
            .entries
            .iter()
            .any(|entry| entry.parent == Some(volume) && !entry.deleted && entry.name == name)
    }
}

fn error_response(status: u16, message: &str) -> ApiResponse {
    ApiResponse {
        status,
        body: json!({"error": {"message": message, "code": status.to_string()}}).to_string(),
    }
}

fn accepted() -> ApiResponse {
    ApiResponse {
        status: 202,
        body: json!({"job": {"uuid": Uuid::new_v4()}}).to_string(),
    }
}

fn collection(records: Vec<Value>) -> ApiResponse {
    let count = records.len();
    ApiResponse {
        status: 200,
        body: json!({"records": records, "num_records": count}).to_string(),
    }
}

fn body_str<'b>(request: &'b ApiRequest, pointer: &str) -> Option<&'b str> {
    request
        .body
        .as_ref()
        .and_then(|body| body.pointer(pointer))
        .and_then(Value::as_str)
}

impl FakeState {
    fn handle(&mut self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.push(request.clone());
        if let Some(failure) = self.take_failure(&request) {
            return failure.respond();
        }

        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let response = match (request.method, segments.as_slice()) {
            (Method::Get, ["storage", "volumes"]) => self.list_volumes(&request),
            (Method::Post, ["storage", "volumes"]) => self.create_clone(&request),
            (Method::Delete, ["storage", "volumes", volume]) => self.delete(None, volume),
            (Method::Get, ["storage", "volumes", volume, "snapshots"]) => {
                self.list_snapshots(volume, &request)
            }
            (Method::Post, ["storage", "volumes", volume, "snapshots"]) => {
                self.create_snapshot(volume, &request)
            }
            (Method::Delete, ["storage", "volumes", volume, "snapshots", snapshot]) => {
                match self.live_volume(volume) {
                    Some(parent) => self.delete(Some(parent), snapshot),
                    None => missing_volume(volume),
                }
            }
            _ => error_response(404, "unsupported endpoint"),
        };
        Ok(response)
    }

    fn take_failure(&mut self, request: &ApiRequest) -> Option<FakeFailure> {
        let rule = self.failures.iter_mut().find(|rule| {
            rule.method == request.method
                && request.path.contains(&rule.fragment)
                && rule.remaining != Some(0)
        })?;
        if rule.skip > 0 {
            rule.skip -= 1;
            return None;
        }
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        Some(rule.failure)
    }

    fn live_volume(&self, segment: &str) -> Option<Uuid> {
        let uuid = Uuid::parse_str(segment).ok()?;
        self.entries
            .iter()
            .any(|entry| entry.uuid == uuid && entry.parent.is_none() && !entry.deleted)
            .then_some(uuid)
    }

    fn live_named(&self, parent: Option<Uuid>, name: &str, svm: Option<&str>) -> bool {
        self.entries.iter().any(|entry| {
            entry.parent == parent
                && !entry.deleted
                && entry.name == name
                && svm.is_none_or(|scope| entry.svm == scope)
        })
    }

    fn list_volumes(&mut self, request: &ApiRequest) -> ApiResponse {
        let name = request.query_value("name");
        let svm = request.query_value("svm.name");
        let records = self
            .entries
            .iter_mut()
            .filter(|entry| {
                entry.parent.is_none()
                    && name.is_none_or(|wanted| entry.name == wanted)
                    && svm.is_none_or(|scope| entry.svm == scope)
            })
            .filter_map(Entry::read)
            .collect();
        collection(records)
    }

    fn list_snapshots(&mut self, volume: &str, request: &ApiRequest) -> ApiResponse {
        let Some(parent) = self.live_volume(volume) else {
            return missing_volume(volume);
        };
        let name = request.query_value("name");
        let records = self
            .entries
            .iter_mut()
            .filter(|entry| {
                entry.parent == Some(parent) && name.is_none_or(|wanted| entry.name == wanted)
            })
            .filter_map(Entry::read)
            .collect();
        collection(records)
    }

    fn insert(&mut self, parent: Option<Uuid>, name: &str, svm: &str) -> ApiResponse {
        if self.swallow_creates {
            return accepted();
        }
        self.entries.push(Entry {
            uuid: Uuid::new_v4(),
            parent,
            name: name.to_owned(),
            svm: svm.to_owned(),
            lag: self.visibility_delay,
            deleted: false,
        });
        accepted()
    }

    fn create_clone(&mut self, request: &ApiRequest) -> ApiResponse {
        let (Some(name), Some(svm)) = (body_str(request, "/name"), body_str(request, "/svm/name"))
        else {
            return error_response(400, "name and svm.name are required");
        };
        if self.live_named(None, name, Some(svm)) {
            return error_response(409, "duplicate volume name");
        }
        let parent_volume = body_str(request, "/clone/parent_volume/name");
        let parent_snapshot = body_str(request, "/clone/parent_snapshot/name");
        let parent = parent_volume.and_then(|volume| {
            self.entries
                .iter()
                .find(|entry| entry.parent.is_none() && !entry.deleted && entry.name == volume)
                .map(|entry| entry.uuid)
        });
        let snapshot_ok = match (parent, parent_snapshot) {
            (Some(uuid), Some(snapshot)) => self.live_named(Some(uuid), snapshot, None),
            _ => false,
        };
        if !snapshot_ok {
            return error_response(404, "parent volume or snapshot not found");
        }
        self.insert(None, name, svm)
    }

    fn create_snapshot(&mut self, volume: &str, request: &ApiRequest) -> ApiResponse {
        let Some(parent) = self.live_volume(volume) else {
            return missing_volume(volume);
        };
        let Some(name) = body_str(request, "/name") else {
            return error_response(400, "name is required");
        };
        if self.live_named(Some(parent), name, None) {
            return error_response(409, "duplicate snapshot name");
        }
        self.insert(Some(parent), name, "")
    }

    fn delete(&mut self, parent: Option<Uuid>, segment: &str) -> ApiResponse {
        let Ok(uuid) = Uuid::parse_str(segment) else {
            return error_response(404, "entry doesn't exist");
        };
        let sticky = self.sticky_deletes;
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.uuid == uuid && entry.parent == parent && !entry.deleted)
        else {
            return error_response(404, "entry doesn't exist");
        };
        entry.deleted = true;
        entry.lag = sticky;
        if parent.is_none() {
            for child in self
                .entries
                .iter_mut()
                .filter(|child| child.parent == Some(uuid))
            {
                child.deleted = true;
                child.lag = 0;
            }
        }
        accepted()
    }
}

fn missing_volume(segment: &str) -> ApiResponse {
    error_response(404, &format!("volume {segment} doesn't exist"))
}

impl Transport for FakeOntap {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let latency = lock(&self.state).latency;
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            lock(&self.state).handle(request)
        })
    }
}

impl Connector for FakeOntap {
    type Transport = Self;

    fn connect(
        &self,
        _endpoint: &ManagementEndpoint,
        credential: &Credential,
    ) -> Result<Self, TransportError> {
        lock(&self.state)
            .passwords
            .push(credential.expose().to_owned());
        Ok(self.clone())
    }
}
