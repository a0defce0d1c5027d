// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and recording graph submissions.

use crate::error::{ProvisionError, Result};
use crate::graph::{Applier, Operation, ResourceNode};
use async_trait::async_trait;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    store_applies: bool,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            store_applies: false,
        }
    }

    /// Keep every applied (PATCHed) object and serve it to later GETs of the same path
    pub fn storing_applies(mut self) -> Self {
        self.store_applies = true;
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Add a response for any method matching the exact path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Every (method, path) received so far, in order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether any request other than a read reached the API
    pub fn has_writes(&self) -> bool {
        self.requests().iter().any(|(m, _)| m != "GET")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);
        let store = self.store_applies && method == "PATCH";
        let responses = self.responses.clone();

        Box::pin(async move {
            let (status, body) = if store {
                let applied = req.into_body().collect().await?.to_bytes();
                let applied = String::from_utf8_lossy(&applied).to_string();
                responses
                    .lock()
                    .unwrap()
                    .insert(("GET".to_string(), path), (200, applied.clone()));
                (200, applied)
            } else {
                response.unwrap_or_else(|| (404, not_found_json("object", "unknown")))
            };
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock Secret JSON response; values are base64 encoded as on the wire
pub fn secret_json(namespace: &str, name: &str, data: &[(&str, &[u8])]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let data: serde_json::Map<String, serde_json::Value> = data
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(STANDARD.encode(v))))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid"
        },
        "type": "Opaque",
        "data": data
    })
    .to_string()
}

/// Create a mock CA ClusterIssuer JSON response
pub fn cluster_issuer_json(name: &str, ca_secret_name: &str) -> String {
    serde_json::json!({
        "apiVersion": "cert-manager.io/v1",
        "kind": "ClusterIssuer",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        },
        "spec": {
            "ca": { "secretName": ca_secret_name }
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create an arbitrary failure Status response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyEvent {
    Started(String),
    Converged(String),
    Deleted(String),
}

/// An in-memory applier that records the order in which nodes are touched.
#[derive(Default)]
pub struct RecordingApplier {
    events: Mutex<Vec<ApplyEvent>>,
    existing: Mutex<HashSet<String>>,
    applied: Mutex<HashMap<String, ResourceNode>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    lookup_delays: HashMap<String, Duration>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(self, id: &str) -> Self {
        self.existing.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Delay answering whether the node exists
    pub fn with_lookup_delay(mut self, id: &str, delay: Duration) -> Self {
        self.lookup_delays.insert(id.to_string(), delay);
        self
    }

    pub fn events(&self) -> Vec<ApplyEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self, id: &str) -> bool {
        self.events()
            .contains(&ApplyEvent::Started(id.to_string()))
    }

    pub fn exists_now(&self, id: &str) -> bool {
        self.existing.lock().unwrap().contains(id)
    }

    /// The last node applied under the given id
    pub fn applied(&self, id: &str) -> Option<ResourceNode> {
        self.applied.lock().unwrap().get(id).cloned()
    }

    /// Whether `first` converged before `second` was started
    pub fn converged_before(&self, first: &str, second: &str) -> bool {
        let events = self.events();
        let converged = events
            .iter()
            .position(|e| *e == ApplyEvent::Converged(first.to_string()));
        let started = events
            .iter()
            .position(|e| *e == ApplyEvent::Started(second.to_string()));
        matches!((converged, started), (Some(c), Some(s)) if c < s)
    }
}

#[async_trait]
impl Applier for RecordingApplier {
    async fn exists(&self, node: &ResourceNode) -> Result<bool> {
        if let Some(delay) = self.lookup_delays.get(node.id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.exists_now(node.id.as_str()))
    }

    async fn apply(&self, node: &ResourceNode, _op: Operation) -> Result<()> {
        let id = node.id.to_string();
        self.events
            .lock()
            .unwrap()
            .push(ApplyEvent::Started(id.clone()));

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&id) {
            return Err(ProvisionError::HelmError(format!(
                "simulated failure for {}",
                id
            )));
        }

        self.existing.lock().unwrap().insert(id.clone());
        self.applied.lock().unwrap().insert(id.clone(), node.clone());
        self.events.lock().unwrap().push(ApplyEvent::Converged(id));
        Ok(())
    }

    async fn delete(&self, node: &ResourceNode) -> Result<()> {
        let id = node.id.to_string();
        self.existing.lock().unwrap().remove(&id);
        self.events.lock().unwrap().push(ApplyEvent::Deleted(id));
        Ok(())
    }
}

/// A stand-in helm binary: a shell script logging its arguments and
/// answering `list` and `get values` with canned JSON.
pub struct FakeHelm {
    dir: PathBuf,
}

impl FakeHelm {
    pub fn new(name: &str, list_json: &str, values_json: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("fake-helm-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("list.json"), list_json).unwrap();
        std::fs::write(dir.join("values.json"), values_json).unwrap();

        let script = format!(
            r#"#!/bin/sh
echo "$*" >> '{dir}/calls.log'
case "$1" in
  status) echo "STATUS: deployed" ;;
  list) cat '{dir}/list.json' ;;
  get) cat '{dir}/values.json' ;;
  upgrade) cat > /dev/null ;;
esac
"#,
            dir = dir.display()
        );
        let path = dir.join("helm");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("helm")
    }

    /// Every invocation so far, arguments joined by spaces
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Drop for FakeHelm {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
