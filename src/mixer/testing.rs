//! Scripted in-memory transport for engine and dispatcher tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{Connection, Transport};
use crate::error::TransportError;

/// Responder: (request path, how many times this path was requested before)
type Responder = dyn Fn(&str, usize) -> Result<String, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every request path
pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<String>>,
    seen: Mutex<HashMap<String, usize>>,
    snapshot_gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            seen: Mutex::new(HashMap::new()),
            snapshot_gate: None,
        }
    }

    /// Serve `snapshot` for `/api/` and accept every command
    pub fn serving(snapshot: &str) -> Self {
        let snapshot = snapshot.to_string();
        Self::new(move |path, _| {
            if path == super::API_PATH {
                Ok(snapshot.clone())
            } else {
                Ok(String::new())
            }
        })
    }

    /// Snapshot requests wait for a permit on `gate` before answering
    pub fn with_snapshot_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.snapshot_gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Requests other than snapshot fetches
    pub fn commands(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|path| path != super::API_PATH)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, _connection: &Connection, path: &str) -> Result<String, TransportError> {
        self.requests.lock().push(path.to_string());
        let nth = {
            let mut seen = self.seen.lock();
            let count = seen.entry(path.to_string()).or_insert(0);
            let nth = *count;
            *count += 1;
            nth
        };

        if path == super::API_PATH {
            if let Some(gate) = &self.snapshot_gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }

        (self.responder)(path, nth)
    }
}

/// Minimal snapshot with inputs 1..=count
pub fn snapshot(count: usize, active: Option<&str>, preview: Option<&str>) -> String {
    let mut xml = String::from("<vmix><inputs>");
    for n in 1..=count {
        xml.push_str(&format!(
            "<input number=\"{n}\" type=\"Capture\" title=\"Camera {n}\" state=\"Running\"/>"
        ));
    }
    xml.push_str("</inputs>");
    if let Some(active) = active {
        xml.push_str(&format!("<active>{}</active>", active));
    }
    if let Some(preview) = preview {
        xml.push_str(&format!("<preview>{}</preview>", preview));
    }
    xml.push_str("</vmix>");
    xml
}
