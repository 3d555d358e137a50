use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ChannelError;
use crate::loader::ReadChunk;

/// Message used when the decoder flags an error without saying why.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Command half of a request envelope.
///
/// Serializes with a `command` tag, so a request looks like
/// `{"command":"read","id":"4","target":"a.laz","count":1000,"start":0,"skip":0}`.
///
/// Every command names its `target` file, so one decoder can serve
/// several open files over the same channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    /// Hand the raw file buffer to the decoder.
    Open { target: String, buffer: Bytes },
    /// Ask for the decoded header.
    GetHeader { target: String },
    /// Ask for the next `count` records.
    Read {
        target: String,
        count: u32,
        start: u32,
        skip: u32,
    },
}

/// Request envelope sent to the external decoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(flatten)]
    pub command: Command,
}

/// What a response carries in `result`: raw record bytes for reads, an
/// arbitrary value (the decoder's own header object) otherwise.
///
/// Deserializing always yields [`Payload::Value`]; the JSON alone cannot
/// say whether `"abc"` or `[1, 2]` is a value or a byte buffer. A read
/// response turns an array of bytes back into a buffer when it is
/// translated, and every other response keeps its value as sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Value(serde_json::Value),
    #[serde(skip_deserializing)]
    Buffer(Bytes),
}

impl Payload {
    /// Record bytes of a read result, if `self` holds any.
    fn to_buffer(&self) -> Option<Bytes> {
        match self {
            Self::Buffer(buffer) => Some(buffer.clone()),
            Self::Value(serde_json::Value::Null) => Some(Bytes::new()),
            Self::Value(serde_json::Value::Array(items)) => items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Bytes::from),
            Self::Value(_) => None,
        }
    }
}

/// Response envelope posted back by the external decoder.
///
/// ```text
/// ┌─────────────┬──────────────────────────────────────────────────────┐
/// │ Field       │ Meaning                                              │
/// ├─────────────┼──────────────────────────────────────────────────────┤
/// │ id          │ id of the request being answered                     │
/// │ error       │ when true the request failed, see `message`          │
/// │ message     │ error text                                           │
/// │ result      │ header value, or record bytes for a read             │
/// │ count       │ records in `result` (read responses only)            │
/// │ hasMoreData │ more records follow (read responses only)            │
/// └─────────────┴──────────────────────────────────────────────────────┘
/// ```
///
/// A response with both `count` and `hasMoreData` is a read result;
/// anything else hands `result` back untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more_data: Option<bool>,
}

impl Response {
    /// A plain result, e.g. an acknowledgement or a header object.
    pub fn result(id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(Payload::Value(value)),
            ..Self::default()
        }
    }

    /// A read result carrying `count` records.
    pub fn chunk(id: impl Into<String>, buffer: Bytes, count: u32, has_more_data: bool) -> Self {
        Self {
            id: id.into(),
            result: Some(Payload::Buffer(buffer)),
            count: Some(count),
            has_more_data: Some(has_more_data),
            ..Self::default()
        }
    }

    /// A failure, optionally with a message.
    pub fn error(id: impl Into<String>, message: Option<String>) -> Self {
        Self {
            id: id.into(),
            error: Some(true),
            message,
            ..Self::default()
        }
    }

    fn into_reply(self) -> Result<Reply, ChannelError> {
        if self.error == Some(true) {
            return Err(ChannelError::Remote {
                message: self.message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            });
        }

        if let (Some(count), Some(has_more_data)) = (self.count, self.has_more_data) {
            let buffer = match self.result {
                None => Bytes::new(),
                Some(payload) => match payload.to_buffer() {
                    Some(buffer) => buffer,
                    None => {
                        return Err(ChannelError::Malformed(format!(
                            "read result is not a byte buffer: {payload:?}"
                        )));
                    }
                },
            };
            return Ok(Reply::Chunk(ReadChunk {
                buffer,
                count,
                has_more_data,
            }));
        }

        Ok(Reply::Result(self.result))
    }
}

/// A translated response.
#[derive(Debug)]
pub(crate) enum Reply {
    Chunk(ReadChunk),
    Result(Option<Payload>),
}

/// State shared between the requesting side and the responder.
struct Shared {
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, oneshot::Sender<Response>>>,
    loaded: AtomicBool,
    /// Closed once every [`Responder`] (the endpoint's included) is gone.
    responders: watch::Sender<()>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Response>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Requesting side of the link to an external decoder.
///
/// Owns the request-id counter and the correlation table: every request
/// gets the next id and a pending entry, and the entry is resolved by the
/// response carrying the same id, whatever order responses come back in.
/// Clones share the counter and table, so one channel can serve several
/// open files without their ids colliding.
///
/// ```text
///   CompressedProxy ──exchange()──▶ Request ──▶ ModuleEndpoint::recv()
///         ▲                                            │
///         │ oneshot (matched by id)                    ▼
///   correlation table ◀── Responder::handle_message(Response)
/// ```
#[derive(Clone)]
pub struct DecoderChannel {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Request>,
}

/// External side of the link: where requests arrive and responses go.
pub struct ModuleEndpoint {
    requests: mpsc::UnboundedReceiver<Request>,
    responder: Responder,
}

/// Posts responses back into a channel's correlation table.
///
/// Pending requests keep waiting while any clone is alive, even after
/// the [`ModuleEndpoint`] itself has been dropped.
#[derive(Clone)]
pub struct Responder {
    shared: Arc<Shared>,
    _alive: watch::Receiver<()>,
}

impl DecoderChannel {
    /// Create a linked channel/endpoint pair. The endpoint must call
    /// [`Responder::module_did_load`] before compressed files can open.
    #[must_use]
    pub fn new() -> (Self, ModuleEndpoint) {
        let (responders, alive) = watch::channel(());
        let shared = Arc::new(Shared {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            loaded: AtomicBool::new(false),
            responders,
        });
        let (outbound, requests) = mpsc::unbounded_channel();

        let channel = Self {
            shared: Arc::clone(&shared),
            outbound,
        };
        let endpoint = ModuleEndpoint {
            requests,
            responder: Responder {
                shared,
                _alive: alive,
            },
        };
        (channel, endpoint)
    }

    /// Whether the external decoder has signalled that it is ready.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.load(Ordering::Acquire)
    }

    /// Number of requests still waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared.pending().len()
    }

    /// Send one command and wait for the response carrying its id.
    pub(crate) async fn exchange(
        &self,
        command: Command,
        timeout: Option<Duration>,
    ) -> Result<Reply, ChannelError> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (tx, rx) = oneshot::channel();
        self.shared.pending().insert(id.clone(), tx);
        let _entry = PendingEntry {
            shared: &self.shared,
            id: &id,
        };

        self.outbound
            .send(Request {
                id: id.clone(),
                command,
            })
            .map_err(|_| ChannelError::Closed)?;

        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait(rx))
                .await
                .map_err(|_| ChannelError::Timeout { id: id.clone() })??,
            None => self.wait(rx).await?,
        };

        response.into_reply()
    }

    async fn wait(&self, mut rx: oneshot::Receiver<Response>) -> Result<Response, ChannelError> {
        tokio::select! {
            biased;
            response = &mut rx => return response.map_err(|_| ChannelError::Closed),
            () = self.shared.responders.closed() => {}
        }
        // No responder is left; the last one may have answered on the way out.
        rx.try_recv().map_err(|_| ChannelError::Closed)
    }
}

/// Removes a correlation entry when its request is abandoned. A request
/// that got its response has already had the entry taken out.
struct PendingEntry<'a> {
    shared: &'a Shared,
    id: &'a str,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if self.shared.pending().remove(self.id).is_some() {
            debug!("abandoned decoder request {}", self.id);
        }
    }
}

impl ModuleEndpoint {
    /// Wait for the next request. Returns `None` once every
    /// [`DecoderChannel`] clone has been dropped.
    pub async fn recv(&mut self) -> Option<Request> {
        self.requests.recv().await
    }

    #[must_use]
    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }
}

impl Responder {
    /// Mark the decoder as initialized.
    pub fn module_did_load(&self) {
        self.shared.loaded.store(true, Ordering::Release);
    }

    /// Route a response to the request with the same id and drop that
    /// request's correlation entry.
    ///
    /// Returns `false` if no request with that id is pending (already
    /// answered, abandoned, or never sent).
    pub fn handle_message(&self, response: Response) -> bool {
        let waiter = self.shared.pending().remove(&response.id);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => {
                warn!("dropping response for unknown request id {:?}", response.id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header_cmd() -> Command {
        Command::GetHeader {
            target: "t".into(),
        }
    }

    #[tokio::test]
    async fn ids_increase_per_channel() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let responder = endpoint.responder();

        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(req) = endpoint.recv().await {
                seen.push(req.id.clone());
                responder.handle_message(Response::result(req.id, json!(null)));
            }
            seen
        });

        for _ in 0..3 {
            channel.exchange(header_cmd(), None).await.unwrap();
        }
        drop(channel);

        assert_eq!(server.await.unwrap(), vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn out_of_order_responses_match_by_id() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let responder = endpoint.responder();

        let server = tokio::spawn(async move {
            let first = endpoint.recv().await.unwrap();
            let second = endpoint.recv().await.unwrap();
            responder.handle_message(Response::result(second.id.clone(), json!("second")));
            responder.handle_message(Response::result(first.id.clone(), json!("first")));
        });

        let (a, b) = tokio::join!(
            channel.exchange(header_cmd(), None),
            channel.exchange(header_cmd(), None),
        );
        server.await.unwrap();

        assert!(matches!(a.unwrap(), Reply::Result(Some(Payload::Value(v))) if v == json!("first")));
        assert!(matches!(b.unwrap(), Reply::Result(Some(Payload::Value(v))) if v == json!("second")));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn error_without_message_uses_default() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let responder = endpoint.responder();
        tokio::spawn(async move {
            let req = endpoint.recv().await.unwrap();
            responder.handle_message(Response::error(req.id, None));
        });

        let err = channel.exchange(header_cmd(), None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Remote { ref message } if message == UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn read_result_becomes_chunk() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let responder = endpoint.responder();
        tokio::spawn(async move {
            let req = endpoint.recv().await.unwrap();
            responder.handle_message(Response::chunk(req.id, Bytes::from_static(b"abcd"), 2, true));
        });

        let reply = channel
            .exchange(
                Command::Read {
                    target: "t".into(),
                    count: 2,
                    start: 0,
                    skip: 0,
                },
                None,
            )
            .await
            .unwrap();
        let Reply::Chunk(chunk) = reply else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.count, 2);
        assert!(chunk.has_more_data);
        assert_eq!(&chunk.buffer[..], b"abcd");
    }

    #[test]
    fn unknown_id_is_ignored() {
        let (_channel, endpoint) = DecoderChannel::new();
        assert!(!endpoint.responder().handle_message(Response::result("99", json!(1))));
    }

    #[tokio::test]
    async fn dropped_endpoint_closes_pending_request() {
        let (channel, mut endpoint) = DecoderChannel::new();
        tokio::spawn(async move {
            let _ = endpoint.recv().await;
            drop(endpoint);
        });

        let err = channel.exchange(header_cmd(), None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn responder_outlives_endpoint() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let server = tokio::spawn(async move {
            let req = endpoint.recv().await.unwrap();
            let responder = endpoint.responder();
            drop(endpoint);
            tokio::time::sleep(Duration::from_millis(10)).await;
            responder.handle_message(Response::result(req.id, json!("late")))
        });

        let reply = channel.exchange(header_cmd(), None).await.unwrap();
        assert!(server.await.unwrap());
        assert!(matches!(reply, Reply::Result(Some(Payload::Value(v))) if v == json!("late")));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn last_responder_dropped_closes_pending_request() {
        let (channel, mut endpoint) = DecoderChannel::new();
        tokio::spawn(async move {
            let _ = endpoint.recv().await;
            let responder = endpoint.responder();
            drop(endpoint);
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(responder);
        });

        let err = channel.exchange(header_cmd(), None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn timeout_removes_correlation_entry() {
        let (channel, _endpoint) = DecoderChannel::new();
        let err = channel
            .exchange(header_cmd(), Some(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::Timeout { ref id } if id == "0"));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[test]
    fn request_envelope_shape() {
        let req = Request {
            id: "7".into(),
            command: Command::Read {
                target: "a.laz".into(),
                count: 10,
                start: 0,
                skip: 0,
            },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": "7", "command": "read", "target": "a.laz", "count": 10, "start": 0, "skip": 0})
        );

        let req = Request {
            id: "8".into(),
            command: Command::GetHeader { target: "a.laz".into() },
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": "8", "command": "getheader", "target": "a.laz"})
        );
    }

    #[test]
    fn json_results_stay_values_unless_read() {
        let resp: Response = serde_json::from_value(json!({"id": "1", "result": "abc"})).unwrap();
        assert_eq!(resp.result, Some(Payload::Value(json!("abc"))));
        let Reply::Result(Some(Payload::Value(v))) = resp.into_reply().unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(v, json!("abc"));

        let resp: Response =
            serde_json::from_value(json!({"id": "2", "result": [1, 2, 3]})).unwrap();
        assert!(matches!(resp.into_reply().unwrap(), Reply::Result(Some(Payload::Value(_)))));
    }

    #[test]
    fn json_read_result_becomes_buffer() {
        let sent = Response::chunk("3", Bytes::from_static(&[7, 8, 9]), 1, false);
        let wire = serde_json::to_string(&sent).unwrap();
        let resp: Response = serde_json::from_str(&wire).unwrap();

        let Reply::Chunk(chunk) = resp.into_reply().unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(&chunk.buffer[..], &[7, 8, 9]);
        assert_eq!(chunk.count, 1);

        let bad: Response = serde_json::from_value(
            json!({"id": "4", "result": "abc", "count": 1, "hasMoreData": false}),
        )
        .unwrap();
        assert!(matches!(bad.into_reply(), Err(ChannelError::Malformed(_))));
    }

    #[test]
    fn response_envelope_shape() {
        let resp: Response =
            serde_json::from_value(json!({"id": "3", "count": 0, "hasMoreData": false})).unwrap();
        assert_eq!(resp.count, Some(0));
        assert_eq!(resp.has_more_data, Some(false));
        assert!(resp.result.is_none());
    }
}
