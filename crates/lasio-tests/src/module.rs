use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use lasio_loader::{Command, DecoderChannel, ModuleEndpoint, Request, Responder, Response};
use lasio_wire::Header;
use lasio_wire::header::POINT_FORMAT_AT;
use log::debug;
use serde_json::json;
use tokio::task::JoinHandle;

/// How the simulated decoder answers.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Answer each request as it arrives.
    InOrder,
    /// Gather up to `batch` requests (waiting at most `window` for each
    /// after the first), then answer them last-to-first.
    Reversed { batch: usize, window: Duration },
    /// Answer `read` requests with an error carrying this message.
    FailReads(Option<String>),
    /// Read requests but never answer anything.
    Silent,
}

/// Per-target state: the decoder keeps its own cursor.
struct OpenFile {
    buffer: Bytes,
    header: Header,
    cursor: u32,
}

/// Stand-in for the external decoder. It treats the "compressed" buffer
/// as plain records, which is enough to exercise the proxy protocol.
pub struct SimulatedModule {
    endpoint: ModuleEndpoint,
    responder: Responder,
    behavior: Behavior,
    files: HashMap<String, OpenFile>,
}

/// Create a channel whose decoder has finished loading and is served by
/// a [`SimulatedModule`] on a background task.
#[must_use]
pub fn link(behavior: Behavior) -> (DecoderChannel, JoinHandle<()>) {
    let (channel, endpoint) = DecoderChannel::new();
    endpoint.responder().module_did_load();
    (channel, SimulatedModule::new(endpoint, behavior).spawn())
}

impl SimulatedModule {
    #[must_use]
    pub fn new(endpoint: ModuleEndpoint, behavior: Behavior) -> Self {
        let responder = endpoint.responder();
        Self {
            endpoint,
            responder,
            behavior,
            files: HashMap::new(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Serve until every channel clone is dropped.
    pub async fn run(mut self) {
        while let Some(first) = self.endpoint.recv().await {
            match self.behavior.clone() {
                Behavior::Silent => debug!("ignoring request {}", first.id),
                Behavior::Reversed { batch, window } => {
                    let mut batch_reqs = vec![first];
                    while batch_reqs.len() < batch {
                        match tokio::time::timeout(window, self.endpoint.recv()).await {
                            Ok(Some(req)) => batch_reqs.push(req),
                            _ => break,
                        }
                    }
                    let responses: Vec<Response> =
                        batch_reqs.into_iter().map(|r| self.answer(r)).collect();
                    for response in responses.into_iter().rev() {
                        self.responder.handle_message(response);
                    }
                }
                Behavior::InOrder | Behavior::FailReads(_) => {
                    let response = self.answer(first);
                    self.responder.handle_message(response);
                }
            }
        }
    }

    fn answer(&mut self, req: Request) -> Response {
        match req.command {
            Command::Open { target, buffer } => match Header::read_from(&buffer) {
                Ok(header) => {
                    self.files.insert(
                        target,
                        OpenFile {
                            buffer,
                            header,
                            cursor: 0,
                        },
                    );
                    Response::result(req.id, json!(true))
                }
                Err(e) => Response::error(req.id, Some(e.to_string())),
            },
            Command::GetHeader { target } => match self.files.get(&target) {
                Some(file) => Response::result(req.id, module_header(file)),
                None => Response::error(req.id, Some(format!("{target} is not open"))),
            },
            Command::Read { target, count, .. } => {
                if let Behavior::FailReads(message) = &self.behavior {
                    return Response::error(req.id, message.clone());
                }
                let Some(file) = self.files.get_mut(&target) else {
                    return Response::error(req.id, Some(format!("{target} is not open")));
                };
                let h = file.header;
                let count = count.min(h.points_count - file.cursor);
                let size = usize::from(h.points_struct_size);
                let start = h.points_offset as usize + file.cursor as usize * size;
                let buffer = file.buffer.slice(start..start + count as usize * size);
                file.cursor += count;
                Response::chunk(req.id, buffer, count, file.cursor < h.points_count)
            }
        }
    }
}

/// The header in the decoder's own vocabulary. The format id is reported
/// straight from the file, compression bits included.
fn module_header(file: &OpenFile) -> serde_json::Value {
    let h = &file.header;
    json!({
        "maxs": h.maxs,
        "mins": h.mins,
        "offsets": h.offset,
        "scales": h.scale,
        "point_count": h.points_count,
        "point_format_id": file.buffer[POINT_FORMAT_AT],
        "point_record_length": h.points_struct_size,
        "data_offset": h.points_offset,
    })
}
