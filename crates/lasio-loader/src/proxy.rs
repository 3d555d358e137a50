use bytes::Bytes;
use lasio_wire::Header;
use lasio_wire::format::FORMAT_ID_MASK;
use log::debug;
use serde::Deserialize;

use crate::channel::{Command, DecoderChannel, Payload, Reply};
use crate::config::LoaderConfig;
use crate::error::{ChannelError, LasError};
use crate::loader::{PointLoader, ReadChunk, SKIP_UNSUPPORTED};

/// Header as the external decoder reports it. Field names are the
/// decoder's; [`From`] renames them into a [`Header`].
#[derive(Debug, Deserialize)]
struct ModuleHeader {
    maxs: [f64; 3],
    mins: [f64; 3],
    offsets: [f64; 3],
    scales: [f64; 3],
    point_count: u32,
    point_format_id: u8,
    point_record_length: u16,
    data_offset: u32,
}

impl From<ModuleHeader> for Header {
    fn from(h: ModuleHeader) -> Self {
        Self {
            points_offset: h.data_offset,
            points_format_id: h.point_format_id & FORMAT_ID_MASK,
            points_struct_size: h.point_record_length,
            points_count: h.point_count,
            scale: h.scales,
            offset: h.offsets,
            mins: h.mins,
            maxs: h.maxs,
        }
    }
}

/// Loader for compressed files: every operation becomes a request to the
/// external decoder over a [`DecoderChannel`].
///
/// The decoder owns the read cursor and bounds, so `read_data` forwards
/// `count`/`start` untouched and returns whatever chunk comes back.
pub struct CompressedProxy {
    buffer: Bytes,
    channel: Option<DecoderChannel>,
    config: LoaderConfig,
    header: Option<Header>,
}

impl CompressedProxy {
    #[must_use]
    pub fn new(buffer: Bytes, channel: Option<DecoderChannel>, config: LoaderConfig) -> Self {
        Self {
            buffer,
            channel,
            config,
            header: None,
        }
    }

    fn channel(&self) -> Result<&DecoderChannel, LasError> {
        self.channel
            .as_ref()
            .filter(|c| c.is_loaded())
            .ok_or(LasError::ModuleUnavailable)
    }

    async fn exchange(&self, command: Command) -> Result<Reply, LasError> {
        let reply = self
            .channel()?
            .exchange(command, self.config.request_timeout)
            .await?;
        Ok(reply)
    }
}

impl PointLoader for CompressedProxy {
    async fn open(&mut self) -> Result<(), LasError> {
        self.exchange(Command::Open {
            target: self.config.target.clone(),
            buffer: self.buffer.clone(),
        })
        .await?;
        debug!("decoder opened {}", self.config.target);
        Ok(())
    }

    async fn get_header(&mut self) -> Result<Header, LasError> {
        let command = Command::GetHeader {
            target: self.config.target.clone(),
        };
        let value = match self.exchange(command).await? {
            Reply::Result(Some(Payload::Value(value))) => value,
            other => {
                return Err(ChannelError::Malformed(format!(
                    "expected a header object, got {other:?}"
                ))
                .into());
            }
        };

        let module_header: ModuleHeader = serde_json::from_value(value)
            .map_err(|e| ChannelError::Malformed(format!("header: {e}")))?;
        let header = Header::from(module_header);

        debug!(
            "decoder header: {} points of format {}",
            header.points_count, header.points_format_id
        );
        self.header = Some(header);
        Ok(header)
    }

    async fn read_data(
        &mut self,
        count: u32,
        start: u32,
        skip: u32,
    ) -> Result<ReadChunk, LasError> {
        if skip != 0 {
            return Err(LasError::UnsupportedOperation(SKIP_UNSUPPORTED));
        }
        if self.header.is_none() {
            return Err(LasError::HeaderNotReady);
        }

        let command = Command::Read {
            target: self.config.target.clone(),
            count,
            start,
            skip,
        };
        match self.exchange(command).await? {
            Reply::Chunk(chunk) => Ok(chunk),
            Reply::Result(other) => Err(ChannelError::Malformed(format!(
                "expected a read result, got {other:?}"
            ))
            .into()),
        }
    }

    fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ModuleEndpoint, Response};
    use serde_json::json;

    fn module_header() -> serde_json::Value {
        json!({
            "maxs": [1.0, 2.0, 3.0],
            "mins": [-1.0, -2.0, -3.0],
            "offsets": [10.0, 20.0, 30.0],
            "scales": [0.01, 0.01, 0.01],
            "point_count": 42,
            "point_format_id": 0x83,
            "point_record_length": 34,
            "data_offset": 227,
        })
    }

    /// Answer every request with a canned response.
    fn serve(mut endpoint: ModuleEndpoint) {
        let responder = endpoint.responder();
        responder.module_did_load();
        tokio::spawn(async move {
            while let Some(req) = endpoint.recv().await {
                let response = match req.command {
                    Command::Open { .. } => Response::result(req.id, json!(null)),
                    Command::GetHeader { .. } => Response::result(req.id, module_header()),
                    Command::Read { count, .. } => {
                        Response::chunk(req.id, Bytes::from(vec![0u8; 34 * count as usize]), count, false)
                    }
                };
                responder.handle_message(response);
            }
        });
    }

    #[tokio::test]
    async fn missing_module_is_unavailable() {
        let mut proxy = CompressedProxy::new(Bytes::new(), None, LoaderConfig::default());
        assert!(matches!(proxy.open().await, Err(LasError::ModuleUnavailable)));
    }

    #[tokio::test]
    async fn unloaded_module_is_unavailable() {
        let (channel, _endpoint) = DecoderChannel::new();
        let mut proxy = CompressedProxy::new(Bytes::new(), Some(channel), LoaderConfig::default());
        assert!(matches!(proxy.open().await, Err(LasError::ModuleUnavailable)));
    }

    #[tokio::test]
    async fn header_fields_are_renamed() {
        let (channel, endpoint) = DecoderChannel::new();
        serve(endpoint);
        let mut proxy = CompressedProxy::new(Bytes::new(), Some(channel), LoaderConfig::default());

        proxy.open().await.unwrap();
        let header = proxy.get_header().await.unwrap();
        assert_eq!(
            header,
            Header {
                points_offset: 227,
                points_format_id: 3,
                points_struct_size: 34,
                points_count: 42,
                scale: [0.01, 0.01, 0.01],
                offset: [10.0, 20.0, 30.0],
                mins: [-1.0, -2.0, -3.0],
                maxs: [1.0, 2.0, 3.0],
            }
        );
    }

    #[tokio::test]
    async fn read_is_forwarded_without_clamping() {
        let (channel, endpoint) = DecoderChannel::new();
        serve(endpoint);
        let mut proxy = CompressedProxy::new(Bytes::new(), Some(channel), LoaderConfig::default());

        proxy.open().await.unwrap();
        proxy.get_header().await.unwrap();
        let chunk = proxy.read_data(100, 0, 0).await.unwrap();
        assert_eq!(chunk.count, 100);
        assert_eq!(chunk.buffer.len(), 3_400);
    }

    #[tokio::test]
    async fn skip_is_rejected_before_sending() {
        let (channel, _endpoint) = DecoderChannel::new();
        let mut proxy =
            CompressedProxy::new(Bytes::new(), Some(channel.clone()), LoaderConfig::default());
        assert!(matches!(
            proxy.read_data(10, 0, 2).await,
            Err(LasError::UnsupportedOperation(_))
        ));
        assert_eq!(channel.pending_requests(), 0);
    }

    #[tokio::test]
    async fn malformed_header_is_reported() {
        let (channel, mut endpoint) = DecoderChannel::new();
        let responder = endpoint.responder();
        responder.module_did_load();
        tokio::spawn(async move {
            let req = endpoint.recv().await.unwrap();
            responder.handle_message(Response::result(req.id, json!({"point_count": "many"})));
        });

        let mut proxy = CompressedProxy::new(Bytes::new(), Some(channel), LoaderConfig::default());
        assert!(matches!(
            proxy.get_header().await,
            Err(LasError::Channel(ChannelError::Malformed(_)))
        ));
    }
}
