use bytes::Bytes;
use pushline_types::MAX_REQUEST_SIZE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{StreamLocation, TransferLocation};

/// Encodes request bodies and decodes service responses.
pub struct PushCodec;

impl PushCodec {
    /// Encode a JSON body, enforcing the request size ceiling.
    pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Bytes> {
        let payload =
            serde_json::to_vec(value).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Self::check_size(payload.len())?;
        trace!(bytes = payload.len(), "json body encoded");
        Ok(Bytes::from(payload))
    }

    /// Reject a payload above the hard request ceiling.
    pub fn check_size(size: usize) -> ProtocolResult<()> {
        if size > MAX_REQUEST_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size,
                max: MAX_REQUEST_SIZE,
            });
        }
        Ok(())
    }

    pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
        serde_json::from_slice(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    /// Decode the answer of a location request.
    pub fn decode_location(data: &[u8]) -> ProtocolResult<TransferLocation> {
        let location: TransferLocation = Self::decode_json(data)?;
        if location.upload_uri.is_empty() {
            return Err(ProtocolError::MissingField("uploadUri"));
        }
        if location.file_id.is_empty() {
            return Err(ProtocolError::MissingField("fileId"));
        }
        debug!(file_id = %location.file_id, "transfer location decoded");
        Ok(location)
    }

    /// Decode the answer of a stream-open request.
    pub fn decode_stream_location(data: &[u8]) -> ProtocolResult<StreamLocation> {
        let location: StreamLocation = Self::decode_json(data)?;
        if location.upload_uri.is_empty() {
            return Err(ProtocolError::MissingField("uploadUri"));
        }
        if location.stream_id.is_empty() {
            return Err(ProtocolError::MissingField("streamId"));
        }
        debug!(stream_id = %location.stream_id, "stream location decoded");
        Ok(location)
    }
}
