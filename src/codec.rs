use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    config::MAX_MESSAGE_LEN,
    core::message::Message,
    error::{Error, ProtocolError},
};

/// A codec for the text protocol, one message per connection.
///
/// A message isn't length-prefixed: it is delimited by the end of the stream, so [`decode`]
/// only ever buffers and the message is produced by [`decode_eof`]. Anything longer than the
/// configured maximum is rejected instead of being truncated.
///
/// [`decode`]: Decoder::decode
/// [`decode_eof`]: Decoder::decode_eof
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_len: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_MESSAGE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self { max_len }
    }

    fn check_len(&self, len: usize) -> Result<(), ProtocolError> {
        if len > self.max_len {
            return Err(ProtocolError::MessageTooLarge {
                len,
                max: self.max_len,
            });
        }

        Ok(())
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Wait for the end of the stream.
        self.check_len(src.len())?;
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        self.check_len(src.len())?;
        let bytes = src.split();
        let line = std::str::from_utf8(&bytes).map_err(|_| ProtocolError::NotUtf8)?;

        Ok(Some(line.parse()?))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = message.to_string();
        self.check_len(line.len())?;

        dst.reserve(line.len());
        dst.put_slice(line.as_bytes());

        Ok(())
    }
}
