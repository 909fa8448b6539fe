//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Newline framing for the Parley wire protocol

use crate::ParleyError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Codec that splits a byte stream into lines and writes reply lines
///
/// Decoding yields the text before each `\n` with a trailing `\r` removed.
/// Empty lines are skipped. Bytes after the last `\n` stay in the buffer
/// until more data arrives; at end of stream they are discarded.
///
/// Encoding writes the given text followed by a single `\n`.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index into the buffer up to which no `\n` has been found
    next_index: usize,
    /// Largest number of bytes a line may occupy before its terminator
    max_length: usize,
}

impl LineCodec {
    /// Create a codec with no practical limit on line length
    pub fn new() -> Self {
        Self::with_max_length(usize::MAX)
    }

    /// Create a codec that rejects lines longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ParleyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ParleyError> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            let Some(newline) = newline else {
                // A trailing `\r` may be the first half of a `\r\n` terminator
                let pending = match src.last() {
                    Some(b'\r') => src.len() - 1,
                    _ => src.len(),
                };
                if pending > self.max_length {
                    return Err(ParleyError::LineTooLong {
                        limit: self.max_length,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            self.next_index = 0;
            let mut line = src.split_to(newline + 1);
            line.truncate(newline);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if line.len() > self.max_length {
                return Err(ParleyError::LineTooLong {
                    limit: self.max_length,
                });
            }

            if line.is_empty() {
                trace!("Skipping empty line");
                continue;
            }

            return String::from_utf8(line.to_vec())
                .map(Some)
                .map_err(|_| ParleyError::InvalidUtf8);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ParleyError> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !src.is_empty() {
                    trace!(bytes = src.len(), "Discarding unterminated line at end of stream");
                    src.advance(src.len());
                }
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl<T> Encoder<T> for LineCodec
where
    T: AsRef<str>,
{
    type Error = ParleyError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), ParleyError> {
        let line = line.as_ref();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
