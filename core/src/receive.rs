/*
 * receive.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Gemlet, a minimal Gemini client.
 *
 * Gemlet is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Gemlet is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Gemlet.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Response as a finite sequence of byte chunks, terminated by end-of-stream or an error.
//! There is no length header: the peer closing the connection ends the response.

use std::io;

use bytes::Bytes;
use log::warn;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::GeminiError;

/// Lazy chunk reader. Not restartable: after `None` or an error every call returns `None`
/// without touching the reader again.
pub struct ResponseStream<R> {
    reader: R,
    buf: Vec<u8>,
    finished: bool,
}

impl<R> ResponseStream<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size.max(1)],
            finished: false,
        }
    }

    /// One read of at most `chunk_size` bytes. At most one read is outstanding since this
    /// borrows the stream mutably.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, GeminiError>> {
        if self.finished {
            return None;
        }
        match self.reader.read(&mut self.buf).await {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(n) => Some(Ok(Bytes::copy_from_slice(&self.buf[..n]))),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // peer closed TCP without close_notify; common among Gemini servers
                warn!("peer closed without TLS close_notify");
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(GeminiError::Receive(e.to_string())))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncWriteExt, ReadBuf};

    /// Reader that replays a script of results and counts how often it was polled for data.
    struct ScriptedReader {
        script: VecDeque<io::Result<Vec<u8>>>,
        reads: usize,
    }

    impl ScriptedReader {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self { script: script.into(), reads: 0 }
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads += 1;
            match self.script.pop_front() {
                Some(Ok(data)) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    #[tokio::test]
    async fn rearms_until_eof_then_stops() {
        let reader = ScriptedReader::new(vec![Ok(b"20 text/gemini\r\n".to_vec()), Ok(b"Hello\r\n".to_vec()), Ok(Vec::new())]);
        let mut stream = ResponseStream::new(reader, 1024);
        let mut body = Vec::new();
        while let Some(chunk) = stream.next_chunk().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"20 text/gemini\r\nHello\r\n");
        assert!(stream.is_finished());
        assert!(stream.next_chunk().await.is_none());
        assert_eq!(stream.reader.reads, 3);
    }

    #[tokio::test]
    async fn error_is_terminal() {
        let reader = ScriptedReader::new(vec![
            Ok(b"20 ".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"never read".to_vec()),
        ]);
        let mut stream = ResponseStream::new(reader, 1024);
        assert_eq!(&stream.next_chunk().await.unwrap().unwrap()[..], b"20 ");
        assert!(matches!(stream.next_chunk().await, Some(Err(GeminiError::Receive(_)))));
        assert!(stream.next_chunk().await.is_none());
        assert_eq!(stream.reader.reads, 2);
    }

    #[tokio::test]
    async fn unexpected_eof_ends_stream_quietly() {
        let reader = ScriptedReader::new(vec![
            Ok(b"body".to_vec()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no close_notify")),
        ]);
        let mut stream = ResponseStream::new(reader, 1024);
        assert!(stream.next_chunk().await.unwrap().is_ok());
        assert!(stream.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn chunks_bounded_by_chunk_size() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(b"abcdefghij").await.unwrap();
        drop(client);
        let mut stream = ResponseStream::new(server, 4);
        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next_chunk().await {
            sizes.push(chunk.unwrap().len());
        }
        assert!(sizes.iter().all(|n| *n <= 4));
        assert_eq!(sizes.iter().sum::<usize>(), 10);
    }
}
