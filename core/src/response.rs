/*
 * response.rs
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

//! Response helpers: the status line for diagnostics and an accumulating handler.
//! The body itself is opaque bytes; nothing here interprets it.

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

use crate::connection::{ConnectionHandler, ConnectionState};
use crate::error::GeminiError;

/// First digit of the two-digit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificateRequired,
}

impl StatusCategory {
    fn from_code(code: u8) -> Option<Self> {
        match code / 10 {
            1 => Some(StatusCategory::Input),
            2 => Some(StatusCategory::Success),
            3 => Some(StatusCategory::Redirect),
            4 => Some(StatusCategory::TemporaryFailure),
            5 => Some(StatusCategory::PermanentFailure),
            6 => Some(StatusCategory::ClientCertificateRequired),
            _ => None,
        }
    }
}

/// `<status> <meta>` from the first response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: u8,
    pub category: StatusCategory,
    pub meta: String,
}

impl ResponseHeader {
    /// Parse one header line (without its terminator).
    pub fn parse_line(line: &str) -> Option<Self> {
        let digits = line.get(..2)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let status: u8 = digits.parse().ok()?;
        let category = StatusCategory::from_code(status)?;
        let meta = match &line[2..] {
            "" => "",
            rest => rest.strip_prefix(' ')?,
        };
        Some(Self { status, category, meta: meta.to_string() })
    }

    /// Parse the header from the start of a response, once its CRLF has arrived.
    pub fn from_response(data: &[u8]) -> Option<Self> {
        let end = data.windows(2).position(|w| w == b"\r\n")?;
        let line = std::str::from_utf8(&data[..end]).ok()?;
        Self::parse_line(line)
    }
}

#[derive(Default)]
struct Recorded {
    body: BytesMut,
    states: Vec<ConnectionState>,
    chunks: usize,
    finished: bool,
    error: Option<GeminiError>,
}

/// Handler that keeps every chunk in order. Clone it before passing it to
/// `Connection::start` and read the clone afterwards.
#[derive(Clone, Default)]
pub struct ResponseBuffer {
    inner: Arc<Mutex<Recorded>>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Everything received so far.
    pub fn bytes(&self) -> Bytes {
        self.with(|r| Bytes::copy_from_slice(&r.body))
    }

    pub fn header(&self) -> Option<ResponseHeader> {
        self.with(|r| ResponseHeader::from_response(&r.body))
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.with(|r| r.states.clone())
    }

    pub fn chunk_count(&self) -> usize {
        self.with(|r| r.chunks)
    }

    /// True once the peer closed the stream.
    pub fn is_finished(&self) -> bool {
        self.with(|r| r.finished)
    }

    pub fn error(&self) -> Option<GeminiError> {
        self.with(|r| r.error.clone())
    }
}

impl ConnectionHandler for ResponseBuffer {
    fn state_changed(&mut self, state: &ConnectionState) {
        self.with(|r| r.states.push(state.clone()));
    }

    fn received(&mut self, data: &[u8]) {
        self.with(|r| {
            r.body.extend_from_slice(data);
            r.chunks += 1;
        });
    }

    fn end_of_stream(&mut self) {
        self.with(|r| r.finished = true);
    }

    fn receive_failed(&mut self, error: &GeminiError) {
        self.with(|r| r.error = Some(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_header() {
        let h = ResponseHeader::from_response(b"20 text/gemini\r\nHello\r\n").unwrap();
        assert_eq!(h.status, 20);
        assert_eq!(h.category, StatusCategory::Success);
        assert_eq!(h.meta, "text/gemini");
    }

    #[test]
    fn categories() {
        assert_eq!(ResponseHeader::parse_line("10 Enter query").unwrap().category, StatusCategory::Input);
        assert_eq!(ResponseHeader::parse_line("31 gemini://x/").unwrap().category, StatusCategory::Redirect);
        assert_eq!(ResponseHeader::parse_line("44 5").unwrap().category, StatusCategory::TemporaryFailure);
        assert_eq!(ResponseHeader::parse_line("51 Not found").unwrap().category, StatusCategory::PermanentFailure);
        assert_eq!(
            ResponseHeader::parse_line("60 cert please").unwrap().category,
            StatusCategory::ClientCertificateRequired
        );
    }

    #[test]
    fn empty_meta_allowed() {
        let h = ResponseHeader::parse_line("20").unwrap();
        assert_eq!(h.meta, "");
    }

    #[test]
    fn malformed_headers() {
        assert!(ResponseHeader::parse_line("2").is_none());
        assert!(ResponseHeader::parse_line("x0 meta").is_none());
        assert!(ResponseHeader::parse_line("70 unknown").is_none());
        assert!(ResponseHeader::parse_line("20text/gemini").is_none());
        assert!(ResponseHeader::from_response(b"20 text/gemini").is_none());
    }

    #[test]
    fn buffer_accumulates_in_order() {
        let buffer = ResponseBuffer::new();
        let mut handler = buffer.clone();
        handler.state_changed(&ConnectionState::Ready);
        handler.received(b"20 text/gemini\r\n");
        handler.received(b"Hello\r\n");
        handler.end_of_stream();
        assert_eq!(&buffer.bytes()[..], b"20 text/gemini\r\nHello\r\n");
        assert_eq!(buffer.chunk_count(), 2);
        assert!(buffer.is_finished());
        assert_eq!(buffer.states(), vec![ConnectionState::Ready]);
        assert_eq!(buffer.header().unwrap().status, 20);
    }
}
