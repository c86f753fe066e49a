/*
 * sink.rs
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

//! Print-as-received sink: response bytes go straight to the writer (stdout), state
//! changes and the status line go to the log.

use std::io::Write;

use gemlet_core::{ConnectionHandler, ConnectionState, GeminiError, ResponseHeader};
use log::{error, info, warn};

/// Longest prefix kept while looking for the header line.
const HEADER_SCAN_LIMIT: usize = 1029;

pub struct PrintSink<W> {
    out: W,
    head: Vec<u8>,
    header_logged: bool,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, head: Vec::new(), header_logged: false }
    }

    fn scan_header(&mut self, data: &[u8]) {
        if self.header_logged {
            return;
        }
        let room = HEADER_SCAN_LIMIT.saturating_sub(self.head.len());
        self.head.extend_from_slice(&data[..data.len().min(room)]);
        if let Some(header) = ResponseHeader::from_response(&self.head) {
            info!("status {} ({:?}) {}", header.status, header.category, header.meta);
            self.header_logged = true;
            self.head = Vec::new();
        } else if self.head.len() >= HEADER_SCAN_LIMIT || self.head.windows(2).any(|w| w == b"\r\n") {
            warn!("response does not start with a valid status line");
            self.header_logged = true;
            self.head = Vec::new();
        }
    }
}

impl<W: Write + Send> ConnectionHandler for PrintSink<W> {
    fn state_changed(&mut self, state: &ConnectionState) {
        if let ConnectionState::Failed(e) = state {
            error!("{}", e);
        }
    }

    fn received(&mut self, data: &[u8]) {
        self.scan_header(data);
        if let Err(e) = self.out.write_all(data).and_then(|_| self.out.flush()) {
            error!("cannot write response: {}", e);
        }
    }

    fn end_of_stream(&mut self) {
        info!("response complete");
    }

    fn receive_failed(&mut self, error: &GeminiError) {
        error!("{}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_every_chunk_verbatim() {
        let mut sink = PrintSink::new(Vec::new());
        sink.received(b"20 text/");
        sink.received(b"gemini\r\nHello\r\n");
        sink.end_of_stream();
        assert!(sink.header_logged);
        assert_eq!(sink.out, b"20 text/gemini\r\nHello\r\n");
    }

    #[test]
    fn gives_up_on_garbage_header() {
        let mut sink = PrintSink::new(Vec::new());
        sink.received(b"garbage\r\nmore");
        assert!(sink.header_logged);
        assert!(sink.head.is_empty());
        assert_eq!(sink.out, b"garbage\r\nmore");
    }
}
