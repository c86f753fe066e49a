/*
 * request.rs
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

//! The single request line.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::GeminiError;
use crate::uri::GeminiUri;

/// One line of text, sent as UTF-8 followed by CRLF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    line: String,
}

impl Request {
    /// The line must not contain CR or LF; the terminator is added on the wire.
    pub fn new(line: impl Into<String>) -> Result<Self, GeminiError> {
        let line = line.into();
        if line.contains(['\r', '\n']) {
            return Err(GeminiError::Send("request line contains a line break".to_string()));
        }
        Ok(Self { line })
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.line.len() + 2);
        out.put_slice(self.line.as_bytes());
        out.put_slice(b"\r\n");
        out.freeze()
    }
}

impl From<&GeminiUri> for Request {
    fn from(uri: &GeminiUri) -> Self {
        // validated URIs carry no control characters
        Self { line: uri.as_str().to_string() }
    }
}
