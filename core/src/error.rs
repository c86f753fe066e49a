/*
 * error.rs
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

//! Client errors. Every failure is terminal for the connection it belongs to.

use std::fmt;
use std::io;

/// Errors from URI validation or from any stage of the connection lifecycle.
///
/// Messages are kept as strings so the error can be cloned into
/// `ConnectionState::Failed` and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiError {
    /// Rejected before any connection was constructed.
    InvalidUri(String),
    /// TLS handshake failed, including a certificate chain rejected by the trust policy.
    Handshake(String),
    /// Name resolution, connect, reset or other socket-level failure.
    Transport(String),
    /// Writing the request line failed, or the request was already sent.
    Send(String),
    /// Reading the response failed.
    Receive(String),
}

impl GeminiError {
    /// Classify an error from the TLS connect future: anything rustls produced is a
    /// handshake failure, the rest is transport.
    pub fn from_handshake(e: io::Error) -> Self {
        match e.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
            Some(tls) => GeminiError::Handshake(tls.to_string()),
            None => GeminiError::Transport(e.to_string()),
        }
    }

    pub fn is_handshake(&self) -> bool {
        matches!(self, GeminiError::Handshake(_))
    }
}

impl fmt::Display for GeminiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiError::InvalidUri(m) => write!(f, "invalid URI: {}", m),
            GeminiError::Handshake(m) => write!(f, "TLS handshake failed: {}", m),
            GeminiError::Transport(m) => write!(f, "transport error: {}", m),
            GeminiError::Send(m) => write!(f, "send failed: {}", m),
            GeminiError::Receive(m) => write!(f, "receive failed: {}", m),
        }
    }
}

impl std::error::Error for GeminiError {}
