/*
 * config.rs
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

//! Client options and protocol constants.

/// URI scheme token accepted by the client.
pub const SCHEME: &str = "gemini";

/// Port used when the URI has no explicit port.
pub const DEFAULT_PORT: u16 = 1965;

/// URIs must be strictly shorter than this many bytes.
pub const MAX_URI_LENGTH: usize = 1024;

/// Upper bound on bytes requested by a single read of the response.
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// Options for one connection.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Accept certificate chains that fail standard evaluation (trust-on-first-use style).
    /// This is deliberately insecure and is on by default.
    pub allow_insecure: bool,
    /// Maximum bytes per receive.
    pub chunk_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            allow_insecure: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClientOptions {
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    /// Set the receive chunk size; zero is raised to one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let o = ClientOptions::default();
        assert!(o.allow_insecure);
        assert_eq!(o.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn zero_chunk_size_clamped() {
        let o = ClientOptions::default().chunk_size(0).allow_insecure(false);
        assert_eq!(o.chunk_size, 1);
        assert!(!o.allow_insecure);
    }
}
