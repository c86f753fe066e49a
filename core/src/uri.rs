/*
 * uri.rs
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

//! Gemini URIs and endpoints. A URI is validated once, up front: scheme `gemini`,
//! an authority with a non-empty host and no userinfo, an optional port, and a total
//! length under 1024 bytes. Nothing here touches the network.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::{DEFAULT_PORT, MAX_URI_LENGTH, SCHEME};
use crate::error::GeminiError;

/// Query component: encode everything except RFC 3986 unreserved characters.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Host and port of the peer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Host without IPv6 brackets. Port 0 is rejected.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, GeminiError> {
        let host = host.into();
        if host.is_empty() {
            return Err(GeminiError::InvalidUri("empty host".to_string()));
        }
        if port == 0 {
            return Err(GeminiError::InvalidUri("port must be 1-65535".to_string()));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A validated absolute gemini URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiUri {
    raw: String,
    endpoint: Endpoint,
}

impl GeminiUri {
    pub fn parse(input: &str) -> Result<Self, GeminiError> {
        if input.len() >= MAX_URI_LENGTH {
            return Err(GeminiError::InvalidUri(format!(
                "URI is {} bytes, limit is {}",
                input.len(),
                MAX_URI_LENGTH - 1
            )));
        }
        if let Some(c) = input.chars().find(|c| c.is_control() || c.is_whitespace()) {
            return Err(GeminiError::InvalidUri(format!("illegal character {:?}", c)));
        }
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| GeminiError::InvalidUri("missing scheme or authority".to_string()))?;
        if scheme != SCHEME {
            return Err(GeminiError::InvalidUri(format!("scheme must be {}, got {:?}", SCHEME, scheme)));
        }
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        if authority.contains('@') {
            return Err(GeminiError::InvalidUri("userinfo is not allowed".to_string()));
        }
        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(GeminiError::InvalidUri("missing host".to_string()));
        }
        // IDNs must arrive in punycode
        if !host.is_ascii() {
            return Err(GeminiError::InvalidUri(format!("non-ASCII host {:?}", host)));
        }
        let endpoint = Endpoint::new(host, port)?;
        Ok(Self { raw: input.to_string(), endpoint })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> &str {
        self.endpoint.host()
    }

    pub fn port(&self) -> u16 {
        self.endpoint.port()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Same URI with its query replaced by percent-encoded `input` (any fragment is dropped).
    /// Used to answer a server's input prompt.
    pub fn with_query(&self, input: &str) -> Result<Self, GeminiError> {
        let base_end = self.raw.find(['?', '#']).unwrap_or(self.raw.len());
        let encoded = utf8_percent_encode(input, QUERY).to_string();
        Self::parse(&format!("{}?{}", &self.raw[..base_end], encoded))
    }
}

impl FromStr for GeminiUri {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GeminiUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split `host[:port]` or `[v6]:port`. An empty port means the default.
fn split_host_port(authority: &str) -> Result<(&str, u16), GeminiError> {
    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| GeminiError::InvalidUri("unterminated IPv6 literal".to_string()))?;
        if after.is_empty() {
            (host, None)
        } else {
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| GeminiError::InvalidUri("garbage after IPv6 literal".to_string()))?;
            (host, Some(port))
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    let port = match port {
        None | Some("") => DEFAULT_PORT,
        Some(p) => p
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| GeminiError::InvalidUri(format!("bad port {:?}", p)))?,
    };
    Ok((host, port))
}
