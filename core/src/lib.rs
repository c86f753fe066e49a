/*
 * lib.rs
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

//! Gemlet core: a one-shot Gemini client. One TLS session per request, the request is a
//! single CRLF-terminated line, the response streams until the server closes.

pub mod config;
pub mod connection;
pub mod error;
pub mod net;
pub mod receive;
pub mod request;
pub mod response;
pub mod trust;
pub mod uri;

pub use config::ClientOptions;
pub use connection::{Connection, ConnectionHandler, ConnectionState, Outcome};
pub use error::GeminiError;
pub use request::Request;
pub use response::{ResponseBuffer, ResponseHeader, StatusCategory};
pub use uri::{Endpoint, GeminiUri};
