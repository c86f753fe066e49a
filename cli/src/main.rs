/*
 * main.rs
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

//! gemlet: fetch one gemini:// URI and print the raw response as it arrives.
//!
//! Exit status: 0 when the response completed or the connection was cancelled,
//! 1 when the connection failed, 2 for bad arguments.

mod sink;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use gemlet_core::config::DEFAULT_CHUNK_SIZE;
use gemlet_core::{ClientOptions, Connection, GeminiError, GeminiUri, Outcome, Request};
use log::{error, info, LevelFilter};

use crate::sink::PrintSink;

const EXIT_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(version, about = "Fetch a gemini:// URI and stream the response to stdout")]
struct Args {
    /// Absolute gemini:// URI (under 1024 bytes).
    uri: String,

    /// Reject certificates that fail standard validation instead of accepting them.
    #[arg(long)]
    secure: bool,

    /// Maximum bytes per read.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Answer an input prompt: replaces the URI's query with this text, percent-encoded.
    #[arg(long)]
    query: Option<String>,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(quiet: bool) {
    let default = if quiet { LevelFilter::Warn } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn resolve_uri(args: &Args) -> Result<GeminiUri, GeminiError> {
    let uri = GeminiUri::parse(&args.uri)?;
    match &args.query {
        Some(input) => uri.with_query(input),
        None => Ok(uri),
    }
}

fn exit_code(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Completed | Outcome::Cancelled => 0,
        Outcome::Failed(_) => EXIT_FAILED,
    }
}

async fn fetch(uri: GeminiUri, options: ClientOptions) -> Outcome {
    let mut conn = match Connection::new(uri.endpoint(), options) {
        Ok(conn) => conn,
        Err(e) => {
            error!("{}", e);
            return Outcome::Failed(e);
        }
    };
    conn.start(PrintSink::new(io::stdout()));
    // no ready barrier: the request waits in the connection until the handshake is done
    conn.send(Request::from(&uri), |result| match result {
        Ok(bytes) => info!("request sent ({} bytes)", bytes.len()),
        Err(e) => error!("{}", e),
    });
    conn.closed().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.quiet);

    let uri = match resolve_uri(&args) {
        Ok(uri) => uri,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let options = ClientOptions::default()
        .allow_insecure(!args.secure)
        .chunk_size(args.chunk_size);
    if options.allow_insecure {
        info!("certificate validation failures will be ignored (use --secure to enforce)");
    }

    info!("fetching {}", uri);
    let outcome = fetch(uri, options).await;
    ExitCode::from(exit_code(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let a = args(&["gemlet", "gemini://example.org/"]);
        assert!(!a.secure);
        assert_eq!(a.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(resolve_uri(&a).is_ok());
    }

    #[test]
    fn wrong_scheme_is_rejected_before_connecting() {
        let a = args(&["gemlet", "not-gemini://example.org/"]);
        assert!(matches!(resolve_uri(&a), Err(GeminiError::InvalidUri(_))));
    }

    #[test]
    fn overlong_uri_is_rejected() {
        let long = format!("gemini://example.org/{}", "a".repeat(1024));
        let a = args(&["gemlet", &long]);
        assert!(resolve_uri(&a).is_err());
    }

    #[test]
    fn query_is_applied() {
        let a = args(&["gemlet", "--query", "two words", "gemini://example.org/search"]);
        assert_eq!(resolve_uri(&a).unwrap().as_str(), "gemini://example.org/search?two%20words");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&Outcome::Completed), 0);
        assert_eq!(exit_code(&Outcome::Cancelled), 0);
        assert_eq!(exit_code(&Outcome::Failed(GeminiError::Receive("reset".into()))), EXIT_FAILED);
    }
}
