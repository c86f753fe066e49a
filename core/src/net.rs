/*
 * net.rs
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

//! TCP connect and TLS handshake helpers (implicit TLS: handshake immediately on connect).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::RootCertStore;
use tokio_rustls::TlsConnector;

use crate::config::ClientOptions;
use crate::error::GeminiError;
use crate::trust::TrustPolicy;
use crate::uri::Endpoint;

/// TLS session over TCP, owned exclusively by the connection task.
pub type TlsStream = TokioTlsStream<TcpStream>;

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
pub fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// TLS client config whose certificate check is the trust policy built from `options`.
pub fn client_config(options: &ClientOptions) -> Result<Arc<ClientConfig>, GeminiError> {
    let policy = TrustPolicy::new(build_root_store(), options.allow_insecure)?;
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(policy))
        .with_no_client_auth();
    Ok(Arc::new(config))
}

pub fn connector(options: &ClientOptions) -> Result<TlsConnector, GeminiError> {
    Ok(TlsConnector::from(client_config(options)?))
}

/// Resolve the endpoint and connect to the first address that accepts.
/// Every failed address that still has a successor is passed to `on_waiting`; only
/// exhausting all addresses is an error.
pub async fn connect_tcp<F>(endpoint: &Endpoint, on_waiting: F) -> Result<TcpStream, GeminiError>
where
    F: FnMut(String),
{
    let addrs: Vec<SocketAddr> = lookup_host((endpoint.host(), endpoint.port()))
        .await
        .map_err(|e| GeminiError::Transport(format!("cannot resolve {}: {}", endpoint.host(), e)))?
        .collect();
    if addrs.is_empty() {
        return Err(GeminiError::Transport(format!("no addresses for {}", endpoint.host())));
    }
    connect_addrs(&addrs, on_waiting)
        .await
        .map_err(|reason| GeminiError::Transport(format!("cannot connect to {}: {}", endpoint, reason)))
}

/// Try `addrs` in order and return the first stream that connects. A failure with
/// another address still to try goes to `on_waiting`; the last failure is the error.
pub async fn connect_addrs<F>(addrs: &[SocketAddr], mut on_waiting: F) -> io::Result<TcpStream>
where
    F: FnMut(String),
{
    let mut last_error = None;
    for (i, addr) in addrs.iter().enumerate() {
        debug!("connecting to {}", addr);
        match TcpStream::connect(addr).await {
            Ok(tcp) => return Ok(tcp),
            Err(e) => {
                if i + 1 < addrs.len() {
                    on_waiting(format!("{}: {}", addr, e));
                }
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses")))
}

/// TLS handshake over an established TCP stream. The server name comes from the host
/// (DNS name or IP literal); certificate acceptance is up to the connector's trust policy.
pub async fn handshake(connector: &TlsConnector, host: &str, tcp: TcpStream) -> Result<TlsStream, GeminiError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| GeminiError::InvalidUri(format!("invalid host name {:?}", host)))?;
    connector
        .connect(server_name, tcp)
        .await
        .map_err(GeminiError::from_handshake)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_store_never_empty() {
        assert!(!build_root_store().is_empty());
    }

    #[test]
    fn connector_builds_in_both_modes() {
        assert!(connector(&ClientOptions::default()).is_ok());
        assert!(connector(&ClientOptions::default().allow_insecure(false)).is_ok());
    }

    #[tokio::test]
    async fn refused_port_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let endpoint = Endpoint::new("127.0.0.1", port).unwrap();
        let mut waits = Vec::new();
        let err = connect_tcp(&endpoint, |d| waits.push(d)).await.unwrap_err();
        assert!(matches!(err, GeminiError::Transport(_)));
        // single address: nothing to fall back to, so no waiting report
        assert!(waits.is_empty());
    }

    #[tokio::test]
    async fn falls_through_refused_address_with_one_waiting_report() {
        let refused = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let refused_addr = refused.local_addr().unwrap();
        drop(refused);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_addr = listener.local_addr().unwrap();

        let mut waits = Vec::new();
        let tcp = connect_addrs(&[refused_addr, open_addr], |d| waits.push(d)).await.unwrap();
        assert_eq!(tcp.peer_addr().unwrap(), open_addr);
        assert_eq!(waits.len(), 1);
        assert!(waits[0].starts_with(&refused_addr.to_string()));
    }

    #[tokio::test]
    async fn all_addresses_refused_reports_last_error_only() {
        let a = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let b = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addrs = [a.local_addr().unwrap(), b.local_addr().unwrap()];
        drop(a);
        drop(b);
        let mut waits = Vec::new();
        assert!(connect_addrs(&addrs, |d| waits.push(d)).await.is_err());
        // the last address has no successor, so only the first is a waiting report
        assert_eq!(waits.len(), 1);
    }
}
