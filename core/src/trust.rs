/*
 * trust.rs
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

//! Server certificate trust policy.
//!
//! The chain is first evaluated against the standard root store. When that fails and
//! `allow_insecure` is set, the chain is accepted anyway. This is a trust-on-first-use
//! style override with no pinning: it is NOT secure and exists because most Gemini
//! servers present self-signed certificates. With `allow_insecure` off, a failing chain
//! aborts the handshake.
//!
//! rustls invokes the verifier from inside the handshake, i.e. on the connection task,
//! so it never races with teardown.

use std::sync::Arc;

use log::warn;
use tokio_rustls::rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{DigitallySignedStruct, Error, RootCertStore, SignatureScheme};

use crate::error::GeminiError;

#[derive(Debug)]
pub struct TrustPolicy {
    standard: Arc<WebPkiServerVerifier>,
    allow_insecure: bool,
}

impl TrustPolicy {
    pub fn new(roots: RootCertStore, allow_insecure: bool) -> Result<Self, GeminiError> {
        let standard = WebPkiServerVerifier::builder(Arc::new(roots))
            .build()
            .map_err(|e| GeminiError::Handshake(format!("cannot build certificate verifier: {}", e)))?;
        Ok(Self { standard, allow_insecure })
    }

    pub fn allows_insecure(&self) -> bool {
        self.allow_insecure
    }
}

impl ServerCertVerifier for TrustPolicy {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        match self
            .standard
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Ok(verified) => Ok(verified),
            Err(e) if self.allow_insecure => {
                warn!("accepting untrusted certificate for {:?}: {}", server_name, e);
                Ok(ServerCertVerified::assertion())
            }
            Err(e) => Err(e),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.standard.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.standard.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.standard.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
        roots
    }

    // Not a parseable certificate, so standard evaluation always fails.
    fn bogus_chain() -> CertificateDer<'static> {
        CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x00])
    }

    fn verify(policy: &TrustPolicy) -> Result<ServerCertVerified, Error> {
        let name = ServerName::try_from("example.org").unwrap();
        policy.verify_server_cert(&bogus_chain(), &[], &name, &[], UnixTime::now())
    }

    #[test]
    fn insecure_accepts_failing_chain() {
        let policy = TrustPolicy::new(roots(), true).unwrap();
        assert!(policy.allows_insecure());
        assert!(verify(&policy).is_ok());
    }

    #[test]
    fn secure_rejects_failing_chain() {
        let policy = TrustPolicy::new(roots(), false).unwrap();
        assert!(verify(&policy).is_err());
    }

    #[test]
    fn empty_root_store_is_a_configuration_error() {
        let err = TrustPolicy::new(RootCertStore::empty(), true).unwrap_err();
        assert!(err.is_handshake());
    }
}
