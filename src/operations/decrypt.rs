// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Envelope decryption for parsed messages.

use rsa::RsaPrivateKey;
use tracing::debug;
use x509_cert::Certificate;

use crate::csr;
use crate::enveloped;
use crate::error::{Result, ScepError};
use crate::types::pkcs7;
use crate::types::{CsrReqMessage, MessageType, Payload, PkiMessage};

impl PkiMessage {
    /// Decrypt the enveloped payload with the recipient's identity.
    ///
    /// For a SUCCESS CertRep this fills in the issued certificate; for a
    /// certificate request it decodes the CSR and its challenge password.
    /// CertReps with any other status carry no envelope and are left as is.
    ///
    /// # Errors
    ///
    /// - `DecryptionFailed` if `cert`/`key` is not a recipient or the ciphertext is corrupt
    /// - `PayloadMalformed` if the plaintext is not the expected structure
    /// - `NotImplemented` for unsupported message types
    pub fn decrypt(&mut self, cert: &Certificate, key: &RsaPrivateKey) -> Result<()> {
        let span = self.config.span.clone();
        let _enter = span.enter();

        if !self.message_type.is_supported() {
            return Err(ScepError::NotImplemented(self.message_type));
        }

        if let Payload::CertRep(rep) = &self.payload {
            if !rep.is_success() {
                debug!(status = %rep.status, "CertRep carries no pkiEnvelope");
                return Ok(());
            }
        }

        let envelope = enveloped::decrypt(&self.content, cert, key)?;

        match self.message_type {
            MessageType::CertRep => {
                let certs = pkcs7::ca_certs(&envelope).map_err(|e| {
                    ScepError::payload_malformed(format!("Invalid certificate collection: {}", e))
                })?;
                let issued = certs.first().cloned().ok_or_else(|| {
                    ScepError::payload_malformed("Certificate collection is empty")
                })?;
                debug!(ca_certs = certs.len(), "Decrypted pkiEnvelope");

                if let Payload::CertRep(rep) = &mut self.payload {
                    rep.set_certificate(issued, envelope);
                }
                Ok(())
            }
            MessageType::PkcsReq | MessageType::RenewalReq | MessageType::UpdateReq => {
                let csr = csr::parse_csr(&envelope)?;
                let challenge_password = csr::challenge_password(&csr)?;
                debug!(
                    has_challenge = !challenge_password.is_empty(),
                    "Decrypted pkiEnvelope"
                );

                self.payload = Payload::CsrReq(CsrReqMessage {
                    raw_decrypted: envelope,
                    csr,
                    challenge_password,
                });
                Ok(())
            }
            other => Err(ScepError::NotImplemented(other)),
        }
    }
}
