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

//! The SCEP PKI message and its payloads.

use std::fmt;

use rsa::RsaPrivateKey;
use x509_cert::request::CertReq;
use x509_cert::Certificate;

use crate::config::ScepConfig;
use crate::types::{FailInfo, MessageType, PkiStatus, RecipientNonce, SenderNonce, TransactionId};

/// Certificate and private key used to sign (and decrypt) messages.
#[derive(Clone)]
pub struct SignerIdentity {
    /// The signer's certificate. Embedded in every message it signs.
    pub certificate: Certificate,

    /// The signer's RSA private key.
    pub key: RsaPrivateKey,
}

impl SignerIdentity {
    /// Create a new signer identity.
    pub fn new(certificate: Certificate, key: RsaPrivateKey) -> Self {
        Self { certificate, key }
    }
}

impl fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerIdentity")
            .field("subject", &self.certificate.tbs_certificate.subject.to_string())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Template for an outbound certificate request.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    /// PKCSReq, RenewalReq, or UpdateReq.
    pub message_type: MessageType,

    /// Candidate CA/RA certificates to encrypt the request for.
    ///
    /// The configured [`CertsSelector`](crate::selector::CertsSelector)
    /// chooses among these.
    pub recipients: Vec<Certificate>,

    /// The requester's own signing identity.
    pub signer: SignerIdentity,
}

impl RequestTemplate {
    /// Create a new request template.
    pub fn new(
        message_type: MessageType,
        recipients: Vec<Certificate>,
        signer: SignerIdentity,
    ) -> Self {
        Self {
            message_type,
            recipients,
            signer,
        }
    }
}

/// Payload of a CertRep message.
#[derive(Debug, Clone)]
pub struct CertRepMessage {
    /// Transaction status.
    pub status: PkiStatus,

    /// Echo of the request's sender nonce.
    pub recipient_nonce: RecipientNonce,

    /// Failure reason; present only when `status` is FAILURE.
    pub fail_info: Option<FailInfo>,

    /// The issued certificate, once a SUCCESS response has been decrypted.
    pub certificate: Option<Certificate>,

    degenerate: Vec<u8>,
}

impl CertRepMessage {
    pub(crate) fn new(
        status: PkiStatus,
        recipient_nonce: RecipientNonce,
        fail_info: Option<FailInfo>,
    ) -> Self {
        Self {
            status,
            recipient_nonce,
            fail_info,
            certificate: None,
            degenerate: Vec::new(),
        }
    }

    pub(crate) fn set_certificate(&mut self, certificate: Certificate, degenerate: Vec<u8>) {
        self.certificate = Some(certificate);
        self.degenerate = degenerate;
    }

    /// The degenerate SignedData carrying the certificate chain.
    ///
    /// Empty until the envelope has been decrypted or built.
    pub fn degenerate(&self) -> &[u8] {
        &self.degenerate
    }

    /// Returns true if this response reports SUCCESS.
    pub fn is_success(&self) -> bool {
        self.status == PkiStatus::Success
    }
}

/// Payload of a PKCSReq, RenewalReq, or UpdateReq message.
#[derive(Clone)]
pub struct CsrReqMessage {
    /// DER certificate request recovered from the envelope.
    pub raw_decrypted: Vec<u8>,

    /// The decoded certificate request.
    pub csr: CertReq,

    /// challengePassword attribute of the request; empty when absent.
    pub challenge_password: String,
}

impl fmt::Debug for CsrReqMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrReqMessage")
            .field("raw_decrypted", &format_args!("{} bytes", self.raw_decrypted.len()))
            .field("subject", &self.csr.info.subject.to_string())
            .field("challenge_password", &"<redacted>")
            .finish()
    }
}

/// Message payload, selected by message type.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Request content not yet decrypted.
    Sealed,

    /// A CertRep. The issued certificate is filled in by decryption.
    CertRep(CertRepMessage),

    /// A decrypted certificate request.
    CsrReq(CsrReqMessage),
}

/// One SCEP PKI message.
///
/// Obtained by parsing inbound bytes ([`PkiMessage::parse`]) or from a
/// builder ([`new_csr_request`](crate::new_csr_request),
/// [`PkiMessage::success`], [`PkiMessage::fail`]).
#[derive(Clone)]
pub struct PkiMessage {
    pub(crate) transaction_id: TransactionId,
    pub(crate) message_type: MessageType,
    pub(crate) sender_nonce: Option<SenderNonce>,
    pub(crate) payload: Payload,
    pub(crate) raw: Vec<u8>,
    pub(crate) recipients: Vec<Certificate>,
    pub(crate) signer_certificate: Option<Certificate>,
    /// Encapsulated content of the SignedData: the envelope, or empty.
    pub(crate) content: Vec<u8>,
    pub(crate) config: ScepConfig,
}

impl PkiMessage {
    /// The transaction identifier.
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// The message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The sender nonce, if the message carries one.
    pub fn sender_nonce(&self) -> Option<&SenderNonce> {
        self.sender_nonce.as_ref()
    }

    /// The message payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The CertRep payload, if this is a CertRep.
    pub fn cert_rep(&self) -> Option<&CertRepMessage> {
        match &self.payload {
            Payload::CertRep(rep) => Some(rep),
            _ => None,
        }
    }

    /// The decrypted request payload, if any.
    pub fn csr_req(&self) -> Option<&CsrReqMessage> {
        match &self.payload {
            Payload::CsrReq(req) => Some(req),
            _ => None,
        }
    }

    /// Returns true once the request payload has been decrypted.
    pub fn is_decrypted(&self) -> bool {
        match &self.payload {
            Payload::Sealed => false,
            Payload::CertRep(rep) => rep.certificate.is_some(),
            Payload::CsrReq(_) => true,
        }
    }

    /// The encoded SignedData.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Consume the message, returning the encoded SignedData.
    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// Certificates the payload is (or was) encrypted for.
    pub fn recipients(&self) -> &[Certificate] {
        &self.recipients
    }

    /// The certificate that signed this message.
    ///
    /// For parsed messages this is the certificate that verified the
    /// signature.
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer_certificate.as_ref()
    }

    /// The configuration this message was parsed or built with.
    pub fn config(&self) -> &ScepConfig {
        &self.config
    }
}

impl fmt::Debug for PkiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkiMessage")
            .field("transaction_id", &self.transaction_id)
            .field("message_type", &self.message_type)
            .field("sender_nonce", &self.sender_nonce.is_some())
            .field("payload", &self.payload)
            .field("raw", &format_args!("{} bytes", self.raw.len()))
            .field("recipients", &self.recipients.len())
            .finish()
    }
}
