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

//! CertRep response construction.
//!
//! Both response kinds copy the request's transactionID and echo its
//! senderNonce as recipientNonce, which is how a client correlates a
//! response with its request.

use tracing::debug;
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

use crate::attributes;
use crate::enveloped;
use crate::error::{Result, ScepError};
use crate::types::pkcs7;
use crate::types::{
    CertRepMessage, FailInfo, MessageType, Payload, PkiMessage, PkiStatus, RecipientNonce,
    SenderNonce, SignerIdentity,
};

impl PkiMessage {
    /// Build a CertRep FAILURE response to this request.
    ///
    /// The response carries no encrypted content. It is signed with the
    /// authority identity `ca`. Returns `PayloadMalformed` if this message is
    /// not a certificate request.
    pub fn fail(&self, ca: &SignerIdentity, info: FailInfo) -> Result<PkiMessage> {
        let _enter = self.config.span.enter();

        self.ensure_request()?;
        let sender_nonce = self.request_nonce()?;
        let recipient_nonce = RecipientNonce::from(&sender_nonce);

        let attrs = vec![
            attributes::transaction_id(&self.transaction_id)?,
            attributes::pki_status(PkiStatus::Failure)?,
            attributes::fail_info(info)?,
            attributes::message_type(MessageType::CertRep)?,
            attributes::sender_nonce(&sender_nonce)?,
            attributes::recipient_nonce(&recipient_nonce)?,
        ];

        let raw = pkcs7::sign(
            &[],
            attrs,
            &ca.certificate,
            &ca.key,
            self.config.signing_digest,
            &[],
        )?;

        debug!(
            transaction_id = %self.transaction_id,
            fail_info = %info,
            "Built CertRep failure"
        );

        Ok(PkiMessage {
            transaction_id: self.transaction_id.clone(),
            message_type: MessageType::CertRep,
            sender_nonce: Some(sender_nonce),
            payload: Payload::CertRep(CertRepMessage::new(
                PkiStatus::Failure,
                recipient_nonce,
                Some(info),
            )),
            raw,
            recipients: Vec::new(),
            signer_certificate: Some(ca.certificate.clone()),
            content: Vec::new(),
            config: self.config.clone(),
        })
    }

    /// Build a CertRep SUCCESS response carrying `issued`.
    ///
    /// Decrypts this request first with `ca` if that has not happened yet.
    /// The issued certificate is encrypted for the certificate that signed
    /// the request, and also embedded in clear as the first certificate of
    /// the response.
    pub fn success(&mut self, ca: &SignerIdentity, issued: &Certificate) -> Result<PkiMessage> {
        let span = self.config.span.clone();
        let _enter = span.enter();

        self.ensure_request()?;
        if self.csr_req().is_none() {
            self.decrypt(&ca.certificate, &ca.key)?;
        }

        let sender_nonce = self.request_nonce()?;
        let recipient_nonce = RecipientNonce::from(&sender_nonce);

        let requester = self
            .signer_certificate
            .clone()
            .ok_or_else(|| ScepError::no_recipients("Request has no signer certificate"))?;

        let degenerate = pkcs7::degenerate_certificates(std::slice::from_ref(issued))?;
        let envelope = enveloped::encrypt(
            &degenerate,
            std::slice::from_ref(&requester),
            self.config.content_encryption,
        )?;

        let attrs: Vec<Attribute> = vec![
            attributes::transaction_id(&self.transaction_id)?,
            attributes::pki_status(PkiStatus::Success)?,
            attributes::message_type(MessageType::CertRep)?,
            attributes::sender_nonce(&sender_nonce)?,
            attributes::recipient_nonce(&recipient_nonce)?,
        ];

        let raw = pkcs7::sign(
            &envelope,
            attrs,
            &ca.certificate,
            &ca.key,
            self.config.signing_digest,
            std::slice::from_ref(issued),
        )?;

        debug!(
            transaction_id = %self.transaction_id,
            "Built CertRep success"
        );

        let mut rep = CertRepMessage::new(PkiStatus::Success, recipient_nonce, None);
        rep.set_certificate(issued.clone(), degenerate);

        Ok(PkiMessage {
            transaction_id: self.transaction_id.clone(),
            message_type: MessageType::CertRep,
            sender_nonce: Some(sender_nonce),
            payload: Payload::CertRep(rep),
            raw,
            recipients: vec![requester],
            signer_certificate: Some(ca.certificate.clone()),
            content: envelope,
            config: self.config.clone(),
        })
    }

    fn ensure_request(&self) -> Result<()> {
        if self.message_type.is_request() {
            Ok(())
        } else {
            Err(ScepError::payload_malformed(format!(
                "{} is not a certificate request",
                self.message_type
            )))
        }
    }

    fn request_nonce(&self) -> Result<SenderNonce> {
        self.sender_nonce
            .clone()
            .ok_or_else(|| ScepError::attribute_missing(attributes::ScepAttribute::SenderNonce.name()))
    }
}
