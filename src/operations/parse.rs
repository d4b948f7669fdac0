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

//! Inbound message parsing and validation.
//!
//! Parsing verifies the outer signature, decodes the mandatory
//! transactionID and messageType attributes, then applies the presence
//! rules of the message type (see [`crate::attributes::rule_for`]). The
//! payload stays encrypted until [`PkiMessage::decrypt`] is called.

use tracing::debug;

use crate::attributes::{
    required_for_status, rule_for, Disposition, ScepAttribute, SignedAttributeSet, MANDATORY,
};
use crate::config::ScepConfig;
use crate::error::{Result, ScepError};
use crate::types::pkcs7;
use crate::types::{CertRepMessage, Payload, PkiMessage, PkiStatus};

impl PkiMessage {
    /// Parse and verify a DER-encoded SCEP message.
    ///
    /// The signature is verified against `config.trusted_certs` when that
    /// set is non-empty, otherwise against the certificates embedded in the
    /// message.
    ///
    /// # Errors
    ///
    /// - `ContainerMalformed` if the bytes are not a SignedData
    /// - `SignatureInvalid` if verification fails
    /// - `AttributeMissing` / `AttributeMalformed` for attribute violations
    /// - `UnknownMessageType` / `UnknownStatus` for undefined codes
    /// - `NotImplemented` for CertPoll, GetCert, and GetCRL
    pub fn parse(data: &[u8], config: &ScepConfig) -> Result<Self> {
        let _enter = config.span.enter();

        let container = pkcs7::parse_signed_data(data)?;
        let signer_certificate = pkcs7::verify(&container, &config.trusted_certs)?;

        let signed_attrs = container
            .first_signer()
            .and_then(|signer| signer.signed_attrs.as_ref())
            .ok_or_else(|| ScepError::signature_invalid("SignerInfo has no signed attributes"))?;
        let attrs = SignedAttributeSet::new(signed_attrs);

        for attr in MANDATORY {
            attrs.require(*attr)?;
        }
        let transaction_id = attrs.transaction_id()?;
        let message_type = attrs.message_type()?;

        debug!(
            message_type = %message_type,
            transaction_id = %transaction_id,
            "Parsed SCEP pkiMessage"
        );

        let rule = rule_for(message_type);
        for attr in rule.required {
            attrs.require(*attr)?;
        }

        let (sender_nonce, payload) = match rule.disposition {
            Disposition::Unsupported => return Err(ScepError::NotImplemented(message_type)),
            Disposition::Request => (Some(attrs.sender_nonce()?), Payload::Sealed),
            Disposition::CertRep => {
                let status = attrs.pki_status()?;
                let recipient_nonce = attrs.recipient_nonce()?;
                for attr in required_for_status(status) {
                    attrs.require(*attr)?;
                }
                let fail_info = match status {
                    PkiStatus::Failure => Some(attrs.fail_info()?),
                    _ => None,
                };
                let sender_nonce = if attrs.has(ScepAttribute::SenderNonce) {
                    Some(attrs.sender_nonce()?)
                } else {
                    None
                };
                (
                    sender_nonce,
                    Payload::CertRep(CertRepMessage::new(status, recipient_nonce, fail_info)),
                )
            }
        };

        Ok(Self {
            transaction_id,
            message_type,
            sender_nonce,
            payload,
            raw: data.to_vec(),
            recipients: Vec::new(),
            signer_certificate: Some(signer_certificate),
            content: container.content,
            config: config.clone(),
        })
    }
}
