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

//! Outbound certificate request construction (PKCSReq, RenewalReq, UpdateReq).

use const_oid::ObjectIdentifier;
use der::{Encode, Tag, Tagged};
use tracing::debug;
use x509_cert::name::Name;
use x509_cert::request::CertReq;

use crate::attributes;
use crate::config::ScepConfig;
use crate::csr;
use crate::enveloped;
use crate::error::{Result, ScepError};
use crate::nonce::{new_nonce, new_transaction_id};
use crate::types::pkcs7;
use crate::types::{CsrReqMessage, Payload, PkiMessage, RequestTemplate};

const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Build a signed and encrypted certificate request.
///
/// The CSR is encrypted for the recipients chosen by
/// `config.recipient_selector` from `template.recipients`, and signed with
/// `template.signer`. The transaction ID is derived from the CSR's public
/// key, so resubmitting the same key yields the same ID.
///
/// # Errors
///
/// - `NoRecipients` if the template has no recipients or the selector
///   rejects all of them
/// - `RandomnessUnavailable` if no sender nonce can be generated
/// - `AttributeMalformed` if the template's message type is not a request
pub fn new_csr_request(
    csr: &CertReq,
    template: &RequestTemplate,
    config: &ScepConfig,
) -> Result<PkiMessage> {
    let _enter = config.span.enter();

    if !template.message_type.is_request() {
        return Err(ScepError::attribute_malformed(format!(
            "messageType {} is not a certificate request",
            template.message_type
        )));
    }

    if template.recipients.is_empty() {
        return Err(ScepError::no_recipients("No candidate recipients supplied"));
    }
    let recipients = config.recipient_selector.select_certs(&template.recipients);
    if recipients.is_empty() {
        return Err(ScepError::no_recipients(format!(
            "Selector rejected all {} candidate recipients",
            template.recipients.len()
        )));
    }

    let csr_der = csr.to_der()?;
    let envelope = enveloped::encrypt(&csr_der, &recipients, config.content_encryption)?;

    let sender_nonce = new_nonce()?;
    let transaction_id = new_transaction_id(&csr.info.public_key);

    let attrs = vec![
        attributes::transaction_id(&transaction_id)?,
        attributes::message_type(template.message_type)?,
        attributes::sender_nonce(&sender_nonce)?,
    ];

    let signer = &template.signer;
    let raw = pkcs7::sign(
        &envelope,
        attrs,
        &signer.certificate,
        &signer.key,
        config.signing_digest,
        &[],
    )?;

    debug!(
        transaction_id = %transaction_id,
        signer_cn = %common_name(&signer.certificate.tbs_certificate.subject),
        "Built SCEP request"
    );

    let challenge_password = csr::challenge_password(csr)?;

    Ok(PkiMessage {
        transaction_id,
        message_type: template.message_type,
        sender_nonce: Some(sender_nonce),
        payload: Payload::CsrReq(CsrReqMessage {
            raw_decrypted: csr_der,
            csr: csr.clone(),
            challenge_password,
        }),
        raw,
        recipients,
        signer_certificate: Some(signer.certificate.clone()),
        content: envelope,
        config: config.clone(),
    })
}

/// First common name of a distinguished name, or empty.
fn common_name(name: &Name) -> String {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == OID_COMMON_NAME)
        .and_then(|atv| match atv.value.tag() {
            Tag::PrintableString | Tag::Utf8String | Tag::Ia5String | Tag::TeletexString => {
                std::str::from_utf8(atv.value.value()).ok().map(str::to_owned)
            }
            _ => None,
        })
        .unwrap_or_default()
}
