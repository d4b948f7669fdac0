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

//! Integration tests for inbound message validation
//!
//! Messages here are signed with hand-picked attribute sets to exercise
//! the presence rules of each message type.

use usg_scep::attributes::{self, ScepAttribute};
use usg_scep::{
    ca_certs, degenerate_certificates, MessageType, PkiMessage, PkiStatus, RecipientNonce,
    ScepConfig, ScepError, SenderNonce, TransactionId,
};

use crate::integration::{
    ca, device, device_csr, issue, sign_raw, sign_raw_unsorted, sign_raw_unwrapped,
    sign_raw_without_certificates,
};

fn txid() -> TransactionId {
    TransactionId::new("test-transaction-0001")
}

fn nonce() -> SenderNonce {
    SenderNonce::new(*b"0123456789abcdef")
}

fn parse(raw: &[u8]) -> usg_scep::Result<PkiMessage> {
    PkiMessage::parse(raw, &ScepConfig::default())
}

fn pkcs_req_attributes() -> Vec<x509_cert::attr::Attribute> {
    vec![
        attributes::transaction_id(&txid()).unwrap(),
        attributes::message_type(MessageType::PkcsReq).unwrap(),
        attributes::sender_nonce(&nonce()).unwrap(),
    ]
}

#[test]
fn test_signed_attributes_outside_der_order() {
    let raw = sign_raw_unsorted(device(), pkcs_req_attributes(), b"sealed");

    let msg = parse(&raw).expect("Signature over the received attribute order should verify");
    assert_eq!(msg.message_type(), MessageType::PkcsReq);
    assert_eq!(msg.transaction_id(), &txid());
    assert_eq!(msg.sender_nonce(), Some(&nonce()));
}

#[test]
fn test_trusted_set_without_embedded_certificates() {
    let raw = sign_raw_without_certificates(device(), pkcs_req_attributes(), b"sealed");

    // Nothing embedded to verify against
    let err = parse(&raw).unwrap_err();
    assert!(err.is_signature_invalid(), "got {:?}", err);

    let config = ScepConfig::builder()
        .trust_cert(device().certificate.clone())
        .build();
    let msg = PkiMessage::parse(&raw, &config).expect("Trusted signer should verify");
    assert_eq!(msg.message_type(), MessageType::PkcsReq);
    assert_eq!(msg.signer_certificate(), Some(&device().certificate));
}

#[test]
fn test_content_without_octet_string_wrapping() {
    let raw = sign_raw_unwrapped(device(), pkcs_req_attributes(), b"sealed");

    let msg = parse(&raw).expect("Digest should cover the content octets");
    assert_eq!(msg.message_type(), MessageType::PkcsReq);
}

#[test]
fn test_cert_rep_failure_without_fail_info() {
    let raw = sign_raw(
        ca(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::CertRep).unwrap(),
            attributes::pki_status(PkiStatus::Failure).unwrap(),
            attributes::recipient_nonce(&RecipientNonce::from(&nonce())).unwrap(),
        ],
        &[],
    );

    let err = parse(&raw).unwrap_err();
    assert!(err.is_attribute_missing(), "got {:?}", err);
    assert!(err.to_string().contains("failInfo"), "got {}", err);
}

#[test]
fn test_cert_rep_without_recipient_nonce() {
    let raw = sign_raw(
        ca(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::CertRep).unwrap(),
            attributes::pki_status(PkiStatus::Success).unwrap(),
        ],
        &[],
    );

    let err = parse(&raw).unwrap_err();
    assert!(err.is_attribute_missing(), "got {:?}", err);
}

#[test]
fn test_request_without_sender_nonce() {
    let raw = sign_raw(
        device(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::PkcsReq).unwrap(),
        ],
        b"sealed",
    );

    let err = parse(&raw).unwrap_err();
    assert!(err.is_attribute_missing(), "got {:?}", err);
    assert!(err.to_string().contains("senderNonce"), "got {}", err);
}

#[test]
fn test_missing_transaction_id() {
    let raw = sign_raw(
        device(),
        vec![
            attributes::message_type(MessageType::PkcsReq).unwrap(),
            attributes::sender_nonce(&nonce()).unwrap(),
        ],
        b"sealed",
    );

    let err = parse(&raw).unwrap_err();
    assert!(err.is_attribute_missing(), "got {:?}", err);
}

#[test]
fn test_empty_transaction_id_counts_as_missing() {
    let raw = sign_raw(
        device(),
        vec![
            attributes::encode_text(ScepAttribute::TransactionId, "").unwrap(),
            attributes::message_type(MessageType::PkcsReq).unwrap(),
            attributes::sender_nonce(&nonce()).unwrap(),
        ],
        b"sealed",
    );

    let err = parse(&raw).unwrap_err();
    assert!(err.is_attribute_missing(), "got {:?}", err);
}

#[test]
fn test_unsupported_message_types() {
    for message_type in [MessageType::CertPoll, MessageType::GetCert, MessageType::GetCrl] {
        let raw = sign_raw(
            device(),
            vec![
                attributes::transaction_id(&txid()).unwrap(),
                attributes::message_type(message_type).unwrap(),
                attributes::sender_nonce(&nonce()).unwrap(),
            ],
            b"sealed",
        );

        let err = parse(&raw).unwrap_err();
        assert!(err.is_not_implemented(), "{}: got {:?}", message_type, err);
        assert!(matches!(err, ScepError::NotImplemented(t) if t == message_type));
    }
}

#[test]
fn test_unknown_message_type() {
    let raw = sign_raw(
        device(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::encode_text(ScepAttribute::MessageType, "99").unwrap(),
            attributes::sender_nonce(&nonce()).unwrap(),
        ],
        b"sealed",
    );

    let err = parse(&raw).unwrap_err();
    assert!(matches!(err, ScepError::UnknownMessageType(ref code) if code == "99"), "got {:?}", err);
}

#[test]
fn test_unknown_pki_status() {
    let raw = sign_raw(
        ca(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::CertRep).unwrap(),
            attributes::encode_text(ScepAttribute::PkiStatus, "7").unwrap(),
            attributes::recipient_nonce(&RecipientNonce::from(&nonce())).unwrap(),
        ],
        &[],
    );

    let err = parse(&raw).unwrap_err();
    assert!(matches!(err, ScepError::UnknownStatus(ref code) if code == "7"), "got {:?}", err);
}

#[test]
fn test_malformed_fail_info() {
    let raw = sign_raw(
        ca(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::CertRep).unwrap(),
            attributes::pki_status(PkiStatus::Failure).unwrap(),
            attributes::encode_text(ScepAttribute::FailInfo, "42").unwrap(),
            attributes::recipient_nonce(&RecipientNonce::from(&nonce())).unwrap(),
        ],
        &[],
    );

    let err = parse(&raw).unwrap_err();
    assert!(matches!(err, ScepError::AttributeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_pending_cert_rep() {
    let raw = sign_raw(
        ca(),
        vec![
            attributes::transaction_id(&txid()).unwrap(),
            attributes::message_type(MessageType::CertRep).unwrap(),
            attributes::pki_status(PkiStatus::Pending).unwrap(),
            attributes::recipient_nonce(&RecipientNonce::from(&nonce())).unwrap(),
        ],
        &[],
    );

    let mut msg = parse(&raw).expect("PENDING should parse");
    let rep = msg.cert_rep().expect("Expected CertRep payload");
    assert_eq!(rep.status, PkiStatus::Pending);
    assert_eq!(rep.recipient_nonce, nonce());
    assert!(rep.fail_info.is_none());
    // No sender nonce was sent
    assert!(msg.sender_nonce().is_none());

    // Nothing to decrypt for a non-success status
    msg.decrypt(&device().certificate, &device().key)
        .expect("Decrypting PENDING should be a no-op");
    assert!(msg.cert_rep().unwrap().certificate.is_none());
}

#[test]
fn test_ca_certs_preserves_wire_order() {
    let csr = device_csr(None);
    let issued = issue(&csr);
    let ca_cert = ca().certificate.clone();

    for order in [
        vec![issued.clone(), ca_cert.clone()],
        vec![ca_cert.clone(), issued.clone()],
    ] {
        let degenerate = degenerate_certificates(&order).unwrap();
        assert_eq!(ca_certs(&degenerate).unwrap(), order);
    }
}

#[test]
fn test_ca_certs_rejects_garbage() {
    let err = ca_certs(&[0x30, 0x03, 0x02, 0x01, 0x00]).unwrap_err();
    assert!(matches!(err, ScepError::ContainerMalformed(_)), "got {:?}", err);
}
