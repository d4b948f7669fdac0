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

//! Integration tests for certificate request construction

use der::Encode;
use usg_scep::{
    new_csr_request, new_transaction_id, Certificate, ContentEncryptionAlgorithm,
    DigestAlgorithm, MessageType, Payload, PkiMessage, RequestTemplate, ScepConfig, ScepError,
};

use crate::integration::{ca, device, device_csr, init_tracing, rogue, CHALLENGE};

fn pkcs_req_template() -> RequestTemplate {
    init_tracing();
    RequestTemplate::new(
        MessageType::PkcsReq,
        vec![ca().certificate.clone()],
        device().clone(),
    )
}

#[test]
fn test_pkcs_req_round_trip() {
    let csr = device_csr(Some(CHALLENGE));
    let config = ScepConfig::default();

    // Client: build the request
    let request = new_csr_request(&csr, &pkcs_req_template(), &config)
        .expect("Request construction failed");
    assert_eq!(request.message_type(), MessageType::PkcsReq);
    assert!(request.is_decrypted());
    assert_eq!(request.recipients(), &[ca().certificate.clone()]);

    // Server: parse, still sealed
    let mut parsed = PkiMessage::parse(request.raw(), &config).expect("Parse failed");
    assert_eq!(parsed.message_type(), MessageType::PkcsReq);
    assert_eq!(parsed.transaction_id(), request.transaction_id());
    assert_eq!(parsed.sender_nonce(), request.sender_nonce());
    assert!(matches!(parsed.payload(), Payload::Sealed));
    assert_eq!(
        parsed.signer_certificate(),
        Some(&device().certificate),
        "Signer should be the device's self-signed certificate"
    );

    // Server: decrypt with the CA identity
    parsed
        .decrypt(&ca().certificate, &ca().key)
        .expect("Decryption failed");
    let csr_req = parsed.csr_req().expect("Expected a decrypted CSR");
    assert_eq!(csr_req.raw_decrypted, csr.to_der().unwrap());
    assert_eq!(csr_req.challenge_password, CHALLENGE);
    assert_eq!(csr_req.csr.info.subject, csr.info.subject);
}

#[test]
fn test_request_without_challenge_password() {
    let csr = device_csr(None);
    let config = ScepConfig::default();

    let request = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();
    let mut parsed = PkiMessage::parse(request.raw(), &config).unwrap();
    parsed.decrypt(&ca().certificate, &ca().key).unwrap();

    assert_eq!(parsed.csr_req().unwrap().challenge_password, "");
}

#[test]
fn test_renewal_and_update_requests() {
    let csr = device_csr(None);
    let config = ScepConfig::default();

    for message_type in [MessageType::RenewalReq, MessageType::UpdateReq] {
        let template = RequestTemplate::new(
            message_type,
            vec![ca().certificate.clone()],
            device().clone(),
        );
        let request = new_csr_request(&csr, &template, &config).unwrap();

        let mut parsed = PkiMessage::parse(request.raw(), &config).unwrap();
        assert_eq!(parsed.message_type(), message_type);

        parsed.decrypt(&ca().certificate, &ca().key).unwrap();
        assert!(parsed.csr_req().is_some());
    }
}

#[test]
fn test_transaction_id_is_deterministic() {
    let csr = device_csr(Some(CHALLENGE));
    let config = ScepConfig::default();

    let first = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();
    let second = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();

    // Same key, same transaction
    assert_eq!(first.transaction_id(), second.transaction_id());
    assert_eq!(
        first.transaction_id(),
        &new_transaction_id(&csr.info.public_key)
    );
    // base64 of a 20-byte SHA-1
    assert_eq!(first.transaction_id().as_str().len(), 28);
}

#[test]
fn test_sender_nonce_is_fresh() {
    let csr = device_csr(None);
    let config = ScepConfig::default();

    let first = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();
    let second = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();

    let first_nonce = first.sender_nonce().unwrap();
    let second_nonce = second.sender_nonce().unwrap();
    assert_eq!(first_nonce.len(), 16);
    assert_eq!(second_nonce.len(), 16);
    assert_ne!(first_nonce, second_nonce);
}

#[test]
fn test_request_rejects_cert_rep_template() {
    let template = RequestTemplate::new(
        MessageType::CertRep,
        vec![ca().certificate.clone()],
        device().clone(),
    );
    let err = new_csr_request(&device_csr(None), &template, &ScepConfig::default()).unwrap_err();
    assert!(matches!(err, ScepError::AttributeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_request_without_recipients() {
    let template = RequestTemplate::new(MessageType::PkcsReq, Vec::new(), device().clone());
    let err = new_csr_request(&device_csr(None), &template, &ScepConfig::default()).unwrap_err();
    assert!(matches!(err, ScepError::NoRecipients(_)), "got {:?}", err);
}

#[test]
fn test_selector_rejecting_every_recipient() {
    let config = ScepConfig::builder()
        .recipient_selector(|_: &[Certificate]| -> Vec<Certificate> { Vec::new() })
        .build();

    let err = new_csr_request(&device_csr(None), &pkcs_req_template(), &config).unwrap_err();
    assert!(matches!(err, ScepError::NoRecipients(_)), "got {:?}", err);
}

#[test]
fn test_legacy_algorithms_round_trip() {
    let csr = device_csr(Some(CHALLENGE));

    for encryption in [
        ContentEncryptionAlgorithm::DesCbc,
        ContentEncryptionAlgorithm::TripleDesCbc,
        ContentEncryptionAlgorithm::Aes256Cbc,
    ] {
        let config = ScepConfig::builder()
            .content_encryption(encryption)
            .signing_digest(DigestAlgorithm::Sha1)
            .build();

        let request = new_csr_request(&csr, &pkcs_req_template(), &config).unwrap();
        let mut parsed = PkiMessage::parse(request.raw(), &ScepConfig::default())
            .unwrap_or_else(|e| panic!("{} parse failed: {}", encryption.as_str(), e));
        parsed
            .decrypt(&ca().certificate, &ca().key)
            .unwrap_or_else(|e| panic!("{} decrypt failed: {}", encryption.as_str(), e));

        assert_eq!(parsed.csr_req().unwrap().challenge_password, CHALLENGE);
    }
}

#[test]
fn test_decrypt_by_non_recipient_fails() {
    let config = ScepConfig::default();
    let request = new_csr_request(&device_csr(None), &pkcs_req_template(), &config).unwrap();

    let mut parsed = PkiMessage::parse(request.raw(), &config).unwrap();
    let err = parsed
        .decrypt(&rogue().certificate, &rogue().key)
        .unwrap_err();
    assert!(matches!(err, ScepError::DecryptionFailed(_)), "got {:?}", err);
    assert!(!parsed.is_decrypted());
}

#[test]
fn test_server_trusting_other_signer_rejects_request() {
    let request = new_csr_request(
        &device_csr(None),
        &pkcs_req_template(),
        &ScepConfig::default(),
    )
    .unwrap();

    // Trusted set replaces the embedded certificates entirely
    let config = ScepConfig::builder()
        .trust_cert(rogue().certificate.clone())
        .build();
    let err = PkiMessage::parse(request.raw(), &config).unwrap_err();
    assert!(err.is_signature_invalid(), "got {:?}", err);

    let config = ScepConfig::builder()
        .trust_cert(device().certificate.clone())
        .build();
    assert!(PkiMessage::parse(request.raw(), &config).is_ok());
}

#[test]
fn test_tampered_request_is_rejected() {
    let request = new_csr_request(
        &device_csr(None),
        &pkcs_req_template(),
        &ScepConfig::default(),
    )
    .unwrap();

    // The last octet belongs to the SignerInfo signature
    let mut raw = request.into_raw();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;

    let err = PkiMessage::parse(&raw, &ScepConfig::default()).unwrap_err();
    assert!(err.is_signature_invalid(), "got {:?}", err);
}
