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

//! Integration tests for CertRep construction and the full enrollment exchange

use usg_scep::{
    ca_certs, new_csr_request, ContentEncryptionAlgorithm, FailInfo, MessageType, PkiMessage,
    PkiStatus, RequestTemplate, ScepConfig, ScepError,
};

use crate::integration::{ca, device, device_csr, init_tracing, issue, rogue, CHALLENGE};

/// Client builds a PKCSReq; returns it with the server's parsed copy.
fn exchange(server_config: &ScepConfig) -> (PkiMessage, PkiMessage) {
    init_tracing();
    let template = RequestTemplate::new(
        MessageType::PkcsReq,
        vec![ca().certificate.clone()],
        device().clone(),
    );
    let request = new_csr_request(
        &device_csr(Some(CHALLENGE)),
        &template,
        &ScepConfig::default(),
    )
    .expect("Request construction failed");
    let parsed = PkiMessage::parse(request.raw(), server_config).expect("Server parse failed");
    (request, parsed)
}

#[test]
fn test_enrollment_success() {
    let (request, mut server_side) = exchange(&ScepConfig::default());

    // Server: decrypt, check the challenge, issue
    server_side
        .decrypt(&ca().certificate, &ca().key)
        .expect("Server decrypt failed");
    let csr_req = server_side.csr_req().unwrap();
    assert_eq!(csr_req.challenge_password, CHALLENGE);
    let issued = issue(&csr_req.csr);

    let response = server_side
        .success(ca(), &issued)
        .expect("Building success response failed");
    assert_eq!(response.message_type(), MessageType::CertRep);
    assert_eq!(response.recipients(), &[device().certificate.clone()]);

    // Client: parse and correlate
    let mut reply = PkiMessage::parse(response.raw(), &ScepConfig::default())
        .expect("Client parse failed");
    assert_eq!(reply.message_type(), MessageType::CertRep);
    assert_eq!(reply.transaction_id(), request.transaction_id());
    assert_eq!(reply.signer_certificate(), Some(&ca().certificate));

    let rep = reply.cert_rep().unwrap();
    assert_eq!(rep.status, PkiStatus::Success);
    assert_eq!(&rep.recipient_nonce, request.sender_nonce().unwrap());
    assert!(rep.fail_info.is_none());
    assert!(!reply.is_decrypted());

    // Client: decrypt the issued certificate
    reply
        .decrypt(&device().certificate, &device().key)
        .expect("Client decrypt failed");
    let rep = reply.cert_rep().unwrap();
    assert_eq!(rep.certificate.as_ref(), Some(&issued));
    assert_eq!(ca_certs(rep.degenerate()).unwrap(), vec![issued.clone()]);
    assert!(reply.is_decrypted());
}

#[test]
fn test_success_embeds_issued_certificate_first() {
    let (_, mut server_side) = exchange(&ScepConfig::default());
    let issued = issue(&device_csr(None));

    let response = server_side.success(ca(), &issued).unwrap();

    let embedded = ca_certs(response.raw()).unwrap();
    assert_eq!(embedded, vec![issued, ca().certificate.clone()]);
}

#[test]
fn test_success_decrypts_request_on_demand() {
    let (_, mut server_side) = exchange(&ScepConfig::default());
    assert!(!server_side.is_decrypted());

    let issued = issue(&device_csr(None));
    server_side
        .success(ca(), &issued)
        .expect("success() should decrypt the request itself");
    assert!(server_side.is_decrypted());
}

#[test]
fn test_success_with_wrong_authority_fails() {
    let (_, mut server_side) = exchange(&ScepConfig::default());
    let issued = issue(&device_csr(None));

    let err = server_side.success(rogue(), &issued).unwrap_err();
    assert!(matches!(err, ScepError::DecryptionFailed(_)), "got {:?}", err);
}

#[test]
fn test_enrollment_failure() {
    let (request, server_side) = exchange(&ScepConfig::default());

    let response = server_side
        .fail(ca(), FailInfo::BadRequest)
        .expect("Building failure response failed");
    assert_eq!(
        response.cert_rep().unwrap().fail_info,
        Some(FailInfo::BadRequest)
    );

    let mut reply = PkiMessage::parse(response.raw(), &ScepConfig::default()).unwrap();
    assert_eq!(reply.transaction_id(), request.transaction_id());
    let rep = reply.cert_rep().unwrap();
    assert_eq!(rep.status, PkiStatus::Failure);
    assert_eq!(rep.fail_info, Some(FailInfo::BadRequest));
    assert_eq!(&rep.recipient_nonce, request.sender_nonce().unwrap());

    // Failure carries nothing to decrypt
    reply.decrypt(&device().certificate, &device().key).unwrap();
    assert!(reply.cert_rep().unwrap().certificate.is_none());
}

#[test]
fn test_every_fail_info_survives_the_wire() {
    let (_, server_side) = exchange(&ScepConfig::default());

    for info in [
        FailInfo::BadAlg,
        FailInfo::BadMessageCheck,
        FailInfo::BadRequest,
        FailInfo::BadTime,
        FailInfo::BadCertId,
    ] {
        let response = server_side.fail(ca(), info).unwrap();
        let reply = PkiMessage::parse(response.raw(), &ScepConfig::default()).unwrap();
        assert_eq!(reply.cert_rep().unwrap().fail_info, Some(info));
    }
}

#[test]
fn test_success_on_cert_rep_is_rejected() {
    let (_, server_side) = exchange(&ScepConfig::default());
    let response = server_side.fail(ca(), FailInfo::BadTime).unwrap();
    let mut reply = PkiMessage::parse(response.raw(), &ScepConfig::default()).unwrap();

    let err = reply.success(ca(), &ca().certificate).unwrap_err();
    assert!(matches!(err, ScepError::PayloadMalformed(_)), "got {:?}", err);
}

#[test]
fn test_fail_on_cert_rep_is_rejected() {
    let (_, server_side) = exchange(&ScepConfig::default());
    let response = server_side.fail(ca(), FailInfo::BadTime).unwrap();
    let reply = PkiMessage::parse(response.raw(), &ScepConfig::default()).unwrap();
    // CertReps built here carry a senderNonce
    assert!(reply.sender_nonce().is_some());

    let err = reply.fail(ca(), FailInfo::BadRequest).unwrap_err();
    assert!(matches!(err, ScepError::PayloadMalformed(_)), "got {:?}", err);
}

#[test]
fn test_client_pins_authority_certificate() {
    let (_, mut server_side) = exchange(&ScepConfig::default());
    let issued = issue(&device_csr(None));
    let response = server_side.success(ca(), &issued).unwrap();

    let pinned = ScepConfig::builder()
        .trust_cert(ca().certificate.clone())
        .build();
    assert!(PkiMessage::parse(response.raw(), &pinned).is_ok());

    let wrong = ScepConfig::builder()
        .trust_cert(rogue().certificate.clone())
        .build();
    let err = PkiMessage::parse(response.raw(), &wrong).unwrap_err();
    assert!(err.is_signature_invalid(), "got {:?}", err);
}

#[test]
fn test_response_uses_server_encryption() {
    let server_config = ScepConfig::builder()
        .content_encryption(ContentEncryptionAlgorithm::TripleDesCbc)
        .build();
    let (_, mut server_side) = exchange(&server_config);
    let issued = issue(&device_csr(None));

    let response = server_side.success(ca(), &issued).unwrap();
    assert_eq!(
        response.config().content_encryption,
        ContentEncryptionAlgorithm::TripleDesCbc
    );

    let mut reply = PkiMessage::parse(response.raw(), &ScepConfig::default()).unwrap();
    reply.decrypt(&device().certificate, &device().key).unwrap();
    assert_eq!(reply.cert_rep().unwrap().certificate.as_ref(), Some(&issued));
}
