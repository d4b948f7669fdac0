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

//! # usg-scep
//!
//! A Rust implementation of the SCEP (Simple Certificate Enrollment Protocol,
//! RFC 8894) message layer.
//!
//! SCEP wraps certificate requests and responses in CMS SignedData whose
//! signed attributes carry the transaction state (message type, status,
//! nonces, transaction ID) and whose content is an EnvelopedData encrypted
//! for the other party. This library builds, parses, verifies, and decrypts
//! those messages. Transport (HTTP) and CA policy are left to the caller.
//!
//! ## Features
//!
//! - **Request building**: PKCSReq, RenewalReq, and UpdateReq with
//!   pluggable recipient selection
//! - **Parsing and validation** of every message type, with per-type
//!   attribute presence rules
//! - **Response building**: CertRep SUCCESS and FAILURE
//! - **Legacy interop**: SHA-1 signatures and DES/3DES envelopes
//!
//! ## Client Side
//!
//! ```no_run
//! use usg_scep::{new_csr_request, MessageType, PkiMessage, RequestTemplate, ScepConfig, SignerIdentity};
//! # fn example(
//! #     csr: x509_cert::request::CertReq,
//! #     ca_cert: x509_cert::Certificate,
//! #     identity: SignerIdentity,
//! #     response_bytes: &[u8],
//! # ) -> usg_scep::Result<()> {
//! let config = ScepConfig::default();
//!
//! let template = RequestTemplate::new(MessageType::PkcsReq, vec![ca_cert], identity.clone());
//! let request = new_csr_request(&csr, &template, &config)?;
//! // POST request.raw() to the server, then:
//!
//! let mut response = PkiMessage::parse(response_bytes, &config)?;
//! response.decrypt(&identity.certificate, &identity.key)?;
//! if let Some(rep) = response.cert_rep() {
//!     assert_eq!(&rep.recipient_nonce, request.sender_nonce().unwrap());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Server Side
//!
//! ```no_run
//! use usg_scep::{FailInfo, PkiMessage, ScepConfig, SignerIdentity};
//! # fn example(request_bytes: &[u8], ca: SignerIdentity, issued: x509_cert::Certificate) -> usg_scep::Result<()> {
//! let mut request = PkiMessage::parse(request_bytes, &ScepConfig::default())?;
//! request.decrypt(&ca.certificate, &ca.key)?;
//!
//! let approved = request
//!     .csr_req()
//!     .map(|req| req.challenge_password == "secret")
//!     .unwrap_or(false);
//!
//! let response = if approved {
//!     request.success(&ca, &issued)?
//! } else {
//!     request.fail(&ca, FailInfo::BadRequest)?
//! };
//! // Return response.raw() to the client.
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod config;
pub mod csr;
pub mod enveloped;
pub mod error;
pub mod nonce;
pub mod operations;
pub mod selector;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::{DigestAlgorithm, ScepConfig, ScepConfigBuilder};
pub use enveloped::ContentEncryptionAlgorithm;
pub use error::{Result, ScepError};
pub use nonce::{new_nonce, new_transaction_id};
pub use operations::new_csr_request;
pub use selector::{
    CertsSelector, EnciphermentCertsSelector, FingerprintCertsSelector, MultiCertsSelector,
    NopCertsSelector, SubjectKeyIdCertsSelector,
};
pub use types::{
    ca_certs, degenerate_certificates, CertRepMessage, CsrReqMessage, FailInfo, MessageType,
    Payload, PkiMessage, PkiStatus, RecipientNonce, RequestTemplate, SenderNonce, SignerIdentity,
    TransactionId,
};

// Re-export x509_cert::Certificate for convenience
pub use x509_cert::Certificate;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
