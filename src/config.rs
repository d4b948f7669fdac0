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

//! Configuration types for SCEP message handling.
//!
//! A [`ScepConfig`] value is passed to every entry point. There is no
//! process-wide state: two callers with different configurations never
//! observe each other's options.

use std::sync::Arc;

use const_oid::ObjectIdentifier;
use rsa::Pkcs1v15Sign;
use sha2::Digest;
use x509_cert::Certificate;

use crate::enveloped::ContentEncryptionAlgorithm;
use crate::selector::{CertsSelector, NopCertsSelector};

const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// Message digest used for SignerInfos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-1. Accepted from legacy peers; avoid for new signatures.
    Sha1,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// The digest algorithm's object identifier.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha1 => OID_SHA1,
            Self::Sha256 => OID_SHA256,
            Self::Sha384 => OID_SHA384,
            Self::Sha512 => OID_SHA512,
        }
    }

    /// Look up a digest algorithm by object identifier.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [Self::Sha1, Self::Sha256, Self::Sha384, Self::Sha512]
            .into_iter()
            .find(|alg| alg.oid() == *oid)
    }

    /// Get the algorithm name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Hash `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }

    /// RSA PKCS#1 v1.5 signature scheme over this digest.
    pub(crate) fn pkcs1v15(&self) -> Pkcs1v15Sign {
        match self {
            Self::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
            Self::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
            Self::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
            Self::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        }
    }
}

/// Options for parsing and building SCEP messages.
#[derive(Clone)]
pub struct ScepConfig {
    /// Certificates to verify inbound signatures against.
    ///
    /// When non-empty, these replace the certificates embedded in the
    /// SignedData. Some servers omit certificates from their responses and
    /// expect the client to already hold them.
    pub trusted_certs: Vec<Certificate>,

    /// Policy choosing encryption recipients for outbound requests.
    pub recipient_selector: Arc<dyn CertsSelector>,

    /// Content encryption algorithm for outbound envelopes.
    pub content_encryption: ContentEncryptionAlgorithm,

    /// Digest algorithm for outbound signatures.
    pub signing_digest: DigestAlgorithm,

    /// Span every operation records its events in.
    ///
    /// Defaults to [`tracing::Span::none`], which leaves events in the
    /// caller's current context.
    pub span: tracing::Span,
}

impl std::fmt::Debug for ScepConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScepConfig")
            .field("trusted_certs", &self.trusted_certs.len())
            .field("recipient_selector", &"...")
            .field("content_encryption", &self.content_encryption)
            .field("signing_digest", &self.signing_digest)
            .field("span", &self.span)
            .finish()
    }
}

impl Default for ScepConfig {
    fn default() -> Self {
        Self {
            trusted_certs: Vec::new(),
            recipient_selector: Arc::new(NopCertsSelector),
            content_encryption: ContentEncryptionAlgorithm::default(),
            signing_digest: DigestAlgorithm::default(),
            span: tracing::Span::none(),
        }
    }
}

impl ScepConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ScepConfigBuilder {
        ScepConfigBuilder::new()
    }
}

/// Builder for [`ScepConfig`].
#[derive(Default)]
pub struct ScepConfigBuilder {
    trusted_certs: Vec<Certificate>,
    recipient_selector: Option<Arc<dyn CertsSelector>>,
    content_encryption: Option<ContentEncryptionAlgorithm>,
    signing_digest: Option<DigestAlgorithm>,
    span: Option<tracing::Span>,
}

impl ScepConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify inbound signatures against these certificates only.
    pub fn trusted_certs(mut self, certs: Vec<Certificate>) -> Self {
        self.trusted_certs = certs;
        self
    }

    /// Add one certificate to the trusted set.
    pub fn trust_cert(mut self, cert: Certificate) -> Self {
        self.trusted_certs.push(cert);
        self
    }

    /// Set the recipient selection policy for outbound requests.
    pub fn recipient_selector(mut self, selector: impl CertsSelector + 'static) -> Self {
        self.recipient_selector = Some(Arc::new(selector));
        self
    }

    /// Set the content encryption algorithm for outbound envelopes.
    pub fn content_encryption(mut self, algorithm: ContentEncryptionAlgorithm) -> Self {
        self.content_encryption = Some(algorithm);
        self
    }

    /// Set the digest algorithm for outbound signatures.
    pub fn signing_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.signing_digest = Some(digest);
        self
    }

    /// Record events inside `span`.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ScepConfig {
        ScepConfig {
            trusted_certs: self.trusted_certs,
            recipient_selector: self
                .recipient_selector
                .unwrap_or_else(|| Arc::new(NopCertsSelector)),
            content_encryption: self.content_encryption.unwrap_or_default(),
            signing_digest: self.signing_digest.unwrap_or_default(),
            span: self.span.unwrap_or_else(tracing::Span::none),
        }
    }
}
