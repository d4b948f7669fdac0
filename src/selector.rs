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

//! Recipient certificate selection for outbound requests.
//!
//! A GetCACert response often carries several certificates: the CA, one or
//! more RA certificates, and intermediates. A [`CertsSelector`] decides which
//! of them a request is encrypted for.
//!
//! Selection runs over the recipients already present on the
//! [`RequestTemplate`](crate::types::message::RequestTemplate). Retrieving
//! those certificates (for example with a GetCACert exchange and
//! [`ca_certs`](crate::ca_certs)) is the caller's job.

use std::fmt;
use std::sync::Arc;

use const_oid::AssociatedOid;
use der::{Decode, Encode};
use sha2::{Digest, Sha256};
use x509_cert::ext::pkix::KeyUsage;
use x509_cert::Certificate;

use crate::types::pkcs7::subject_key_identifier;

/// Policy choosing encryption recipients from candidate certificates.
pub trait CertsSelector: Send + Sync {
    /// Return the selected subset of `candidates`, in candidate order.
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate>;
}

impl<F> CertsSelector for F
where
    F: Fn(&[Certificate]) -> Vec<Certificate> + Send + Sync,
{
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        self(candidates)
    }
}

/// Selects every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopCertsSelector;

impl CertsSelector for NopCertsSelector {
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        candidates.to_vec()
    }
}

/// Selects certificates usable for key transport.
///
/// A certificate qualifies if its key usage allows keyEncipherment or
/// dataEncipherment, or if it has no key usage extension at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnciphermentCertsSelector;

impl EnciphermentCertsSelector {
    fn allows_encipherment(cert: &Certificate) -> bool {
        let ext = cert
            .tbs_certificate
            .extensions
            .as_ref()
            .and_then(|exts| exts.iter().find(|ext| ext.extn_id == KeyUsage::OID));

        match ext {
            None => true,
            Some(ext) => match KeyUsage::from_der(ext.extn_value.as_bytes()) {
                Ok(ku) => ku.key_encipherment() || ku.data_encipherment(),
                Err(e) => {
                    tracing::warn!("Ignoring certificate with malformed key usage: {}", e);
                    false
                }
            },
        }
    }
}

impl CertsSelector for EnciphermentCertsSelector {
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        candidates
            .iter()
            .filter(|cert| Self::allows_encipherment(cert))
            .cloned()
            .collect()
    }
}

/// Selects the certificate whose SHA-256 DER fingerprint matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintCertsSelector {
    fingerprint: [u8; 32],
}

impl FingerprintCertsSelector {
    /// Select by SHA-256 fingerprint of the DER certificate.
    pub fn new(fingerprint: [u8; 32]) -> Self {
        Self { fingerprint }
    }

    /// The SHA-256 fingerprint of a certificate.
    pub fn fingerprint(cert: &Certificate) -> Option<[u8; 32]> {
        cert.to_der().ok().map(|der| Sha256::digest(der).into())
    }
}

impl CertsSelector for FingerprintCertsSelector {
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        candidates
            .iter()
            .filter(|cert| Self::fingerprint(cert) == Some(self.fingerprint))
            .cloned()
            .collect()
    }
}

/// Selects certificates whose subject key identifier extension matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdCertsSelector {
    ski: Vec<u8>,
}

impl SubjectKeyIdCertsSelector {
    /// Select by subject key identifier.
    pub fn new(ski: impl Into<Vec<u8>>) -> Self {
        Self { ski: ski.into() }
    }
}

impl CertsSelector for SubjectKeyIdCertsSelector {
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        candidates
            .iter()
            .filter(|cert| subject_key_identifier(cert).as_deref() == Some(self.ski.as_slice()))
            .cloned()
            .collect()
    }
}

/// Selects a candidate if any of the wrapped selectors selects it.
#[derive(Clone, Default)]
pub struct MultiCertsSelector {
    selectors: Vec<Arc<dyn CertsSelector>>,
}

impl MultiCertsSelector {
    /// Combine selectors.
    pub fn new(selectors: Vec<Arc<dyn CertsSelector>>) -> Self {
        Self { selectors }
    }

    /// Add another selector.
    pub fn with(mut self, selector: impl CertsSelector + 'static) -> Self {
        self.selectors.push(Arc::new(selector));
        self
    }
}

impl fmt::Debug for MultiCertsSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultiCertsSelector({} selectors)", self.selectors.len())
    }
}

impl CertsSelector for MultiCertsSelector {
    fn select_certs(&self, candidates: &[Certificate]) -> Vec<Certificate> {
        candidates
            .iter()
            .filter(|cert| {
                self.selectors
                    .iter()
                    .any(|s| !s.select_certs(std::slice::from_ref(*cert)).is_empty())
            })
            .cloned()
            .collect()
    }
}
