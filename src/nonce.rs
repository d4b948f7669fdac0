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

//! Nonce and transaction identifier generation.

use base64::prelude::*;
use sha1::{Digest, Sha1};
use spki::SubjectPublicKeyInfoOwned;

use crate::enveloped::random_bytes;
use crate::error::Result;
use crate::types::{SenderNonce, TransactionId, NONCE_LEN};

/// Generate a fresh 16-byte sender nonce.
///
/// Fails with `RandomnessUnavailable` if the operating system cannot
/// supply random bytes.
pub fn new_nonce() -> Result<SenderNonce> {
    random_bytes(NONCE_LEN).map(SenderNonce::new)
}

/// SHA-1 over the subjectPublicKey bit string (RFC 5280 §4.2.1.2, method 1).
pub fn subject_key_id(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// Derive the transaction identifier for a requester's public key.
///
/// The identifier is the standard base64 encoding of the key's subject
/// key identifier, so resubmissions with the same key correlate.
pub fn new_transaction_id(spki: &SubjectPublicKeyInfoOwned) -> TransactionId {
    TransactionId::new(BASE64_STANDARD.encode(subject_key_id(spki)))
}
