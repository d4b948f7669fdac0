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

//! Error types for SCEP message handling.
//!
//! Every failure in this crate is returned to the caller; nothing is retried
//! internally. The variants map one-to-one onto the failure classes of the
//! message layer: container decoding, signature verification, attribute
//! validation, envelope decryption, and payload decoding.

use thiserror::Error;

use crate::types::MessageType;

/// Result type alias using [`ScepError`].
pub type Result<T> = std::result::Result<T, ScepError>;

/// Errors that can occur while building, parsing, or decrypting SCEP messages.
#[derive(Debug, Error)]
pub enum ScepError {
    /// Outer SignedData or inner EnvelopedData bytes do not decode.
    #[error("Malformed container: {0}")]
    ContainerMalformed(String),

    /// Signature verification failed against the chosen certificate set.
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// A mandatory signed attribute is absent.
    #[error("Missing signed attribute: {0}")]
    AttributeMissing(String),

    /// A signed attribute is present but does not decode as the expected type.
    #[error("Malformed signed attribute: {0}")]
    AttributeMalformed(String),

    /// The messageType attribute holds a value outside the defined set.
    #[error("Unknown messageType: {0}")]
    UnknownMessageType(String),

    /// The pkiStatus attribute holds a value outside the defined set.
    #[error("Unknown pkiStatus: {0}")]
    UnknownStatus(String),

    /// The message type is recognized but the operation is not supported.
    #[error("Not implemented: {0}")]
    NotImplemented(MessageType),

    /// EnvelopedData decryption failed.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Decrypted content does not decode as the expected structure.
    #[error("Malformed payload: {0}")]
    PayloadMalformed(String),

    /// No CA/RA recipients are available for an outbound request.
    #[error("No recipients: {0}")]
    NoRecipients(String),

    /// The platform randomness source failed.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// Producing a signature over the signed attributes failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Producing an EnvelopedData structure failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// DER encoding error while building a message.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),
}

impl ScepError {
    /// Create a malformed container error.
    pub fn container_malformed(msg: impl Into<String>) -> Self {
        Self::ContainerMalformed(msg.into())
    }

    /// Create a signature verification error.
    pub fn signature_invalid(msg: impl Into<String>) -> Self {
        Self::SignatureInvalid(msg.into())
    }

    /// Create a missing attribute error for the named attribute.
    pub fn attribute_missing(name: impl Into<String>) -> Self {
        Self::AttributeMissing(name.into())
    }

    /// Create a malformed attribute error.
    pub fn attribute_malformed(msg: impl Into<String>) -> Self {
        Self::AttributeMalformed(msg.into())
    }

    /// Create a decryption error.
    pub fn decryption_failed(msg: impl Into<String>) -> Self {
        Self::DecryptionFailed(msg.into())
    }

    /// Create a malformed payload error.
    pub fn payload_malformed(msg: impl Into<String>) -> Self {
        Self::PayloadMalformed(msg.into())
    }

    /// Create a no-recipients error.
    pub fn no_recipients(msg: impl Into<String>) -> Self {
        Self::NoRecipients(msg.into())
    }

    /// Create a signing error.
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    /// Create an encryption error.
    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    /// Returns true if a mandatory signed attribute was absent.
    pub fn is_attribute_missing(&self) -> bool {
        matches!(self, Self::AttributeMissing(_))
    }

    /// Returns true if the operation is recognized but unsupported.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }

    /// Returns true if the error stems from the message signature.
    pub fn is_signature_invalid(&self) -> bool {
        matches!(self, Self::SignatureInvalid(_))
    }
}
