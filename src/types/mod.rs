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

//! SCEP message types and attribute values.
//!
//! This module provides the typed values carried in SCEP signed attributes
//! (messageType, pkiStatus, failInfo, nonces, transactionID) and the
//! [`PkiMessage`] structure built from them.
//!
//! All enumerations are validated on ingress: the only way to obtain a
//! [`MessageType`], [`PkiStatus`], or [`FailInfo`] from wire data is through
//! `TryFrom<&str>`, so rendering one can never hit an undefined code.

pub mod message;
pub(crate) mod pkcs7;

pub use message::{
    CertRepMessage, CsrReqMessage, Payload, PkiMessage, RequestTemplate, SignerIdentity,
};
pub use pkcs7::{ca_certs, degenerate_certificates};

use std::fmt;

use crate::error::ScepError;

/// Length in bytes of generated sender nonces.
pub const NONCE_LEN: usize = 16;

/// The operation performed by a SCEP transaction.
///
/// Encoded on the wire as a decimal PrintableString.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Response to a certificate or CRL request (3).
    CertRep,
    /// Renewal of an existing certificate (17).
    RenewalReq,
    /// Update request, superseded by RenewalReq (18).
    UpdateReq,
    /// Initial certificate enrollment (19).
    PkcsReq,
    /// Poll for a pending certificate (20). Not supported.
    CertPoll,
    /// Retrieve a previously issued certificate (21). Not supported.
    GetCert,
    /// Retrieve a CRL (22). Not supported.
    GetCrl,
}

impl MessageType {
    /// Every defined message type.
    pub const ALL: [MessageType; 7] = [
        Self::CertRep,
        Self::RenewalReq,
        Self::UpdateReq,
        Self::PkcsReq,
        Self::CertPoll,
        Self::GetCert,
        Self::GetCrl,
    ];

    /// The numeric wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CertRep => "3",
            Self::RenewalReq => "17",
            Self::UpdateReq => "18",
            Self::PkcsReq => "19",
            Self::CertPoll => "20",
            Self::GetCert => "21",
            Self::GetCrl => "22",
        }
    }

    /// The protocol name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CertRep => "CertRep",
            Self::RenewalReq => "RenewalReq",
            Self::UpdateReq => "UpdateReq",
            Self::PkcsReq => "PKCSReq",
            Self::CertPoll => "CertPoll",
            Self::GetCert => "GetCert",
            Self::GetCrl => "GetCRL",
        }
    }

    /// Returns true for the certificate request types that carry a CSR.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::PkcsReq | Self::RenewalReq | Self::UpdateReq)
    }

    /// Returns true if this crate handles the message type.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::CertPoll | Self::GetCert | Self::GetCrl)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl TryFrom<&str> for MessageType {
    type Error = ScepError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| ScepError::UnknownMessageType(code.to_string()))
    }
}

/// Transaction status carried in every CertRep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkiStatus {
    /// Request granted (0).
    Success,
    /// Request rejected (2).
    Failure,
    /// Request pending manual approval (3).
    Pending,
}

impl PkiStatus {
    /// The numeric wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success => "0",
            Self::Failure => "2",
            Self::Pending => "3",
        }
    }

    /// The protocol name of the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for PkiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl TryFrom<&str> for PkiStatus {
    type Error = ScepError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        match code {
            "0" => Ok(Self::Success),
            "2" => Ok(Self::Failure),
            "3" => Ok(Self::Pending),
            other => Err(ScepError::UnknownStatus(other.to_string())),
        }
    }
}

/// Failure reason carried in a CertRep with status FAILURE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailInfo {
    /// Unrecognized or unsupported algorithm (0).
    BadAlg,
    /// Integrity check failed (1).
    BadMessageCheck,
    /// Transaction not permitted or supported (2).
    BadRequest,
    /// signingTime not close enough to system time (3).
    BadTime,
    /// No certificate could be identified matching the criteria (4).
    BadCertId,
}

impl FailInfo {
    /// The numeric wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadAlg => "0",
            Self::BadMessageCheck => "1",
            Self::BadRequest => "2",
            Self::BadTime => "3",
            Self::BadCertId => "4",
        }
    }

    /// The protocol name of the failure reason.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BadAlg => "badAlg",
            Self::BadMessageCheck => "badMessageCheck",
            Self::BadRequest => "badRequest",
            Self::BadTime => "badTime",
            Self::BadCertId => "badCertID",
        }
    }
}

impl fmt::Display for FailInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl TryFrom<&str> for FailInfo {
    type Error = ScepError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        match code {
            "0" => Ok(Self::BadAlg),
            "1" => Ok(Self::BadMessageCheck),
            "2" => Ok(Self::BadRequest),
            "3" => Ok(Self::BadTime),
            "4" => Ok(Self::BadCertId),
            other => Err(ScepError::attribute_malformed(format!(
                "failInfo: undefined code {:?}",
                other
            ))),
        }
    }
}

/// Random value included by the sender of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderNonce(Vec<u8>);

/// Copy of the request's sender nonce, echoed in the reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientNonce(Vec<u8>);

macro_rules! nonce_accessors {
    ($ty:ident) => {
        impl $ty {
            /// Wrap raw nonce bytes.
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// The raw nonce bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Number of bytes in the nonce.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Returns true if the nonce holds no bytes.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl AsRef<[u8]> for $ty {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

nonce_accessors!(SenderNonce);
nonce_accessors!(RecipientNonce);

impl From<&SenderNonce> for RecipientNonce {
    fn from(nonce: &SenderNonce) -> Self {
        Self(nonce.0.clone())
    }
}

impl PartialEq<SenderNonce> for RecipientNonce {
    fn eq(&self, other: &SenderNonce) -> bool {
        self.0 == other.0
    }
}

/// Text identifier shared by all messages of one enrollment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a transaction identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
