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

//! SCEP signed attribute codec.
//!
//! SCEP transaction state travels in the signed attributes of the outer
//! SignedData. Each attribute has a fixed OID under the VeriSign arc
//! `2.16.840.1.113733.1.9`:
//!
//! | Attribute      | OID suffix | Encoding                     |
//! |----------------|------------|------------------------------|
//! | messageType    | `.2`       | PrintableString (decimal)    |
//! | pkiStatus      | `.3`       | PrintableString (decimal)    |
//! | failInfo       | `.4`       | PrintableString (decimal)    |
//! | senderNonce    | `.5`       | OCTET STRING (16 bytes)      |
//! | recipientNonce | `.6`       | OCTET STRING (16 bytes)      |
//! | transactionID  | `.7`       | PrintableString              |
//!
//! The per-message-type presence rules are kept in a declarative table
//! ([`rule_for`], [`required_for_status`]) consulted by the parser.

use cms::signed_data::SignedAttributes;
use const_oid::ObjectIdentifier;
use der::asn1::{PrintableStringRef, SetOfVec};
use der::{Any, Decode, Encode, Tag, Tagged};
use x509_cert::attr::Attribute;

use crate::error::{Result, ScepError};
use crate::types::{
    FailInfo, MessageType, PkiStatus, RecipientNonce, SenderNonce, TransactionId,
};

/// OID of the messageType attribute.
pub const OID_MESSAGE_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.2");
/// OID of the pkiStatus attribute.
pub const OID_PKI_STATUS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.3");
/// OID of the failInfo attribute.
pub const OID_FAIL_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.4");
/// OID of the senderNonce attribute.
pub const OID_SENDER_NONCE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.5");
/// OID of the recipientNonce attribute.
pub const OID_RECIPIENT_NONCE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.6");
/// OID of the transactionID attribute.
pub const OID_TRANSACTION_ID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.113733.1.9.7");

/// A SCEP signed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScepAttribute {
    /// messageType
    MessageType,
    /// pkiStatus
    PkiStatus,
    /// failInfo
    FailInfo,
    /// senderNonce
    SenderNonce,
    /// recipientNonce
    RecipientNonce,
    /// transactionID
    TransactionId,
}

impl ScepAttribute {
    /// The attribute's object identifier.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::MessageType => OID_MESSAGE_TYPE,
            Self::PkiStatus => OID_PKI_STATUS,
            Self::FailInfo => OID_FAIL_INFO,
            Self::SenderNonce => OID_SENDER_NONCE,
            Self::RecipientNonce => OID_RECIPIENT_NONCE,
            Self::TransactionId => OID_TRANSACTION_ID,
        }
    }

    /// The attribute name used in RFC 8894.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageType => "messageType",
            Self::PkiStatus => "pkiStatus",
            Self::FailInfo => "failInfo",
            Self::SenderNonce => "senderNonce",
            Self::RecipientNonce => "recipientNonce",
            Self::TransactionId => "transactionID",
        }
    }

    fn is_octets(&self) -> bool {
        matches!(self, Self::SenderNonce | Self::RecipientNonce)
    }
}

/// Attributes every PKI message must carry.
pub const MANDATORY: &[ScepAttribute] = &[ScepAttribute::TransactionId, ScepAttribute::MessageType];

/// How the parser treats a message type once mandatory attributes are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A CertRep; the payload is built from status and nonce attributes.
    CertRep,
    /// A certificate request; the payload stays enveloped until decrypted.
    Request,
    /// Recognized but not implemented.
    Unsupported,
}

/// Presence rules for one message type.
#[derive(Debug)]
pub struct MessageRule {
    /// The message type the rule applies to.
    pub message_type: MessageType,
    /// How the parser proceeds.
    pub disposition: Disposition,
    /// Attributes that must be present and non-empty.
    pub required: &'static [ScepAttribute],
}

static CERT_REP_RULE: MessageRule = MessageRule {
    message_type: MessageType::CertRep,
    disposition: Disposition::CertRep,
    required: &[ScepAttribute::PkiStatus, ScepAttribute::RecipientNonce],
};

static RENEWAL_REQ_RULE: MessageRule = MessageRule {
    message_type: MessageType::RenewalReq,
    disposition: Disposition::Request,
    required: &[ScepAttribute::SenderNonce],
};

static UPDATE_REQ_RULE: MessageRule = MessageRule {
    message_type: MessageType::UpdateReq,
    disposition: Disposition::Request,
    required: &[ScepAttribute::SenderNonce],
};

static PKCS_REQ_RULE: MessageRule = MessageRule {
    message_type: MessageType::PkcsReq,
    disposition: Disposition::Request,
    required: &[ScepAttribute::SenderNonce],
};

static CERT_POLL_RULE: MessageRule = MessageRule {
    message_type: MessageType::CertPoll,
    disposition: Disposition::Unsupported,
    required: &[],
};

static GET_CERT_RULE: MessageRule = MessageRule {
    message_type: MessageType::GetCert,
    disposition: Disposition::Unsupported,
    required: &[],
};

static GET_CRL_RULE: MessageRule = MessageRule {
    message_type: MessageType::GetCrl,
    disposition: Disposition::Unsupported,
    required: &[],
};

/// Look up the presence rule for a message type.
pub fn rule_for(message_type: MessageType) -> &'static MessageRule {
    match message_type {
        MessageType::CertRep => &CERT_REP_RULE,
        MessageType::RenewalReq => &RENEWAL_REQ_RULE,
        MessageType::UpdateReq => &UPDATE_REQ_RULE,
        MessageType::PkcsReq => &PKCS_REQ_RULE,
        MessageType::CertPoll => &CERT_POLL_RULE,
        MessageType::GetCert => &GET_CERT_RULE,
        MessageType::GetCrl => &GET_CRL_RULE,
    }
}

/// Additional attributes a CertRep must carry for the given status.
pub fn required_for_status(status: PkiStatus) -> &'static [ScepAttribute] {
    match status {
        PkiStatus::Success => &[],
        PkiStatus::Failure => &[ScepAttribute::FailInfo],
        // PENDING would need CertPoll to make progress, which is unsupported.
        PkiStatus::Pending => &[],
    }
}

/// Encode a text-valued attribute as a PrintableString.
pub fn encode_text(attr: ScepAttribute, value: &str) -> Result<Attribute> {
    let text = PrintableStringRef::new(value).map_err(|e| {
        ScepError::attribute_malformed(format!("{}: not printable: {}", attr.name(), e))
    })?;
    let value = Any::from_der(&text.to_der()?)?;
    single_valued(attr, value)
}

/// Encode an octet-valued attribute as an OCTET STRING.
pub fn encode_octets(attr: ScepAttribute, value: &[u8]) -> Result<Attribute> {
    let value = Any::new(Tag::OctetString, value)?;
    single_valued(attr, value)
}

fn single_valued(attr: ScepAttribute, value: Any) -> Result<Attribute> {
    let mut values = SetOfVec::new();
    values.insert(value)?;
    Ok(Attribute {
        oid: attr.oid(),
        values,
    })
}

/// Build the messageType attribute.
pub fn message_type(value: MessageType) -> Result<Attribute> {
    encode_text(ScepAttribute::MessageType, value.code())
}

/// Build the pkiStatus attribute.
pub fn pki_status(value: PkiStatus) -> Result<Attribute> {
    encode_text(ScepAttribute::PkiStatus, value.code())
}

/// Build the failInfo attribute.
pub fn fail_info(value: FailInfo) -> Result<Attribute> {
    encode_text(ScepAttribute::FailInfo, value.code())
}

/// Build the senderNonce attribute.
pub fn sender_nonce(value: &SenderNonce) -> Result<Attribute> {
    encode_octets(ScepAttribute::SenderNonce, value.as_bytes())
}

/// Build the recipientNonce attribute.
pub fn recipient_nonce(value: &RecipientNonce) -> Result<Attribute> {
    encode_octets(ScepAttribute::RecipientNonce, value.as_bytes())
}

/// Build the transactionID attribute.
pub fn transaction_id(value: &TransactionId) -> Result<Attribute> {
    encode_text(ScepAttribute::TransactionId, value.as_str())
}

/// Typed read access to the signed attributes of a SignerInfo.
#[derive(Debug, Clone, Copy)]
pub struct SignedAttributeSet<'a> {
    attrs: &'a SignedAttributes,
}

impl<'a> SignedAttributeSet<'a> {
    /// Wrap a decoded signed attribute set.
    pub fn new(attrs: &'a SignedAttributes) -> Self {
        Self { attrs }
    }

    /// Returns true if the attribute is present with a non-empty value.
    pub fn has(&self, attr: ScepAttribute) -> bool {
        match self.raw(attr) {
            Ok(value) => !value.value().is_empty(),
            Err(_) => false,
        }
    }

    /// Fail with `AttributeMissing` unless the attribute is present and non-empty.
    pub fn require(&self, attr: ScepAttribute) -> Result<()> {
        if self.has(attr) {
            Ok(())
        } else {
            Err(ScepError::attribute_missing(attr.name()))
        }
    }

    /// The first value of an attribute.
    pub fn raw(&self, attr: ScepAttribute) -> Result<&'a Any> {
        let oid = attr.oid();
        let found = self
            .attrs
            .iter()
            .find(|a| a.oid == oid)
            .ok_or_else(|| ScepError::attribute_missing(attr.name()))?;
        found.values.iter().next().ok_or_else(|| {
            ScepError::attribute_malformed(format!("{}: empty value set", attr.name()))
        })
    }

    /// Decode a text-valued attribute.
    pub fn text(&self, attr: ScepAttribute) -> Result<String> {
        if attr.is_octets() {
            return Err(ScepError::attribute_malformed(format!(
                "{} is not text-valued",
                attr.name()
            )));
        }
        let value = self.raw(attr)?;
        match value.tag() {
            Tag::PrintableString | Tag::Utf8String | Tag::Ia5String | Tag::TeletexString => {
                std::str::from_utf8(value.value())
                    .map(str::to_owned)
                    .map_err(|e| ScepError::attribute_malformed(format!("{}: {}", attr.name(), e)))
            }
            tag => Err(ScepError::attribute_malformed(format!(
                "{}: expected string, got {}",
                attr.name(),
                tag
            ))),
        }
    }

    /// Decode an octet-valued attribute.
    pub fn octets(&self, attr: ScepAttribute) -> Result<Vec<u8>> {
        let value = self.raw(attr)?;
        if value.tag() != Tag::OctetString {
            return Err(ScepError::attribute_malformed(format!(
                "{}: expected OCTET STRING, got {}",
                attr.name(),
                value.tag()
            )));
        }
        Ok(value.value().to_vec())
    }

    /// The transactionID attribute.
    pub fn transaction_id(&self) -> Result<TransactionId> {
        self.text(ScepAttribute::TransactionId).map(TransactionId::new)
    }

    /// The messageType attribute.
    pub fn message_type(&self) -> Result<MessageType> {
        MessageType::try_from(self.text(ScepAttribute::MessageType)?.as_str())
    }

    /// The pkiStatus attribute.
    pub fn pki_status(&self) -> Result<PkiStatus> {
        PkiStatus::try_from(self.text(ScepAttribute::PkiStatus)?.as_str())
    }

    /// The failInfo attribute.
    pub fn fail_info(&self) -> Result<FailInfo> {
        FailInfo::try_from(self.text(ScepAttribute::FailInfo)?.as_str())
    }

    /// The senderNonce attribute.
    pub fn sender_nonce(&self) -> Result<SenderNonce> {
        self.octets(ScepAttribute::SenderNonce).map(SenderNonce::new)
    }

    /// The recipientNonce attribute.
    pub fn recipient_nonce(&self) -> Result<RecipientNonce> {
        self.octets(ScepAttribute::RecipientNonce)
            .map(RecipientNonce::new)
    }
}
