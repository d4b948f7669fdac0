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

//! CSR (Certificate Signing Request) decoding utilities.
//!
//! SCEP requests carry a PKCS#10 request inside the encrypted envelope.
//! The authority may gate approval on the PKCS#9 challengePassword
//! attribute of that request.

use const_oid::ObjectIdentifier;
use der::asn1::{PrintableStringRef, SetOfVec, Utf8StringRef};
use der::{Any, Decode, Encode, Tag, Tagged};
use x509_cert::attr::Attribute;
use x509_cert::request::CertReq;

use crate::error::{Result, ScepError};

/// OID of the PKCS#9 challengePassword attribute.
pub const OID_CHALLENGE_PASSWORD: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.7");

/// Decode a DER PKCS#10 request.
pub fn parse_csr(der: &[u8]) -> Result<CertReq> {
    CertReq::from_der(der)
        .map_err(|e| ScepError::payload_malformed(format!("Failed to parse CSR: {}", e)))
}

/// Extract the challenge password of a request.
///
/// Returns an empty string when the request has no challengePassword
/// attribute.
pub fn challenge_password(csr: &CertReq) -> Result<String> {
    let attr = match csr
        .info
        .attributes
        .iter()
        .find(|attr| attr.oid == OID_CHALLENGE_PASSWORD)
    {
        Some(attr) => attr,
        None => return Ok(String::new()),
    };

    let value = attr
        .values
        .iter()
        .next()
        .ok_or_else(|| ScepError::payload_malformed("challengePassword has no value"))?;

    match value.tag() {
        Tag::PrintableString | Tag::Utf8String | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value())
                .map(str::to_owned)
                .map_err(|e| {
                    ScepError::payload_malformed(format!("challengePassword is not text: {}", e))
                })
        }
        tag => Err(ScepError::payload_malformed(format!(
            "challengePassword has unexpected type {}",
            tag
        ))),
    }
}

/// Build a challengePassword request attribute.
///
/// The password is encoded as a PrintableString when possible, otherwise
/// as a UTF8String.
pub fn challenge_password_attribute(password: &str) -> Result<Attribute> {
    let value = match PrintableStringRef::new(password) {
        Ok(printable) => Any::from_der(&printable.to_der()?)?,
        Err(_) => Any::from_der(&Utf8StringRef::new(password)?.to_der()?)?,
    };
    let mut values = SetOfVec::new();
    values.insert(value)?;
    Ok(Attribute {
        oid: OID_CHALLENGE_PASSWORD,
        values,
    })
}
