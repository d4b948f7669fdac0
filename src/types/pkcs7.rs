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

//! PKCS#7/CMS SignedData utilities.
//!
//! This module wraps SCEP payloads in signed containers, verifies inbound
//! containers, and handles the "certs-only" degenerate SignedData used to
//! carry certificates.
//!
//! Certificates are always reported in wire order. A DER `SET OF` would
//! normally be sorted, but SCEP peers rely on the issued certificate being
//! the first entry of a CertRep, so the certificate field is encoded and
//! decoded by hand rather than through [`CertificateSet`](cms::signed_data::CertificateSet).

use cms::builder::{create_signing_time_attribute, SignedDataBuilder, SignerInfoBuilder};
use cms::cert::IssuerAndSerialNumber;
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    DigestAlgorithmIdentifiers, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
    SignerInfos,
};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::SetOfVec;
use der::{Any, Decode, Encode, Header, Length, Reader, SliceReader, Tag, TagNumber, Tagged};
use rsa::pkcs1v15::{RsaSignatureAssociatedOid, SigningKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Digest;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::Certificate;

use crate::config::DigestAlgorithm;
use crate::error::{Result, ScepError};

/// id-data (RFC 5652).
pub(crate) const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-signedData (RFC 5652).
pub(crate) const ID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// id-envelopedData (RFC 5652).
pub(crate) const ID_ENVELOPED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.3");
const ID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Signature algorithms accepted on SignerInfos.
const RSA_SIGNATURE_OIDS: &[ObjectIdentifier] = &[
    RSA_ENCRYPTION,
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5"),
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11"),
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12"),
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13"),
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14"),
];

const CERTIFICATES_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

const SIGNED_ATTRS_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

/// A SignerInfo together with its signed attributes as they were signed.
#[derive(Debug, Clone)]
pub(crate) struct Signer {
    pub info: SignerInfo,
    /// The signedAttrs field re-tagged as a SET, byte for byte as received.
    /// Decoding sorts the attributes, so a re-encoding may not match the
    /// signature.
    pub signed_attrs_der: Option<Vec<u8>>,
}

/// A decoded SignedData container.
#[derive(Debug, Clone)]
pub(crate) struct SignedContainer {
    /// The decoded SignedData.
    pub signed_data: SignedData,
    /// Embedded X.509 certificates, in wire order.
    pub certificates: Vec<Certificate>,
    /// SignerInfos, in wire order.
    pub signers: Vec<Signer>,
    /// Octets of the encapsulated content, empty when absent.
    pub content: Vec<u8>,
}

impl SignedContainer {
    /// The first SignerInfo, if any.
    pub fn first_signer(&self) -> Option<&SignerInfo> {
        self.signers.first().map(|signer| &signer.info)
    }
}

/// Raw fields of an encoded SignedData that decoding would reorder.
struct RawFields {
    certificates: Option<Any>,
    signer_infos: Option<Any>,
}

/// Decode a ContentInfo holding SignedData.
pub(crate) fn parse_signed_data(data: &[u8]) -> Result<SignedContainer> {
    let content_info = ContentInfo::from_der(data).map_err(|e| {
        ScepError::container_malformed(format!("Failed to parse ContentInfo: {}", e))
    })?;

    if content_info.content_type != ID_SIGNED_DATA {
        return Err(ScepError::container_malformed(format!(
            "Expected SignedData OID, got {}",
            content_info.content_type
        )));
    }

    let content = content_info
        .content
        .to_der()
        .map_err(|e| ScepError::container_malformed(format!("Failed to encode content: {}", e)))?;

    let signed_data = SignedData::from_der(&content).map_err(|e| {
        ScepError::container_malformed(format!("Failed to parse SignedData: {}", e))
    })?;

    let raw = raw_fields(&content)
        .map_err(|e| ScepError::container_malformed(format!("Failed to walk SignedData: {}", e)))?;
    let certificates = certificates_in_wire_order(raw.certificates)?;
    let signers = signers_in_wire_order(raw.signer_infos)?;

    // The digest covers the content octets, with or without OCTET STRING wrapping.
    let content = match &signed_data.encap_content_info.econtent {
        Some(econtent) => econtent.value().to_vec(),
        None => Vec::new(),
    };

    Ok(SignedContainer {
        signed_data,
        certificates,
        signers,
        content,
    })
}

fn raw_fields(signed_data_der: &[u8]) -> der::Result<RawFields> {
    let mut reader = SliceReader::new(signed_data_der)?;
    reader.sequence(|seq| {
        // version, digestAlgorithms, encapContentInfo
        for _ in 0..3 {
            seq.decode::<Any>()?;
        }
        let mut fields = RawFields {
            certificates: None,
            signer_infos: None,
        };
        while !seq.is_finished() {
            let field: Any = seq.decode()?;
            if field.tag() == CERTIFICATES_TAG {
                fields.certificates = Some(field);
            } else if field.tag() == Tag::Set {
                fields.signer_infos = Some(field);
            }
        }
        Ok(fields)
    })
}

/// Pair each SignerInfo with the exact bytes of its signed attributes.
fn signers_in_wire_order(raw: Option<Any>) -> Result<Vec<Signer>> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    let mut signers = Vec::new();
    let mut reader = SliceReader::new(raw.value())?;
    while !reader.is_finished() {
        let element: Any = reader.decode()?;
        let info = SignerInfo::from_der(&element.to_der()?).map_err(|e| {
            ScepError::container_malformed(format!("Failed to parse SignerInfo: {}", e))
        })?;

        let mut fields = SliceReader::new(element.value())?;
        // version, sid, digestAlgorithm
        for _ in 0..3 {
            fields.decode::<Any>()?;
        }
        let signed_attrs_der = if !fields.is_finished() && fields.peek_tag()? == SIGNED_ATTRS_TAG
        {
            let attrs: Any = fields.decode()?;
            let mut set = Vec::with_capacity(attrs.value().len() + 8);
            Header::new(Tag::Set, attrs.value().len())?.encode_to_vec(&mut set)?;
            set.extend_from_slice(attrs.value());
            Some(set)
        } else {
            None
        };

        signers.push(Signer {
            info,
            signed_attrs_der,
        });
    }

    Ok(signers)
}

/// Decode the `certificates [0] IMPLICIT` field, keeping wire order.
fn certificates_in_wire_order(raw: Option<Any>) -> Result<Vec<Certificate>> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    let mut certificates = Vec::new();
    let mut reader = SliceReader::new(raw.value())?;
    while !reader.is_finished() {
        let choice: Any = reader.decode()?;
        // CertificateChoices also covers extended and attribute certificates,
        // which are context-tagged. Only plain X.509 certificates are kept.
        if choice.tag() != Tag::Sequence {
            tracing::warn!("Skipping non-X.509 certificate choice: {}", choice.tag());
            continue;
        }
        match Certificate::from_der(&choice.to_der()?) {
            Ok(cert) => certificates.push(cert),
            Err(e) => {
                tracing::warn!("Skipping non-X.509 certificate: {}", e);
            }
        }
    }

    Ok(certificates)
}

/// Encode a SignedData with its certificates in the given order.
fn encode_signed_data(
    version: CmsVersion,
    digest_algorithms: &DigestAlgorithmIdentifiers,
    encap: &EncapsulatedContentInfo,
    certificates: &[Certificate],
    signer_infos: &SignerInfos,
) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    version.encode_to_vec(&mut body)?;
    digest_algorithms.encode_to_vec(&mut body)?;
    encap.encode_to_vec(&mut body)?;

    if !certificates.is_empty() {
        let mut certs = Vec::new();
        for cert in certificates {
            cert.encode_to_vec(&mut certs)?;
        }
        Header::new(CERTIFICATES_TAG, Length::try_from(certs.len())?)?.encode_to_vec(&mut body)?;
        body.extend_from_slice(&certs);
    }

    signer_infos.encode_to_vec(&mut body)?;

    let mut signed_data = Vec::with_capacity(body.len() + 8);
    Header::new(Tag::Sequence, Length::try_from(body.len())?)?.encode_to_vec(&mut signed_data)?;
    signed_data.extend_from_slice(&body);

    let content_info = ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::from_der(&signed_data)?,
    };
    Ok(content_info.to_der()?)
}

/// Sign `content` with the given identity.
///
/// `attributes` are added to the signed attributes alongside the
/// contentType, messageDigest, and signingTime attributes. The signer
/// certificate is always embedded, after `extra_certs`.
pub(crate) fn sign(
    content: &[u8],
    attributes: Vec<x509_cert::attr::Attribute>,
    certificate: &Certificate,
    key: &RsaPrivateKey,
    digest: DigestAlgorithm,
    extra_certs: &[Certificate],
) -> Result<Vec<u8>> {
    let encap = EncapsulatedContentInfo {
        econtent_type: ID_DATA,
        econtent: Some(Any::new(Tag::OctetString, content)?),
    };

    let signed = match digest {
        DigestAlgorithm::Sha1 => sign_with::<sha1::Sha1>(&encap, attributes, certificate, key),
        DigestAlgorithm::Sha256 => sign_with::<sha2::Sha256>(&encap, attributes, certificate, key),
        DigestAlgorithm::Sha384 => sign_with::<sha2::Sha384>(&encap, attributes, certificate, key),
        DigestAlgorithm::Sha512 => sign_with::<sha2::Sha512>(&encap, attributes, certificate, key),
    }?;

    let mut certificates = extra_certs.to_vec();
    certificates.push(certificate.clone());

    encode_signed_data(
        signed.version,
        &signed.digest_algorithms,
        &signed.encap_content_info,
        &certificates,
        &signed.signer_infos,
    )
}

fn sign_with<D>(
    encap: &EncapsulatedContentInfo,
    attributes: Vec<x509_cert::attr::Attribute>,
    certificate: &Certificate,
    key: &RsaPrivateKey,
) -> Result<SignedData>
where
    D: Digest + AssociatedOid + RsaSignatureAssociatedOid,
{
    let signer = SigningKey::<D>::new(key.clone());
    let digest_alg = AlgorithmIdentifierOwned {
        oid: <D as AssociatedOid>::OID,
        parameters: None,
    };
    let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
        issuer: certificate.tbs_certificate.issuer.clone(),
        serial_number: certificate.tbs_certificate.serial_number.clone(),
    });

    let mut signer_info = SignerInfoBuilder::new(&signer, sid, digest_alg.clone(), encap, None)
        .map_err(|e| ScepError::signing(format!("Failed to create signer: {}", e)))?;
    for attr in attributes {
        signer_info
            .add_signed_attribute(attr)
            .map_err(|e| ScepError::signing(format!("Failed to add attribute: {}", e)))?;
    }
    let signing_time = create_signing_time_attribute()
        .map_err(|e| ScepError::signing(format!("Failed to create signingTime: {}", e)))?;
    signer_info
        .add_signed_attribute(signing_time)
        .map_err(|e| ScepError::signing(format!("Failed to add signingTime: {}", e)))?;

    let mut builder = SignedDataBuilder::new(encap);
    builder
        .add_digest_algorithm(digest_alg)
        .map_err(|e| ScepError::signing(e.to_string()))?;
    builder
        .add_signer_info::<SigningKey<D>, rsa::pkcs1v15::Signature>(signer_info)
        .map_err(|e| ScepError::signing(format!("Failed to sign: {}", e)))?;
    let content_info = builder
        .build()
        .map_err(|e| ScepError::signing(format!("Failed to build SignedData: {}", e)))?;

    Ok(SignedData::from_der(&content_info.content.to_der()?)?)
}

/// Verify every SignerInfo of a container.
///
/// A non-empty `trusted` set replaces the embedded certificates as the
/// candidate signer certificates. Returns the certificate that verified the
/// first signer.
pub(crate) fn verify(container: &SignedContainer, trusted: &[Certificate]) -> Result<Certificate> {
    let candidates = if trusted.is_empty() {
        container.certificates.as_slice()
    } else {
        trusted
    };
    let mut first = None;

    for signer in &container.signers {
        let cert = candidates
            .iter()
            .find(|cert| signer_matches(&signer.info.sid, cert))
            .ok_or_else(|| ScepError::signature_invalid("No certificate matches the signer"))?;

        verify_signer(signer, cert, container)?;

        if first.is_none() {
            first = Some(cert.clone());
        }
    }

    first.ok_or_else(|| ScepError::signature_invalid("SignedData has no signers"))
}

fn verify_signer(signer: &Signer, cert: &Certificate, container: &SignedContainer) -> Result<()> {
    let signer_info = &signer.info;
    let digest = DigestAlgorithm::from_oid(&signer_info.digest_alg.oid).ok_or_else(|| {
        ScepError::signature_invalid(format!(
            "Unsupported digest algorithm: {}",
            signer_info.digest_alg.oid
        ))
    })?;

    if !RSA_SIGNATURE_OIDS.contains(&signer_info.signature_algorithm.oid) {
        return Err(ScepError::signature_invalid(format!(
            "Unsupported signature algorithm: {}",
            signer_info.signature_algorithm.oid
        )));
    }

    let (signed_attrs, signed_attrs_der) = signer_info
        .signed_attrs
        .as_ref()
        .zip(signer.signed_attrs_der.as_ref())
        .ok_or_else(|| ScepError::signature_invalid("SignerInfo has no signed attributes"))?;

    let content_type = attribute_value(signed_attrs, ID_CONTENT_TYPE)
        .ok_or_else(|| ScepError::signature_invalid("Missing contentType attribute"))?;
    let content_type = content_type
        .decode_as::<ObjectIdentifier>()
        .map_err(|e| ScepError::signature_invalid(format!("Malformed contentType: {}", e)))?;
    if content_type != container.signed_data.encap_content_info.econtent_type {
        return Err(ScepError::signature_invalid("contentType attribute mismatch"));
    }

    let message_digest = attribute_value(signed_attrs, ID_MESSAGE_DIGEST)
        .ok_or_else(|| ScepError::signature_invalid("Missing messageDigest attribute"))?;
    if message_digest.tag() != Tag::OctetString
        || message_digest.value() != digest.digest(&container.content).as_slice()
    {
        return Err(ScepError::signature_invalid("messageDigest mismatch"));
    }

    let spki_der = cert.tbs_certificate.subject_public_key_info.to_der()?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| ScepError::signature_invalid(format!("Unsupported signer key: {}", e)))?;

    let hashed = digest.digest(signed_attrs_der);
    public_key
        .verify(digest.pkcs1v15(), &hashed, signer_info.signature.as_bytes())
        .map_err(|e| ScepError::signature_invalid(e.to_string()))
}

fn attribute_value(
    attrs: &SetOfVec<x509_cert::attr::Attribute>,
    oid: ObjectIdentifier,
) -> Option<&Any> {
    attrs
        .iter()
        .find(|attr| attr.oid == oid)
        .and_then(|attr| attr.values.iter().next())
}

/// Returns true if `cert` is the certificate named by a signer or recipient identifier.
pub(crate) fn signer_matches(sid: &SignerIdentifier, cert: &Certificate) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(ias) => issuer_and_serial_matches(ias, cert),
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            subject_key_identifier(cert).as_deref() == Some(ski.0.as_bytes())
        }
    }
}

pub(crate) fn issuer_and_serial_matches(ias: &IssuerAndSerialNumber, cert: &Certificate) -> bool {
    ias.issuer == cert.tbs_certificate.issuer
        && ias.serial_number == cert.tbs_certificate.serial_number
}

/// The subject key identifier extension of a certificate, if present.
pub(crate) fn subject_key_identifier(cert: &Certificate) -> Option<Vec<u8>> {
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == SubjectKeyIdentifier::OID)
        .and_then(|ext| SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok())
        .map(|ski| ski.0.as_bytes().to_vec())
}

/// Encode certificates as a degenerate certs-only SignedData.
///
/// The result has no signers and no content; certificates keep the order
/// given.
pub fn degenerate_certificates(certificates: &[Certificate]) -> Result<Vec<u8>> {
    let encap = EncapsulatedContentInfo {
        econtent_type: ID_DATA,
        econtent: None,
    };
    encode_signed_data(
        CmsVersion::V1,
        &SetOfVec::new(),
        &encap,
        certificates,
        &SignerInfos(SetOfVec::new()),
    )
}

/// Extract the certificates of a certs-only SignedData, in wire order.
///
/// Used on GetCACert responses that carry a CA/RA chain.
pub fn ca_certs(data: &[u8]) -> Result<Vec<Certificate>> {
    let container = parse_signed_data(data)?;
    tracing::debug!(
        ca_certs = container.certificates.len(),
        "Parsed certs-only SignedData"
    );
    Ok(container.certificates)
}
