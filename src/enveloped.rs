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

//! CMS EnvelopedData support for SCEP message content.
//!
//! Every SCEP request and successful response carries its payload (a CSR
//! or a degenerate certificate collection) encrypted for the intended
//! recipients. Content is encrypted with a random symmetric key in CBC
//! mode; the key is transported to each recipient with RSA PKCS#1 v1.5.
//!
//! Only key-transport recipients are supported, identified either by
//! issuer and serial number or by subject key identifier.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cms::cert::IssuerAndSerialNumber;
use cms::content_info::{CmsVersion, ContentInfo};
use cms::enveloped_data::{
    EncryptedContentInfo, EnvelopedData, KeyTransRecipientInfo, RecipientIdentifier,
    RecipientInfo, RecipientInfos,
};
use const_oid::ObjectIdentifier;
use der::asn1::{OctetString, SetOfVec};
use der::{Any, Decode, Encode, Tag, Tagged};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use spki::AlgorithmIdentifierOwned;
use tracing::debug;
use x509_cert::Certificate;

use crate::error::{Result, ScepError};
use crate::types::pkcs7::{
    issuer_and_serial_matches, subject_key_identifier, ID_DATA, ID_ENVELOPED_DATA,
};

const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const OID_DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");
const OID_3DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");
const OID_AES_128_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
const OID_AES_192_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
const OID_AES_256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");

/// Supported content encryption algorithms for EnvelopedData.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncryptionAlgorithm {
    /// Single DES CBC. Only for peers that support nothing else.
    DesCbc,
    /// Triple DES (3DES) CBC
    TripleDesCbc,
    /// AES-128-CBC
    #[default]
    Aes128Cbc,
    /// AES-192-CBC
    Aes192Cbc,
    /// AES-256-CBC
    Aes256Cbc,
}

impl ContentEncryptionAlgorithm {
    /// Get the key size in bytes for this algorithm.
    pub fn key_size(&self) -> usize {
        match self {
            Self::DesCbc => 8,
            Self::TripleDesCbc => 24,
            Self::Aes128Cbc => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
        }
    }

    /// Get the block size in bytes for this algorithm.
    pub fn block_size(&self) -> usize {
        match self {
            Self::DesCbc | Self::TripleDesCbc => 8,
            Self::Aes128Cbc | Self::Aes192Cbc | Self::Aes256Cbc => 16,
        }
    }

    /// Get the algorithm name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DesCbc => "DES-CBC",
            Self::TripleDesCbc => "3DES-CBC",
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes192Cbc => "AES-192-CBC",
            Self::Aes256Cbc => "AES-256-CBC",
        }
    }

    /// The algorithm's object identifier.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::DesCbc => OID_DES_CBC,
            Self::TripleDesCbc => OID_3DES_CBC,
            Self::Aes128Cbc => OID_AES_128_CBC,
            Self::Aes192Cbc => OID_AES_192_CBC,
            Self::Aes256Cbc => OID_AES_256_CBC,
        }
    }

    /// Look up an algorithm by object identifier.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            Self::DesCbc,
            Self::TripleDesCbc,
            Self::Aes128Cbc,
            Self::Aes192Cbc,
            Self::Aes256Cbc,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
    }
}

macro_rules! cbc_encrypt {
    ($cipher:ty, $key:expr, $iv:expr, $plaintext:expr) => {
        cbc::Encryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| ScepError::encryption(format!("Failed to create cipher: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>($plaintext)
    };
}

macro_rules! cbc_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $ciphertext:expr) => {
        cbc::Decryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| ScepError::decryption_failed(format!("Failed to create cipher: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>($ciphertext)
            .map_err(|e| ScepError::decryption_failed(format!("Bad padding: {}", e)))?
    };
}

/// Fill a buffer from the operating system's randomness source.
pub(crate) fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| ScepError::RandomnessUnavailable(e.to_string()))?;
    Ok(buf)
}

/// Encrypt content for one or more recipients.
///
/// Returns a DER-encoded ContentInfo holding EnvelopedData.
pub fn encrypt(
    content: &[u8],
    recipients: &[Certificate],
    algorithm: ContentEncryptionAlgorithm,
) -> Result<Vec<u8>> {
    if recipients.is_empty() {
        return Err(ScepError::no_recipients("No certificates to encrypt for"));
    }

    let key = random_bytes(algorithm.key_size())?;
    let iv = random_bytes(algorithm.block_size())?;

    let ciphertext = match algorithm {
        ContentEncryptionAlgorithm::DesCbc => cbc_encrypt!(des::Des, &key, &iv, content),
        ContentEncryptionAlgorithm::TripleDesCbc => {
            cbc_encrypt!(des::TdesEde3, &key, &iv, content)
        }
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_encrypt!(aes::Aes128, &key, &iv, content),
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_encrypt!(aes::Aes192, &key, &iv, content),
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_encrypt!(aes::Aes256, &key, &iv, content),
    };

    let mut recip_infos = SetOfVec::new();
    for cert in recipients {
        recip_infos.insert(RecipientInfo::Ktri(key_trans_recipient(cert, &key)?))?;
    }

    let enveloped = EnvelopedData {
        version: CmsVersion::V0,
        originator_info: None,
        recip_infos: RecipientInfos(recip_infos),
        encrypted_content: EncryptedContentInfo {
            content_type: ID_DATA,
            content_enc_alg: AlgorithmIdentifierOwned {
                oid: algorithm.oid(),
                parameters: Some(Any::new(Tag::OctetString, iv)?),
            },
            encrypted_content: Some(OctetString::new(ciphertext)?),
        },
        unprotected_attrs: None,
    };

    debug!(
        "Encrypted {} bytes with {} for {} recipient(s)",
        content.len(),
        algorithm.as_str(),
        recipients.len()
    );

    let content_info = ContentInfo {
        content_type: ID_ENVELOPED_DATA,
        content: Any::from_der(&enveloped.to_der()?)?,
    };
    Ok(content_info.to_der()?)
}

fn key_trans_recipient(cert: &Certificate, key: &[u8]) -> Result<KeyTransRecipientInfo> {
    let spki_der = cert.tbs_certificate.subject_public_key_info.to_der()?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| ScepError::encryption(format!("Recipient key is not RSA: {}", e)))?;
    let enc_key = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key)
        .map_err(|e| ScepError::encryption(format!("Key transport failed: {}", e)))?;

    Ok(KeyTransRecipientInfo {
        version: CmsVersion::V0,
        rid: RecipientIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        }),
        key_enc_alg: AlgorithmIdentifierOwned {
            oid: OID_RSA_ENCRYPTION,
            parameters: Some(Any::new(Tag::Null, Vec::<u8>::new())?),
        },
        enc_key: OctetString::new(enc_key)?,
    })
}

/// Parse a ContentInfo holding EnvelopedData.
pub fn parse_enveloped_data(data: &[u8]) -> Result<EnvelopedData> {
    debug!("Parsing CMS EnvelopedData ({} bytes)", data.len());

    let content_info = ContentInfo::from_der(data).map_err(|e| {
        ScepError::container_malformed(format!("Failed to parse ContentInfo: {}", e))
    })?;
    if content_info.content_type != ID_ENVELOPED_DATA {
        return Err(ScepError::container_malformed(format!(
            "Expected EnvelopedData OID, got {}",
            content_info.content_type
        )));
    }

    let content = content_info.content.to_der()?;
    EnvelopedData::from_der(&content).map_err(|e| {
        ScepError::container_malformed(format!("Failed to parse EnvelopedData: {}", e))
    })
}

/// Decrypt EnvelopedData addressed to `cert`.
///
/// Fails with `DecryptionFailed` if no recipient matches the certificate,
/// the key cannot unwrap the content key, or the ciphertext is corrupt.
pub fn decrypt(data: &[u8], cert: &Certificate, key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let envelope = parse_enveloped_data(data)?;

    let recipient = envelope
        .recip_infos
        .0
        .iter()
        .find_map(|ri| match ri {
            RecipientInfo::Ktri(ktri) if recipient_matches(&ktri.rid, cert) => Some(ktri),
            _ => None,
        })
        .ok_or_else(|| ScepError::decryption_failed("No recipient matches the certificate"))?;

    let content_key = key
        .decrypt(Pkcs1v15Encrypt, recipient.enc_key.as_bytes())
        .map_err(|e| ScepError::decryption_failed(format!("Key unwrap failed: {}", e)))?;

    let info = &envelope.encrypted_content;
    let algorithm = ContentEncryptionAlgorithm::from_oid(&info.content_enc_alg.oid)
        .ok_or_else(|| {
            ScepError::decryption_failed(format!(
                "Unsupported content encryption algorithm: {}",
                info.content_enc_alg.oid
            ))
        })?;

    let iv = info
        .content_enc_alg
        .parameters
        .as_ref()
        .filter(|p| p.tag() == Tag::OctetString)
        .map(|p| p.value())
        .ok_or_else(|| ScepError::decryption_failed("EnvelopedData missing IV"))?;

    let ciphertext = info
        .encrypted_content
        .as_ref()
        .map(|c| c.as_bytes())
        .unwrap_or_default();

    let decrypted = decrypt_content(ciphertext, &content_key, iv, algorithm)?;

    debug!(
        "Successfully decrypted EnvelopedData ({} bytes)",
        decrypted.len()
    );

    Ok(decrypted)
}

fn recipient_matches(rid: &RecipientIdentifier, cert: &Certificate) -> bool {
    match rid {
        RecipientIdentifier::IssuerAndSerialNumber(ias) => issuer_and_serial_matches(ias, cert),
        RecipientIdentifier::SubjectKeyIdentifier(ski) => {
            subject_key_identifier(cert).as_deref() == Some(ski.0.as_bytes())
        }
    }
}

/// Decrypt content using symmetric encryption.
fn decrypt_content(
    encrypted: &[u8],
    key: &[u8],
    iv: &[u8],
    algorithm: ContentEncryptionAlgorithm,
) -> Result<Vec<u8>> {
    let expected_iv_size = algorithm.block_size();
    if iv.len() != expected_iv_size {
        return Err(ScepError::decryption_failed(format!(
            "Invalid IV size: expected {}, got {}",
            expected_iv_size,
            iv.len()
        )));
    }
    if key.len() != algorithm.key_size() {
        return Err(ScepError::decryption_failed(format!(
            "Invalid key size for {}: expected {}, got {}",
            algorithm.as_str(),
            algorithm.key_size(),
            key.len()
        )));
    }

    let decrypted = match algorithm {
        ContentEncryptionAlgorithm::DesCbc => cbc_decrypt!(des::Des, key, iv, encrypted),
        ContentEncryptionAlgorithm::TripleDesCbc => {
            cbc_decrypt!(des::TdesEde3, key, iv, encrypted)
        }
        ContentEncryptionAlgorithm::Aes128Cbc => cbc_decrypt!(aes::Aes128, key, iv, encrypted),
        ContentEncryptionAlgorithm::Aes192Cbc => cbc_decrypt!(aes::Aes192, key, iv, encrypted),
        ContentEncryptionAlgorithm::Aes256Cbc => cbc_decrypt!(aes::Aes256, key, iv, encrypted),
    };

    Ok(decrypted)
}
