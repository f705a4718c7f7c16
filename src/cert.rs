// Copyright 2025, Horizen Labs, Inc.
// SPDX-License-Identifier: Apache-2.0
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

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{pkcs1v15, signature::Verifier, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::{DecodePublicKey, EncodePublicKey, ObjectIdentifier, SubjectPublicKeyInfoRef};
use x509_cert::{
    der::{oid::AssociatedOid, Decode, Encode},
    Certificate,
};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

pub(crate) const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub(crate) const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub(crate) const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
pub(crate) const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
pub(crate) const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

const P256_FIELD_SIZE: usize = 32;
const P384_FIELD_SIZE: usize = 48;
const P521_FIELD_SIZE: usize = 66;

/// Errors that can occur while decoding PEM or DER encoded material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The PEM armour is broken (unbalanced or garbled BEGIN/END lines).
    MalformedFraming,
    /// No usable PEM block could be loaded from the text.
    UnableToLoadPem,
    /// The PEM payload is not valid DER for the expected structure.
    Der,
    /// The key algorithm or curve is not supported.
    UnsupportedKey,
    /// There is no certificate where one is required.
    MissingCertificate,
}

impl From<pem::PemError> for DecodeError {
    fn from(error: pem::PemError) -> Self {
        match error {
            pem::PemError::MalformedFraming => DecodeError::MalformedFraming,
            _ => DecodeError::UnableToLoadPem,
        }
    }
}

/// Errors that can occur during certificate operations.
///
/// Chain errors carry the index of the child certificate of the failing link,
/// counted from the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// A certificate of the chain could not be decoded.
    Decode {
        /// Position of the certificate in the chain.
        index: usize,
        /// Underlying decoding failure.
        error: DecodeError,
    },
    /// The issuer of a certificate is not the subject of the next one.
    IssuerMismatch {
        /// Position of the child certificate.
        index: usize,
    },
    /// The signature algorithm is outside the supported set.
    UnsupportedAlgorithm {
        /// Position of the child certificate.
        index: usize,
    },
    /// The parent key cannot produce signatures of the child's algorithm.
    KeyMismatch {
        /// Position of the child certificate.
        index: usize,
    },
    /// The signature is invalid.
    BadSignature {
        /// Position of the child certificate.
        index: usize,
    },
    /// The certificate is not yet valid.
    CertificateNotYetValid,
    /// The certificate has expired.
    CertificateExpired,
}

/// Signature schemes accepted on chain links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// `sha1WithRSAEncryption`
    RsaSha1,
    /// `sha256WithRSAEncryption`
    RsaSha256,
    /// `sha384WithRSAEncryption`
    RsaSha384,
    /// `sha512WithRSAEncryption`
    RsaSha512,
    /// `ecdsa-with-SHA1`
    EcdsaSha1,
    /// `ecdsa-with-SHA256`
    EcdsaSha256,
    /// `ecdsa-with-SHA384`
    EcdsaSha384,
    /// `ecdsa-with-SHA512`
    EcdsaSha512,
}

#[derive(Debug)]
enum SignatureError {
    KeyMismatch,
    Invalid,
}

impl SignatureAlgorithm {
    /// Maps a signature algorithm identifier to a supported scheme.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            o if o == SHA1_WITH_RSA => Some(Self::RsaSha1),
            o if o == SHA256_WITH_RSA => Some(Self::RsaSha256),
            o if o == SHA384_WITH_RSA => Some(Self::RsaSha384),
            o if o == SHA512_WITH_RSA => Some(Self::RsaSha512),
            o if o == ECDSA_WITH_SHA1 => Some(Self::EcdsaSha1),
            o if o == ECDSA_WITH_SHA256 => Some(Self::EcdsaSha256),
            o if o == ECDSA_WITH_SHA384 => Some(Self::EcdsaSha384),
            o if o == ECDSA_WITH_SHA512 => Some(Self::EcdsaSha512),
            _ => None,
        }
    }

    fn verify(self, key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        match self {
            Self::RsaSha1 => verify_rsa::<Sha1>(key, message, signature),
            Self::RsaSha256 => verify_rsa::<Sha256>(key, message, signature),
            Self::RsaSha384 => verify_rsa::<Sha384>(key, message, signature),
            Self::RsaSha512 => verify_rsa::<Sha512>(key, message, signature),
            Self::EcdsaSha1 => verify_ecdsa(key, &Sha1::digest(message), signature),
            Self::EcdsaSha256 => verify_ecdsa(key, &Sha256::digest(message), signature),
            Self::EcdsaSha384 => verify_ecdsa(key, &Sha384::digest(message), signature),
            Self::EcdsaSha512 => verify_ecdsa(key, &Sha512::digest(message), signature),
        }
    }
}

fn verify_rsa<D>(key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<(), SignatureError>
where
    D: Digest + AssociatedOid,
{
    let PublicKey::Rsa(key) = key else {
        return Err(SignatureError::KeyMismatch);
    };
    let signature =
        pkcs1v15::Signature::try_from(signature).map_err(|_| SignatureError::Invalid)?;
    pkcs1v15::VerifyingKey::<D>::new(key.clone())
        .verify(message, &signature)
        .map_err(|_| SignatureError::Invalid)
}

fn verify_ecdsa(key: &PublicKey, prehash: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    match key {
        PublicKey::P256(key) => {
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| SignatureError::Invalid)?;
            p256::ecdsa::VerifyingKey::from(key)
                .verify_prehash(&field_prehash(prehash, P256_FIELD_SIZE), &signature)
                .map_err(|_| SignatureError::Invalid)
        }
        PublicKey::P384(key) => {
            let signature = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| SignatureError::Invalid)?;
            p384::ecdsa::VerifyingKey::from(key)
                .verify_prehash(&field_prehash(prehash, P384_FIELD_SIZE), &signature)
                .map_err(|_| SignatureError::Invalid)
        }
        PublicKey::P521(key) => {
            let signature = p521::ecdsa::Signature::from_der(signature)
                .map_err(|_| SignatureError::Invalid)?;
            p521::ecdsa::VerifyingKey::from_sec1_bytes(&key.to_sec1_bytes())
                .map_err(|_| SignatureError::Invalid)?
                .verify_prehash(&field_prehash(prehash, P521_FIELD_SIZE), &signature)
                .map_err(|_| SignatureError::Invalid)
        }
        PublicKey::Rsa(_) => Err(SignatureError::KeyMismatch),
    }
}

/// Left pads a digest shorter than the curve order, e.g. SHA-1 on P-384 or
/// SHA-512 on P-521.
/// Longer digests are truncated by the verifier itself.
fn field_prehash(prehash: &[u8], field_size: usize) -> Vec<u8> {
    if prehash.len() >= field_size {
        return prehash.to_vec();
    }
    let mut padded = vec![0u8; field_size - prehash.len()];
    padded.extend_from_slice(prehash);
    padded
}

/// A decoded public key of one of the supported algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA key of any size.
    Rsa(RsaPublicKey),
    /// ECDSA key on NIST P-256.
    P256(p256::PublicKey),
    /// ECDSA key on NIST P-384.
    P384(p384::PublicKey),
    /// ECDSA key on NIST P-521.
    P521(p521::PublicKey),
}

impl PublicKey {
    /// Decodes a DER encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, DecodeError> {
        let spki = SubjectPublicKeyInfoRef::try_from(der).map_err(|_| DecodeError::Der)?;
        if spki.algorithm.oid == RSA_ENCRYPTION {
            return RsaPublicKey::from_public_key_der(der)
                .map(PublicKey::Rsa)
                .map_err(|_| DecodeError::Der);
        }
        if spki.algorithm.oid != EC_PUBLIC_KEY {
            return Err(DecodeError::UnsupportedKey);
        }
        let curve = spki
            .algorithm
            .parameters_oid()
            .map_err(|_| DecodeError::Der)?;
        if curve == SECP256R1 {
            p256::PublicKey::from_public_key_der(der)
                .map(PublicKey::P256)
                .map_err(|_| DecodeError::Der)
        } else if curve == SECP384R1 {
            p384::PublicKey::from_public_key_der(der)
                .map(PublicKey::P384)
                .map_err(|_| DecodeError::Der)
        } else if curve == SECP521R1 {
            p521::PublicKey::from_public_key_der(der)
                .map(PublicKey::P521)
                .map_err(|_| DecodeError::Der)
        } else {
            Err(DecodeError::UnsupportedKey)
        }
    }

    /// Decodes the subject public key of a certificate.
    pub fn from_certificate(cert: &Certificate) -> Result<Self, DecodeError> {
        Self::from_spki_der(&spki_der(cert)?)
    }

    /// Encodes the key as a DER SubjectPublicKeyInfo.
    pub fn to_spki_der(&self) -> Result<Vec<u8>, DecodeError> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::P256(key) => key.to_public_key_der(),
            PublicKey::P384(key) => key.to_public_key_der(),
            PublicKey::P521(key) => key.to_public_key_der(),
        }
        .map_err(|_| DecodeError::Der)?;
        Ok(document.into_vec())
    }
}

/// Returns the DER encoded SubjectPublicKeyInfo of a certificate, as carried.
pub fn spki_der(cert: &Certificate) -> Result<Vec<u8>, DecodeError> {
    cert.tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|_| DecodeError::Der)
}

/// Brings a SubjectPublicKeyInfo to its canonical DER form.
///
/// Keys of supported algorithms are decoded and re-encoded, so e.g. compressed
/// and uncompressed EC points of the same key canonicalise identically. Keys of
/// other algorithms are kept as they are.
pub fn canonical_public_key(der: &[u8]) -> Result<Vec<u8>, DecodeError> {
    match PublicKey::from_spki_der(der) {
        Ok(key) => key.to_spki_der(),
        Err(DecodeError::UnsupportedKey) => Ok(der.to_vec()),
        Err(e) => Err(e),
    }
}

/// Tells whether two DER encoded public keys are the same key.
///
/// Undecodable keys never match.
pub fn same_key(a: &[u8], b: &[u8]) -> bool {
    match (canonical_public_key(a), canonical_public_key(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Strips leading whitespace from every line and drops blank lines, so that
/// PEM text indented inside an XML element keeps a valid framing.
pub fn normalize_pem(text: &str) -> String {
    text.lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes a single PEM encoded certificate.
pub fn decode_certificate(pem_text: &str) -> Result<Certificate, DecodeError> {
    let block = pem::parse(normalize_pem(pem_text))?;
    if block.tag() != CERTIFICATE_LABEL {
        return Err(DecodeError::UnableToLoadPem);
    }
    Certificate::from_der(block.contents()).map_err(|_| DecodeError::Der)
}

/// Decodes an ordered list of PEM certificates, leaf first.
pub fn decode_chain<S: AsRef<str>>(pems: &[S]) -> Result<Vec<Certificate>, CertificateError> {
    pems.iter()
        .enumerate()
        .map(|(index, pem)| {
            decode_certificate(pem.as_ref()).map_err(|error| CertificateError::Decode { index, error })
        })
        .collect()
}

/// Verifies issuer linkage and signatures between consecutive certificates.
///
/// The chain is ordered leaf first. A single certificate has no links and
/// verifies trivially. Validity windows and revocation are not checked here.
pub fn verify_chain(chain: &[Certificate]) -> Result<(), CertificateError> {
    for (index, link) in chain.windows(2).enumerate() {
        let (child, parent) = (&link[0], &link[1]);
        if child.tbs_certificate.issuer != parent.tbs_certificate.subject {
            return Err(CertificateError::IssuerMismatch { index });
        }

        let algorithm = SignatureAlgorithm::from_oid(&child.signature_algorithm.oid)
            .ok_or(CertificateError::UnsupportedAlgorithm { index })?;
        let key = PublicKey::from_certificate(parent).map_err(|error| match error {
            DecodeError::UnsupportedKey => CertificateError::KeyMismatch { index },
            error => CertificateError::Decode {
                index: index + 1,
                error,
            },
        })?;

        let tbs = child
            .tbs_certificate
            .to_der()
            .map_err(|_| CertificateError::Decode {
                index,
                error: DecodeError::Der,
            })?;
        let signature = child
            .signature
            .as_bytes()
            .ok_or(CertificateError::BadSignature { index })?;

        algorithm
            .verify(&key, &tbs, signature)
            .map_err(|error| match error {
                SignatureError::KeyMismatch => CertificateError::KeyMismatch { index },
                SignatureError::Invalid => CertificateError::BadSignature { index },
            })?;
    }
    Ok(())
}

/// Checks that `now` (unix seconds) lies within the validity window, bounds included.
pub fn check_validity(cert: &Certificate, now: u64) -> Result<(), CertificateError> {
    let validity = &cert.tbs_certificate.validity;
    if now < validity.not_before.to_unix_duration().as_secs() {
        return Err(CertificateError::CertificateNotYetValid);
    }
    if now > validity.not_after.to_unix_duration().as_secs() {
        return Err(CertificateError::CertificateExpired);
    }
    Ok(())
}

/// Formats the serial number as lowercase hex without prefix or leading zeros.
pub fn serial_hex(cert: &Certificate) -> String {
    let encoded = hex::encode(cert.tbs_certificate.serial_number.as_bytes());
    match encoded.trim_start_matches('0') {
        "" => "0".into(),
        digits => digits.into(),
    }
}
