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

//! Keybox private key decoding.

use rsa::{
    pkcs1::DecodeRsaPrivateKey,
    pkcs8::{DecodePrivateKey, PrivateKeyInfo},
    RsaPrivateKey, RsaPublicKey,
};

use crate::cert::{
    normalize_pem, DecodeError, PublicKey, EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP256R1, SECP384R1,
    SECP521R1,
};
use crate::keybox::constants::{LABEL_EC_PRIVATE_KEY, LABEL_PRIVATE_KEY, LABEL_RSA_PRIVATE_KEY};

/// A decoded keybox private key.
#[derive(Clone)]
pub enum PrivateKey {
    /// RSA key.
    Rsa(RsaPrivateKey),
    /// ECDSA key on NIST P-256.
    P256(p256::SecretKey),
    /// ECDSA key on NIST P-384.
    P384(p384::SecretKey),
    /// ECDSA key on NIST P-521.
    P521(p521::SecretKey),
}

// Key material must never reach the logs.
impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self {
            PrivateKey::Rsa(_) => "Rsa",
            PrivateKey::P256(_) => "P256",
            PrivateKey::P384(_) => "P384",
            PrivateKey::P521(_) => "P521",
        };
        f.debug_tuple("PrivateKey").field(&kind).finish()
    }
}

impl PrivateKey {
    /// Decodes a PEM private key in SEC1, PKCS#1 or unencrypted PKCS#8 form.
    ///
    /// Leading indentation on each line is ignored.
    pub fn from_pem(text: &str) -> Result<Self, DecodeError> {
        let block = pem::parse(normalize_pem(text))?;
        let der = block.contents();
        match block.tag() {
            LABEL_EC_PRIVATE_KEY => decode_sec1(der),
            LABEL_RSA_PRIVATE_KEY => RsaPrivateKey::from_pkcs1_der(der)
                .map(PrivateKey::Rsa)
                .map_err(|_| DecodeError::Der),
            LABEL_PRIVATE_KEY => decode_pkcs8(der),
            _ => Err(DecodeError::UnsupportedKey),
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(key) => PublicKey::Rsa(RsaPublicKey::from(key)),
            PrivateKey::P256(key) => PublicKey::P256(key.public_key()),
            PrivateKey::P384(key) => PublicKey::P384(key.public_key()),
            PrivateKey::P521(key) => PublicKey::P521(key.public_key()),
        }
    }
}

// SEC1 keys name their curve in the optional parameters.
fn decode_sec1(der: &[u8]) -> Result<PrivateKey, DecodeError> {
    if let Ok(key) = p256::SecretKey::from_sec1_der(der) {
        return Ok(PrivateKey::P256(key));
    }
    if let Ok(key) = p384::SecretKey::from_sec1_der(der) {
        return Ok(PrivateKey::P384(key));
    }
    p521::SecretKey::from_sec1_der(der)
        .map(PrivateKey::P521)
        .map_err(|_| DecodeError::Der)
}

fn decode_pkcs8(der: &[u8]) -> Result<PrivateKey, DecodeError> {
    let info = PrivateKeyInfo::try_from(der).map_err(|_| DecodeError::Der)?;
    if info.algorithm.oid == RSA_ENCRYPTION {
        return RsaPrivateKey::from_pkcs8_der(der)
            .map(PrivateKey::Rsa)
            .map_err(|_| DecodeError::Der);
    }
    if info.algorithm.oid != EC_PUBLIC_KEY {
        return Err(DecodeError::UnsupportedKey);
    }
    match info.algorithm.parameters_oid() {
        Ok(curve) if curve == SECP256R1 => p256::SecretKey::from_pkcs8_der(der)
            .map(PrivateKey::P256)
            .map_err(|_| DecodeError::Der),
        Ok(curve) if curve == SECP384R1 => p384::SecretKey::from_pkcs8_der(der)
            .map(PrivateKey::P384)
            .map_err(|_| DecodeError::Der),
        Ok(curve) if curve == SECP521R1 => p521::SecretKey::from_pkcs8_der(der)
            .map(PrivateKey::P521)
            .map_err(|_| DecodeError::Der),
        Ok(_) => Err(DecodeError::UnsupportedKey),
        Err(_) => Err(DecodeError::Der),
    }
}
