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

//! Attestation trust anchors and root classification.

use std::{fs, path::Path};

use x509_cert::Certificate;

use crate::cert::{canonical_public_key, normalize_pem, spki_der, DecodeError};
use crate::keybox::constants::{
    AOSP_EC_ROOT_FILE, AOSP_RSA_ROOT_FILE, GOOGLE_ROOT_FILE, KNOX_ROOT_FILE, LABEL_PUBLIC_KEY,
};

/// Errors that can occur while loading the trust anchors.
#[derive(Debug)]
pub enum AnchorError {
    /// An anchor file could not be read.
    Io {
        /// The file that failed.
        file: &'static str,
        /// Underlying failure.
        error: std::io::Error,
    },
    /// An anchor file does not hold a supported PEM public key.
    Decode {
        /// The file that failed.
        file: &'static str,
        /// Underlying failure.
        error: DecodeError,
    },
}

/// Classification of a chain root against the trust anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootTrust {
    /// Google hardware attestation root.
    Production,
    /// AOSP software attestation root, EC flavour.
    AospEcTest,
    /// AOSP software attestation root, RSA flavour.
    AospRsaTest,
    /// Samsung Knox attestation root.
    Knox,
    /// Not a known root.
    Unknown,
}

impl RootTrust {
    /// Whether keyboxes rooted here are accepted.
    pub fn is_trusted(self) -> bool {
        matches!(self, RootTrust::Production | RootTrust::Knox)
    }
}

/// The four known root public keys, in canonical SubjectPublicKeyInfo DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchors {
    production: Vec<u8>,
    aosp_ec: Vec<u8>,
    aosp_rsa: Vec<u8>,
    knox: Vec<u8>,
}

impl TrustAnchors {
    /// Loads `google.pem`, `aosp_ec.pem`, `aosp_rsa.pem` and `knox.pem` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, AnchorError> {
        let dir = dir.as_ref();
        let read = |file: &'static str| {
            let text = fs::read_to_string(dir.join(file))
                .map_err(|error| AnchorError::Io { file, error })?;
            decode_anchor(&text).map_err(|error| AnchorError::Decode { file, error })
        };
        Ok(TrustAnchors {
            production: read(GOOGLE_ROOT_FILE)?,
            aosp_ec: read(AOSP_EC_ROOT_FILE)?,
            aosp_rsa: read(AOSP_RSA_ROOT_FILE)?,
            knox: read(KNOX_ROOT_FILE)?,
        })
    }

    /// Builds the anchors from PEM public keys held in memory.
    pub fn from_pems(
        production: &str,
        aosp_ec: &str,
        aosp_rsa: &str,
        knox: &str,
    ) -> Result<Self, DecodeError> {
        Ok(TrustAnchors {
            production: decode_anchor(production)?,
            aosp_ec: decode_anchor(aosp_ec)?,
            aosp_rsa: decode_anchor(aosp_rsa)?,
            knox: decode_anchor(knox)?,
        })
    }

    /// Classifies a DER SubjectPublicKeyInfo. The first matching anchor wins,
    /// in the order production, AOSP EC, AOSP RSA, Knox.
    pub fn classify(&self, spki: &[u8]) -> RootTrust {
        let Ok(key) = canonical_public_key(spki) else {
            return RootTrust::Unknown;
        };
        [
            (&self.production, RootTrust::Production),
            (&self.aosp_ec, RootTrust::AospEcTest),
            (&self.aosp_rsa, RootTrust::AospRsaTest),
            (&self.knox, RootTrust::Knox),
        ]
        .into_iter()
        .find(|(anchor, _)| **anchor == key)
        .map_or(RootTrust::Unknown, |(_, trust)| trust)
    }

    /// Classifies the public key of a chain root.
    pub fn evaluate(&self, root: &Certificate) -> RootTrust {
        let trust = spki_der(root).map_or(RootTrust::Unknown, |spki| self.classify(&spki));
        if trust == RootTrust::Knox {
            log::info!("Found a Knox attestation root");
        }
        trust
    }
}

fn decode_anchor(text: &str) -> Result<Vec<u8>, DecodeError> {
    let block = pem::parse(normalize_pem(text))?;
    if block.tag() != LABEL_PUBLIC_KEY {
        return Err(DecodeError::UnableToLoadPem);
    }
    canonical_public_key(block.contents())
}
