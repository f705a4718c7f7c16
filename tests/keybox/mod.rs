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

//! Keybox fixtures assembled from the certificates and keys under
//! `assets/tests/keybox`.

use std::fs;

use chrono::DateTime;
use keybox_verifier::{RevocationTable, TrustAnchors, Validator};

pub const ASSETS: &str = "assets/tests/keybox";

/// A time inside the validity window of every long lived fixture certificate.
pub const NOW: &str = "2027-06-01T00:00:00Z";

/// Helper function to parse a timestamp string to unix timestamp
pub fn parse_timestamp(ts: &str) -> u64 {
    DateTime::parse_from_rfc3339(ts).unwrap().timestamp() as u64
}

pub fn load_text(path: &str) -> String {
    fs::read_to_string(format!("{ASSETS}/{path}")).unwrap()
}

pub fn anchors() -> TrustAnchors {
    TrustAnchors::load(format!("{ASSETS}/anchors")).unwrap()
}

pub fn status_snapshot() -> RevocationTable {
    RevocationTable::load(format!("{ASSETS}/status.json")).unwrap()
}

pub fn validator(revocations: RevocationTable) -> Validator {
    Validator::new(anchors(), revocations)
}

/// Builder of keybox XML documents, indented the way provisioning tools
/// emit them.
pub struct KeyboxBuilder {
    private_key: Option<String>,
    certificates: Vec<String>,
    count: Option<String>,
}

impl KeyboxBuilder {
    /// Starts from a private key and a chain file, both under the asset dir.
    pub fn new(key: &str, chain: &str) -> Self {
        let buf = fs::read(format!("{ASSETS}/chains/{chain}")).unwrap();
        let certificates = pem::parse_many(buf)
            .unwrap()
            .iter()
            .map(pem::encode)
            .collect();
        KeyboxBuilder {
            private_key: Some(load_text(&format!("keys/{key}"))),
            certificates,
            count: None,
        }
    }

    pub fn count(mut self, count: &str) -> Self {
        self.count = Some(count.into());
        self
    }

    pub fn without_private_key(mut self) -> Self {
        self.private_key = None;
        self
    }

    pub fn private_key(mut self, text: &str) -> Self {
        self.private_key = Some(text.into());
        self
    }

    pub fn certificate(mut self, index: usize, text: &str) -> Self {
        self.certificates[index] = text.into();
        self
    }

    /// Flips the last bit of the certificate at `index`, which lies in its signature.
    pub fn tamper_signature(mut self, index: usize) -> Self {
        let block = pem::parse(&self.certificates[index]).unwrap();
        let mut der = block.contents().to_vec();
        let last = der.len() - 1;
        der[last] ^= 0x01;
        self.certificates[index] = pem::encode(&pem::Pem::new(block.tag(), der));
        self
    }

    pub fn build(self) -> String {
        let indent = |text: &str, pad: &str| -> String {
            text.lines().map(|line| format!("{pad}{line}\n")).collect()
        };
        let mut xml = String::from("<?xml version=\"1.0\"?>\n<AndroidAttestation>\n");
        xml.push_str("    <NumberOfKeyboxes>1</NumberOfKeyboxes>\n");
        xml.push_str("    <Keybox DeviceID=\"integration\">\n");
        xml.push_str("        <Key algorithm=\"ecdsa\">\n");
        if let Some(key) = &self.private_key {
            xml.push_str("            <PrivateKey format=\"pem\">\n");
            xml.push_str(&indent(key, "                "));
            xml.push_str("            </PrivateKey>\n");
        }
        xml.push_str("            <CertificateChain>\n");
        let count = self
            .count
            .clone()
            .unwrap_or_else(|| self.certificates.len().to_string());
        xml.push_str(&format!(
            "                <NumberOfCertificates>{count}</NumberOfCertificates>\n"
        ));
        for certificate in &self.certificates {
            xml.push_str("                <Certificate format=\"pem\">\n");
            xml.push_str(&indent(certificate, "                    "));
            xml.push_str("                </Certificate>\n");
        }
        xml.push_str("            </CertificateChain>\n");
        xml.push_str("        </Key>\n    </Keybox>\n</AndroidAttestation>\n");
        xml
    }
}
