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

//! Keybox XML parsing.
//!
//! A keybox document may carry several `<Key>` blocks. Only the first
//! certificate count and the first private key are considered, and the
//! certificates are taken in document order across the whole file.

use roxmltree::Document;

use crate::keybox::constants::{
    ATTRIBUTE_FORMAT, ELEMENT_CERTIFICATE, ELEMENT_NUMBER_OF_CERTIFICATES, ELEMENT_PRIVATE_KEY,
    FORMAT_PEM,
};

/// Errors that can occur while parsing a keybox document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The document is not well-formed XML.
    Xml,
    /// There is no non-empty `NumberOfCertificates` element.
    MissingCertificateCount,
    /// The certificate count is not a non-negative integer.
    InvalidCertificateCount,
    /// There is no non-empty `PrivateKey` element.
    MissingPrivateKey,
}

/// The raw content of a keybox: declared chain length, PEM certificates
/// (leaf first) and PEM private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Declared number of certificates.
    pub certificate_count: usize,
    /// PEM certificates, truncated to the declared count.
    pub certificates: Vec<String>,
    /// PEM private key text, trimmed.
    pub private_key: String,
}

impl Bundle {
    /// Parses a keybox XML document.
    ///
    /// Fewer certificates than declared is not an error here: the sequence
    /// just holds what the document carries.
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let document = Document::parse(xml).map_err(|e| {
            log::debug!("Keybox is not well-formed XML: {e}");
            ParseError::Xml
        })?;
        let certificate_count = count_certificates(&document)?;
        let certificates = extract_certificates(&document, certificate_count);
        let private_key = extract_private_key(&document)?;
        Ok(Bundle {
            certificate_count,
            certificates,
            private_key,
        })
    }

    /// The leaf certificate, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.certificates.first().map(String::as_str)
    }
}

/// Reads the first `NumberOfCertificates` element anywhere in the document.
pub fn count_certificates(document: &Document) -> Result<usize, ParseError> {
    let text = document
        .descendants()
        .find(|node| node.has_tag_name(ELEMENT_NUMBER_OF_CERTIFICATES))
        .and_then(|node| node.text())
        .ok_or(ParseError::MissingCertificateCount)?;
    text.trim()
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidCertificateCount)
}

/// Collects the PEM text of the first `limit` certificates marked `format="pem"`.
/// A certificate element without text yields an empty string.
pub fn extract_certificates(document: &Document, limit: usize) -> Vec<String> {
    document
        .descendants()
        .filter(|node| {
            node.has_tag_name(ELEMENT_CERTIFICATE)
                && node.attribute(ATTRIBUTE_FORMAT) == Some(FORMAT_PEM)
        })
        .take(limit)
        .map(|node| node.text().map(str::trim).unwrap_or_default().to_owned())
        .collect()
}

/// Reads the first `PrivateKey` element anywhere in the document. Blank text
/// counts as missing.
pub fn extract_private_key(document: &Document) -> Result<String, ParseError> {
    document
        .descendants()
        .find(|node| node.has_tag_name(ELEMENT_PRIVATE_KEY))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .ok_or(ParseError::MissingPrivateKey)
}
