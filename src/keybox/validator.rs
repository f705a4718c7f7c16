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

//! Keybox validation gates.

use crate::cert::{
    check_validity, decode_certificate, decode_chain, same_key, serial_hex, spki_der,
    verify_chain, CertificateError, DecodeError,
};
use crate::keybox::{
    anchors::{RootTrust, TrustAnchors},
    bundle::{Bundle, ParseError},
    constants::MAX_CERTIFICATE_COUNT,
    key::PrivateKey,
    status::RevocationTable,
};

/// The gate at which a keybox was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The keybox document could not be parsed.
    Parse(ParseError),
    /// The leaf certificate could not be decoded.
    LeafCertificate(DecodeError),
    /// The private key could not be decoded.
    PrivateKey(DecodeError),
    /// The leaf certificate is outside its validity window.
    LeafValidity(CertificateError),
    /// The private key does not belong to the leaf certificate.
    KeyMismatch,
    /// The certificate chain does not verify.
    Chain(CertificateError),
    /// The chain root is not an accepted trust anchor.
    UntrustedRoot(RootTrust),
    /// More certificates are declared than allowed.
    ChainTooLong(usize),
    /// A certificate of the chain is revoked or suspended.
    Revoked {
        /// Position of the certificate in the chain.
        index: usize,
        /// Its serial number in lowercase hex.
        serial: String,
    },
}

impl InvalidReason {
    /// Truncated or malformed PEM armour is common in the wild and is not
    /// worth an operator log line, wherever it shows up in the keybox. The
    /// verdict is unaffected.
    pub fn is_suppressed(&self) -> bool {
        matches!(
            self,
            InvalidReason::LeafCertificate(DecodeError::MalformedFraming | DecodeError::UnableToLoadPem)
                | InvalidReason::PrivateKey(DecodeError::MalformedFraming | DecodeError::UnableToLoadPem)
                | InvalidReason::Chain(CertificateError::Decode {
                    error: DecodeError::MalformedFraming | DecodeError::UnableToLoadPem,
                    ..
                })
        )
    }
}

/// Outcome of a keybox that passed every gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// The anchor the chain ends at.
    pub root: RootTrust,
    /// Number of certificates checked.
    pub chain_length: usize,
}

/// Checks keyboxes against a fixed set of trust anchors and a revocation snapshot.
#[derive(Debug, Clone)]
pub struct Validator {
    anchors: TrustAnchors,
    revocations: RevocationTable,
}

impl Validator {
    /// Builds a validator. Both inputs are kept unchanged for every check.
    pub fn new(anchors: TrustAnchors, revocations: RevocationTable) -> Self {
        Validator {
            anchors,
            revocations,
        }
    }

    /// Whether the keybox is valid at `now` (unix seconds).
    ///
    /// Every failure collapses to `false`; the reason is logged unless it is
    /// one of the expected PEM framing errors.
    pub fn check(&self, xml: &str, now: u64) -> bool {
        match self.verify(xml, now) {
            Ok(verdict) => {
                log::debug!("Keybox accepted: {verdict:?}");
                true
            }
            Err(reason) => {
                if !reason.is_suppressed() {
                    log::warn!("Keybox rejected: {reason:?}");
                }
                false
            }
        }
    }

    /// Runs the gates in order and reports the first one that fails.
    pub fn verify(&self, xml: &str, now: u64) -> Result<Verdict, InvalidReason> {
        let bundle = Bundle::parse(xml).map_err(InvalidReason::Parse)?;

        let leaf = bundle
            .leaf()
            .ok_or(DecodeError::MissingCertificate)
            .and_then(decode_certificate)
            .map_err(InvalidReason::LeafCertificate)?;
        let private_key =
            PrivateKey::from_pem(&bundle.private_key).map_err(InvalidReason::PrivateKey)?;

        check_validity(&leaf, now).map_err(InvalidReason::LeafValidity)?;

        let certified = spki_der(&leaf).map_err(InvalidReason::LeafCertificate)?;
        let derived = private_key
            .public_key()
            .to_spki_der()
            .map_err(InvalidReason::PrivateKey)?;
        if !same_key(&certified, &derived) {
            return Err(InvalidReason::KeyMismatch);
        }

        let chain = decode_chain(&bundle.certificates).map_err(InvalidReason::Chain)?;
        verify_chain(&chain).map_err(InvalidReason::Chain)?;
        log::debug!("Certificate chain of {} verified", chain.len());

        // a leaf was decoded above, so the chain is not empty
        let root = chain
            .last()
            .map_or(RootTrust::Unknown, |root| self.anchors.evaluate(root));
        if !root.is_trusted() {
            return Err(InvalidReason::UntrustedRoot(root));
        }

        if bundle.certificate_count > MAX_CERTIFICATE_COUNT {
            return Err(InvalidReason::ChainTooLong(bundle.certificate_count));
        }

        let serials: Vec<String> = chain.iter().map(serial_hex).collect();
        if let Some(entry) = self.revocations.first_revoked(&serials) {
            log::info!(
                "Certificate {} is listed as {} ({})",
                entry.serial,
                entry.status().unwrap_or("revoked"),
                entry.reason().unwrap_or("no reason given")
            );
            let index = serials
                .iter()
                .position(|serial| serial == entry.serial)
                .unwrap_or_default();
            return Err(InvalidReason::Revoked {
                index,
                serial: entry.serial.to_owned(),
            });
        }

        Ok(Verdict {
            root,
            chain_length: chain.len(),
        })
    }
}

#[cfg(test)]
mod should {
    use super::*;
    use assert_ok::assert_ok;
    use chrono::DateTime;
    use rstest::rstest;
    use serde_json::json;
    use std::fs;

    const NOW: &str = "2027-06-01T00:00:00Z";

    fn timestamp(ts: &str) -> u64 {
        DateTime::parse_from_rfc3339(ts).unwrap().timestamp() as u64
    }

    fn validator(revocations: RevocationTable) -> Validator {
        let anchors = TrustAnchors::load("assets/tests/keybox/anchors").unwrap();
        Validator::new(anchors, revocations)
    }

    fn keybox(key: &str, chain: &str, count: Option<usize>) -> String {
        let key = fs::read_to_string(format!("assets/tests/keybox/keys/{key}")).unwrap();
        let buf = fs::read(format!("assets/tests/keybox/chains/{chain}")).unwrap();
        let pems = pem::parse_many(buf).unwrap();
        let certificates: String = pems
            .iter()
            .map(|p| format!("<Certificate format=\"pem\">\n{}</Certificate>\n", pem::encode(p)))
            .collect();
        format!(
            "<AndroidAttestation><Keybox DeviceID=\"test\"><Key algorithm=\"ecdsa\">\
             <PrivateKey format=\"pem\">\n{key}</PrivateKey>\
             <CertificateChain><NumberOfCertificates>{}</NumberOfCertificates>\n{certificates}\
             </CertificateChain></Key></Keybox></AndroidAttestation>",
            count.unwrap_or(pems.len())
        )
    }

    #[test]
    fn accept_fixture_keybox() {
        let xml = fs::read_to_string("assets/tests/keybox/keybox.xml").unwrap();
        let table = RevocationTable::load("assets/tests/keybox/status.json").unwrap();
        let verdict = assert_ok!(validator(table).verify(&xml, timestamp(NOW)));
        assert_eq!(
            verdict,
            Verdict {
                root: RootTrust::Production,
                chain_length: 3
            }
        );
    }

    #[rstest]
    #[case("leaf_ec.pem", "google.pem", RootTrust::Production)]
    #[case("leaf_ec_pkcs8.pem", "google.pem", RootTrust::Production)]
    #[case("leaf_rsa.pem", "google_rsa_leaf.pem", RootTrust::Production)]
    #[case("leaf_ec.pem", "knox.pem", RootTrust::Knox)]
    #[case("leaf_ec384.pem", "knox_p384_sha1.pem", RootTrust::Knox)]
    fn accept_trusted_roots(#[case] key: &str, #[case] chain: &str, #[case] root: RootTrust) {
        let verdict = assert_ok!(validator(RevocationTable::default())
            .verify(&keybox(key, chain, None), timestamp(NOW)));
        assert_eq!(verdict.root, root);
    }

    #[rstest]
    #[case("aosp_ec.pem", RootTrust::AospEcTest)]
    #[case("aosp_rsa.pem", RootTrust::AospRsaTest)]
    #[case("unknown.pem", RootTrust::Unknown)]
    fn reject_untrusted_roots(#[case] chain: &str, #[case] root: RootTrust) {
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec.pem", chain, None), timestamp(NOW)),
            Err(InvalidReason::UntrustedRoot(root))
        );
    }

    #[rstest]
    #[case("google_short_lived.pem", NOW, CertificateError::CertificateExpired)]
    #[case("google.pem", "2026-01-01T00:00:00Z", CertificateError::CertificateNotYetValid)]
    fn reject_leaf_outside_validity(
        #[case] chain: &str,
        #[case] now: &str,
        #[case] expected: CertificateError,
    ) {
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec.pem", chain, None), timestamp(now)),
            Err(InvalidReason::LeafValidity(expected))
        );
    }

    #[test]
    fn check_validity_before_key_match() {
        assert_eq!(
            validator(RevocationTable::default()).verify(
                &keybox("other_ec.pem", "google_short_lived.pem", None),
                timestamp(NOW)
            ),
            Err(InvalidReason::LeafValidity(CertificateError::CertificateExpired))
        );
    }

    #[rstest]
    #[case("other_ec.pem", "google.pem")]
    #[case("leaf_rsa.pem", "google.pem")]
    #[case("leaf_ec.pem", "google_rsa_leaf.pem")]
    fn reject_foreign_private_key(#[case] key: &str, #[case] chain: &str) {
        assert_eq!(
            validator(RevocationTable::default()).verify(&keybox(key, chain, None), timestamp(NOW)),
            Err(InvalidReason::KeyMismatch)
        );
    }

    #[rstest]
    #[case("p521_sha1.pem")]
    #[case("p521_sha256.pem")]
    #[case("p521_sha512.pem")]
    fn verify_p521_chain_up_to_root_gate(#[case] chain: &str) {
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec521.pem", chain, None), timestamp(NOW)),
            Err(InvalidReason::UntrustedRoot(RootTrust::Unknown))
        );
    }

    #[test]
    fn reject_unsupported_signature_algorithm() {
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec.pem", "rsa_sha224.pem", None), timestamp(NOW)),
            Err(InvalidReason::Chain(CertificateError::UnsupportedAlgorithm {
                index: 1
            }))
        );
    }

    #[test]
    fn reject_deep_chain_after_root_check() {
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec.pem", "google_four_links.pem", None), timestamp(NOW)),
            Err(InvalidReason::ChainTooLong(4))
        );
    }

    #[test]
    fn evaluate_root_of_truncated_chain() {
        // the intermediate becomes the root of a two certificate chain
        assert_eq!(
            validator(RevocationTable::default())
                .verify(&keybox("leaf_ec.pem", "google.pem", Some(2)), timestamp(NOW)),
            Err(InvalidReason::UntrustedRoot(RootTrust::Unknown))
        );
    }

    #[test]
    fn reject_keybox_without_certificates() {
        let reason = validator(RevocationTable::default())
            .verify(&keybox("leaf_ec.pem", "google.pem", Some(0)), timestamp(NOW))
            .unwrap_err();
        assert_eq!(
            reason,
            InvalidReason::LeafCertificate(DecodeError::MissingCertificate)
        );
        assert!(!reason.is_suppressed());
    }

    #[rstest]
    #[case("a1b2c", 0)]
    #[case("5f641897b6861d5994a20e80ba2a7b08", 1)]
    #[case("E8FA196314D2FA18", 2)]
    fn reject_revoked_certificate(#[case] serial: &str, #[case] index: usize) {
        let table = RevocationTable::from_entries([(serial, json!({"status": "REVOKED"}))]);
        assert_eq!(
            validator(table).verify(&keybox("leaf_ec.pem", "google.pem", None), timestamp(NOW)),
            Err(InvalidReason::Revoked {
                index,
                serial: serial.to_ascii_lowercase()
            })
        );
    }

    #[test]
    fn report_first_revoked_certificate() {
        let table = RevocationTable::from_entries([
            ("e8fa196314d2fa18", json!({"status": "REVOKED"})),
            ("5f641897b6861d5994a20e80ba2a7b08", json!({"status": "SUSPENDED"})),
        ]);
        assert!(matches!(
            validator(table).verify(&keybox("leaf_ec.pem", "google.pem", None), timestamp(NOW)),
            Err(InvalidReason::Revoked { index: 1, .. })
        ));
    }

    #[rstest]
    #[case(InvalidReason::LeafCertificate(DecodeError::MalformedFraming), true)]
    #[case(InvalidReason::LeafCertificate(DecodeError::UnableToLoadPem), true)]
    #[case(InvalidReason::PrivateKey(DecodeError::MalformedFraming), true)]
    #[case(
        InvalidReason::Chain(CertificateError::Decode { index: 1, error: DecodeError::MalformedFraming }),
        true
    )]
    #[case(
        InvalidReason::Chain(CertificateError::Decode { index: 2, error: DecodeError::UnableToLoadPem }),
        true
    )]
    #[case(
        InvalidReason::Chain(CertificateError::Decode { index: 2, error: DecodeError::Der }),
        false
    )]
    #[case(InvalidReason::Chain(CertificateError::BadSignature { index: 1 }), false)]
    #[case(InvalidReason::LeafCertificate(DecodeError::Der), false)]
    #[case(InvalidReason::PrivateKey(DecodeError::UnsupportedKey), false)]
    #[case(InvalidReason::Parse(ParseError::MissingPrivateKey), false)]
    #[case(InvalidReason::KeyMismatch, false)]
    fn suppress_only_pem_framing_noise(#[case] reason: InvalidReason, #[case] suppressed: bool) {
        assert_eq!(reason.is_suppressed(), suppressed);
    }

    #[test]
    fn collapse_reasons_to_false() {
        let validator = validator(RevocationTable::default());
        let now = timestamp(NOW);
        assert!(validator.check(&keybox("leaf_ec.pem", "google.pem", None), now));
        assert!(!validator.check("<Keybox/>", now));
        assert!(!validator.check(&keybox("other_ec.pem", "google.pem", None), now));
    }
}
