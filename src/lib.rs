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

//! Android hardware attestation keybox validation.
//!
//! A keybox is accepted when its leaf certificate is currently valid, matches
//! the bundled private key, chains up by signature to the Google production
//! root (or the Samsung Knox root), declares at most three certificates and
//! has no certificate listed in the attestation revocation status list.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

mod cert;
mod keybox;

pub use crate::{
    cert::{
        canonical_public_key, same_key, verify_chain, CertificateError, DecodeError, PublicKey,
        SignatureAlgorithm,
    },
    keybox::*,
};

/// Check a keybox document at the current system time.
pub fn check_keybox(validator: &Validator, xml: &str) -> bool {
    let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    validator.check(xml, now)
}
