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

//! Constants for Android keybox validation.

// =============================================================================
// Chain shape
// =============================================================================

/// Deepest certificate chain a keybox may declare.
pub const MAX_CERTIFICATE_COUNT: usize = 3;

// =============================================================================
// Trust anchor files
// =============================================================================

pub const GOOGLE_ROOT_FILE: &str = "google.pem";
pub const AOSP_EC_ROOT_FILE: &str = "aosp_ec.pem";
pub const AOSP_RSA_ROOT_FILE: &str = "aosp_rsa.pem";
pub const KNOX_ROOT_FILE: &str = "knox.pem";

// =============================================================================
// PEM labels
// =============================================================================

pub const LABEL_EC_PRIVATE_KEY: &str = "EC PRIVATE KEY";
pub const LABEL_RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
pub const LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";
pub const LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";

// =============================================================================
// Keybox XML
// =============================================================================

pub const ELEMENT_NUMBER_OF_CERTIFICATES: &str = "NumberOfCertificates";
pub const ELEMENT_CERTIFICATE: &str = "Certificate";
pub const ELEMENT_PRIVATE_KEY: &str = "PrivateKey";
pub const ATTRIBUTE_FORMAT: &str = "format";
pub const FORMAT_PEM: &str = "pem";

// =============================================================================
// Revocation status endpoint
// =============================================================================

/// Google attestation revocation status list.
pub const STATUS_URL: &str = "https://android.googleapis.com/attestation/status";
pub const CACHE_CONTROL: &str = "max-age=0, no-cache, no-store, must-revalidate";
pub const PRAGMA: &str = "no-cache";
pub const EXPIRES: &str = "0";
/// Default timeout of the status list request.
pub const STATUS_TIMEOUT_SECS: u64 = 10;
