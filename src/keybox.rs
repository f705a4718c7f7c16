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

mod anchors;
mod bundle;
mod constants;
mod key;
mod status;
mod validator;

pub use anchors::{AnchorError, RootTrust, TrustAnchors};
pub use bundle::{Bundle, ParseError};
pub use constants::{MAX_CERTIFICATE_COUNT, STATUS_TIMEOUT_SECS, STATUS_URL};
pub use key::PrivateKey;
#[cfg(feature = "fetch")]
pub use status::fetch_revocation_table;
pub use status::{RevocationEntry, RevocationTable, StatusError};
pub use validator::{InvalidReason, Validator, Verdict};
