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

//! Checks Android attestation keyboxes against the Google trust model.
//!
//! The revocation status list is obtained once, then every keybox given on
//! the command line is checked and reported as `valid` or `invalid`.

use std::{fs, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use keybox_verifier::{
    fetch_revocation_table, RevocationTable, TrustAnchors, Validator, STATUS_TIMEOUT_SECS,
    STATUS_URL,
};

#[derive(Parser)]
/// Validate Android hardware attestation keyboxes
#[clap(name = "keybox-check", version)]
struct Args {
    /// Directory holding google.pem, aosp_ec.pem, aosp_rsa.pem and knox.pem
    #[clap(long, default_value = "pem")]
    anchors: PathBuf,

    /// Revocation status list endpoint
    #[clap(long, default_value = STATUS_URL)]
    status_url: String,

    /// Read the revocation status list from a file instead of fetching it
    #[clap(long, conflicts_with = "status_url")]
    status_file: Option<PathBuf>,

    /// Status list request timeout, in seconds
    #[clap(long, default_value_t = STATUS_TIMEOUT_SECS)]
    timeout: u64,

    /// Keybox XML files to check
    #[clap(required = true)]
    keyboxes: Vec<PathBuf>,
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

fn revocations(args: &Args) -> Result<RevocationTable> {
    match &args.status_file {
        Some(path) => RevocationTable::load(path)
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("Cannot load status list {}", path.display())),
        None => fetch_revocation_table(&args.status_url, now(), Duration::from_secs(args.timeout))
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("Cannot fetch status list from {}", args.status_url)),
    }
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let anchors = TrustAnchors::load(&args.anchors)
        .map_err(|e| anyhow!("{e:?}"))
        .with_context(|| format!("Cannot load trust anchors from {}", args.anchors.display()))?;
    let table = revocations(&args)?;
    log::info!("Loaded {} status entries", table.len());
    let validator = Validator::new(anchors, table);

    let mut all_valid = true;
    for path in &args.keyboxes {
        let valid = match fs::read_to_string(path) {
            Ok(xml) => validator.check(&xml, now()),
            Err(e) => {
                log::warn!("Cannot read {}: {e}", path.display());
                false
            }
        };
        all_valid &= valid;
        println!(
            "{}: {}",
            path.display(),
            if valid { "valid" } else { "invalid" }
        );
    }

    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
