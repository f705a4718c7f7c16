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

//! Attestation revocation status list.
//!
//! The list maps lowercase hex serial numbers to opaque status records. It
//! is loaded once and treated as a snapshot for every check that follows.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use serde_json::Value;

/// Errors that can occur while obtaining the revocation status list.
#[derive(Debug)]
pub enum StatusError {
    /// The request could not be sent or timed out.
    Request,
    /// The endpoint answered with something other than 200 OK.
    HttpStatus(u16),
    /// The response body could not be read.
    Body,
    /// The document is not a status list.
    Parse,
    /// A local status snapshot could not be read.
    Io(std::io::Error),
}

#[derive(Debug, Deserialize)]
struct StatusList {
    entries: HashMap<String, Value>,
}

/// A point-in-time snapshot of revoked or suspended serial numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevocationTable {
    entries: HashMap<String, Value>,
}

/// A status record found for one certificate serial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevocationEntry<'a> {
    /// Serial as a lowercase hex key.
    pub serial: &'a str,
    /// The raw record.
    pub record: &'a Value,
}

impl RevocationEntry<'_> {
    /// The `status` field of the record, e.g. `REVOKED` or `SUSPENDED`.
    pub fn status(&self) -> Option<&str> {
        self.record.get("status").and_then(Value::as_str)
    }

    /// The `reason` field of the record, e.g. `KEY_COMPROMISE`.
    pub fn reason(&self) -> Option<&str> {
        self.record.get("reason").and_then(Value::as_str)
    }
}

impl RevocationTable {
    /// Builds a table from `(serial, record)` pairs. Serials are normalised
    /// to lowercase hex without a `0x` prefix.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        RevocationTable {
            entries: entries
                .into_iter()
                .map(|(serial, record)| (normalize_serial(serial.as_ref()), record))
                .collect(),
        }
    }

    /// Parses a status list document: `{"entries": {"<serial>": {...}}}`.
    pub fn from_json(input: &[u8]) -> Result<Self, StatusError> {
        let list: StatusList = serde_json::from_slice(input).map_err(|e| {
            log::debug!("Malformed status list: {e}");
            StatusError::Parse
        })?;
        Ok(Self::from_entries(list.entries))
    }

    /// Reads a status list snapshot from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StatusError> {
        let buf = fs::read(path).map_err(StatusError::Io)?;
        Self::from_json(&buf)
    }

    /// Number of serials listed, including empty records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no serial is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the record of `serial` when it is present and non-empty.
    pub fn lookup<'a>(&'a self, serial: &str) -> Option<RevocationEntry<'a>> {
        self.entries
            .get_key_value(normalize_serial(serial).as_str())
            .filter(|(_, record)| is_set(record))
            .map(|(serial, record)| RevocationEntry { serial, record })
    }

    /// Returns the first serial of `serials` carrying a non-empty record.
    pub fn first_revoked<'a, I, S>(&'a self, serials: I) -> Option<RevocationEntry<'a>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        serials
            .into_iter()
            .find_map(|serial| self.lookup(serial.as_ref()))
    }
}

fn normalize_serial(serial: &str) -> String {
    let serial = serial.trim();
    let serial = serial
        .strip_prefix("0x")
        .or_else(|| serial.strip_prefix("0X"))
        .unwrap_or(serial);
    serial.to_ascii_lowercase()
}

// Records count as present the way a JSON value is truthy.
fn is_set(record: &Value) -> bool {
    match record {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Fetches the status list once from `url`, with cache defeating headers and
/// a `ts` query parameter set to `now` (unix seconds).
#[cfg(feature = "fetch")]
pub fn fetch_revocation_table(
    url: &str,
    now: u64,
    timeout: std::time::Duration,
) -> Result<RevocationTable, StatusError> {
    use crate::keybox::constants::{CACHE_CONTROL, EXPIRES, PRAGMA};
    use reqwest::{blocking::Client, header, StatusCode};

    let client = Client::builder().timeout(timeout).build().map_err(|e| {
        log::error!("Failed to build HTTP client: {e}");
        StatusError::Request
    })?;
    let response = client
        .get(url)
        .query(&[("ts", now)])
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::PRAGMA, PRAGMA)
        .header(header::EXPIRES, EXPIRES)
        .send()
        .map_err(|e| {
            log::error!("Status list request failed: {e}");
            StatusError::Request
        })?;
    if response.status() != StatusCode::OK {
        return Err(StatusError::HttpStatus(response.status().as_u16()));
    }
    let body = response.bytes().map_err(|e| {
        log::error!("Status list body error: {e}");
        StatusError::Body
    })?;
    let table = RevocationTable::from_json(&body)?;
    log::debug!("Fetched {} status entries", table.len());
    Ok(table)
}
