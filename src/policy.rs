// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The canonical attribute record and the policy matcher.
//!
//! A policy is an ordered list of expected attribute sets; verification
//! succeeds if any one of them matches the actual attributes field by
//! field. An empty expected field is a wildcard, string comparisons ignore
//! case, and every entry is evaluated so a failure diagnostic covers the
//! whole policy.

use crate::error::*;

use serde::{Deserialize, Serialize};

/// Attributes extracted from a verified report. Binary values are carried
/// as lowercase hex; absent attributes are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedAttestationAttributes {
    pub str_tee_platform: String,
    pub hex_platform_hw_version: String,
    pub hex_platform_sw_version: String,
    pub hex_secure_flags: String,
    pub hex_platform_measurement: String,
    pub hex_boot_measurement: String,
    pub hex_ta_measurement: String,
    pub hex_ta_dyn_measurement: String,
    pub hex_signer: String,
    pub hex_prod_id: String,
    pub str_min_isvsvn: String,
    pub bool_debug_disabled: String,
    pub hex_user_data: String,
    pub hex_hash_or_pem_pubkey: String,
    pub hex_nonce: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedAttestationPolicy {
    pub main_attributes: Vec<UnifiedAttestationAttributes>,
}

pub fn decode_policy(json: &str) -> Result<UnifiedAttestationPolicy> {
    Ok(serde_json::from_str(json)?)
}

fn str_match(name: &str, actual: &str, expected: &str) -> Option<String> {
    if expected.is_empty() || actual.eq_ignore_ascii_case(expected) {
        None
    } else {
        Some(format!(
            "{} is not match: actual {} vs expected {}.",
            name, actual, expected
        ))
    }
}

fn to_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn bool_match(name: &str, actual: &str, expected: &str) -> Option<String> {
    if expected.is_empty() || to_bool(actual) == to_bool(expected) {
        None
    } else {
        Some(format!(
            "{} is not match: actual {} vs expected {}.",
            name, actual, expected
        ))
    }
}

/// The actual value must be an integer greater than or equal to the
/// expected one. Unparseable values make the entry non-matching instead of
/// aborting the policy walk.
fn ge_match(name: &str, actual: &str, expected: &str) -> Option<String> {
    if expected.is_empty() {
        return None;
    }
    match (actual.trim().parse::<i64>(), expected.trim().parse::<i64>()) {
        (Ok(a), Ok(e)) if a >= e => None,
        (Ok(a), Ok(e)) => Some(format!(
            "{} is not match: actual {} is not large than expected {}.",
            name, a, e
        )),
        _ => Some(format!(
            "{} is not match: invalid number, actual {} or expected {}.",
            name, actual, expected
        )),
    }
}

/// The expected side holds the public key material itself; the actual side
/// holds the hex of its SHA-256.
fn pubkey_match(name: &str, actual: &str, expected: &str) -> Option<String> {
    if expected.is_empty() {
        return None;
    }
    let expected_hash = hex::encode(openssl::sha::sha256(expected.as_bytes()));
    str_match(name, actual, &expected_hash)
}

/// Field-by-field comparison; returns the first mismatch.
fn attrs_match(
    actual: &UnifiedAttestationAttributes,
    expected: &UnifiedAttestationAttributes,
) -> Option<String> {
    str_match(
        "PLATFORM",
        &actual.str_tee_platform,
        &expected.str_tee_platform,
    )
    .or_else(|| {
        str_match(
            "PLATFORMHWVERSION",
            &actual.hex_platform_hw_version,
            &expected.hex_platform_hw_version,
        )
    })
    .or_else(|| {
        str_match(
            "PLATFORMSWVERSION",
            &actual.hex_platform_sw_version,
            &expected.hex_platform_sw_version,
        )
    })
    .or_else(|| {
        str_match(
            "SECUREFLAGS",
            &actual.hex_secure_flags,
            &expected.hex_secure_flags,
        )
    })
    .or_else(|| {
        str_match(
            "MRPLATFORM",
            &actual.hex_platform_measurement,
            &expected.hex_platform_measurement,
        )
    })
    .or_else(|| {
        str_match(
            "MRBOOT",
            &actual.hex_boot_measurement,
            &expected.hex_boot_measurement,
        )
    })
    .or_else(|| {
        str_match(
            "MRTRUSTAPP",
            &actual.hex_ta_measurement,
            &expected.hex_ta_measurement,
        )
    })
    .or_else(|| {
        str_match(
            "MRTRUSTAPPDYN",
            &actual.hex_ta_dyn_measurement,
            &expected.hex_ta_dyn_measurement,
        )
    })
    .or_else(|| str_match("SIGNER", &actual.hex_signer, &expected.hex_signer))
    .or_else(|| str_match("PRODID", &actual.hex_prod_id, &expected.hex_prod_id))
    .or_else(|| {
        ge_match(
            "ISVSVN",
            &actual.str_min_isvsvn,
            &expected.str_min_isvsvn,
        )
    })
    .or_else(|| {
        bool_match(
            "DEBUGDISABLED",
            &actual.bool_debug_disabled,
            &expected.bool_debug_disabled,
        )
    })
    .or_else(|| str_match("USERDATA", &actual.hex_user_data, &expected.hex_user_data))
    .or_else(|| {
        pubkey_match(
            "PUBLICKEY",
            &actual.hex_hash_or_pem_pubkey,
            &expected.hex_hash_or_pem_pubkey,
        )
    })
    .or_else(|| str_match("NONCE", &actual.hex_nonce, &expected.hex_nonce))
}

/// Checks `actual` against every expected entry, succeeding on the first
/// full match. On failure the error details carry one line per entry with
/// the field that first mismatched.
pub fn verify_attributes(
    actual: &UnifiedAttestationAttributes,
    policy: &UnifiedAttestationPolicy,
) -> Result<()> {
    let mut lines = Vec::new();
    for (index, expected) in policy.main_attributes.iter().enumerate() {
        match attrs_match(actual, expected) {
            None => return Ok(()),
            Some(mismatch) => lines.push(format!("#{}: {}", index, mismatch)),
        }
    }
    Err(Error::Internal {
        message: "verify attributes failed".to_string(),
        details: lines.join("\n"),
    })
}
