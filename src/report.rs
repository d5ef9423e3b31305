// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The unified report envelope and its platform-specific body documents.
//!
//! The envelope is a small JSON object; the platform body travels inside it
//! as an opaque JSON string (`json_report`) and is decoded lazily by the
//! platform verifier. Unknown fields are ignored on input; absent fields
//! default to the empty string.

use crate::error::*;

use serde::{Deserialize, Serialize};

/// The transport envelope around a platform-specific attestation report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedAttestationReport {
    pub str_report_version: String,
    pub str_report_type: String,
    pub str_tee_platform: String,
    pub json_report: String,
}

/// CSV platform body: the raw quote plus the chip id and, for `Passport`
/// reports, the HSK/CEK certificate chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HygonCsvReport {
    pub b64_quote: String,
    pub str_chip_id: String,
    pub json_cert_chain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HygonCsvCertChain {
    pub b64_hsk_cert: String,
    pub b64_cek_cert: String,
}

/// SGX/TDX platform body: the raw quote plus DCAP collateral.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcapReport {
    pub b64_quote: String,
    pub json_collateral: String,
}

/// The DCAP collateral bundle handed to the vendor verification library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgxQlQveCollateral {
    pub version: u32,
    pub tee_type: u32,
    pub pck_crl_issuer_chain: String,
    pub root_ca_crl: String,
    pub pck_crl: String,
    pub tcb_info_issuer_chain: String,
    pub tcb_info: String,
    pub qe_identity_issuer_chain: String,
    pub qe_identity: String,
}

pub fn decode_report(json: &str) -> Result<UnifiedAttestationReport> {
    Ok(serde_json::from_str(json)?)
}

pub fn encode_report(report: &UnifiedAttestationReport) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

impl HygonCsvReport {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl HygonCsvCertChain {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl DcapReport {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SgxQlQveCollateral {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
