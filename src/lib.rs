// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Unified attestation report verification for confidential computing
//! platforms.
//!
//! A relying party hands this crate a unified attestation report (a JSON
//! envelope carrying a platform-specific quote and its collateral) together
//! with a policy of expected attribute sets, and receives a
//! [`Status`](error::Status) telling it whether the report was produced by
//! genuine TEE hardware and
//! whether the measured state matches the policy.
//!
//! Three platforms are supported:
//!
//! * **HYGON CSV**: the full SM2 certificate chain
//!   (HRK → HSK → CEK → PEK → quote) is re-verified in process, rooted at
//!   the compiled-in HYGON Root Key.
//! * **Intel SGX (DCAP)** and **Intel TDX**: quote parsing and attribute
//!   extraction are native; the cryptographic chain is delegated to the
//!   Intel quote verification library behind the `dcap` cargo feature.
//!
//! ```no_run
//! use ual_rs::verify::attestation_report_verify;
//!
//! let report_json = std::fs::read_to_string("report.json").unwrap();
//! let policy_json = r#"{ "main_attributes": [ { "str_tee_platform": "CSV" } ] }"#;
//! let status = attestation_report_verify(&report_json, policy_json, 1700000000);
//! assert_eq!(status.code, 0, "{}: {}", status.message, status.details);
//! ```

pub mod certs;
pub mod collateral;
pub mod crypto;
pub mod error;
pub mod policy;
pub mod quote;
pub mod report;
mod util;
pub mod verify;

/// Version string every report envelope must carry.
pub const REPORT_VERSION: &str = "1.0";

/// TEE platform tags, bit-exact on the wire.
pub mod platform {
    pub const SGX_DCAP: &str = "SGX_DCAP";
    pub const TDX: &str = "TDX";
    pub const CSV: &str = "CSV";
    /// Appears in generated reports but has no verifier; reports carrying it
    /// are rejected with an argument error.
    pub const HYPER_ENCLAVE: &str = "HyperEnclave";
}

/// Report type tags.
pub mod report_type {
    /// The report carries no collateral; only a party that already holds the
    /// collateral out-of-band can platform-verify it.
    pub const BACKGROUND_CHECK: &str = "BackgroundCheck";
    /// Self-contained report: quote plus certificate chain / collateral.
    pub const PASSPORT: &str = "Passport";
}

/// Parameter for [`codicon::Encoder`] impls that emit only the signed body
/// of a structure rather than its full wire form.
pub struct Body;
