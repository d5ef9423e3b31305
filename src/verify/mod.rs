// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The verification pipeline: a registry of per-platform verifiers and the
//! public entry points.
//!
//! Verifier instances are built per call, run
//! `verify_platform → parse_unified_report → verify_attributes` in that
//! order, and are then discarded. No state is shared between calls, so any
//! number of verifications may run in parallel.

pub mod csv;
pub mod dcap;

use crate::error::*;
use crate::policy::{self, UnifiedAttestationAttributes, UnifiedAttestationPolicy};
use crate::report::{self, UnifiedAttestationReport};
use crate::{platform, report_type, REPORT_VERSION};

use std::panic::{catch_unwind, AssertUnwindSafe};

/// A constructed verifier for one report.
pub trait AttestationVerifier: std::fmt::Debug {
    /// Cryptographically verify that the quote was produced by genuine
    /// hardware of this platform.
    fn verify_platform(&self) -> Result<()>;

    /// Extract the canonical attribute record from the decoded quote.
    fn parse_unified_report(&self) -> Result<UnifiedAttestationAttributes>;

    /// The full pipeline; the step order is part of the contract because a
    /// failure diagnostic must name the earliest failing step.
    fn verify_report(&self, policy: &UnifiedAttestationPolicy) -> Result<()> {
        self.verify_platform()?;
        let attrs = self.parse_unified_report()?;
        policy::verify_attributes(&attrs, policy)
    }
}

type Constructor = fn(UnifiedAttestationReport, i64) -> Result<Box<dyn AttestationVerifier>>;

/// Platform tag → verifier constructor. `HyperEnclave` has no verifier and
/// is therefore rejected by lookup.
const VERIFIERS: &[(&str, Constructor)] = &[
    (platform::TDX, dcap::TdxVerifier::create),
    (platform::SGX_DCAP, dcap::SgxVerifier::create),
    (platform::CSV, csv::CsvVerifier::create),
];

/// Builds the verifier registered for the report's platform tag.
pub fn verifier_for_report(
    report: UnifiedAttestationReport,
    current_time: i64,
) -> Result<Box<dyn AttestationVerifier>> {
    let tag = report.str_tee_platform.clone();
    for (name, constructor) in VERIFIERS {
        if *name == tag {
            return constructor(report, current_time);
        }
    }

    let supported: Vec<&str> = VERIFIERS.iter().map(|(name, _)| *name).collect();
    Err(Error::Argument(format!(
        "supported platform list: {}, but not include {}",
        supported.join(", "),
        tag
    )))
}

/// Envelope checks shared by every verifier constructor.
pub(crate) fn check_envelope(report: &UnifiedAttestationReport, tag: &str) -> Result<()> {
    if report.str_report_version != REPORT_VERSION {
        return Err(Error::Argument(format!(
            "report version not match, expect {}, got {}",
            REPORT_VERSION, report.str_report_version
        )));
    }
    if report.str_report_type != report_type::PASSPORT {
        return Err(Error::Argument(format!(
            "only {} report is supported, got {}",
            report_type::PASSPORT,
            report.str_report_type
        )));
    }
    if report.str_tee_platform != tag {
        return Err(Error::Argument(format!(
            "report platform not match, expect {}, got {}",
            tag, report.str_tee_platform
        )));
    }
    Ok(())
}

/// Verifies a report against a policy and reports the outcome as a
/// [`Status`]. Never panics; `current_time` (seconds since the epoch) is
/// used for collateral expiration checks on SGX/TDX; the library does not
/// consult the system clock itself.
pub fn attestation_report_verify(
    report_json: &str,
    policy_json: &str,
    current_time: i64,
) -> Status {
    run_guarded(|| {
        let policy = policy::decode_policy(policy_json)?;
        let report = report::decode_report(report_json)?;
        verifier_for_report(report, current_time)?.verify_report(&policy)
    })
}

/// Extracts the attribute record from a report without platform
/// verification. Useful for composing policies and for diagnostics.
pub fn attributes_from_report(report_json: &str) -> Result<UnifiedAttestationAttributes> {
    let report = report::decode_report(report_json)?;
    verifier_for_report(report, 0)?.parse_unified_report()
}

fn run_guarded(body: impl FnOnce() -> Result<()>) -> Status {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => Status::ok(),
        Ok(Err(err)) => Status::from(err),
        Err(_) => Status {
            code: ErrorCode::InternalError as i32,
            message: "panic during verification".to_string(),
            details: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(tag: &str) -> UnifiedAttestationReport {
        UnifiedAttestationReport {
            str_report_version: REPORT_VERSION.to_string(),
            str_report_type: report_type::PASSPORT.to_string(),
            str_tee_platform: tag.to_string(),
            json_report: String::new(),
        }
    }

    #[test]
    fn unknown_platform_lists_supported_tags() {
        let err = verifier_for_report(envelope("Enigma"), 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArgumentError);
        let msg = err.to_string();
        for tag in [platform::SGX_DCAP, platform::TDX, platform::CSV] {
            assert!(msg.contains(tag), "{}", msg);
        }
    }

    #[test]
    fn hyper_enclave_has_no_verifier() {
        let err = verifier_for_report(envelope(platform::HYPER_ENCLAVE), 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArgumentError);
    }

    #[test]
    fn envelope_gate() {
        let mut report = envelope(platform::CSV);
        report.str_report_version = "2.0".to_string();
        assert_eq!(
            check_envelope(&report, platform::CSV).unwrap_err().code(),
            ErrorCode::ArgumentError
        );

        let mut report = envelope(platform::CSV);
        report.str_report_type = crate::report_type::BACKGROUND_CHECK.to_string();
        assert_eq!(
            check_envelope(&report, platform::CSV).unwrap_err().code(),
            ErrorCode::ArgumentError
        );

        assert!(check_envelope(&envelope(platform::CSV), platform::CSV).is_ok());
    }

    #[test]
    fn panics_become_internal_status() {
        let status = run_guarded(|| panic!("boom"));
        assert_eq!(status.code, ErrorCode::InternalError as i32);
    }
}
