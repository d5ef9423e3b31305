// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The Intel SGX/TDX verifiers.
//!
//! Quote parsing and attribute extraction are native; the cryptographic
//! chain (PCK chain, CRLs, TCB info, QE identity) is delegated to the Intel
//! quote verification library. The FFI lives behind the `dcap` cargo
//! feature so the crate builds without the Intel SDK installed; without it,
//! platform verification reports an internal error and everything else
//! still works.

use super::{check_envelope, AttestationVerifier};
use crate::error::*;
use crate::platform;
use crate::policy::UnifiedAttestationAttributes;
use crate::quote::sgx::SgxQuote;
use crate::quote::tdx::{TdxQuote, TEE_TYPE_TDX};
use crate::report::{DcapReport, SgxQlQveCollateral, UnifiedAttestationReport};

use std::ffi::CString;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TeeKind {
    Sgx,
    Tdx,
}

/// Collateral marshalled for the vendor ABI: every string NUL-terminated
/// and sized including the terminator. The owned buffers must outlive the
/// vendor call, so the verifier holds this struct across it.
#[derive(Debug)]
pub struct QvCollateral {
    pub version: u32,
    pub tee_type: u32,
    pub pck_crl_issuer_chain: CString,
    pub root_ca_crl: CString,
    pub pck_crl: CString,
    pub tcb_info_issuer_chain: CString,
    pub tcb_info: CString,
    pub qe_identity_issuer_chain: CString,
    pub qe_identity: CString,
}

impl QvCollateral {
    pub fn from_doc(doc: &SgxQlQveCollateral) -> Result<Self> {
        fn field(name: &str, value: &str) -> Result<CString> {
            if value.is_empty() {
                return Err(Error::internal(format!("invalid collateral data: {}", name)));
            }
            CString::new(value)
                .map_err(|_| Error::Format(format!("collateral {} contains a NUL byte", name)))
        }

        Ok(QvCollateral {
            version: doc.version,
            tee_type: doc.tee_type,
            pck_crl_issuer_chain: field("pck_crl_issuer_chain", &doc.pck_crl_issuer_chain)?,
            root_ca_crl: field("root_ca_crl", &doc.root_ca_crl)?,
            pck_crl: field("pck_crl", &doc.pck_crl)?,
            tcb_info_issuer_chain: field("tcb_info_issuer_chain", &doc.tcb_info_issuer_chain)?,
            tcb_info: field("tcb_info", &doc.tcb_info)?,
            qe_identity_issuer_chain: field(
                "qe_identity_issuer_chain",
                &doc.qe_identity_issuer_chain,
            )?,
            qe_identity: field("qe_identity", &doc.qe_identity)?,
        })
    }
}

#[cfg(feature = "dcap")]
#[allow(dead_code)]
mod qvl {
    //! Hand-written bindings for `libsgx_dcap_quoteverify`.

    use libc::{c_char, c_void, time_t};

    pub const SGX_QL_SUCCESS: u32 = 0;

    pub const SGX_QL_QV_RESULT_OK: u32 = 0x0000;
    pub const SGX_QL_QV_RESULT_CONFIG_NEEDED: u32 = 0xa001;
    pub const SGX_QL_QV_RESULT_OUT_OF_DATE: u32 = 0xa002;
    pub const SGX_QL_QV_RESULT_OUT_OF_DATE_CONFIG_NEEDED: u32 = 0xa003;
    pub const SGX_QL_QV_RESULT_INVALID_SIGNATURE: u32 = 0xa004;
    pub const SGX_QL_QV_RESULT_REVOKED: u32 = 0xa005;
    pub const SGX_QL_QV_RESULT_UNSPECIFIED: u32 = 0xa006;
    pub const SGX_QL_QV_RESULT_SW_HARDENING_NEEDED: u32 = 0xa007;
    pub const SGX_QL_QV_RESULT_CONFIG_AND_SW_HARDENING_NEEDED: u32 = 0xa008;

    /// `sgx_ql_qve_collateral_t`.
    #[repr(C)]
    pub struct SgxQlQveCollateralT {
        pub version: u32,
        pub tee_type: u32,
        pub pck_crl_issuer_chain: *const c_char,
        pub pck_crl_issuer_chain_size: u32,
        pub root_ca_crl: *const c_char,
        pub root_ca_crl_size: u32,
        pub pck_crl: *const c_char,
        pub pck_crl_size: u32,
        pub tcb_info_issuer_chain: *const c_char,
        pub tcb_info_issuer_chain_size: u32,
        pub tcb_info: *const c_char,
        pub tcb_info_size: u32,
        pub qe_identity_issuer_chain: *const c_char,
        pub qe_identity_issuer_chain_size: u32,
        pub qe_identity: *const c_char,
        pub qe_identity_size: u32,
    }

    /// `sgx_ql_qv_supplemental_t`. The vendor reports its own size of this
    /// structure; a mismatch means the SDK headers and the runtime library
    /// diverged.
    #[repr(C)]
    pub struct SgxQlQvSupplementalT {
        pub version: u32,
        pub earliest_issue_date: time_t,
        pub latest_issue_date: time_t,
        pub earliest_expiration_date: time_t,
        pub tcb_level_date_tag: time_t,
        pub pck_crl_num: u32,
        pub root_ca_crl_num: u32,
        pub tcb_eval_ref_num: u32,
        pub root_key_id: [u8; 48],
        pub pck_ppid: [u8; 16],
        pub tcb_cpusvn: [u8; 16],
        pub tcb_pce_isvsvn: u16,
        pub pce_id: u16,
        pub tee_type: u32,
        pub sgx_type: u8,
        pub platform_instance_id: [u8; 16],
        pub dynamic_platform: u32,
        pub cached_keys: u32,
        pub smt_enabled: u32,
    }

    #[link(name = "sgx_dcap_quoteverify")]
    extern "C" {
        pub fn sgx_qv_get_quote_supplemental_data_size(p_data_size: *mut u32) -> u32;
        pub fn sgx_qv_verify_quote(
            p_quote: *const u8,
            quote_size: u32,
            p_quote_collateral: *const SgxQlQveCollateralT,
            expiration_check_date: time_t,
            p_collateral_expiration_status: *mut u32,
            p_quote_verification_result: *mut u32,
            p_qve_report_info: *mut c_void,
            supplemental_data_size: u32,
            p_supplemental_data: *mut u8,
        ) -> u32;
        pub fn tdx_qv_get_quote_supplemental_data_size(p_data_size: *mut u32) -> u32;
        pub fn tdx_qv_verify_quote(
            p_quote: *const u8,
            quote_size: u32,
            p_quote_collateral: *const SgxQlQveCollateralT,
            expiration_check_date: time_t,
            p_collateral_expiration_status: *mut u32,
            p_quote_verification_result: *mut u32,
            p_qve_report_info: *mut c_void,
            supplemental_data_size: u32,
            p_supplemental_data: *mut u8,
        ) -> u32;
    }
}

#[cfg(feature = "dcap")]
impl QvCollateral {
    /// A vendor-ABI view. The returned struct borrows this collateral's
    /// buffers; it must not outlive `self`.
    fn as_ffi(&self) -> qvl::SgxQlQveCollateralT {
        fn entry(value: &CString) -> (*const libc::c_char, u32) {
            // Size counts the terminating NUL, as the QVL expects.
            (value.as_ptr(), value.as_bytes_with_nul().len() as u32)
        }

        let (pck_crl_issuer_chain, pck_crl_issuer_chain_size) = entry(&self.pck_crl_issuer_chain);
        let (root_ca_crl, root_ca_crl_size) = entry(&self.root_ca_crl);
        let (pck_crl, pck_crl_size) = entry(&self.pck_crl);
        let (tcb_info_issuer_chain, tcb_info_issuer_chain_size) =
            entry(&self.tcb_info_issuer_chain);
        let (tcb_info, tcb_info_size) = entry(&self.tcb_info);
        let (qe_identity_issuer_chain, qe_identity_issuer_chain_size) =
            entry(&self.qe_identity_issuer_chain);
        let (qe_identity, qe_identity_size) = entry(&self.qe_identity);

        qvl::SgxQlQveCollateralT {
            version: self.version,
            tee_type: self.tee_type,
            pck_crl_issuer_chain,
            pck_crl_issuer_chain_size,
            root_ca_crl,
            root_ca_crl_size,
            pck_crl,
            pck_crl_size,
            tcb_info_issuer_chain,
            tcb_info_issuer_chain_size,
            tcb_info,
            tcb_info_size,
            qe_identity_issuer_chain,
            qe_identity_issuer_chain_size,
            qe_identity,
            qe_identity_size,
        }
    }
}

#[cfg(feature = "dcap")]
fn vendor_verify(
    kind: TeeKind,
    quote: &[u8],
    collateral: &QvCollateral,
    current_time: i64,
) -> Result<()> {
    use std::mem::size_of;

    let mut supplemental_size: u32 = 0;
    let ret = unsafe {
        match kind {
            TeeKind::Sgx => qvl::sgx_qv_get_quote_supplemental_data_size(&mut supplemental_size),
            TeeKind::Tdx => qvl::tdx_qv_get_quote_supplemental_data_size(&mut supplemental_size),
        }
    };
    if ret != qvl::SGX_QL_SUCCESS {
        return Err(Error::internal(format!(
            "fail to get supplemental data size, error code: {:#06x}",
            ret
        )));
    }
    if supplemental_size as usize != size_of::<qvl::SgxQlQvSupplementalT>() {
        return Err(Error::internal(
            "supplemental data size differs from the compiled definition, \
             the SDK headers and the QVL runtime must be the same version",
        ));
    }

    let mut supplemental = vec![0u8; supplemental_size as usize];
    let ffi_collateral = collateral.as_ffi();
    let mut expiration_status: u32 = 1;
    let mut result: u32 = qvl::SGX_QL_QV_RESULT_UNSPECIFIED;

    let ret = unsafe {
        let verify = match kind {
            TeeKind::Sgx => qvl::sgx_qv_verify_quote,
            TeeKind::Tdx => qvl::tdx_qv_verify_quote,
        };
        verify(
            quote.as_ptr(),
            quote.len() as u32,
            &ffi_collateral,
            current_time as libc::time_t,
            &mut expiration_status,
            &mut result,
            std::ptr::null_mut(), // NULL report info selects QVL mode
            supplemental_size,
            supplemental.as_mut_ptr(),
        )
    };
    if ret != qvl::SGX_QL_SUCCESS {
        return Err(Error::internal(format!(
            "fail to verify dcap quote, error code: {:#06x}",
            ret
        )));
    }

    match result {
        qvl::SGX_QL_QV_RESULT_OK => Ok(()),
        qvl::SGX_QL_QV_RESULT_CONFIG_NEEDED
        | qvl::SGX_QL_QV_RESULT_OUT_OF_DATE
        | qvl::SGX_QL_QV_RESULT_OUT_OF_DATE_CONFIG_NEEDED
        | qvl::SGX_QL_QV_RESULT_SW_HARDENING_NEEDED
        | qvl::SGX_QL_QV_RESULT_CONFIG_AND_SW_HARDENING_NEEDED => {
            log::warn!(
                "dcap quote verified with non-terminal tcb status: {:#06x}",
                result
            );
            Ok(())
        }
        _ => Err(Error::internal(format!(
            "fail to verify dcap quote, quote verification result: {:#06x}",
            result
        ))),
    }
}

#[cfg(not(feature = "dcap"))]
fn vendor_verify(
    _kind: TeeKind,
    _quote: &[u8],
    _collateral: &QvCollateral,
    _current_time: i64,
) -> Result<()> {
    Err(Error::internal(
        "dcap quote verification requires the `dcap` feature and the Intel QVL runtime",
    ))
}

#[derive(Debug)]
pub struct SgxVerifier {
    raw_quote: Vec<u8>,
    quote: SgxQuote,
    collateral: Option<SgxQlQveCollateral>,
    current_time: i64,
}

impl SgxVerifier {
    pub fn create(
        report: UnifiedAttestationReport,
        current_time: i64,
    ) -> Result<Box<dyn AttestationVerifier>> {
        check_envelope(&report, platform::SGX_DCAP)?;

        let body = DcapReport::from_json(&report.json_report)?;
        let raw_quote = base64::decode(&body.b64_quote)?;
        let quote = SgxQuote::parse(&raw_quote)?;
        let collateral = if body.json_collateral.is_empty() {
            None
        } else {
            Some(SgxQlQveCollateral::from_json(&body.json_collateral)?)
        };

        Ok(Box::new(SgxVerifier {
            raw_quote,
            quote,
            collateral,
            current_time,
        }))
    }
}

impl AttestationVerifier for SgxVerifier {
    fn verify_platform(&self) -> Result<()> {
        let doc = self
            .collateral
            .as_ref()
            .ok_or_else(|| Error::internal("report carries no dcap collateral"))?;
        let collateral = QvCollateral::from_doc(doc)?;
        vendor_verify(TeeKind::Sgx, &self.raw_quote, &collateral, self.current_time)?;
        log::info!("sgx report platform verification passed");
        Ok(())
    }

    fn parse_unified_report(&self) -> Result<UnifiedAttestationAttributes> {
        Ok(sgx_attributes(&self.quote))
    }
}

#[derive(Debug)]
pub struct TdxVerifier {
    raw_quote: Vec<u8>,
    quote: TdxQuote,
    collateral: Option<SgxQlQveCollateral>,
    current_time: i64,
}

impl TdxVerifier {
    pub fn create(
        report: UnifiedAttestationReport,
        current_time: i64,
    ) -> Result<Box<dyn AttestationVerifier>> {
        check_envelope(&report, platform::TDX)?;

        let body = DcapReport::from_json(&report.json_report)?;
        let raw_quote = base64::decode(&body.b64_quote)?;
        let quote = TdxQuote::parse(&raw_quote)?;
        let collateral = if body.json_collateral.is_empty() {
            None
        } else {
            Some(SgxQlQveCollateral::from_json(&body.json_collateral)?)
        };

        Ok(Box::new(TdxVerifier {
            raw_quote,
            quote,
            collateral,
            current_time,
        }))
    }
}

impl AttestationVerifier for TdxVerifier {
    fn verify_platform(&self) -> Result<()> {
        let doc = self
            .collateral
            .as_ref()
            .ok_or_else(|| Error::internal("report carries no dcap collateral"))?;
        let collateral = QvCollateral::from_doc(doc)?;
        vendor_verify(TeeKind::Tdx, &self.raw_quote, &collateral, self.current_time)?;
        log::info!("tdx report platform verification passed");
        Ok(())
    }

    fn parse_unified_report(&self) -> Result<UnifiedAttestationAttributes> {
        tdx_attributes(&self.quote)
    }
}

pub(crate) fn sgx_attributes(quote: &SgxQuote) -> UnifiedAttestationAttributes {
    let body = &quote.report_body;

    let mut attrs = UnifiedAttestationAttributes::default();
    attrs.str_tee_platform = platform::SGX_DCAP.to_string();
    attrs.hex_ta_measurement = hex::encode(body.mr_enclave);
    attrs.hex_signer = hex::encode(body.mr_signer);
    attrs.hex_prod_id = body.isv_prod_id.to_string();
    attrs.str_min_isvsvn = body.isv_svn.to_string();
    attrs.hex_user_data = hex::encode(&body.report_data[..32]);
    attrs.hex_hash_or_pem_pubkey = hex::encode(&body.report_data[32..]);
    attrs.bool_debug_disabled = (if body.debug() { "false" } else { "true" }).to_string();
    attrs
}

pub(crate) fn tdx_attributes(quote: &TdxQuote) -> Result<UnifiedAttestationAttributes> {
    if quote.tee_type != TEE_TYPE_TDX {
        return Err(Error::internal(format!(
            "error tee_type in quote: {:#010x}",
            quote.tee_type
        )));
    }

    let body = &quote.report_body;

    let mut platform_measurement = String::new();
    for mr in [
        &body.mr_seam,
        &body.mrsigner_seam,
        &body.mr_td,
        &body.mr_config_id,
        &body.mr_owner,
        &body.mr_owner_config,
    ] {
        platform_measurement.push_str(&hex::encode(mr));
    }

    let mut attrs = UnifiedAttestationAttributes::default();
    attrs.str_tee_platform = platform::TDX.to_string();
    attrs.hex_platform_measurement = platform_measurement;
    attrs.hex_boot_measurement =
        format!("{}{}", hex::encode(body.rt_mr[0]), hex::encode(body.rt_mr[1]));
    attrs.hex_ta_measurement =
        format!("{}{}", hex::encode(body.rt_mr[2]), hex::encode(body.rt_mr[3]));
    attrs.hex_user_data = hex::encode(&body.report_data[..32]);
    attrs.hex_hash_or_pem_pubkey = hex::encode(&body.report_data[32..]);
    attrs.bool_debug_disabled = (if body.debug() { "false" } else { "true" }).to_string();
    Ok(attrs)
}
