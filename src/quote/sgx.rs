// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The Intel SGX ECDSA quote (`sgx_quote3_t`).

use crate::error::*;

use bitflags::bitflags;

/// Header (48) + report body (384) + signature length field (4).
pub const QUOTE3_MIN_SIZE: usize = 436;

bitflags! {
    /// SECS attribute flag bits carried in the report body.
    pub struct AttributeFlags: u64 {
        const INITTED = 1 << 0;
        const DEBUG = 1 << 1;
        const MODE64BIT = 1 << 2;
        const PROVISION_KEY = 1 << 4;
        const EINITTOKEN_KEY = 1 << 5;
        const KSS = 1 << 7;
    }
}

/// The enclave report embedded in a quote (`sgx_report_body_t`).
#[derive(Debug, Clone)]
pub struct ReportBody {
    pub cpu_svn: [u8; 16],
    pub misc_select: u32,
    pub attributes_flags: u64,
    pub attributes_xfrm: u64,
    pub mr_enclave: [u8; 32],
    pub mr_signer: [u8; 32],
    pub isv_prod_id: u16,
    pub isv_svn: u16,
    pub report_data: [u8; 64],
}

impl ReportBody {
    /// Whether the enclave was launched with the DEBUG attribute.
    pub fn debug(&self) -> bool {
        AttributeFlags::from_bits_truncate(self.attributes_flags).contains(AttributeFlags::DEBUG)
    }
}

/// A decoded v3 quote. The ECDSA signature section is length-validated but
/// kept opaque; its verification belongs to the vendor library.
#[derive(Debug, Clone)]
pub struct SgxQuote {
    pub version: u16,
    pub att_key_type: u16,
    pub qe_svn: u16,
    pub pce_svn: u16,
    pub report_body: ReportBody,
}

impl SgxQuote {
    /// Parse by byte offsets per the SDK layout; no transmuting, to stay
    /// independent of host struct padding.
    pub fn parse<'a>(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < QUOTE3_MIN_SIZE {
            return Err(Error::Format(format!(
                "sgx quote size err, expect at least {}, got {}",
                QUOTE3_MIN_SIZE,
                bytes.len()
            )));
        }

        let mut pos: usize = 0;
        let mut take = |n: usize| -> Result<&'a [u8]> {
            if n > 0 && bytes.len() >= pos + n {
                let ret = &bytes[pos..pos + n];
                pos += n;
                Ok(ret)
            } else {
                Err(Error::Format("sgx quote truncated".to_string()))
            }
        };

        // off 0: header
        let version = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let att_key_type = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let _att_key_data_0 = take(4)?;
        let qe_svn = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let pce_svn = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let _qe_vendor_id = take(16)?;
        let _user_data = take(20)?;

        // off 48: report body
        let cpu_svn = <[u8; 16]>::try_from(take(16)?)?;
        let misc_select = u32::from_le_bytes(<[u8; 4]>::try_from(take(4)?)?);
        let _reserved1 = take(12)?;
        let _isv_ext_prod_id = take(16)?;
        let attributes_flags = u64::from_le_bytes(<[u8; 8]>::try_from(take(8)?)?);
        let attributes_xfrm = u64::from_le_bytes(<[u8; 8]>::try_from(take(8)?)?);
        let mr_enclave = <[u8; 32]>::try_from(take(32)?)?;
        let _reserved2 = take(32)?;
        let mr_signer = <[u8; 32]>::try_from(take(32)?)?;
        let _reserved3 = take(32)?;
        let _config_id = take(64)?;
        let isv_prod_id = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let isv_svn = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let _config_svn = take(2)?;
        let _reserved4 = take(42)?;
        let _isv_family_id = take(16)?;
        let report_data = <[u8; 64]>::try_from(take(64)?)?;

        // off 432: signature section, declared length must fit the buffer
        let signature_data_len = u32::from_le_bytes(<[u8; 4]>::try_from(take(4)?)?);
        if bytes.len() - pos < signature_data_len as usize {
            return Err(Error::Format(format!(
                "sgx quote signature section truncated, declared {}, remaining {}",
                signature_data_len,
                bytes.len() - pos
            )));
        }

        Ok(SgxQuote {
            version,
            att_key_type,
            qe_svn,
            pce_svn,
            report_body: ReportBody {
                cpu_svn,
                misc_select,
                attributes_flags,
                attributes_xfrm,
                mr_enclave,
                mr_signer,
                isv_prod_id,
                isv_svn,
                report_data,
            },
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn params() -> QuoteParams {
        let mut report_data = [0u8; 64];
        report_data[..4].copy_from_slice(&[1, 2, 3, 4]);
        report_data[32..36].copy_from_slice(&[5, 6, 7, 8]);
        QuoteParams {
            mr_enclave: [0xaa; 32],
            mr_signer: [0xbb; 32],
            isv_prod_id: 9,
            isv_svn: 5,
            debug: false,
            report_data,
        }
    }

    #[test]
    fn parses_synthetic_quote() {
        let raw = synthetic_quote(&params());
        let quote = SgxQuote::parse(&raw).unwrap();
        assert_eq!(quote.version, 3);
        assert_eq!(quote.report_body.mr_enclave, [0xaa; 32]);
        assert_eq!(quote.report_body.mr_signer, [0xbb; 32]);
        assert_eq!(quote.report_body.isv_prod_id, 9);
        assert_eq!(quote.report_body.isv_svn, 5);
        assert!(!quote.report_body.debug());
    }

    #[test]
    fn debug_flag() {
        let mut p = params();
        p.debug = true;
        let quote = SgxQuote::parse(&synthetic_quote(&p)).unwrap();
        assert!(quote.report_body.debug());
    }

    #[test]
    fn rejects_header_only_buffer() {
        assert!(SgxQuote::parse(&[0u8; 48]).is_err());
    }

    #[test]
    fn rejects_truncated_signature_section() {
        let mut raw = synthetic_quote(&params());
        // Declare a signature section longer than the buffer.
        let len = raw.len();
        raw[len - 4..].copy_from_slice(&100u32.to_le_bytes());
        assert!(SgxQuote::parse(&raw).is_err());
    }
}
