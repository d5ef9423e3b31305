// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Intel TDX quotes (`sgx_quote4_t` / `sgx_quote5_t`).
//!
//! Both versions share the 48-byte header and the TD report body layout;
//! v5 inserts a body descriptor (type + size) between header and body.

use crate::error::*;

use bitflags::bitflags;

/// TD report body size shared by v4 and the v5 TD body types.
pub const REPORT2_BODY_SIZE: usize = 584;

/// `tee_type` value identifying a TDX quote.
pub const TEE_TYPE_TDX: u32 = 0x81;

bitflags! {
    /// TD attribute bits checked during attribute export.
    pub struct TdAttributes: u64 {
        const DEBUG = 1 << 1;
    }
}

/// The TD report embedded in a quote (`sgx_report2_body_t`).
#[derive(Debug, Clone)]
pub struct Report2Body {
    pub tee_tcb_svn: [u8; 16],
    pub mr_seam: [u8; 48],
    pub mrsigner_seam: [u8; 48],
    pub seam_attributes: u64,
    pub td_attributes: u64,
    pub xfam: u64,
    pub mr_td: [u8; 48],
    pub mr_config_id: [u8; 48],
    pub mr_owner: [u8; 48],
    pub mr_owner_config: [u8; 48],
    pub rt_mr: [[u8; 48]; 4],
    pub report_data: [u8; 64],
}

impl Report2Body {
    /// Whether the TD runs with the debug attribute raised.
    pub fn debug(&self) -> bool {
        TdAttributes::from_bits_truncate(self.td_attributes).contains(TdAttributes::DEBUG)
    }
}

#[derive(Debug, Clone)]
pub struct TdxQuote {
    pub version: u16,
    pub tee_type: u32,
    pub report_body: Report2Body,
}

impl TdxQuote {
    pub fn parse<'a>(bytes: &'a [u8]) -> Result<Self> {
        let mut pos: usize = 0;
        let mut take = |n: usize| -> Result<&'a [u8]> {
            if n > 0 && bytes.len() >= pos + n {
                let ret = &bytes[pos..pos + n];
                pos += n;
                Ok(ret)
            } else {
                Err(Error::Format("tdx quote truncated".to_string()))
            }
        };

        // off 0: header
        let version = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
        let _att_key_type = take(2)?;
        let tee_type = u32::from_le_bytes(<[u8; 4]>::try_from(take(4)?)?);
        let _reserved = take(4)?;
        let _qe_vendor_id = take(16)?;
        let _user_data = take(20)?;

        let body_bytes = match version {
            4 => take(REPORT2_BODY_SIZE)?,
            5 => {
                let _body_type = u16::from_le_bytes(<[u8; 2]>::try_from(take(2)?)?);
                let body_size = u32::from_le_bytes(<[u8; 4]>::try_from(take(4)?)?) as usize;
                if body_size < REPORT2_BODY_SIZE {
                    return Err(Error::Format(format!(
                        "tdx quote v5 body size err, expect at least {}, got {}",
                        REPORT2_BODY_SIZE, body_size
                    )));
                }
                let body = take(body_size)?;
                &body[..REPORT2_BODY_SIZE]
            }
            other => {
                return Err(Error::Format(format!(
                    "unsupported tdx quote version: {}",
                    other
                )))
            }
        };

        // Signature section trails the body in both versions.
        let signature_data_len = u32::from_le_bytes(<[u8; 4]>::try_from(take(4)?)?);
        if bytes.len() - pos < signature_data_len as usize {
            return Err(Error::Format(format!(
                "tdx quote signature section truncated, declared {}, remaining {}",
                signature_data_len,
                bytes.len() - pos
            )));
        }

        Ok(TdxQuote {
            version,
            tee_type,
            report_body: Report2Body::parse(body_bytes)?,
        })
    }
}

impl Report2Body {
    fn parse<'a>(bytes: &'a [u8]) -> Result<Self> {
        let mut pos: usize = 0;
        let mut take = |n: usize| -> Result<&'a [u8]> {
            if n > 0 && bytes.len() >= pos + n {
                let ret = &bytes[pos..pos + n];
                pos += n;
                Ok(ret)
            } else {
                Err(Error::Format("tdx report body truncated".to_string()))
            }
        };

        let tee_tcb_svn = <[u8; 16]>::try_from(take(16)?)?;
        let mr_seam = <[u8; 48]>::try_from(take(48)?)?;
        let mrsigner_seam = <[u8; 48]>::try_from(take(48)?)?;
        let seam_attributes = u64::from_le_bytes(<[u8; 8]>::try_from(take(8)?)?);
        let td_attributes = u64::from_le_bytes(<[u8; 8]>::try_from(take(8)?)?);
        let xfam = u64::from_le_bytes(<[u8; 8]>::try_from(take(8)?)?);
        let mr_td = <[u8; 48]>::try_from(take(48)?)?;
        let mr_config_id = <[u8; 48]>::try_from(take(48)?)?;
        let mr_owner = <[u8; 48]>::try_from(take(48)?)?;
        let mr_owner_config = <[u8; 48]>::try_from(take(48)?)?;
        let rt_mr = [
            <[u8; 48]>::try_from(take(48)?)?,
            <[u8; 48]>::try_from(take(48)?)?,
            <[u8; 48]>::try_from(take(48)?)?,
            <[u8; 48]>::try_from(take(48)?)?,
        ];
        let report_data = <[u8; 64]>::try_from(take(64)?)?;

        Ok(Report2Body {
            tee_tcb_svn,
            mr_seam,
            mrsigner_seam,
            seam_attributes,
            td_attributes,
            xfam,
            mr_td,
            mr_config_id,
            mr_owner,
            mr_owner_config,
            rt_mr,
            report_data,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{REPORT2_BODY_SIZE, TEE_TYPE_TDX};

    pub struct QuoteParams {
        pub version: u16,
        pub tee_type: u32,
        pub debug: bool,
        pub report_data: [u8; 64],
    }

    impl Default for QuoteParams {
        fn default() -> Self {
            QuoteParams {
                version: 4,
                tee_type: TEE_TYPE_TDX,
                debug: false,
                report_data: [0u8; 64],
            }
        }
    }

    /// Assemble a structurally valid TDX quote whose measurement registers
    /// hold recognizable fill bytes (`mr_seam` = 0xa0, `mrsigner_seam` =
    /// 0xa1, … in body field order).
    pub fn synthetic_quote(params: &QuoteParams) -> Vec<u8> {
        let mut body = vec![0u8; REPORT2_BODY_SIZE];
        body[16..64].fill(0xa0); // mr_seam
        body[64..112].fill(0xa1); // mrsigner_seam
        let td_attributes: u64 = if params.debug { 0x2 } else { 0x0 };
        body[120..128].copy_from_slice(&td_attributes.to_le_bytes());
        body[136..184].fill(0xa2); // mr_td
        body[184..232].fill(0xa3); // mr_config_id
        body[232..280].fill(0xa4); // mr_owner
        body[280..328].fill(0xa5); // mr_owner_config
        body[328..376].fill(0xb0); // rt_mr[0]
        body[376..424].fill(0xb1);
        body[424..472].fill(0xb2);
        body[472..520].fill(0xb3);
        body[520..584].copy_from_slice(&params.report_data);

        let mut raw = Vec::new();
        raw.extend_from_slice(&params.version.to_le_bytes());
        raw.extend_from_slice(&2u16.to_le_bytes()); // att_key_type
        raw.extend_from_slice(&params.tee_type.to_le_bytes());
        raw.extend_from_slice(&[0u8; 4]); // reserved
        raw.extend_from_slice(&[0u8; 16]); // qe_vendor_id
        raw.extend_from_slice(&[0u8; 20]); // user_data
        if params.version == 5 {
            raw.extend_from_slice(&2u16.to_le_bytes()); // body type: TD 1.0
            raw.extend_from_slice(&(REPORT2_BODY_SIZE as u32).to_le_bytes());
        }
        raw.extend_from_slice(&body);
        raw.extend_from_slice(&0u32.to_le_bytes()); // empty signature section
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn parses_v4() {
        let quote = TdxQuote::parse(&synthetic_quote(&QuoteParams::default())).unwrap();
        assert_eq!(quote.version, 4);
        assert_eq!(quote.tee_type, TEE_TYPE_TDX);
        assert_eq!(quote.report_body.mr_seam, [0xa0; 48]);
        assert_eq!(quote.report_body.rt_mr[3], [0xb3; 48]);
        assert!(!quote.report_body.debug());
    }

    #[test]
    fn parses_v5_at_shifted_offset() {
        let params = QuoteParams {
            version: 5,
            ..QuoteParams::default()
        };
        let quote = TdxQuote::parse(&synthetic_quote(&params)).unwrap();
        assert_eq!(quote.version, 5);
        assert_eq!(quote.report_body.mr_owner_config, [0xa5; 48]);
    }

    #[test]
    fn debug_attribute() {
        let params = QuoteParams {
            debug: true,
            ..QuoteParams::default()
        };
        let quote = TdxQuote::parse(&synthetic_quote(&params)).unwrap();
        assert!(quote.report_body.debug());
    }

    #[test]
    fn rejects_unknown_version() {
        let params = QuoteParams {
            version: 6,
            ..QuoteParams::default()
        };
        assert!(TdxQuote::parse(&synthetic_quote(&params)).is_err());
    }

    #[test]
    fn rejects_header_only_buffer() {
        assert!(TdxQuote::parse(&[0u8; 48]).is_err());
    }

    #[test]
    fn rejects_truncated_signature_section() {
        let mut raw = synthetic_quote(&QuoteParams::default());
        let len = raw.len();
        raw[len - 4..].copy_from_slice(&16u32.to_le_bytes());
        assert!(TdxQuote::parse(&raw).is_err());
    }
}
