// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The HYGON CSV verifier: SM2 certificate chain
//! HRK → HSK → CEK → PEK → quote, followed by attribute export.

use super::{check_envelope, AttestationVerifier};
use crate::certs::{builtin, ca, csv, PubKey, Usage, Verifiable};
use crate::error::*;
use crate::platform;
use crate::policy::UnifiedAttestationAttributes;
use crate::quote::csv::AttestationReport;
use crate::report::{HygonCsvCertChain, HygonCsvReport, UnifiedAttestationReport};

#[derive(Debug)]
pub struct CsvVerifier {
    quote: AttestationReport,
    hsk_cert: ca::Certificate,
    cek_cert: csv::Certificate,
}

impl CsvVerifier {
    pub fn create(
        report: UnifiedAttestationReport,
        _current_time: i64,
    ) -> Result<Box<dyn AttestationVerifier>> {
        Ok(Box::new(CsvVerifier::new(report)?))
    }

    pub fn new(report: UnifiedAttestationReport) -> Result<Self> {
        check_envelope(&report, platform::CSV)?;

        let body = HygonCsvReport::from_json(&report.json_report)?;
        let quote = AttestationReport::from_bytes(&base64::decode(&body.b64_quote)?)?;

        let chain = HygonCsvCertChain::from_json(&body.json_cert_chain)?;
        let hsk_cert = ca::Certificate::from_bytes(&base64::decode(&chain.b64_hsk_cert)?)?;
        let cek_cert = csv::Certificate::from_bytes(&base64::decode(&chain.b64_cek_cert)?)?;

        Ok(CsvVerifier {
            quote,
            hsk_cert,
            cek_cert,
        })
    }
}

impl AttestationVerifier for CsvVerifier {
    fn verify_platform(&self) -> Result<()> {
        verify_chain(
            &self.quote,
            &self.hsk_cert,
            &self.cek_cert,
            &builtin::hrk_pubkey(),
        )?;
        log::info!("csv report platform verification passed");
        Ok(())
    }

    fn parse_unified_report(&self) -> Result<UnifiedAttestationAttributes> {
        extract_attributes(&self.quote)
    }
}

/// Runs the four signature checks in their fixed order. A failure names the
/// earliest failing step in its details.
pub(crate) fn verify_chain(
    quote: &AttestationReport,
    hsk_cert: &ca::Certificate,
    cek_cert: &csv::Certificate,
    hrk_pubkey: &PubKey,
) -> Result<()> {
    verify_hsk_cert_with_hrk_pubkey(hsk_cert, hrk_pubkey)?;
    verify_cek_cert_with_hsk_cert(cek_cert, hsk_cert)?;

    let pek_cert = quote
        .pek_cert()
        .map_err(|err| Error::in_step("RetrievePekCert", err))?;

    verify_pek_cert_with_cek_cert(&pek_cert, cek_cert)?;
    verify_quote_signature(quote, &pek_cert)
}

fn verify_hsk_cert_with_hrk_pubkey(hsk_cert: &ca::Certificate, hrk_pubkey: &PubKey) -> Result<()> {
    const STEP: &str = "VerifyHskCertWithHrkPubkey";

    if hsk_cert.body.key_usage != Usage::HSK as u32 {
        return Err(Error::step(
            STEP,
            format!(
                "HSK cert usage type err, expect {}, got {}",
                Usage::HSK as u32,
                hsk_cert.body.key_usage
            ),
        ));
    }

    (hrk_pubkey, hsk_cert)
        .verify()
        .map_err(|err| Error::in_step(STEP, err))?;
    log::info!("{} succeed", STEP);
    Ok(())
}

fn verify_cek_cert_with_hsk_cert(
    cek_cert: &csv::Certificate,
    hsk_cert: &ca::Certificate,
) -> Result<()> {
    const STEP: &str = "VerifyCekCertWithHskCert";

    if cek_cert.body.pubkey_usage != Usage::CEK as u32 {
        return Err(Error::step(
            STEP,
            format!(
                "CEK cert pubkey_usage type err, expect {}, got {}",
                Usage::CEK as u32,
                cek_cert.body.pubkey_usage
            ),
        ));
    }
    if cek_cert.sig1_usage != Usage::HSK as u32 {
        return Err(Error::step(
            STEP,
            format!(
                "CEK cert sig1 usage type err, expect {}, got {}",
                Usage::HSK as u32,
                cek_cert.sig1_usage
            ),
        ));
    }

    (hsk_cert, cek_cert)
        .verify()
        .map_err(|err| Error::in_step(STEP, err))?;
    log::info!("{} succeed", STEP);
    Ok(())
}

fn verify_pek_cert_with_cek_cert(
    pek_cert: &csv::Certificate,
    cek_cert: &csv::Certificate,
) -> Result<()> {
    const STEP: &str = "VerifyPekCertWithCekCert";

    if pek_cert.body.pubkey_usage != Usage::PEK as u32 {
        return Err(Error::step(
            STEP,
            format!(
                "PEK cert pubkey_usage type err, expect {}, got {}",
                Usage::PEK as u32,
                pek_cert.body.pubkey_usage
            ),
        ));
    }
    if pek_cert.sig1_usage != Usage::CEK as u32 {
        return Err(Error::step(
            STEP,
            format!(
                "PEK cert sig1 usage type err, expect {}, got {}",
                Usage::CEK as u32,
                pek_cert.sig1_usage
            ),
        ));
    }

    (cek_cert, pek_cert)
        .verify()
        .map_err(|err| Error::in_step(STEP, err))?;
    log::info!("{} succeed", STEP);
    Ok(())
}

fn verify_quote_signature(quote: &AttestationReport, pek_cert: &csv::Certificate) -> Result<()> {
    const STEP: &str = "VerifyQuoteSignature";

    (pek_cert, quote)
        .verify()
        .map_err(|err| Error::in_step(STEP, err))?;
    log::info!("{} succeed", STEP);
    Ok(())
}

/// Exports the attribute record from the de-obfuscated report body.
/// `bool_debug_disabled` stays empty: the policy word restricts debugging of
/// the guest, but the report does not state whether debugging is actually
/// off.
pub(crate) fn extract_attributes(quote: &AttestationReport) -> Result<UnifiedAttestationAttributes> {
    let body = quote.plain_body()?;

    let mut attrs = UnifiedAttestationAttributes::default();
    attrs.str_tee_platform = platform::CSV.to_string();
    attrs.hex_prod_id = hex::encode(body.vm_id);
    attrs.hex_platform_sw_version = hex::encode(body.vm_version);
    attrs.hex_user_data = hex::encode(&body.report_data[..32]);
    attrs.hex_hash_or_pem_pubkey = hex::encode(&body.report_data[32..]);
    attrs.hex_nonce = hex::encode(body.mnonce);
    attrs.hex_boot_measurement = hex::encode(body.measure);
    attrs.hex_secure_flags = hex::encode(body.policy.value().to_le_bytes());
    Ok(attrs)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fabricates a complete chain and quote rooted at a throwaway key so
    //! the real SM2 verification code paths can run end to end.

    use super::*;
    use crate::certs::test_support::{generate_sm2, sign_body, wire_pubkey};
    use crate::quote::csv::{xor_with_anonce, Body};
    use crate::util::{raw_bytes, TypeLoad};
    use crate::{report_type, REPORT_VERSION};

    use openssl::ec::EcKey;
    use openssl::pkey::Private;

    pub const HRK_UID: &[u8] = b"TEST-ROOT";
    pub const HSK_UID: &[u8] = b"TEST-HSK";
    pub const CEK_UID: &[u8] = b"TEST-CEK";
    pub const PEK_UID: &[u8] = b"TEST-PEK";

    pub struct TestChain {
        pub hrk_pubkey: PubKey,
        pub hsk_cert: ca::Certificate,
        pub cek_cert: csv::Certificate,
        pub pek: EcKey<Private>,
        pub pek_cert: csv::Certificate,
    }

    pub fn build_chain() -> TestChain {
        let hrk = generate_sm2();
        let hsk = generate_sm2();
        let cek = generate_sm2();
        let pek = generate_sm2();

        let mut hsk_cert = ca::Certificate::default();
        hsk_cert.body.version = 1;
        hsk_cert.body.key_usage = Usage::HSK as u32;
        hsk_cert.body.pubkey = wire_pubkey(&hsk, HSK_UID);
        hsk_cert.sig = sign_body(&raw_bytes(&hsk_cert.body), &hrk, HRK_UID);

        let mut cek_cert = csv::Certificate::default();
        cek_cert.body.version = 1;
        cek_cert.body.pubkey_usage = Usage::CEK as u32;
        cek_cert.body.pubkey = wire_pubkey(&cek, CEK_UID);
        cek_cert.sig1_usage = Usage::HSK as u32;
        cek_cert.sig1 = sign_body(&raw_bytes(&cek_cert.body), &hsk, HSK_UID);

        let mut pek_cert = csv::Certificate::default();
        pek_cert.body.version = 1;
        pek_cert.body.pubkey_usage = Usage::PEK as u32;
        pek_cert.body.pubkey = wire_pubkey(&pek, PEK_UID);
        pek_cert.sig1_usage = Usage::CEK as u32;
        pek_cert.sig1 = sign_body(&raw_bytes(&pek_cert.body), &cek, CEK_UID);

        TestChain {
            hrk_pubkey: wire_pubkey(&hrk, HRK_UID),
            hsk_cert,
            cek_cert,
            pek,
            pek_cert,
        }
    }

    pub struct PlainQuote {
        pub report_data: [u8; 64],
        pub vm_id: [u8; 16],
        pub vm_version: [u8; 16],
        pub mnonce: [u8; 16],
        pub measure: [u8; 32],
        pub chip_id: [u8; 64],
        pub anonce: u32,
    }

    impl Default for PlainQuote {
        fn default() -> Self {
            let mut report_data = [0u8; 64];
            report_data[..9].copy_from_slice(b"user_data");
            report_data[32..41].copy_from_slice(b"pk_digest");
            let mut chip_id = [0u8; 64];
            chip_id[..12].copy_from_slice(b"TEST-CHIP-01");
            PlainQuote {
                report_data,
                vm_id: [0x11; 16],
                vm_version: [0x22; 16],
                mnonce: [0x33; 16],
                measure: [0x44; 32],
                chip_id,
                anonce: 0x6b8f_01c4,
            }
        }
    }

    /// Builds an on-wire quote: body obfuscated with `anonce`, signature by
    /// the chain's PEK over the obfuscated prefix.
    pub fn build_quote(chain: &TestChain, plain: &PlainQuote) -> AttestationReport {
        let mut body = Body::default();
        body.report_data = plain.report_data;
        body.vm_id = plain.vm_id;
        body.vm_version = plain.vm_version;
        body.mnonce = plain.mnonce;
        body.measure = plain.measure;

        let mut wire_body = raw_bytes(&body);
        xor_with_anonce(&mut wire_body[32..], plain.anonce);

        let mut quote = AttestationReport::default();
        quote.body = (&mut &wire_body[..]).load().unwrap();
        quote.sig_usage = Usage::PEK as u32;
        quote.anonce = plain.anonce;
        quote.sig = sign_body(&wire_body, &chain.pek, PEK_UID);

        let mut pek_raw = raw_bytes(&chain.pek_cert);
        xor_with_anonce(&mut pek_raw, plain.anonce);
        quote.signer.pek_cert.copy_from_slice(&pek_raw);

        let mut sn = plain.chip_id;
        xor_with_anonce(&mut sn, plain.anonce);
        quote.signer.sn = sn;

        quote
    }

    pub fn report_json(
        quote: &AttestationReport,
        hsk_cert: &ca::Certificate,
        cek_cert: &csv::Certificate,
        chip_id: &str,
    ) -> String {
        let chain = HygonCsvCertChain {
            b64_hsk_cert: base64::encode(raw_bytes(hsk_cert)),
            b64_cek_cert: base64::encode(raw_bytes(cek_cert)),
        };
        let body = HygonCsvReport {
            b64_quote: base64::encode(raw_bytes(quote)),
            str_chip_id: chip_id.to_string(),
            json_cert_chain: serde_json::to_string(&chain).unwrap(),
        };
        let report = UnifiedAttestationReport {
            str_report_version: REPORT_VERSION.to_string(),
            str_report_type: report_type::PASSPORT.to_string(),
            str_tee_platform: platform::CSV.to_string(),
            json_report: serde_json::to_string(&body).unwrap(),
        };
        serde_json::to_string(&report).unwrap()
    }
}
