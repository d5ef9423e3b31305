// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! The HYGON CSV attestation report (`csv_attestation_report`).
//!
//! The firmware XOR-obfuscates most fields of the report with the per-quote
//! 32-bit `anonce`. Decoding keeps the on-wire form untouched because the
//! quote signature is computed over the obfuscated body; de-obfuscated views
//! are produced lazily by [`AttestationReport::plain_body`] and friends.

use crate::certs::{csv, Usage, Verifiable};
use crate::crypto::{self, sig::ecdsa, PublicKey, Signature};
use crate::error::*;
use crate::util::*;

use std::io::Write;
use std::mem::size_of;

use bitfield::bitfield;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use static_assertions::const_assert;

bitfield! {
    /// The guest policy bound to the VM at launch. The firmware enforces it
    /// for the lifetime of the guest and carries it into the report.
    ///
    /// | Bit(s) | Name        | Meaning when set                           |
    /// |--------|-------------|--------------------------------------------|
    /// | 0      | NODBG       | Debugging of the guest is disallowed       |
    /// | 1      | NOKS        | Key sharing with other guests is disallowed|
    /// | 2      | ES          | CSV2 is required                           |
    /// | 3      | NOSEND      | Guest cannot be sent to another platform   |
    /// | 4      | DOMAIN      | Migration restricted to the same domain    |
    /// | 5      | CSV         | Migration restricted to CSV platforms      |
    /// | 6      | CSV3        | Migration restricted to CSV3 platforms     |
    /// | 7      | ASID_REUSE  | ASID sharing between same-owner guests     |
    /// | 11:8   | HSK_VERSION | Minimum HSK version                        |
    /// | 15:12  | CEK_VERSION | Minimum CEK version                        |
    /// | 23:16  | API_MAJOR   | Minimum platform major version             |
    /// | 31:24  | API_MINOR   | Minimum platform minor version             |
    #[repr(C)]
    #[derive(Copy, Clone, Serialize, Deserialize, Default)]
    pub struct GuestPolicy(u32);
    impl Debug;
    pub nodbg, _: 0, 0;
    pub noks, _: 1, 1;
    pub es, _: 2, 2;
    pub nosend, _: 3, 3;
    pub domain, _: 4, 4;
    pub csv, _: 5, 5;
    pub csv3, _: 6, 6;
    pub asid_reuse, _: 7, 7;
    pub hsk_version, _: 11, 8;
    pub cek_version, _: 15, 12;
    pub api_major, _: 23, 16;
    pub api_minor, _: 31, 24;
}

impl GuestPolicy {
    /// The raw policy word as it appears in the report.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// The signed body of a CSV attestation report.
#[repr(C)]
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Body {
    pub user_pubkey_digest: [u8; 32],
    pub vm_id: [u8; 16],
    pub vm_version: [u8; 16],
    #[serde(with = "BigArray")]
    pub report_data: [u8; 64],
    pub mnonce: [u8; 16],
    pub measure: [u8; 32],
    pub policy: GuestPolicy,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            user_pubkey_digest: Default::default(),
            vm_id: Default::default(),
            vm_version: Default::default(),
            report_data: [0u8; 64],
            mnonce: Default::default(),
            measure: Default::default(),
            policy: Default::default(),
        }
    }
}

/// Signature evidence trailing the report body: the PEK certificate, the
/// chip serial number and the HMAC tying them to this quote's mnonce.
/// `pek_cert` and `sn` are XOR-obfuscated with `anonce`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct ReportSigner {
    #[serde(with = "BigArray")]
    pub pek_cert: [u8; 2084],
    #[serde(with = "BigArray")]
    pub sn: [u8; 64],
    pub reserved: [u8; 32],
    pub mac: [u8; 32],
}

impl Default for ReportSigner {
    fn default() -> Self {
        Self {
            pek_cert: [0u8; 2084],
            sn: [0u8; 64],
            reserved: Default::default(),
            mac: Default::default(),
        }
    }
}

/// A complete CSV attestation report as read off the wire.
#[repr(C)]
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default)]
pub struct AttestationReport {
    pub body: Body,
    pub sig_usage: u32,
    pub sig_algo: u32,
    pub anonce: u32,
    pub sig: ecdsa::Signature,
    pub signer: ReportSigner,
}

const_assert!(size_of::<Body>() == 180);
const_assert!(size_of::<ReportSigner>() == 2212);
const_assert!(size_of::<AttestationReport>() == 2548);

/// XOR a buffer with the little-endian bytes of `anonce`, repeating every
/// four bytes. Applying it twice restores the input.
pub fn xor_with_anonce(data: &mut [u8], anonce: u32) {
    let anonce_array = anonce.to_le_bytes();

    for (index, item) in data.iter_mut().enumerate() {
        *item ^= anonce_array[index % 4];
    }
}

impl AttestationReport {
    /// Decodes a report from exactly `sizeof(csv_attestation_report)` bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != size_of::<Self>() {
            return Err(Error::Format(format!(
                "csv quote size err, expect {}, got {}",
                size_of::<Self>(),
                raw.len()
            )));
        }
        Ok((&mut &raw[..]).load()?)
    }

    /// De-obfuscated copy of the report body. `user_pubkey_digest` is not
    /// obfuscated by the firmware and passes through unchanged.
    pub fn plain_body(&self) -> Result<Body> {
        let mut raw = raw_bytes(&self.body);
        xor_with_anonce(&mut raw[32..], self.anonce);
        Ok((&mut &raw[..]).load()?)
    }

    /// The PEK certificate recovered from the obfuscated signer block.
    pub fn pek_cert(&self) -> Result<csv::Certificate> {
        let mut raw = self.signer.pek_cert;
        xor_with_anonce(&mut raw, self.anonce);
        Ok((&mut &raw[..]).load()?)
    }

    /// The de-obfuscated chip serial number.
    pub fn chip_id(&self) -> [u8; 64] {
        let mut sn = self.signer.sn;
        xor_with_anonce(&mut sn, self.anonce);
        sn
    }
}

impl codicon::Encoder<crate::Body> for AttestationReport {
    type Error = std::io::Error;

    fn encode(&self, mut writer: impl Write, _: crate::Body) -> std::io::Result<()> {
        writer.save(&self.body)
    }
}

impl TryFrom<&AttestationReport> for Signature {
    type Error = Error;

    #[inline]
    fn try_from(value: &AttestationReport) -> Result<Self> {
        let sig = Vec::try_from(&value.sig)?;
        Ok(Self {
            sig,
            usage: Usage::PEK,
        })
    }
}

/// Quote endorsed by the PEK.
impl Verifiable for (&csv::Certificate, &AttestationReport) {
    type Output = ();

    fn verify(self) -> Result<()> {
        let key: PublicKey = (&self.0.body.pubkey).try_into()?;
        let sig: Signature = self.1.try_into()?;
        key.verify(self.1, self.0.body.pubkey.user_id()?, &sig)
    }
}

impl ReportSigner {
    /// Checks the HMAC-SM3 tying the PEK certificate and chip serial to the
    /// mnonce drawn for this request. Only the generator can run it on a
    /// fresh quote (the plain mnonce never travels with the report, and the
    /// hypervisor zeroes `reserved` once the report leaves the guest), so
    /// remote chain verification deliberately does not call it.
    pub fn verify(&self, input_mnonce: &[u8], mnonce: &[u8; 16], anonce: u32) -> Result<()> {
        let mut real_mnonce = mnonce.to_vec();
        xor_with_anonce(&mut real_mnonce, anonce);

        if real_mnonce != input_mnonce {
            return Err(Error::BadSignature);
        }

        let mac = crypto::hmac_sm3(&real_mnonce, &[&self.pek_cert, &self.sn, &self.reserved])?;
        if mac != self.mac {
            return Err(Error::BadSignature);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_bytes_requires_exact_size() {
        assert!(AttestationReport::from_bytes(&vec![0u8; 2547]).is_err());
        assert!(AttestationReport::from_bytes(&vec![0u8; 2549]).is_err());
        assert!(AttestationReport::from_bytes(&vec![0u8; 2548]).is_ok());
    }

    #[test]
    fn plain_body_undoes_obfuscation() {
        let mut report = AttestationReport::default();
        report.anonce = 0xdead_beef;
        report.body.user_pubkey_digest = [0xaa; 32];

        let plain_vm_id = [0x11u8; 16];
        let mut obfuscated = plain_vm_id;
        xor_with_anonce(&mut obfuscated, report.anonce);
        report.body.vm_id = obfuscated;

        let mut policy_word = 0x0003_0001u32.to_le_bytes();
        xor_with_anonce(&mut policy_word, report.anonce);
        report.body.policy = GuestPolicy(u32::from_le_bytes(policy_word));

        let body = report.plain_body().unwrap();
        assert_eq!(body.vm_id, plain_vm_id);
        assert_eq!(body.user_pubkey_digest, [0xaa; 32]);
        assert_eq!(body.policy.value(), 0x0003_0001);
        assert_eq!(body.policy.nodbg(), 1);
        assert_eq!(body.policy.api_major(), 3);
    }

    #[test]
    fn chip_id_is_deobfuscated() {
        let mut report = AttestationReport::default();
        report.anonce = 0x0102_0304;

        let mut sn = [0u8; 64];
        sn[..12].copy_from_slice(b"CHIP-SERIAL1");
        let mut obfuscated = sn;
        xor_with_anonce(&mut obfuscated, report.anonce);
        report.signer.sn = obfuscated;

        assert_eq!(report.chip_id(), sn);
    }

    #[test]
    fn signer_hmac() {
        let plain_mnonce = [7u8; 16];
        let anonce = 0x55aa_33cc;

        let mut signer = ReportSigner::default();
        signer.pek_cert[..4].copy_from_slice(&[1, 2, 3, 4]);
        signer.sn[..4].copy_from_slice(&[5, 6, 7, 8]);
        signer.reserved = [9u8; 32];

        let mac = crypto::hmac_sm3(
            &plain_mnonce,
            &[&signer.pek_cert, &signer.sn, &signer.reserved],
        )
        .unwrap();
        signer.mac.copy_from_slice(&mac);

        let mut wire_mnonce = plain_mnonce;
        xor_with_anonce(&mut wire_mnonce, anonce);

        signer
            .verify(&plain_mnonce, &wire_mnonce, anonce)
            .unwrap();

        // Wrong expected mnonce.
        assert!(signer.verify(&[0u8; 16], &wire_mnonce, anonce).is_err());

        // Tampered certificate bytes break the MAC.
        signer.pek_cert[0] ^= 1;
        assert!(signer
            .verify(&plain_mnonce, &wire_mnonce, anonce)
            .is_err());
    }

    proptest! {
        #[test]
        fn xor_is_an_involution(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            anonce in any::<u32>(),
        ) {
            let mut buf = data.clone();
            xor_with_anonce(&mut buf, anonce);
            xor_with_anonce(&mut buf, anonce);
            prop_assert_eq!(buf, data);
        }
    }
}
