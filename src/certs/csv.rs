// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Endorsement-key certificates (CEK and PEK), the `CSV_CERT_t` format.

use super::{ca, PubKey, Usage, Verifiable};
use crate::crypto::{sig::ecdsa, PublicKey, Signature};
use crate::error::*;
use crate::util::*;

use std::io::{Read, Write};
use std::mem::size_of;

use static_assertions::const_assert;

/// The signed portion of an endorsement-key certificate.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Body {
    pub version: u32,
    pub api_major: u8,
    pub api_minor: u8,
    pub reserved1: u8,
    pub reserved2: u8,
    pub pubkey_usage: u32,
    pub pubkey_algo: u32,
    pub pubkey: PubKey,
    pub reserved3: [u8; 624],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Certificate {
    pub body: Body,
    pub sig1_usage: u32,
    pub sig1_algo: u32,
    pub sig1: ecdsa::Signature,
    pub reserved4: [u8; 368],
    pub sig2_usage: u32,
    pub sig2_algo: u32,
    pub sig2: ecdsa::Signature,
    pub reserved5: [u8; 368],
}

const_assert!(size_of::<Body>() == 1044);
const_assert!(size_of::<Certificate>() == 2084);

impl Default for Body {
    fn default() -> Self {
        Body {
            version: 0,
            api_major: 0,
            api_minor: 0,
            reserved1: 0,
            reserved2: 0,
            pubkey_usage: Usage::INV as u32,
            pubkey_algo: 0,
            pubkey: PubKey::default(),
            reserved3: [0u8; 624],
        }
    }
}

impl Default for Certificate {
    fn default() -> Self {
        Certificate {
            body: Body::default(),
            sig1_usage: Usage::INV as u32,
            sig1_algo: 0,
            sig1: ecdsa::Signature::default(),
            reserved4: [0u8; 368],
            sig2_usage: Usage::INV as u32,
            sig2_algo: 0,
            sig2: ecdsa::Signature::default(),
            reserved5: [0u8; 368],
        }
    }
}

impl Certificate {
    /// Decodes a certificate from exactly `sizeof(CSV_CERT_t)` bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != size_of::<Self>() {
            return Err(Error::Format(format!(
                "csv cert size err, expect {}, got {}",
                size_of::<Self>(),
                raw.len()
            )));
        }
        Ok((&mut &raw[..]).load()?)
    }
}

impl codicon::Decoder<()> for Certificate {
    type Error = std::io::Error;

    fn decode(mut reader: impl Read, _: ()) -> std::io::Result<Self> {
        reader.load()
    }
}

impl codicon::Encoder<()> for Certificate {
    type Error = std::io::Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> std::io::Result<()> {
        writer.save(self)
    }
}

impl codicon::Encoder<crate::Body> for Certificate {
    type Error = std::io::Error;

    fn encode(&self, mut writer: impl Write, _: crate::Body) -> std::io::Result<()> {
        writer.save(&self.body)
    }
}

/// CEK endorsed by the HSK.
impl Verifiable for (&ca::Certificate, &Certificate) {
    type Output = ();

    fn verify(self) -> Result<()> {
        let key: PublicKey = (&self.0.body.pubkey).try_into()?;
        let sig = Signature {
            sig: Vec::try_from(&self.1.sig1)?,
            usage: Usage::HSK,
        };
        key.verify(self.1, self.0.body.pubkey.user_id()?, &sig)
    }
}

/// PEK endorsed by the CEK.
impl Verifiable for (&Certificate, &Certificate) {
    type Output = ();

    fn verify(self) -> Result<()> {
        let key: PublicKey = (&self.0.body.pubkey).try_into()?;
        let sig = Signature {
            sig: Vec::try_from(&self.1.sig1)?,
            usage: Usage::CEK,
        };
        key.verify(self.1, self.0.body.pubkey.user_id()?, &sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::test_support::{generate_sm2, sign_body, wire_pubkey};

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Certificate::from_bytes(&[0u8; 2083]).is_err());
        assert!(Certificate::from_bytes(&vec![0u8; 2085]).is_err());
        assert!(Certificate::from_bytes(&vec![0u8; 2084]).is_ok());
    }

    #[test]
    fn pek_endorsed_by_cek() {
        let cek = generate_sm2();
        let pek = generate_sm2();

        let mut cek_cert = Certificate::default();
        cek_cert.body.pubkey_usage = Usage::CEK as u32;
        cek_cert.body.pubkey = wire_pubkey(&cek, b"CEK-ID");

        let mut pek_cert = Certificate::default();
        pek_cert.body.pubkey_usage = Usage::PEK as u32;
        pek_cert.body.pubkey = wire_pubkey(&pek, b"PEK-ID");
        pek_cert.sig1_usage = Usage::CEK as u32;
        pek_cert.sig1 = sign_body(&raw_bytes(&pek_cert.body), &cek, b"CEK-ID");

        (&cek_cert, &pek_cert).verify().unwrap();

        pek_cert.sig1.r[0] ^= 0xff;
        assert!((&cek_cert, &pek_cert).verify().is_err());
    }
}
