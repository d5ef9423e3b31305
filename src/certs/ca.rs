// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Chip root certificates (HRK and HSK), the `CHIP_ROOT_CERT_t` format.

use super::{PubKey, Usage, Verifiable};
use crate::crypto::{sig::ecdsa, PublicKey, Signature};
use crate::error::*;
use crate::util::*;

use std::io::{Read, Write};
use std::mem::size_of;

use static_assertions::const_assert;

/// The signed portion of a chip root certificate.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Body {
    pub version: u32,
    pub key_id: [u8; 16],
    pub certifying_id: [u8; 16],
    pub key_usage: u32,
    pub reserved1: [u8; 24],
    pub pubkey: PubKey,
    pub reserved2: [u8; 108],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Certificate {
    pub body: Body,
    pub sig: ecdsa::Signature,
    pub reserved3: [u8; 112],
}

const_assert!(size_of::<Body>() == 576);
const_assert!(size_of::<Certificate>() == 832);

impl Default for Body {
    fn default() -> Self {
        Body {
            version: 0,
            key_id: [0u8; 16],
            certifying_id: [0u8; 16],
            key_usage: Usage::INV as u32,
            reserved1: [0u8; 24],
            pubkey: PubKey::default(),
            reserved2: [0u8; 108],
        }
    }
}

impl Default for Certificate {
    fn default() -> Self {
        Certificate {
            body: Body::default(),
            sig: ecdsa::Signature::default(),
            reserved3: [0u8; 112],
        }
    }
}

impl Certificate {
    /// Decodes a certificate from exactly `sizeof(CHIP_ROOT_CERT_t)` bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != size_of::<Self>() {
            return Err(Error::Format(format!(
                "csv hsk cert size err, expect {}, got {}",
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

impl Verifiable for (&PubKey, &Certificate) {
    type Output = ();

    fn verify(self) -> Result<()> {
        let key: PublicKey = self.0.try_into()?;
        let sig = Signature {
            sig: Vec::try_from(&self.1.sig)?,
            usage: Usage::HRK,
        };
        key.verify(self.1, self.0.user_id()?, &sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::test_support::{generate_sm2, sign_body, wire_pubkey};
    use codicon::{Decoder, Encoder};

    #[test]
    fn codec_roundtrip() {
        let mut cert = Certificate::default();
        cert.body.version = 1;
        cert.body.key_usage = Usage::HSK as u32;
        cert.body.key_id = [7u8; 16];

        let mut encoded = Vec::new();
        cert.encode(&mut encoded, ()).unwrap();
        assert_eq!(encoded.len(), 832);

        let decoded = Certificate::decode(&mut &encoded[..], ()).unwrap();
        assert_eq!(decoded.body.version, 1);
        assert_eq!(decoded.body.key_usage, Usage::HSK as u32);
        assert_eq!(decoded.body.key_id, [7u8; 16]);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Certificate::from_bytes(&[0u8; 831]).is_err());
        assert!(Certificate::from_bytes(&[0u8; 833]).is_err());
    }

    #[test]
    fn root_signature_check() {
        let root = generate_sm2();
        let root_pub = wire_pubkey(&root, b"ROOT-ID");

        let subject = generate_sm2();
        let mut cert = Certificate::default();
        cert.body.version = 1;
        cert.body.key_usage = Usage::HSK as u32;
        cert.body.pubkey = wire_pubkey(&subject, b"HSK-ID");
        cert.sig = sign_body(&raw_bytes(&cert.body), &root, b"ROOT-ID");

        (&root_pub, &cert).verify().unwrap();

        cert.body.reserved2[0] ^= 1;
        assert!((&root_pub, &cert).verify().is_err());
    }
}
