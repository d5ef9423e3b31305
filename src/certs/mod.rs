// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! HYGON certificate formats and the trait tying signers to signees.

pub mod builtin;
pub mod ca;
pub mod csv;

use crate::error::*;

/// Curve id carried by every SM2 public key on this chain.
pub const CURVE_SM2_256: u32 = 3;

/// Key usage tags. Part of the wire contract; the values must stay stable.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Usage {
    HRK = 0x0000,
    HSK = 0x0013,
    INV = 0x1000,
    OCA = 0x1001,
    PEK = 0x1002,
    PDH = 0x1003,
    CEK = 0x1004,
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Usage::HRK => "HRK",
            Usage::HSK => "HSK",
            Usage::INV => "INVALID",
            Usage::OCA => "OCA",
            Usage::PEK => "PEK",
            Usage::PDH => "PDH",
            Usage::CEK => "CEK",
        };
        write!(f, "{}", name)
    }
}

/// A pair whose first element endorses the second.
pub trait Verifiable {
    type Output;

    fn verify(self) -> Result<Self::Output>;
}

/// SM2 public key as laid out inside HYGON certificates: 72-byte coordinate
/// fields holding byte-reversed 32-byte values, followed by a
/// length-prefixed user id region.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PubKey {
    pub curve_id: u32,
    pub x: [u8; 72],
    pub y: [u8; 72],
    pub uid_size: u16,
    pub user_id: [u8; 254],
}

static_assertions::const_assert!(std::mem::size_of::<PubKey>() == 404);

impl Default for PubKey {
    fn default() -> Self {
        PubKey {
            curve_id: 0,
            x: [0u8; 72],
            y: [0u8; 72],
            uid_size: 0,
            user_id: [0u8; 254],
        }
    }
}

impl PubKey {
    /// The effective SM2 user id. `uid_size` comes off the wire, so it is
    /// range-checked rather than trusted.
    pub fn user_id(&self) -> Result<&[u8]> {
        let len = self.uid_size as usize;
        if len > self.user_id.len() {
            return Err(Error::Format(format!(
                "ecc pubkey user id size err, max {}, got {}",
                self.user_id.len(),
                len
            )));
        }
        Ok(&self.user_id[..len])
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for fabricating SM2 material in the wire format.

    use super::PubKey;
    use crate::crypto::sig::ecdsa;
    use crate::crypto::{sm2, ECC_LEN};

    use openssl::bn::{BigNum, BigNumContext};
    use openssl::ec::{EcGroup, EcKey};
    use openssl::ecdsa::EcdsaSig;
    use openssl::nid::Nid;
    use openssl::pkey::{PKey, Private};

    pub fn generate_sm2() -> EcKey<Private> {
        let group = EcGroup::from_curve_name(Nid::SM2).unwrap();
        EcKey::generate(&group).unwrap()
    }

    /// Lay a key out the way HYGON certificates carry it.
    pub fn wire_pubkey(key: &EcKey<Private>, uid: &[u8]) -> PubKey {
        let group = EcGroup::from_curve_name(Nid::SM2).unwrap();
        let mut ctx = BigNumContext::new().unwrap();
        let mut x = BigNum::new().unwrap();
        let mut y = BigNum::new().unwrap();
        key.public_key()
            .affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx)
            .unwrap();

        let mut xb = x.to_vec_padded(ECC_LEN as i32).unwrap();
        let mut yb = y.to_vec_padded(ECC_LEN as i32).unwrap();
        xb.reverse();
        yb.reverse();

        let mut out = PubKey {
            curve_id: super::CURVE_SM2_256,
            ..PubKey::default()
        };
        out.x[..ECC_LEN].copy_from_slice(&xb);
        out.y[..ECC_LEN].copy_from_slice(&yb);
        out.uid_size = uid.len() as u16;
        out.user_id[..uid.len()].copy_from_slice(uid);
        out
    }

    /// Convert a DER signature into the byte-reversed wire fields.
    pub fn wire_signature(der: &[u8]) -> ecdsa::Signature {
        let sig = EcdsaSig::from_der(der).unwrap();
        let mut r = sig.r().to_vec_padded(ECC_LEN as i32).unwrap();
        let mut s = sig.s().to_vec_padded(ECC_LEN as i32).unwrap();
        r.reverse();
        s.reverse();

        let mut out = ecdsa::Signature::default();
        out.r[..ECC_LEN].copy_from_slice(&r);
        out.s[..ECC_LEN].copy_from_slice(&s);
        out
    }

    /// SM2-sign `body` with `uid` and return the wire-format signature.
    pub fn sign_body(body: &[u8], key: &EcKey<Private>, uid: &[u8]) -> ecdsa::Signature {
        let pkey = PKey::from_ec_key(key.clone()).unwrap();
        let der = sm2::sign(body, &pkey, uid).unwrap();
        wire_signature(&der)
    }
}
