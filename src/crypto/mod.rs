// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Cryptographic primitives for the CSV certificate chain: SM2 key and
//! signature import from the HYGON wire format, SM2 verification with an
//! explicit user id, and HMAC-SM3.

pub mod sig;
pub mod sm2;

use crate::certs::{PubKey, Usage, CURVE_SM2_256};
use crate::error::*;

use openssl::{
    bn::BigNum,
    ec::{EcGroup, EcKey},
    ecdsa::EcdsaSig,
    hash::MessageDigest,
    nid::Nid,
    pkey,
    sign,
};

/// Number of significant bytes in an SM2 field element on the wire. The
/// surrounding 72-byte fields are zero padding.
pub const ECC_LEN: usize = 32;

/// An imported SM2 public key ready for verification.
pub struct PublicKey {
    pub key: pkey::PKey<pkey::Public>,
}

/// A DER-encoded signature together with the key usage it was made under.
pub struct Signature {
    pub sig: Vec<u8>,
    pub usage: Usage,
}

impl TryFrom<&PubKey> for PublicKey {
    type Error = Error;

    /// Builds a key handle from the wire representation. Qx/Qy arrive
    /// byte-reversed relative to big-endian; only the first [`ECC_LEN`]
    /// bytes of each carry data.
    fn try_from(pubkey: &PubKey) -> Result<Self> {
        if pubkey.curve_id != CURVE_SM2_256 {
            return Err(Error::Format(format!(
                "unsupported ecc curve id: {}",
                pubkey.curve_id
            )));
        }

        let mut qx = pubkey.x[..ECC_LEN].to_vec();
        let mut qy = pubkey.y[..ECC_LEN].to_vec();
        qx.reverse();
        qy.reverse();

        let group = EcGroup::from_curve_name(Nid::SM2)?;
        let x = BigNum::from_slice(&qx)?;
        let y = BigNum::from_slice(&qy)?;
        let ec = EcKey::from_public_key_affine_coordinates(&group, &x, &y)?;
        Ok(PublicKey {
            key: pkey::PKey::from_ec_key(ec)?,
        })
    }
}

impl TryFrom<&sig::ecdsa::Signature> for Vec<u8> {
    type Error = Error;

    /// Assembles the ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }` from the
    /// byte-reversed wire fields.
    fn try_from(signature: &sig::ecdsa::Signature) -> Result<Self> {
        let mut r = signature.r[..ECC_LEN].to_vec();
        let mut s = signature.s[..ECC_LEN].to_vec();
        r.reverse();
        s.reverse();

        let r = BigNum::from_slice(&r)?;
        let s = BigNum::from_slice(&s)?;
        let sig = EcdsaSig::from_private_components(r, s)?;
        Ok(sig.to_der()?)
    }
}

impl PublicKey {
    /// Verifies `sig` over the signed body of `msg` with the given SM2
    /// user id.
    pub fn verify(
        &self,
        msg: &impl codicon::Encoder<crate::Body, Error = std::io::Error>,
        uid: &[u8],
        sig: &Signature,
    ) -> Result<()> {
        let mut body = Vec::new();
        msg.encode(&mut body, crate::Body)?;
        if sm2::verify(&body, &sig.sig, &self.key, uid)? {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }
}

/// HMAC-SM3 over the concatenation of `parts`.
pub fn hmac_sm3(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>> {
    let key = pkey::PKey::hmac(key)?;
    let mut signer = sign::Signer::new(MessageDigest::sm3(), &key)?;
    for part in parts {
        signer.update(part)?;
    }
    Ok(signer.sign_to_vec()?)
}
