// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! SM2 signing and verification with an explicit user id.
//!
//! HYGON signs with platform-specific SM2 user ids, while the safe
//! `openssl` wrapper only performs SM2 operations under the default id.
//! These routines drive the EVP interface through `openssl-sys` so the id
//! can be set on the key context (`EVP_PKEY_CTRL_SET1_ID`) before any data
//! is hashed. The hash function is SM3 throughout.

use crate::error::*;

use foreign_types::ForeignTypeRef;
use libc::{c_int, c_void};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKeyRef, Private, Public};
use openssl_sys as ffi;

// evp.h: #define EVP_PKEY_CTRL_SET1_ID 15
const EVP_PKEY_CTRL_SET1_ID: c_int = 15;

struct MdCtx(*mut ffi::EVP_MD_CTX);

impl MdCtx {
    fn new() -> Result<Self> {
        let ptr = unsafe { ffi::EVP_MD_CTX_new() };
        if ptr.is_null() {
            return Err(ErrorStack::get().into());
        }
        Ok(MdCtx(ptr))
    }
}

impl Drop for MdCtx {
    fn drop(&mut self) {
        unsafe { ffi::EVP_MD_CTX_free(self.0) };
    }
}

fn cvt(ret: c_int) -> Result<()> {
    if ret == 1 {
        Ok(())
    } else {
        Err(ErrorStack::get().into())
    }
}

/// Sets the SM2 distinguishing id on the pkey context owned by `ctx`. Must
/// run after the digest operation is initialized and before any update so
/// the Z digest is computed under the right id.
unsafe fn set_user_id(pctx: *mut ffi::EVP_PKEY_CTX, user_id: &[u8]) -> Result<()> {
    cvt(ffi::EVP_PKEY_CTX_ctrl(
        pctx,
        -1,
        -1,
        EVP_PKEY_CTRL_SET1_ID,
        user_id.len() as c_int,
        user_id.as_ptr() as *mut c_void,
    ))
}

/// Verifies a DER-encoded SM2 signature over `message` under `user_id`.
///
/// Returns `Ok(false)` for a well-formed but wrong signature; `Err` only for
/// operational failures.
pub fn verify(
    message: &[u8],
    sig_der: &[u8],
    key: &PKeyRef<Public>,
    user_id: &[u8],
) -> Result<bool> {
    let ctx = MdCtx::new()?;
    unsafe {
        let mut pctx: *mut ffi::EVP_PKEY_CTX = std::ptr::null_mut();
        cvt(ffi::EVP_DigestVerifyInit(
            ctx.0,
            &mut pctx,
            MessageDigest::sm3().as_ptr(),
            std::ptr::null_mut(),
            key.as_ptr(),
        ))?;
        set_user_id(pctx, user_id)?;
        cvt(ffi::EVP_DigestUpdate(
            ctx.0,
            message.as_ptr() as *const c_void,
            message.len(),
        ))?;

        let ret = ffi::EVP_DigestVerifyFinal(ctx.0, sig_der.as_ptr(), sig_der.len());
        if ret < 0 {
            return Err(ErrorStack::get().into());
        }
        if ret != 1 {
            // Drain whatever the failed verification queued up.
            let _ = ErrorStack::get();
        }
        Ok(ret == 1)
    }
}

/// Produces a DER-encoded SM2 signature over `message` under `user_id`.
pub fn sign(message: &[u8], key: &PKeyRef<Private>, user_id: &[u8]) -> Result<Vec<u8>> {
    let ctx = MdCtx::new()?;
    unsafe {
        let mut pctx: *mut ffi::EVP_PKEY_CTX = std::ptr::null_mut();
        cvt(ffi::EVP_DigestSignInit(
            ctx.0,
            &mut pctx,
            MessageDigest::sm3().as_ptr(),
            std::ptr::null_mut(),
            key.as_ptr(),
        ))?;
        set_user_id(pctx, user_id)?;
        cvt(ffi::EVP_DigestUpdate(
            ctx.0,
            message.as_ptr() as *const c_void,
            message.len(),
        ))?;

        let mut len = 0usize;
        cvt(ffi::EVP_DigestSignFinal(
            ctx.0,
            std::ptr::null_mut(),
            &mut len,
        ))?;
        let mut sig = vec![0u8; len];
        cvt(ffi::EVP_DigestSignFinal(ctx.0, sig.as_mut_ptr(), &mut len))?;
        sig.truncate(len);
        Ok(sig)
    }
}
