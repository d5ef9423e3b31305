// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Wire-format signature blocks.

pub mod ecdsa {
    use serde::{Deserialize, Serialize};
    use serde_big_array::BigArray;

    /// An SM2/ECDSA signature as stored inside HYGON certificates and
    /// attestation reports: two 72-byte fields holding byte-reversed
    /// 32-byte values, zero padded.
    #[repr(C)]
    #[derive(Debug, Copy, Clone, Serialize, Deserialize)]
    pub struct Signature {
        #[serde(with = "BigArray")]
        pub r: [u8; 72],
        #[serde(with = "BigArray")]
        pub s: [u8; 72],
    }

    impl Default for Signature {
        fn default() -> Self {
            Signature {
                r: [0u8; 72],
                s: [0u8; 72],
            }
        }
    }

    impl PartialEq for Signature {
        fn eq(&self, other: &Self) -> bool {
            self.r[..] == other.r[..] && self.s[..] == other.s[..]
        }
    }

    impl Eq for Signature {}

    static_assertions::const_assert!(std::mem::size_of::<Signature>() == 144);
}
