// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Compiled-in trust anchors.

use super::{PubKey, CURVE_SM2_256};

// Wire-order (byte-reversed) SM2 coordinates of the HYGON Root Key, as
// published at https://cert.hygon.cn/hrk. The chain verifier pins this key;
// it is never fetched.
const HRK_QX: [u8; 32] = [
    0x2d, 0xf6, 0xc2, 0x92, 0x1d, 0xf2, 0xf5, 0x2a, 0x50, 0x1f, 0xcd, 0x85, 0xe7, 0x35, 0x09,
    0xc8, 0x75, 0x3a, 0x56, 0x09, 0xdb, 0x02, 0xd7, 0xf3, 0x4c, 0xf1, 0xa4, 0x62, 0x4d, 0xe1,
    0x62, 0xbe,
];

const HRK_QY: [u8; 32] = [
    0x46, 0xb9, 0x1e, 0xb4, 0x68, 0x4d, 0x74, 0x38, 0x47, 0x88, 0xbe, 0xb9, 0x10, 0x0c, 0x64,
    0x4a, 0x38, 0x95, 0x4e, 0x16, 0x97, 0x8b, 0x4f, 0x58, 0x15, 0x70, 0xbb, 0x57, 0x3a, 0x12,
    0xab, 0x3b,
];

const HRK_USER_ID: &[u8] = b"HYGON-SSD-HRK";

/// The HYGON Root Key public key in wire layout.
pub fn hrk_pubkey() -> PubKey {
    let mut key = PubKey {
        curve_id: CURVE_SM2_256,
        ..PubKey::default()
    };
    key.x[..HRK_QX.len()].copy_from_slice(&HRK_QX);
    key.y[..HRK_QY.len()].copy_from_slice(&HRK_QY);
    key.uid_size = HRK_USER_ID.len() as u16;
    key.user_id[..HRK_USER_ID.len()].copy_from_slice(HRK_USER_ID);
    key
}
