// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Download of the HYGON HSK/CEK certificate chain.
//!
//! `Passport` reports embed the chain; for `BackgroundCheck` reports a
//! relying party obtains it here, keyed by the chip id from the report.
//! Fetched chains are cached on disk so repeated verifications of quotes
//! from the same chip stay offline. Verification itself never performs
//! network I/O.

use crate::certs::{ca, csv};
use crate::error::*;
use crate::report::HygonCsvCertChain;

use std::mem::size_of;
use std::path::PathBuf;

use hyper::{Client, StatusCode, Uri};
use hyper_tls::HttpsConnector;

const HYGON_CERT_SITE: &str = "https://cert.hygon.cn";
const HSK_CEK_PATH: &str = "/hsk_cek?snumber=";
const HTTP_RETRY_TIMES: usize = 3;

/// Splits the raw `hsk_cek` response (HSK cert followed by CEK cert) into a
/// base64 certificate chain document.
pub fn cert_chain_from_bytes(raw: &[u8]) -> Result<HygonCsvCertChain> {
    let expected = size_of::<ca::Certificate>() + size_of::<csv::Certificate>();
    if raw.len() != expected {
        return Err(Error::Format(format!(
            "hsk and cek length should be {}, but got {}",
            expected,
            raw.len()
        )));
    }
    Ok(HygonCsvCertChain {
        b64_hsk_cert: base64::encode(&raw[..size_of::<ca::Certificate>()]),
        b64_cek_cert: base64::encode(&raw[size_of::<ca::Certificate>()..]),
    })
}

fn cache_path(chip_id: &str) -> Option<PathBuf> {
    // Chip ids feed into a path; anything but the expected serial charset
    // skips the cache rather than risking traversal.
    if chip_id.is_empty()
        || !chip_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(dirs::cache_dir()?.join("ual-rs").join("hsk_cek").join(chip_id))
}

fn read_cache(chip_id: &str) -> Option<Vec<u8>> {
    let raw = std::fs::read(cache_path(chip_id)?).ok()?;
    let expected = size_of::<ca::Certificate>() + size_of::<csv::Certificate>();
    (raw.len() == expected).then(|| raw)
}

fn write_cache(chip_id: &str, raw: &[u8]) {
    if let Some(path) = cache_path(chip_id) {
        if let Some(parent) = path.parent() {
            // Best effort; verification works without the cache.
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(path, raw);
    }
}

/// Fetches the HSK/CEK chain for `chip_id` from the HYGON cert service,
/// consulting the local cache first.
pub async fn fetch_hsk_cek(chip_id: &str) -> Result<HygonCsvCertChain> {
    let chip_id = chip_id.trim_end_matches(&['\0', ' '][..]);

    if let Some(raw) = read_cache(chip_id) {
        return cert_chain_from_bytes(&raw);
    }

    let uri: Uri = format!("{}{}{}", HYGON_CERT_SITE, HSK_CEK_PATH, chip_id).parse()?;
    let client = Client::builder().build::<_, hyper::Body>(HttpsConnector::new());

    let mut last_failure = String::new();
    for _ in 0..HTTP_RETRY_TIMES {
        match client.get(uri.clone()).await {
            Ok(response) if response.status() == StatusCode::OK => {
                let raw = hyper::body::to_bytes(response.into_body()).await?;
                let chain = cert_chain_from_bytes(&raw)?;
                write_cache(chip_id, &raw);
                log::info!("fetched hygon hsk/cek chain for chip {}", chip_id);
                return Ok(chain);
            }
            Ok(response) => {
                last_failure = format!("http status: {}", response.status());
            }
            Err(err) => {
                last_failure = err.to_string();
            }
        }
    }

    Err(Error::internal(format!(
        "get hygon csv hsk and cek failed, {}",
        last_failure
    )))
}

/// Blocking wrapper around [`fetch_hsk_cek`] for callers without an async
/// runtime.
pub fn fetch_hsk_cek_blocking(chip_id: &str) -> Result<HygonCsvCertChain> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fetch_hsk_cek(chip_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_well_sized_response() {
        let mut raw = vec![0u8; 832 + 2084];
        raw[0] = 0xaa;
        raw[832] = 0xbb;
        let chain = cert_chain_from_bytes(&raw).unwrap();
        assert_eq!(base64::decode(&chain.b64_hsk_cert).unwrap().len(), 832);
        let cek = base64::decode(&chain.b64_cek_cert).unwrap();
        assert_eq!(cek.len(), 2084);
        assert_eq!(cek[0], 0xbb);
    }

    #[test]
    fn rejects_odd_sizes() {
        assert!(cert_chain_from_bytes(&[0u8; 100]).is_err());
        assert!(cert_chain_from_bytes(&vec![0u8; 832 + 2084 + 1]).is_err());
    }

    #[test]
    fn suspicious_chip_ids_skip_the_cache() {
        assert!(cache_path("../../etc/passwd").is_none());
        assert!(cache_path("").is_none());
        assert!(cache_path("0123-ABCD_ef").is_some());
    }

    #[cfg(feature = "network_tests")]
    mod network {
        use super::super::*;
        use serial_test::serial;

        // Chip ids are machine specific; this exercises the request path
        // and the server's error handling with a bogus serial.
        #[tokio::test]
        #[serial]
        async fn fetch_with_bogus_serial_fails_cleanly() {
            let result = fetch_hsk_cek("NOT-A-REAL-CHIP").await;
            assert!(result.is_err());
        }
    }
}
