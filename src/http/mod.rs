//! HTTP fetcher: downloads one cycle container by segment id and format
//! into the cycle directory.
//!
//! Availability is a boolean. Origin misses (404, zero-length bodies) and
//! transport failures all read as "not available"; the store then moves on
//! to its next lookup step and the NABU sees an ordinary miss.

use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONNECTION;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::ContainerFormat;
use crate::types::SegmentId;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("nabud/", env!("CARGO_PKG_VERSION"));

/// Blocking downloader bound to one origin.
pub struct HttpFetcher {
    /// `host[:port][/path]`, no scheme, no trailing slash.
    origin: String,
    client: Client,
    cancel: Arc<AtomicBool>,
}

impl HttpFetcher {
    /// Create a fetcher for `origin`. The `cancel` flag is polled before
    /// each download so an interrupted session never starts a new transfer.
    pub fn new(origin: impl Into<String>, cancel: Arc<AtomicBool>) -> Result<Self> {
        let origin = origin.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            origin,
            client,
            cancel,
        })
    }

    /// Download one container into `cycle_dir`. Returns whether the file is
    /// now present locally.
    pub fn download(&self, cycle_dir: &Path, segment: SegmentId, format: ContainerFormat) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            return false;
        }
        let url = format!("http://{}/{}{}", self.origin, segment, format.remote_ext());
        match self.transfer(&url, cycle_dir, segment, format) {
            Ok(true) => {
                info!(%segment, origin = %self.origin, "downloaded container");
                true
            }
            Ok(false) => {
                debug!(%url, "container not available at origin");
                false
            }
            Err(error) => {
                debug!(%url, %error, "download failed");
                false
            }
        }
    }

    fn transfer(
        &self,
        url: &str,
        cycle_dir: &Path,
        segment: SegmentId,
        format: ContainerFormat,
    ) -> Result<bool> {
        let mut response = self.client.get(url).header(CONNECTION, "close").send()?;

        // 404 and every other non-success status read the same: not here.
        if !response.status().is_success() {
            return Ok(false);
        }
        if response.content_length() == Some(0) {
            return Ok(false);
        }

        let path = cycle_dir.join(format!("{segment}{}", format.local_ext()));
        let mut file = File::create(&path)?;
        if let Err(error) = response.copy_to(&mut file) {
            // Don't leave a torn container behind to satisfy later lookups.
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(error.into());
        }
        Ok(true)
    }
}
