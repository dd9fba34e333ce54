//! Packet store: locate a packet on local disk in one of two container
//! formats, or fetch the container from the HTTP origin on miss.
//!
//! Lookup order for a request is fixed: local framed, local raw, fetched
//! framed, fetched raw. Each step independently reports presence or absence;
//! the store is a fold over the ordered list.

mod framed;
mod raw;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::http::HttpFetcher;
use crate::types::SegmentId;

/// A producer of wire-ready packets.
///
/// `Ok(None)` means the packet does not exist anywhere the source can see;
/// `Err` means the lookup itself failed and the request should be aborted.
pub trait PacketSource {
    fn fetch(&mut self, segment: SegmentId, packet_number: u8) -> Result<Option<Vec<u8>>>;
}

/// The two on-disk container formats of a cycle directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// `.pak`: self-describing packets behind u16-LE length prefixes.
    Framed,
    /// `.nab`: opaque payload bytes sliced on a 991-byte stride.
    Raw,
}

impl ContainerFormat {
    /// Extension of the local container file.
    pub fn local_ext(self) -> &'static str {
        match self {
            Self::Framed => ".pak",
            Self::Raw => ".nab",
        }
    }

    /// Extension used in origin URLs. The raw form is `.nabu` upstream and
    /// truncated to `.nab` on disk, a leftover of 8.3 file naming.
    pub fn remote_ext(self) -> &'static str {
        match self {
            Self::Framed => ".pak",
            Self::Raw => ".nabu",
        }
    }
}

/// Packet store over one cycle directory, with an optional HTTP fallback.
pub struct CycleStore {
    cycle_dir: PathBuf,
    fetcher: Option<HttpFetcher>,
}

impl CycleStore {
    pub fn new(cycle_dir: impl Into<PathBuf>) -> Self {
        Self {
            cycle_dir: cycle_dir.into(),
            fetcher: None,
        }
    }

    /// Enable downloading missing containers from the origin.
    pub fn with_fetcher(mut self, fetcher: HttpFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn cycle_dir(&self) -> &Path {
        &self.cycle_dir
    }

    fn container_path(&self, segment: SegmentId, format: ContainerFormat) -> PathBuf {
        self.cycle_dir
            .join(format!("{segment}{}", format.local_ext()))
    }

    fn local(
        &self,
        segment: SegmentId,
        packet_number: u8,
        format: ContainerFormat,
    ) -> Result<Option<Vec<u8>>> {
        let path = self.container_path(segment, format);
        match format {
            ContainerFormat::Framed => framed::extract(&path, packet_number),
            ContainerFormat::Raw => raw::slice(&path, segment, packet_number),
        }
    }

    fn fetched(
        &self,
        segment: SegmentId,
        packet_number: u8,
        format: ContainerFormat,
    ) -> Result<Option<Vec<u8>>> {
        match &self.fetcher {
            Some(fetcher) if fetcher.download(&self.cycle_dir, segment, format) => {
                self.local(segment, packet_number, format)
            }
            _ => Ok(None),
        }
    }
}

impl PacketSource for CycleStore {
    fn fetch(&mut self, segment: SegmentId, packet_number: u8) -> Result<Option<Vec<u8>>> {
        if let Some(packet) = self.local(segment, packet_number, ContainerFormat::Framed)? {
            return Ok(Some(packet));
        }
        if let Some(packet) = self.local(segment, packet_number, ContainerFormat::Raw)? {
            return Ok(Some(packet));
        }
        if let Some(packet) = self.fetched(segment, packet_number, ContainerFormat::Framed)? {
            return Ok(Some(packet));
        }
        if let Some(packet) = self.fetched(segment, packet_number, ContainerFormat::Raw)? {
            return Ok(Some(packet));
        }
        Ok(None)
    }
}
