//! Acquisition collaborators for the drought pipeline.
//!
//! Indicators consume data through the [`DataSource`] seam; the concrete
//! implementations here cover the two acquisition styles of the system:
//! remote reanalysis downloads cached on disk, and pre-computed indicator
//! archives supplied as local files. Decoding of provider file formats sits
//! behind [`SeriesDecoder`] so the pipeline never touches format internals.

pub mod archive;
pub mod client;
pub mod error;
pub mod reanalysis;
pub mod request;
pub mod source;

pub use archive::{json_archive, ArchiveSource, LocalArchive};
pub use client::{DownloadClient, DownloadConfig};
pub use error::AcquisitionError;
pub use reanalysis::ReanalysisSource;
pub use request::{ReanalysisRequest, PRECIP_VARIABLES, SOILWATER_VARIABLES};
pub use source::{DataSource, JsonDecoder, MemorySource, SeriesDecoder};
