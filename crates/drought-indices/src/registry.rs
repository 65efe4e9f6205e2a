//! Product registry: static name-to-indicator dispatch.

use std::sync::Arc;

use acquisition::{
    json_archive, ArchiveSource, DataSource, DownloadClient, DownloadConfig, JsonDecoder,
    ReanalysisSource, PRECIP_VARIABLES, SOILWATER_VARIABLES,
};
use drought_common::{DroughtError, DroughtResult};

use crate::cdi::CdiIndicator;
use crate::config::{AnalysisArgs, Backend, Config};
use crate::gdo::GdoIndicator;
use crate::indicator::DroughtIndicator;
use crate::sma::SmaEcmwf;
use crate::spi::SpiEcmwf;
use crate::store::{ArtifactStore, FsArtifactStore};

/// Archive file prefixes of the pre-computed products.
const SPI_GDO_PREFIX: &str = "spg03";
const SMA_GDO_PREFIX: &str = "smant";
const SMA_GDO_FALLBACK_PREFIX: &str = "smand";
const FAPAR_GDO_PREFIX: &str = "fpanv";

/// A named indicator product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// SPI computed from reanalysis precipitation.
    Spi,
    /// Pre-computed SPI archive product.
    SpiGdo,
    /// Soil-moisture anomaly computed from reanalysis soil water.
    SmaEcmwf,
    /// Pre-computed soil-moisture anomaly archive product.
    SmaGdo,
    /// Pre-computed vegetation (fAPAR) anomaly archive product.
    FaparGdo,
    /// Combined drought indicator.
    Cdi,
}

impl Product {
    /// Resolve a product name (case-insensitive).
    ///
    /// Unknown names fail here, before any acquisition is attempted.
    pub fn parse(name: &str) -> DroughtResult<Self> {
        match name.to_uppercase().as_str() {
            "SPI" => Ok(Product::Spi),
            "SPI_GDO" => Ok(Product::SpiGdo),
            "SMA_ECMWF" => Ok(Product::SmaEcmwf),
            "SMA_GDO" => Ok(Product::SmaGdo),
            "FAPAR" | "FAPAR_GDO" => Ok(Product::FaparGdo),
            "CDI" => Ok(Product::Cdi),
            other => Err(DroughtError::lookup(other.to_string())),
        }
    }

    /// Key fragment used in artifact names.
    pub fn key_name(&self) -> &'static str {
        match self {
            Product::Spi => "spi",
            Product::SpiGdo => "spi_gdo",
            Product::SmaEcmwf => "sma_ecmwf",
            Product::SmaGdo => "sma_gdo",
            Product::FaparGdo => "fapar_gdo",
            Product::Cdi => "cdi",
        }
    }

    /// Primary field name in artifacts.
    pub fn field(&self) -> &'static str {
        match self {
            Product::Spi | Product::SpiGdo => "spi",
            Product::SmaEcmwf | Product::SmaGdo => "sma",
            Product::FaparGdo => "fapar",
            Product::Cdi => "cdi",
        }
    }
}

/// Builds indicators for product names, wiring configuration, acquisition
/// sources and the artifact store.
pub struct Registry {
    config: Config,
    store: Arc<dyn ArtifactStore>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.output_dir));
        Self { config, store }
    }

    /// Replace the artifact store (used by tests).
    pub fn with_store(config: Config, store: Arc<dyn ArtifactStore>) -> Self {
        Self { config, store }
    }

    /// Instantiate the indicator for an analysis request.
    pub fn create(&self, args: AnalysisArgs) -> DroughtResult<Box<dyn DroughtIndicator>> {
        match args.product {
            Product::Spi => Ok(Box::new(SpiEcmwf::new(
                self.config.clone(),
                args,
                self.reanalysis_source("precip", PRECIP_VARIABLES, true)?,
                Arc::clone(&self.store),
            ))),
            Product::SpiGdo => Ok(Box::new(GdoIndicator::new(
                self.config.clone(),
                args,
                self.archive_source(SPI_GDO_PREFIX),
                None,
                Arc::clone(&self.store),
            ))),
            Product::SmaEcmwf => Ok(Box::new(SmaEcmwf::new(
                self.config.clone(),
                args,
                self.reanalysis_source("soilwater", SOILWATER_VARIABLES, true)?,
                self.reanalysis_source("soilwater", SOILWATER_VARIABLES, false)?,
                Arc::clone(&self.store),
            ))),
            Product::SmaGdo => Ok(Box::new(GdoIndicator::new(
                self.config.clone(),
                args,
                self.archive_source(SMA_GDO_PREFIX),
                Some(self.archive_source(SMA_GDO_FALLBACK_PREFIX)),
                Arc::clone(&self.store),
            ))),
            Product::FaparGdo => Ok(Box::new(GdoIndicator::new(
                self.config.clone(),
                args,
                self.archive_source(FAPAR_GDO_PREFIX),
                None,
                Arc::clone(&self.store),
            ))),
            Product::Cdi => {
                let (spi_start, sma_start, fapar_start) =
                    CdiIndicator::constituent_starts(args.start);
                let (spi_product, sma_product) = match self.config.backend {
                    Backend::Ecmwf => (Product::Spi, Product::SmaEcmwf),
                    Backend::Gdo => (Product::SpiGdo, Product::SmaGdo),
                };

                let spi = self.create(args.constituent(spi_product, spi_start))?;
                let sma = self.create(args.constituent(sma_product, sma_start))?;
                let fapar = self.create(args.constituent(Product::FaparGdo, fapar_start))?;

                Ok(Box::new(CdiIndicator::new(
                    args,
                    spi,
                    sma,
                    fapar,
                    Arc::clone(&self.store),
                )))
            }
        }
    }

    fn reanalysis_source(
        &self,
        dataset: &str,
        variables: &[&str],
        monthly: bool,
    ) -> DroughtResult<Box<dyn DataSource>> {
        let client = DownloadClient::new(DownloadConfig {
            cache_dir: self.config.input_dir.clone(),
            ..Default::default()
        })
        .map_err(|e| DroughtError::acquisition(e.to_string()))?;
        Ok(Box::new(ReanalysisSource::new(
            client,
            self.config.reanalysis_url.clone(),
            dataset,
            variables,
            monthly,
            Arc::new(JsonDecoder),
        )))
    }

    fn archive_source(&self, prefix: &str) -> Box<dyn DataSource> {
        Box::new(ArchiveSource::new(
            json_archive(&self.config.input_dir),
            prefix,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drought_common::Region;
    use output_formats::ArtifactFormat;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_known_products() {
        assert_eq!(Product::parse("SPI").unwrap(), Product::Spi);
        assert_eq!(Product::parse("sma_gdo").unwrap(), Product::SmaGdo);
        assert_eq!(Product::parse("fAPAR").unwrap(), Product::FaparGdo);
        assert_eq!(Product::parse("cdi").unwrap(), Product::Cdi);
    }

    #[test]
    fn test_unknown_product_is_lookup_error() {
        assert!(matches!(
            Product::parse("PDSI"),
            Err(DroughtError::Lookup(_))
        ));
    }

    #[test]
    fn test_create_resolves_each_product() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input_dir: dir.path().join("in"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let registry = Registry::new(config);

        for product in [
            Product::Spi,
            Product::SpiGdo,
            Product::SmaEcmwf,
            Product::SmaGdo,
            Product::FaparGdo,
            Product::Cdi,
        ] {
            let args = AnalysisArgs::new(
                Region::from_coords(&[(52.5, 1.25)]).unwrap(),
                date(2022, 1, 1),
                date(2022, 3, 31),
                product,
                ArtifactFormat::GeoJson,
            )
            .unwrap();
            let indicator = registry.create(args).unwrap();
            assert_eq!(indicator.product(), product);
        }
    }
}
