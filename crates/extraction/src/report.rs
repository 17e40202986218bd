//! Result Assembler.

use std::path::PathBuf;

use ecohub_common::NOT_IDENTIFIED;
use raster::SeriesExtraction;
use reference_store::SpatialReferences;
use serde::{Deserialize, Serialize};

/// One point of the biomass series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomassPoint {
    pub year: i32,
    pub value: f64,
}

/// The raster part of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RasterOutput {
    Snapshot {
        tif_path: PathBuf,
    },
    Series {
        biomass_series: Vec<BiomassPoint>,
        skipped_years: Vec<i32>,
    },
}

impl From<SeriesExtraction> for RasterOutput {
    fn from(series: SeriesExtraction) -> Self {
        RasterOutput::Series {
            biomass_series: series
                .samples
                .iter()
                .map(|s| BiomassPoint {
                    year: s.temporal_key.year(),
                    value: s.mean_value,
                })
                .collect(),
            skipped_years: series.skipped.iter().map(|k| k.year()).collect(),
        }
    }
}

/// Report returned to the caller.
///
/// Field names are part of the public JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub pais: String,
    pub zona_ecologica: String,
    pub areas_protegidas: Vec<String>,
    pub area_hectares: f64,
    #[serde(flatten)]
    pub output: RasterOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Combine branch outputs. Missing references become sentinels.
pub fn assemble(
    references: Option<SpatialReferences>,
    output: RasterOutput,
    area_hectares: f64,
) -> ExtractionResult {
    let references = references.unwrap_or_else(SpatialReferences::not_identified);
    ExtractionResult {
        pais: or_sentinel(references.country),
        zona_ecologica: or_sentinel(references.ecological_zone),
        areas_protegidas: references.protected_areas,
        area_hectares,
        output,
        warnings: Vec::new(),
    }
}

fn or_sentinel(label: String) -> String {
    if label.trim().is_empty() {
        NOT_IDENTIFIED.to_string()
    } else {
        label
    }
}
