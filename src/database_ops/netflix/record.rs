use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::normalization::extract_tagged_id;
use crate::normalization::label::{clean_token, split_list};
use crate::normalization::EntityId;

/// Width of the `s` tag in front of catalog show ids (`s12`).
pub const SHOW_TAG_LEN: usize = 1;

/// One line of the catalog export. Every field is optional; empty means absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    pub show_id: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub title: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub date_added: Option<String>,
    pub release_year: Option<String>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: Option<String>,
    pub description: Option<String>,
}

fn field(value: &Option<String>) -> Option<&str> {
    value.as_deref().and_then(clean_token)
}

fn tokens(value: &Option<String>) -> Vec<(i32, &str)> {
    split_list(value.as_deref(), ',')
}

impl CatalogRecord {
    pub fn id(&self) -> Option<EntityId> {
        extract_tagged_id(field(&self.show_id)?, SHOW_TAG_LEN)
    }

    pub fn code(&self) -> Option<&str> {
        field(&self.show_id)
    }

    pub fn show_type(&self) -> Option<&str> {
        field(&self.show_type)
    }

    pub fn title(&self) -> Option<&str> {
        field(&self.title)
    }

    pub fn rating(&self) -> Option<&str> {
        field(&self.rating)
    }

    pub fn duration(&self) -> Option<&str> {
        field(&self.duration)
    }

    pub fn description(&self) -> Option<&str> {
        field(&self.description)
    }

    pub fn release_year(&self) -> Option<i32> {
        field(&self.release_year)?.parse().ok()
    }

    pub fn date_added(&self) -> Option<NaiveDate> {
        parse_date_added(field(&self.date_added)?)
    }

    pub fn directors(&self) -> Vec<(i32, &str)> {
        tokens(&self.director)
    }

    pub fn actors(&self) -> Vec<(i32, &str)> {
        tokens(&self.cast)
    }

    pub fn countries(&self) -> Vec<(i32, &str)> {
        tokens(&self.country)
    }

    pub fn categories(&self) -> Vec<(i32, &str)> {
        tokens(&self.listed_in)
    }
}

/// `September 25, 2021` or `2021-09-25`.
pub fn parse_date_added(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%B %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Records of a catalog file plus how many lines the parser rejected.
#[derive(Debug, Default)]
pub struct Catalog {
    pub records: Vec<CatalogRecord>,
    pub malformed: u64,
}

impl Catalog {
    pub fn read(path: &Path) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let catalog = Self::from_csv(reader)?;
        info!(
            source = %path.display(),
            records = catalog.records.len(),
            malformed = catalog.malformed,
            "catalog read"
        );
        Ok(catalog)
    }

    pub fn from_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut catalog = Catalog::default();
        for result in reader.deserialize::<CatalogRecord>() {
            match result {
                Ok(record) => catalog.records.push(record),
                Err(e) if e.is_io_error() => {
                    return Err(anyhow::Error::new(e).context("read catalog"));
                }
                Err(e) => {
                    catalog.malformed += 1;
                    warn!(error = %e, "skipping malformed catalog record");
                }
            }
        }
        Ok(catalog)
    }
}
