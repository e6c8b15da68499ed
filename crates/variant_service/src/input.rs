//! Variant list input
//!
//! CSV with one variant per row as `gene,cdna_change,protein_change`.
//! Lines starting with `#` are skipped. When the first row is a header
//! (its first field is `gene`), columns are matched by name and may come in
//! any order; otherwise they are positional.

use crate::errors::{Result, ServiceError};
use csv::{ReaderBuilder, StringRecord, Trim};
use snpath_core::VariantIdentifier;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const HEADER_MARKER: &str = "gene";

pub fn parse_variants(content: &str) -> Result<Vec<VariantIdentifier>> {
    read_from(content.as_bytes())
}

pub fn read_variants<P: AsRef<Path>>(path: P) -> Result<Vec<VariantIdentifier>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ServiceError::Io(format!("Failed to read {}: {e}", path.display())))?;
    read_from(file)
}

fn read_from<R: Read>(source: R) -> Result<Vec<VariantIdentifier>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(source);

    let mut headers: Option<StringRecord> = None;
    let mut seen_first = false;
    let mut variants = Vec::new();

    for record in reader.records() {
        let record = record.map_err(input_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());

        if !seen_first {
            seen_first = true;
            if is_header(&record) {
                headers = Some(record.iter().map(str::to_ascii_lowercase).collect());
                continue;
            }
        }

        let expected = headers.as_ref().map_or(3, StringRecord::len);
        if record.len() != expected {
            return Err(ServiceError::Input {
                line,
                message: format!(
                    "expected {expected} fields (gene,cdna_change,protein_change), got {}",
                    record.len()
                ),
            });
        }

        let variant: VariantIdentifier = record
            .deserialize(headers.as_ref())
            .map_err(|err| ServiceError::Input {
                line,
                message: err.to_string(),
            })?;
        if variant.gene.is_empty() {
            return Err(ServiceError::Input {
                line,
                message: "gene is empty".to_string(),
            });
        }
        variants.push(variant);
    }

    Ok(variants)
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|field| field.eq_ignore_ascii_case(HEADER_MARKER))
}

fn input_error(err: csv::Error) -> ServiceError {
    ServiceError::Input {
        line: err.position().map_or(0, |p| p.line()),
        message: err.to_string(),
    }
}
