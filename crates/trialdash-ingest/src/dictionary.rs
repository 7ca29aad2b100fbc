//! Display-term dictionary builder.

use serde::Deserialize;
use tracing::debug;

use trialdash_common::parse_integral;
use trialdash_model::{DisplayDictionary, DisplayTerm, TermKey};

use crate::error::{IngestError, Result};
use crate::source::{Fetcher, Location};

/// One row of the reference CSV: `api_field,api_value,display_text,multi`.
#[derive(Debug, Deserialize)]
struct DisplayTermRow {
    api_field: String,
    api_value: String,
    display_text: String,
    multi: String,
}

/// Parses the reference table into terms, in file order.
///
/// Rows without a field name or value are skipped. A missing column, an
/// undecodable row or a multi flag other than 0/1 fails the whole table.
pub fn parse_display_terms(bytes: &[u8]) -> Result<Vec<DisplayTerm>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut terms = Vec::new();
    for (line, result) in reader.deserialize::<DisplayTermRow>().enumerate() {
        let row = result.map_err(|e| IngestError::Dictionary(e.to_string()))?;
        let field = row.api_field.trim();
        let Some(value) = TermKey::parse(&row.api_value) else {
            continue;
        };
        if field.is_empty() {
            continue;
        }
        let multi = match parse_integral(&row.multi) {
            Some(0) => false,
            Some(1) => true,
            _ => {
                return Err(IngestError::Dictionary(format!(
                    "row {}: multi flag must be 0 or 1, got {:?}",
                    line + 2,
                    row.multi
                )));
            }
        };
        terms.push(DisplayTerm {
            field: field.to_string(),
            value,
            label: row.display_text.trim().to_string(),
            multi,
        });
    }
    Ok(terms)
}

/// Builds the single- and multi-valued lookup tables from the reference CSV.
pub fn build_display_dictionary(bytes: &[u8]) -> Result<DisplayDictionary> {
    let terms = parse_display_terms(bytes)?;
    let dictionary = DisplayDictionary::from_terms(terms);
    debug!(
        single_fields = dictionary.single.len(),
        multi_fields = dictionary.multi.len(),
        "display terms loaded"
    );
    Ok(dictionary)
}

/// Fetches and builds the dictionary.
///
/// Any failure, fetch-side included, is reported as
/// [`IngestError::Dictionary`] so that callers can degrade to an empty
/// dictionary on a single error kind.
pub fn load_display_terms<F: Fetcher + ?Sized>(
    location: &Location,
    fetcher: &F,
) -> Result<DisplayDictionary> {
    let bytes = fetcher
        .fetch(location)
        .map_err(|e| IngestError::Dictionary(e.to_string()))?;
    build_display_dictionary(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticFetcher;

    const TERMS: &str = "\
api_field,api_value,display_text,multi
sex,1,Male,0
sex,2,Female,0
reason_not_interested,1,Too busy,1
reason_not_interested,2.0,Distance,1
site,uic,UI Health,0
";

    #[test]
    fn splits_single_and_multi() {
        let dictionary = build_display_dictionary(TERMS.as_bytes()).unwrap();
        assert_eq!(dictionary.label("sex", &TermKey::Int(2)), Some("Female"));
        assert_eq!(
            dictionary.label_multi("reason_not_interested", &TermKey::Int(2)),
            Some("Distance")
        );
        assert_eq!(
            dictionary.label("site", &TermKey::Text("uic".into())),
            Some("UI Health")
        );
        assert!(dictionary.single.get("reason_not_interested").is_none());
    }

    #[test]
    fn malformed_tables_are_dictionary_errors() {
        let missing_column = "api_field,api_value,display_text\nsex,1,Male\n";
        assert!(matches!(
            build_display_dictionary(missing_column.as_bytes()),
            Err(IngestError::Dictionary(_))
        ));

        let bad_flag = "api_field,api_value,display_text,multi\nsex,1,Male,yes\n";
        assert!(matches!(
            build_display_dictionary(bad_flag.as_bytes()),
            Err(IngestError::Dictionary(_))
        ));
    }

    #[test]
    fn fetch_failures_surface_as_dictionary_errors() {
        let fetcher = StaticFetcher::new();
        let result = load_display_terms(&Location::parse("assets/terms.csv"), &fetcher);
        assert!(matches!(result, Err(IngestError::Dictionary(_))));
    }
}
