//! CSS selector extraction.
//!
//! Each container element becomes one record; every other selector resolves
//! to the trimmed text of its first match inside that container.

use scraper::{ElementRef, Html, Selector};
use scrapemaster_core::error::AppError;
use scrapemaster_core::models::{CONTAINER_KEY, Record, Selectors};
use scrapemaster_core::traits::Extractor;

#[derive(Debug, Clone, Copy, Default)]
pub struct CssExtractor;

impl CssExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn parse_selector(field: &str, css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector for '{field}' ({css}): {e}"))
}

/// Text of `element` with surrounding whitespace removed; empty text is absent.
fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Extractor for CssExtractor {
    fn extract(
        &self,
        html: &str,
        selectors: &Selectors,
        limit: usize,
    ) -> Result<Vec<Record>, AppError> {
        let container = parse_selector(CONTAINER_KEY, selectors.container())
            .map_err(AppError::ExtractionError)?;
        let fields = selectors
            .fields()
            .map(|(name, css)| parse_selector(name, css).map(|selector| (name, selector)))
            .collect::<Result<Vec<_>, String>>()
            .map_err(AppError::ExtractionError)?;

        let document = Html::parse_document(html);
        let records = document
            .select(&container)
            .take(limit)
            .filter_map(|element| {
                let record: Record = fields
                    .iter()
                    .map(|(name, selector)| {
                        let value = element.select(selector).next().and_then(text_of);
                        (name.to_string(), value)
                    })
                    .collect();
                record.values().any(Option::is_some).then_some(record)
            })
            .collect();

        Ok(records)
    }

    fn validate(&self, selectors: &Selectors) -> Result<(), AppError> {
        parse_selector(CONTAINER_KEY, selectors.container()).map_err(AppError::ValidationError)?;
        for (name, css) in selectors.fields() {
            parse_selector(name, css).map_err(AppError::ValidationError)?;
        }
        Ok(())
    }
}
