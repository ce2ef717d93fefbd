use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved selector key naming the element that wraps one record.
pub const CONTAINER_KEY: &str = "container";

/// Container selector used when a job does not name one.
pub const DEFAULT_CONTAINER: &str = "div";

/// One scraped item: field name → trimmed text, or `None` when the field's
/// selector matched nothing inside the container.
///
/// Records are never stored; they live only as long as the `scraped_items`
/// event that carries them.
pub type Record = BTreeMap<String, Option<String>>;

/// Field-name → CSS selector map for a job.
///
/// The `container` key is reserved: it selects the elements that each
/// produce one [`Record`]. Every other key is a field resolved relative to
/// its container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selectors(BTreeMap<String, String>);

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, selector: impl Into<String>) -> Self {
        self.0.insert(field.into(), selector.into());
        self
    }

    /// The container selector, falling back to [`DEFAULT_CONTAINER`].
    pub fn container(&self) -> &str {
        self.0
            .get(CONTAINER_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTAINER)
    }

    /// Every non-container `(field, selector)` pair, in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(field, _)| field.as_str() != CONTAINER_KEY)
            .map(|(field, selector)| (field.as_str(), selector.as_str()))
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Selectors {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for Selectors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
