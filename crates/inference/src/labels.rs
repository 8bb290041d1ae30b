use std::fmt;
use std::sync::Arc;

/// Rice varieties in the output order of the bundled classifier.
pub const RICE_VARIETIES: [&str; 5] = ["Dinorado", "Jasmine", "Malagkit", "Sinadomeng", "V160"];

/// Ordered class names, addressed by model output index.
///
/// Clones share the names, which never change after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Arc<[String]>,
}

impl LabelTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Label table of the classification model.
    pub fn classifier() -> Self {
        Self::new(RICE_VARIETIES)
    }

    /// Label table of the detection model. It shares the classifier's class order.
    pub fn detector() -> Self {
        Self::new(RICE_VARIETIES)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Name for a possibly out-of-range class index; unknown indices become `cls<index>`.
    pub fn resolve(&self, index: i64) -> String {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.get(i))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("cls{}", index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl fmt::Debug for LabelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
