use crate::model::Feature;

/// Position in one paginated collection.
///
/// Starts at the collection's first-page path and follows whatever `next`
/// URL the backend reports. Once exhausted it never moves again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationCursor {
    Next(String),
    Exhausted,
}

impl PaginationCursor {
    pub fn start(feature: Feature) -> Self {
        PaginationCursor::Next(feature.collection().to_string())
    }

    /// Move to the page the backend reported. An empty `next` ends the collection.
    pub fn advance(&mut self, next: Option<String>) {
        *self = match next {
            Some(url) if !url.trim().is_empty() => PaginationCursor::Next(url),
            _ => PaginationCursor::Exhausted,
        };
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, PaginationCursor::Exhausted)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            PaginationCursor::Next(url) => Some(url),
            PaginationCursor::Exhausted => None,
        }
    }
}
