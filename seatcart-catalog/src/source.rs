use crate::catalog::{parse_offerings, CatalogError, CourseCatalog};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

const SAMPLE_COURSES: &str = include_str!("../data/sample_courses.json");

/// Where the course list comes from (the course service in production).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the raw offering list. The response is validated by the caller.
    async fn fetch_offerings(&self) -> Result<serde_json::Value, CatalogError>;
}

/// Fetch the course list and narrow it to one region.
pub async fn load_region(source: &dyn CatalogSource, region: &str) -> Result<CourseCatalog, CatalogError> {
    let response = source.fetch_offerings().await?;
    let offerings = parse_offerings(response)?;
    Ok(CourseCatalog::for_region(region, offerings))
}

enum Reply {
    Document(serde_json::Value),
    Failure(String),
}

/// In-memory catalog source serving a fixed document.
pub struct StaticCatalogSource {
    reply: Reply,
    fetches: AtomicUsize,
}

impl StaticCatalogSource {
    pub fn new(document: serde_json::Value) -> Self {
        Self {
            reply: Reply::Document(document),
            fetches: AtomicUsize::new(0),
        }
    }

    /// The course set the platform ships with.
    pub fn sample() -> Result<Self, CatalogError> {
        let document = serde_json::from_str(SAMPLE_COURSES)
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Ok(Self::new(document))
    }

    /// A source whose every fetch fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Failure(message.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_offerings(&self) -> Result<serde_json::Value, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Document(document) => Ok(document.clone()),
            Reply::Failure(message) => Err(CatalogError::Unavailable(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_catalog_loads() {
        let source = StaticCatalogSource::sample().unwrap();
        let catalog = load_region(&source, "Jabalpur").await.unwrap();

        assert_eq!(catalog.len(), 32);
        assert_eq!(source.fetch_count(), 1);
        let first = catalog.iter().next().unwrap();
        assert_eq!(first.course_name, "B.Tech");
        assert_eq!(first.branch, "Artificial Intelligence & Data Science");

        let elsewhere = load_region(&source, "Indore").await.unwrap();
        assert!(elsewhere.is_empty());
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let source = StaticCatalogSource::failing("connection refused");
        let err = load_region(&source, "Jabalpur").await.unwrap_err();
        assert_eq!(err, CatalogError::Unavailable("connection refused".to_string()));

        let source = StaticCatalogSource::new(serde_json::json!("not a list"));
        assert!(matches!(load_region(&source, "Jabalpur").await, Err(CatalogError::Malformed(_))));
    }
}
