//! Stub advisor for dry runs and tests
//!
//! Returns canned responses and counts calls. `run --dry-run` uses the
//! default canned analysis; tests configure it per scenario.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{AdvisoryError, AdvisoryService, ItemAnalysis};
use crate::market::{AttributeSpec, CategoryCandidate};

/// Canned-response [`AdvisoryService`]
pub struct StubAdvisor {
    analysis: Mutex<Option<ItemAnalysis>>,
    category: Mutex<Option<String>>,
    attributes: Mutex<HashMap<String, String>>,
    fail_analysis: Mutex<Option<String>>,
    pub analyze_calls: AtomicU64,
}

impl Default for StubAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl StubAdvisor {
    pub fn new() -> Self {
        Self {
            analysis: Mutex::new(Some(ItemAnalysis {
                title: "Secondhand item".to_string(),
                description: "Photographed item in usable condition.".to_string(),
                brand: None,
                model: None,
            })),
            category: Mutex::new(None),
            attributes: Mutex::new(HashMap::new()),
            fail_analysis: Mutex::new(None),
            analyze_calls: AtomicU64::new(0),
        }
    }

    /// Set the canned analysis returned by `analyze_image`
    pub fn with_analysis(self, analysis: ItemAnalysis) -> Self {
        *self.analysis.lock().unwrap() = Some(analysis);
        self
    }

    /// Make the advisor confidently pick the given category id
    pub fn with_category(self, category_id: &str) -> Self {
        *self.category.lock().unwrap() = Some(category_id.to_string());
        self
    }

    /// Pre-resolve attribute values (name -> option id)
    pub fn with_attributes(self, values: HashMap<String, String>) -> Self {
        *self.attributes.lock().unwrap() = values;
        self
    }

    /// Make the next `analyze_image` call fail
    pub fn fail_next_analysis(&self, message: &str) {
        *self.fail_analysis.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl AdvisoryService for StubAdvisor {
    async fn analyze_image(&self, _image: &[u8], _mime: &str) -> Result<ItemAnalysis, AdvisoryError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_analysis.lock().unwrap().take() {
            return Err(AdvisoryError::Api { status: 503, message });
        }
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AdvisoryError::InvalidResponse("no canned analysis".to_string()))
    }

    async fn select_category(
        &self,
        _title: &str,
        _description: &str,
        candidates: &[CategoryCandidate],
    ) -> Result<Option<String>, AdvisoryError> {
        let pick = self.category.lock().unwrap().clone();
        // Only claim confidence for categories actually on offer
        Ok(pick.filter(|id| candidates.iter().any(|c| &c.id == id)))
    }

    async fn select_attributes(
        &self,
        _title: &str,
        _description: &str,
        attributes: &[AttributeSpec],
    ) -> Result<HashMap<String, String>, AdvisoryError> {
        let canned = self.attributes.lock().unwrap().clone();
        Ok(canned
            .into_iter()
            .filter(|(name, _)| attributes.iter().any(|a| &a.name == name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_category_pick_requires_candidate() {
        let advisor = StubAdvisor::new().with_category("bikes");
        let candidates = vec![CategoryCandidate {
            id: "furniture".to_string(),
            label: "Furniture".to_string(),
        }];
        let pick = advisor.select_category("t", "d", &candidates).await.unwrap();
        assert!(pick.is_none());
    }

    #[tokio::test]
    async fn test_failed_analysis_is_one_shot() {
        let advisor = StubAdvisor::new();
        advisor.fail_next_analysis("overloaded");
        assert!(advisor.analyze_image(b"x", "image/jpeg").await.is_err());
        assert!(advisor.analyze_image(b"x", "image/jpeg").await.is_ok());
        assert_eq!(advisor.analyze_calls.load(Ordering::SeqCst), 2);
    }
}
