use crate::catalog::{CATALOG, Capability, ContextConfig, ContextId, FALLBACK_CONTEXT};

/// Weight added for every keyword hit
pub const DEFAULT_KEYWORD_WEIGHT: u32 = 10;

/// Keyword scorer that picks the context a free-text request belongs to
#[derive(Debug, Clone, Copy)]
pub struct IntentClassifier {
    keyword_weight: u32,
    fallback: ContextId,
    catalog: &'static [ContextConfig],
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD_WEIGHT)
    }
}

impl IntentClassifier {
    pub fn new(keyword_weight: u32) -> Self {
        Self {
            keyword_weight,
            fallback: FALLBACK_CONTEXT,
            catalog: CATALOG,
        }
    }

    /// Per-context scores in catalog order.
    ///
    /// A keyword shared by several capabilities of one context counts once
    /// per capability.
    pub fn scores(&self, text: &str) -> Vec<(ContextId, u32)> {
        let lowered = text.to_lowercase();
        self.catalog
            .iter()
            .map(|context| {
                let hits: usize = context
                    .capabilities
                    .iter()
                    .map(|capability| keyword_hits(capability, &lowered))
                    .sum();
                let hits = u32::try_from(hits).unwrap_or(u32::MAX);
                (context.id, hits.saturating_mul(self.keyword_weight))
            })
            .collect()
    }

    /// Capabilities with at least one keyword in `text`, in catalog order
    pub fn matched_capabilities(&self, text: &str) -> Vec<&'static Capability> {
        let lowered = text.to_lowercase();
        self.catalog
            .iter()
            .flat_map(|context| context.capabilities.iter())
            .filter(|capability| keyword_hits(capability, &lowered) > 0)
            .collect()
    }

    /// Picks the best-scoring context, or the fallback when nothing matched.
    ///
    /// Ties keep the context that comes first in the catalog.
    pub fn classify(&self, text: &str) -> ContextId {
        let mut max_score = 0;
        let mut target = self.fallback;
        for (context, score) in self.scores(text) {
            if score > max_score {
                max_score = score;
                target = context;
            }
        }
        if max_score == 0 {
            return self.fallback;
        }
        target
    }
}

fn keyword_hits(capability: &Capability, lowered: &str) -> usize {
    capability
        .keywords
        .iter()
        .filter(|keyword| lowered.contains(&keyword.to_lowercase()))
        .count()
}
