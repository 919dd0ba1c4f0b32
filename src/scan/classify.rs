//! Rule evaluation over a document.

use super::dom::{Document, NodeId};
use super::element::{Classification, IgnoreReason};
use super::rules::{Facts, Rule, RuleContext, default_rules};
use crate::config::ScanConfig;

/// A classification and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub classification: Classification,
    pub rule: &'static str,
}

/// Runs the ordered rule list over candidate elements.
pub struct Classifier<'c> {
    config: &'c ScanConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl<'c> Classifier<'c> {
    pub fn new(config: &'c ScanConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    pub fn with_rules(config: &'c ScanConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { config, rules }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    /// Classify one element. `facts` must already have its descendants settled.
    pub fn classify(&self, doc: &Document, node: NodeId, facts: &Facts) -> Verdict {
        let tag = doc.tag(node);
        if tag.is_empty() {
            return Verdict {
                classification: Classification::ignored(IgnoreReason::Unknown),
                rule: "unknown",
            };
        }

        let text = doc.text(node);
        let ctx = RuleContext {
            doc,
            node,
            tag,
            text: &text,
            config: self.config,
            facts,
        };

        self.rules
            .iter()
            .find_map(|rule| {
                rule.evaluate(&ctx).map(|classification| Verdict {
                    classification,
                    rule: rule.name(),
                })
            })
            .unwrap_or(Verdict {
                classification: Classification::ignored(IgnoreReason::Unknown),
                rule: "unknown",
            })
    }

    /// Classify every candidate element, children before parents.
    ///
    /// Returned in document order.
    pub fn classify_document(&self, doc: &Document) -> Vec<(NodeId, Verdict)> {
        let mut facts = Facts::new(doc);
        let mut out = Vec::new();

        for node in doc.post_order() {
            if !self.config.is_candidate(doc.tag(node)) {
                facts.settle(doc, node, None);
                continue;
            }
            let verdict = self.classify(doc, node, &facts);
            facts.settle(doc, node, Some(&verdict.classification));
            out.push((node, verdict));
        }

        out.sort_by_key(|(node, _)| *node);
        out
    }
}
