//! Classification rules.
//!
//! Each rule looks at one element (with read access to the whole tree and to
//! [`Facts`] about its already classified descendants) and either passes or
//! returns a final [`Classification`]. [`default_rules`] lists them in
//! priority order; the first match wins.
//!
//! | Rule             | Verdict                        |
//! |------------------|--------------------------------|
//! | `already-tagged` | previous annotation, unchanged |
//! | `tooling`        | ignored(toolingOrInjected)     |
//! | `dropdown`       | ignored(dropdown)              |
//! | `header-footer`  | ignored(headerFooter)          |
//! | `dynamic`        | component(reason)              |
//! | `empty`          | ignored(empty)                 |
//! | `nested`         | ignored(nestedEditable)        |
//! | `editable`       | editable(type)                 |

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::dom::{Document, NodeId};
use super::element::{Classification, DynamicReason, EditableType, IgnoreReason};
use super::wire;
use crate::config::ScanConfig;
use crate::utils::html;

/// Template syntax that survived rendering.
static VARIABLE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{.*?\}\}|\{!!.*?!!\}|\{%.*?%\}|\$\{[^}]*\}|<\?(?:php|=)|@(?:foreach|forelse|if|for|each|while)\b").unwrap()
});

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub tag: &'a str,
    /// Visible text of the element.
    pub text: &'a str,
    pub config: &'a ScanConfig,
    pub facts: &'a Facts,
}

/// Tag, sorted classes and child tag sequence.
type Signature = (String, Vec<String>, Vec<String>);

/// Per-document facts shared by the rules.
///
/// Sibling groups are counted once up front. Descendant claims grow while
/// elements are settled children before parents.
#[derive(Debug, Default)]
pub struct Facts {
    /// Elements with an editable or component descendant.
    claimed: FxHashSet<NodeId>,
    /// Interned signature of every element.
    signatures: FxHashMap<NodeId, usize>,
    /// Group sizes keyed by parent and signature.
    groups: FxHashMap<(Option<NodeId>, usize), usize>,
}

impl Facts {
    pub fn new(doc: &Document) -> Self {
        let mut interned: FxHashMap<Signature, usize> = FxHashMap::default();
        let mut facts = Self::default();
        for id in doc.elements() {
            let next = interned.len();
            let sig = *interned.entry(signature(doc, id)).or_insert(next);
            facts.signatures.insert(id, sig);
            *facts.groups.entry((doc.parent(id), sig)).or_default() += 1;
        }
        facts
    }

    /// Record the outcome for `id` once it is final. `None` for elements
    /// that are not classified.
    pub fn settle(&mut self, doc: &Document, id: NodeId, verdict: Option<&Classification>) {
        let claims = self.claimed.contains(&id)
            || verdict.is_some_and(|v| v.is_editable() || v.is_component());
        if claims && let Some(parent) = doc.parent(id) {
            self.claimed.insert(parent);
        }
    }

    /// Some settled descendant of `id` is editable or a component.
    pub fn has_claimed_descendant(&self, id: NodeId) -> bool {
        self.claimed.contains(&id)
    }

    /// Siblings sharing the signature of `id`, itself included.
    pub fn sibling_group(&self, doc: &Document, id: NodeId) -> usize {
        self.signatures
            .get(&id)
            .and_then(|sig| self.groups.get(&(doc.parent(id), *sig)))
            .copied()
            .unwrap_or(1)
    }
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification>;
}

/// Rules in priority order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(AlreadyTagged),
        Box::new(Tooling),
        Box::new(Dropdown),
        Box::new(HeaderFooter),
        Box::new(Dynamic),
        Box::new(Empty),
        Box::new(NestedEditable),
        Box::new(Editable),
    ]
}

// ============================================================================
// helpers
// ============================================================================

/// `token` names `word`: equal, `word-*`, or `word_*`.
///
/// `card-header` and `modal-footer` are parts of a component, not page
/// regions, so suffixes never match. Region names such as `site-header` are
/// listed as words of their own.
fn token_names(token: &str, word: &str) -> bool {
    let token = token.to_ascii_lowercase();
    token == word
        || token
            .strip_prefix(word)
            .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('_'))
}

fn any_token_names<'a>(mut tokens: impl Iterator<Item = &'a str>, words: &[String]) -> bool {
    tokens.any(|t| words.iter().any(|w| token_names(t, w)))
}

fn role(doc: &Document, id: NodeId) -> Option<String> {
    doc.attr(id, "role").map(|r| r.trim().to_ascii_lowercase())
}

// ============================================================================
// rules
// ============================================================================

/// A previous annotation is authoritative.
pub struct AlreadyTagged;

impl Rule for AlreadyTagged {
    fn name(&self) -> &'static str {
        "already-tagged"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let doc = ctx.doc;
        if doc.attr(ctx.node, wire::EDITABLE) == Some("true") {
            let editable_type = doc
                .attr(ctx.node, wire::TYPE)
                .and_then(EditableType::parse)
                .unwrap_or_else(|| EditableType::from_tag(ctx.tag));
            return Some(Classification::editable(editable_type));
        }
        if doc.attr(ctx.node, wire::COMPONENT) == Some("true") {
            let message = doc.attr(ctx.node, wire::MESSAGE).unwrap_or_default();
            return Some(Classification::component(DynamicReason::from_message(
                &html::unescape(message),
            )));
        }
        None
    }
}

/// Editor toolbars and panels injected into the page.
pub struct Tooling;

impl Rule for Tooling {
    fn name(&self) -> &'static str {
        "tooling"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let config = ctx.config;
        let hit = ctx.doc.self_and_ancestors(ctx.node).any(|id| {
            let prefixed = ctx.doc.name_tokens(id).any(|token| {
                config
                    .tooling_prefixes
                    .iter()
                    .any(|prefix| token.to_ascii_lowercase().starts_with(prefix.as_str()))
            });
            prefixed
                || ctx
                    .doc
                    .attrs(id)
                    .iter()
                    .any(|(key, _)| config.reserved_ui_attributes.iter().any(|a| a == key))
        });
        hit.then(|| Classification::ignored(IgnoreReason::ToolingOrInjected))
    }
}

/// Select boxes and dropdown menus.
pub struct Dropdown;

impl Rule for Dropdown {
    fn name(&self) -> &'static str {
        "dropdown"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let doc = ctx.doc;
        let hit = doc.self_and_ancestors(ctx.node).any(|id| {
            matches!(doc.tag(id), "select" | "option" | "optgroup" | "datalist")
                || matches!(
                    role(doc, id).as_deref(),
                    Some("menu" | "listbox" | "combobox" | "option" | "menuitem")
                )
                || doc.classes(id).any(|class| {
                    let class = class.to_ascii_lowercase();
                    ctx.config
                        .dropdown_markers
                        .iter()
                        .any(|m| class == *m || class.starts_with(&format!("{m}-")))
                })
        });
        hit.then(|| Classification::ignored(IgnoreReason::Dropdown))
    }
}

/// Banner, navigation and footer regions.
pub struct HeaderFooter;

impl Rule for HeaderFooter {
    fn name(&self) -> &'static str {
        "header-footer"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let doc = ctx.doc;
        let hit = doc.self_and_ancestors(ctx.node).any(|id| {
            matches!(doc.tag(id), "header" | "footer" | "nav")
                || matches!(
                    role(doc, id).as_deref(),
                    Some("banner" | "navigation" | "contentinfo")
                )
                || any_token_names(doc.name_tokens(id), &ctx.config.header_footer_tokens)
        });
        hit.then(|| Classification::ignored(IgnoreReason::HeaderFooter))
    }
}

/// Content rendered from data rather than written in the template.
pub struct Dynamic;

impl Dynamic {
    fn record_attribute(ctx: &RuleContext<'_>) -> Option<String> {
        let config = ctx.config;
        ctx.doc.self_and_ancestors(ctx.node).find_map(|id| {
            ctx.doc
                .attrs(id)
                .iter()
                .map(|(key, _)| key)
                .find(|key| {
                    if wire::is_wire_attribute(key) {
                        return false;
                    }
                    config.record_attributes.iter().any(|a| a == *key)
                        || (config.record_id_suffix
                            && key.starts_with("data-")
                            && key.ends_with("-id")
                            && key.len() > "data--id".len())
                })
                .cloned()
        })
    }

    fn listing_class(ctx: &RuleContext<'_>) -> Option<String> {
        ctx.doc.self_and_ancestors(ctx.node).find_map(|id| {
            ctx.doc
                .classes(id)
                .find(|class| {
                    let class = class.to_ascii_lowercase();
                    ctx.config
                        .listing_prefixes
                        .iter()
                        .any(|prefix| class.starts_with(prefix.as_str()))
                })
                .map(str::to_string)
        })
    }

    /// Largest group of structurally identical siblings around the element or
    /// one of its nearest ancestors.
    fn loop_siblings(ctx: &RuleContext<'_>) -> Option<usize> {
        let doc = ctx.doc;
        doc.self_and_ancestors(ctx.node)
            .take(ctx.config.loop_depth)
            .filter(|&id| is_loop_item(ctx, id))
            .filter_map(|id| {
                let count = ctx.facts.sibling_group(doc, id);
                (count >= ctx.config.loop_threshold).then_some(count)
            })
            .max()
    }

    fn near_pagination(ctx: &RuleContext<'_>) -> bool {
        let doc = ctx.doc;
        let tokens = &ctx.config.pagination_tokens;
        doc.self_and_ancestors(ctx.node)
            .take(ctx.config.loop_depth + 1)
            .any(|id| {
                any_token_names(doc.name_tokens(id), tokens)
                    || doc
                        .element_children(Some(id))
                        .any(|child| any_token_names(doc.name_tokens(child), tokens))
            })
    }

    fn collection_attribute(ctx: &RuleContext<'_>) -> Option<String> {
        ctx.doc.self_and_ancestors(ctx.node).find_map(|id| {
            ctx.doc
                .attrs(id)
                .iter()
                .map(|(key, _)| key)
                .find(|key| ctx.config.collection_attributes.iter().any(|a| a == *key))
                .cloned()
        })
    }
}

impl Rule for Dynamic {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let reason = if VARIABLE_SYNTAX.is_match(ctx.text) {
            DynamicReason::VariableSyntax
        } else if let Some(attribute) = Self::record_attribute(ctx) {
            DynamicReason::RecordAttribute { attribute }
        } else if let Some(class) = Self::listing_class(ctx) {
            DynamicReason::ListingClass { class }
        } else if let Some(siblings) = Self::loop_siblings(ctx) {
            DynamicReason::LoopSignature { siblings }
        } else if Self::near_pagination(ctx) {
            DynamicReason::Pagination
        } else if let Some(attribute) = Self::collection_attribute(ctx) {
            DynamicReason::CollectionAttribute { attribute }
        } else {
            return None;
        };
        Some(Classification::component(reason))
    }
}

/// Nothing to edit. Images and links may be empty.
pub struct Empty;

impl Rule for Empty {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let may_be_empty = html::is_media_element(ctx.tag) || ctx.tag == "a";
        (ctx.text.is_empty() && !may_be_empty).then(|| Classification::ignored(IgnoreReason::Empty))
    }
}

/// Editing a wrapper would overwrite the tagged elements inside it.
pub struct NestedEditable;

impl Rule for NestedEditable {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        let nested = ctx.facts.has_claimed_descendant(ctx.node);
        nested.then(|| Classification::ignored(IgnoreReason::NestedEditable))
    }
}

/// Fallback: safe to edit.
pub struct Editable;

impl Rule for Editable {
    fn name(&self) -> &'static str {
        "editable"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Classification> {
        Some(Classification::editable(EditableType::from_tag(ctx.tag)))
    }
}

/// Bare elements (no class, no child elements) only count as loop output
/// when their tag is a typical list item. Three plain paragraphs in a row
/// are prose, not a loop.
fn is_loop_item(ctx: &RuleContext<'_>, id: NodeId) -> bool {
    let doc = ctx.doc;
    doc.classes(id).next().is_some()
        || doc.element_children(Some(id)).next().is_some()
        || ctx.config.loop_item_tags.iter().any(|t| t == doc.tag(id))
}

fn signature(doc: &Document, id: NodeId) -> Signature {
    let mut classes: Vec<String> = doc.classes(id).map(str::to_string).collect();
    classes.sort();
    let children = doc
        .element_children(Some(id))
        .map(|c| doc.tag(c).to_string())
        .collect();
    (doc.tag(id).to_string(), classes, children)
}
