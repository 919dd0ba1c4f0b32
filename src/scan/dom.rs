//! Owned element tree built from `tl`.
//!
//! `tl` hands out a borrowed, handle-based DOM. The classifier needs parent
//! links, sibling lists and per-node verdict slots, so the parse result is
//! copied once into a flat arena indexed by [`NodeId`].
//!
//! Element offsets point at the `<` of the opening tag inside the parsed
//! input. They are recovered from the raw slice `tl` keeps for every tag and
//! are `None` when that slice does not point back into the input.

use smallvec::SmallVec;

use crate::utils::html;

/// Index into [`Document::nodes`].
pub type NodeId = usize;

/// Attributes of one element, keys lowercased, in source order.
pub type Attributes = SmallVec<[(String, String); 4]>;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    /// Raw text, still entity-encoded.
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercased tag name. Empty for parse artefacts.
    pub tag: String,
    pub attrs: Attributes,
    /// Byte offset of the opening `<` in the parsed markup.
    pub offset: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Flat DOM arena.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Parse markup. Unparseable input yields an empty document.
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::default();
        let Ok(dom) = tl::parse(markup, tl::ParserOptions::default()) else {
            return doc;
        };

        let parser = dom.parser();
        for handle in dom.children() {
            if let Some(id) = doc.convert(*handle, parser, None, markup) {
                doc.roots.push(id);
            }
        }
        doc
    }

    fn convert(
        &mut self,
        handle: tl::NodeHandle,
        parser: &tl::Parser,
        parent: Option<NodeId>,
        markup: &str,
    ) -> Option<NodeId> {
        let node = handle.get(parser)?;

        match node {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                let attrs = tag
                    .attributes()
                    .iter()
                    .map(|(key, value)| {
                        let key: &str = key.as_ref();
                        (
                            key.to_ascii_lowercase(),
                            value.map(|v| v.to_string()).unwrap_or_default(),
                        )
                    })
                    .collect();
                let offset = tag_offset(markup, tag.raw().as_bytes());

                let id = self.push(
                    NodeKind::Element(Element {
                        tag: name.clone(),
                        attrs,
                        offset,
                    }),
                    parent,
                );

                // Script/style bodies are never page text
                if !html::is_opaque_element(&name) {
                    for child in tag.children().top().iter() {
                        if let Some(child_id) = self.convert(*child, parser, Some(id), markup) {
                            self.nodes[id].children.push(child_id);
                        }
                    }
                }
                Some(id)
            }
            tl::Node::Raw(bytes) => {
                let text = bytes.as_utf8_str();
                if text.is_empty() {
                    return None;
                }
                Some(self.push(NodeKind::Text(text.into_owned()), parent))
            }
            tl::Node::Comment(_) => None,
        }
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    // ========================================================================
    // access
    // ========================================================================

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> &str {
        self.element(id).map_or("", |el| el.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map_or(&[], |el| el.attrs.as_slice())
    }

    /// Whitespace-separated `class` tokens.
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_ascii_whitespace()
    }

    /// `class` tokens plus the `id` attribute, the names authors use to
    /// label regions.
    pub fn name_tokens(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.classes(id)
            .chain(self.attr(id, "id").into_iter().filter(|v| !v.is_empty()))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// The node itself followed by its ancestors, innermost first.
    pub fn self_and_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&n| self.nodes[n].parent)
    }

    /// Element children of `id`, or the top-level elements when `id` is `None`.
    pub fn element_children(&self, id: Option<NodeId>) -> impl Iterator<Item = NodeId> + '_ {
        let list = match id {
            Some(id) => self.nodes[id].children.as_slice(),
            None => self.roots.as_slice(),
        };
        list.iter().copied().filter(|&c| self.element(c).is_some())
    }

    /// Elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|&id| self.element(id).is_some())
    }

    /// Elements in post-order (children before their parent).
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                if self.element(id).is_some() {
                    order.push(id);
                }
                continue;
            }
            stack.push((id, true));
            for &child in self.nodes[id].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Visible text of the subtree: entities decoded, whitespace collapsed.
    pub fn text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_text(id, &mut raw);
        html::collapse_whitespace(&html::unescape(&raw))
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(el) => {
                if el.tag == "br" {
                    out.push(' ');
                }
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

/// Locate a raw tag slice inside the markup it was parsed from.
fn tag_offset(markup: &str, raw: &[u8]) -> Option<usize> {
    let base = markup.as_ptr() as usize;
    let start = raw.as_ptr() as usize;
    if start < base || start >= base + markup.len() {
        return None;
    }
    let offset = start - base;
    let bytes = markup.as_bytes();
    if bytes[offset] == b'<' {
        Some(offset)
    } else if offset > 0 && bytes[offset - 1] == b'<' {
        Some(offset - 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(doc: &Document, tag: &str) -> NodeId {
        doc.elements().find(|&id| doc.tag(id) == tag).unwrap()
    }

    #[test]
    fn test_parse_builds_parent_links() {
        let doc = Document::parse("<div class=\"a b\"><p id=\"x\">Hi</p></div>");
        let div = find(&doc, "div");
        let p = find(&doc, "p");
        assert_eq!(doc.parent(p), Some(div));
        assert_eq!(doc.classes(div).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.name_tokens(p).collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(doc.self_and_ancestors(p).collect::<Vec<_>>(), vec![p, div]);
    }

    #[test]
    fn test_text_decodes_and_collapses() {
        let doc = Document::parse("<p>  Tom &amp;\n   <b>Jerry</b>  </p>");
        assert_eq!(doc.text(find(&doc, "p")), "Tom & Jerry");
    }

    #[test]
    fn test_opaque_elements_have_no_text() {
        let doc = Document::parse("<div>Hi<script>var x = 1;</script></div>");
        assert_eq!(doc.text(find(&doc, "div")), "Hi");
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let doc = Document::parse("<div><p>a</p><span>b</span></div>");
        let tags: Vec<_> = doc.post_order().into_iter().map(|id| doc.tag(id).to_string()).collect();
        assert_eq!(tags, vec!["p", "span", "div"]);
    }

    #[test]
    fn test_offsets_point_at_opening_tag() {
        let markup = "<section>\n  <h1 class=\"t\">Title</h1>\n</section>";
        let doc = Document::parse(markup);
        let h1 = find(&doc, "h1");
        let offset = doc.element(h1).unwrap().offset.unwrap();
        assert!(markup[offset..].starts_with("<h1"));
    }

    #[test]
    fn test_attribute_keys_lowercased() {
        let doc = Document::parse("<IMG SRC=\"/a.png\" Alt=\"x\">");
        let img = find(&doc, "img");
        assert_eq!(doc.attr(img, "src"), Some("/a.png"));
        assert_eq!(doc.attr(img, "alt"), Some("x"));
    }
}
