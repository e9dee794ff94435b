//! Markup → arena conversion using `tl`.

use super::{DocumentTree, DomError, Element, NodeData, NodeId};
use crate::patch::sanitize::SanitizedMarkup;
use crate::utils::html::{decode_entities, normalize_bare_attrs, strip_doctype};

impl DocumentTree {
    /// Parse a full page.
    ///
    /// `page_root_tag` names the element bound as page root (the first one in
    /// document order). The page source is the server-rendered document the
    /// session started from; fetched replacement markup goes through
    /// [`DocumentTree::import`] instead.
    pub fn parse(html: &str, page_root_tag: &str) -> Result<Self, DomError> {
        let (doctype, body) = strip_doctype(html);

        let mut tree = Self::empty();
        tree.nodes[0].data = NodeData::Document {
            doctype: doctype.map(str::to_string),
        };
        let document = tree.document;
        tree.parse_into(body, document)?;

        tree.page_root = tree
            .subtree(document)
            .into_iter()
            .find(|id| tree.tag(*id) == Some(page_root_tag));
        Ok(tree)
    }

    /// Parse sanitized markup into detached nodes owned by this tree.
    ///
    /// Returns the top-level nodes in source order. The nodes are not
    /// attached anywhere until a swap inserts them.
    pub fn import(&mut self, markup: &SanitizedMarkup) -> Result<Vec<NodeId>, DomError> {
        let holder = self.alloc(NodeData::Document { doctype: None });
        self.parse_into(markup.as_str(), holder)?;
        let top: Vec<NodeId> = self.children(holder).to_vec();
        for id in &top {
            self.detach(*id);
        }
        Ok(top)
    }

    fn parse_into(&mut self, html: &str, parent: NodeId) -> Result<(), DomError> {
        let html = normalize_bare_attrs(html);
        let dom = tl::parse(&html, tl::ParserOptions::default())
            .map_err(|e| DomError::Parse(format!("{e:?}")))?;
        let parser = dom.parser();
        for handle in dom.children() {
            self.convert(*handle, parser, parent);
        }
        Ok(())
    }

    fn convert(&mut self, handle: tl::NodeHandle, parser: &tl::Parser, parent: NodeId) {
        let Some(node) = handle.get(parser) else {
            return;
        };

        let id = match node {
            tl::Node::Tag(tag) => {
                let mut element = Element::new(tag.name().as_utf8_str().as_ref());
                for (key, value) in tag.attributes().iter() {
                    let key: &str = key.as_ref();
                    let value = value
                        .map(|v| decode_entities(&v).into_owned())
                        .unwrap_or_default();
                    element.set_attr(&key.to_ascii_lowercase(), value);
                }
                let id = self.alloc(NodeData::Element(element));
                for child in tag.children().top().iter() {
                    self.convert(*child, parser, id);
                }
                id
            }
            tl::Node::Raw(bytes) => {
                let text = bytes.as_utf8_str();
                if text.is_empty() {
                    return;
                }
                self.alloc(NodeData::Text(text.into_owned()))
            }
            tl::Node::Comment(bytes) => {
                let raw = bytes.as_utf8_str();
                let text = raw
                    .strip_prefix("<!--")
                    .and_then(|s| s.strip_suffix("-->"))
                    .unwrap_or(raw.as_ref());
                self.alloc(NodeData::Comment(text.to_string()))
            }
        };

        self.nodes[id.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(id);
    }
}
