//! Buttons: a paragraph holding nothing but a link.

use crate::dom::{DocumentTree, NodeId};

use super::{DecorateError, Decoratable, is_sole_child};

pub struct ButtonStep;

impl ButtonStep {
    /// `(paragraph, emphasis class)` when `link` is a button.
    fn classify(tree: &DocumentTree, link: NodeId) -> Option<(NodeId, Option<&'static str>)> {
        let up = tree.parent(link)?;
        match tree.tag(up)? {
            "p" if is_sole_child(tree, up, link) => Some((up, None)),
            tag @ ("strong" | "em") if is_sole_child(tree, up, link) => {
                let p = tree.parent(up).filter(|p| tree.tag(*p) == Some("p"))?;
                if !is_sole_child(tree, p, up) {
                    return None;
                }
                let emphasis = if tag == "strong" { "primary" } else { "secondary" };
                Some((p, Some(emphasis)))
            }
            _ => None,
        }
    }
}

impl Decoratable for ButtonStep {
    fn decorate(&self, tree: &mut DocumentTree, root: NodeId) -> Result<(), DecorateError> {
        let buttons: Vec<_> = tree
            .subtree(root)
            .into_iter()
            .filter(|n| tree.tag(*n) == Some("a") && tree.has_attr(*n, "href"))
            .filter_map(|a| Self::classify(tree, a).map(|c| (a, c)))
            .collect();

        for (link, (paragraph, emphasis)) in buttons {
            tree.add_class(link, "button");
            if let Some(class) = emphasis {
                tree.add_class(link, class);
            }
            tree.add_class(paragraph, "button-container");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorate(html: &str) -> String {
        let mut tree = DocumentTree::parse(html, "main").unwrap();
        let root = tree.page_root().unwrap();
        ButtonStep.decorate(&mut tree, root).unwrap();
        tree.outer_html(root)
    }

    #[test]
    fn test_plain_primary_secondary() {
        let out = decorate(
            r#"<main><p><a href="/a">A</a></p><p><strong><a href="/b">B</a></strong></p><p><em><a href="/c">C</a></em></p></main>"#,
        );
        assert_eq!(
            out,
            r#"<main><p class="button-container"><a class="button" href="/a">A</a></p><p class="button-container"><strong><a class="button primary" href="/b">B</a></strong></p><p class="button-container"><em><a class="button secondary" href="/c">C</a></em></p></main>"#
        );
    }

    #[test]
    fn test_inline_link_is_not_a_button() {
        let html = r#"<main><p>Read <a href="/a">this</a> now</p></main>"#;
        assert_eq!(decorate(html), html);
    }
}
