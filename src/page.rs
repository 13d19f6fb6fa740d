//! In-memory page model.
//!
//! The page is parsed once with `scraper` and mutated through its
//! underlying `ego_tree`. Regions are addressed by CSS selector; like
//! `querySelector`, the first match is the region.

use crate::{Error, Result};
use ego_tree::{NodeId, NodeMut, NodeRef};
use html5ever::{LocalName, Namespace, QualName};
use scraper::{Html, Node, Selector};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A parsed HTML page whose regions can be rewritten
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::parse(&html))
    }

    /// Whether `selector` matches an element of the page.
    pub fn contains(&self, selector: &str) -> Result<bool> {
        Ok(self.first_match(selector)?.is_some())
    }

    /// Inner HTML of the first element matching `selector`.
    pub fn inner_html(&self, selector: &str) -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(self.document.select(&sel).next().map(|el| el.inner_html()))
    }

    /// Text content of the first element matching `selector`.
    pub fn text(&self, selector: &str) -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(self
            .document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>()))
    }

    /// Text content of every element matching `selector`, in document order.
    pub fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let sel = parse_selector(selector)?;
        Ok(self
            .document
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    /// Number of elements matching `selector`.
    pub fn count(&self, selector: &str) -> Result<usize> {
        let sel = parse_selector(selector)?;
        Ok(self.document.select(&sel).count())
    }

    /// Replace the children of the region with `markup`.
    ///
    /// Returns `false` when the region is not on the page; nothing is
    /// written in that case.
    ///
    /// Replaced children are detached but stay allocated in the document
    /// tree. Hosts that re-render one page many times should call
    /// [`Page::compact`] between runs.
    pub fn replace_children(&mut self, selector: &str, markup: &str) -> Result<bool> {
        let Some(id) = self.first_match(selector)? else {
            return Ok(false);
        };

        let fragment = Html::parse_fragment(markup);
        let mut region = self
            .document
            .tree
            .get_mut(id)
            .ok_or_else(|| Error::RenderError(format!("stale node for '{}'", selector)))?;

        while let Some(mut child) = region.first_child() {
            child.detach();
        }
        graft(&mut region, *fragment.root_element());
        Ok(true)
    }

    /// Set attributes on the first element matching `selector`, keeping the
    /// element and its other attributes. Returns `false` when nothing matches.
    ///
    /// Meant for plain attributes like `src` and `alt`; `id` and `class`
    /// are indexed by the parser and must not be rewritten here.
    pub fn set_attributes(&mut self, selector: &str, attrs: &[(String, String)]) -> Result<bool> {
        let Some(id) = self.first_match(selector)? else {
            return Ok(false);
        };
        let mut node = self
            .document
            .tree
            .get_mut(id)
            .ok_or_else(|| Error::RenderError(format!("stale node for '{}'", selector)))?;
        let Node::Element(element) = node.value() else {
            return Err(Error::RenderError(format!("'{}' is not an element", selector)));
        };
        for (name, value) in attrs {
            let key = QualName::new(None, Namespace::from(""), LocalName::from(name.as_str()));
            element.attrs.insert(key, value.as_str().into());
        }
        Ok(true)
    }

    /// Re-parse the serialized page, dropping nodes detached by earlier
    /// rewrites.
    pub fn compact(&mut self) {
        *self = Self::parse(&self.html());
    }

    /// Serialized page.
    pub fn html(&self) -> String {
        let has_doctype = self
            .document
            .tree
            .root()
            .children()
            .any(|n| matches!(n.value(), Node::Doctype(_)));
        let body = self.document.root_element().html();
        if has_doctype {
            format!("<!DOCTYPE html>\n{}", body)
        } else {
            body
        }
    }

    /// SHA-256 of the serialized page, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.html().as_bytes()))
    }

    fn first_match(&self, selector: &str) -> Result<Option<NodeId>> {
        let sel = parse_selector(selector)?;
        Ok(self.document.select(&sel).next().map(|el| el.id()))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::ConfigError(format!("invalid selector '{}': {:?}", selector, e)))
}

// Copy the children of `src` (from another tree) under `dst`.
fn graft(dst: &mut NodeMut<'_, Node>, src: NodeRef<'_, Node>) {
    for child in src.children() {
        let mut copy = dst.append(child.value().clone());
        graft(&mut copy, child);
    }
}
