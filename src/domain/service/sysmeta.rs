//! System metadata documents, edited as a tree.
//!
//! Only direct children of the root are inspected or edited. The relative
//! order of every other child is preserved on serialization.

use xmltree::{Element, EmitterConfig, Namespace, XMLNode};

use crate::error::ChainError;

pub const OBSOLETES: &str = "obsoletes";
pub const OBSOLETED_BY: &str = "obsoletedBy";

/// Elements an inserted `obsoletes` may follow, highest priority first.
pub const ANCHOR_TAGS: &[&str] = &[
    "replicationPolicy",
    "accessPolicy",
    "rightsHolder",
    "submitter",
    "checksum",
    "size",
    "formatId",
    "identifier",
];

#[derive(Debug, Clone)]
pub struct SystemMetadata {
    raw: String,
    root: Element,
}

impl SystemMetadata {
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        let root = Element::parse(raw.as_bytes())
            .map_err(|e| ChainError::InvalidDocument(e.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            root,
        })
    }

    /// The document exactly as it was fetched.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text of the first root child named `tag`; `Some("")` for an empty element.
    pub fn value(&self, tag: &str) -> Option<String> {
        self.root.get_child(tag).map(|e| {
            e.get_text()
                .map(|t| t.trim().to_string())
                .unwrap_or_default()
        })
    }

    pub fn identifier(&self) -> Option<String> {
        self.value("identifier")
    }

    pub fn has(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Index of the first root child named `tag`, counting all node kinds.
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.root
            .children
            .iter()
            .position(|node| matches!(node, XMLNode::Element(e) if e.name == tag))
    }

    /// Names of the root's child elements, in document order.
    pub fn child_names(&self) -> Vec<&str> {
        self.root
            .children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Element(e) => Some(e.name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Insert `<tag>text</tag>` right after the first anchor present.
    pub fn insert_after(
        &mut self,
        tag: &'static str,
        text: &str,
        anchors: &[&str],
    ) -> Result<(), ChainError> {
        let (index, sibling) = anchors
            .iter()
            .find_map(|anchor| {
                self.position(anchor).and_then(|i| match &self.root.children[i] {
                    XMLNode::Element(e) => Some((i, e)),
                    _ => None,
                })
            })
            .ok_or(ChainError::MissingAnchor { tag })?;

        let mut element = Element::new(tag);
        element.prefix = sibling.prefix.clone();
        element.namespace = sibling.namespace.clone();
        element.children.push(XMLNode::Text(text.to_string()));
        self.root.children.insert(index + 1, XMLNode::Element(element));
        Ok(())
    }

    /// Set the text of an existing element in place. Returns false if absent.
    pub fn replace(&mut self, tag: &str, text: &str) -> bool {
        match self.root.get_mut_child(tag) {
            Some(element) => {
                element.children = vec![XMLNode::Text(text.to_string())];
                true
            }
            None => false,
        }
    }

    /// Delete the first element named `tag`. Returns false if absent.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.root.take_child(tag).is_some()
    }

    pub fn to_xml(&self) -> Result<String, ChainError> {
        let mut root = self.root.clone();
        strip_inherited_namespaces(&mut root, None);

        let mut out = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(false);
        root.write_with_config(&mut out, config)
            .map_err(|e| ChainError::InvalidDocument(e.to_string()))?;
        String::from_utf8(out).map_err(|e| ChainError::InvalidDocument(e.to_string()))
    }
}

/// Drop namespace maps a child merely inherits, so they are not redeclared.
fn strip_inherited_namespaces(element: &mut Element, inherited: Option<&Namespace>) {
    let own = element.namespaces.clone();
    if inherited.is_some() && element.namespaces.as_ref() == inherited {
        element.namespaces = None;
    }
    let scope = own.as_ref().or(inherited);
    for child in &mut element.children {
        if let XMLNode::Element(e) = child {
            strip_inherited_namespaces(e, scope);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A trimmed system metadata document with the given optional links.
    pub fn sysmeta(identifier: &str, obsoletes: Option<&str>, obsoleted_by: Option<&str>) -> String {
        let mut links = String::new();
        if let Some(o) = obsoletes {
            links.push_str(&format!("<obsoletes>{}</obsoletes>", o));
        }
        if let Some(o) = obsoleted_by {
            links.push_str(&format!("<obsoletedBy>{}</obsoletedBy>", o));
        }
        format!(
            concat!(
                r#"<d1:systemMetadata xmlns:d1="http://ns.dataone.org/service/types/v2.0">"#,
                "<serialVersion>1</serialVersion>",
                "<identifier>{}</identifier>",
                "<formatId>eml://ecoinformatics.org/eml-2.1.1</formatId>",
                "<size>1024</size>",
                r#"<checksum algorithm="MD5">abc</checksum>"#,
                "<submitter>uid=EDI</submitter>",
                "<rightsHolder>uid=EDI</rightsHolder>",
                "<accessPolicy><allow><subject>public</subject><permission>read</permission></allow></accessPolicy>",
                "{}",
                "<dateUploaded>2020-01-01T00:00:00</dateUploaded>",
                "</d1:systemMetadata>"
            ),
            identifier, links
        )
    }
}
