//! Planning the minimal link edit for one system metadata document.
//!
//! Each of the two links runs through the same four-state decision:
//!
//! | expected | present      | action  |
//! |----------|--------------|---------|
//! | none     | absent       | OK      |
//! | none     | any          | REMOVE  |
//! | `V`      | absent       | ADD     |
//! | `V`      | `V`          | OK      |
//! | `V`      | `W != V`     | REPLACE |
//!
//! Planning is pure. Re-planning against a plan's own result document with
//! the same expectations always yields `OK/OK`.

use std::fmt;

use serde::Serialize;

use super::sysmeta::{ANCHOR_TAGS, OBSOLETED_BY, OBSOLETES, SystemMetadata};
use crate::domain::model::{PackageIdentifier, ResolvedLinkRecord};
use crate::error::ChainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkAction {
    Ok,
    Add,
    Replace,
    Remove,
}

impl LinkAction {
    pub fn decide(expected: Option<&PackageIdentifier>, present: Option<&str>) -> Self {
        match (expected, present) {
            (None, None) => LinkAction::Ok,
            (None, Some(_)) => LinkAction::Remove,
            (Some(_), None) => LinkAction::Add,
            (Some(expected), Some(present)) if links_match(expected, present) => LinkAction::Ok,
            (Some(_), Some(_)) => LinkAction::Replace,
        }
    }

    /// Column text in the audit file; empty for `OK`.
    pub fn audit_label(&self) -> &'static str {
        match self {
            LinkAction::Ok => "",
            LinkAction::Add => "ADD",
            LinkAction::Replace => "REPLACE",
            LinkAction::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkAction::Ok => write!(f, "OK"),
            other => write!(f, "{}", other.audit_label()),
        }
    }
}

/// Identifier semantics when the present text parses, exact text otherwise.
///
/// The prefix must match too: a bare value never stands in for a prefixed
/// one, and a link under another host or path is replaced.
pub fn links_match(expected: &PackageIdentifier, present: &str) -> bool {
    match PackageIdentifier::parse(present) {
        Ok(present) => &present == expected && present.prefix() == expected.prefix(),
        Err(_) => expected.to_string() == present.trim(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEditPlan {
    pub identifier: PackageIdentifier,
    pub obsoletes: LinkAction,
    pub obsoleted_by: LinkAction,
    /// Equal to the input document when both actions are `OK`.
    pub result_document: String,
}

impl TagEditPlan {
    /// Whether the result must be published.
    pub fn needs_update(&self) -> bool {
        self.obsoletes != LinkAction::Ok || self.obsoleted_by != LinkAction::Ok
    }
}

/// Compute the plan and the corrected document.
pub fn plan(
    identifier: &PackageIdentifier,
    document: &SystemMetadata,
    expected_obsoletes: Option<&PackageIdentifier>,
    expected_obsoleted_by: Option<&PackageIdentifier>,
) -> Result<TagEditPlan, ChainError> {
    let obsoletes = LinkAction::decide(expected_obsoletes, document.value(OBSOLETES).as_deref());
    let obsoleted_by = LinkAction::decide(
        expected_obsoleted_by,
        document.value(OBSOLETED_BY).as_deref(),
    );

    let result_document = if obsoletes == LinkAction::Ok && obsoleted_by == LinkAction::Ok {
        document.raw().to_string()
    } else {
        let mut revised = document.clone();
        // obsoletes goes first so an inserted obsoletedBy can follow it.
        apply(&mut revised, OBSOLETES, obsoletes, expected_obsoletes, ANCHOR_TAGS)?;
        let mut anchors = vec![OBSOLETES];
        anchors.extend_from_slice(ANCHOR_TAGS);
        apply(
            &mut revised,
            OBSOLETED_BY,
            obsoleted_by,
            expected_obsoleted_by,
            &anchors,
        )?;
        revised.to_xml()?
    };

    Ok(TagEditPlan {
        identifier: identifier.clone(),
        obsoletes,
        obsoleted_by,
        result_document,
    })
}

/// Parse a fetched document and plan it against a resolved record.
pub fn plan_for(record: &ResolvedLinkRecord, raw: &str) -> Result<TagEditPlan, ChainError> {
    let document = SystemMetadata::parse(raw)?;
    plan(
        &record.identifier,
        &document,
        record.obsoletes.as_ref(),
        record.obsoleted_by.as_ref(),
    )
}

fn apply(
    document: &mut SystemMetadata,
    tag: &'static str,
    action: LinkAction,
    expected: Option<&PackageIdentifier>,
    anchors: &[&str],
) -> Result<(), ChainError> {
    let text = expected.map(ToString::to_string).unwrap_or_default();
    match action {
        LinkAction::Ok => {}
        LinkAction::Add => document.insert_after(tag, &text, anchors)?,
        LinkAction::Replace => {
            document.replace(tag, &text);
        }
        LinkAction::Remove => {
            document.remove(tag);
        }
    }
    Ok(())
}
