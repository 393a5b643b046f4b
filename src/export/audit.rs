use anyhow::Result;

use super::finish;
use crate::domain::service::{LinkAction, TagEditPlan};

pub const AUDIT_HEADER: [&str; 5] = [
    "identifier",
    "obsoletesAction",
    "obsoletedByAction",
    "revisedDocument",
    "originalDocument",
];

/// Placeholder for an original document that was never fetched.
const NOT_AVAILABLE: &str = "NA";

/// One attempted repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub identifier: String,
    pub obsoletes: Option<LinkAction>,
    pub obsoleted_by: Option<LinkAction>,
    pub revised_document: String,
    pub original_document: Option<String>,
}

impl AuditRow {
    pub fn planned(plan: &TagEditPlan, original: &str) -> Self {
        Self {
            identifier: plan.identifier.to_string(),
            obsoletes: Some(plan.obsoletes),
            obsoleted_by: Some(plan.obsoleted_by),
            revised_document: plan.result_document.clone(),
            original_document: Some(original.to_string()),
        }
    }

    /// A record that was fetched but could not be planned.
    pub fn unplanned(identifier: impl Into<String>, original: &str) -> Self {
        Self {
            identifier: identifier.into(),
            obsoletes: None,
            obsoleted_by: None,
            revised_document: String::new(),
            original_document: Some(original.to_string()),
        }
    }

    pub fn unavailable(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            obsoletes: None,
            obsoleted_by: None,
            revised_document: String::new(),
            original_document: None,
        }
    }
}

/// Tab-separated, with both documents percent-encoded onto one line.
pub fn write_audit(rows: &[AuditRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.write_record(AUDIT_HEADER)?;
    for row in rows {
        let label = |action: Option<LinkAction>| action.map(|a| a.audit_label()).unwrap_or_default();
        let revised = urlencoding::encode(&row.revised_document);
        let original = match &row.original_document {
            Some(document) => urlencoding::encode(document).into_owned(),
            None => NOT_AVAILABLE.to_string(),
        };
        writer.write_record([
            row.identifier.as_str(),
            label(row.obsoletes),
            label(row.obsoleted_by),
            &*revised,
            original.as_str(),
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_audit() {
        let plan = TagEditPlan {
            identifier: "edi/1/2".parse().unwrap(),
            obsoletes: LinkAction::Ok,
            obsoleted_by: LinkAction::Add,
            result_document: "<a>\t<obsoletedBy>edi/1/3</obsoletedBy></a>".to_string(),
        };
        let rows = vec![
            AuditRow::planned(&plan, "<a>\t</a>"),
            AuditRow::unavailable("edi/9/1"),
        ];
        let text = String::from_utf8(write_audit(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "identifier\tobsoletesAction\tobsoletedByAction\trevisedDocument\toriginalDocument"
        );
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(&fields[..3], &["edi/1/2", "", "ADD"]);
        assert_eq!(
            urlencoding::decode(fields[3]).unwrap(),
            plan.result_document
        );
        assert_eq!(lines[2], "edi/9/1\t\t\t\tNA");
    }
}
