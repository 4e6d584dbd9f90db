use anyhow::Result;
use rescue_core::Report;
use std::fs;
use std::path::{Path, PathBuf};
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

use crate::card;

pub struct ExportPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl ExportPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_dir: root.join("00_Index"),
            reports_dir: root.join("Reports"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.index_dir)?;
        fs::create_dir_all(&self.reports_dir)?;
        Ok(())
    }
}

/// Writes the feed as markdown: one note per report plus an index in feed order.
pub fn export_feed(reports: &[Report], root: &Path, offset: UtcOffset) -> Result<()> {
    let paths = ExportPaths::new(root);
    paths.ensure()?;

    let mut index_lines: Vec<String> = Vec::new();
    index_lines.push("# Feed".to_string());
    index_lines.push(String::new());
    index_lines.push("This index is generated. Do not edit manually.".to_string());
    index_lines.push(String::new());

    if reports.is_empty() {
        index_lines.push(format!("_{}_", card::EMPTY_FEED));
    }

    for report in reports {
        write_report_note(&paths, report, offset)?;
        index_lines.push(format!(
            "- [[Reports/{}|{}]]",
            note_name(report),
            index_title(report, offset)
        ));
    }

    fs::write(paths.index_dir.join("Feed.md"), index_lines.join("\n"))?;
    Ok(())
}

fn note_name(report: &Report) -> String {
    report
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn index_title(report: &Report, offset: UtcOffset) -> String {
    let mut title = format!("{} {}", card::captured_at_label(report, offset), card::location_line(report));
    if let Some(label) = card::status_label(report.status) {
        title.push_str(&format!(" ({label})"));
    }
    title
}

fn write_report_note(paths: &ExportPaths, report: &Report, offset: UtcOffset) -> Result<()> {
    let note_path = paths.reports_dir.join(format!("{}.md", note_name(report)));

    let mut md = String::new();
    md.push_str("---\n");
    md.push_str(&format!("id: {}\n", report.id));
    if let Some(submission_id) = report.submission_id {
        md.push_str(&format!("submission_id: {submission_id}\n"));
    }
    md.push_str(&format!("status: {}\n", report.status));
    md.push_str(&format!("created_at: {}\n", report.created_at.format(&Rfc3339)?));
    if let Some(c) = report.location {
        md.push_str(&format!("lat: {}\nlng: {}\n", c.lat, c.lng));
    }
    if let Some(media) = report.display_media() {
        md.push_str(&format!("media: {media}\n"));
    }
    md.push_str("---\n\n");

    md.push_str(&format!("# Report {}\n\n", report.id));
    for line in card::render_card(report, offset) {
        md.push_str(&format!("- {line}\n"));
    }

    if report.description.trim().is_empty() {
        md.push_str("\n_No description._\n");
    }

    fs::write(note_path, md)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_core::ReportStatus;
    use time::macros::datetime;

    fn report(id: &str, status: ReportStatus) -> Report {
        Report {
            id: id.into(),
            submission_id: None,
            local_media_ref: None,
            remote_media_ref: Some(format!("https://cdn/{id}.jpg")),
            description: "puppy by the road".into(),
            created_at: datetime!(2025-06-01 07:05 UTC),
            location: None,
            address: Some("Pasig".into()),
            status,
        }
    }

    #[test]
    fn writes_index_and_notes() {
        let dir = tempfile::tempdir().unwrap();
        let reports = vec![
            report("local-1-abc", ReportStatus::Failed),
            report("12", ReportStatus::Uploaded),
        ];
        export_feed(&reports, dir.path(), UtcOffset::UTC).unwrap();

        let index = fs::read_to_string(dir.path().join("00_Index/Feed.md")).unwrap();
        let local_pos = index.find("[[Reports/local-1-abc|").unwrap();
        let server_pos = index.find("[[Reports/12|").unwrap();
        assert!(local_pos < server_pos);
        assert!(index.contains("(Upload failed)"));

        let note = fs::read_to_string(dir.path().join("Reports/12.md")).unwrap();
        assert!(note.contains("status: uploaded"));
        assert!(note.contains("created_at: 2025-06-01T07:05:00Z"));
        assert!(note.contains("- 📍 Pasig"));
    }

    #[test]
    fn empty_feed_still_writes_index() {
        let dir = tempfile::tempdir().unwrap();
        export_feed(&[], dir.path(), UtcOffset::UTC).unwrap();
        let index = fs::read_to_string(dir.path().join("00_Index/Feed.md")).unwrap();
        assert!(index.contains("No reports yet."));
    }
}
