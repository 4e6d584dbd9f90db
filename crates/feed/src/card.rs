use rescue_core::store::StatusCounts;
use rescue_core::{Report, ReportStatus};
use time::UtcOffset;
use time::macros::format_description;

pub const EMPTY_FEED: &str = "No reports yet.";
pub const PHOTO_UNAVAILABLE: &str = "🖼 Photo unavailable";

/// Offset used for displaying capture times. Falls back to UTC when the
/// local offset cannot be determined.
pub fn display_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn location_line(report: &Report) -> String {
    if let Some(address) = &report.address {
        return format!("📍 {address}");
    }
    match report.location {
        Some(c) => format!("📍 {:.5}, {:.5}", c.lat, c.lng),
        None => "📍 Location unavailable".to_string(),
    }
}

pub fn status_label(status: ReportStatus) -> Option<&'static str> {
    match status {
        ReportStatus::Pending => Some("Uploading…"),
        ReportStatus::Failed => Some("Upload failed"),
        ReportStatus::Uploaded => None,
    }
}

pub fn captured_at_label(report: &Report, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    report
        .created_at
        .to_offset(offset)
        .format(&format)
        .unwrap_or_else(|_| report.created_at.to_string())
}

pub fn render_card(report: &Report, offset: UtcOffset) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(captured_at_label(report, offset));
    lines.push(location_line(report));
    if !report.description.is_empty() {
        lines.push(report.description.clone());
    }
    if let Some(label) = status_label(report.status) {
        lines.push(label.to_string());
    }
    match report.display_media() {
        Some(media) => lines.push(format!("🖼 {media}")),
        None => lines.push(PHOTO_UNAVAILABLE.to_string()),
    }
    lines
}

pub fn header_line(counts: &StatusCounts) -> String {
    format!(
        "Pet Community: {} reports ({} uploading, {} failed)",
        counts.total(),
        counts.pending,
        counts.failed
    )
}

pub fn render_feed(reports: &[Report], counts: &StatusCounts, offset: UtcOffset) -> String {
    let mut out = vec![header_line(counts), String::new()];
    if reports.is_empty() {
        out.push(EMPTY_FEED.to_string());
        return out.join("\n");
    }
    for report in reports {
        out.extend(render_card(report, offset).into_iter().map(|line| format!("  {line}")));
        out.push(String::new());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_core::Coords;
    use time::macros::datetime;

    fn report() -> Report {
        Report {
            id: "7".into(),
            submission_id: None,
            local_media_ref: Some("file:///cache/7.jpg".into()),
            remote_media_ref: None,
            description: String::new(),
            created_at: datetime!(2025-05-02 18:30 UTC),
            location: None,
            address: None,
            status: ReportStatus::Pending,
        }
    }

    #[test]
    fn location_prefers_address_then_coords() {
        let mut r = report();
        assert_eq!(location_line(&r), "📍 Location unavailable");

        r.location = Coords::new(14.599512, 120.984222);
        assert_eq!(location_line(&r), "📍 14.59951, 120.98422");

        r.address = Some("Ermita, Manila".into());
        assert_eq!(location_line(&r), "📍 Ermita, Manila");
    }

    #[test]
    fn card_shows_status_only_when_not_uploaded() {
        let mut r = report();
        let lines = render_card(&r, UtcOffset::UTC);
        assert_eq!(lines[0], "2025-05-02 18:30");
        assert!(lines.contains(&"Uploading…".to_string()));
        assert!(lines.contains(&"🖼 file:///cache/7.jpg".to_string()));

        r.status = ReportStatus::Uploaded;
        r.remote_media_ref = Some("https://cdn/7.jpg".into());
        r.description = "kitten in drain".into();
        let lines = render_card(&r, UtcOffset::UTC);
        assert!(!lines.iter().any(|l| l == "Uploading…" || l == "Upload failed"));
        assert!(lines.contains(&"kitten in drain".to_string()));
        assert!(lines.contains(&"🖼 https://cdn/7.jpg".to_string()));
    }

    #[test]
    fn capture_time_uses_display_offset() {
        let offset = UtcOffset::from_hms(8, 0, 0).unwrap();
        assert_eq!(captured_at_label(&report(), offset), "2025-05-03 02:30");
    }

    #[test]
    fn empty_feed_message() {
        let out = render_feed(&[], &StatusCounts::default(), UtcOffset::UTC);
        assert!(out.ends_with(EMPTY_FEED));
    }

    #[test]
    fn server_row_without_photo_shows_placeholder() {
        let mut r = report();
        r.local_media_ref = None;
        r.status = ReportStatus::Uploaded;
        let lines = render_card(&r, UtcOffset::UTC);
        assert_eq!(lines.last().map(String::as_str), Some(PHOTO_UNAVAILABLE));
    }

    #[test]
    fn failed_label() {
        assert_eq!(status_label(ReportStatus::Failed), Some("Upload failed"));
    }
}
