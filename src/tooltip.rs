use crate::config::CategoryTable;
use crate::data::model::PointRow;

/// Tag used in bin breakdowns for rows without a category.
const UNTAGGED: &str = "uncategorized";

/// What the pointer is over.
#[derive(Debug, Clone, Copy)]
pub enum HoverTarget<'a> {
    /// An aggregated bin and the rows it stands for.
    Aggregated(&'a [&'a PointRow]),
    Single(&'a PointRow),
}

/// Hover text for a render target.
///
/// Bins report their size and a per-category count (registered categories
/// by glyph, unknown tags verbatim) in first-seen order. Single rows report
/// their title followed by whichever optional fields they carry.
pub fn format_tooltip(target: HoverTarget<'_>, categories: &CategoryTable, month: u8) -> String {
    // Header, blank separator, then one line per detail.
    let mut lines = Vec::new();
    match target {
        HoverTarget::Aggregated(rows) => {
            let mut counts: Vec<(String, usize)> = Vec::new();
            for row in rows {
                let tag = row.category().unwrap_or_else(|| UNTAGGED.to_string());
                match counts.iter_mut().find(|(t, _)| *t == tag) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((tag, 1)),
                }
            }
            lines.push(format!("{} points.", rows.len()));
            lines.push(String::new());
            for (tag, n) in counts {
                let key = categories.by_id(&tag).map_or(tag.as_str(), |c| c.glyph_or_id());
                lines.push(format!("{key}: {n}"));
            }
        }
        HoverTarget::Single(row) => {
            lines.push(row.title().unwrap_or_else(|| "(untitled)".to_string()));
            lines.push(String::new());
            if let Some(description) = row.description() {
                lines.push(description);
            }
            if let Some(phone) = row.phone() {
                lines.push(format!("tel: {phone}"));
            }
            if let Some(url) = row.url() {
                lines.push(format!("url: {url}"));
            }
            if let Some(tag) = row.category() {
                let label = categories.by_id(&tag).map_or(tag.as_str(), |c| c.label.as_str());
                lines.push(format!("category: {label}"));
            }
            if let Some(t) = row.temperature(month) {
                lines.extend(temperature_line(t.min, t.max, t.avg));
            }
        }
    }
    lines.join("\n")
}

fn temperature_line(min: Option<f64>, max: Option<f64>, avg: Option<f64>) -> Option<String> {
    match (min, max, avg) {
        (Some(min), Some(max), Some(avg)) => {
            Some(format!("temperature: {min:.1}–{max:.1} ({avg:.1}) °C"))
        }
        (Some(min), Some(max), None) => Some(format!("temperature: {min:.1}–{max:.1} °C")),
        (_, _, Some(avg)) => Some(format!("temperature: {avg:.1} °C")),
        _ => None,
    }
}
