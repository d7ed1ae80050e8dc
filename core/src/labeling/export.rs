//! Export — render a snapshot plus user annotations as `id|period|note` lines.

use crate::types::record::{SequenceRecord, Snapshot};


/// The middle column: `"<period> , <range>"` when both are present,
/// otherwise whichever one is, otherwise empty.
pub fn middle_column(record: &SequenceRecord) -> String {
    match (record.period_text.is_empty(), record.time_range.is_empty()) {
        (false, false) => format!("{} , {}", record.period_text, record.time_range),
        (false, true) => record.period_text.clone(),
        (true, false) => record.time_range.clone(),
        (true, true) => String::new(),
    }
}


pub fn export_line(record: &SequenceRecord, annotation: &str) -> String {
    format!("{}|{}|{}", record.sequence_id, middle_column(record), annotation)
}


/// One line per record. `annotations[i]` belongs to the i-th record; missing
/// annotations export as empty text.
pub fn export_lines(snapshot: &Snapshot, annotations: &[String]) -> Vec<String> {
    snapshot
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let note = annotations.get(i).map(String::as_str).unwrap_or("");
            export_line(record, note)
        })
        .collect()
}


pub fn export_text(snapshot: &Snapshot, annotations: &[String]) -> String {
    export_lines(snapshot, annotations).join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, period: &str, range: &str) -> SequenceRecord {
        SequenceRecord {
            sequence_id: id,
            period_text: period.into(),
            time_range: range.into(),
        }
    }

    #[test]
    fn full_record_with_annotation() {
        let snap = Snapshot::new(vec![record(1, "Set 1", "9:05 - 9:40")]);
        let lines = export_lines(&snap, &["Zone Blitz".to_string()]);
        assert_eq!(lines, vec!["1|Set 1 , 9:05 - 9:40|Zone Blitz"]);
    }

    #[test]
    fn middle_column_uses_whichever_part_exists() {
        assert_eq!(middle_column(&record(1, "Pregame", "")), "Pregame");
        assert_eq!(middle_column(&record(1, "", "1:00 - 2:00")), "1:00 - 2:00");
        assert_eq!(middle_column(&record(1, "", "")), "");
    }

    #[test]
    fn missing_annotations_are_empty() {
        let snap = Snapshot::new(vec![record(1, "A", ""), record(2, "B", "")]);
        let text = export_text(&snap, &["first".to_string()]);
        assert_eq!(text, "1|A|first\n2|B|");
    }

    #[test]
    fn empty_snapshot_exports_nothing() {
        assert_eq!(export_text(&Snapshot::default(), &[]), "");
    }
}
