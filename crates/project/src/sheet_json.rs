use kbm_sheet::{Note, Position, Sheet};
use serde::{Deserialize, Serialize};

use crate::ProjectError;

/// Implementation tag written into the sheet document.
pub const SHEET_TYPE: &str = "HashSheet";
const LEGACY_SHEET_TYPE: &str = "ConcurrentHashSheet";

#[derive(Debug, Serialize, Deserialize)]
struct SheetDocument {
    col: i32,
    l: i32,
    r: i32,
    #[serde(rename = "type")]
    kind: String,
    data: Vec<NoteDocument>,
}

/// A note as its kind and flattened `row, lane` pairs.
#[derive(Debug, Serialize, Deserialize)]
struct NoteDocument {
    #[serde(rename = "type")]
    kind: String,
    val: Vec<i32>,
}

impl From<&Note> for NoteDocument {
    fn from(note: &Note) -> Self {
        Self {
            kind: note.kind().name().to_string(),
            val: note.endpoints().flat_map(|p| [p.row, p.lane]).collect(),
        }
    }
}

impl TryFrom<NoteDocument> for Note {
    type Error = ProjectError;

    fn try_from(doc: NoteDocument) -> Result<Self, Self::Error> {
        let invalid = || ProjectError::InvalidSheet(format!("malformed {} note {:?}", doc.kind, doc.val));
        let before_start =
            |row: i32| ProjectError::InvalidSheet(format!("{} note at negative row {row}", doc.kind));
        match (doc.kind.as_str(), doc.val.as_slice()) {
            ("Hit", &[row, _]) | ("Hold", &[row, _, _, _]) if row < 0 => Err(before_start(row)),
            ("Hit", &[row, lane]) => Ok(Note::hit(row, lane)),
            ("Hold", &[start_row, start_lane, end_row, end_lane]) => Note::hold(
                Position::new(start_row, start_lane),
                Position::new(end_row, end_lane),
            )
            .map_err(|e| ProjectError::InvalidSheet(e.to_string())),
            ("Hit", _) | ("Hold", _) => Err(invalid()),
            (other, _) => Err(ProjectError::InvalidSheet(format!("unknown note type '{other}'"))),
        }
    }
}

pub fn sheet_to_json(sheet: &Sheet) -> Result<Vec<u8>, ProjectError> {
    let doc = SheetDocument {
        col: sheet.column(),
        l: sheet.left_size(),
        r: sheet.right_size(),
        kind: SHEET_TYPE.to_string(),
        data: sheet.sorted_values().iter().map(NoteDocument::from).collect(),
    };
    Ok(serde_json::to_vec(&doc)?)
}

pub fn sheet_from_json(bytes: &[u8]) -> Result<Sheet, ProjectError> {
    let doc: SheetDocument = serde_json::from_slice(bytes)?;
    if doc.kind != SHEET_TYPE && doc.kind != LEGACY_SHEET_TYPE {
        return Err(ProjectError::InvalidSheet(format!(
            "unknown sheet implementation '{}'",
            doc.kind
        )));
    }

    let sheet = Sheet::new(doc.col, doc.l, doc.r)?;
    for note_doc in doc.data {
        let note = Note::try_from(note_doc)?;
        if !sheet.contains_lane(note.lane()) {
            return Err(ProjectError::InvalidSheet(format!(
                "note {note} is outside {} lanes",
                sheet.column()
            )));
        }
        if !sheet.insert(note) {
            log::warn!("duplicate note at {}, keeping the first", note.base_position());
        }
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> Sheet {
        let sheet = Sheet::new(4, 2, 2).expect("sheet");
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(24, 3));
        sheet.insert(Note::hold(Position::new(48, 1), Position::new(144, 1)).expect("hold"));
        sheet
    }

    #[test]
    fn test_document_shape() {
        let bytes = sheet_to_json(&sample_sheet()).expect("encode");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");

        assert_eq!(json["col"], 4);
        assert_eq!(json["l"], 2);
        assert_eq!(json["type"], "HashSheet");
        let data = json["data"].as_array().expect("data");
        assert_eq!(data.len(), 3);
        assert!(data.contains(&serde_json::json!({"type": "Hold", "val": [48, 1, 144, 1]})));
        assert!(data.contains(&serde_json::json!({"type": "Hit", "val": [24, 3]})));
    }

    #[test]
    fn test_reload_keeps_notes() {
        let sheet = sample_sheet();
        let loaded = sheet_from_json(&sheet_to_json(&sheet).expect("encode")).expect("decode");
        assert_eq!(loaded.sorted_values(), sheet.sorted_values());
        assert_eq!(loaded.right_size(), 2);
    }

    #[test]
    fn test_accepts_legacy_tag() {
        let json = br#"{"col":2,"l":1,"r":1,"type":"ConcurrentHashSheet","data":[{"type":"Hit","val":[3,1]}]}"#;
        let sheet = sheet_from_json(json).expect("decode");
        assert_eq!(sheet.get_note(3, 1), Some(Note::hit(3, 1)));
    }

    #[test]
    fn test_rejects_unknown_sheet_type() {
        let json = br#"{"col":2,"l":1,"r":1,"type":"ArraySheet","data":[]}"#;
        assert!(matches!(sheet_from_json(json), Err(ProjectError::InvalidSheet(_))));
    }

    #[test]
    fn test_rejects_malformed_notes() {
        let bad = [
            r#"{"type":"Hit","val":[1]}"#,
            r#"{"type":"Hold","val":[0,0,10,1]}"#,
            r#"{"type":"Slide","val":[0,0]}"#,
            r#"{"type":"Hit","val":[0,7]}"#,
        ];
        for note in bad {
            let json = format!(r#"{{"col":2,"l":1,"r":1,"type":"HashSheet","data":[{note}]}}"#);
            assert!(
                matches!(sheet_from_json(json.as_bytes()), Err(ProjectError::InvalidSheet(_))),
                "{note}"
            );
        }
    }

    #[test]
    fn test_rejects_negative_rows() {
        for note in [
            r#"{"type":"Hit","val":[-1,0]}"#,
            r#"{"type":"Hold","val":[-4,1,8,1]}"#,
        ] {
            let json = format!(r#"{{"col":2,"l":1,"r":1,"type":"HashSheet","data":[{note}]}}"#);
            assert!(
                matches!(sheet_from_json(json.as_bytes()), Err(ProjectError::InvalidSheet(_))),
                "{note}"
            );
        }
    }

    #[test]
    fn test_invalid_lane_groups() {
        let json = br#"{"col":3,"l":1,"r":1,"type":"HashSheet","data":[]}"#;
        assert!(matches!(sheet_from_json(json), Err(ProjectError::Sheet(_))));
    }
}
