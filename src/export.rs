use std::{
    borrow::Cow,
    io::{Cursor, Write},
};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;

use crate::{
    fetcher::TIMESTAMP_FORMAT,
    persistency::PersistencyRecord,
    report::{editor_summary, EditorStats},
};

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const REVISION_COLUMNS: &[&str] = &[
    "page_label",
    "language",
    "revision_id",
    "user_name",
    "user_id",
    "timestamp",
    "size",
    "delta",
    "persistency_seconds",
    "persistency_hours",
    "persistency_days",
];

const EDITOR_COLUMNS: &[&str] = &[
    "user_name",
    "edits",
    "mean_persistency_hours",
    "total_persistency_hours",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("CSV error")]
    Csv(#[from] csv::Error),
    #[error("XML error")]
    Xml(#[from] quick_xml::Error),
    #[error("zip error")]
    Zip(#[from] zip::result::ZipError),
}

/// Which page the exported records belong to; repeated on every revision row.
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub page_label: &'a str,
    pub language: &'a str,
}

#[derive(Debug, Serialize)]
struct RevisionRow<'a> {
    page_label: &'a str,
    language: &'a str,
    revision_id: u64,
    user_name: &'a str,
    user_id: u64,
    timestamp: String,
    size: Option<u64>,
    delta: i64,
    persistency_seconds: f64,
    persistency_hours: f64,
    persistency_days: f64,
}

impl<'a> RevisionRow<'a> {
    fn new(context: &ExportContext<'a>, record: &'a PersistencyRecord) -> Self {
        let revision = &record.revision;
        Self {
            page_label: context.page_label,
            language: context.language,
            revision_id: revision.id,
            user_name: &revision.author.name,
            user_id: revision.author.id,
            timestamp: revision.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            size: revision.size,
            delta: revision.delta,
            persistency_seconds: record.persistency_seconds(),
            persistency_hours: record.persistency_hours(),
            persistency_days: record.persistency_days(),
        }
    }

    fn cells(&self) -> Vec<Cell<'a>> {
        vec![
            Cell::Text(self.page_label.into()),
            Cell::Text(self.language.into()),
            Cell::Number(self.revision_id as f64),
            Cell::Text(self.user_name.into()),
            Cell::Number(self.user_id as f64),
            Cell::Text(self.timestamp.clone().into()),
            self.size.map_or(Cell::Empty, |size| Cell::Number(size as f64)),
            Cell::Number(self.delta as f64),
            Cell::Number(self.persistency_seconds),
            Cell::Number(self.persistency_hours),
            Cell::Number(self.persistency_days),
        ]
    }
}

/// Write one CSV row per record, with a header row.
pub fn write_csv<W: Write>(
    writer: W,
    context: &ExportContext<'_>,
    records: &[PersistencyRecord],
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serialize() only emits the header together with the first row
        writer.write_record(REVISION_COLUMNS)?;
    }
    for record in records {
        writer.serialize(RevisionRow::new(context, record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv(
    context: &ExportContext<'_>,
    records: &[PersistencyRecord],
) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, context, records)?;
    Ok(buffer)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Sheet<'a> {
    pub name: &'a str,
    pub rows: Vec<Vec<Cell<'a>>>,
}

impl<'a> Sheet<'a> {
    fn with_header(name: &'a str, columns: &[&'a str]) -> Self {
        Self {
            name,
            rows: vec![columns.iter().map(|c| Cell::Text((*c).into())).collect()],
        }
    }
}

/// Minimal Office Open XML workbook: inline strings, no styles.
#[derive(Debug, Clone, Default)]
pub struct Workbook<'a> {
    pub sheets: Vec<Sheet<'a>>,
}

// A, B, ..., Z, AA, AB, ...
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn new_xml_writer() -> Result<quick_xml::Writer<Vec<u8>>, ExportError> {
    let mut writer = quick_xml::Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

impl<'a> Workbook<'a> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), self.content_types()?),
            ("_rels/.rels".to_string(), Self::package_relationships()?),
            ("xl/workbook.xml".to_string(), self.workbook()?),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                self.workbook_relationships()?,
            ),
        ];
        for (index, sheet) in self.sheets.iter().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", index + 1),
                Self::worksheet(sheet)?,
            ));
        }

        for (name, content) in parts {
            zip.start_file(name, options)?;
            zip.write_all(&content)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = new_xml_writer()?;
        writer.write_event(Event::Start(BytesStart::new("Types").with_attributes([(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )])))?;
        writer.write_event(Event::Empty(BytesStart::new("Default").with_attributes([
            ("Extension", "rels"),
            (
                "ContentType",
                "application/vnd.openxmlformats-package.relationships+xml",
            ),
        ])))?;
        writer.write_event(Event::Empty(BytesStart::new("Default").with_attributes([
            ("Extension", "xml"),
            ("ContentType", "application/xml"),
        ])))?;
        writer.write_event(Event::Empty(BytesStart::new("Override").with_attributes([
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ])))?;
        for index in 1..=self.sheets.len() {
            let part_name = format!("/xl/worksheets/sheet{index}.xml");
            writer.write_event(Event::Empty(BytesStart::new("Override").with_attributes([
                ("PartName", part_name.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                ),
            ])))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Types")))?;
        Ok(writer.into_inner())
    }

    fn package_relationships() -> Result<Vec<u8>, ExportError> {
        let mut writer = new_xml_writer()?;
        writer.write_event(Event::Start(
            BytesStart::new("Relationships").with_attributes([("xmlns", RELATIONSHIPS_NS)]),
        ))?;
        writer.write_event(Event::Empty(BytesStart::new("Relationship").with_attributes([
            ("Id", "rId1"),
            (
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            ),
            ("Target", "xl/workbook.xml"),
        ])))?;
        writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(writer.into_inner())
    }

    fn workbook(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = new_xml_writer()?;
        writer.write_event(Event::Start(BytesStart::new("workbook").with_attributes([
            ("xmlns", SPREADSHEET_NS),
            ("xmlns:r", OFFICE_RELATIONSHIPS_NS),
        ])))?;
        writer.write_event(Event::Start(BytesStart::new("sheets")))?;
        for (index, sheet) in self.sheets.iter().enumerate() {
            let sheet_id = (index + 1).to_string();
            let relationship_id = format!("rId{}", index + 1);
            writer.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
                ("name", sheet.name),
                ("sheetId", sheet_id.as_str()),
                ("r:id", relationship_id.as_str()),
            ])))?;
        }
        writer.write_event(Event::End(BytesEnd::new("sheets")))?;
        writer.write_event(Event::End(BytesEnd::new("workbook")))?;
        Ok(writer.into_inner())
    }

    fn workbook_relationships(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = new_xml_writer()?;
        writer.write_event(Event::Start(
            BytesStart::new("Relationships").with_attributes([("xmlns", RELATIONSHIPS_NS)]),
        ))?;
        for index in 1..=self.sheets.len() {
            let relationship_id = format!("rId{index}");
            let target = format!("worksheets/sheet{index}.xml");
            writer.write_event(Event::Empty(BytesStart::new("Relationship").with_attributes([
                ("Id", relationship_id.as_str()),
                (
                    "Type",
                    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
                ),
                ("Target", target.as_str()),
            ])))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
        Ok(writer.into_inner())
    }

    fn worksheet(sheet: &Sheet<'_>) -> Result<Vec<u8>, ExportError> {
        let mut writer = new_xml_writer()?;
        writer.write_event(Event::Start(
            BytesStart::new("worksheet").with_attributes([("xmlns", SPREADSHEET_NS)]),
        ))?;
        writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

        for (row_index, row) in sheet.rows.iter().enumerate() {
            let row_number = (row_index + 1).to_string();
            writer.write_event(Event::Start(
                BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
            ))?;

            for (column_index, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(column_index), row_number);
                match cell {
                    Cell::Empty => {}
                    Cell::Number(value) => {
                        writer.write_event(Event::Start(
                            BytesStart::new("c").with_attributes([("r", reference.as_str())]),
                        ))?;
                        writer.write_event(Event::Start(BytesStart::new("v")))?;
                        writer.write_event(Event::Text(BytesText::new(&value.to_string())))?;
                        writer.write_event(Event::End(BytesEnd::new("v")))?;
                        writer.write_event(Event::End(BytesEnd::new("c")))?;
                    }
                    Cell::Text(value) => {
                        writer.write_event(Event::Start(BytesStart::new("c").with_attributes([
                            ("r", reference.as_str()),
                            ("t", "inlineStr"),
                        ])))?;
                        writer.write_event(Event::Start(BytesStart::new("is")))?;
                        writer.write_event(Event::Start(
                            BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
                        ))?;
                        writer.write_event(Event::Text(BytesText::new(value)))?;
                        writer.write_event(Event::End(BytesEnd::new("t")))?;
                        writer.write_event(Event::End(BytesEnd::new("is")))?;
                        writer.write_event(Event::End(BytesEnd::new("c")))?;
                    }
                }
            }

            writer.write_event(Event::End(BytesEnd::new("row")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
        writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
        Ok(writer.into_inner())
    }
}

fn editor_row<'a>(stats: &EditorStats) -> Vec<Cell<'a>> {
    vec![
        Cell::Text(stats.name.to_string().into()),
        Cell::Number(stats.edits as f64),
        Cell::Number(stats.mean_persistency_hours),
        Cell::Number(stats.total_persistency_hours),
    ]
}

/// Build the two-sheet report workbook: "Revisions" and "Editor Summary".
pub fn report_workbook<'a>(
    context: &ExportContext<'a>,
    records: &'a [PersistencyRecord],
) -> Workbook<'a> {
    let mut revisions = Sheet::with_header("Revisions", REVISION_COLUMNS);
    revisions.rows.extend(
        records
            .iter()
            .map(|record| RevisionRow::new(context, record).cells()),
    );

    let mut editors = Sheet::with_header("Editor Summary", EDITOR_COLUMNS);
    editors
        .rows
        .extend(editor_summary(records).iter().map(editor_row));

    Workbook {
        sheets: vec![revisions, editors],
    }
}

pub fn to_xlsx(
    context: &ExportContext<'_>,
    records: &[PersistencyRecord],
) -> Result<Vec<u8>, ExportError> {
    report_workbook(context, records).to_bytes()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::{fetcher::Revision, persistency::compute_persistency_at, test_support::prelude::*};

    const CONTEXT: ExportContext<'static> = ExportContext {
        page_label: "Anne Conway (English)",
        language: "en",
    };

    fn records() -> Vec<PersistencyRecord> {
        let revisions = vec![
            Revision {
                size: Some(100),
                ..revision(1, "Fmercer", "2014-03-01T00:00:00Z")
            },
            Revision {
                size: None,
                delta: 0,
                ..revision(2, "Smith, \"Jr\" & <Co>", "2014-03-01T06:00:00Z")
            },
            Revision {
                size: Some(130),
                delta: 0,
                ..revision(3, "Fmercer", "2014-03-02T00:00:00Z")
            },
        ];
        compute_persistency_at(&revisions, utc("2014-03-02T12:00:00Z"))
    }

    fn read_part(xlsx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let csv = String::from_utf8(to_csv(&CONTEXT, &records()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], REVISION_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "Anne Conway (English),en,1,Fmercer,10,2014-03-01T00:00:00Z,100,0,21600.0,6.0,0.25"
        );
        // quoted name, missing size
        assert!(lines[2].starts_with("Anne Conway (English),en,2,\"Smith, \"\"Jr\"\" & <Co>\",20,"));
        assert!(lines[2].contains(",2014-03-01T06:00:00Z,,0,"));
    }

    #[test]
    fn csv_of_empty_records_is_header_only() {
        let csv = String::from_utf8(to_csv(&CONTEXT, &[]).unwrap()).unwrap();
        assert_eq!(csv, format!("{}\n", REVISION_COLUMNS.join(",")));
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(10), "K");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn workbook_has_revision_and_summary_sheets() {
        let records = records();
        let workbook = report_workbook(&CONTEXT, &records);

        assert_eq!(workbook.sheets.len(), 2);
        assert_eq!(workbook.sheets[0].name, "Revisions");
        assert_eq!(workbook.sheets[0].rows.len(), 4);
        assert_eq!(workbook.sheets[0].rows[2][6], Cell::Empty);

        let summary = &workbook.sheets[1];
        assert_eq!(summary.name, "Editor Summary");
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[1][0], Cell::Text("Fmercer".into()));
        assert_eq!(summary.rows[1][1], Cell::Number(2.0));
        // (6 h + 12 h) / 2
        assert_eq!(summary.rows[1][2], Cell::Number(9.0));
        assert_eq!(summary.rows[1][3], Cell::Number(18.0));
    }

    #[test]
    fn xlsx_package_is_readable() {
        let xlsx = to_xlsx(&CONTEXT, &records()).unwrap();

        let workbook = read_part(&xlsx, "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="Revisions" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"<sheet name="Editor Summary" sheetId="2" r:id="rId2"/>"#));

        let content_types = read_part(&xlsx, "[Content_Types].xml");
        assert!(content_types.contains("/xl/worksheets/sheet2.xml"));
        assert!(read_part(&xlsx, "_rels/.rels").contains("xl/workbook.xml"));
        assert!(read_part(&xlsx, "xl/_rels/workbook.xml.rels").contains("worksheets/sheet2.xml"));

        let revisions = read_part(&xlsx, "xl/worksheets/sheet1.xml");
        assert!(revisions.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">page_label</t></is></c>"#));
        assert!(revisions.contains(r#"<c r="C2"><v>1</v></c>"#));
        assert!(revisions.contains("Smith, &quot;Jr&quot; &amp; &lt;Co&gt;"));
        assert!(!revisions.contains(r#"r="G3""#));

        let editors = read_part(&xlsx, "xl/worksheets/sheet2.xml");
        assert!(editors.contains(r#"<row r="3">"#));
        assert!(editors.contains(r#"<c r="D2"><v>18</v></c>"#));
    }
}
