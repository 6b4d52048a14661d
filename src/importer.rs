use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::classifier::{Classification, Classifier};
use crate::db::{insert_record, record_import, ImportEntry};
use crate::error::{MomoError, Result};
use crate::export::{extract_export_row, ExportRow};
use crate::fmt::timestamp_text;
use crate::models::{RawSms, TransactionRecord};
use crate::sink::UnprocessedSink;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(file_path: &Path) -> &str {
    file_path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Per-source tally of what happened to each input message or row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestResult {
    pub total: usize,
    pub imported: usize,
    pub dropped: usize,
    pub unrecognized: usize,
    pub malformed: usize,
    pub skipped: usize,
}

impl IngestResult {
    fn count(&mut self, outcome: &Classification) {
        match outcome {
            Classification::Record(_) => self.imported += 1,
            Classification::Dropped(_) => self.dropped += 1,
            Classification::Unrecognized => self.unrecognized += 1,
            Classification::MalformedTimestamp => self.malformed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// SMS backup archive (XML)
// ---------------------------------------------------------------------------

/// Every `<sms>` element's `body` and `date` attributes, in document order.
/// Elements missing either attribute are skipped with a warning.
pub fn parse_sms_archive(xml: &str) -> Result<(Vec<RawSms>, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut messages = Vec::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sms" => {
                let mut body = None;
                let mut date = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    let value = || {
                        attr.decode_and_unescape_value(reader.decoder())
                            .map(|v| v.into_owned())
                            .map_err(quick_xml::Error::from)
                    };
                    match attr.key.as_ref() {
                        b"body" => body = Some(value()?),
                        b"date" => date = Some(value()?),
                        _ => {}
                    }
                }
                match (body, date) {
                    (Some(body), Some(date)) => messages.push(RawSms { body, date }),
                    _ => {
                        tracing::warn!(
                            position = reader.buffer_position(),
                            "sms element without body or date, skipping"
                        );
                        skipped += 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((messages, skipped))
}

pub fn read_sms_archive(file_path: &Path) -> Result<(Vec<RawSms>, usize)> {
    let xml = std::fs::read_to_string(file_path)?;
    parse_sms_archive(&xml)
}

/// Run every message through the classifier, keeping the records in input order.
pub fn classify_messages(
    messages: &[RawSms],
    classifier: &Classifier,
    sink: &mut dyn UnprocessedSink,
) -> Result<(Vec<TransactionRecord>, IngestResult)> {
    let mut result = IngestResult {
        total: messages.len(),
        ..IngestResult::default()
    };
    let mut records = Vec::new();
    for sms in messages {
        let outcome = classifier.classify_raw(&sms.body, &sms.date, sink)?;
        result.count(&outcome);
        if let Some(record) = outcome.into_record() {
            records.push(record);
        }
    }
    Ok((records, result))
}

pub fn ingest_sms(
    conn: &Connection,
    file_path: &Path,
    classifier: &Classifier,
    sink: &mut dyn UnprocessedSink,
) -> Result<IngestResult> {
    let checksum = compute_checksum(file_path)?;
    let (messages, skipped) = read_sms_archive(file_path)?;
    let (records, mut result) = classify_messages(&messages, classifier, sink)?;
    result.skipped = skipped;
    result.total += skipped;

    let tx = conn.unchecked_transaction()?;
    for record in &records {
        insert_record(&tx, record)?;
    }
    record_import(&tx, &ImportEntry {
        filename: file_name(file_path),
        source: "sms",
        row_count: result.total,
        record_count: result.imported,
        checksum: &checksum,
    })?;
    tx.commit()?;

    tracing::info!(
        file = %file_path.display(),
        total = result.total,
        imported = result.imported,
        dropped = result.dropped,
        unrecognized = result.unrecognized,
        malformed = result.malformed,
        skipped = result.skipped,
        "processed sms archive"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

pub fn read_export<R: std::io::Read>(reader: R) -> Result<Vec<ExportRow>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<ExportRow>, _>>()?;
    Ok(rows)
}

/// Export rows to records. Rows whose timestamp cannot be read go to the sink.
pub fn classify_export_rows(
    rows: &[ExportRow],
    classifier: &Classifier,
    sink: &mut dyn UnprocessedSink,
) -> Result<(Vec<TransactionRecord>, IngestResult)> {
    let mut result = IngestResult {
        total: rows.len(),
        ..IngestResult::default()
    };
    let mut records = Vec::new();
    for row in rows {
        match extract_export_row(row, classifier.timezone()) {
            Ok(record) => {
                result.imported += 1;
                records.push(record);
            }
            Err(MomoError::MalformedTimestamp(raw)) => {
                tracing::warn!(reference = ?row.reference, date = %raw, "unreadable export timestamp");
                sink.append(&raw, &row.message)?;
                result.malformed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((records, result))
}

pub fn ingest_export(
    conn: &Connection,
    file_path: &Path,
    classifier: &Classifier,
    sink: &mut dyn UnprocessedSink,
) -> Result<IngestResult> {
    let checksum = compute_checksum(file_path)?;
    let rows = read_export(std::fs::File::open(file_path)?)?;
    let (records, result) = classify_export_rows(&rows, classifier, sink)?;

    let tx = conn.unchecked_transaction()?;
    for record in &records {
        insert_record(&tx, record)?;
    }
    record_import(&tx, &ImportEntry {
        filename: file_name(file_path),
        source: "csv",
        row_count: result.total,
        record_count: result.imported,
        checksum: &checksum,
    })?;
    tx.commit()?;

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        tracing::debug!(
            first = %timestamp_text(&first.timestamp),
            last = %timestamp_text(&last.timestamp),
            "export date span"
        );
    }
    tracing::info!(
        file = %file_path.display(),
        imported = result.imported,
        malformed = result.malformed,
        "processed csv export"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::sink::MemorySink;

    const ARCHIVE: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<smses count="5">
  <sms protocol="0" address="M-Money" date="1715351458724" type="1" body="You have received 2000 RWF from Jane Smith (*********013) on your mobile money account at 2024-05-10 16:30:51. Message from sender: . Your new balance:2000 RWF. Financial Transaction Id: 76662021700." readable_date="10 May 2024 4:30:58 PM" />
  <sms protocol="0" address="M-Money" date="1715351506754" type="1" body="Your one-time password is :834921" />
  <sms protocol="0" address="M-Money" date="1715351506755" type="1" body="Y&apos;ello, random promotion &amp; more" />
  <sms protocol="0" address="M-Money" date="yesterday" type="1" body="A reversal has been initiated for your transaction to Linda Green (250788999999) with 4,000 RWF." />
  <sms protocol="0" address="M-Money" type="1" body="no date here" />
</smses>
"#;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_parse_sms_archive_unescapes_and_skips_incomplete() {
        let (messages, skipped) = parse_sms_archive(ARCHIVE).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(skipped, 1);
        assert_eq!(messages[2].body, "Y'ello, random promotion & more");
        assert_eq!(messages[0].date, "1715351458724");
    }

    #[test]
    fn test_parse_sms_archive_rejects_broken_xml() {
        assert!(parse_sms_archive("<smses><sms body=\"x\" date=\"1\"></smses>").is_err());
    }

    #[test]
    fn test_classify_messages_tallies_outcomes() {
        let (messages, _) = parse_sms_archive(ARCHIVE).unwrap();
        let mut sink = MemorySink::new();
        let (records, result) = classify_messages(&messages, &Classifier::default(), &mut sink).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(result.imported, 1);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.unrecognized, 1);
        assert_eq!(result.malformed, 1);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.entries[0].1, "Y'ello, random promotion & more");
        assert_eq!(sink.entries[1].0, "yesterday");
    }

    #[test]
    fn test_ingest_sms_inserts_and_records_import() {
        let (dir, conn) = test_db();
        let path = dir.path().join("sms.xml");
        std::fs::write(&path, ARCHIVE).unwrap();
        let mut sink = MemorySink::new();
        let result = ingest_sms(&conn, &path, &Classifier::default(), &mut sink).unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(result.skipped, 1);
        let count: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let (source, rows): (String, i64) = conn
            .query_row("SELECT source, row_count FROM imports", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(source, "sms");
        assert_eq!(rows, 5);
    }

    #[test]
    fn test_ingest_sms_missing_file_is_fatal() {
        let (dir, conn) = test_db();
        let mut sink = MemorySink::new();
        let err = ingest_sms(&conn, &dir.path().join("absent.xml"), &Classifier::default(), &mut sink);
        assert!(err.is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_ingest_export_reads_markers() {
        let (dir, conn) = test_db();
        let path = dir.path().join("export.csv");
        std::fs::write(
            &path,
            "Reference,Timestamp,Type,Amount,Phone,Message\n\
             TX1,2024-05-10 14:30:00,Payment,2000,250788123456,Paid. Fee: RWF 100. Your new balance is RWF 8000.\n\
             TX2,garbage,Payment,10,250788123456,Broken row\n",
        )
        .unwrap();
        let mut sink = MemorySink::new();
        let result = ingest_export(&conn, &path, &Classifier::default(), &mut sink).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.malformed, 1);
        assert_eq!(sink.entries, vec![("garbage".to_string(), "Broken row".to_string())]);
        let (fee, balance, status): (f64, f64, String) = conn
            .query_row("SELECT fee, new_balance, status FROM transactions", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(fee, 100.0);
        assert_eq!(balance, 8000.0);
        assert_eq!(status, "completed");
    }

    #[test]
    fn test_ingest_export_utc_row_filters_on_local_date() {
        use crate::reports::{query_transactions, TransactionFilter};

        let (dir, conn) = test_db();
        let path = dir.path().join("export.csv");
        std::fs::write(
            &path,
            "Reference,Timestamp,Type,Amount,Phone,Message\n\
             TX9,2024-05-10T23:30:00Z,Payment,700,250788123456,Late night payment\n",
        )
        .unwrap();
        let mut sink = MemorySink::new();
        ingest_export(&conn, &path, &Classifier::default(), &mut sink).unwrap();

        let day = chrono::NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let filter = TransactionFilter {
            from: Some(day),
            to: Some(day),
            ..TransactionFilter::default()
        };
        let rows = query_transactions(&conn, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.transaction_id.as_deref(), Some("TX9"));

        let stored: String = conn
            .query_row("SELECT timestamp FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "2024-05-11T01:30:00+02:00");
    }
}
