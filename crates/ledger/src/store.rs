use crate::error::{LedgerError, Result};
use crate::evidence::EvidenceSet;
use crate::record::{LedgerParseWarning, LedgerRecord, LEDGER_HEADER};
use chrono::NaiveDateTime;
use evidence_protocol::{EventKind, ParticipantId};
use fs2::FileExt;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const PHASE_DIR_NAME: &str = "phase_b";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of scanning a participant ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    pub evidence: EvidenceSet,
    pub records: usize,
    /// Timestamp of the first `phase_B_start` record
    pub started_at: Option<NaiveDateTime>,
    /// Whether a `phase_B_end` record exists
    pub ended: bool,
    pub warnings: Vec<LedgerParseWarning>,
}

/// Per-participant append-only ledgers under `<log_dir>/phase_b/<participant>.csv`.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: log_dir.as_ref().join(PHASE_DIR_NAME),
        }
    }

    #[must_use]
    pub fn path_for(&self, participant: &ParticipantId) -> PathBuf {
        self.dir.join(format!("{}.csv", participant.as_str()))
    }

    #[must_use]
    pub fn exists(&self, participant: &ParticipantId) -> bool {
        self.path_for(participant).is_file()
    }

    /// Write one record. The row (plus BOM and header for a fresh file) is rendered into a
    /// single buffer and written with one append call under an exclusive lock, so a reader
    /// never observes a partial row. A torn row left by an earlier crash is terminated first
    /// so it cannot absorb the new record.
    pub fn append_at(
        &self,
        participant: &ParticipantId,
        kind: EventKind,
        payload: &Value,
        timestamp: NaiveDateTime,
    ) -> Result<LedgerRecord> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(participant);
        let record = LedgerRecord::new(timestamp, kind, payload);

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)?;
        file.lock_exclusive()?;
        let outcome = (|| -> Result<()> {
            let fresh = file.metadata()?.len() == 0;
            let mut buf = Vec::new();
            if fresh {
                buf.extend_from_slice(UTF8_BOM);
            } else if let Some(closer) = torn_tail_closer(&mut file)? {
                log::warn!("ledger {participant}: terminating a partially written record");
                buf.extend_from_slice(closer);
            }
            {
                let mut writer = csv::Writer::from_writer(&mut buf);
                if fresh {
                    writer.write_record(LEDGER_HEADER)?;
                }
                writer.write_record([&record.timestamp, &record.event, &record.payload])?;
                writer.flush()?;
            }
            file.write_all(&buf)?;
            file.sync_data()?;
            Ok(())
        })();
        let unlocked = FileExt::unlock(&file);
        outcome?;
        unlocked?;

        log::debug!("ledger {}: {} {}", participant, record.event, record.payload);
        Ok(record)
    }

    /// All records in write order. Rows the CSV reader cannot parse are reported as
    /// warnings and skipped.
    pub fn read_records(
        &self,
        participant: &ParticipantId,
    ) -> Result<(Vec<LedgerRecord>, Vec<LedgerParseWarning>)> {
        let path = self.path_for(participant);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), Vec::new()));
            }
            Err(err) => return Err(err.into()),
        };
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body);

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let position = idx + 1;
            match row {
                Ok(row) if row.len() >= 3 => records.push(LedgerRecord {
                    timestamp: row[0].to_string(),
                    event: row[1].to_string(),
                    payload: row[2].to_string(),
                }),
                Ok(row) => warnings.push(LedgerParseWarning {
                    record: position,
                    event: row.get(1).map(str::to_string),
                    reason: format!("expected 3 fields, found {}", row.len()),
                }),
                Err(err) => warnings.push(LedgerParseWarning {
                    record: position,
                    event: None,
                    reason: err.to_string(),
                }),
            }
        }
        Ok((records, warnings))
    }

    /// Rebuild accumulated evidence from every commit record. Idempotent; the resulting
    /// set does not depend on record order.
    pub fn replay(&self, participant: &ParticipantId) -> Result<ReplayReport> {
        let (records, mut warnings) = self.read_records(participant)?;
        let mut report = ReplayReport {
            records: records.len(),
            ..Default::default()
        };

        for (idx, record) in records.iter().enumerate() {
            match record.kind() {
                Some(EventKind::PhaseStart) => {
                    if report.started_at.is_none() {
                        report.started_at = record.parsed_timestamp();
                    }
                }
                Some(EventKind::PhaseEnd) => report.ended = true,
                Some(kind) if kind.is_commit() => {
                    if let Err(reason) = collect_names(record, &mut report.evidence) {
                        warnings.push(LedgerParseWarning {
                            record: idx + 1,
                            event: Some(record.event.clone()),
                            reason,
                        });
                    }
                }
                _ => {}
            }
        }

        for warning in &warnings {
            log::warn!("ledger {participant}: skipped {warning}");
        }
        report.warnings = warnings;
        log::info!(
            "Replayed ledger for {participant}: {} records, {} evidence items",
            report.records,
            report.evidence.len()
        );
        Ok(report)
    }

    /// Copy the ledger verbatim to `dest`. Returns the number of bytes copied.
    pub fn export(&self, participant: &ParticipantId, dest: impl AsRef<Path>) -> Result<u64> {
        let path = self.path_for(participant);
        if !path.is_file() {
            return Err(LedgerError::MissingLog(path));
        }
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::copy(&path, dest)?)
    }
}

/// Bytes that end a partial last row, or `None` when the file already ends on a record
/// boundary. An odd number of quote characters means the fragment stopped inside a quoted
/// field, which must be closed before the line break.
fn torn_tail_closer(file: &mut File) -> Result<Option<&'static [u8]>> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(None);
    }

    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    let quotes = bytes.iter().filter(|&&b| b == b'"').count();
    Ok(Some(if quotes % 2 == 1 { b"\"\n" } else { b"\n" }))
}

fn collect_names(record: &LedgerRecord, evidence: &mut EvidenceSet) -> std::result::Result<(), String> {
    let payload = record.payload_json().map_err(|err| err.to_string())?;
    let Value::Array(items) = payload else {
        return Err("payload is not a list".to_string());
    };
    for item in &items {
        match item {
            Value::String(name) => {
                evidence.insert(name);
            }
            other => log::debug!("ignoring non-string evidence entry {other}"),
        }
    }
    Ok(())
}
