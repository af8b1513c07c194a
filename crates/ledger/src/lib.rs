//! # Evidence Ledger
//!
//! Append-only, per-participant event log. It is the only durable record of a session
//! and the source of truth for committed evidence.
//!
//! ```text
//! logs/phase_b/<participant>.csv   (UTF-8 with BOM)
//!     timestamp,event,payload
//!     2025-03-04T09:00:00,phase_B_start,Phase B started: 10 minutes
//!     2025-03-04T09:03:12,evidence_mark,"[""land_policy_report.docx""]"
//! ```
//!
//! [`LedgerStore::replay`] rebuilds the [`EvidenceSet`] from the `evidence_mark` and
//! `evidence_mark_on_timeout` records after a crash or reload.

mod error;
mod evidence;
mod record;
mod store;

pub use error::{LedgerError, Result};
pub use evidence::EvidenceSet;
pub use record::{
    encode_payload, format_timestamp, LedgerParseWarning, LedgerRecord, LEDGER_HEADER,
    TIMESTAMP_FORMAT,
};
pub use store::{LedgerStore, ReplayReport, PHASE_DIR_NAME};
