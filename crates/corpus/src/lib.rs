//! # Evidence Corpus
//!
//! Loads the filename/label dataset the participant searches.
//!
//! ```text
//! dataset.csv (bytes)
//!     │
//!     ├──> Encoding fallback (utf-8 → utf-8-sig → cp949 → euc-kr → latin1)
//!     │
//!     ├──> Header normalization (BOM stripped, trimmed, case-folded)
//!     │
//!     └──> CorpusEntry[] { filename, label }
//! ```
//!
//! The corpus is immutable after load; share it behind an `Arc`.

mod encoding;
mod error;
mod store;

pub use encoding::{decode_with_fallback, TextEncoding};
pub use error::{CorpusError, Result};
pub use store::{Corpus, CorpusOptions, FILENAME_COLUMN, LABEL_COLUMN};
