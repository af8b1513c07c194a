use crate::encoding::{decode_with_fallback, TextEncoding};
use crate::error::{CorpusError, Result};
use evidence_protocol::CorpusEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const FILENAME_COLUMN: &str = "filename";
pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusOptions {
    /// Single-byte field delimiter
    pub delimiter: char,

    /// Encodings tried in order until one decodes the whole file
    pub encodings: Vec<TextEncoding>,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            encodings: TextEncoding::DEFAULT_CANDIDATES.to_vec(),
        }
    }
}

impl CorpusOptions {
    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                CorpusError::invalid_options(format!(
                    "delimiter {:?} is not a single ASCII byte",
                    self.delimiter
                ))
            })
    }
}

/// Read-only filename corpus. Load once and share for the process lifetime.
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    encoding: TextEncoding,
    fingerprint: String,
    source: Option<PathBuf>,
}

impl Corpus {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &CorpusOptions::default()).await
    }

    pub async fn load_with(path: impl AsRef<Path>, options: &CorpusOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CorpusError::DataUnavailable(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut corpus = Self::from_bytes(&bytes, options).map_err(|err| match err {
            CorpusError::Encoding { tried, .. } => CorpusError::Encoding {
                path: path.to_path_buf(),
                tried,
            },
            other => other,
        })?;
        corpus.source = Some(path.to_path_buf());
        log::info!(
            "Loaded corpus {} ({} rows, encoding {})",
            path.display(),
            corpus.len(),
            corpus.encoding
        );
        Ok(corpus)
    }

    /// Parse raw file content. Pure function of `bytes` and `options`.
    pub fn from_bytes(bytes: &[u8], options: &CorpusOptions) -> Result<Self> {
        let delimiter = options.delimiter_byte()?;
        let Some((encoding, text)) = decode_with_fallback(bytes, &options.encodings) else {
            let tried = options
                .encodings
                .iter()
                .map(|enc| enc.label())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CorpusError::Encoding {
                path: PathBuf::new(),
                tried,
            });
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        let Some(filename_idx) = headers.iter().position(|h| h == FILENAME_COLUMN) else {
            return Err(CorpusError::Schema { headers });
        };
        let label_idx = headers.iter().position(|h| h == LABEL_COLUMN);
        if label_idx.is_none() {
            log::debug!("corpus has no '{LABEL_COLUMN}' column, using empty labels");
        }

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let filename = record.get(filename_idx).unwrap_or_default();
            let label = label_idx
                .and_then(|idx| record.get(idx))
                .unwrap_or_default();
            entries.push(CorpusEntry::new(filename, label));
        }

        Ok(Self {
            entries,
            encoding,
            fingerprint: fingerprint(bytes),
            source: None,
        })
    }

    /// Build an in-memory corpus (UTF-8, fingerprinted over the filenames and labels).
    #[must_use]
    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        let mut hasher = Sha256::new();
        for entry in &entries {
            hasher.update(entry.filename.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(entry.label.as_bytes());
            hasher.update(b"\x1e");
        }
        Self {
            entries,
            encoding: TextEncoding::Utf8,
            fingerprint: hex(&hasher.finalize()),
            source: None,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Content hash; changes whenever the corpus content changes.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn normalize_header(raw: &str) -> String {
    raw.replace('\u{feff}', "").trim().to_lowercase()
}

fn fingerprint(bytes: &[u8]) -> String {
    hex(&Sha256::digest(bytes))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
