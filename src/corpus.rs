use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bstr::io::BufReadExt;
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sentence::{Sentence, Token};

/// Column-to-field mapping for delimited corpus files, e.g.
/// `{0 -> text, 1 -> ner}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMap {
    columns: BTreeMap<usize, String>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion: `ColumnMap::new().set(0, "text").set(1, "ner")`.
    pub fn set(mut self, index: usize, field: impl Into<String>) -> Self {
        self.columns.insert(index, field.into());
        self
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (usize, S)>) -> Self {
        Self {
            columns: pairs.into_iter().map(|(i, f)| (i, f.into())).collect(),
        }
    }

    /// Index of the column mapped to the `text` field.
    pub fn text_column(&self) -> Option<usize> {
        self.column_of("text")
    }

    pub fn column_of(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, name)| name.as_str() == field)
            .map(|(&index, _)| index)
    }

    pub fn fields(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns.iter().map(|(&i, f)| (i, f.as_str()))
    }
}

/// Labeled corpus partitioned into train/dev/test, the train split being the
/// seed set an active learner starts from.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub train: Vec<Sentence>,
    pub dev: Vec<Sentence>,
    pub test: Vec<Sentence>,
}

impl Corpus {
    /// Load a corpus from column-formatted files. `dev` and `test` are
    /// optional; the corresponding splits stay empty when absent.
    pub fn from_column_files(
        columns: &ColumnMap,
        tag_type: &str,
        train: impl AsRef<Path>,
        dev: Option<&Path>,
        test: Option<&Path>,
    ) -> Result<Self> {
        let train = read_column_sentences(train.as_ref(), columns, tag_type)?;
        let dev = match dev {
            Some(path) => read_column_sentences(path, columns, tag_type)?,
            None => Vec::new(),
        };
        let test = match test {
            Some(path) => read_column_sentences(path, columns, tag_type)?,
            None => Vec::new(),
        };
        Ok(Self { train, dev, test })
    }
}

/// The unlabeled (or simulation-labeled) sentences available for query.
///
/// Querying removes the selected sentences; everything else stays pooled.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    sentences: Vec<Sentence>,
}

impl Pool {
    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    /// Load a pool from a column-formatted file. Label columns are kept, so
    /// a held-out labeled file can act as a simulated annotator.
    pub fn from_column_file(
        path: impl AsRef<Path>,
        columns: &ColumnMap,
        tag_type: &str,
    ) -> Result<Self> {
        Ok(Self {
            sentences: read_column_sentences(path.as_ref(), columns, tag_type)?,
        })
    }

    /// Load a pool from plain text: one pre-tokenized sentence per line,
    /// tokens separated by whitespace, no label columns. The entry point for
    /// non-spaced languages tokenized upstream.
    pub fn from_plain_text(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = open(path)?;
        let mut sentences = Vec::new();
        for line in reader.byte_lines() {
            let line = line.map_err(|source| Error::Read {
                path: path.display().to_string(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let tokens: Vec<Token> = trimmed
                .fields()
                .map(|field| Token::new(field.to_str_lossy().into_owned()))
                .collect();
            sentences.push(Sentence::new(tokens));
        }
        Ok(Self { sentences })
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentences_mut(&mut self) -> &mut [Sentence] {
        &mut self.sentences
    }

    /// Remove the sentences at `indices` and return them in the given order;
    /// the remainder keeps its relative order. Out-of-range or duplicate
    /// indices are ignored.
    pub fn take(&mut self, indices: &[usize]) -> Vec<Sentence> {
        let mut slots: Vec<Option<Sentence>> = self.sentences.drain(..).map(Some).collect();
        let selected: Vec<Sentence> = indices
            .iter()
            .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
            .collect();
        self.sentences = slots.into_iter().flatten().collect();
        selected
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Read blank-line-separated token groups from a column-formatted file.
///
/// One token per line, columns split on ASCII whitespace, `-DOCSTART-`
/// document markers skipped. Surface forms are decoded lossily, so stray
/// non-UTF-8 bytes in real-world corpora do not abort the load.
fn read_column_sentences(
    path: &Path,
    columns: &ColumnMap,
    tag_type: &str,
) -> Result<Vec<Sentence>> {
    let text_column = columns
        .text_column()
        .ok_or_else(|| Error::InvalidParameter {
            param: "columns",
            message: "column map has no `text` field".to_string(),
        })?;
    let tag_column = columns
        .column_of(tag_type)
        .ok_or_else(|| Error::InvalidParameter {
            param: "tag_type",
            message: format!("column map has no `{tag_type}` field"),
        })?;

    let reader = open(path)?;
    let mut sentences = Vec::new();
    let mut tokens: Vec<Token> = Vec::new();

    let mut flush = |tokens: &mut Vec<Token>, sentences: &mut Vec<Sentence>| {
        if !tokens.is_empty() {
            sentences.push(Sentence::new(std::mem::take(tokens)));
        }
    };

    for (line_index, line) in reader.byte_lines().enumerate() {
        let line = line.map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut tokens, &mut sentences);
            continue;
        }
        if trimmed.starts_with(b"-DOCSTART-") {
            flush(&mut tokens, &mut sentences);
            continue;
        }

        let fields: Vec<&[u8]> = trimmed.fields().collect();
        let text = fields
            .get(text_column)
            .ok_or_else(|| Error::CorpusFormat {
                path: path.display().to_string(),
                line: line_index + 1,
                message: format!("missing text column {text_column}"),
            })?;
        let label = fields.get(tag_column).ok_or_else(|| Error::CorpusFormat {
            path: path.display().to_string(),
            line: line_index + 1,
            message: format!("missing `{tag_type}` column {tag_column}"),
        })?;
        tokens.push(Token::with_gold(
            text.to_str_lossy().into_owned(),
            label.to_str_lossy().into_owned(),
        ));
    }
    flush(&mut tokens, &mut sentences);
    Ok(sentences)
}
