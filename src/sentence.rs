use serde::{Deserialize, Serialize};

/// A single token: surface form plus an optional gold label and an optional
/// predicted label for the corpus tag type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    text: String,
    gold_label: Option<String>,
    predicted_label: Option<String>,
    /// Embedding vector, filled in by an [`Embeddings`](crate::Embeddings)
    /// implementation. Not part of the serialized form.
    #[serde(skip)]
    vector: Option<Vec<f64>>,
}

impl Token {
    /// Create an unlabeled token.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            gold_label: None,
            predicted_label: None,
            vector: None,
        }
    }

    /// Create a token carrying a gold label.
    pub fn with_gold(text: impl Into<String>, label: impl Into<String>) -> Self {
        let mut token = Self::new(text);
        token.gold_label = Some(label.into());
        token
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn gold_label(&self) -> Option<&str> {
        self.gold_label.as_deref()
    }

    pub fn set_gold_label(&mut self, label: impl Into<String>) {
        self.gold_label = Some(label.into());
    }

    pub fn predicted_label(&self) -> Option<&str> {
        self.predicted_label.as_deref()
    }

    pub fn set_predicted_label(&mut self, label: impl Into<String>) {
        self.predicted_label = Some(label.into());
    }

    pub fn vector(&self) -> Option<&[f64]> {
        self.vector.as_deref()
    }

    pub fn set_vector(&mut self, vector: Vec<f64>) {
        self.vector = Some(vector);
    }
}

/// A contiguous labeled span decoded from a token label sequence.
///
/// `start` is inclusive, `end` exclusive, both token indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// An ordered sequence of tokens.
///
/// Token text is fixed after loading; labels change through annotation or
/// prediction. Once a tagger has scored the sentence, the log-probability of
/// its Viterbi labeling is cached here for the uncertainty samplers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sentence {
    tokens: Vec<Token>,
    #[serde(skip)]
    log_probability: Option<f64>,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            log_probability: None,
        }
    }

    /// Build an unlabeled sentence from pre-tokenized text.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::new(texts.iter().map(|t| Token::new(t.as_ref())).collect())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `true` when every token carries a gold label.
    pub fn is_labeled(&self) -> bool {
        !self.tokens.is_empty() && self.tokens.iter().all(|t| t.gold_label().is_some())
    }

    /// Log-probability `log P(y* | x)` of the current predicted labeling.
    pub fn log_probability(&self) -> Option<f64> {
        self.log_probability
    }

    /// Install predicted labels and the labeling's log-probability.
    pub fn set_predictions(&mut self, labels: Vec<String>, log_probability: f64) {
        for (token, label) in self.tokens.iter_mut().zip(labels) {
            token.set_predicted_label(label);
        }
        self.log_probability = Some(log_probability);
    }

    /// Drop predicted labels and the cached score.
    pub fn clear_predictions(&mut self) {
        for token in &mut self.tokens {
            token.predicted_label = None;
        }
        self.log_probability = None;
    }

    /// Promote predicted labels to gold labels, if any.
    pub fn adopt_predictions(&mut self) {
        for token in &mut self.tokens {
            if let Some(label) = token.predicted_label.clone() {
                token.gold_label = Some(label);
            }
        }
    }

    pub fn gold_spans(&self) -> Vec<LabeledSpan> {
        decode_spans(self.tokens.iter().map(|t| t.gold_label()))
    }

    pub fn predicted_spans(&self) -> Vec<LabeledSpan> {
        decode_spans(self.tokens.iter().map(|t| t.predicted_label()))
    }

    /// Space-joined surface form, for display.
    pub fn text(&self) -> String {
        let texts: Vec<&str> = self.tokens.iter().map(|t| t.text()).collect();
        texts.join(" ")
    }
}

/// Decode a BIO-tagged label sequence into spans.
///
/// `B-X` opens a span, `I-X` extends a span of the same type (or opens one
/// when nothing matching is open), `O` and missing labels close. Labels
/// without a scheme prefix merge contiguous identical runs.
fn decode_spans<'a, I>(labels: I) -> Vec<LabeledSpan>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut spans = Vec::new();
    let mut open: Option<(usize, String)> = None;
    let mut index = 0;

    for label in labels {
        let label = label.unwrap_or("O");
        if label == "O" || label.is_empty() {
            close_span(&mut open, index, &mut spans);
        } else if let Some(kind) = label.strip_prefix("B-") {
            close_span(&mut open, index, &mut spans);
            open = Some((index, kind.to_string()));
        } else if let Some(kind) = label.strip_prefix("I-") {
            let continues = matches!(&open, Some((_, current)) if current == kind);
            if !continues {
                close_span(&mut open, index, &mut spans);
                open = Some((index, kind.to_string()));
            }
        } else {
            let continues = matches!(&open, Some((_, current)) if current == label);
            if !continues {
                close_span(&mut open, index, &mut spans);
                open = Some((index, label.to_string()));
            }
        }
        index += 1;
    }
    close_span(&mut open, index, &mut spans);
    spans
}

fn close_span(open: &mut Option<(usize, String)>, end: usize, spans: &mut Vec<LabeledSpan>) {
    if let Some((start, label)) = open.take() {
        spans.push(LabeledSpan { start, end, label });
    }
}
