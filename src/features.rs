use crate::sentence::Sentence;

/// A named attribute with a weight, the input unit the CRF consumes.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name, e.g. `low=berlin` or `-1:low=in`
    pub name: String,
    /// Value of the attribute
    pub value: f64,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Window feature extractor for token sequences.
///
/// Emits the classic tagging template set: surface form and lowercased form,
/// prefixes/suffixes up to `max_affix` characters, shape flags, and the
/// lowercased neighbors with BOS/EOS markers at the edges.
#[derive(Debug, Clone)]
pub struct WindowFeatures {
    max_affix: usize,
}

impl Default for WindowFeatures {
    fn default() -> Self {
        Self { max_affix: 3 }
    }
}

impl WindowFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on prefix/suffix length in characters.
    pub fn with_max_affix(mut self, max_affix: usize) -> Self {
        self.max_affix = max_affix;
        self
    }

    /// Extract one attribute list per token.
    pub fn extract(&self, sentence: &Sentence) -> Vec<Vec<Attribute>> {
        let texts: Vec<&str> = sentence.tokens().iter().map(|t| t.text()).collect();
        (0..texts.len())
            .map(|i| self.token_attributes(&texts, i))
            .collect()
    }

    fn token_attributes(&self, texts: &[&str], i: usize) -> Vec<Attribute> {
        let word = texts[i];
        let lower = word.to_lowercase();
        let chars: Vec<char> = word.chars().collect();

        let mut attributes = Vec::with_capacity(12 + 2 * self.max_affix);
        attributes.push(Attribute::new(format!("w={word}"), 1.0));
        attributes.push(Attribute::new(format!("low={lower}"), 1.0));

        for n in 1..=self.max_affix {
            if chars.len() < n {
                break;
            }
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            attributes.push(Attribute::new(format!("pre{n}={prefix}"), 1.0));
            attributes.push(Attribute::new(format!("suf{n}={suffix}"), 1.0));
        }

        if chars.iter().all(|c| c.is_uppercase()) && chars.iter().any(|c| c.is_alphabetic()) {
            attributes.push(Attribute::new("allcaps", 1.0));
        } else if chars.first().is_some_and(|c| c.is_uppercase()) {
            attributes.push(Attribute::new("cap", 1.0));
        }
        if chars.iter().all(|c| c.is_ascii_digit()) && !chars.is_empty() {
            attributes.push(Attribute::new("num", 1.0));
        } else if chars.iter().any(|c| c.is_ascii_digit()) {
            attributes.push(Attribute::new("hasnum", 1.0));
        }
        if word.contains('-') {
            attributes.push(Attribute::new("hyph", 1.0));
        }

        if i > 0 {
            let prev = texts[i - 1].to_lowercase();
            attributes.push(Attribute::new(format!("-1:low={prev}"), 1.0));
        } else {
            attributes.push(Attribute::new("BOS", 1.0));
        }
        if i + 1 < texts.len() {
            let next = texts[i + 1].to_lowercase();
            attributes.push(Attribute::new(format!("+1:low={next}"), 1.0));
        } else {
            attributes.push(Attribute::new("EOS", 1.0));
        }

        attributes
    }
}
