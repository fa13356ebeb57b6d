/// Cleans user-submitted chat text before it reaches a session.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    max_message_length: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            max_message_length: 8_000,
        }
    }
}

impl Sanitizer {
    pub fn new(max_message_length: usize) -> Self {
        Self { max_message_length }
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Strip control characters (newlines and tabs survive), then reject
    /// blank or over-length text. Length is counted in characters.
    pub fn sanitize(&self, input: &str) -> SanitizeResult {
        let cleaned: String = input
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect();

        if cleaned.trim().is_empty() {
            return SanitizeResult::Rejected(Rejection::Empty);
        }

        let len = cleaned.chars().count();
        if len > self.max_message_length {
            return SanitizeResult::Rejected(Rejection::TooLong {
                len,
                max: self.max_message_length,
            });
        }

        if cleaned != input {
            SanitizeResult::Cleaned(cleaned)
        } else {
            SanitizeResult::Clean(cleaned)
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum SanitizeResult {
    /// Input was already clean.
    Clean(String),
    /// Control characters were removed.
    Cleaned(String),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after stripping control characters and whitespace.
    Empty,
    TooLong { len: usize, max: usize },
}

impl SanitizeResult {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SanitizeResult::Rejected(_))
    }

    pub fn into_result(self) -> Result<String, Rejection> {
        match self {
            SanitizeResult::Clean(s) | SanitizeResult::Cleaned(s) => Ok(s),
            SanitizeResult::Rejected(r) => Err(r),
        }
    }
}
