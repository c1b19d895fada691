//! Break point separators for chunking, in priority order

/// Separators the chunker may break on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Separator {
    /// Hard cut between characters (lowest)
    Char = 0,
    /// Word boundary
    Word = 1,
    /// Clause boundary
    Clause = 2,
    /// Sentence boundary
    Sentence = 3,
    /// Line break
    Line = 4,
    /// Paragraph break
    Paragraph = 5,
    /// Major section break (highest)
    MultiParagraph = 6,
}

impl Separator {
    /// All separators, most preferred first
    pub const PRIORITY: [Separator; 7] = [
        Separator::MultiParagraph,
        Separator::Paragraph,
        Separator::Line,
        Separator::Sentence,
        Separator::Clause,
        Separator::Word,
        Separator::Char,
    ];

    /// The literal text of this separator, `None` for a hard cut
    pub fn pattern(self) -> Option<&'static str> {
        match self {
            Separator::MultiParagraph => Some("\n\n\n"),
            Separator::Paragraph => Some("\n\n"),
            Separator::Line => Some("\n"),
            Separator::Sentence => Some(". "),
            Separator::Clause => Some(", "),
            Separator::Word => Some(" "),
            Separator::Char => None,
        }
    }

    pub fn occurs_in(self, text: &str) -> bool {
        self.pattern().map_or(true, |p| text.contains(p))
    }

    /// Split `text` so every occurrence of the separator starts a new piece.
    ///
    /// Separators stay attached to the following piece, so concatenating the
    /// pieces reproduces the input exactly.
    pub fn split_keeping<'a>(self, text: &'a str) -> Vec<&'a str> {
        let Some(pattern) = self.pattern() else {
            return text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect();
        };

        let mut pieces = Vec::new();
        let mut start = 0;
        for (i, _) in text.match_indices(pattern) {
            if i > start {
                pieces.push(&text[start..i]);
            }
            start = i;
        }
        if start < text.len() {
            pieces.push(&text[start..]);
        }
        pieces
    }
}
