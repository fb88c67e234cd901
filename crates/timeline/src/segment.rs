//! Paragraph segmentation and lecture text metrics.

use lectern_lecture_model::lecture::{LectureContent, SectionKey};

/// Sentences grouped into one paragraph when text has no line breaks.
const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Split section text into paragraphs.
///
/// Text with line breaks is split on blank-line boundaries and then on the
/// remaining single line breaks. Text without any line break is split after
/// sentence-ending punctuation (`.`, `!`, `?`) followed by whitespace, and the
/// sentences are merged three at a time. Paragraphs are trimmed and never
/// empty.
pub fn segment(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.contains('\n') {
        return normalized
            .split("\n\n")
            .flat_map(|chunk| chunk.split('\n'))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }

    split_sentences(&normalized)
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|group| group.join(" ").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split after `.`/`!`/`?` wherever whitespace follows; the whitespace run is
/// dropped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let mut resume = end;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            resume = j + w.len_utf8();
            chars.next();
        }
        if resume > end {
            sentences.push(&text[start..end]);
            start = resume;
        }
    }
    sentences.push(&text[start..]);
    sentences
}

/// Segmented lecture text, computed once per lecture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphIndex {
    sections: [Vec<String>; 3],
    paragraph_words: [Vec<usize>; 3],
    total_chars: usize,
}

impl ParagraphIndex {
    pub fn build(lecture: &LectureContent) -> Self {
        let mut index = Self::default();
        for section in SectionKey::ALL {
            let paragraphs = segment(lecture.section_text(section));
            index.total_chars += paragraphs.iter().map(|p| p.chars().count()).sum::<usize>();
            index.paragraph_words[section.ordinal()] = paragraphs
                .iter()
                .map(|p| p.split_whitespace().count())
                .collect();
            index.sections[section.ordinal()] = paragraphs;
        }
        index
    }

    pub fn paragraphs(&self, section: SectionKey) -> &[String] {
        &self.sections[section.ordinal()]
    }

    pub fn paragraph(&self, section: SectionKey, paragraph_index: usize) -> Option<&str> {
        self.paragraphs(section)
            .get(paragraph_index)
            .map(String::as_str)
    }

    /// Characters across every paragraph of every section.
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Words in a section (its paragraphs joined by spaces).
    pub fn section_word_count(&self, section: SectionKey) -> usize {
        self.paragraph_words[section.ordinal()].iter().sum()
    }

    pub fn total_words(&self) -> usize {
        SectionKey::ALL
            .iter()
            .map(|section| self.section_word_count(*section))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Vec::is_empty)
    }

    /// The first paragraph of the lecture, skipping empty sections.
    pub fn first_position(&self) -> Option<(SectionKey, usize)> {
        SectionKey::ALL
            .into_iter()
            .find(|section| !self.paragraphs(*section).is_empty())
            .map(|section| (section, 0))
    }

    /// The paragraph after `(section, paragraph_index)`: the next one in the
    /// section, else the first paragraph of the next non-empty section.
    pub fn next_position(
        &self,
        section: SectionKey,
        paragraph_index: usize,
    ) -> Option<(SectionKey, usize)> {
        if paragraph_index + 1 < self.paragraphs(section).len() {
            return Some((section, paragraph_index + 1));
        }
        let mut next = section.next();
        while let Some(candidate) = next {
            if !self.paragraphs(candidate).is_empty() {
                return Some((candidate, 0));
            }
            next = candidate.next();
        }
        None
    }

    /// The paragraph containing the word at a cumulative offset across the
    /// whole lecture. Offsets past the end map to the last paragraph.
    pub fn locate_word(&self, word_offset: usize) -> Option<(SectionKey, usize)> {
        let mut seen = 0;
        let mut last = None;
        for section in SectionKey::ALL {
            for (i, words) in self.paragraph_words[section.ordinal()].iter().enumerate() {
                seen += words;
                last = Some((section, i));
                if word_offset < seen {
                    return last;
                }
            }
        }
        last
    }
}
