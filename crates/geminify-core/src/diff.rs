//! Word-level diff between the original selection and the model's rewrite,
//! rendered as markdown: insertions in bold, deletions struck through.

use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Unchanged,
    Inserted,
    Deleted,
}

impl From<ChangeTag> for SegmentKind {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Equal => SegmentKind::Unchanged,
            ChangeTag::Insert => SegmentKind::Inserted,
            ChangeTag::Delete => SegmentKind::Deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

impl DiffSegment {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Diffs two texts token by token, where a token is a word, a punctuation
/// mark or a run of whitespace (Unicode word boundaries). Adjacent changes of
/// the same kind are merged into one segment.
pub fn diff_words(reference: &str, result: &str) -> Vec<DiffSegment> {
    let diff = TextDiff::from_unicode_words(reference, result);
    let mut segments: Vec<DiffSegment> = Vec::new();

    for change in diff.iter_all_changes() {
        let kind = SegmentKind::from(change.tag());
        let value = change.value();

        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(value),
            _ => segments.push(DiffSegment {
                kind,
                text: value.to_string(),
            }),
        }
    }

    segments
}

/// Renders a segment sequence as markdown.
pub fn render_segments(segments: &[DiffSegment]) -> String {
    let mut markdown = String::new();

    for (index, segment) in segments.iter().enumerate() {
        if segment.is_blank() {
            markdown.push_str(&segment.text);
            continue;
        }

        match segment.kind {
            SegmentKind::Inserted => {
                let follows_deletion = index > 0
                    && segments[index - 1].kind == SegmentKind::Deleted
                    && !segments[index - 1].is_blank();
                // keep "~~*old*~~" and "**new**" from running together
                if follows_deletion && !markdown.ends_with(' ') && !segment.text.starts_with(' ') {
                    markdown.push(' ');
                }
                markdown.push_str("**");
                markdown.push_str(&segment.text);
                markdown.push_str("**");
            }
            SegmentKind::Deleted => {
                markdown.push_str("~~*");
                markdown.push_str(&segment.text);
                markdown.push_str("*~~");
            }
            SegmentKind::Unchanged => markdown.push_str(&segment.text),
        }
    }

    markdown
}

pub fn render_diff(reference: &str, result: &str) -> String {
    render_segments(&diff_words(reference, result))
}
