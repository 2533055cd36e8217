//! Streaming emphasis reformatter
//!
//! Turns raw generation fragments into styled display fragments. The `**`
//! delimiter toggles emphasis and is removed from the output; a delimiter
//! may arrive split across two fragments, so at most one trailing `*` is
//! held back until the next fragment decides it.

use futures_core::Stream;
use futures_util::StreamExt;

/// The two-character emphasis delimiter
pub const EMPHASIS_MARKER: &str = "**";

/// A display-ready piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledFragment {
    pub text: String,
    pub emphasis: bool,
}

impl StyledFragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: true,
        }
    }
}

/// Stateful parser for one streamed response.
///
/// Create one per response; the emphasis flag must never carry over into
/// an unrelated stream.
#[derive(Debug, Default)]
pub struct StreamReformatter {
    in_emphasis: bool,
    pending: String,
}

impl StreamReformatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the parser is currently inside an emphasis span
    pub fn in_emphasis(&self) -> bool {
        self.in_emphasis
    }

    /// Process one raw fragment and return whatever can be decided now
    pub fn push(&mut self, chunk: &str) -> Vec<StyledFragment> {
        self.pending.push_str(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.pending.find(EMPHASIS_MARKER) {
            let rest = self.pending.split_off(pos + EMPHASIS_MARKER.len());
            self.pending.truncate(pos);
            let before = std::mem::replace(&mut self.pending, rest);
            self.emit(before, &mut out);
            self.in_emphasis = !self.in_emphasis;
        }

        // A lone trailing '*' may be the first half of a marker.
        let keep = if self.pending.ends_with('*') { 1 } else { 0 };
        let split = self.pending.len() - keep;
        let held = self.pending.split_off(split);
        let ready = std::mem::replace(&mut self.pending, held);
        self.emit(ready, &mut out);

        out
    }

    /// Flush the held-back remainder at end of stream and reset.
    ///
    /// An unterminated emphasis span is emitted styled; the renderer closes
    /// the style after the last fragment.
    pub fn finish(&mut self) -> Option<StyledFragment> {
        let text = std::mem::take(&mut self.pending);
        let emphasis = self.in_emphasis;
        self.in_emphasis = false;

        if text.is_empty() {
            None
        } else {
            Some(StyledFragment { text, emphasis })
        }
    }

    fn emit(&self, text: String, out: &mut Vec<StyledFragment>) {
        if !text.is_empty() {
            out.push(StyledFragment {
                text,
                emphasis: self.in_emphasis,
            });
        }
    }
}

/// Reformat a whole fragment stream lazily with a fresh parser
pub fn reformat_stream<S>(fragments: S) -> impl Stream<Item = StyledFragment>
where
    S: Stream<Item = String>,
{
    async_stream::stream! {
        let mut reformatter = StreamReformatter::new();
        futures_util::pin_mut!(fragments);
        while let Some(fragment) = fragments.next().await {
            for styled in reformatter.push(&fragment) {
                yield styled;
            }
        }
        if let Some(tail) = reformatter.finish() {
            yield tail;
        }
    }
}

/// Reformat a complete text in one shot
pub fn reformat_text(text: &str) -> Vec<StyledFragment> {
    let mut reformatter = StreamReformatter::new();
    let mut out = reformatter.push(text);
    out.extend(reformatter.finish());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coalesce(fragments: impl IntoIterator<Item = StyledFragment>) -> Vec<StyledFragment> {
        let mut merged: Vec<StyledFragment> = Vec::new();
        for fragment in fragments {
            match merged.last_mut() {
                Some(last) if last.emphasis == fragment.emphasis => {
                    last.text.push_str(&fragment.text)
                }
                _ => merged.push(fragment),
            }
        }
        merged
    }

    fn plain_text(fragments: &[StyledFragment]) -> String {
        fragments.iter().map(|f| f.text.as_str()).collect()
    }

    fn feed(chunks: &[&str]) -> Vec<StyledFragment> {
        let mut reformatter = StreamReformatter::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(reformatter.push(chunk));
        }
        out.extend(reformatter.finish());
        coalesce(out)
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(feed(&["Hello world"]), vec![StyledFragment::plain("Hello world")]);
    }

    #[test]
    fn test_marker_split_across_fragments() {
        let split = feed(&["He said **bo", "ld** text"]);
        let whole = feed(&["He said **bold** text"]);

        assert_eq!(split, whole);
        assert_eq!(
            whole,
            vec![
                StyledFragment::plain("He said "),
                StyledFragment::emphasized("bold"),
                StyledFragment::plain(" text"),
            ]
        );
    }

    #[test]
    fn test_delimiter_itself_split() {
        let out = feed(&["a *", "*b*", "* c"]);
        assert_eq!(
            out,
            vec![
                StyledFragment::plain("a "),
                StyledFragment::emphasized("b"),
                StyledFragment::plain(" c"),
            ]
        );
    }

    #[test]
    fn test_every_split_offset_matches_single_shot() {
        let text = "Step **one**: weigh *costs* and **benefits** of each **option**.";
        let whole = coalesce(reformat_text(text));

        for i in 0..=text.len() {
            if !text.is_char_boundary(i) {
                continue;
            }
            let (a, b) = text.split_at(i);
            assert_eq!(feed(&[a, b]), whole, "split at {}", i);
        }

        let chars: Vec<String> = text.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(feed(&refs), whole);
    }

    #[test]
    fn test_holds_back_at_most_one_char() {
        let mut reformatter = StreamReformatter::new();
        let out = reformatter.push("wait for it *");
        assert_eq!(plain_text(&out), "wait for it ");

        let out = reformatter.push("x");
        assert_eq!(plain_text(&out), "*x");
        assert!(!reformatter.in_emphasis());
    }

    #[test]
    fn test_unterminated_span_is_emitted_styled() {
        let mut reformatter = StreamReformatter::new();
        let mut out = reformatter.push("fine **but open");
        out.extend(reformatter.finish());

        assert_eq!(
            coalesce(out),
            vec![StyledFragment::plain("fine "), StyledFragment::emphasized("but open")]
        );
        // finish() closes the span for whatever comes next
        assert!(!reformatter.in_emphasis());
    }

    #[test]
    fn test_triple_star_keeps_literal_star() {
        assert_eq!(
            feed(&["a***b"]),
            vec![StyledFragment::plain("a"), StyledFragment::emphasized("*b")]
        );
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let out = feed(&["café **crème", "** brûlée"]);
        assert_eq!(plain_text(&out), "café crème brûlée");
        assert_eq!(out[1], StyledFragment::emphasized("crème"));
    }

    #[tokio::test]
    async fn test_reformat_stream_is_lazy_and_complete() {
        let fragments = futures_util::stream::iter(vec![
            "**Key".to_string(),
            " insight*".to_string(),
            "*: done".to_string(),
        ]);
        let out: Vec<StyledFragment> = reformat_stream(fragments).collect().await;

        assert_eq!(
            coalesce(out),
            vec![StyledFragment::emphasized("Key insight"), StyledFragment::plain(": done")]
        );
    }
}
