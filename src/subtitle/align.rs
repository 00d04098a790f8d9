use crate::config::SubtitleConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::subtitle::cue::{RawCue, SubtitleCue, finalize};
use crate::subtitle::foreign::parse_timed_captions;

/// One transcribed word with its time span in seconds.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct WordStamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordStamp {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// Where cue timing comes from.
#[derive(Clone, Copy, Debug)]
pub enum CueSource<'a> {
    /// Word-level timestamps from a transcription engine.
    FromWords(&'a [WordStamp]),
    /// Raw text spread evenly over a known duration.
    FromDuration { text: &'a str, duration_sec: f64 },
    /// Contents of a VTT (or SRT) caption file.
    FromForeignFormat(&'a str),
}

impl CueSource<'_> {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::FromWords(_) => "words",
            Self::FromDuration { .. } => "duration",
            Self::FromForeignFormat(_) => "foreign_format",
        }
    }
}

/// Builds bounded-length, non-overlapping cue sequences.
#[derive(Clone, Debug)]
pub struct SubtitleAligner {
    cfg: SubtitleConfig,
}

impl SubtitleAligner {
    pub fn new(cfg: SubtitleConfig) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SubtitleConfig {
        &self.cfg
    }

    pub fn align(&self, source: CueSource<'_>) -> ReelResult<Vec<SubtitleCue>> {
        self.build(source, None)
    }

    /// Like [`SubtitleAligner::align`], but no cue runs past `max_end_sec`.
    ///
    /// Cues starting at or after the bound are dropped and later ends are clipped to it before
    /// any re-splitting.
    pub fn align_within(
        &self,
        source: CueSource<'_>,
        max_end_sec: f64,
    ) -> ReelResult<Vec<SubtitleCue>> {
        if !max_end_sec.is_finite() || max_end_sec <= 0.0 {
            return Err(ReelError::invalid_input(format!(
                "cue bound must be finite and > 0, got {max_end_sec}"
            )));
        }
        self.build(source, Some(max_end_sec))
    }

    #[tracing::instrument(skip(self, source), fields(strategy = source.strategy_name()))]
    fn build(&self, source: CueSource<'_>, bound: Option<f64>) -> ReelResult<Vec<SubtitleCue>> {
        let mut raw = match source {
            CueSource::FromWords(words) => self.group_words(words)?,
            CueSource::FromDuration { text, duration_sec } => {
                self.spread_over_duration(text, duration_sec)?
            }
            CueSource::FromForeignFormat(content) => parse_timed_captions(content),
        };
        if let Some(limit) = bound {
            clip_to(&mut raw, limit);
        }

        let mut bounded = Vec::with_capacity(raw.len());
        for cue in raw {
            if cue.char_len() > self.cfg.max_chars {
                bounded.extend(resplit(&cue, self.cfg.max_chars, self.cfg.resplit_gap_sec));
            } else {
                bounded.push(cue);
            }
        }
        let cues = finalize(bounded);
        tracing::debug!(cues = cues.len(), "aligned subtitles");
        Ok(cues)
    }

    /// Greedy grouping: a word that would push the cue past `max_chars` opens the next cue.
    fn group_words(&self, words: &[WordStamp]) -> ReelResult<Vec<RawCue>> {
        if words.is_empty() {
            return Err(ReelError::invalid_input("no words to align"));
        }
        let max = self.cfg.max_chars;
        let mut out = Vec::new();
        let mut current: Option<RawCue> = None;

        for w in words {
            if w.word.trim().is_empty() {
                continue;
            }
            match current.as_mut() {
                Some(cue) => {
                    let joined = join_text(&cue.text, &w.word);
                    if joined.chars().count() > max {
                        if let Some(done) = current.take() {
                            out.push(done);
                        }
                        current = Some(RawCue::new(w.start, w.end, w.word.trim()));
                    } else {
                        cue.text = joined;
                        cue.end = w.end;
                    }
                }
                None => current = Some(RawCue::new(w.start, w.end, w.word.trim())),
            }
        }
        out.extend(current);
        Ok(out)
    }

    /// Equal share of `duration_sec` per sentence, each ending a small gap early.
    fn spread_over_duration(&self, text: &str, duration_sec: f64) -> ReelResult<Vec<RawCue>> {
        if !duration_sec.is_finite() || duration_sec <= 0.0 {
            return Err(ReelError::invalid_input(format!(
                "duration must be finite and > 0, got {duration_sec}"
            )));
        }
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(ReelError::invalid_input("no sentences to align"));
        }

        let share = duration_sec / sentences.len() as f64;
        let gap = self.cfg.fallback_gap_sec.min(share / 2.0);
        Ok(sentences
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let start = share * i as f64;
                RawCue::new(start, start + share - gap, s)
            })
            .collect())
    }
}

fn clip_to(raw: &mut Vec<RawCue>, limit: f64) {
    let before = raw.len();
    raw.retain(|c| c.start < limit);
    for cue in raw.iter_mut() {
        cue.end = cue.end.min(limit);
    }
    if raw.len() < before {
        tracing::debug!(
            dropped = before - raw.len(),
            limit,
            "dropped cues starting past the end of the audio"
        );
    }
}

fn is_sentence_end(ch: char) -> bool {
    matches!(
        ch,
        '。' | '！' | '？' | '!' | '?' | '；' | ';' | '…' | '\n' | '\r'
    )
}

fn is_soft_break(ch: char) -> bool {
    is_sentence_end(ch) || matches!(ch, '，' | ',' | '、' | '：' | ':' | '.' | ' ')
}

/// Split on sentence-final punctuation and line breaks, dropping the delimiters and empties.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(is_sentence_end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concatenate caption fragments, inserting a space only between two alphanumeric ASCII runs.
pub(crate) fn join_text(left: &str, right: &str) -> String {
    let left_trim = left.trim_end();
    let right_trim = right.trim_start();
    let needs_space = matches!(
        (left_trim.chars().last(), right_trim.chars().next()),
        (Some(a), Some(b)) if a.is_ascii_alphanumeric() && b.is_ascii_alphanumeric()
    );
    let mut out = String::with_capacity(left_trim.len() + right_trim.len() + 1);
    out.push_str(left_trim);
    if needs_space {
        out.push(' ');
    }
    out.push_str(right_trim.trim_end());
    out
}

/// Break text into segments of at most `max_chars`, preferring punctuation once a segment is at
/// least half full.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut len = 0usize;
    for ch in text.chars() {
        if len == 0 && ch.is_whitespace() {
            continue;
        }
        current.push(ch);
        len += 1;
        if (is_soft_break(ch) && len * 2 >= max_chars) || len >= max_chars {
            push_segment(&mut out, &mut current);
            len = 0;
        }
    }
    push_segment(&mut out, &mut current);
    out
}

fn push_segment(out: &mut Vec<String>, current: &mut String) {
    let seg = current.trim();
    if !seg.is_empty() {
        out.push(seg.to_string());
    }
    current.clear();
}

/// Split an over-long cue and give each piece an equal share of its time span.
///
/// Every piece ends `gap_sec` (at most half a share) before its share does, the last one
/// included.
pub(crate) fn resplit(cue: &RawCue, max_chars: usize, gap_sec: f64) -> Vec<RawCue> {
    let segments = split_text(&cue.text, max_chars);
    if segments.len() <= 1 {
        return segments
            .into_iter()
            .map(|s| RawCue::new(cue.start, cue.end, s))
            .collect();
    }

    let n = segments.len();
    let share = (cue.end - cue.start) / n as f64;
    let gap = gap_sec.min(share / 2.0);
    segments
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let start = cue.start + share * i as f64;
            RawCue::new(start, start + share - gap, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::cue::check_invariants;

    fn aligner(max_chars: usize) -> SubtitleAligner {
        SubtitleAligner::new(SubtitleConfig {
            max_chars,
            ..SubtitleConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn words_group_until_threshold() {
        let words = vec![
            WordStamp::new("大家", 0.0, 0.4),
            WordStamp::new("好", 0.4, 0.6),
            WordStamp::new("今天", 0.7, 1.0),
            WordStamp::new("分享", 1.0, 1.4),
            WordStamp::new("一个", 1.5, 1.8),
            WordStamp::new("故事", 1.8, 2.3),
        ];
        let cues = aligner(4).align(CueSource::FromWords(&words)).unwrap();
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["大家好", "今天分享", "一个故事"]);
        assert_eq!((cues[0].start, cues[0].end), (0.0, 0.6));
        assert_eq!((cues[1].start, cues[1].end), (0.7, 1.4));
        assert_eq!((cues[2].start, cues[2].end), (1.5, 2.3));
        check_invariants(&cues, 4).unwrap();
    }

    #[test]
    fn words_keep_spaces_between_latin_words() {
        let words = vec![
            WordStamp::new(" Hello", 0.0, 0.3),
            WordStamp::new(" world", 0.3, 0.6),
            WordStamp::new("!", 0.6, 0.7),
        ];
        let cues = aligner(20).align(CueSource::FromWords(&words)).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Hello world!");
    }

    #[test]
    fn single_oversized_word_is_force_split() {
        let words = vec![WordStamp::new("abcdefghij", 0.0, 1.0)];
        let cues = aligner(4).align(CueSource::FromWords(&words)).unwrap();
        assert!(cues.len() >= 3);
        check_invariants(&cues, 4).unwrap();
        assert!(cues.last().unwrap().end < 1.0);
    }

    #[test]
    fn empty_word_list_is_invalid_input() {
        assert!(matches!(
            aligner(10).align(CueSource::FromWords(&[])),
            Err(ReelError::InvalidInput(_))
        ));
    }

    #[test]
    fn duration_fallback_gives_equal_shares() {
        let text = "第一句话。第二句话！第三句话？\n第四句话";
        let cues = aligner(15)
            .align(CueSource::FromDuration {
                text,
                duration_sec: 12.4,
            })
            .unwrap();
        assert_eq!(cues.len(), 4);
        let share = 12.4 / 4.0;
        for (i, cue) in cues.iter().enumerate() {
            assert!((cue.start - share * i as f64).abs() < 1e-9);
            assert!((cue.end - (cue.start + share - 0.1)).abs() < 1e-9);
        }
        assert!(cues.last().unwrap().end <= 12.4);
        assert_eq!(cues[0].text, "第一句话");
        check_invariants(&cues, 15).unwrap();
    }

    #[test]
    fn duration_fallback_rejects_bad_input() {
        let a = aligner(15);
        assert!(
            a.align(CueSource::FromDuration {
                text: "。！？",
                duration_sec: 3.0
            })
            .is_err()
        );
        assert!(
            a.align(CueSource::FromDuration {
                text: "有内容",
                duration_sec: 0.0
            })
            .is_err()
        );
    }

    #[test]
    fn duration_fallback_bounds_long_sentences() {
        let text = "这是一个非常非常长的句子，里面有逗号，还有更多更多的文字内容需要切分";
        let cues = aligner(10)
            .align(CueSource::FromDuration {
                text,
                duration_sec: 6.0,
            })
            .unwrap();
        assert!(cues.len() > 1);
        check_invariants(&cues, 10).unwrap();
        assert!(cues.last().unwrap().end <= 6.0);
    }

    #[test]
    fn split_text_prefers_punctuation_after_half() {
        // Comma at position 3 is before half of 10, comma at 6 is after.
        let segs = split_text("一二，四五六，八九十一二三", 10);
        assert_eq!(segs, ["一二，四五六，", "八九十一二三"]);
        let forced = split_text("一二三四五六七八九十一二", 5);
        assert_eq!(forced, ["一二三四五", "六七八九十", "一二"]);
    }

    #[test]
    fn resplit_gives_equal_shares_each_ending_a_gap_early() {
        const EPS: f64 = 1e-9;
        let cue = RawCue::new(10.0, 16.0, "一二三四五六七八九十一二三四五六七八");
        let gap = 0.05;
        let parts = resplit(&cue, 6, gap);
        assert_eq!(parts.len(), 3);

        let share = (cue.end - cue.start) / 3.0;
        for (i, part) in parts.iter().enumerate() {
            let nominal_start = cue.start + share * i as f64;
            assert!((part.start - nominal_start).abs() < EPS);
            assert!((part.end - part.start - (share - gap)).abs() < EPS);
        }
        let nominal: f64 = parts
            .windows(2)
            .map(|w| w[1].start - w[0].start)
            .sum::<f64>()
            + share;
        assert!((nominal - 6.0).abs() < EPS);
        let durations: f64 = parts.iter().map(|p| p.end - p.start).sum();
        assert!((durations - (6.0 - 3.0 * gap)).abs() < EPS);
        assert!(parts.last().unwrap().end < cue.end);
    }

    #[test]
    fn resplit_gap_is_capped_at_half_a_share() {
        let cue = RawCue::new(0.0, 0.2, "一二三四");
        let parts = resplit(&cue, 2, 1.0);
        assert_eq!(parts.len(), 2);
        assert!((parts[0].end - 0.05).abs() < 1e-9);
        assert!((parts[1].end - 0.15).abs() < 1e-9);
    }

    #[test]
    fn foreign_cues_are_clipped_to_the_audio_length() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:06.000\n正文第一行\n\n00:00:06.000 --> 00:00:13.500\n正文第二行\n\n00:00:12.600 --> 00:00:14.000\n多余\n";
        let cues = aligner(15)
            .align_within(CueSource::FromForeignFormat(vtt), 12.4)
            .unwrap();
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["正文第一行", "正文第二行"]);
        assert_eq!(cues[1].end, 12.4);
        check_invariants(&cues, 15).unwrap();

        let unbounded = aligner(15)
            .align(CueSource::FromForeignFormat(vtt))
            .unwrap();
        assert_eq!(unbounded.last().unwrap().end, 14.0);
    }

    #[test]
    fn clipped_long_cue_is_resplit_inside_the_bound() {
        let vtt = "00:00:00.000 --> 00:00:10.000\n一二三四五六七八九十一二\n";
        let cues = aligner(6)
            .align_within(CueSource::FromForeignFormat(vtt), 4.0)
            .unwrap();
        assert_eq!(cues.len(), 2);
        assert!(cues.iter().all(|c| c.end <= 4.0));
        assert!(
            aligner(6)
                .align_within(CueSource::FromForeignFormat(vtt), 0.0)
                .is_err()
        );
    }

    #[test]
    fn split_sentences_drops_delimiters_and_empties() {
        assert_eq!(
            split_sentences("你好。。世界！\n\nok?"),
            ["你好", "世界", "ok"]
        );
    }

    #[test]
    fn join_text_spacing() {
        assert_eq!(join_text("中文", "字"), "中文字");
        assert_eq!(join_text("hello", " world"), "hello world");
        assert_eq!(join_text("hello", ","), "hello,");
        assert_eq!(join_text("a,", "b"), "a,b");
    }
}
