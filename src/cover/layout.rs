use crate::config::CoverConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::TextBlock;

/// Pixel extent of a single shaped line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Measures unwrapped text at a given pixel size.
pub trait TextMeasure {
    fn measure(&mut self, text: &str, size_px: f32) -> ReelResult<TextExtent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontTier {
    Title,
    Body,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaidLine {
    pub text: String,
    pub tier: FontTier,
    pub extent: TextExtent,
}

/// Font sizes for one fitting attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeSet {
    pub title: u32,
    pub body: u32,
    pub spacing: u32,
    pub gap: u32,
}

impl SizeSet {
    fn initial(cfg: &CoverConfig) -> Self {
        Self {
            title: cfg.title_size,
            body: cfg.body_size,
            spacing: cfg.spacing,
            gap: cfg.title_body_gap,
        }
    }

    fn shrunk(self, cfg: &CoverConfig) -> Self {
        let title = self.title.saturating_sub(cfg.shrink_step).max(1);
        let scaled = |r: f32| ((title as f32) * r) as u32;
        Self {
            title,
            body: scaled(cfg.body_ratio).max(1),
            spacing: scaled(cfg.spacing_ratio),
            gap: scaled(cfg.gap_ratio),
        }
    }

    pub fn size_px(&self, tier: FontTier) -> f32 {
        match tier {
            FontTier::Title => self.title as f32,
            FontTier::Body => self.body as f32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResult {
    pub lines: Vec<LaidLine>,
    pub sizes: SizeSet,
    pub total_height: f32,
    /// Number of size sets tried, including the returned one.
    pub attempts: u32,
    /// `false` when the floor was reached and the text still overflows.
    pub fits: bool,
}

impl LayoutResult {
    pub fn overflow_error(&self, max_height: f32) -> Option<ReelError> {
        if self.fits {
            return None;
        }
        Some(ReelError::LayoutOverflow {
            title_size_px: self.sizes.title,
            total_height: self.total_height,
            max_height,
        })
    }

    /// Top-left origin of each line, centered horizontally and the block centered vertically.
    pub fn line_origins(&self, canvas_width: f32, canvas_height: f32) -> Vec<(f32, f32)> {
        let mut out = Vec::with_capacity(self.lines.len());
        let mut y = ((canvas_height - self.total_height) / 2.0).floor();
        let mut prev_tier = None;
        for line in &self.lines {
            if prev_tier == Some(FontTier::Title) && line.tier == FontTier::Body {
                y += self.sizes.gap as f32 - self.sizes.spacing as f32;
            }
            let x = ((canvas_width - line.extent.width) / 2.0).floor();
            out.push((x, y));
            y += line.extent.height + self.sizes.spacing as f32;
            prev_tier = Some(line.tier);
        }
        out
    }
}

/// Character-granular greedy wrap.
///
/// Characters are appended while the measured line stays within `max_width`; a character that
/// would overflow starts a new line. A single character wider than `max_width` still gets its
/// own line.
pub fn wrap_chars(
    measure: &mut dyn TextMeasure,
    text: &str,
    size_px: f32,
    max_width: f32,
) -> ReelResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if measure.measure(&candidate, size_px)?.width <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

/// Auto-fitting layout of a title/body block inside the cover's usable area.
pub struct TextLayoutEngine<'a> {
    cfg: &'a CoverConfig,
}

impl<'a> TextLayoutEngine<'a> {
    pub fn new(cfg: &'a CoverConfig) -> Self {
        Self { cfg }
    }

    /// Shrink the type until the block fits, or return the floor attempt as best effort.
    #[tracing::instrument(skip(self, measure, block), fields(title = block.title()))]
    pub fn fit(&self, measure: &mut dyn TextMeasure, block: &TextBlock) -> ReelResult<LayoutResult> {
        let max_height = self.cfg.max_text_height();
        let mut sizes = SizeSet::initial(self.cfg);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let (lines, total_height) = self.layout_at(measure, block, sizes)?;
            let fits = total_height <= max_height;
            let next = sizes.shrunk(self.cfg);
            if fits || next.title < self.cfg.min_title_size || next.title == sizes.title {
                if !fits {
                    tracing::warn!(
                        title_size = sizes.title,
                        total_height,
                        max_height,
                        "cover text does not fit at the minimum size; rendering with overflow"
                    );
                }
                return Ok(LayoutResult {
                    lines,
                    sizes,
                    total_height,
                    attempts,
                    fits,
                });
            }
            tracing::debug!(title_size = sizes.title, total_height, "shrinking cover text");
            sizes = next;
        }
    }

    fn layout_at(
        &self,
        measure: &mut dyn TextMeasure,
        block: &TextBlock,
        sizes: SizeSet,
    ) -> ReelResult<(Vec<LaidLine>, f32)> {
        let max_width = self.cfg.max_text_width();
        let mut lines = Vec::new();

        if !block.title().is_empty() {
            let size = sizes.size_px(FontTier::Title);
            for text in wrap_chars(measure, block.title(), size, max_width)? {
                let extent = measure.measure(&text, size)?;
                lines.push(LaidLine {
                    text,
                    tier: FontTier::Title,
                    extent,
                });
            }
        }
        let size = sizes.size_px(FontTier::Body);
        for body_line in block.body() {
            for text in wrap_chars(measure, body_line, size, max_width)? {
                let extent = measure.measure(&text, size)?;
                lines.push(LaidLine {
                    text,
                    tier: FontTier::Body,
                    extent,
                });
            }
        }

        let total_height = block_height(&lines, sizes);
        Ok((lines, total_height))
    }
}

fn block_height(lines: &[LaidLine], sizes: SizeSet) -> f32 {
    if lines.is_empty() {
        return 0.0;
    }
    let spacing = sizes.spacing as f32;
    let mut total: f32 = lines.iter().map(|l| l.extent.height + spacing).sum();
    let has_title = lines.iter().any(|l| l.tier == FontTier::Title);
    let has_body = lines.iter().any(|l| l.tier == FontTier::Body);
    if has_title && has_body {
        total += sizes.gap as f32 - spacing;
    }
    total - spacing
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is `size` wide and lines are `size` tall.
    struct SquareGlyphs;

    impl TextMeasure for SquareGlyphs {
        fn measure(&mut self, text: &str, size_px: f32) -> ReelResult<TextExtent> {
            Ok(TextExtent {
                width: text.chars().count() as f32 * size_px,
                height: size_px,
            })
        }
    }

    #[test]
    fn wrap_respects_max_width() {
        let text = "这是一个需要换行的很长的标题文字内容用于测试";
        let lines = wrap_chars(&mut SquareGlyphs, text, 90.0, 920.0).unwrap();
        assert!(lines.len() > 1);
        for l in &lines {
            assert!(SquareGlyphs.measure(l, 90.0).unwrap().width <= 920.0);
        }
        assert_eq!(lines.concat(), text);
        // 920 / 90 = 10 characters per line.
        assert_eq!(lines[0].chars().count(), 10);
    }

    #[test]
    fn wrap_keeps_oversized_character_alone() {
        let lines = wrap_chars(&mut SquareGlyphs, "ab", 100.0, 50.0).unwrap();
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn short_block_fits_at_initial_sizes() {
        let cfg = CoverConfig::default();
        let block = TextBlock::parse("标题\n正文第一行\n正文第二行").unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        assert!(res.fits);
        assert_eq!(res.attempts, 1);
        assert_eq!(res.sizes.title, 90);
        // 90 + 40 + (60 - 40) + 60 + 40 + 60
        assert_eq!(res.total_height, 310.0);
        assert_eq!(res.lines.len(), 3);
        assert_eq!(res.lines[0].tier, FontTier::Title);
        assert!(res.overflow_error(cfg.max_text_height()).is_none());
    }

    #[test]
    fn long_body_shrinks_until_it_fits() {
        let cfg = CoverConfig::default();
        let body = "正文内容".repeat(80);
        let block = TextBlock::parse(&format!("标题\n{body}")).unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        assert!(res.fits);
        assert!(res.attempts > 1);
        assert!(res.sizes.title < 90);
        assert!(res.total_height <= cfg.max_text_height());
        assert_eq!(res.sizes.body, (res.sizes.title as f32 * 0.67) as u32);
    }

    #[test]
    fn shrink_loop_is_bounded_and_sizes_stay_positive() {
        let cfg = CoverConfig::default();
        let body = "溢".repeat(20_000);
        let block = TextBlock::parse(&format!("标题\n{body}")).unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        assert!(!res.fits);
        // 90, 80, 70, 60, 50, 40
        assert_eq!(res.attempts, 6);
        assert_eq!(res.sizes.title, cfg.min_title_size);
        assert!(res.sizes.body > 0);
        let err = res.overflow_error(cfg.max_text_height()).unwrap();
        assert!(!err.is_fatal());
    }

    #[test]
    fn all_wrapped_lines_fit_width_after_shrinking() {
        let cfg = CoverConfig::default();
        let block = TextBlock::parse(&format!("{}\n{}", "长".repeat(50), "短".repeat(300))).unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        for line in &res.lines {
            assert!(line.extent.width <= cfg.max_text_width());
        }
    }

    #[test]
    fn origins_center_block_and_apply_title_gap() {
        let cfg = CoverConfig::default();
        let block = TextBlock::parse("ab\ncd").unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        // 90 + 60 gap + 60 body
        assert_eq!(res.total_height, 210.0);
        let origins = res.line_origins(1080.0, 1920.0);
        assert_eq!(origins[0], ((1080.0 - 180.0) / 2.0, 855.0));
        assert_eq!(origins[1], ((1080.0 - 120.0) / 2.0, 855.0 + 90.0 + 60.0));
    }

    #[test]
    fn body_only_block_has_no_gap() {
        let cfg = CoverConfig::default();
        let block = TextBlock::parse("\n一\n二").unwrap();
        let res = TextLayoutEngine::new(&cfg).fit(&mut SquareGlyphs, &block).unwrap();
        assert!(res.lines.iter().all(|l| l.tier == FontTier::Body));
        assert_eq!(res.total_height, 60.0 + 40.0 + 60.0);
    }
}
