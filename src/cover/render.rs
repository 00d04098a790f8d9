use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::CoverConfig;
use crate::cover::layout::{LayoutResult, TextLayoutEngine};
use crate::cover::shaping::{FontAsset, TextBrushRgba8, TextShaper};
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::script::TextBlock;

/// Result of rendering a cover.
#[derive(Debug)]
pub struct CoverOutput {
    pub path: PathBuf,
    /// Absent for background-only covers.
    pub layout: Option<LayoutResult>,
    /// Non-fatal overflow, when the floor size still did not fit.
    pub overflow: Option<ReelError>,
}

/// `post.json` contents.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PostManifest {
    pub title: String,
    pub body: String,
    pub cover: String,
}

impl PostManifest {
    pub fn for_block(block: &TextBlock, cover_file: &str) -> Self {
        Self {
            title: block.title().to_string(),
            body: block.body_text(),
            cover: cover_file.to_string(),
        }
    }

    pub fn write(&self, path: &Path) -> ReelResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ReelError::serde(format!("post manifest encode failed: {e}")))?;
        std::fs::write(path, json)
            .with_context(|| format!("write manifest '{}'", path.display()))?;
        Ok(())
    }
}

/// Renders cover images onto a fixed canvas.
pub struct CoverRenderer {
    cfg: CoverConfig,
    text: Option<(TextShaper, vello_cpu::peniko::FontData)>,
}

impl CoverRenderer {
    /// Renderer that can draw text; fails when no configured font exists.
    pub fn new(cfg: CoverConfig) -> ReelResult<Self> {
        cfg.validate()?;
        let font = FontAsset::discover(&cfg.font_paths)?;
        Self::with_font(cfg, font)
    }

    pub fn with_font(cfg: CoverConfig, font: FontAsset) -> ReelResult<Self> {
        cfg.validate()?;
        let shaper = TextShaper::new(&font)?;
        let font_data =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font.bytes), 0);
        Ok(Self {
            cfg,
            text: Some((shaper, font_data)),
        })
    }

    /// Renderer restricted to background-only covers; needs no font.
    pub fn background_only(cfg: CoverConfig) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg, text: None })
    }

    pub fn canvas(&self) -> Canvas {
        self.cfg.canvas
    }

    /// Lay out `block` and write the cover PNG to `out`.
    #[tracing::instrument(skip(self, block))]
    pub fn render_text(&mut self, block: &TextBlock, out: &Path) -> ReelResult<CoverOutput> {
        let Some((shaper, font)) = self.text.as_mut() else {
            return Err(ReelError::validation(
                "cover renderer was built without a font; only background covers are available",
            ));
        };

        let layout = TextLayoutEngine::new(&self.cfg).fit(shaper, block)?;
        let overflow = layout.overflow_error(self.cfg.max_text_height());

        let canvas = self.cfg.canvas;
        let (w, h) = canvas_u16(canvas)?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        fill_background(&mut ctx, &self.cfg);

        let color = self.cfg.text_color;
        let brush = TextBrushRgba8 {
            r: color.r,
            g: color.g,
            b: color.b,
            a: 255,
        };
        let origins = layout.line_origins(canvas.width as f32, canvas.height as f32);
        for (line, (x, y)) in layout.lines.iter().zip(origins) {
            let shaped = shaper.shape_line(&line.text, layout.sizes.size_px(line.tier), brush)?;
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((f64::from(x), f64::from(y))));
            for parley_line in shaped.lines() {
                for item in parley_line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let b = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        save_rgb_png(out, canvas, pixmap.data_as_u8_slice())?;

        tracing::info!(
            path = %out.display(),
            lines = layout.lines.len(),
            title_size = layout.sizes.title,
            "cover rendered"
        );
        Ok(CoverOutput {
            path: out.to_path_buf(),
            layout: Some(layout),
            overflow,
        })
    }

    /// Write a blank canvas in the background color.
    pub fn render_background(&self, out: &Path) -> ReelResult<CoverOutput> {
        let canvas = self.cfg.canvas;
        let img = image::RgbImage::from_pixel(
            canvas.width,
            canvas.height,
            image::Rgb(self.cfg.background.to_array()),
        );
        img.save_with_format(out, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", out.display()))?;
        tracing::info!(path = %out.display(), "background cover rendered");
        Ok(CoverOutput {
            path: out.to_path_buf(),
            layout: None,
            overflow: None,
        })
    }
}

fn canvas_u16(canvas: Canvas) -> ReelResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| ReelError::validation("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| ReelError::validation("canvas height exceeds u16"))?;
    Ok((w, h))
}

fn fill_background(ctx: &mut vello_cpu::RenderContext, cfg: &CoverConfig) {
    let bg = cfg.background;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, 255));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(cfg.canvas.width),
        f64::from(cfg.canvas.height),
    ));
}

/// Drop alpha from an opaque premultiplied RGBA8 buffer and save as PNG.
fn save_rgb_png(out: &Path, canvas: Canvas, rgba_premul: &[u8]) -> ReelResult<()> {
    let expected = canvas.width as usize * canvas.height as usize * 4;
    if rgba_premul.len() != expected {
        return Err(ReelError::validation(format!(
            "rendered buffer has {} bytes, expected {expected}",
            rgba_premul.len()
        )));
    }
    let mut rgb = Vec::with_capacity(expected / 4 * 3);
    for px in rgba_premul.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    let img = image::RgbImage::from_raw(canvas.width, canvas.height, rgb)
        .ok_or_else(|| ReelError::validation("rgb buffer does not match canvas size"))?;
    img.save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb8;

    fn small_cfg() -> CoverConfig {
        CoverConfig {
            canvas: Canvas {
                width: 108,
                height: 192,
            },
            margin: 8,
            title_size: 18,
            body_size: 12,
            spacing: 8,
            title_body_gap: 12,
            min_title_size: 8,
            shrink_step: 2,
            background: Rgb8 { r: 10, g: 20, b: 30 },
            ..CoverConfig::default()
        }
    }

    #[test]
    fn background_cover_has_canvas_size_and_color() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cover.png");
        let renderer = CoverRenderer::background_only(small_cfg()).unwrap();
        let res = renderer.render_background(&out).unwrap();
        assert!(res.layout.is_none());

        let img = image::open(&out).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (108, 192));
        assert_eq!(img.get_pixel(50, 50).0, [10, 20, 30]);
    }

    #[test]
    fn background_only_renderer_refuses_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = CoverRenderer::background_only(small_cfg()).unwrap();
        let block = TextBlock::parse("标题").unwrap();
        let err = renderer
            .render_text(&block, &dir.path().join("c.png"))
            .unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));
    }

    #[test]
    fn text_cover_keeps_canvas_size_if_font_present() {
        let cfg = CoverConfig::default();
        let Ok(mut renderer) = CoverRenderer::new(cfg) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cover.png");
        let block = TextBlock::parse(&format!("标题\n{}", "很长的正文".repeat(400))).unwrap();
        let res = renderer.render_text(&block, &out).unwrap();
        assert!(res.layout.is_some());

        let img = image::open(&out).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (1080, 1920));
        // Some glyph pixels differ from the black background.
        assert!(img.pixels().any(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn manifest_is_pretty_utf8_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.json");
        let block = TextBlock::parse("标题\n正文第一行\n正文第二行").unwrap();
        PostManifest::for_block(&block, "cover.png")
            .write(&path)
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"title\": \"标题\""));
        let back: PostManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.title, "标题");
        assert_eq!(back.body, "正文第一行\n正文第二行");
        assert_eq!(back.cover, "cover.png");
    }
}
