use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cover::layout::{TextExtent, TextMeasure};
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Font file bytes plus where they came from.
#[derive(Clone, Debug)]
pub struct FontAsset {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl FontAsset {
    pub fn load(path: &Path) -> ReelResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    /// Load the first candidate that exists on disk.
    pub fn discover(candidates: &[PathBuf]) -> ReelResult<Self> {
        let path = find_font(candidates).ok_or_else(|| {
            ReelError::validation(format!(
                "no usable font found among {} candidate path(s)",
                candidates.len()
            ))
        })?;
        tracing::debug!(font = %path.display(), "using cover font");
        Self::load(path)
    }
}

pub fn find_font(candidates: &[PathBuf]) -> Option<&PathBuf> {
    candidates.iter().find(|p| p.is_file())
}

/// Parley contexts bound to one registered font family.
pub(crate) struct TextShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
}

impl TextShaper {
    pub(crate) fn new(font: &FontAsset) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelError::validation(format!(
                "no font families registered from '{}'",
                font.path.display()
            ))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape a single unwrapped line.
    pub(crate) fn shape_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> ReelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation("text size_px must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl TextMeasure for TextShaper {
    fn measure(&mut self, text: &str, size_px: f32) -> ReelResult<TextExtent> {
        let layout = self.shape_line(text, size_px, TextBrushRgba8::default())?;
        Ok(TextExtent {
            width: layout.width(),
            height: layout.height(),
        })
    }
}
