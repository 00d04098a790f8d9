//! Cover image generation.
//!
//! [`layout`] holds the font-size fitting and character-granular wrapping, [`shaping`] measures
//! text with Parley, and [`render`] rasterizes with `vello_cpu` and writes the PNG.

pub mod layout;
pub mod render;
pub mod shaping;

use std::path::Path;

use crate::config::CoverMode;
use crate::foundation::error::ReelResult;
use crate::script::TextBlock;

use render::{CoverOutput, CoverRenderer, PostManifest};

/// Full generation: write the cover image and its `post.json` manifest side by side.
pub fn generate_with_manifest(
    renderer: &mut CoverRenderer,
    mode: CoverMode,
    block: &TextBlock,
    cover_path: &Path,
    manifest_path: &Path,
) -> ReelResult<CoverOutput> {
    let out = match mode {
        CoverMode::Text => renderer.render_text(block, cover_path)?,
        CoverMode::Background => renderer.render_background(cover_path)?,
    };
    let cover_file = cover_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    PostManifest::for_block(block, &cover_file).write(manifest_path)?;
    Ok(out)
}
