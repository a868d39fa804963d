use anyhow::{bail, Context, Result};
use batchchat_core::{ImageData, MAX_IMAGES};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An image picked by the user, with the label shown next to its answers
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub name: String,
    pub data: ImageData,
}

/// Maps a file extension to an image MIME type
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads the selected files, accepting only images and at most four of them.
pub fn load_images(paths: &[PathBuf]) -> Result<Vec<SelectedImage>> {
    let rejected: Vec<String> = paths
        .iter()
        .filter(|path| mime_for_path(path).is_none())
        .map(|path| display_name(path))
        .collect();
    if !rejected.is_empty() {
        bail!(
            "Only image files are allowed. Rejected: {}",
            rejected.join(", ")
        );
    }

    if paths.len() > MAX_IMAGES {
        bail!(
            "Maximum of {} images allowed. Please select fewer images.",
            MAX_IMAGES
        );
    }
    if paths.is_empty() {
        bail!("Select at least one image to start chatting.");
    }

    paths
        .iter()
        .map(|path| {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            debug!(path = %path.display(), bytes = bytes.len(), "Loaded image");
            Ok(SelectedImage {
                name: display_name(path),
                data: ImageData::new(bytes, mime_for_path(path).map(str::to_string)),
            })
        })
        .collect()
}
