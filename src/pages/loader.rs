use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbaImage;
use rayon::prelude::*;

use crate::foundation::core::PageIndex;
use crate::foundation::error::{FolioError, FolioResult};

const PAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A page file discovered on disk, not yet decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRef {
    /// Page number recovered from the file name.
    pub index: PageIndex,
    /// Absolute or caller-relative path of the image file.
    pub path: PathBuf,
}

/// One decoded page.
#[derive(Clone, Debug)]
pub struct PageImage {
    /// Page number; determines the position in every later stage.
    pub index: PageIndex,
    /// Straight-alpha RGBA8 pixels.
    pub pixels: RgbaImage,
}

impl PageImage {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Ordered, decoded pages of one document.
///
/// Invariant: non-empty and strictly increasing in [`PageImage::index`].
#[derive(Clone, Debug)]
pub struct PageSet {
    pages: Vec<PageImage>,
}

impl PageSet {
    /// Wrap already-decoded pages, enforcing the ordering invariant.
    pub fn new(pages: Vec<PageImage>) -> FolioResult<Self> {
        if pages.is_empty() {
            return Err(FolioError::page_set("page set is empty"));
        }
        for pair in pages.windows(2) {
            if pair[0].index >= pair[1].index {
                return Err(FolioError::page_set(format!(
                    "pages out of order: page {} followed by page {}",
                    pair[0].index.0, pair[1].index.0
                )));
            }
        }
        Ok(Self { pages })
    }

    /// Decode every page referenced by `refs` (already ordered by [`scan_pages`]).
    #[tracing::instrument(skip(refs), fields(pages = refs.len()))]
    pub fn load(refs: &[PageRef]) -> FolioResult<Self> {
        let pages = refs
            .par_iter()
            .map(|r| -> FolioResult<PageImage> {
                let img = image::open(&r.path)
                    .with_context(|| format!("decode page '{}'", r.path.display()))?;
                Ok(PageImage {
                    index: r.index,
                    pixels: img.to_rgba8(),
                })
            })
            .collect::<FolioResult<Vec<_>>>()?;
        Self::new(pages)
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    /// Per-page heights in document order.
    pub fn heights(&self) -> Vec<u32> {
        self.pages.iter().map(PageImage::height).collect()
    }
}

/// Page number encoded as the trailing decimal digits of the file stem.
///
/// `page-7.jpg`, `page-007.jpg` and `7.png` all map to 7; zero padding is irrelevant.
pub fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}

pub(crate) fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            PAGE_EXTENSIONS
                .iter()
                .any(|known| e.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// List the page images in `dir`, ordered by page number.
///
/// Subdirectories and non-image files are ignored; image files without a page number are skipped
/// with a warning. The remaining numbers must be unique and contiguous.
#[tracing::instrument]
pub fn scan_pages(dir: &Path) -> FolioResult<Vec<PageRef>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        FolioError::page_set(format!("cannot read page directory '{}': {e}", dir.display()))
    })?;

    let mut refs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            FolioError::page_set(format!("cannot list page directory '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        if !path.is_file() || !is_page_image(&path) {
            continue;
        }
        match page_number(&path) {
            Some(n) => refs.push(PageRef {
                index: PageIndex(n),
                path,
            }),
            None => tracing::warn!(path = %path.display(), "no page number in file name; skipped"),
        }
    }

    if refs.is_empty() {
        return Err(FolioError::page_set(format!(
            "no page images found in '{}'",
            dir.display()
        )));
    }

    refs.sort_by_key(|r| r.index);
    for pair in refs.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.index == b.index {
            return Err(FolioError::page_set(format!(
                "duplicate page {}: '{}' and '{}'",
                a.index.0,
                a.path.display(),
                b.path.display()
            )));
        }
        if b.index.0 != a.index.0 + 1 {
            return Err(FolioError::page_set(format!(
                "missing page(s) between {} and {}",
                a.index.0, b.index.0
            )));
        }
    }

    tracing::info!(pages = refs.len(), dir = %dir.display(), "found pages");
    Ok(refs)
}

/// Dimensions of the first page, read from the file header.
pub fn first_page_dimensions(refs: &[PageRef]) -> FolioResult<(u32, u32)> {
    let first = refs
        .first()
        .ok_or_else(|| FolioError::page_set("page set is empty"))?;
    image::image_dimensions(&first.path).map_err(|e| {
        FolioError::page_set(format!(
            "cannot read first page '{}': {e}",
            first.path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/pages/loader.rs"]
mod tests;
