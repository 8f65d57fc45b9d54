//! Stylesheet units and media grouping.
//!
//! Stylesheets are concatenated in runs that share a `media` attribute:
//!
//! ```text
//! media:   None  print  None  None  screen
//! groups: [None][print][None  None][screen]
//! ```
//!
//! Only the previous group is compared, so a media value that reappears
//! after a different one starts a new group. Document order is the grouping
//! key; nothing is ever moved past a stylesheet with another media value.

use std::fs;
use std::path::PathBuf;

use super::error::{AssetError, Result};
use super::paths::{BasePaths, resolve_declared};
use super::scan::{Fragment, FragmentKind};
use crate::debug;

/// Where an asset unit's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// An external file, read at compression time.
    File {
        /// Absolute path under `base_root`.
        path: PathBuf,
        /// URL path relative to `base_url`, without querystring.
        basename: String,
    },
    /// Text written inline in the markup.
    Inline(String),
}

/// One fragment normalized for concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUnit {
    pub source: AssetSource,
    pub media: Option<String>,
}

impl AssetUnit {
    /// Resolve a fragment's declared URL into a file unit.
    pub fn from_url(url: &str, media: Option<&str>, paths: &BasePaths) -> Result<Self> {
        let (basename, path) = resolve_declared(url, paths)?;
        Ok(Self {
            source: AssetSource::File { path, basename },
            media: media.map(str::to_string),
        })
    }

    pub fn inline(text: Option<&str>, media: Option<&str>) -> Self {
        Self {
            source: AssetSource::Inline(text.unwrap_or_default().to_string()),
            media: media.map(str::to_string),
        }
    }

    /// URL path of a file unit, used as directory context for nested
    /// references.
    pub fn basename(&self) -> Option<&str> {
        match &self.source {
            AssetSource::File { basename, .. } => Some(basename),
            AssetSource::Inline(_) => None,
        }
    }

    /// Load the unit's text (files are read as UTF-8).
    pub fn read(&self) -> Result<String> {
        match &self.source {
            AssetSource::File { path, .. } => {
                fs::read_to_string(path).map_err(|e| AssetError::io(path, e))
            }
            AssetSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// A contiguous run of stylesheet units sharing one `media` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaGroup {
    pub media: Option<String>,
    pub units: Vec<AssetUnit>,
}

/// Classify scanned CSS fragments into asset units, in document order.
///
/// `<link rel="stylesheet">` becomes a file unit (its `href` must resolve),
/// `<style>` an inline unit; every other `link` is ignored.
pub fn collect_css_units(fragments: &[Fragment], paths: &BasePaths) -> Result<Vec<AssetUnit>> {
    let mut units = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let media = fragment.attr("media");
        match fragment.kind {
            FragmentKind::Link if is_stylesheet(fragment) => {
                let Some(href) = fragment.attr("href") else {
                    debug!("css"; "skipping stylesheet link without href");
                    continue;
                };
                units.push(AssetUnit::from_url(href, media, paths)?);
            }
            FragmentKind::Style => {
                units.push(AssetUnit::inline(fragment.inline_text.as_deref(), media));
            }
            _ => {}
        }
    }

    Ok(units)
}

fn is_stylesheet(fragment: &Fragment) -> bool {
    fragment
        .attr("rel")
        .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"))
}

/// Fold units into media groups, comparing against the previous group only.
pub fn group_by_media(units: Vec<AssetUnit>) -> Vec<MediaGroup> {
    units
        .into_iter()
        .fold(Vec::<MediaGroup>::new(), |mut groups, unit| {
            match groups.last_mut() {
                Some(previous) if previous.media == unit.media => previous.units.push(unit),
                _ => groups.push(MediaGroup {
                    media: unit.media.clone(),
                    units: vec![unit],
                }),
            }
            groups
        })
}
