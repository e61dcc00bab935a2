//! Archive page link extraction
//!
//! The archive page lists one block per issue section: an element carrying
//! the `issue-group` class and the section identifier in its `id` attribute,
//! followed by a download table. Only the FIRST table inside each section is
//! considered; later tables (mirrors, alternate formats) are deliberately
//! ignored. Anchors whose target has no file extension are skipped silently;
//! a document without the expected structure aborts discovery.

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::types::DownloadLink;

const SECTION_TAG: &str = r#"<div[^>]*class="[^"]*\bissue-group\b[^"]*"[^>]*>"#;
const ID_ATTR: &str = r#"id="([^"]*)""#;
const FIRST_TABLE: &str = r"(?s)<table[^>]*>.*?</table>";
const ANCHOR_HREF: &str = r#"<a[^>]*href="([^"]+)""#;

/// Extract every downloadable issue link from the archive page body.
///
/// Returns one [`DownloadLink`] per qualifying anchor, in document order.
/// Relative hrefs are resolved against `base`; the filename is the
/// percent-decoded basename of the resolved URL.
///
/// # Errors
///
/// [`Error::Extraction`] when the document contains no issue sections at
/// all, or when a section with a non-empty identifier has no download table.
pub fn extract_links(body: &str, base: &Url) -> Result<Vec<DownloadLink>> {
    let section_re = pattern(SECTION_TAG)?;
    let id_re = pattern(ID_ATTR)?;
    let table_re = pattern(FIRST_TABLE)?;
    let anchor_re = pattern(ANCHOR_HREF)?;

    let sections: Vec<_> = section_re.find_iter(body).collect();
    if sections.is_empty() {
        return Err(Error::Extraction("no issue sections found".to_string()));
    }

    let mut links = Vec::new();
    for (index, section) in sections.iter().enumerate() {
        let group_id = match id_re.captures(section.as_str()) {
            Some(captures) => captures[1].to_string(),
            None => String::new(),
        };
        // Sections without an identifier carry no downloads of interest
        if group_id.is_empty() {
            continue;
        }

        // The section's content runs until the next section starts
        let end = sections
            .get(index + 1)
            .map_or(body.len(), |next| next.start());
        let content = &body[section.end()..end];

        let table = table_re.find(content).ok_or_else(|| {
            Error::Extraction(format!("section '{group_id}' has no download table"))
        })?;

        for captures in anchor_re.captures_iter(table.as_str()) {
            if let Some(link) = resolve_anchor(&group_id, &captures[1], base) {
                links.push(link);
            }
        }
    }

    Ok(links)
}

/// Resolve one anchor href into a download link, or None if it does not
/// qualify (unresolvable, no basename, no file extension, undecodable name).
fn resolve_anchor(group_id: &str, href: &str, base: &Url) -> Option<DownloadLink> {
    let url = match base.join(href) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(href, error = %e, "unresolvable anchor, skipping");
            return None;
        }
    };

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())?
        .to_string();

    // Targets without a file extension are navigation, not downloads
    let extension = std::path::Path::new(&segment)
        .extension()
        .and_then(|ext| ext.to_str());
    if extension.is_none_or(str::is_empty) {
        tracing::debug!(href, "anchor target has no file extension, skipping");
        return None;
    }

    let file_name = match urlencoding::decode(&segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(href, error = %e, "undecodable filename, skipping");
            return None;
        }
    };

    Some(DownloadLink {
        group_id: group_id.to_string(),
        url,
        file_name,
    })
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source)
        .map_err(|e| Error::Extraction(format!("invalid extraction pattern '{source}': {e}")))
}
