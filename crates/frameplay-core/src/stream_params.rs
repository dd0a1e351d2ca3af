//! Display parameters embedded in live stream URLs.
//!
//! Live sources rarely carry trustworthy size information, so the publisher
//! appends it to the URL:
//!
//! ```text
//! rtsp://camera.local/live?w=800&h=1200&o=p
//! ```
//!
//! - `w`, `h`: integers, snapped onto the resolution table
//! - `o`: `l` for landscape (`16/9`), anything else for portrait (`9/16`)
//!
//! Every parameter is optional. A missing or unusable one is logged and the
//! corresponding prior value is kept.

use url::form_urlencoded;

use crate::resolution;
use crate::source::AspectRatio;

/// Size and orientation hints for a live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<AspectRatio>,
}

impl StreamParams {
    /// Parses the trailing query of `uri` on top of `prior`.
    ///
    /// Returns `None` if the URL has no `?` at all; the caller then keeps its
    /// defaults and builds the baseline pipeline.
    pub fn extract(uri: &str, prior: StreamParams) -> Option<StreamParams> {
        let Some(start) = uri.rfind('?') else {
            tracing::warn!("Url doesn't contain any param: {uri}");
            return None;
        };
        let query = &uri[start + 1..];
        let query = query.split('#').next().unwrap_or(query);

        let mut width = None;
        let mut height = None;
        let mut orientation = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "w" => width = Some(value.into_owned()),
                "h" => height = Some(value.into_owned()),
                "o" => orientation = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut params = prior;
        match width.as_deref().and_then(|v| parse_dimension("width", v)) {
            Some(w) => params.width = Some(w),
            None if width.is_none() => tracing::warn!("width wasn't provided!"),
            None => {}
        }
        match height.as_deref().and_then(|v| parse_dimension("height", v)) {
            Some(h) => params.height = Some(h),
            None if height.is_none() => tracing::warn!("height wasn't provided!"),
            None => {}
        }
        match orientation.as_deref() {
            Some("l") => params.aspect_ratio = Some(AspectRatio::Wide),
            Some(_) => params.aspect_ratio = Some(AspectRatio::Tall),
            None => tracing::warn!("orientation wasn't provided!"),
        }

        Some(params)
    }
}

fn parse_dimension(name: &str, value: &str) -> Option<u32> {
    let raw: u32 = match value.trim().parse() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Ignoring {name}={value}: {e}");
            return None;
        }
    };
    let normalized = resolution::normalize(raw);
    if normalized.is_none() {
        tracing::warn!(
            "Ignoring {name}={raw}: above the largest supported resolution {}",
            resolution::RESOLUTION_TABLE[resolution::RESOLUTION_TABLE.len() - 1]
        );
    }
    normalized
}
