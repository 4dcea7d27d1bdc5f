/// Source preprocessor: splits one shader file into per-stage sources

use std::collections::BTreeMap;
use crate::error::{Error, Result};
use crate::shader::ShaderStage;

/// Stage marker token (`#type vertex`, `#type fragment`, ...)
pub const TYPE_TOKEN: &str = "#type";

/// Per-stage source text, ordered by stage processing order
pub type ShaderSource = BTreeMap<ShaderStage, String>;

fn is_line_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// Split a shader file into stage sources
///
/// Every `#type <stage>` marker starts a new stage; its source runs from the
/// next non-empty line up to the next marker or the end of the file. A
/// stage declared twice keeps its last fragment.
///
/// # Errors
///
/// - `Error::ShaderSyntax` if a marker line has no line terminator
/// - `Error::UnknownStage` if the stage token is not vertex/fragment/pixel/compute
pub fn preprocess(source: &str) -> Result<ShaderSource> {
    let mut sources = ShaderSource::new();

    let mut pos = source.find(TYPE_TOKEN);
    while let Some(marker) = pos {
        let eol = source[marker..]
            .find(is_line_break)
            .map(|offset| marker + offset)
            .ok_or_else(|| Error::ShaderSyntax(format!(
                "'{}' marker at byte {} is not terminated by a line break", TYPE_TOKEN, marker
            )))?;

        let token = source[marker + TYPE_TOKEN.len()..eol].trim();
        let stage = ShaderStage::from_marker(token)?;

        let body_start = source[eol..]
            .find(|c: char| !is_line_break(c))
            .map(|offset| eol + offset);

        let body = match body_start {
            Some(start) => {
                pos = source[start..].find(TYPE_TOKEN).map(|offset| start + offset);
                &source[start..pos.unwrap_or(source.len())]
            }
            None => {
                pos = None;
                ""
            }
        };

        sources.insert(stage, body.to_string());
    }

    Ok(sources)
}

#[cfg(test)]
#[path = "preprocessor_tests.rs"]
mod tests;
