//! vMix XML snapshot decoder
//!
//! Turns the document served at `/api/` into a [`MixerState`]. Only the root's
//! `inputs/input` attributes and the top-level `active` / `preview` text are read;
//! everything else in the snapshot (overlays, transitions, audio) is skipped.
//!
//! Missing attributes never fail the decode; only malformed XML does.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::types::{Input, MixerState};
use crate::error::DecodeError;

/// Top-level element currently being read (depth 2 under the root)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Inputs,
    Active,
    Preview,
    Other,
}

impl Section {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"inputs" => Section::Inputs,
            b"active" => Section::Active,
            b"preview" => Section::Preview,
            _ => Section::Other,
        }
    }
}

/// Decode a full state snapshot
pub fn decode(xml: &str) -> Result<MixerState, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = MixerState::default();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut section = Section::Other;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => enter_root(&mut seen_root)?,
                    2 => {
                        section = Section::from_name(e.name().as_ref());
                        text.clear();
                    },
                    3 if section == Section::Inputs && e.name().as_ref() == b"input" => {
                        state.inputs.push(decode_input(&e)?);
                    },
                    _ => {},
                }
            },
            Event::Empty(e) => match depth + 1 {
                1 => enter_root(&mut seen_root)?,
                // `<active/>` carries no input number
                3 if section == Section::Inputs && e.name().as_ref() == b"input" => {
                    state.inputs.push(decode_input(&e)?);
                },
                _ => {},
            },
            Event::Text(t) => {
                let value = t
                    .unescape()
                    .map_err(|e| DecodeError::ParseFailure(e.to_string()))?;
                if depth == 0 {
                    if !value.trim().is_empty() {
                        return Err(DecodeError::ParseFailure(
                            "text outside of the root element".to_string(),
                        ));
                    }
                } else if depth == 2 && matches!(section, Section::Active | Section::Preview) {
                    text.push_str(&value);
                }
            },
            Event::CData(c) => {
                if depth == 2 && matches!(section, Section::Active | Section::Preview) {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            },
            Event::End(_) => {
                if depth == 0 {
                    return Err(DecodeError::ParseFailure("unmatched closing tag".to_string()));
                }
                if depth == 2 {
                    match section {
                        Section::Active => state.active = non_empty(&text),
                        Section::Preview => state.preview = non_empty(&text),
                        Section::Inputs | Section::Other => {},
                    }
                    section = Section::Other;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if depth != 0 {
        return Err(DecodeError::ParseFailure("unexpected end of document".to_string()));
    }
    if !seen_root {
        return Err(DecodeError::ParseFailure("no root element".to_string()));
    }

    Ok(state)
}

fn enter_root(seen_root: &mut bool) -> Result<(), DecodeError> {
    if *seen_root {
        return Err(DecodeError::ParseFailure("multiple root elements".to_string()));
    }
    *seen_root = true;
    Ok(())
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn decode_input(element: &BytesStart<'_>) -> Result<Input, DecodeError> {
    let mut number = None;
    let mut title = None;
    let mut short_title = None;
    let mut input_type = None;
    let mut state = None;
    let mut duration = None;
    let mut position = None;
    let mut key = None;

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr
            .unescape_value()
            .map_err(|e| DecodeError::ParseFailure(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"number" => number = Some(value),
            b"title" => title = Some(value),
            b"shortTitle" => short_title = Some(value),
            b"type" => input_type = Some(value),
            b"state" => state = Some(value),
            b"duration" => duration = Some(value),
            b"position" => position = Some(value),
            b"key" => key = Some(value),
            _ => {},
        }
    }

    let number = number.unwrap_or_default();
    Ok(Input {
        title: title.unwrap_or_else(|| format!("Input {}", number)),
        short_title: short_title.unwrap_or_default(),
        input_type: input_type.unwrap_or_else(|| "Unknown".to_string()),
        state: state.unwrap_or_default(),
        duration: duration.unwrap_or_else(|| "0".to_string()),
        position: position.unwrap_or_else(|| "0".to_string()),
        key: key.unwrap_or_default(),
        number,
    })
}
