//! ASS subtitle overlay, supplementing the core pipeline (spec §6's
//! `--subtitle` flag). Ported from `original_source/src/sanjuuni.cpp`'s
//! `parseASSSubtitles` / `renderSubtitles`: a minimal `[Script Info]` /
//! `[V4+ Styles]` / `[Events]` parser, frame-range expansion of each
//! dialogue line, and compositing of wrapped lines onto the cell grid
//! using the 9-point SSA/ASS numpad alignment convention.
//!
//! Subtitle text is written as literal ASCII character bytes directly
//! into the screen plane, not through the 2x3 cc-pixel glyph encoding
//! (`cell::encode_cell`) -- it shares the character/color byte arrays
//! with the graphics cells, but addresses the terminal's normal text
//! font rather than the 5-bit block-graphics code space, so the bit-7
//! invariant that graphics cells carry does not apply to these bytes.

use std::collections::HashMap;

use crate::color::Rgb;

#[derive(Debug, Clone)]
pub struct SubtitleEvent {
    pub width: u32,
    pub height: u32,
    pub start_frame: i64,
    pub length: i64,
    pub alignment: u8,
    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_vertical: i32,
    pub color: Rgb,
    pub text: String,
}

fn parse_time(s: &str) -> Option<f64> {
    let (h, rest) = s.split_once(':')?;
    let (m, rest) = rest.split_once(':')?;
    let (sec, cs) = rest.split_once('.')?;
    Some(
        h.parse::<f64>().ok()? * 3600.0
            + m.parse::<f64>().ok()? * 60.0
            + sec.parse::<f64>().ok()?
            + cs.parse::<f64>().ok()? / 100.0,
    )
}

fn parse_color(s: &str) -> Rgb {
    let hex = s.strip_prefix("&H").unwrap_or(s);
    let color = u32::from_str_radix(hex, 16).unwrap_or(0);
    Rgb::new(
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    )
}

fn split_fields(data: &str) -> Vec<String> {
    data.split(',').map(|s| s.trim().to_string()).collect()
}

/// Parses an ASS/SSA subtitle script, expanding every dialogue line
/// into one `(frame, event)` pair per frame it's visible on.
pub fn parse_ass_subtitles(content: &str, framerate: f64) -> Vec<(i64, SubtitleEvent)> {
    let mut retval = Vec::new();
    let mut styles: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut format: Vec<String> = Vec::new();
    let mut is_ass = false;
    let mut width: u32 = 0;
    let mut height: u32 = 0;
    let mut section = "";

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(';') || line.trim().is_empty() {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = match line {
                "[Script Info]" => "info",
                "[V4+ Styles]" | "[V4 Styles]" => "styles",
                "[Events]" => "events",
                _ => "",
            };
            continue;
        }
        let Some((ty, data)) = line.split_once(':') else { continue };
        let data = data.trim();
        match (section, ty) {
            (_, "ScriptType") => is_ass = data.eq_ignore_ascii_case("v4.00+"),
            (_, "PlayResX") => width = data.parse().unwrap_or(0),
            (_, "PlayResY") => height = data.parse().unwrap_or(0),
            ("styles", "Format") | ("events", "Format") => format = split_fields(data),
            ("styles", "Style") => {
                let values = split_fields(data);
                let mut style = HashMap::new();
                for (i, key) in format.iter().enumerate() {
                    style.insert(key.clone(), values.get(i).cloned().unwrap_or_default());
                }
                styles.insert(style.get("Name").cloned().unwrap_or_default(), style);
            }
            ("events", "Dialogue") => {
                let values: Vec<String> = data.splitn(format.len(), ',').map(|s| s.to_string()).collect();
                let mut params = HashMap::new();
                for (i, key) in format.iter().enumerate() {
                    params.insert(key.clone(), values.get(i).cloned().unwrap_or_default());
                }
                let Some(start_t) = params.get("Start").and_then(|s| parse_time(s)) else { continue };
                let Some(end_t) = params.get("End").and_then(|s| parse_time(s)) else { continue };
                let start = (start_t * framerate) as i64;
                let end = (end_t * framerate) as i64;
                let default_style = HashMap::new();
                let style = params
                    .get("Style")
                    .and_then(|s| styles.get(s))
                    .or_else(|| styles.get("Default"))
                    .unwrap_or(&default_style);

                let mut alignment: u8 = style.get("Alignment").and_then(|s| s.parse().ok()).unwrap_or(2);
                if !is_ass {
                    alignment = match alignment {
                        9..=11 => alignment - 2,
                        5..=8 => alignment - 1,
                        other => other,
                    };
                }
                if alignment == 0 {
                    alignment = 2;
                }

                let margin_left = params
                    .get("MarginL")
                    .and_then(|s| s.parse::<i32>().ok())
                    .filter(|&v| v != 0)
                    .or_else(|| style.get("MarginL").and_then(|s| s.parse().ok()))
                    .unwrap_or(0);
                let margin_right = params
                    .get("MarginR")
                    .and_then(|s| s.parse::<i32>().ok())
                    .filter(|&v| v != 0)
                    .or_else(|| style.get("MarginR").and_then(|s| s.parse().ok()))
                    .unwrap_or(0);
                let margin_vertical = params
                    .get("MarginV")
                    .and_then(|s| s.parse::<i32>().ok())
                    .filter(|&v| v != 0)
                    .or_else(|| style.get("MarginV").and_then(|s| s.parse().ok()))
                    .unwrap_or(0);
                let color = style.get("PrimaryColour").map(|s| parse_color(s)).unwrap_or(Rgb::new(255, 255, 255));
                let text = params.get("Text").cloned().unwrap_or_default();

                for frame in start..end {
                    retval.push((
                        frame,
                        SubtitleEvent {
                            width,
                            height,
                            start_frame: start,
                            length: end - start,
                            alignment,
                            margin_left,
                            margin_right,
                            margin_vertical,
                            color,
                            text: text.clone(),
                        },
                    ));
                }
            }
            _ => {}
        }
    }
    retval
}

fn nearest_palette_index(palette: &[Rgb], color: Rgb) -> u8 {
    crate::quantize::nearest_color(color, palette)
}

fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && (chars[i + 1] == 'n' || chars[i + 1] == 'N') {
            lines.push(std::mem::take(&mut cur));
            i += 2;
        } else if chars[i] == '{' {
            match chars[i..].iter().position(|&c| c == '}') {
                Some(end) => i += end + 1,
                None => break,
            }
        } else {
            cur.push(chars[i]);
            i += 1;
        }
    }
    lines.push(cur);
    lines
}

/// Composites every subtitle event active on `nframe` onto the cell
/// grid, in cell (not pixel) coordinates: `width`/`height` are the
/// character-cell dimensions (image pixel dims / 2, / 3).
pub fn render_subtitles(
    events: &[(i64, SubtitleEvent)],
    nframe: i64,
    characters: &mut [u8],
    colors: &mut [u8],
    palette: &[Rgb],
    width: usize,
    height: usize,
) {
    for (frame, ev) in events {
        if *frame != nframe {
            continue;
        }
        let scale_x = if width > 0 { ev.width as f64 / width as f64 } else { 1.0 };
        let scale_y = if height > 0 { ev.height as f64 / height as f64 } else { 1.0 };
        let color_idx = nearest_palette_index(palette, ev.color);
        let lines = wrap_lines(&ev.text);
        let n = lines.len();

        for (i, line) in lines.iter().enumerate() {
            let (start_x, start_y): (i64, i64) = match ev.alignment {
                1 => (
                    (ev.margin_left as f64 / scale_x) as i64,
                    height as i64 - (ev.margin_vertical as f64 / scale_y) as i64 - (n - i - 1) as i64 * 3 - 1,
                ),
                2 => (
                    width as i64 / 2 - line.len() as i64,
                    height as i64 - (ev.margin_vertical as f64 / scale_y) as i64 - (n - i - 1) as i64 * 3 - 1,
                ),
                3 => (
                    width as i64 - (ev.margin_right as f64 / scale_x) as i64 - line.len() as i64 - 1,
                    height as i64 - (ev.margin_vertical as f64 / scale_y) as i64 - (n - i - 1) as i64 * 3 - 1,
                ),
                4 => ((ev.margin_left as f64 / scale_x) as i64, (ev.margin_vertical as f64 / scale_y) as i64 + i as i64 * 3),
                5 => (width as i64 / 2 - line.len() as i64, (ev.margin_vertical as f64 / scale_y) as i64 + i as i64 * 3),
                6 => (
                    width as i64 - (ev.margin_right as f64 / scale_x) as i64 - line.len() as i64 - 1,
                    (ev.margin_vertical as f64 / scale_y) as i64 + i as i64 * 3,
                ),
                7 => ((ev.margin_left as f64 / scale_x) as i64, (height as i64 - n as i64) / 2 + i as i64 * 3),
                8 => (width as i64 / 2 - line.len() as i64, (height as i64 - n as i64) / 2 + i as i64 * 3),
                9 => (
                    width as i64 - (ev.margin_right as f64 / scale_x) as i64 - line.len() as i64 - 1,
                    (height as i64 - n as i64) / 2 + i as i64 * 3,
                ),
                _ => (0, 0),
            };

            let cell_x = start_x / 2;
            let cell_y = start_y / 3;
            if cell_y < 0 || cell_y as usize >= height {
                continue;
            }
            let row_start = cell_y as usize * width;
            for (x, ch) in line.bytes().enumerate() {
                let cell = cell_x + x as i64;
                if cell < 0 || cell as usize >= width {
                    continue;
                }
                let idx = row_start + cell as usize;
                if idx < characters.len() {
                    characters[idx] = ch;
                    colors[idx] = 0xF0 | color_idx;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[Script Info]\nScriptType: v4.00+\nPlayResX: 384\nPlayResY: 288\n\n[V4+ Styles]\nFormat: Name, Alignment, MarginL, MarginR, MarginV, PrimaryColour\nStyle: Default,2,10,10,20,&H00FFFFFF\n\n[Events]\nFormat: Start, End, Style, Text\nDialogue: 0:00:00.00,0:00:01.00,Default,Hello world\n";

    #[test]
    fn parses_one_dialogue_line_into_per_frame_events() {
        let events = parse_ass_subtitles(SAMPLE, 10.0);
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].1.text, "Hello world");
        assert_eq!(events[0].1.alignment, 2);
    }

    #[test]
    fn renders_onto_the_bottom_center_cell_row() {
        let events = parse_ass_subtitles(SAMPLE, 10.0);
        let palette = vec![Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)];
        let width = 40;
        let height = 30;
        let mut characters = vec![0x80u8; width * height];
        let mut colors = vec![0u8; width * height];
        render_subtitles(&events, 0, &mut characters, &mut colors, &palette, width, height);
        assert!(characters.iter().any(|&c| c == b'H'));
    }

    #[test]
    fn wrap_splits_on_ass_newline_escape() {
        let lines = wrap_lines("first\\Nsecond");
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }
}
