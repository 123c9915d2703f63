//! Lua/BIMG table serializer (spec §4.F), ported from
//! `original_source/src/generator.cpp`'s `makeTable` / `makeLuaFile`.

use super::EncodedFrame;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Builds the `{ {text, fg, bg}, ... }, { palette }` Lua table pair. With
/// `compact = false` this is the BIMG-style pretty-printed form; with
/// `compact = true` it's a single-line form. `embed_palette` nests the
/// palette as a `palette = {...}` field of the same table instead of
/// returning a second top-level table.
pub fn make_table(frame: &EncodedFrame, compact: bool, embed_palette: bool, binary: bool) -> String {
    let mut out = String::new();
    out.push('{');
    if !compact {
        out.push('\n');
    }

    for y in 0..frame.height {
        let mut text = String::new();
        let mut fg = String::new();
        let mut bg = String::new();
        for x in 0..frame.width {
            let c = frame.characters[y * frame.width + x];
            let cc = frame.colors[y * frame.width + x];
            if (binary || (32..127).contains(&c)) && c != b'"' && c != b'\\' {
                text.push(c as char);
            } else {
                text.push('\\');
                text.push_str(&c.to_string());
            }
            fg.push(HEX[(cc & 0xf) as usize] as char);
            bg.push(HEX[(cc >> 4) as usize] as char);
        }
        if compact {
            out.push_str(&format!("{{\"{text}\",\"{fg}\",\"{bg}\"}},"));
        } else {
            out.push_str(&format!(
                "    {{\n        \"{text}\",\n        \"{fg}\",\n        \"{bg}\"\n    }},\n"
            ));
        }
    }

    out.push_str(if embed_palette {
        if compact {
            "palette={"
        } else {
            "    palette = {\n"
        }
    } else if compact {
        "},{"
    } else {
        "}, {\n"
    });

    let mut first = true;
    for c in frame.palette {
        let (b, g, r) = (c.b as f64 / 255.0, c.g as f64 / 255.0, c.r as f64 / 255.0);
        if compact {
            if first {
                out.push_str("[0]=");
            }
            out.push_str(&format!("{{{b:.6},{g:.6},{r:.6}}},"));
        } else if first {
            out.push_str(&format!("    [0] = {{{b:.6}, {g:.6}, {r:.6}}},\n"));
        } else {
            out.push_str(&format!("    {{{b:.6}, {g:.6}, {r:.6}}},\n"));
        }
        first = false;
    }

    out.push_str(if embed_palette {
        if compact {
            "}}"
        } else {
            "    }\n}"
        }
    } else {
        "}"
    });
    out
}

/// Wraps `make_table`'s default (non-compact, two-table, text-mode) output
/// in the standalone Lua script `makeLuaFile` emits: it destructures
/// `image, palette`, paints the palette, blits every row, waits for a
/// keypress, then restores the terminal.
pub fn make_lua_file(frame: &EncodedFrame) -> String {
    format!(
        "local image, palette = {}\n\n\
         term.clear()\n\
         for i = 0, #palette in ipairs(palette) do term.setPaletteColor(2^i, table.unpack(palette[i])) end\n\
         for y, r in ipairs(image) do\n    \
         term.setCursorPos(1, y)\n    \
         term.blit(table.unpack(r))\n\
         end\n\
         read()\n\
         for i = 0, 15 do term.setPaletteColor(2^i, term.nativePaletteColor(2^i)) end\n\
         term.setBackgroundColor(colors.black)\n\
         term.setTextColor(colors.white)\n\
         term.setCursorPos(1, 1)\n\
         term.clear()\n",
        make_table(frame, false, false, false)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn single_cell_table_has_three_fields_per_row() {
        let palette = vec![Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)];
        let frame = EncodedFrame {
            width: 1,
            height: 1,
            characters: &[0x80],
            colors: &[0x01],
            palette: &palette,
        };
        let table = make_table(&frame, true, false, false);
        assert!(table.contains("\"\\128\""));
        assert!(table.contains("\"1\""));
        assert!(table.contains("\"0\""));
    }

    #[test]
    fn lua_file_wraps_table_in_script() {
        let palette = vec![Rgb::new(255, 255, 255)];
        let frame = EncodedFrame {
            width: 1,
            height: 1,
            characters: &[0x80],
            colors: &[0x00],
            palette: &palette,
        };
        let script = make_lua_file(&frame);
        assert!(script.starts_with("local image, palette = {"));
        assert!(script.contains("term.blit"));
    }
}
