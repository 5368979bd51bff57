//! Headless secondary-structure drawing.
//!
//! Bases are placed on a circle with a gap at every strand end, base pairs
//! are drawn as chords. Output is a standalone SVG document.

use serde::{Deserialize, Serialize};
use svg::node::element::path::Data;
use svg::node::element::{Circle, Line, Path, Rectangle, Text};
use svg::Document;

const W: f32 = 800.0;
const H: f32 = 800.0;
const NICK_GAP: usize = 3;
const BASE_RADIUS: f32 = 5.0;

const OPEN: [char; 4] = ['(', '[', '{', '<'];
const CLOSE: [char; 4] = [')', ']', '}', '>'];

const PASTEL: [&str; 7] = [
    "#aec6cf", "#ffb347", "#b39eb5", "#77dd77", "#fdfd96", "#ff6961", "#cfcfc4",
];
const BRIGHT: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("structure is empty")]
    Empty,
    #[error("structure has {structure} strands but sequence has {sequence}")]
    StrandCountMismatch { structure: usize, sequence: usize },
    #[error("strand {strand}: structure length {structure} differs from sequence length {sequence}")]
    LengthMismatch {
        strand: usize,
        structure: usize,
        sequence: usize,
    },
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unbalanced bracket at position {position}")]
    UnbalancedBracket { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderType {
    /// One color per strand.
    #[default]
    Strand,
    /// One color per nucleotide.
    Base,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPalette {
    #[default]
    Pastel,
    Bright,
}

impl ColorPalette {
    fn colors(&self) -> &'static [&'static str] {
        match self {
            Self::Pastel => &PASTEL,
            Self::Bright => &BRIGHT,
        }
    }

    pub fn strand_color(&self, strand: usize) -> &'static str {
        let colors = self.colors();
        colors[strand % colors.len()]
    }

    pub fn base_color(&self, base: char) -> &'static str {
        let colors = self.colors();
        match base.to_ascii_uppercase() {
            'A' => colors[3],
            'C' => colors[0],
            'G' => colors[1],
            'T' | 'U' => colors[5 % colors.len()],
            _ => "#999999",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptions {
    pub render_type: RenderType,
    pub color_palette: ColorPalette,
    pub show_labels: bool,
    pub title: Option<String>,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            render_type: RenderType::Strand,
            color_palette: ColorPalette::Pastel,
            show_labels: true,
            title: None,
        }
    }
}

/// Strand lengths and base pairs (global indices) of an extended dot-bracket
/// string with `+` strand breaks.
pub fn parse_structure(structure: &str) -> Result<(Vec<usize>, Vec<(usize, usize)>), RenderError> {
    if structure.is_empty() {
        return Err(RenderError::Empty);
    }
    let mut lengths = vec![0];
    // (base index, character position) of every open bracket
    let mut stacks: Vec<Vec<(usize, usize)>> = vec![vec![]; OPEN.len()];
    let mut pairs = vec![];
    let mut index = 0;

    for (position, c) in structure.chars().enumerate() {
        if c == '+' {
            lengths.push(0);
            continue;
        }
        if let Some(kind) = OPEN.iter().position(|o| *o == c) {
            stacks[kind].push((index, position));
        } else if let Some(kind) = CLOSE.iter().position(|o| *o == c) {
            let (open, _) = stacks[kind]
                .pop()
                .ok_or(RenderError::UnbalancedBracket { position })?;
            pairs.push((open, index));
        } else if c != '.' {
            return Err(RenderError::UnexpectedCharacter {
                character: c,
                position,
            });
        }
        if let Some(last) = lengths.last_mut() {
            *last += 1;
        }
        index += 1;
    }

    if let Some((_, position)) = stacks.iter().flatten().min() {
        return Err(RenderError::UnbalancedBracket {
            position: *position,
        });
    }
    pairs.sort_unstable();
    Ok((lengths, pairs))
}

fn pos2xy(slot: usize, slots: usize, cx: f32, cy: f32, r: f32) -> (f32, f32) {
    let angle =
        2.0 * std::f32::consts::PI * (slot as f32 / slots as f32) - std::f32::consts::FRAC_PI_2;
    (cx + r * angle.cos(), cy + r * angle.sin())
}

/// Draw `structure` (dot-bracket, `+` between strands) over `sequence`
/// (same layout, bases instead of brackets).
pub fn draw_structure(
    structure: &str,
    sequence: &str,
    options: &DrawOptions,
) -> Result<String, RenderError> {
    let (lengths, pairs) = parse_structure(structure)?;
    let strands: Vec<&str> = sequence.split('+').collect();
    if strands.len() != lengths.len() {
        return Err(RenderError::StrandCountMismatch {
            structure: lengths.len(),
            sequence: strands.len(),
        });
    }
    for (strand, (len, seq)) in lengths.iter().zip(&strands).enumerate() {
        if *len != seq.chars().count() {
            return Err(RenderError::LengthMismatch {
                strand,
                structure: *len,
                sequence: seq.chars().count(),
            });
        }
    }

    let bases: Vec<(usize, char)> = strands
        .iter()
        .enumerate()
        .flat_map(|(s, seq)| seq.chars().map(move |c| (s, c)))
        .collect();
    let slots = bases.len() + NICK_GAP * lengths.len();
    let slot_of = |index: usize| index + NICK_GAP * bases[index].0;

    let cx = W * 0.5;
    let cy = H * 0.52;
    let r = W.min(H) * 0.38;
    let palette = options.color_palette;

    let mut doc = Document::new()
        .set("viewBox", (0, 0, W, H))
        .set("width", W)
        .set("height", H)
        .add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", W)
                .set("height", H)
                .set("fill", "#ffffff"),
        );

    if let Some(title) = &options.title {
        doc = doc.add(
            Text::new(title.clone())
                .set("x", 20)
                .set("y", 34)
                .set("font-family", "monospace")
                .set("font-size", 16)
                .set("fill", "#111111"),
        );
    }

    for (x, y) in &pairs {
        let (x1, y1) = pos2xy(slot_of(*x), slots, cx, cy, r);
        let (x2, y2) = pos2xy(slot_of(*y), slots, cx, cy, r);
        doc = doc.add(
            Line::new()
                .set("class", "pair")
                .set("x1", x1)
                .set("y1", y1)
                .set("x2", x2)
                .set("y2", y2)
                .set("stroke", "#555555")
                .set("stroke-width", 1.5),
        );
    }

    let mut start = 0;
    for (strand, len) in lengths.iter().enumerate() {
        if *len == 0 {
            continue;
        }
        let mut data = Data::new().move_to(pos2xy(slot_of(start), slots, cx, cy, r));
        for index in start + 1..start + len {
            data = data.line_to(pos2xy(slot_of(index), slots, cx, cy, r));
        }
        let backbone = match options.render_type {
            RenderType::Strand => palette.strand_color(strand),
            RenderType::Base => "#888888",
        };
        doc = doc.add(
            Path::new()
                .set("class", "backbone")
                .set("d", data)
                .set("fill", "none")
                .set("stroke", backbone)
                .set("stroke-width", 4),
        );
        let (lx, ly) = pos2xy(slot_of(start), slots, cx, cy, r * 1.1);
        doc = doc.add(
            Text::new("5'")
                .set("x", lx)
                .set("y", ly)
                .set("text-anchor", "middle")
                .set("font-family", "monospace")
                .set("font-size", 10)
                .set("fill", "#444444"),
        );
        start += len;
    }

    for (index, (strand, base)) in bases.iter().enumerate() {
        let (x, y) = pos2xy(slot_of(index), slots, cx, cy, r);
        let fill = match options.render_type {
            RenderType::Strand => palette.strand_color(*strand),
            RenderType::Base => palette.base_color(*base),
        };
        doc = doc.add(
            Circle::new()
                .set("cx", x)
                .set("cy", y)
                .set("r", BASE_RADIUS)
                .set("fill", fill)
                .set("stroke", "#333333")
                .set("stroke-width", 0.5),
        );
        if options.show_labels {
            let (lx, ly) = pos2xy(slot_of(index), slots, cx, cy, r * 1.04);
            doc = doc.add(
                Text::new(base.to_string())
                    .set("x", lx)
                    .set("y", ly + 3.0)
                    .set("text-anchor", "middle")
                    .set("font-family", "monospace")
                    .set("font-size", 7)
                    .set("fill", "#111111"),
            );
        }
    }

    Ok(doc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure() {
        let (lengths, pairs) = parse_structure("((.+.))").unwrap();
        assert_eq!(lengths, vec![3, 3]);
        assert_eq!(pairs, vec![(0, 5), (1, 4)]);

        let (_, pairs) = parse_structure("((..[[..))..]]").unwrap();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&(4, 13)));
    }

    #[test]
    fn test_parse_structure_errors() {
        assert_eq!(parse_structure(""), Err(RenderError::Empty));
        assert_eq!(
            parse_structure("(()"),
            Err(RenderError::UnbalancedBracket { position: 0 })
        );
        assert_eq!(
            parse_structure("())"),
            Err(RenderError::UnbalancedBracket { position: 2 })
        );
        assert!(matches!(
            parse_structure("(x)"),
            Err(RenderError::UnexpectedCharacter { character: 'x', .. })
        ));
    }

    #[test]
    fn test_draw_hairpin() {
        let svg = draw_structure("((((....))))", "GGGGAAAACCCC", &DrawOptions::default()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("class=\"pair\"").count(), 4);
        assert_eq!(svg.matches("class=\"backbone\"").count(), 1);
        assert!(svg.contains(PASTEL[0]));
    }

    #[test]
    fn test_draw_complex_with_nick() {
        let options = DrawOptions {
            color_palette: ColorPalette::Bright,
            show_labels: false,
            title: Some("duplex".to_string()),
            ..Default::default()
        };
        let svg = draw_structure("((((+))))", "GGGG+CCCC", &options).unwrap();
        assert_eq!(svg.matches("class=\"backbone\"").count(), 2);
        assert!(svg.contains(BRIGHT[1]));
        assert!(svg.contains("duplex"));
    }

    #[test]
    fn test_base_coloring() {
        let options = DrawOptions {
            render_type: RenderType::Base,
            ..Default::default()
        };
        let svg = draw_structure("....", "ACGT", &options).unwrap();
        assert!(svg.contains(ColorPalette::Pastel.base_color('A')));
        assert!(svg.contains(ColorPalette::Pastel.base_color('G')));
    }

    #[test]
    fn test_options_from_json() {
        let options: DrawOptions =
            serde_json::from_str(r#"{"render_type": "base", "show_labels": false}"#).unwrap();
        assert_eq!(options.render_type, RenderType::Base);
        assert_eq!(options.color_palette, ColorPalette::Pastel);
        assert!(!options.show_labels);
    }

    #[test]
    fn test_draw_rejects_mismatched_input() {
        let options = DrawOptions::default();
        assert_eq!(
            draw_structure("((+))", "GG", &options),
            Err(RenderError::StrandCountMismatch {
                structure: 2,
                sequence: 1
            })
        );
        assert!(matches!(
            draw_structure("((..))", "GGAACCC", &options),
            Err(RenderError::LengthMismatch { strand: 0, .. })
        ));
    }

    #[test]
    #[cfg(feature = "snapshot-tests")]
    #[ignore]
    fn write_snapshots() {
        std::fs::create_dir_all("tests/snapshots").unwrap();
        let hairpin =
            draw_structure("((((....))))", "GGGGAAAACCCC", &DrawOptions::default()).unwrap();
        std::fs::write("tests/snapshots/hairpin.svg", hairpin).unwrap();
        let duplex = draw_structure("((((+))))", "GGGG+CCCC", &DrawOptions::default()).unwrap();
        std::fs::write("tests/snapshots/duplex.svg", duplex).unwrap();
    }
}
