//! Vector figure model.
//!
//! A [`Figure`] is a flat list of drawing operations in a top-left origin
//! coordinate space (100 units per inch). The same figure is written to
//! SVG and replayed into the PDF.

use crate::fonts::FontFace;
use std::fmt::Write as _;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    pub fn from_array(c: [u8; 3]) -> Self {
        Rgb(c[0], c[1], c[2])
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Mix with `other`; `t = 0` keeps `self`, `t = 1` yields `other`.
    pub fn blend(&self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// Channels in 0..=1, as used by PDF color operators.
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Horizontal anchor of a text run relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn svg(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// A single text run. `y` is the baseline; `rotation` is in degrees,
/// counter-clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub size: f64,
    pub color: Rgb,
    pub anchor: Anchor,
    pub rotation: f64,
    pub bold: bool,
}

impl TextRun {
    pub fn face(&self) -> FontFace {
        if self.bold {
            FontFace::HELVETICA_BOLD
        } else {
            FontFace::HELVETICA
        }
    }

    pub fn width(&self) -> f64 {
        self.face().text_width(&self.text, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Rgb,
    },
    /// Open polyline.
    Line {
        points: Vec<(f64, f64)>,
        color: Rgb,
        width: f64,
    },
    /// Closed, filled shape.
    Polygon { points: Vec<(f64, f64)>, fill: Rgb },
    Text(TextRun),
}

/// A chart ready to be persisted or embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: f64,
    pub height: f64,
    pub background: Rgb,
    pub ops: Vec<DrawOp>,
}

impl Figure {
    pub fn new(width: f64, height: f64, background: Rgb) -> Self {
        Self {
            width,
            height,
            background,
            ops: Vec::new(),
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Rgb) {
        if w > 0.0 && h > 0.0 {
            self.ops.push(DrawOp::Rect { x, y, w, h, fill });
        }
    }

    pub fn line(&mut self, points: Vec<(f64, f64)>, color: Rgb, width: f64) {
        if points.len() >= 2 {
            self.ops.push(DrawOp::Line {
                points,
                color,
                width,
            });
        }
    }

    pub fn polygon(&mut self, points: Vec<(f64, f64)>, fill: Rgb) {
        if points.len() >= 3 {
            self.ops.push(DrawOp::Polygon { points, fill });
        }
    }

    pub fn text(&mut self, run: TextRun) {
        if !run.text.is_empty() {
            self.ops.push(DrawOp::Text(run));
        }
    }

    /// Draw `other` scaled uniformly into the box at (`x`, `y`) of size
    /// `w` x `h`, centered along the slack axis.
    pub fn embed(&mut self, other: &Figure, x: f64, y: f64, w: f64, h: f64) {
        let scale = (w / other.width).min(h / other.height);
        let dx = x + (w - other.width * scale) / 2.0;
        let dy = y + (h - other.height * scale) / 2.0;
        let map = |(px, py): (f64, f64)| (dx + px * scale, dy + py * scale);

        self.rect(dx, dy, other.width * scale, other.height * scale, other.background);
        for op in &other.ops {
            let mapped = match op {
                DrawOp::Rect { x, y, w, h, fill } => {
                    let (nx, ny) = map((*x, *y));
                    DrawOp::Rect {
                        x: nx,
                        y: ny,
                        w: w * scale,
                        h: h * scale,
                        fill: *fill,
                    }
                }
                DrawOp::Line {
                    points,
                    color,
                    width,
                } => DrawOp::Line {
                    points: points.iter().copied().map(map).collect(),
                    color: *color,
                    width: width * scale,
                },
                DrawOp::Polygon { points, fill } => DrawOp::Polygon {
                    points: points.iter().copied().map(map).collect(),
                    fill: *fill,
                },
                DrawOp::Text(run) => {
                    let (nx, ny) = map((run.x, run.y));
                    DrawOp::Text(TextRun {
                        x: nx,
                        y: ny,
                        size: run.size * scale,
                        ..run.clone()
                    })
                }
            };
            self.ops.push(mapped);
        }
    }

    /// Serialize as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
            w = num(self.width),
            h = num(self.height)
        );
        let _ = writeln!(
            out,
            r#"<rect width="{}" height="{}" fill="{}"/>"#,
            num(self.width),
            num(self.height),
            self.background.hex()
        );

        for op in &self.ops {
            match op {
                DrawOp::Rect { x, y, w, h, fill } => {
                    let _ = writeln!(
                        out,
                        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                        num(*x),
                        num(*y),
                        num(*w),
                        num(*h),
                        fill.hex()
                    );
                }
                DrawOp::Line {
                    points,
                    color,
                    width,
                } => {
                    let _ = writeln!(
                        out,
                        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round"/>"#,
                        svg_points(points),
                        color.hex(),
                        num(*width)
                    );
                }
                DrawOp::Polygon { points, fill } => {
                    let _ = writeln!(
                        out,
                        r#"<polygon points="{}" fill="{}"/>"#,
                        svg_points(points),
                        fill.hex()
                    );
                }
                DrawOp::Text(run) => {
                    let transform = if run.rotation != 0.0 {
                        format!(
                            r#" transform="rotate({} {} {})""#,
                            num(-run.rotation),
                            num(run.x),
                            num(run.y)
                        )
                    } else {
                        String::new()
                    };
                    let weight = if run.bold { r#" font-weight="bold""# } else { "" };
                    let _ = writeln!(
                        out,
                        r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="{}"{}{}>{}</text>"#,
                        num(run.x),
                        num(run.y),
                        num(run.size),
                        run.color.hex(),
                        run.anchor.svg(),
                        weight,
                        transform,
                        escape_xml(&run.text)
                    );
                }
            }
        }

        out.push_str("</svg>\n");
        out
    }
}

fn num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn svg_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{},{}", num(*x), num(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str) -> TextRun {
        TextRun {
            x: 10.0,
            y: 20.0,
            text: text.to_string(),
            size: 12.0,
            color: Rgb::BLACK,
            anchor: Anchor::Middle,
            rotation: 45.0,
            bold: true,
        }
    }

    #[test]
    fn test_svg_output() {
        let mut fig = Figure::new(200.0, 100.0, Rgb::WHITE);
        fig.rect(0.0, 0.0, 50.0, 25.5, Rgb(255, 0, 0));
        fig.text(label("a < b & c"));
        let svg = fig.to_svg();

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r##"height="25.5" fill="#ff0000""##));
        assert!(svg.contains("a &lt; b &amp; c"));
        assert!(svg.contains("rotate(-45 10 20)"));
        assert!(svg.contains(r#"font-weight="bold""#));
    }

    #[test]
    fn test_degenerate_shapes_are_dropped() {
        let mut fig = Figure::new(10.0, 10.0, Rgb::WHITE);
        fig.rect(0.0, 0.0, 0.0, 5.0, Rgb::BLACK);
        fig.line(vec![(0.0, 0.0)], Rgb::BLACK, 1.0);
        fig.polygon(vec![(0.0, 0.0), (1.0, 1.0)], Rgb::BLACK);
        fig.text(TextRun {
            text: String::new(),
            ..label("x")
        });
        assert!(fig.ops.is_empty());
    }

    #[test]
    fn test_embed_scales_and_centers() {
        let mut inner = Figure::new(100.0, 50.0, Rgb(1, 2, 3));
        inner.rect(10.0, 10.0, 20.0, 20.0, Rgb::BLACK);
        inner.text(label("t"));

        let mut outer = Figure::new(400.0, 400.0, Rgb::WHITE);
        outer.embed(&inner, 0.0, 0.0, 200.0, 200.0);

        // Scale 2, centered vertically: offset 50
        assert_eq!(
            outer.ops[0],
            DrawOp::Rect {
                x: 0.0,
                y: 50.0,
                w: 200.0,
                h: 100.0,
                fill: Rgb(1, 2, 3)
            }
        );
        assert_eq!(
            outer.ops[1],
            DrawOp::Rect {
                x: 20.0,
                y: 70.0,
                w: 40.0,
                h: 40.0,
                fill: Rgb::BLACK
            }
        );
        match &outer.ops[2] {
            DrawOp::Text(run) => assert_eq!(run.size, 24.0),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_blend() {
        assert_eq!(Rgb::BLACK.blend(Rgb::WHITE, 0.5), Rgb(128, 128, 128));
        assert_eq!(Rgb(10, 20, 30).blend(Rgb::WHITE, 0.0), Rgb(10, 20, 30));
        assert_eq!(Rgb::WHITE.hex(), "#ffffff");
    }
}
