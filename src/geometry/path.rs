//! SVG path data: parsing into flattened rings, and writing rings back out
//!
//! Handles the full command set (M L H V C S Q T A Z, absolute and relative,
//! implicit repeats, compact numbers like `1.5.5` or `10-5`). Curves and arcs
//! are flattened into line segments. Every sub-path becomes one ring and is
//! treated as closed whether or not it ends with Z.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt::Write;

use geo_types::{Coord, LineString, MultiPolygon};
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::{map, opt, value};
use nom::multi::count;
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::{IResult, Parser};

use crate::core::error::GeometryError;

/// A closed ring of vertices, without the repeated closing vertex
pub type Ring = Vec<Coord<f64>>;

const COMMANDS: &str = "MmLlHhVvCcSsQqTtAaZz";

fn separator(input: &str) -> IResult<&str, ()> {
    value((), (multispace0, opt(char(',')), multispace0)).parse(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    preceded(separator, double).parse(input)
}

/// Arc flags are single characters and may be packed without separators
fn flag(input: &str) -> IResult<&str, f64> {
    map(preceded(separator, one_of("01")), |c| if c == '1' { 1.0 } else { 0.0 }).parse(input)
}

fn command(input: &str) -> IResult<&str, char> {
    preceded(multispace0, one_of(COMMANDS)).parse(input)
}

/// One full set of arguments for an (upper-cased) command
fn argument_group(input: &str, command: char) -> IResult<&str, Vec<f64>> {
    match command {
        'A' => {
            let (rest, (rx, ry, rotation, large_arc, sweep, x, y)) =
                (number, number, number, flag, flag, number, number).parse(input)?;
            Ok((rest, vec![rx, ry, rotation, large_arc, sweep, x, y]))
        }
        'H' | 'V' => count(number, 1).parse(input),
        'C' => count(number, 6).parse(input),
        'S' | 'Q' => count(number, 4).parse(input),
        _ => count(number, 2).parse(input),
    }
}

fn parse_error(source: &str, rest: &str, reason: &str) -> GeometryError {
    GeometryError::Parse {
        offset: source.len() - rest.len(),
        reason: reason.to_string(),
    }
}

/// Parse path data into flattened rings.
///
/// Rings with fewer than three distinct vertices are dropped; an empty result
/// is not an error here (callers decide what an empty shape means).
pub fn parse_path(d: &str, curve_segments: usize) -> Result<Vec<Ring>, GeometryError> {
    let mut builder = PathBuilder::new(curve_segments.max(1));
    let mut input = d;

    loop {
        if input.trim_start().is_empty() {
            break;
        }

        let (rest, cmd) =
            command(input).map_err(|_| parse_error(d, input.trim_start(), "expected a path command"))?;

        if !builder.started() && !matches!(cmd, 'M' | 'm') {
            return Err(parse_error(d, input.trim_start(), "path must start with a moveto"));
        }

        let upper = cmd.to_ascii_uppercase();
        if upper == 'Z' {
            builder.close();
            input = rest;
            continue;
        }

        let (mut rest, args) = argument_group(rest, upper)
            .map_err(|_| parse_error(d, rest.trim_start(), "missing or malformed arguments"))?;
        if args.iter().any(|v| !v.is_finite()) {
            return Err(parse_error(d, rest, "non-finite coordinate"));
        }
        builder.segment(cmd, &args);

        // Extra argument groups repeat the command; after a moveto they are linetos
        let repeated = match cmd {
            'M' => 'L',
            'm' => 'l',
            other => other,
        };
        while let Ok((next, args)) = argument_group(rest, upper) {
            if args.iter().any(|v| !v.is_finite()) {
                return Err(parse_error(d, rest, "non-finite coordinate"));
            }
            builder.segment(repeated, &args);
            rest = next;
        }

        input = rest;
    }

    Ok(builder.finish())
}

struct PathBuilder {
    segments: usize,
    rings: Vec<Ring>,
    current: Ring,
    cursor: Coord<f64>,
    start: Coord<f64>,
    started: bool,
    last_cubic: Option<Coord<f64>>,
    last_quad: Option<Coord<f64>>,
}

impl PathBuilder {
    fn new(segments: usize) -> Self {
        Self {
            segments,
            rings: Vec::new(),
            current: Vec::new(),
            cursor: Coord { x: 0.0, y: 0.0 },
            start: Coord { x: 0.0, y: 0.0 },
            started: false,
            last_cubic: None,
            last_quad: None,
        }
    }

    fn started(&self) -> bool {
        self.started
    }

    fn segment(&mut self, cmd: char, a: &[f64]) {
        let relative = cmd.is_ascii_lowercase();
        let base = if relative { self.cursor } else { Coord { x: 0.0, y: 0.0 } };
        let pt = |x: f64, y: f64| Coord { x: base.x + x, y: base.y + y };

        let mut cubic = None;
        let mut quad = None;

        match cmd.to_ascii_uppercase() {
            'M' => self.move_to(pt(a[0], a[1])),
            'L' => self.line_to(pt(a[0], a[1])),
            'H' => {
                let x = if relative { self.cursor.x + a[0] } else { a[0] };
                self.line_to(Coord { x, y: self.cursor.y });
            }
            'V' => {
                let y = if relative { self.cursor.y + a[0] } else { a[0] };
                self.line_to(Coord { x: self.cursor.x, y });
            }
            'C' => {
                let c2 = pt(a[2], a[3]);
                self.cubic_to(pt(a[0], a[1]), c2, pt(a[4], a[5]));
                cubic = Some(c2);
            }
            'S' => {
                let c1 = self.reflect(self.last_cubic);
                let c2 = pt(a[0], a[1]);
                self.cubic_to(c1, c2, pt(a[2], a[3]));
                cubic = Some(c2);
            }
            'Q' => {
                let c = pt(a[0], a[1]);
                self.quad_to(c, pt(a[2], a[3]));
                quad = Some(c);
            }
            'T' => {
                let c = self.reflect(self.last_quad);
                self.quad_to(c, pt(a[0], a[1]));
                quad = Some(c);
            }
            'A' => self.arc_to(a[0], a[1], a[2], a[3] != 0.0, a[4] != 0.0, pt(a[5], a[6])),
            _ => {}
        }

        self.last_cubic = cubic;
        self.last_quad = quad;
    }

    fn reflect(&self, control: Option<Coord<f64>>) -> Coord<f64> {
        match control {
            Some(c) => Coord {
                x: 2.0 * self.cursor.x - c.x,
                y: 2.0 * self.cursor.y - c.y,
            },
            None => self.cursor,
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.rings.push(std::mem::take(&mut self.current));
        }
    }

    fn move_to(&mut self, p: Coord<f64>) {
        self.flush();
        self.current.push(p);
        self.start = p;
        self.cursor = p;
        self.started = true;
    }

    fn line_to(&mut self, p: Coord<f64>) {
        // Drawing after a closepath continues from the previous start point
        if self.current.is_empty() {
            self.current.push(self.cursor);
        }
        self.current.push(p);
        self.cursor = p;
    }

    fn close(&mut self) {
        self.flush();
        self.cursor = self.start;
        self.last_cubic = None;
        self.last_quad = None;
    }

    fn cubic_to(&mut self, c1: Coord<f64>, c2: Coord<f64>, end: Coord<f64>) {
        let p0 = self.cursor;
        let n = self.segments;
        for i in 1..n {
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            self.line_to(Coord {
                x: a * p0.x + b * c1.x + c * c2.x + d * end.x,
                y: a * p0.y + b * c1.y + c * c2.y + d * end.y,
            });
        }
        self.line_to(end);
    }

    fn quad_to(&mut self, control: Coord<f64>, end: Coord<f64>) {
        let p0 = self.cursor;
        let n = self.segments;
        for i in 1..n {
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            self.line_to(Coord {
                x: mt * mt * p0.x + 2.0 * mt * t * control.x + t * t * end.x,
                y: mt * mt * p0.y + 2.0 * mt * t * control.y + t * t * end.y,
            });
        }
        self.line_to(end);
    }

    /// Endpoint-parameterized elliptical arc, converted to center form
    fn arc_to(&mut self, rx: f64, ry: f64, rotation_deg: f64, large_arc: bool, sweep: bool, end: Coord<f64>) {
        let start = self.cursor;
        if start == end {
            return;
        }
        let (mut rx, mut ry) = (rx.abs(), ry.abs());
        if rx == 0.0 || ry == 0.0 {
            self.line_to(end);
            return;
        }

        let phi = rotation_deg.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let dx2 = (start.x - end.x) / 2.0;
        let dy2 = (start.y - end.y) / 2.0;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        // Scale radii up when the endpoints cannot be reached
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
        let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let mut coef = if denominator > 0.0 {
            (numerator / denominator).max(0.0).sqrt()
        } else {
            0.0
        };
        if large_arc == sweep {
            coef = -coef;
        }

        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;
        let cx = cos_phi * cxp - sin_phi * cyp + (start.x + end.x) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (start.y + end.y) / 2.0;

        let ux = (x1p - cxp) / rx;
        let uy = (y1p - cyp) / ry;
        let vx = (-x1p - cxp) / rx;
        let vy = (-y1p - cyp) / ry;

        let theta1 = uy.atan2(ux);
        let mut delta = (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
        if !sweep && delta > 0.0 {
            delta -= 2.0 * PI;
        } else if sweep && delta < 0.0 {
            delta += 2.0 * PI;
        }

        let quarters = (delta.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let steps = self.segments * quarters;
        for i in 1..steps {
            let theta = theta1 + delta * (i as f64 / steps as f64);
            let (sin_t, cos_t) = theta.sin_cos();
            self.line_to(Coord {
                x: cx + rx * cos_t * cos_phi - ry * sin_t * sin_phi,
                y: cy + rx * cos_t * sin_phi + ry * sin_t * cos_phi,
            });
        }
        self.line_to(end);
    }

    fn finish(mut self) -> Vec<Ring> {
        self.flush();
        self.rings
            .into_iter()
            .map(clean_ring)
            .filter(|ring| ring.len() >= 3)
            .collect()
    }
}

/// Drop repeated consecutive vertices and the explicit closing vertex
fn clean_ring(ring: Ring) -> Ring {
    let mut cleaned: Ring = Vec::with_capacity(ring.len());
    for c in ring {
        if cleaned.last() != Some(&c) {
            cleaned.push(c);
        }
    }
    while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
        cleaned.pop();
    }
    cleaned
}

/// Write a shape as absolute path data, one closed sub-path per ring
pub fn format_path(shape: &MultiPolygon<f64>, precision: usize) -> String {
    let mut out = String::new();
    for polygon in &shape.0 {
        write_ring(&mut out, polygon.exterior(), precision);
        for hole in polygon.interiors() {
            write_ring(&mut out, hole, precision);
        }
    }
    out
}

fn write_ring(out: &mut String, ring: &LineString<f64>, precision: usize) {
    let mut points: Vec<(String, String)> = Vec::with_capacity(ring.0.len());
    for c in &ring.0 {
        let p = (format_number(c.x, precision), format_number(c.y, precision));
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return;
    }

    for (i, (x, y)) in points.iter().enumerate() {
        let op = if i == 0 { 'M' } else { 'L' };
        let _ = write!(out, "{}{},{}", op, x, y);
    }
    out.push('Z');
}

fn format_number(value: f64, precision: usize) -> String {
    let mut s = format!("{:.*}", precision, value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}
