//! Path engine (component B).
//!
//! A [`Path`] is a finite, ordered sequence of [`Segment`]s built with a
//! stateful builder API, then finalized and initialized into a form that
//! supports constant-amortized evaluation at an arbitrary normalized arc
//! length. See the module-level invariants in the design notes: consecutive
//! segments within a sub-path share endpoints unless flagged `NEW_ORIGIN`,
//! `close()` appends a line back to the sub-path's origin and flags it
//! `CLOSING`, and a sub-path that neither closes nor is followed by a move
//! is flagged `OPEN_END`.

use crate::error::{EngineError, Result};
use crate::math::{self, Vec3};
use bitflags::bitflags;
use std::cell::Cell;

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct SegmentFlags: u8 {
        const NEW_ORIGIN = 0b0000_0001;
        const CLOSING    = 0b0000_0010;
        const OPEN_END   = 0b0000_0100;
    }
}

/// Power-basis (non-Bezier) form of a cubic curve, one set of coefficients
/// per component: `a*t^3 + b*t^2 + c*t + d`. Lines and quadratics are
/// represented with their leading coefficients zeroed so evaluation is a
/// single, branch-free code path.
#[derive(Copy, Clone, Debug)]
pub struct CubicPoly {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub d: Vec3,
}

impl CubicPoly {
    pub fn eval(&self, t: f32) -> Vec3 {
        [
            math::poly3(self.a[0], self.b[0], self.c[0], self.d[0], t),
            math::poly3(self.a[1], self.b[1], self.c[1], self.d[1], t),
            math::poly3(self.a[2], self.b[2], self.c[2], self.d[2], t),
        ]
    }

    fn line(p0: Vec3, p1: Vec3) -> CubicPoly {
        CubicPoly {
            a: [0.0; 3],
            b: [0.0; 3],
            c: math::vec3_sub(p1, p0),
            d: p0,
        }
    }

    fn quadratic(p0: Vec3, p1: Vec3, p2: Vec3) -> CubicPoly {
        let b = math::vec3_add(math::vec3_sub(p0, math::vec3_scale(p1, 2.0)), p2);
        let c = math::vec3_scale(math::vec3_sub(p1, p0), 2.0);
        CubicPoly {
            a: [0.0; 3],
            b,
            c,
            d: p0,
        }
    }

    fn cubic(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> CubicPoly {
        // Standard change of basis from Bezier control points to power basis.
        let a = math::vec3_add(
            math::vec3_sub(p3, math::vec3_scale(p2, 3.0)),
            math::vec3_sub(math::vec3_scale(p1, 3.0), p0),
        );
        let b = math::vec3_sub(
            math::vec3_scale(p2, 3.0),
            math::vec3_sub(math::vec3_scale(p1, 6.0), math::vec3_scale(p0, 3.0)),
        );
        let c = math::vec3_scale(math::vec3_sub(p1, p0), 3.0);
        CubicPoly { a, b, c, d: p0 }
    }
}

/// A single line or Bezier curve piece of a path.
#[derive(Clone, Debug)]
pub struct Segment {
    pub degree: u8,
    pub control_points: Vec<Vec3>,
    pub flags: SegmentFlags,
    poly: Option<CubicPoly>,
    step_start: usize,
    time_scale: f32,
}

impl Segment {
    fn start(&self) -> Vec3 {
        self.control_points[0]
    }

    fn end(&self) -> Vec3 {
        *self.control_points.last().unwrap()
    }

    fn derive_polynomial(&mut self) {
        self.poly = Some(match self.degree {
            1 => CubicPoly::line(self.control_points[0], self.control_points[1]),
            2 => CubicPoly::quadratic(
                self.control_points[0],
                self.control_points[1],
                self.control_points[2],
            ),
            3 => CubicPoly::cubic(
                self.control_points[0],
                self.control_points[1],
                self.control_points[2],
                self.control_points[3],
            ),
            _ => unreachable!("segment degree is constructed as 1, 2 or 3"),
        });
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PathState {
    Default,
    Finalized,
    Initialized,
}

struct StepPoint {
    segment: usize,
    pos: Vec3,
    /// Set on a segment's explicit `t=1` sample (emitted only at a sub-path's
    /// last segment or the path's last segment): the arc from this point to
    /// the next contributes no distance, since it only exists to close out
    /// the sub-path rather than to measure a real step.
    discontinuity: bool,
}

/// A finite, ordered sequence of line/Bezier segments with arc-length
/// reparameterized evaluation.
pub struct Path {
    segments: Vec<Segment>,
    state: PathState,

    // construction-only bookkeeping.
    cursor: Vec3,
    subpath_origin: Vec3,
    has_open_subpath: bool,

    // populated by `init`.
    steps_dist: Vec<f32>,
    arc_to_segment: Vec<usize>,
    cached_arc: Cell<usize>,
}

impl Default for Path {
    fn default() -> Self {
        Path::new()
    }
}

impl Path {
    pub fn new() -> Path {
        Path {
            segments: Vec::new(),
            state: PathState::Default,
            cursor: [0.0, 0.0, 0.0],
            subpath_origin: [0.0, 0.0, 0.0],
            has_open_subpath: false,
            steps_dist: Vec::new(),
            arc_to_segment: Vec::new(),
            cached_arc: Cell::new(0),
        }
    }

    pub fn state(&self) -> PathState {
        self.state
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn require_default(&self) -> Result<()> {
        if self.state != PathState::Default {
            log::error!("path builder method called outside Default state");
            return Err(EngineError::InvalidUsage);
        }
        Ok(())
    }

    fn push_segment(&mut self, degree: u8, control_points: Vec<Vec3>, new_origin: bool) {
        let mut flags = SegmentFlags::empty();
        if new_origin || !self.has_open_subpath {
            flags |= SegmentFlags::NEW_ORIGIN;
            self.subpath_origin = control_points[0];
        }
        self.cursor = *control_points.last().unwrap();
        self.has_open_subpath = true;
        self.segments.push(Segment {
            degree,
            control_points,
            flags,
            poly: None,
            step_start: 0,
            time_scale: 1.0,
        });
    }

    /// Opens a new sub-path at `p`. Does not itself append a segment; the
    /// next drawing call starts the sub-path and is flagged `NEW_ORIGIN`.
    pub fn move_to(&mut self, p: Vec3) {
        self.cursor = p;
        self.subpath_origin = p;
        self.has_open_subpath = false;
    }

    pub fn line_to(&mut self, p: Vec3) -> Result<()> {
        self.require_default()?;
        if p == self.cursor {
            return Ok(());
        }
        let new_origin = !self.has_open_subpath;
        let start = self.cursor;
        self.push_segment(1, vec![start, p], new_origin);
        Ok(())
    }

    pub fn bezier2_to(&mut self, ctl: Vec3, p: Vec3) -> Result<()> {
        self.require_default()?;
        if p == self.cursor && ctl == self.cursor {
            return Ok(());
        }
        let new_origin = !self.has_open_subpath;
        let start = self.cursor;
        self.push_segment(2, vec![start, ctl, p], new_origin);
        Ok(())
    }

    pub fn bezier3_to(&mut self, ctl0: Vec3, ctl1: Vec3, p: Vec3) -> Result<()> {
        self.require_default()?;
        if p == self.cursor && ctl0 == self.cursor && ctl1 == self.cursor {
            return Ok(());
        }
        let new_origin = !self.has_open_subpath;
        let start = self.cursor;
        self.push_segment(3, vec![start, ctl0, ctl1, p], new_origin);
        Ok(())
    }

    /// Appends a line from the cursor back to the current sub-path's
    /// origin, flagged `CLOSING`.
    pub fn close(&mut self) -> Result<()> {
        self.require_default()?;
        if !self.has_open_subpath {
            return Ok(());
        }
        let start = self.cursor;
        let origin = self.subpath_origin;
        if start != origin {
            self.segments.push(Segment {
                degree: 1,
                control_points: vec![start, origin],
                flags: SegmentFlags::CLOSING,
                poly: None,
                step_start: 0,
                time_scale: 1.0,
            });
        } else if let Some(last) = self.segments.last_mut() {
            last.flags |= SegmentFlags::CLOSING;
        }
        self.cursor = origin;
        self.has_open_subpath = false;
        Ok(())
    }

    /// Splices another path's segments into this one. Only valid while
    /// both paths are in the `Default` state.
    pub fn add_path(&mut self, other: &Path) -> Result<()> {
        self.require_default()?;
        if other.state != PathState::Default {
            return Err(EngineError::InvalidUsage);
        }
        for seg in &other.segments {
            self.segments.push(seg.clone());
        }
        if let Some(last) = other.segments.last() {
            self.cursor = last.end();
            self.has_open_subpath = true;
        }
        Ok(())
    }

    /// Premultiplies every control point by `m`. Allowed in `Default` or
    /// `Finalized` state; forbidden once `Initialized` (the cached
    /// polynomials and arc-length table would go stale).
    pub fn transform(&mut self, m: &math::Mat4) -> Result<()> {
        if self.state == PathState::Initialized {
            return Err(EngineError::InvalidUsage);
        }
        for seg in &mut self.segments {
            for p in &mut seg.control_points {
                let v = math::mat4_mul_vec4(m, [p[0], p[1], p[2], 1.0]);
                *p = [v[0], v[1], v[2]];
            }
        }
        self.cursor = {
            let v = math::mat4_mul_vec4(m, [self.cursor[0], self.cursor[1], self.cursor[2], 1.0]);
            [v[0], v[1], v[2]]
        };
        Ok(())
    }

    /// Flags the last segment of each sub-path appropriately (`OPEN_END`
    /// when neither closed nor followed by a move before path end), and
    /// moves the path to `Finalized`.
    pub fn finalize(&mut self) -> Result<()> {
        self.require_default()?;
        let mut subpath_start = 0usize;
        for i in 0..self.segments.len() {
            let is_last_of_path = i + 1 == self.segments.len();
            let next_is_new_origin = self
                .segments
                .get(i + 1)
                .map(|s| s.flags.contains(SegmentFlags::NEW_ORIGIN))
                .unwrap_or(true);
            if self.segments[i].flags.contains(SegmentFlags::NEW_ORIGIN) {
                subpath_start = i;
            }
            let _ = subpath_start;
            if !self.segments[i].flags.contains(SegmentFlags::CLOSING)
                && (is_last_of_path || next_is_new_origin)
            {
                self.segments[i].flags |= SegmentFlags::OPEN_END;
            }
        }
        self.state = PathState::Finalized;
        Ok(())
    }

    /// Derives polynomials and builds the arc-length lookup table.
    /// `precision` is the number of samples per curve segment (`>= 1`).
    pub fn init(&mut self, precision: u32) -> Result<()> {
        if self.state == PathState::Default {
            self.finalize()?;
        }
        if self.state != PathState::Finalized {
            return Err(EngineError::InvalidUsage);
        }
        if self.segments.is_empty() {
            return Err(EngineError::InvalidArg);
        }
        if precision < 1 {
            return Err(EngineError::InvalidArg);
        }

        for seg in &mut self.segments {
            seg.derive_polynomial();
        }

        // Builds a temporary lookup table of steps (points on the curve),
        // one per segment fraction, used to estimate the growing distance
        // along the path. A segment only samples its own `t` in
        // `[0, 1)` (P points for P = precision, or 1 for a line) because its
        // `t=1` sample is identical to the next segment's `t=0` sample and
        // would otherwise be stored twice. The two exceptions — the path's
        // very last segment, and any segment immediately before a sub-path
        // boundary (`NEW_ORIGIN`) — have no following segment to supply
        // that shared point, so their `t=1` sample is appended explicitly,
        // flagged so it contributes no distance of its own.
        let mut points: Vec<StepPoint> = Vec::new();
        let n_segments = self.segments.len();

        for seg_idx in 0..n_segments {
            let is_curve = self.segments[seg_idx].degree != 1;
            let segment_precision = if is_curve { precision } else { 1 };
            let time_scale = 1.0 / segment_precision as f32;
            self.segments[seg_idx].step_start = points.len();
            self.segments[seg_idx].time_scale = time_scale;

            let poly = *self.segments[seg_idx].poly.as_ref().unwrap();
            for k in 0..segment_precision {
                let t = k as f32 * time_scale;
                points.push(StepPoint { segment: seg_idx, pos: poly.eval(t), discontinuity: false });
            }

            let next_is_new_origin = self
                .segments
                .get(seg_idx + 1)
                .map(|s| s.flags.contains(SegmentFlags::NEW_ORIGIN))
                .unwrap_or(true);
            if seg_idx == n_segments - 1 || next_is_new_origin {
                points.push(StepPoint { segment: seg_idx, pos: poly.eval(1.0), discontinuity: true });
            }
        }

        let mut total = 0.0f32;
        let mut dists = vec![0.0f32; points.len()];
        for i in 1..points.len() {
            if !points[i - 1].discontinuity {
                total += math::vec3_length(math::vec3_sub(points[i].pos, points[i - 1].pos));
            }
            dists[i] = total;
        }

        let scale = if total > 0.0 { 1.0 / total } else { 0.0 };
        for d in &mut dists {
            *d *= scale;
        }

        self.steps_dist = dists;
        self.arc_to_segment = points[..points.len() - 1].iter().map(|p| p.segment).collect();
        self.cached_arc.set(0);
        self.state = PathState::Initialized;
        Ok(())
    }

    fn local_t(&self, seg: &Segment, point_index: usize) -> f32 {
        if point_index <= seg.step_start {
            0.0
        } else {
            (point_index - seg.step_start) as f32 * seg.time_scale
        }
    }

    /// Evaluates the path at a normalized arc-length distance `d in [0,1]`.
    ///
    /// Must only be called after `init`; calling it beforehand is a
    /// programming error.
    pub fn evaluate(&self, d: f32) -> Vec3 {
        assert_eq!(
            self.state,
            PathState::Initialized,
            "Path::evaluate called before init"
        );
        let d = d.clamp(0.0, 1.0);
        let last_arc = self.arc_to_segment.len() - 1;

        let mut idx = self.cached_arc.get().min(last_arc);
        let in_range = |i: usize| self.steps_dist[i] <= d && d <= self.steps_dist[i + 1];
        if !in_range(idx) {
            if idx < last_arc && d >= self.steps_dist[idx] {
                while idx < last_arc && self.steps_dist[idx + 1] < d {
                    idx += 1;
                }
            } else {
                idx = match self.steps_dist[..=last_arc + 1]
                    .binary_search_by(|probe| probe.partial_cmp(&d).unwrap())
                {
                    Ok(i) => i,
                    Err(i) => i.saturating_sub(1),
                };
                idx = idx.min(last_arc);
            }
        }
        self.cached_arc.set(idx);

        let seg_idx = self.arc_to_segment[idx];
        let seg = &self.segments[seg_idx];
        let d0 = self.steps_dist[idx];
        let d1 = self.steps_dist[idx + 1];
        let t0 = self.local_t(seg, idx);
        let t1 = self.local_t(seg, idx + 1);
        let ratio = math::linear_norm(d, d0, d1);
        let t = math::mix(t0, t1, ratio);
        seg.poly.as_ref().unwrap().eval(t)
    }

    /// Parses an SVG path mini-language string (`M m L l H h V v Q q C c Z
    /// z`). `S/T/A` commands report [`EngineError::Unsupported`];
    /// malformed input fails with [`EngineError::InvalidData`].
    pub fn add_svg_path(&mut self, s: &str) -> Result<()> {
        self.require_default()?;
        let mut parser = SvgPathParser::new(s);
        parser.run(self)
    }
}

struct SvgPathParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> SvgPathParser<'a> {
    fn new(s: &'a str) -> Self {
        SvgPathParser {
            chars: s.chars().peekable(),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            self.chars.next();
        }
    }

    fn peek_command(&mut self) -> Option<char> {
        self.skip_separators();
        self.chars.peek().copied()
    }

    fn next_number(&mut self) -> Result<f32> {
        self.skip_separators();
        let mut buf = String::new();
        if matches!(self.chars.peek(), Some('+') | Some('-')) {
            buf.push(self.chars.next().unwrap());
        }
        let mut seen_digit = false;
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
            buf.push(self.chars.next().unwrap());
            seen_digit = true;
        }
        if matches!(self.chars.peek(), Some('.')) {
            buf.push(self.chars.next().unwrap());
            while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
                buf.push(self.chars.next().unwrap());
                seen_digit = true;
            }
        }
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            buf.push(self.chars.next().unwrap());
            if matches!(self.chars.peek(), Some('+') | Some('-')) {
                buf.push(self.chars.next().unwrap());
            }
            while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
                buf.push(self.chars.next().unwrap());
            }
        }
        if !seen_digit {
            return Err(EngineError::InvalidData);
        }
        buf.parse::<f32>().map_err(|_| EngineError::InvalidData)
    }

    fn next_point(&mut self) -> Result<(f32, f32)> {
        let x = self.next_number()?;
        let y = self.next_number()?;
        Ok((x, y))
    }

    fn run(&mut self, path: &mut Path) -> Result<()> {
        let mut cursor = (0.0f32, 0.0f32);
        let mut subpath_start = (0.0f32, 0.0f32);
        let mut cmd: Option<char> = None;

        loop {
            let Some(c) = self.peek_command() else {
                break;
            };
            if c.is_ascii_alphabetic() {
                self.chars.next();
                cmd = Some(c);
            }
            let Some(cmd) = cmd else {
                return Err(EngineError::InvalidData);
            };

            match cmd {
                'M' | 'm' => {
                    let (x, y) = self.next_point()?;
                    let p = if cmd == 'm' {
                        (cursor.0 + x, cursor.1 + y)
                    } else {
                        (x, y)
                    };
                    cursor = p;
                    subpath_start = p;
                    path.move_to([p.0, p.1, 0.0]);
                }
                'L' | 'l' => {
                    let (x, y) = self.next_point()?;
                    let p = if cmd == 'l' {
                        (cursor.0 + x, cursor.1 + y)
                    } else {
                        (x, y)
                    };
                    cursor = p;
                    path.line_to([p.0, p.1, 0.0])?;
                }
                'H' | 'h' => {
                    let x = self.next_number()?;
                    let p = if cmd == 'h' { (cursor.0 + x, cursor.1) } else { (x, cursor.1) };
                    cursor = p;
                    path.line_to([p.0, p.1, 0.0])?;
                }
                'V' | 'v' => {
                    let y = self.next_number()?;
                    let p = if cmd == 'v' { (cursor.0, cursor.1 + y) } else { (cursor.0, y) };
                    cursor = p;
                    path.line_to([p.0, p.1, 0.0])?;
                }
                'Q' | 'q' => {
                    let (cx, cy) = self.next_point()?;
                    let (x, y) = self.next_point()?;
                    let (ctl, p) = if cmd == 'q' {
                        ((cursor.0 + cx, cursor.1 + cy), (cursor.0 + x, cursor.1 + y))
                    } else {
                        ((cx, cy), (x, y))
                    };
                    cursor = p;
                    path.bezier2_to([ctl.0, ctl.1, 0.0], [p.0, p.1, 0.0])?;
                }
                'C' | 'c' => {
                    let (c0x, c0y) = self.next_point()?;
                    let (c1x, c1y) = self.next_point()?;
                    let (x, y) = self.next_point()?;
                    let (ctl0, ctl1, p) = if cmd == 'c' {
                        (
                            (cursor.0 + c0x, cursor.1 + c0y),
                            (cursor.0 + c1x, cursor.1 + c1y),
                            (cursor.0 + x, cursor.1 + y),
                        )
                    } else {
                        ((c0x, c0y), (c1x, c1y), (x, y))
                    };
                    cursor = p;
                    path.bezier3_to(
                        [ctl0.0, ctl0.1, 0.0],
                        [ctl1.0, ctl1.1, 0.0],
                        [p.0, p.1, 0.0],
                    )?;
                }
                'Z' | 'z' => {
                    path.close()?;
                    cursor = subpath_start;
                }
                'S' | 's' | 'T' | 't' | 'A' | 'a' => {
                    return Err(EngineError::Unsupported);
                }
                _ => return Err(EngineError::InvalidData),
            }
        }
        Ok(())
    }
}
