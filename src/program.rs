//! Instruction-stream interpreter.
//!
//! Parses a line-oriented motion program into a [`MotionTrace`]. The modeled
//! dialect is the small depositing subset the engine cares about:
//!
//! - `G0` / `G1`   rapid vs. linear motion mode (modal)
//! - `M101` / `M103`  extrusion on / off
//! - `S<v>`        feed-velocity scale word, `v / 10` velocity units
//! - `X Y Z <v>`   absolute axis targets (modal); any axis word moves
//! - `F<v>`        path velocity, units/min
//!
//! All other letters are ignored so unmodeled instructions pass through
//! harmlessly, and a malformed token or line is skipped rather than aborting
//! the parse. Comments run from `;` to end of line or sit inside matching
//! parentheses.

use crate::geometry::Point3D;
use crate::trace::{MotionSample, MotionTrace};
use crate::{Error, Result, EPSILON};

/// Feed scale words carry velocity * 10.
const FEED_SCALE_DIVISOR: f64 = 10.0;

/// Path velocities are units/min, trace time is seconds.
const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionMode {
    Rapid,
    Linear,
}

/// One `(letter, value)` word of an instruction line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Token {
    letter: char,
    value: f64,
}

/// Fixed-shape view of one instruction line: one optional slot per
/// recognized letter. Unrecognized letters never reach this struct.
#[derive(Debug, Clone, Copy, Default)]
struct ParsedLine {
    motion_mode: Option<MotionMode>,
    feed_on: Option<bool>,
    feed_scale: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    path_velocity: Option<f64>,
}

impl ParsedLine {
    fn is_motion(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }
}

/// Modal machine state threaded through the fold over program lines.
/// Exists only for the duration of one parse.
#[derive(Debug, Clone)]
struct MachineState {
    position: Point3D,
    feed_velocity: f64,
    path_velocity: f64,
    feed_on: bool,
    mode: MotionMode,
    time: f64,
}

impl MachineState {
    fn new() -> Self {
        Self {
            position: Point3D::origin(),
            feed_velocity: 0.0,
            path_velocity: 0.0,
            feed_on: false,
            mode: MotionMode::Rapid,
            time: 0.0,
        }
    }

    /// Apply one parsed line, emitting a sample if it actually moves.
    ///
    /// A motion line whose target coincides with the current position only
    /// updates modal state; the previous sample already records that
    /// position, so emitting another would seed the trace with zero-length
    /// segments.
    fn apply(&mut self, line: &ParsedLine) -> Option<MotionSample> {
        if let Some(mode) = line.motion_mode {
            self.mode = mode;
        }
        if let Some(on) = line.feed_on {
            self.feed_on = on;
        }
        if let Some(scale) = line.feed_scale {
            self.feed_velocity = scale / FEED_SCALE_DIVISOR;
        }
        if let Some(f) = line.path_velocity {
            self.path_velocity = f;
        }

        if !line.is_motion() {
            return None;
        }

        let target = Point3D::new(
            line.x.unwrap_or(self.position.x),
            line.y.unwrap_or(self.position.y),
            line.z.unwrap_or(self.position.z),
        );

        let distance = (target - self.position).norm();
        if distance <= EPSILON {
            return None;
        }
        if self.path_velocity > EPSILON {
            self.time += distance / self.path_velocity * SECONDS_PER_MINUTE;
        }

        // Only linear moves with the feed running deposit material.
        let deposits = self.feed_on && self.mode == MotionMode::Linear;
        let sample = MotionSample {
            position: target,
            feed_velocity: if deposits { self.feed_velocity } else { 0.0 },
            path_velocity: self.path_velocity,
            time: self.time,
        };

        self.position = target;
        Some(sample)
    }
}

/// Strip `;` line comments and paired-parentheses comments.
///
/// An unmatched `(` swallows the rest of the line; production programs close
/// their parentheses, and a half-stripped comment must never reach the
/// tokenizer.
fn strip_comments(line: &str) -> String {
    let line = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };

    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split a sanitized line into `(letter, value)` tokens.
///
/// A letter whose number fails to parse is dropped; the rest of the line is
/// still scanned.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_uppercase() {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < chars.len()
            && (chars[end].is_ascii_digit()
                || chars[end] == '.'
                || ((chars[end] == '-' || chars[end] == '+') && end == start))
        {
            end += 1;
        }

        let number: String = chars[start..end].iter().collect();
        match number.parse::<f64>() {
            Ok(value) => tokens.push(Token { letter: c, value }),
            Err(_) => log::debug!("skipping malformed token {:?} in {:?}", c, line),
        }

        i = end.max(i + 1);
    }

    tokens
}

/// Fold one line's tokens into the fixed-shape parsed form.
fn parse_line(line: &str) -> ParsedLine {
    let mut parsed = ParsedLine::default();

    for token in tokenize(&strip_comments(line)) {
        match token.letter {
            'G' => match token.value as i64 {
                0 => parsed.motion_mode = Some(MotionMode::Rapid),
                1 => parsed.motion_mode = Some(MotionMode::Linear),
                _ => {}
            },
            'M' => match token.value as i64 {
                101 => parsed.feed_on = Some(true),
                103 => parsed.feed_on = Some(false),
                _ => {}
            },
            'S' => parsed.feed_scale = Some(token.value),
            'X' => parsed.x = Some(token.value),
            'Y' => parsed.y = Some(token.value),
            'Z' => parsed.z = Some(token.value),
            'F' => parsed.path_velocity = Some(token.value),
            // Unmodeled instruction letters pass through.
            _ => {}
        }
    }

    parsed
}

/// Interpret a motion program into a time-ordered trace.
///
/// Every trace opens with a sample at the origin; each motion line emits one
/// more. A program with no motion line at all fails validation.
pub fn parse_program(text: &str) -> Result<MotionTrace> {
    let mut state = MachineState::new();
    let mut samples = vec![MotionSample {
        position: Point3D::origin(),
        feed_velocity: 0.0,
        path_velocity: 0.0,
        time: 0.0,
    }];

    for line in text.lines() {
        let parsed = parse_line(line);
        if let Some(sample) = state.apply(&parsed) {
            samples.push(sample);
        }
    }

    if samples.len() < 2 {
        return Err(Error::Validation(
            "program contains no motion instructions".to_string(),
        ));
    }

    log::info!(
        "interpreted program: {} samples, {:.1}s process time",
        samples.len(),
        state.time
    );

    Ok(MotionTrace::new(samples))
}
