//! Colored console lines.
//!
//! Visualizers build [`Line`]s without touching the terminal; [`print_lines`] is the only
//! place where colors reach stdout.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{self, Print, ResetColor, SetForegroundColor},
};
use dotdeps::classify::AssemblySource;

/// Foreground colors used by the console views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Terminal default.
    Default,
    White,
    Gray,
    Green,
    DarkGreen,
    Yellow,
    DarkYellow,
    Red,
    Magenta,
}

impl Color {
    /// The color a node is drawn in, by where it was resolved from.
    pub fn for_source(source: AssemblySource, has_alternative: bool) -> Self {
        match source {
            AssemblySource::NotFound if has_alternative => Color::DarkYellow,
            AssemblySource::NotFound => Color::Red,
            AssemblySource::Local => Color::Green,
            AssemblySource::GlobalCache => Color::Yellow,
            AssemblySource::Unknown => Color::Magenta,
        }
    }

    fn to_crossterm(self) -> Option<style::Color> {
        Some(match self {
            Color::Default => return None,
            Color::White => style::Color::White,
            Color::Gray => style::Color::Grey,
            Color::Green => style::Color::Green,
            Color::DarkGreen => style::Color::DarkGreen,
            Color::Yellow => style::Color::Yellow,
            Color::DarkYellow => style::Color::DarkYellow,
            Color::Red => style::Color::Red,
            Color::Magenta => style::Color::Magenta,
        })
    }
}

/// A run of text in one color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub color: Color,
}

/// One output line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    /// A line holding a single segment.
    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self::new().push(text, color)
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::colored(text, Color::Default)
    }

    /// Appends a segment.
    #[must_use]
    pub fn push(mut self, text: impl Into<String>, color: Color) -> Self {
        self.segments.push(Segment {
            text: text.into(),
            color,
        });
        self
    }

    /// The line without colors.
    pub fn text(&self) -> String {
        self.segments.iter().map(|segment| segment.text.as_str()).collect()
    }
}

/// Writes `lines` to stdout, colored unless `color` is false.
pub fn print_lines(lines: &[Line], color: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_lines(&mut out, lines, color)?;
    out.flush()
}

fn write_lines<W: Write>(out: &mut W, lines: &[Line], color: bool) -> io::Result<()> {
    for line in lines {
        if !color {
            writeln!(out, "{}", line.text())?;
            continue;
        }

        for segment in &line.segments {
            match segment.color.to_crossterm() {
                Some(fg) => queue!(
                    out,
                    SetForegroundColor(fg),
                    Print(&segment.text),
                    ResetColor
                )?,
                None => queue!(out, Print(&segment.text))?,
            }
        }
        queue!(out, Print("\n"))?;
    }
    Ok(())
}
