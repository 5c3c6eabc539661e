use crate::config::LogLevel;
use chrono::{DateTime, Local};
use std::fmt::Write;

/// One log record as seen by the formatter
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub time: DateTime<Local>,
    pub name: &'a str,
    pub level: LogLevel,
    pub message: &'a str,
    /// Module path or `tracing` target the record came from
    pub module: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AscTime,
    Name,
    LevelName,
    LevelNo,
    Message,
    Module,
    FileName,
    LineNo,
    ThreadName,
    Process,
}

impl Field {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "asctime" => Field::AscTime,
            "name" => Field::Name,
            "levelname" => Field::LevelName,
            "levelno" => Field::LevelNo,
            "message" => Field::Message,
            "module" => Field::Module,
            "filename" => Field::FileName,
            "lineno" => Field::LineNo,
            "threadName" => Field::ThreadName,
            "process" => Field::Process,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Renders records from a `{token}` layout and a strftime date layout.
///
/// The layout is parsed once. `{{` and `}}` produce literal braces, unknown
/// tokens are kept verbatim.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    format: String,
    date_format: String,
    segments: Vec<Segment>,
}

impl PatternFormatter {
    /// `date_format` must already be a valid chrono strftime layout
    pub fn new(format: &str, date_format: &str) -> Self {
        Self {
            format: format.to_string(),
            date_format: date_format.to_string(),
            segments: parse(format),
        }
    }

    pub fn format_str(&self) -> &str {
        &self.format
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Render one line, newline included
    pub fn format(&self, record: &Record<'_>) -> String {
        let mut out = String::with_capacity(self.format.len() + record.message.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => self.write_field(&mut out, *field, record),
            }
        }

        out.push('\n');
        out
    }

    fn write_field(&self, out: &mut String, field: Field, record: &Record<'_>) {
        // Writing into a String cannot fail
        let _ = match field {
            Field::AscTime => write!(out, "{}", record.time.format(&self.date_format)),
            Field::Name => write!(out, "{}", record.name),
            Field::LevelName => write!(out, "{}", record.level),
            Field::LevelNo => write!(out, "{}", record.level.severity()),
            Field::Message => write!(out, "{}", record.message),
            Field::Module => write!(out, "{}", record.module),
            Field::FileName => write!(out, "{}", record.file.unwrap_or("")),
            Field::LineNo => write!(out, "{}", record.line.unwrap_or(0)),
            Field::ThreadName => {
                let current = std::thread::current();
                match current.name() {
                    Some(name) => write!(out, "{}", name),
                    None => write!(out, "{:?}", current.id()),
                }
            }
            Field::Process => write!(out, "{}", std::process::id()),
        };
    }
}

fn parse(format: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut token = String::new();
                let mut closed = false;
                for t in chars.by_ref() {
                    if t == '}' {
                        closed = true;
                        break;
                    }
                    token.push(t);
                }

                match Field::from_token(&token).filter(|_| closed) {
                    Some(field) => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Field(field));
                    }
                    None => {
                        literal.push('{');
                        literal.push_str(&token);
                        if closed {
                            literal.push('}');
                        }
                    }
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}
