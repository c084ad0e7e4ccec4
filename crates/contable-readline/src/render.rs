//! Terminal rendering for assistant replies, progress and the context panel.

use chrono::{DateTime, NaiveDateTime};
use colored::Colorize;
use contable_core::upload::UploadedFileInfo;
use contable_core::{ProgressState, UserContext};
use pulldown_cmark::{Alignment, Event, HeadingLevel, Options, Parser, Tag};

const BAR_WIDTH: usize = 24;

// Private-use marks around the index of a protected math span.
const MATH_OPEN: char = '\u{E000}';
const MATH_CLOSE: char = '\u{E001}';

/// Renders server markdown (with tables) as colored terminal text.
///
/// Math markup such as `$x^2$` or `\frac{a}{b}` is left as written.
/// Content is untrusted: HTML is printed verbatim, never interpreted, and
/// control characters are dropped before parsing.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let (protected, math) = protect_math(&sanitize(markdown));
    let mut writer = MarkdownWriter {
        math,
        ..MarkdownWriter::default()
    };
    for event in Parser::new_ext(&protected, options) {
        writer.handle(event);
    }
    writer.finish()
}

/// Drops control characters other than newline and tab, so untrusted text
/// cannot smuggle terminal escape sequences.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

/// Replaces `$…$` and `$$…$$` spans with indexed placeholders so the
/// markdown parser never sees their contents.
///
/// Inline `$…$` must close on the same line. Code spans are skipped and an
/// unmatched `$` stays literal.
fn protect_math(markdown: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = markdown.chars().collect();
    let mut out = String::with_capacity(markdown.len());
    let mut spans: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.extend(&chars[i..i + 2]);
                i += 2;
            }
            '`' => {
                let run = run_length(&chars, i, '`');
                let end = find_run(&chars, i + run, '`', run).map_or(i + run, |at| at + run);
                out.extend(&chars[i..end]);
                i = end;
            }
            '$' => {
                let run = run_length(&chars, i, '$').min(2);
                match find_math_close(&chars, i + run, run) {
                    Some(close) => {
                        spans.push(chars[i..close + run].iter().collect());
                        out.push(MATH_OPEN);
                        out.push_str(&(spans.len() - 1).to_string());
                        out.push(MATH_CLOSE);
                        i = close + run;
                    }
                    None => {
                        out.extend(&chars[i..i + run]);
                        i += run;
                    }
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    (out, spans)
}

fn run_length(chars: &[char], from: usize, c: char) -> usize {
    chars[from..].iter().take_while(|&&x| x == c).count()
}

fn find_run(chars: &[char], from: usize, c: char, len: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        if chars[j] == c {
            let run = run_length(chars, j, c);
            if run == len {
                return Some(j);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}

/// Index of the closing delimiter for a math span opened with `run` dollars.
fn find_math_close(chars: &[char], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 2,
            '\n' if run == 1 => return None,
            '$' if run == 1 => return (j > from).then_some(j),
            '$' if chars.get(j + 1) == Some(&'$') => return (j > from).then_some(j),
            _ => j += 1,
        }
    }
    None
}

/// Puts the raw math text back in place of its placeholders.
fn restore_math(text: &str, spans: &[String]) -> String {
    if spans.is_empty() || !text.contains(MATH_OPEN) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(MATH_OPEN) {
        out.push_str(&rest[..open]);
        let after = &rest[open + MATH_OPEN.len_utf8()..];
        let span = after.find(MATH_CLOSE).and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            Some((spans.get(index)?, close))
        });
        match span {
            Some((raw, close)) => {
                out.push_str(raw);
                rest = &after[close + MATH_CLOSE.len_utf8()..];
            }
            None => {
                out.push(MATH_OPEN);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Default)]
struct TableBuffer {
    alignments: Vec<Alignment>,
    head: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    in_head: bool,
}

#[derive(Default)]
struct MarkdownWriter {
    output: String,
    line: String,
    bold: bool,
    italic: bool,
    heading: Option<HeadingLevel>,
    code_block: Option<String>,
    // None for bullets, Some(next number) for ordered lists
    lists: Vec<Option<u64>>,
    table: Option<TableBuffer>,
    math: Vec<String>,
}

impl MarkdownWriter {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                let text = restore_math(&text, &self.math);
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&text);
                } else if let Some(code) = self.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    let styled = self.styled(&text);
                    self.line.push_str(&styled);
                }
            }
            Event::Code(code) => {
                let code = restore_math(&code, &self.math);
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&code);
                } else {
                    self.line.push_str(&code.yellow().to_string());
                }
            }
            Event::Html(html) => {
                let html = restore_math(&html, &self.math);
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&html);
                } else {
                    self.line.push_str(&html);
                }
            }
            Event::SoftBreak => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push(' ');
                } else {
                    self.line.push(' ');
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.output
                    .push_str(&format!("{}\n\n", "─".repeat(40).bright_black()));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(level, _, _) => {
                self.flush_line();
                self.heading = Some(level);
            }
            Tag::Strong => self.bold = true,
            Tag::Emphasis => self.italic = true,
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{next}.");
                        *next += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.line = format!("{}{} ", "  ".repeat(depth), marker);
            }
            Tag::Table(alignments) => {
                self.flush_line();
                self.table = Some(TableBuffer {
                    alignments,
                    ..TableBuffer::default()
                });
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.output.push('\n');
                }
            }
            Tag::Heading(..) => {
                self.flush_line();
                self.output.push('\n');
                self.heading = None;
            }
            Tag::Strong => self.bold = false,
            Tag::Emphasis => self.italic = false,
            Tag::CodeBlock(_) => {
                if let Some(code) = self.code_block.take() {
                    for line in code.lines() {
                        self.output
                            .push_str(&format!("    {}\n", line.bright_cyan()));
                    }
                    self.output.push('\n');
                }
            }
            Tag::Item => self.flush_line(),
            Tag::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.output.push('\n');
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            // header cells may or may not be wrapped in a row
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    if !table.row.is_empty() {
                        table.head = std::mem::take(&mut table.row);
                    }
                    table.in_head = false;
                }
            }
            Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    if table.in_head {
                        table.head = row;
                    } else {
                        table.rows.push(row);
                    }
                }
            }
            Tag::Table(_) => {
                if let Some(table) = self.table.take() {
                    self.output.push_str(&render_table(&table));
                    self.output.push('\n');
                }
            }
            _ => {}
        }
    }

    fn styled(&self, text: &str) -> String {
        if self.heading.is_some() {
            return text.bright_magenta().bold().to_string();
        }
        match (self.bold, self.italic) {
            (true, true) => text.bold().italic().to_string(),
            (true, false) => text.bold().to_string(),
            (false, true) => text.italic().to_string(),
            (false, false) => text.to_string(),
        }
    }

    fn flush_line(&mut self) {
        if !self.line.trim().is_empty() {
            self.output.push_str(self.line.trim_end());
            self.output.push('\n');
        }
        self.line.clear();
    }

    fn finish(mut self) -> String {
        self.flush_line();
        let trimmed = self.output.trim_end_matches('\n').len();
        self.output.truncate(trimmed);
        self.output
    }
}

fn render_table(table: &TableBuffer) -> String {
    let columns = table
        .alignments
        .len()
        .max(table.head.len())
        .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&table.head).chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let border = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}\n", segments.join(mid))
    };

    let format_row = |row: &[String], header: bool| {
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let text = row.get(i).map(String::as_str).unwrap_or("");
                let alignment = table.alignments.get(i).copied().unwrap_or(Alignment::None);
                let padded = pad(text, widths[i], alignment);
                if header {
                    padded.bold().bright_white().to_string()
                } else {
                    padded
                }
            })
            .collect();
        format!("│ {} │\n", cells.join(" │ "))
    };

    let mut out = border("┌", "┬", "┐");
    if !table.head.is_empty() {
        out.push_str(&format_row(&table.head, true));
        out.push_str(&border("├", "┼", "┤"));
    }
    for row in &table.rows {
        out.push_str(&format_row(row, false));
    }
    out.push_str(&border("└", "┴", "┘"));
    out
}

fn pad(text: &str, width: usize, alignment: Alignment) -> String {
    let fill = width.saturating_sub(text.chars().count());
    match alignment {
        Alignment::Right => format!("{}{}", " ".repeat(fill), text),
        Alignment::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
        Alignment::Left | Alignment::None => format!("{}{}", text, " ".repeat(fill)),
    }
}

/// One-line progress indicator, e.g. `🔍 Analizando consulta... [████░░░░] 17%`.
pub fn progress_line(state: &ProgressState) -> String {
    let filled = (state.percent.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH as f64).round() as usize;
    format!(
        "{} {} [{}{}] {:>3}%",
        state.stage.icon(),
        state.stage.label(),
        "█".repeat(filled).bright_green(),
        "░".repeat(BAR_WIDTH - filled).bright_black(),
        state.rounded_percent()
    )
}

/// The "Tu Contexto" panel. Empty contexts render as nothing.
pub fn context_panel(context: &UserContext) -> Option<String> {
    if context.is_empty() {
        return None;
    }
    let mut out = format!("{}\n", "📋 Tu Contexto".bright_yellow().bold());
    for (key, value) in context.display_entries() {
        out.push_str(&format!(
            "  {} {}\n",
            format!("{}:", sanitize(&key)).bright_black(),
            sanitize(&value)
        ));
    }
    Some(out.trim_end().to_string())
}

/// Table of the files the server holds for this session.
pub fn files_table(files: &[UploadedFileInfo]) -> String {
    let rows: Vec<Vec<String>> = files
        .iter()
        .map(|file| {
            vec![
                sanitize(&file.name),
                human_size(file.size),
                sanitize(&file.file_type),
                sanitize(&file.status),
                sanitize(&format_upload_time(&file.upload_time)),
            ]
        })
        .collect();
    render_table(&TableBuffer {
        alignments: vec![
            Alignment::Left,
            Alignment::Right,
            Alignment::Left,
            Alignment::Left,
            Alignment::Left,
        ],
        head: ["Archivo", "Tamaño", "Tipo", "Estado", "Subido"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows,
        ..TableBuffer::default()
    })
    .trim_end()
    .to_string()
}

/// Server timestamps are ISO 8601, with or without an offset.
fn format_upload_time(raw: &str) -> String {
    const SHOWN: &str = "%Y-%m-%d %H:%M";
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return at.format(SHOWN).to_string();
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|at| at.format(SHOWN).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= KIB * KIB {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    } else if bytes_f >= KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}
