//! Client renderer using crossterm
//!
//! Paints the session to the console:
//!
//! ```text
//! ┌───────────────────────────────┐
//! │ transcript (scrollable)       │
//! │ ...                           │
//! │ 50/100 HP ██████████          │  one row per configured gauge
//! │ midmud | connected            │  status line
//! │ > look                        │  prompt
//! └───────────────────────────────┘
//! ```

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, queue,
    style::{
        Attribute, Color as TermColor, Print, ResetColor, SetAttribute,
        SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use mudplay::config::{Color, ColorScheme};
use mudplay::core::ansi::{ColorSpec, Decorations, Segment, StreamDecoder};
use mudplay::core::gauge::{self, GaugeDef, GaugeReading};
use mudplay::core::input::{InputMode, InputState};
use mudplay::SessionView;

const PROMPT_MARKER: &str = "> ";

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

fn spec_color(spec: ColorSpec) -> TermColor {
    let (r, g, b) = spec.rgb();
    TermColor::Rgb { r, g, b }
}

/// Client renderer
pub struct Renderer {
    /// Whether the terminal has been initialized
    initialized: bool,
    scheme: ColorScheme,
    gauges: Vec<GaugeDef>,
    mask_char: char,
    /// Label shown at the start of the status line
    title: String,
    /// Lines scrolled back from the live bottom of the transcript
    scroll_offset: usize,
    transcript: TranscriptLayout,
}

impl Renderer {
    pub fn new(scheme: ColorScheme, gauges: Vec<GaugeDef>, mask_char: char, title: String) -> Self {
        Self {
            initialized: false,
            scheme,
            gauges,
            mask_char,
            title,
            scroll_offset: 0,
            transcript: TranscriptLayout::new(),
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableBracketedPaste,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;

        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            ResetColor,
            Show,
            EnableLineWrap,
            DisableBracketedPaste,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Render the whole screen
    pub fn render(&mut self, view: &dyn SessionView) -> io::Result<()> {
        let (cols, rows) = Self::size()?;
        let width = cols as usize;
        let chrome = self.gauges.len() + 2;
        let transcript_rows = (rows as usize).saturating_sub(chrome);

        let stdout = io::stdout();
        let mut stdout = io::BufWriter::with_capacity(65536, stdout.lock());

        // Synchronized update so the frame lands at once
        write!(stdout, "\x1b[?2026h")?;
        queue!(stdout, Hide)?;

        // Transcript
        self.transcript.update(view.transcript(), width);
        let lines = self.transcript.lines();
        let max_offset = lines.len().saturating_sub(transcript_rows);
        self.scroll_offset = self.scroll_offset.min(max_offset);
        let end = lines.len() - self.scroll_offset;
        let start = end.saturating_sub(transcript_rows);

        for row in 0..transcript_rows {
            queue!(stdout, MoveTo(0, row as u16), ResetColor, Clear(ClearType::CurrentLine))?;
            if let Some(line) = lines.get(start + row).filter(|_| start + row < end) {
                for segment in line {
                    Self::queue_segment(&mut stdout, segment)?;
                }
                queue!(stdout, SetAttribute(Attribute::Reset), ResetColor)?;
            }
        }

        // Gauges
        let mut row = transcript_rows as u16;
        for gauge_def in &self.gauges {
            queue!(stdout, MoveTo(0, row), ResetColor, Clear(ClearType::CurrentLine))?;
            if let Some(reading) = gauge::project(gauge_def, view.variables()) {
                self.queue_gauge(&mut stdout, gauge_def, &reading, width)?;
            }
            row += 1;
        }

        // Status line
        let status = self.status_text(view);
        queue!(
            stdout,
            MoveTo(0, row),
            SetBackgroundColor(term_color(self.scheme.status_bar_bg)),
            SetForegroundColor(term_color(if view.last_error().is_some() {
                self.scheme.status_error_fg
            } else {
                self.scheme.status_bar_fg
            })),
            Print(pad_to_width(&status, width)),
            ResetColor
        )?;
        row += 1;

        // Prompt
        queue!(stdout, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        if view.status().is_terminal() {
            queue!(
                stdout,
                SetAttribute(Attribute::Dim),
                Print("(input disabled)"),
                SetAttribute(Attribute::Reset)
            )?;
        } else {
            let shown = tail_to_width(
                &prompt_display(view.input(), self.mask_char),
                width.saturating_sub(PROMPT_MARKER.len() + 1),
            );
            queue!(
                stdout,
                SetForegroundColor(term_color(self.scheme.prompt_marker)),
                Print(PROMPT_MARKER),
                SetForegroundColor(term_color(self.scheme.prompt_fg)),
                Print(&shown),
                ResetColor
            )?;
            let cursor_col = (PROMPT_MARKER.len() + shown.width()) as u16;
            queue!(stdout, MoveTo(cursor_col, row), Show)?;
        }

        write!(stdout, "\x1b[?2026l")?;
        stdout.flush()
    }

    fn queue_segment(out: &mut impl Write, segment: &Segment) -> io::Result<()> {
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        if let Some(fg) = segment.foreground {
            queue!(out, SetForegroundColor(spec_color(fg)))?;
        }
        if let Some(bg) = segment.background {
            queue!(out, SetBackgroundColor(spec_color(bg)))?;
        }

        let attributes = [
            (Decorations::BOLD, Attribute::Bold),
            (Decorations::DIM, Attribute::Dim),
            (Decorations::ITALIC, Attribute::Italic),
            (Decorations::UNDERLINE, Attribute::Underlined),
            (Decorations::BLINK, Attribute::SlowBlink),
            (Decorations::INVERSE, Attribute::Reverse),
            (Decorations::HIDDEN, Attribute::Hidden),
            (Decorations::STRIKETHROUGH, Attribute::CrossedOut),
        ];
        for (flag, attribute) in attributes {
            if segment.decorations.contains(flag) {
                queue!(out, SetAttribute(attribute))?;
            }
        }

        queue!(out, Print(&segment.content))
    }

    fn queue_gauge(
        &self,
        out: &mut impl Write,
        gauge_def: &GaugeDef,
        reading: &GaugeReading,
        width: usize,
    ) -> io::Result<()> {
        let label = pad_to_width(&gauge_label(gauge_def, reading), width);
        let filled = (reading.clamped() * width as f64).round() as usize;
        let split = label
            .char_indices()
            .nth(filled)
            .map(|(i, _)| i)
            .unwrap_or(label.len());
        let (bar, rest) = label.split_at(split);

        queue!(
            out,
            SetForegroundColor(term_color(self.scheme.gauge_text)),
            SetBackgroundColor(term_color(Color::for_class(&gauge_def.color_class))),
            Print(bar),
            SetBackgroundColor(term_color(self.scheme.gauge_track)),
            Print(rest),
            ResetColor
        )
    }

    fn status_text(&self, view: &dyn SessionView) -> String {
        let mut status = format!(" {} | {}", printable(&self.title), view.status().label());
        if view.input().mode() == InputMode::Password {
            status.push_str(" | password");
        }
        if self.scroll_offset > 0 {
            status.push_str(&format!(" | scrolled -{}", self.scroll_offset));
        }
        if let Some(error) = view.last_error() {
            status.push_str(" | ");
            status.push_str(&printable(error));
        }
        status
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Transcript broken into screen lines, kept between frames.
///
/// Only chunks that arrived since the last update are decoded; a width
/// change lays the whole transcript out again.
struct TranscriptLayout {
    decoder: StreamDecoder,
    width: Option<usize>,
    /// Number of transcript chunks already laid out
    consumed: usize,
    lines: Vec<Vec<Segment>>,
    /// Display column of the end of the last line
    col: usize,
}

impl TranscriptLayout {
    fn new() -> Self {
        Self {
            decoder: StreamDecoder::new(),
            width: None,
            consumed: 0,
            lines: vec![Vec::new()],
            col: 0,
        }
    }

    fn update(&mut self, chunks: &[String], width: usize) {
        if self.width != Some(width) || chunks.len() < self.consumed {
            *self = Self::new();
            self.width = Some(width);
        }

        for chunk in &chunks[self.consumed..] {
            for segment in self.decoder.feed(chunk) {
                self.push_segment(&segment, width);
            }
        }
        self.consumed = chunks.len();
    }

    fn lines(&self) -> &[Vec<Segment>] {
        &self.lines
    }

    /// Control characters other than newline and tab are not drawn
    fn push_segment(&mut self, segment: &Segment, width: usize) {
        for ch in segment.content.chars() {
            let ch = match ch {
                '\n' => {
                    self.lines.push(Vec::new());
                    self.col = 0;
                    continue;
                }
                '\t' => ' ',
                c if c.is_control() => continue,
                c => c,
            };

            let w = ch.width().unwrap_or(0);
            if width > 0 && self.col + w > width {
                self.lines.push(Vec::new());
                self.col = 0;
            }
            if let Some(line) = self.lines.last_mut() {
                push_styled(line, segment, ch);
            }
            self.col += w;
        }
    }
}

fn push_styled(line: &mut Vec<Segment>, style: &Segment, ch: char) {
    if let Some(last) = line.last_mut() {
        if last.foreground == style.foreground
            && last.background == style.background
            && last.decorations == style.decorations
        {
            last.content.push(ch);
            return;
        }
    }
    line.push(Segment {
        content: ch.to_string(),
        foreground: style.foreground,
        background: style.background,
        decorations: style.decorations,
    });
}

/// Prompt text as shown on screen (masked in password mode)
pub fn prompt_display(input: &InputState, mask_char: char) -> String {
    match input.mode() {
        InputMode::Text => input.current_text().to_string(),
        InputMode::Password => input.current_text().chars().map(|_| mask_char).collect(),
    }
}

/// Drop control characters so server text cannot drive the terminal
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect()
}

/// `current/max name`, the way the browser client labelled gauges
pub fn gauge_label(gauge_def: &GaugeDef, reading: &GaugeReading) -> String {
    format!(
        "{}/{} {}",
        format_number(reading.current),
        format_number(reading.max),
        gauge_def.name
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn pad_to_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

/// Keep the end of `text` that fits in `width` columns
fn tail_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut start = text.len();
    for (i, ch) in text.char_indices().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudplay::core::variables::VariableStore;
    use mudplay::ConnectionStatus;

    fn layout_lines(chunks: &[String], width: usize) -> Vec<Vec<Segment>> {
        let mut layout = TranscriptLayout::new();
        layout.update(chunks, width);
        layout.lines
    }

    struct FakeView {
        status: ConnectionStatus,
        transcript: Vec<String>,
        variables: VariableStore,
        input: InputState,
        last_error: Option<String>,
    }

    impl SessionView for FakeView {
        fn status(&self) -> ConnectionStatus {
            self.status
        }
        fn transcript(&self) -> &[String] {
            &self.transcript
        }
        fn variables(&self) -> &VariableStore {
            &self.variables
        }
        fn input(&self) -> &InputState {
            &self.input
        }
        fn last_error(&self) -> Option<&str> {
            self.last_error.as_deref()
        }
    }

    fn text_of(line: &[Segment]) -> String {
        line.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_layout_splits_lines_and_drops_cr() {
        let chunks = vec!["Hello\r\nWor".to_string(), "ld\r\n".to_string()];
        let lines = layout_lines(&chunks, 80);
        let texts: Vec<String> = lines.iter().map(|l| text_of(l)).collect();
        assert_eq!(texts, vec!["Hello", "World", ""]);
    }

    #[test]
    fn test_layout_wraps_by_width() {
        let lines = layout_lines(&["abcdef".to_string()], 4);
        let texts: Vec<String> = lines.iter().map(|l| text_of(l)).collect();
        assert_eq!(texts, vec!["abcd", "ef"]);
    }

    #[test]
    fn test_layout_keeps_color_across_chunks() {
        let chunks = vec!["\x1b[31mred ".to_string(), "still red\x1b[0m".to_string()];
        let lines = layout_lines(&chunks, 80);
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].content, "red still red");
        assert_eq!(lines[0][0].foreground, Some(ColorSpec::Indexed(1)));
    }

    #[test]
    fn test_layout_skips_stray_escape() {
        let lines = layout_lines(&["a\x1bb".to_string()], 80);
        assert_eq!(text_of(&lines[0]), "ab");
    }

    #[test]
    fn test_layout_update_only_adds_new_chunks() {
        let mut chunks = vec!["\x1b[32mgreen\nwra".to_string()];
        let mut layout = TranscriptLayout::new();
        layout.update(&chunks, 6);
        assert_eq!(layout.consumed, 1);

        chunks.push("pped text\x1b[0m\n".to_string());
        chunks.push("next".to_string());
        layout.update(&chunks, 6);
        assert_eq!(layout.consumed, 3);
        assert_eq!(layout.lines(), layout_lines(&chunks, 6).as_slice());

        let texts: Vec<String> = layout.lines().iter().map(|l| text_of(l)).collect();
        assert_eq!(texts, vec!["green", "wrappe", "d text", "next"]);
        assert_eq!(layout.lines()[2][0].foreground, Some(ColorSpec::Indexed(2)));
    }

    #[test]
    fn test_layout_escape_split_between_chunks() {
        let chunks = vec!["hp \x1b[3".to_string(), "1m10".to_string()];
        let lines = layout_lines(&chunks, 80);
        assert_eq!(text_of(&lines[0]), "hp 10");
        assert_eq!(lines[0][1].foreground, Some(ColorSpec::Indexed(1)));
    }

    #[test]
    fn test_layout_width_change_relays_out() {
        let chunks = vec!["abcdef".to_string()];
        let mut layout = TranscriptLayout::new();
        layout.update(&chunks, 3);
        assert_eq!(layout.lines().len(), 2);

        layout.update(&chunks, 80);
        assert_eq!(layout.lines().len(), 1);
        assert_eq!(text_of(&layout.lines()[0]), "abcdef");
    }

    #[test]
    fn test_status_line_drops_control_chars() {
        let renderer = Renderer::new(ColorScheme::default(), Vec::new(), '*', "mid\x1bmud".to_string());
        let view = FakeView {
            status: ConnectionStatus::Errored,
            transcript: Vec::new(),
            variables: VariableStore::new(),
            input: InputState::new(),
            last_error: Some("disconnected: \x1b[2Jbye\x07".to_string()),
        };

        let status = renderer.status_text(&view);
        assert_eq!(status, " midmud | disconnected | disconnected: [2Jbye");
        assert!(!status.chars().any(char::is_control));
    }

    #[test]
    fn test_prompt_masks_password() {
        let mut input = InputState::new();
        input.set_current_text("hunter2");
        assert_eq!(prompt_display(&input, '*'), "hunter2");

        input.set_mode(InputMode::Password);
        assert_eq!(prompt_display(&input, '*'), "*******");
        // buffer itself is untouched
        assert_eq!(input.current_text(), "hunter2");
    }

    #[test]
    fn test_gauge_label() {
        let gauge_def = GaugeDef {
            name: "HP".to_string(),
            variable_key: "vitals".to_string(),
            current_field: "hp".to_string(),
            max_field: "maxhp".to_string(),
            color_class: "red".to_string(),
        };
        let reading = GaugeReading { current: 50.0, max: 100.0, fraction: 0.5 };
        assert_eq!(gauge_label(&gauge_def, &reading), "50/100 HP");

        let reading = GaugeReading { current: 2.5, max: 10.0, fraction: 0.25 };
        assert_eq!(gauge_label(&gauge_def, &reading), "2.5/10 HP");
    }

    #[test]
    fn test_width_helpers() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("abcdef", 3), "abc");
        assert_eq!(tail_to_width("abcdef", 3), "def");
        assert_eq!(tail_to_width("ab", 3), "ab");
    }
}
