//! ANSI escape sequence decoder
//!
//! Splits server text with embedded SGR codes into styled segments.
//! [`decode`] is stateless between calls: every call starts from the default
//! style, so decoding the same input always yields the same segments.
//! [`StreamDecoder`] decodes a transcript chunk by chunk, carrying the style
//! forward.
//!
//! Recognized input:
//!
//! - `ESC [ params m` (SGR) updates the foreground, background and decorations;
//!   `38`/`48` colours may use either `;` or `:` separators
//! - any other well-formed CSI sequence is consumed without output
//!
//! Everything else that starts with `ESC` (a lone escape, an unsupported
//! escape, a CSI sequence cut short) stays in the output as literal text.

use bitflags::bitflags;

const ESC: u8 = 0x1B;

bitflags! {
    /// Text decorations toggled by SGR codes
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Decorations: u8 {
        const BOLD          = 0b0000_0001;
        const DIM           = 0b0000_0010;
        const ITALIC        = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const BLINK         = 0b0001_0000;
        const INVERSE       = 0b0010_0000;
        const HIDDEN        = 0b0100_0000;
        const STRIKETHROUGH = 0b1000_0000;
    }
}

/// A foreground or background colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpec {
    /// Palette index (0-15 basic/bright, 16-255 extended)
    Indexed(u8),
    /// 24-bit colour
    Rgb(u8, u8, u8),
}

/// The 16 basic colours, as painted by the browser client.
const BASIC_PALETTE: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (187, 0, 0),
    (0, 187, 0),
    (187, 187, 0),
    (0, 0, 187),
    (187, 0, 187),
    (0, 187, 187),
    (255, 255, 255),
    (85, 85, 85),
    (255, 85, 85),
    (0, 255, 0),
    (255, 255, 85),
    (85, 85, 255),
    (255, 85, 255),
    (85, 255, 255),
    (255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

impl ColorSpec {
    /// Resolve to an RGB triple using the xterm 256-colour palette
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ColorSpec::Rgb(r, g, b) => (r, g, b),
            ColorSpec::Indexed(n) if n < 16 => BASIC_PALETTE[n as usize],
            ColorSpec::Indexed(n) if n < 232 => {
                let n = n - 16;
                (
                    CUBE_LEVELS[(n / 36) as usize],
                    CUBE_LEVELS[((n / 6) % 6) as usize],
                    CUBE_LEVELS[(n % 6) as usize],
                )
            }
            ColorSpec::Indexed(n) => {
                let level = 8 + (n - 232) * 10;
                (level, level, level)
            }
        }
    }
}

/// A run of text sharing one style
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segment {
    pub content: String,
    pub foreground: Option<ColorSpec>,
    pub background: Option<ColorSpec>,
    pub decorations: Decorations,
}

impl Segment {
    /// Unstyled segment
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        self.foreground.is_none() && self.background.is_none() && self.decorations.is_empty()
    }

    fn same_style(&self, style: &Style) -> bool {
        self.foreground == style.foreground
            && self.background == style.background
            && self.decorations == style.decorations
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Style {
    foreground: Option<ColorSpec>,
    background: Option<ColorSpec>,
    decorations: Decorations,
}

impl Style {
    fn reset(&mut self) {
        *self = Style::default();
    }
}

/// A complete CSI sequence found in the input
struct Csi {
    /// `;`-separated parameters, each with its `:`-separated sub-parameters.
    /// An empty sub-parameter is `None`.
    params: Vec<Vec<Option<u16>>>,
    private: bool,
    has_intermediates: bool,
    final_byte: u8,
    /// Byte offset just past the final byte
    end: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum CsiState {
    Entry,
    Param,
    Intermediate,
}

/// Decode `text` into styled segments.
///
/// Concatenating the `content` of every returned segment gives `text` with the
/// recognized escape sequences removed. Never fails; input with no visible
/// content yields a single empty segment.
pub fn decode(text: &str) -> Vec<Segment> {
    let mut decoder = Decoder::default();
    decoder.run(text);
    decoder.finish()
}

/// Remove recognized escape sequences, keeping only the text
pub fn strip(text: &str) -> String {
    decode(text).into_iter().map(|s| s.content).collect()
}

/// Decoder for text that arrives in chunks.
///
/// Style carries over from one chunk to the next, and an escape sequence cut
/// off at the end of a chunk is held back until the rest of it arrives.
/// Feeding chunks one by one gives the same segments as decoding their
/// concatenation, split at chunk boundaries.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    style: Style,
    pending: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. Returns no segments when the chunk holds no
    /// visible content.
    pub fn feed(&mut self, chunk: &str) -> Vec<Segment> {
        let mut text = std::mem::take(&mut self.pending);
        text.push_str(chunk);
        if let Some(at) = incomplete_tail(text.as_bytes()) {
            // ESC is ASCII, so `at` is a char boundary
            self.pending = text.split_off(at);
        }

        let mut decoder = Decoder {
            style: self.style,
            segments: Vec::new(),
        };
        decoder.run(&text);
        self.style = decoder.style;
        decoder.segments
    }
}

/// Start of a trailing escape sequence that could still become a CSI
fn incomplete_tail(bytes: &[u8]) -> Option<usize> {
    let at = bytes.iter().rposition(|&b| b == ESC)?;
    match bytes.get(at + 1) {
        None => Some(at),
        Some(b'[') => bytes[at + 2..]
            .iter()
            .all(|b| (0x20..=0x3F).contains(b))
            .then_some(at),
        Some(_) => None,
    }
}

#[derive(Default)]
struct Decoder {
    style: Style,
    segments: Vec<Segment>,
}

impl Decoder {
    fn run(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != ESC {
                i += 1;
                continue;
            }

            match parse_csi(bytes, i) {
                Some(csi) => {
                    // ESC and CSI bytes are ASCII, so these offsets are char boundaries
                    self.push_text(&text[literal_start..i]);
                    self.execute_csi(&csi);
                    i = csi.end;
                    literal_start = i;
                }
                None => {
                    // Unrecognized: ESC stays part of the literal run
                    i += 1;
                }
            }
        }

        self.push_text(&text[literal_start..]);
    }

    fn finish(mut self) -> Vec<Segment> {
        if self.segments.is_empty() {
            self.segments.push(Segment::plain(""));
        }
        self.segments
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some(last) = self.segments.last_mut() {
            if last.same_style(&self.style) {
                last.content.push_str(text);
                return;
            }
        }

        self.segments.push(Segment {
            content: text.to_string(),
            foreground: self.style.foreground,
            background: self.style.background,
            decorations: self.style.decorations,
        });
    }

    fn execute_csi(&mut self, csi: &Csi) {
        if csi.final_byte == b'm' && !csi.private && !csi.has_intermediates {
            self.execute_sgr(&csi.params);
        }
        // Cursor movement, erase and the like have no meaning in a transcript
    }

    fn execute_sgr(&mut self, params: &[Vec<Option<u16>>]) {
        if params.is_empty() {
            self.style.reset();
            return;
        }

        let style = &mut self.style;
        let mut iter = params.iter();

        while let Some(group) = iter.next() {
            let param = primary(group);
            let sub = group.get(1..).unwrap_or(&[]);
            match param {
                0 => style.reset(),
                1 => style.decorations |= Decorations::BOLD,
                2 => style.decorations |= Decorations::DIM,
                3 => style.decorations |= Decorations::ITALIC,
                4 => style.decorations |= Decorations::UNDERLINE,
                5 => style.decorations |= Decorations::BLINK,
                7 => style.decorations |= Decorations::INVERSE,
                8 => style.decorations |= Decorations::HIDDEN,
                9 => style.decorations |= Decorations::STRIKETHROUGH,

                22 => style.decorations &= !(Decorations::BOLD | Decorations::DIM),
                23 => style.decorations &= !Decorations::ITALIC,
                24 => style.decorations &= !Decorations::UNDERLINE,
                25 => style.decorations &= !Decorations::BLINK,
                27 => style.decorations &= !Decorations::INVERSE,
                28 => style.decorations &= !Decorations::HIDDEN,
                29 => style.decorations &= !Decorations::STRIKETHROUGH,

                30..=37 => style.foreground = Some(ColorSpec::Indexed((param - 30) as u8)),
                38 => {
                    if let Some(color) = extended_color(sub, &mut iter) {
                        style.foreground = Some(color);
                    }
                }
                39 => style.foreground = None,

                40..=47 => style.background = Some(ColorSpec::Indexed((param - 40) as u8)),
                48 => {
                    if let Some(color) = extended_color(sub, &mut iter) {
                        style.background = Some(color);
                    }
                }
                49 => style.background = None,

                90..=97 => style.foreground = Some(ColorSpec::Indexed((param - 90 + 8) as u8)),
                100..=107 => style.background = Some(ColorSpec::Indexed((param - 100 + 8) as u8)),

                _ => {}
            }
        }
    }
}

fn primary(group: &[Option<u16>]) -> u16 {
    group.first().copied().flatten().unwrap_or(0)
}

/// Read the tail of a `38`/`48` code.
///
/// The colon form carries it in `sub` (`5:n`, `2:r:g:b` or `2:cs:r:g:b` with
/// a colour-space id); the semicolon form takes it from the following
/// parameters (`5;n`, `2;r;g;b`).
fn extended_color<'a>(
    sub: &[Option<u16>],
    params: &mut impl Iterator<Item = &'a Vec<Option<u16>>>,
) -> Option<ColorSpec> {
    if !sub.is_empty() {
        return colon_color(sub);
    }
    let mut values = params.map(|group| primary(group));
    semicolon_color(&mut values)
}

fn colon_color(sub: &[Option<u16>]) -> Option<ColorSpec> {
    let channel = |v: &Option<u16>| u8::try_from(v.unwrap_or(0)).ok();
    match sub {
        [Some(5), Some(n)] => Some(ColorSpec::Indexed(u8::try_from(*n).ok()?)),
        [Some(2), _, r, g, b] | [Some(2), r, g, b] => {
            Some(ColorSpec::Rgb(channel(r)?, channel(g)?, channel(b)?))
        }
        _ => None,
    }
}

fn semicolon_color(iter: &mut impl Iterator<Item = u16>) -> Option<ColorSpec> {
    match iter.next()? {
        5 => {
            let n = u8::try_from(iter.next()?).ok()?;
            Some(ColorSpec::Indexed(n))
        }
        2 => {
            let r = iter.next()?;
            let g = iter.next()?;
            let b = iter.next()?;
            Some(ColorSpec::Rgb(
                u8::try_from(r).ok()?,
                u8::try_from(g).ok()?,
                u8::try_from(b).ok()?,
            ))
        }
        _ => None,
    }
}

/// Try to read a complete `ESC [ ... final` sequence starting at `start`.
///
/// Returns `None` when the bytes do not form one (not a CSI introducer, an
/// invalid byte inside the sequence, or input ending before the final byte).
fn parse_csi(bytes: &[u8], start: usize) -> Option<Csi> {
    if bytes.get(start + 1) != Some(&b'[') {
        return None;
    }

    let mut state = CsiState::Entry;
    let mut params: Vec<Vec<Option<u16>>> = Vec::new();
    let mut group: Vec<Option<u16>> = Vec::new();
    let mut current: Option<u16> = None;
    let mut private = false;
    let mut has_intermediates = false;
    let mut i = start + 2;

    while let Some(&byte) = bytes.get(i) {
        i += 1;
        match (state, byte) {
            (CsiState::Entry | CsiState::Param, b'0'..=b'9') => {
                let digit = (byte - b'0') as u16;
                current = Some(current.unwrap_or(0).saturating_mul(10).saturating_add(digit));
                state = CsiState::Param;
            }
            (CsiState::Entry | CsiState::Param, b';') => {
                group.push(current.take());
                params.push(std::mem::take(&mut group));
                state = CsiState::Param;
            }
            (CsiState::Entry | CsiState::Param, b':') => {
                group.push(current.take());
                state = CsiState::Param;
            }
            (CsiState::Entry, b'?' | b'>' | b'!' | b'=') => {
                private = true;
            }
            (_, 0x20..=0x2F) => {
                close_group(&mut params, &mut group, &mut current);
                has_intermediates = true;
                state = CsiState::Intermediate;
            }
            (_, 0x40..=0x7E) => {
                close_group(&mut params, &mut group, &mut current);
                return Some(Csi {
                    params,
                    private,
                    has_intermediates,
                    final_byte: byte,
                    end: i,
                });
            }
            _ => return None,
        }
    }

    None
}

/// Finish the parameter in progress, if any
fn close_group(
    params: &mut Vec<Vec<Option<u16>>>,
    group: &mut Vec<Option<u16>>,
    current: &mut Option<u16>,
) {
    if current.is_some() || !group.is_empty() {
        group.push(current.take());
        params.push(std::mem::take(group));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_plain_text_is_single_segment() {
        let segments = decode("You are standing in a field.");
        assert_eq!(segments, vec![Segment::plain("You are standing in a field.")]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(""), vec![Segment::plain("")]);
    }

    #[test]
    fn test_color_then_reset() {
        let segments = decode("\x1b[31mhi\x1b[0mthere");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].content, "hi");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Indexed(1)));
        assert!(segments[1].is_plain());
        assert_eq!(segments[1].content, "there");
        assert_eq!(contents(&segments), "hithere");
    }

    #[test]
    fn test_later_color_overrides_earlier() {
        let segments = decode("\x1b[31ma\x1b[32mb");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Indexed(1)));
        assert_eq!(segments[1].foreground, Some(ColorSpec::Indexed(2)));
    }

    #[test]
    fn test_foreground_and_background_are_independent() {
        let segments = decode("\x1b[44mx\x1b[33my\x1b[39mz");
        assert_eq!(segments[0].background, Some(ColorSpec::Indexed(4)));
        assert_eq!(segments[0].foreground, None);
        assert_eq!(segments[1].background, Some(ColorSpec::Indexed(4)));
        assert_eq!(segments[1].foreground, Some(ColorSpec::Indexed(3)));
        assert_eq!(segments[2].background, Some(ColorSpec::Indexed(4)));
        assert_eq!(segments[2].foreground, None);
    }

    #[test]
    fn test_reset_clears_both() {
        let segments = decode("\x1b[1;31;42mloud\x1b[mquiet");
        assert_eq!(segments[0].decorations, Decorations::BOLD);
        assert_eq!(segments[0].background, Some(ColorSpec::Indexed(2)));
        assert!(segments[1].is_plain());
    }

    #[test]
    fn test_extended_colors() {
        let segments = decode("\x1b[38;5;196ma\x1b[48;2;10;20;30mb");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Indexed(196)));
        assert_eq!(segments[1].background, Some(ColorSpec::Rgb(10, 20, 30)));
        assert_eq!(ColorSpec::Indexed(196).rgb(), (255, 0, 0));
        assert_eq!(ColorSpec::Indexed(232).rgb(), (8, 8, 8));
    }

    #[test]
    fn test_colon_extended_colors() {
        let segments = decode("\x1b[38:2::10:20:30ma\x1b[38:2:1:2:3mb\x1b[48:5:17mc");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Rgb(10, 20, 30)));
        assert_eq!(segments[1].foreground, Some(ColorSpec::Rgb(1, 2, 3)));
        assert_eq!(segments[2].background, Some(ColorSpec::Indexed(17)));
    }

    #[test]
    fn test_colon_form_does_not_eat_next_param() {
        // 38:5:n is self contained, so the following 1 is still bold
        let segments = decode("\x1b[38:5:200;1mx");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Indexed(200)));
        assert_eq!(segments[0].decorations, Decorations::BOLD);
    }

    #[test]
    fn test_stream_carries_style_across_chunks() {
        let mut stream = StreamDecoder::new();
        let first = stream.feed("\x1b[31mred ");
        let second = stream.feed("still red\x1b[0m plain");
        assert_eq!(first[0].foreground, Some(ColorSpec::Indexed(1)));
        assert_eq!(second[0].content, "still red");
        assert_eq!(second[0].foreground, Some(ColorSpec::Indexed(1)));
        assert!(second[1].is_plain());
    }

    #[test]
    fn test_stream_holds_split_sequence() {
        let mut stream = StreamDecoder::new();
        assert_eq!(contents(&stream.feed("hp: \x1b[3")), "hp: ");
        let rest = stream.feed("2m50");
        assert_eq!(rest[0].content, "50");
        assert_eq!(rest[0].foreground, Some(ColorSpec::Indexed(2)));
    }

    #[test]
    fn test_stream_keeps_broken_escape_literal() {
        let mut stream = StreamDecoder::new();
        assert_eq!(contents(&stream.feed("a\x1bb")), "a\x1bb");
        assert!(stream.feed("").is_empty());
    }

    #[test]
    fn test_bright_colors() {
        let segments = decode("\x1b[91mwarn");
        assert_eq!(segments[0].foreground, Some(ColorSpec::Indexed(9)));
        assert_eq!(ColorSpec::Indexed(9).rgb(), (255, 85, 85));
    }

    #[test]
    fn test_truncated_sequence_is_literal() {
        let segments = decode("hp: \x1b[3");
        assert_eq!(contents(&segments), "hp: \x1b[3");
        assert!(segments.iter().all(Segment::is_plain));
    }

    #[test]
    fn test_lone_escape_is_literal() {
        assert_eq!(strip("a\x1bb"), "a\x1bb");
        assert_eq!(strip("end\x1b"), "end\x1b");
    }

    #[test]
    fn test_interrupted_sequence_is_literal() {
        // newline is not valid inside a CSI sequence
        let segments = decode("\x1b[31\nred?");
        assert_eq!(contents(&segments), "\x1b[31\nred?");
        assert!(segments[0].is_plain());
    }

    #[test]
    fn test_non_sgr_csi_is_consumed() {
        assert_eq!(strip("\x1b[2J\x1b[Hhello"), "hello");
    }

    #[test]
    fn test_multibyte_text_survives() {
        let segments = decode("\x1b[32mépée\x1b[0m ✓");
        assert_eq!(segments[0].content, "épée");
        assert_eq!(segments[1].content, " ✓");
    }

    #[test]
    fn test_same_style_runs_merge() {
        let segments = decode("\x1b[31ma\x1b[31mb");
        assert_eq!(segments, vec![Segment {
            content: "ab".to_string(),
            foreground: Some(ColorSpec::Indexed(1)),
            ..Segment::default()
        }]);
    }

    #[test]
    fn test_decode_is_repeatable() {
        let input = "\x1b[1;34mThe Inn\x1b[0m\r\nA warm fire.";
        assert_eq!(decode(input), decode(input));
    }
}
