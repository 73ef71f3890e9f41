//! Literal- and comment-aware byte scanning
//!
//! The regex-driven passes (structural extraction, condition functions,
//! preprocessing) never parse. They only need to know which bytes are code and
//! which belong to a string, template, regex literal or comment, so that a `}`
//! inside `"a}b"` does not close an object. Everything here works on byte
//! offsets into the original text and never allocates per byte.

use std::ops::Range;

/// Classification of a run of bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A single byte outside any literal or comment
    Code(u8),
    /// String, template or regex literal, delimiters included
    Literal,
    /// Line or block comment
    Comment,
}

/// Iterator over the segments of a text, starting at an arbitrary offset
pub struct Segments<'a> {
    bytes: &'a [u8],
    pos: usize,
    prev_code: Option<u8>,
}

impl<'a> Segments<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::starting_at(text, 0)
    }

    pub fn starting_at(text: &'a str, pos: usize) -> Self {
        Self::over_bytes(text.as_bytes(), pos)
    }

    fn over_bytes(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos,
            prev_code: None,
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = (Range<usize>, Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.bytes;
        let start = self.pos;
        let b = *bytes.get(start)?;
        let next = bytes.get(start + 1).copied();

        let (end, segment) = match b {
            b'"' | b'\'' => (string_end(bytes, start), Segment::Literal),
            b'`' => (
                template_end(bytes, start + 1).unwrap_or(bytes.len()),
                Segment::Literal,
            ),
            b'/' if next == Some(b'/') => (line_comment_end(bytes, start), Segment::Comment),
            b'/' if next == Some(b'*') => (block_comment_end(bytes, start), Segment::Comment),
            b'/' if regex_allowed(self.prev_code) => match regex_end(bytes, start) {
                Some(end) => (end, Segment::Literal),
                None => (start + 1, Segment::Code(b)),
            },
            _ => (start + 1, Segment::Code(b)),
        };

        match segment {
            Segment::Code(c) if !c.is_ascii_whitespace() => self.prev_code = Some(c),
            // Anything after a literal is an operand position: `/` divides.
            Segment::Literal => self.prev_code = Some(b'a'),
            _ => {}
        }

        self.pos = end;
        Some((start..end, segment))
    }
}

/// Whether a `/` following `prev` starts a regex literal rather than a division
fn regex_allowed(prev: Option<u8>) -> bool {
    match prev {
        None => true,
        Some(c) => matches!(
            c,
            b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b';'
                | b'+' | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^'
        ),
    }
}

/// End of a quoted string starting at `start`; unterminated strings stop at the line end
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Nesting frames while skipping a template literal
#[derive(Clone, Copy)]
enum Frame {
    Template,
    /// `${ ... }` with its open brace count
    Substitution(usize),
}

/// End of a template literal whose body starts at `i` (just past the opening backtick)
///
/// `${ ... }` substitutions are skipped as code, so templates nested inside
/// substitutions are handled. Nesting is tracked on an explicit stack and
/// never recurses.
pub(crate) fn template_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut stack = vec![Frame::Template];
    let mut prev_code: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match *stack.last()? {
            Frame::Template => match b {
                b'\\' => i += 2,
                b'`' => {
                    stack.pop();
                    i += 1;
                    if stack.is_empty() {
                        return Some(i);
                    }
                    prev_code = Some(b'a');
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(Frame::Substitution(1));
                    prev_code = Some(b'{');
                    i += 2;
                }
                _ => i += 1,
            },
            Frame::Substitution(depth) => {
                let next = bytes.get(i + 1).copied();
                match b {
                    b'`' => {
                        stack.push(Frame::Template);
                        i += 1;
                    }
                    b'"' | b'\'' => {
                        i = string_end(bytes, i);
                        prev_code = Some(b'a');
                    }
                    b'/' if next == Some(b'/') => i = line_comment_end(bytes, i),
                    b'/' if next == Some(b'*') => i = block_comment_end(bytes, i),
                    b'/' if regex_allowed(prev_code) => match regex_end(bytes, i) {
                        Some(end) => {
                            i = end;
                            prev_code = Some(b'a');
                        }
                        None => {
                            prev_code = Some(b);
                            i += 1;
                        }
                    },
                    b'{' => {
                        if let Some(top) = stack.last_mut() {
                            *top = Frame::Substitution(depth + 1);
                        }
                        prev_code = Some(b);
                        i += 1;
                    }
                    b'}' => {
                        if depth == 1 {
                            stack.pop();
                        } else if let Some(top) = stack.last_mut() {
                            *top = Frame::Substitution(depth - 1);
                        }
                        prev_code = Some(b'a');
                        i += 1;
                    }
                    c => {
                        if !c.is_ascii_whitespace() {
                            prev_code = Some(c);
                        }
                        i += 1;
                    }
                }
            }
        }
    }
    None
}

fn line_comment_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

/// End of a regex literal starting at `start`, flags included; `None` if the
/// slash does not start a well-formed single-line regex
pub(crate) fn regex_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    if matches!(bytes.get(i), Some(b'/') | Some(b'*') | None) {
        return None;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' | b'\r' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => i += 1,
        }
    }
    None
}

fn closing_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        b'(' => Some(b')'),
        _ => None,
    }
}

/// Brace-balance scan: offset of the delimiter closing the one at `open`
///
/// Only the delimiter kind found at `open` is counted, and delimiters inside
/// literals and comments are ignored.
pub fn find_matching(text: &str, open: usize) -> Option<usize> {
    let open_byte = *text.as_bytes().get(open)?;
    let close_byte = closing_for(open_byte)?;
    let mut depth = 0usize;

    for (range, segment) in Segments::starting_at(text, open) {
        match segment {
            Segment::Code(c) if c == open_byte => depth += 1,
            Segment::Code(c) if c == close_byte => {
                depth -= 1;
                if depth == 0 {
                    return Some(range.start);
                }
            }
            _ => {}
        }
    }
    None
}

/// Blank out everything below the first nesting level of a delimited text
///
/// `text` starts with its own opening delimiter. Comments and the contents of
/// nested `{}`/`[]`/`()` are replaced with spaces; nested delimiters themselves
/// stay visible. Byte offsets are preserved, so a match in the masked text
/// indexes the same bytes in the original.
pub fn mask_nested(text: &str) -> String {
    let mut out = text.as_bytes().to_vec();
    let mut depth = 0usize;

    for (range, segment) in Segments::new(text) {
        match segment {
            Segment::Code(c) if matches!(c, b'{' | b'[' | b'(') => {
                if depth >= 2 {
                    blank(&mut out, range);
                }
                depth += 1;
            }
            Segment::Code(c) if matches!(c, b'}' | b']' | b')') => {
                depth = depth.saturating_sub(1);
                if depth >= 2 {
                    blank(&mut out, range);
                }
            }
            Segment::Code(_) | Segment::Literal => {
                if depth >= 2 {
                    blank(&mut out, range);
                }
            }
            Segment::Comment => blank(&mut out, range),
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn blank(buf: &mut [u8], range: Range<usize>) {
    for b in &mut buf[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Where an expression starting at `start` ends
///
/// Stops before a `;`, before a closing delimiter with no matching opener in
/// the scanned range, before a top-level `,` when `stop_at_comma` is set, and at
/// a top-level line break unless the surrounding tokens show the expression
/// continues on the next line.
pub fn expression_end(text: &str, start: usize, stop_at_comma: bool) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut last_code: Option<u8> = None;

    for (range, segment) in Segments::starting_at(text, start) {
        match segment {
            Segment::Code(c) => {
                match c {
                    b'(' | b'[' | b'{' => depth += 1,
                    b')' | b']' | b'}' => {
                        if depth == 0 {
                            return range.start;
                        }
                        depth -= 1;
                    }
                    b';' if depth == 0 => return range.start,
                    b',' if depth == 0 && stop_at_comma => return range.start,
                    b'\n' if depth == 0 => {
                        if !continues_on_next_line(last_code, next_significant(bytes, range.end)) {
                            return range.start;
                        }
                    }
                    _ => {}
                }
                if !c.is_ascii_whitespace() {
                    last_code = Some(c);
                }
            }
            Segment::Literal => last_code = Some(b'"'),
            Segment::Comment => {}
        }
    }
    text.len()
}

fn continues_on_next_line(last: Option<u8>, next: Option<u8>) -> bool {
    let Some(last) = last else {
        return true;
    };
    let Some(next) = next else {
        return false;
    };
    let dangling = matches!(
        last,
        b'=' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'!' | b'<' | b'>'
            | b'?' | b':' | b'.' | b','
    );
    let leading = matches!(
        next,
        b'.' | b'?' | b':' | b'+' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'=' | b'<'
            | b'>'
    );
    dangling || leading
}

/// First byte at or after `i` that is neither whitespace nor part of a comment
pub(crate) fn next_significant(bytes: &[u8], mut i: usize) -> Option<u8> {
    while i < bytes.len() {
        match bytes[i] {
            c if c.is_ascii_whitespace() => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_comment_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            c => return Some(c),
        }
    }
    None
}

/// Remove both comment forms, leaving literals untouched
///
/// A block comment that spans lines is replaced by a line break so that
/// statement boundaries survive.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for (range, segment) in Segments::new(text) {
        if segment != Segment::Comment {
            continue;
        }
        out.push_str(&text[copied..range.start]);
        if text[range.clone()].contains('\n') {
            out.push('\n');
        } else if text[range.clone()].starts_with("/*") {
            out.push(' ');
        }
        copied = range.end;
    }
    out.push_str(&text[copied..]);
    out
}

/// Byte ranges of every literal and comment in `text`, in order
pub fn opaque_spans(text: &str) -> Vec<Range<usize>> {
    Segments::new(text)
        .filter(|(_, segment)| !matches!(segment, Segment::Code(_)))
        .map(|(range, _)| range)
        .collect()
}

/// Whether `pos` falls inside one of the sorted `spans`
pub fn in_spans(spans: &[Range<usize>], pos: usize) -> bool {
    let index = spans.partition_point(|span| span.end <= pos);
    spans.get(index).map_or(false, |span| span.contains(&pos))
}

/// Collapse every run of whitespace to a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
