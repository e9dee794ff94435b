//! HTML utility functions.
//!
//! Provides the small amount of HTML knowledge the serializer and the
//! sanitizer share:
//! - `escape_attr()` / `decode_entities()` - attribute value escaping
//! - `normalize_bare_attrs()` - explicit values for valueless attributes
//! - `is_void_element()` - elements without an end tag (br, img, etc.)
//! - `is_raw_text_element()` - raw text elements (script, style)
//! - `strip_doctype()` - split a leading `<!doctype ...>` off a document

use std::borrow::Cow;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters that require escaping inside a double-quoted attribute value.
const ATTR_ESCAPE_CHARS: [char; 4] = ['<', '>', '&', '"'];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// Escape a decoded attribute value for output inside double quotes.
///
/// # Example
/// ```ignore
/// assert_eq!(escape_attr("a \"b\""), "a &quot;b&quot;");
/// assert_eq!(escape_attr("x & y"), "x &amp; y");
/// assert_eq!(escape_attr("hello"), "hello"); // No allocation
/// ```
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(ATTR_ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Decode character references in an attribute value as read from source.
///
/// Numeric references and the common named ones are decoded; anything else
/// is kept verbatim.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode a reference at the start of `s`, returning the char and the byte
/// length consumed. The trailing `;` is optional on numeric references, as
/// browsers allow.
pub fn decode_reference(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix('&')?;
    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix, skip) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (num, 10, 1),
        };
        let len = digits.chars().take_while(|c| c.is_digit(radix)).count();
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        let semi = usize::from(digits[len..].starts_with(';'));
        return Some((char::from_u32(code)?, 1 + skip + len + semi));
    }

    const NAMED: &[(&str, char)] = &[
        ("amp;", '&'),
        ("lt;", '<'),
        ("gt;", '>'),
        ("quot;", '"'),
        ("apos;", '\''),
        ("nbsp;", '\u{a0}'),
        ("colon;", ':'),
        ("tab;", '\t'),
        ("newline;", '\n'),
    ];
    NAMED.iter().find_map(|(name, c)| {
        body.get(..name.len())
            .filter(|head| head.eq_ignore_ascii_case(name))
            .map(|_| (*c, 1 + name.len()))
    })
}

// =============================================================================
// Valueless Attributes
// =============================================================================

/// Give every valueless attribute in start tags an explicit empty value.
///
/// `tl` misreads the attribute following a valueless one
/// (`<input disabled class="x">` comes back as `lass="x"`), so markup is
/// rewritten to `disabled=""` before it reaches the parser. Comments and the
/// contents of raw text elements are copied untouched.
pub fn normalize_bare_attrs(html: &str) -> Cow<'_, str> {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len() + 16);
    let mut i = 0;

    while let Some(offset) = html[i..].find('<') {
        let lt = i + offset;
        out.push_str(&html[i..lt]);

        if html[lt..].starts_with("<!--") {
            let end = html[lt..].find("-->").map_or(html.len(), |e| lt + e + 3);
            out.push_str(&html[lt..end]);
            i = end;
            continue;
        }
        if !bytes.get(lt + 1).is_some_and(u8::is_ascii_alphabetic) {
            // End tags, doctype, stray `<`.
            out.push('<');
            i = lt + 1;
            continue;
        }
        i = write_start_tag(html, lt, &mut out);
    }
    out.push_str(&html[i..]);

    // Only insertions happen, so equal length means nothing changed.
    if out.len() == html.len() {
        Cow::Borrowed(html)
    } else {
        Cow::Owned(out)
    }
}

fn is_tag_delim(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Copy the start tag opening at `lt`, returns the index after it (and after
/// the contents of a raw text element).
fn write_start_tag(html: &str, lt: usize, out: &mut String) -> usize {
    let bytes = html.as_bytes();
    let mut i = lt + 1;
    while i < bytes.len() && !is_tag_delim(bytes[i]) {
        i += 1;
    }
    let name = html[lt + 1..i].to_ascii_lowercase();
    out.push_str(&html[lt..i]);

    loop {
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        out.push_str(&html[start..i]);
        match bytes.get(i) {
            None => return i,
            Some(b'>') => {
                out.push('>');
                i += 1;
                break;
            }
            Some(_) => {}
        }

        let start = i;
        while i < bytes.len() && !is_tag_delim(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        out.push_str(&html[start..i]);

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            out.push_str("=\"\"");
            continue;
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let end = match bytes.get(j) {
            Some(&quote @ (b'"' | b'\'')) => html[j + 1..]
                .find(char::from(quote))
                .map_or(html.len(), |e| j + 1 + e + 1),
            _ => {
                let mut k = j;
                while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    k += 1;
                }
                k
            }
        };
        out.push_str(&html[i..end]);
        i = end;
    }

    if is_raw_text_element(&name) {
        let close = format!("</{name}");
        let end = html[i..]
            .to_ascii_lowercase()
            .find(&close)
            .map_or(html.len(), |e| i + e);
        out.push_str(&html[i..end]);
        i = end;
    }
    i
}

// =============================================================================
// Element Classification
// =============================================================================

/// Check if an HTML tag is a void element.
///
/// Void elements cannot have children and are written without an end tag.
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Check if tag is a raw text element (content is never markup).
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

// =============================================================================
// Doctype
// =============================================================================

/// Split a leading `<!doctype ...>` declaration off a document.
///
/// Returns `(doctype, rest)`. Leading whitespace before the declaration is
/// skipped; the declaration is returned verbatim.
pub fn strip_doctype(html: &str) -> (Option<&str>, &str) {
    let trimmed = html.trim_start();
    let is_doctype = trimmed
        .get(..9)
        .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype"));
    if !is_doctype {
        return (None, html);
    }
    match trimmed.find('>') {
        Some(end) => (Some(&trimmed[..=end]), &trimmed[end + 1..]),
        None => (None, html),
    }
}

// =============================================================================
// Tests
// =============================================================================
