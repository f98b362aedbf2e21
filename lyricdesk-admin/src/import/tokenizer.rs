//! Quoted CSV tokenizer
//!
//! A two-state scanner (unquoted / quoted) over the input characters:
//! - `"` toggles the quoted state; inside quotes `""` is one literal quote
//! - `,` outside quotes ends a field
//! - `\r`, `\n` or `\r\n` outside quotes ends a field and the row
//! - everything else, including separators inside quotes, is field content
//!
//! Fields are trimmed, rows made only of empty fields are dropped, and
//! whatever is pending at end of input (even inside an unterminated quote)
//! is flushed as the final row. A leading UTF-8 byte-order mark is not part
//! of the first field.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Quoted,
}

/// Split CSV text into rows of trimmed fields
pub fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::Unquoted;
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match (state, c) {
            (State::Quoted, '"') if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            (State::Quoted, '"') => state = State::Unquoted,
            (State::Unquoted, '"') => state = State::Quoted,
            (State::Unquoted, ',') => row.push(finish_field(&mut field)),
            (State::Unquoted, '\r' | '\n') => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(finish_field(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(finish_field(&mut field));
        push_row(&mut rows, row);
    }

    rows
}

fn finish_field(field: &mut String) -> String {
    let value = field.trim().to_string();
    field.clear();
    value
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|f| !f.is_empty()) {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_quoted_comma_and_escaped_quote() {
        assert_eq!(
            parse_csv("a,\"b,c\",d\n1,\"e\"\"f\",2"),
            expect(&[&["a", "b,c", "d"], &["1", "e\"f", "2"]])
        );
    }

    #[test]
    fn test_crlf_is_one_terminator() {
        assert_eq!(parse_csv("a,b\r\nc,d\r\n"), expect(&[&["a", "b"], &["c", "d"]]));
    }

    #[test]
    fn test_bare_cr_and_lf_terminate_rows() {
        assert_eq!(parse_csv("a\rb\nc"), expect(&[&["a"], &["b"], &["c"]]));
    }

    #[test]
    fn test_newline_inside_quotes_is_content() {
        assert_eq!(
            parse_csv("title,lyrics\nSong,\"line one\nline two\""),
            expect(&[&["title", "lyrics"], &["Song", "line one\nline two"]])
        );
    }

    #[test]
    fn test_fields_are_trimmed() {
        assert_eq!(parse_csv("  a ,\tb  \n"), expect(&[&["a", "b"]]));
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        assert_eq!(parse_csv("a,b\n\n,\n  ,  \nc,d\n\n"), expect(&[&["a", "b"], &["c", "d"]]));
    }

    #[test]
    fn test_trailing_empty_field_is_kept() {
        assert_eq!(parse_csv("a,b,\n"), expect(&[&["a", "b", ""]]));
    }

    #[test]
    fn test_unterminated_quote_flushes_at_end() {
        assert_eq!(parse_csv("a,\"open field\nstill open"), expect(&[&["a", "open field\nstill open"]]));
    }

    #[test]
    fn test_leading_byte_order_mark_is_dropped() {
        assert_eq!(
            parse_csv("\u{feff}song_title,artist_name\r\nHello,Adele\r\n"),
            expect(&[&["song_title", "artist_name"], &["Hello", "Adele"]])
        );
        // Only a leading mark is special
        assert_eq!(parse_csv("a,\u{feff}b\n"), expect(&[&["a", "\u{feff}b"]]));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("\n\r\n").is_empty());
    }
}
