//! Stateful SQL statement splitter (§4.3). Semicolons inside quoted
//! strings, quoted identifiers, dollar-quoted blocks, or comments are
//! literal; everywhere else they terminate a statement.

#[derive(Debug, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    DollarQuoted(String),
    LineComment,
    BlockComment,
}

/// Splits `sql` on statement-terminating semicolons, returning the trimmed,
/// non-empty statements in order. Trailing unterminated text forms one
/// final statement if non-empty.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];

        match &state {
            State::Normal => match ch {
                '\'' => {
                    current.push(ch);
                    state = State::SingleQuoted;
                    index += 1;
                }
                '"' => {
                    current.push(ch);
                    state = State::DoubleQuoted;
                    index += 1;
                }
                '$' => {
                    if let Some(tag_end) = find_dollar_tag_end(&chars, index) {
                        let tag: String = chars[index..=tag_end].iter().collect();
                        current.push_str(&tag);
                        state = State::DollarQuoted(tag);
                        index = tag_end + 1;
                    } else {
                        current.push(ch);
                        index += 1;
                    }
                }
                '-' if chars.get(index + 1) == Some(&'-') => {
                    current.push_str("--");
                    state = State::LineComment;
                    index += 2;
                }
                '/' if chars.get(index + 1) == Some(&'*') => {
                    current.push_str("/*");
                    state = State::BlockComment;
                    index += 2;
                }
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    index += 1;
                }
                _ => {
                    current.push(ch);
                    index += 1;
                }
            },
            State::SingleQuoted => {
                current.push(ch);
                if ch == '\'' {
                    if chars.get(index + 1) == Some(&'\'') {
                        current.push('\'');
                        index += 2;
                        continue;
                    }
                    state = State::Normal;
                }
                index += 1;
            }
            State::DoubleQuoted => {
                current.push(ch);
                if ch == '"' {
                    if chars.get(index + 1) == Some(&'"') {
                        current.push('"');
                        index += 2;
                        continue;
                    }
                    state = State::Normal;
                }
                index += 1;
            }
            State::DollarQuoted(tag) => {
                if ch == '$' {
                    let tag_len = tag.chars().count();
                    let candidate: String = chars[index..(index + tag_len).min(chars.len())].iter().collect();
                    if candidate == *tag {
                        current.push_str(&candidate);
                        index += tag_len;
                        state = State::Normal;
                        continue;
                    }
                }
                current.push(ch);
                index += 1;
            }
            State::LineComment => {
                current.push(ch);
                if ch == '\n' {
                    state = State::Normal;
                }
                index += 1;
            }
            State::BlockComment => {
                current.push(ch);
                if ch == '*' && chars.get(index + 1) == Some(&'/') {
                    current.push('/');
                    index += 2;
                    state = State::Normal;
                    continue;
                }
                index += 1;
            }
        }
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Given `$` at `start`, finds the index of the closing `$` of a `$tag$`
/// opener, or `None` if this isn't a well-formed dollar-quote opener.
fn find_dollar_tag_end(chars: &[char], start: usize) -> Option<usize> {
    let mut index = start + 1;
    while let Some(&ch) = chars.get(index) {
        if ch == '$' {
            return Some(index);
        }
        if !(ch.is_alphanumeric() || ch == '_') {
            return None;
        }
        index += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons_outside_quotes() {
        let stmts = split_statements("SELECT 1; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn semicolon_inside_single_quoted_string_is_literal() {
        let stmts = split_statements("INSERT INTO t (a) VALUES ('x;y');");
        assert_eq!(stmts, vec!["INSERT INTO t (a) VALUES ('x;y')"]);
    }

    #[test]
    fn escaped_single_quote_does_not_end_string() {
        let stmts = split_statements("INSERT INTO t (a) VALUES ('it''s; fine');");
        assert_eq!(stmts, vec!["INSERT INTO t (a) VALUES ('it''s; fine')"]);
    }

    #[test]
    fn dollar_quoted_block_protects_semicolons() {
        let sql = "CREATE FUNCTION f() RETURNS void AS $$ BEGIN SELECT 1; END; $$ LANGUAGE plpgsql;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("BEGIN SELECT 1; END;"));
    }

    #[test]
    fn line_comment_hides_semicolon_until_newline() {
        let stmts = split_statements("SELECT 1; -- comment; still comment\nSELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "-- comment; still comment\nSELECT 2"]);
    }

    #[test]
    fn trailing_unterminated_text_becomes_final_statement() {
        let stmts = split_statements("SELECT 1;\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn empty_input_yields_no_statements() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("   \n  ").is_empty());
    }
}
