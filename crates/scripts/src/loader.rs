use crate::error::ScriptsError;
use core_types::{ScriptFile, SubstitutionMode};
use std::fs;

/// Appended after every line when a script is reassembled.
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Turns a script file into the text sent to the database.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    comment_marker: String,
    placeholder: String,
    schema_name: String,
    mode: SubstitutionMode,
}

impl ScriptLoader {
    pub fn new(
        comment_marker: impl Into<String>,
        placeholder: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            comment_marker: comment_marker.into(),
            placeholder: placeholder.into(),
            schema_name: schema_name.into(),
            mode: SubstitutionMode::Literal,
        }
    }

    pub fn with_mode(mut self, mode: SubstitutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reads `script` as UTF-8 and transforms it.
    pub fn load(&self, script: &ScriptFile) -> Result<String, ScriptsError> {
        let bytes = fs::read(script.path()).map_err(|source| ScriptsError::Read {
            path: script.path().to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|source| ScriptsError::Encoding {
            path: script.path().to_path_buf(),
            source,
        })?;
        Ok(self.transform(&text))
    }

    /// Comment stripping followed by placeholder substitution.
    pub fn transform(&self, text: &str) -> String {
        self.substitute(&self.strip_comments(text))
    }

    /// Truncates each line at the first comment marker and rejoins the lines,
    /// each followed by `LINE_SEPARATOR`. Lines end at `\n`, `\r\n` or a lone `\r`.
    pub fn strip_comments(&self, text: &str) -> String {
        let mut sql = String::with_capacity(text.len());
        for line in split_lines(text) {
            let kept = match line.find(&self.comment_marker) {
                Some(at) => &line[..at],
                None => line,
            };
            sql.push_str(kept);
            sql.push_str(LINE_SEPARATOR);
        }
        sql
    }

    pub fn substitute(&self, text: &str) -> String {
        match self.mode {
            // Blind replacement: `my_schema_name_x` is rewritten too.
            SubstitutionMode::Literal => text.replace(&self.placeholder, &self.schema_name),
            SubstitutionMode::Word => replace_words(text, &self.placeholder, &self.schema_name),
        }
    }
}

/// Like `str::lines`, but a lone `\r` also ends a line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let (line, tail) = match rest.find(['\r', '\n']) {
            Some(at) if rest[at..].starts_with("\r\n") => (&rest[..at], &rest[at + 2..]),
            Some(at) => (&rest[..at], &rest[at + 1..]),
            None => (rest, ""),
        };
        rest = tail;
        Some(line)
    })
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces `token` only where it is not glued to an identifier character.
fn replace_words(text: &str, token: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(token) {
        let end = start + token.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(is_identifier_char) || after.is_some_and(is_identifier_char) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(value);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader() -> ScriptLoader {
        ScriptLoader::new("--", "schema_name", "tenant_a")
    }

    fn lines(parts: &[&str]) -> String {
        parts.iter().map(|p| format!("{p}{LINE_SEPARATOR}")).collect()
    }

    #[test]
    fn strips_trailing_comments_per_line() {
        let text = "SELECT 1; -- first\n-- whole line\n  SELECT  2 ;\n";
        assert_eq!(
            loader().strip_comments(text),
            lines(&["SELECT 1; ", "", "  SELECT  2 ;"])
        );
    }

    #[test]
    fn strips_from_first_marker_only() {
        let text = "SELECT '--' -- note -- more";
        assert_eq!(loader().strip_comments(text), lines(&["SELECT '"]));
    }

    #[test]
    fn honors_alternate_comment_marker() {
        let hash = ScriptLoader::new("#", "schema_name", "s");
        assert_eq!(
            hash.strip_comments("SELECT 1; # note\nSELECT 2; -- kept"),
            lines(&["SELECT 1; ", "SELECT 2; -- kept"])
        );
    }

    #[test]
    fn handles_crlf_input() {
        assert_eq!(
            loader().strip_comments("SELECT 1;\r\nSELECT 2; -- x\r\n"),
            lines(&["SELECT 1;", "SELECT 2; "])
        );
    }

    #[test]
    fn lone_carriage_return_ends_a_line() {
        assert_eq!(
            loader().strip_comments("SELECT 1; -- a\rSELECT 2;\r\rSELECT 3;"),
            lines(&["SELECT 1; ", "SELECT 2;", "", "SELECT 3;"])
        );
    }

    #[test]
    fn line_splitting_matches_lines_for_unix_and_crlf_text() {
        for text in ["a\nb\n", "a\r\nb", "\n\nx", "", "last"] {
            assert_eq!(
                split_lines(text).collect::<Vec<_>>(),
                text.lines().collect::<Vec<_>>(),
                "{text:?}"
            );
        }
    }

    #[test]
    fn replaces_standalone_placeholder() {
        assert_eq!(
            loader().substitute("CREATE TABLE schema_name.t(x int);"),
            "CREATE TABLE tenant_a.t(x int);"
        );
    }

    #[test]
    fn literal_mode_replaces_embedded_placeholder() {
        assert_eq!(
            loader().substitute("SELECT my_schema_name_x, 'schema_name' FROM schema_name.t"),
            "SELECT my_tenant_a_x, 'tenant_a' FROM tenant_a.t"
        );
    }

    #[test]
    fn replacement_value_is_inserted_literally() {
        let odd = ScriptLoader::new("--", "schema_name", "$1\\x");
        assert_eq!(odd.substitute("schema_name.t"), "$1\\x.t");
    }

    #[test]
    fn word_mode_skips_embedded_placeholder() {
        let word = loader().with_mode(SubstitutionMode::Word);
        assert_eq!(
            word.substitute("SELECT my_schema_name_x FROM schema_name.t, \"schema_name\""),
            "SELECT my_schema_name_x FROM tenant_a.t, \"tenant_a\""
        );
        assert_eq!(word.substitute("schema_name"), "tenant_a");
    }

    #[test]
    fn comments_are_stripped_before_substitution() {
        let text = "CREATE SCHEMA schema_name; -- drop schema_name later";
        assert_eq!(loader().transform(text), lines(&["CREATE SCHEMA tenant_a; "]));
    }

    #[test]
    fn load_reads_and_transforms_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.sql");
        fs::write(&path, "CREATE TABLE schema_name.t(x int); -- init\n").unwrap();

        let sql = loader().load(&ScriptFile::new(&path)).unwrap();
        assert_eq!(sql, lines(&["CREATE TABLE tenant_a.t(x int); "]));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = loader()
            .load(&ScriptFile::new(dir.path().join("gone.sql")))
            .unwrap_err();
        assert!(matches!(err, ScriptsError::Read { .. }));
    }

    #[test]
    fn load_reports_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.sql");
        fs::write(&path, [b'S', b'E', b'L', 0xE9, b';']).unwrap();

        let err = loader().load(&ScriptFile::new(&path)).unwrap_err();
        assert!(matches!(err, ScriptsError::Encoding { .. }));
    }
}
