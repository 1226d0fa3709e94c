//! Unified diffs of a template before and after patching.

use colored::Colorize;
use similar::TextDiff;
use sqx_xml::encoding::decode;

/// Lines of unchanged context around each hunk.
pub const CONTEXT_RADIUS: usize = 3;

/// Unified diff between two texts, with `a/` and `b/` prefixed headers.
///
/// Returns an empty string when the texts are identical.
///
/// ```rust
/// use sqx_patch::unified_diff;
///
/// let diff = unified_diff("<A>1</A>\n", "<A>2</A>\n", "template.xml", "out.xml");
/// assert_eq!(
///     diff,
///     "--- a/template.xml\n+++ b/out.xml\n@@ -1 +1 @@\n-<A>1</A>\n+<A>2</A>\n"
/// );
/// ```
pub fn unified_diff(before: &str, after: &str, from_name: &str, to_name: &str) -> String {
    if before == after {
        return String::new();
    }
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(&format!("a/{from_name}"), &format!("b/{to_name}"))
        .to_string()
}

/// Like [`unified_diff`], decoding both sides the way documents are loaded
/// (UTF-8 with a Windows-1252 fallback).
pub fn diff_bytes(before: &[u8], after: &[u8], from_name: &str, to_name: &str) -> String {
    let (before, _) = decode(before);
    let (after, _) = decode(after);
    unified_diff(&before, &after, from_name, to_name)
}

/// Role of one line in a unified diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// `---` / `+++` file headers.
    Header,
    /// `@@ ... @@` hunk ranges.
    Hunk,
    Addition,
    Removal,
    Context,
}

impl DiffLineKind {
    pub fn classify(line: &str) -> Self {
        if line.starts_with("+++") || line.starts_with("---") {
            DiffLineKind::Header
        } else if line.starts_with("@@") {
            DiffLineKind::Hunk
        } else if line.starts_with('+') {
            DiffLineKind::Addition
        } else if line.starts_with('-') {
            DiffLineKind::Removal
        } else {
            DiffLineKind::Context
        }
    }
}

/// Color a unified diff for a terminal.
///
/// Only adds escape codes; the text is otherwise unchanged. Honors
/// `colored`'s global override, so callers can switch colors off.
pub fn colorize(diff: &str) -> String {
    let mut out = String::with_capacity(diff.len());
    for line in diff.lines() {
        let painted = match DiffLineKind::classify(line) {
            DiffLineKind::Header => line.cyan().bold().to_string(),
            DiffLineKind::Hunk => line.blue().bold().to_string(),
            DiffLineKind::Addition => line.green().to_string(),
            DiffLineKind::Removal => line.red().to_string(),
            DiffLineKind::Context => line.to_string(),
        };
        out.push_str(&painted);
        out.push('\n');
    }
    if !diff.ends_with('\n') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEFORE: &str = "<Strategy>\n  <A>1</A>\n  <B>2</B>\n  <C>3</C>\n  <D>4</D>\n  <E>5</E>\n  <F>6</F>\n  <G>7</G>\n  <H>8</H>\n</Strategy>\n";

    #[test]
    fn test_identical_inputs_give_empty_diff() {
        assert_eq!(unified_diff(BEFORE, BEFORE, "a.xml", "b.xml"), "");
    }

    #[test]
    fn test_diff_has_three_lines_of_context() {
        let after = BEFORE.replace("<E>5</E>", "<E>50</E>");
        let diff = unified_diff(BEFORE, &after, "template.xml", "out.xml");

        insta::assert_snapshot!(diff, @r"
        --- a/template.xml
        +++ b/out.xml
        @@ -3,7 +3,7 @@
           <B>2</B>
           <C>3</C>
           <D>4</D>
        -  <E>5</E>
        +  <E>50</E>
           <F>6</F>
           <G>7</G>
           <H>8</H>
        ");
    }

    #[test]
    fn test_diff_bytes_decodes_windows_1252() {
        let before = b"<Name>caf\xe9</Name>\n";
        let after = b"<Name>caf&#233;s</Name>\n";
        let diff = diff_bytes(before, after, "a.xml", "b.xml");
        assert!(diff.contains("-<Name>café</Name>"));
        assert!(diff.contains("+<Name>caf&#233;s</Name>"));
    }

    #[test]
    fn test_classify_lines() {
        let kinds: Vec<_> = ["--- a/x", "+++ b/x", "@@ -1 +1 @@", "+new", "-old", " same", ""]
            .into_iter()
            .map(DiffLineKind::classify)
            .collect();
        assert_eq!(
            kinds,
            [
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Hunk,
                DiffLineKind::Addition,
                DiffLineKind::Removal,
                DiffLineKind::Context,
                DiffLineKind::Context,
            ]
        );
    }

    #[test]
    fn test_colorize_only_adds_escape_codes() {
        let diff = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-old\n+new\n";

        colored::control::set_override(true);
        let painted = colorize(diff);
        colored::control::set_override(false);
        let plain = colorize(diff);
        colored::control::unset_override();

        assert!(painted.contains("\u{1b}[32m+new\u{1b}[0m"));
        assert!(painted.contains("\u{1b}[31m-old\u{1b}[0m"));
        assert_eq!(plain, diff);
    }
}
