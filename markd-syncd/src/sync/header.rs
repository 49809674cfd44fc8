//! Identity header embedded at the top of every synchronized document.
//!
//! ```markdown
//! ---
//! markd_id: 3f2a
//! markd_name: Release notes
//! markd_parent: 91c0
//! ---
//!
//! Document body...
//! ```

const MARKER: &str = "---";
const KEY_REMOTE_ID: &str = "markd_id";
const KEY_DISPLAY_NAME: &str = "markd_name";
const KEY_PARENT: &str = "markd_parent";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncHeader {
    pub remote_id: Option<String>,
    pub display_name: Option<String>,
    pub parent_remote_id: Option<String>,
}

/// Reads the header block at the start of `content`. Content without a
/// block yields an empty header.
pub fn extract(content: &str) -> SyncHeader {
    let mut header = SyncHeader::default();
    let Some((fields, _)) = split_block(content) else {
        return header;
    };

    for line in fields.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(['"', '\'']);
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            KEY_REMOTE_ID => header.remote_id = Some(value.to_string()),
            KEY_DISPLAY_NAME => header.display_name = Some(value.to_string()),
            KEY_PARENT => header.parent_remote_id = Some(value.to_string()),
            _ => {}
        }
    }
    header
}

/// Returns the document body with the header block removed.
pub fn strip(content: &str) -> &str {
    match split_block(content) {
        Some((_, body)) => body,
        None => content,
    }
}

/// Replaces any existing header blocks with a single fresh one.
pub fn inject(content: &str, remote_id: &str, name: &str, parent_id: Option<&str>) -> String {
    let mut body = content;
    while let Some((_, rest)) = split_block(body) {
        body = rest;
    }
    let mut out = String::with_capacity(body.len() + 64);
    out.push_str(MARKER);
    out.push('\n');
    push_field(&mut out, KEY_REMOTE_ID, remote_id);
    push_field(&mut out, KEY_DISPLAY_NAME, name);
    if let Some(parent_id) = parent_id {
        push_field(&mut out, KEY_PARENT, parent_id);
    }
    out.push_str(MARKER);
    out.push_str("\n\n");
    out.push_str(body);
    out
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(&value.replace(['\r', '\n'], " "));
    out.push('\n');
}

/// Splits a leading header block into its field lines and the body that
/// follows. The closing marker must be newline-terminated; one blank
/// separator line after it belongs to the block.
fn split_block(content: &str) -> Option<(&str, &str)> {
    let (first, after_open) = split_line(content)?;
    if !is_marker(first) {
        return None;
    }

    let mut rest = after_open;
    loop {
        let (line, after) = split_line(rest)?;
        if is_marker(line) {
            let fields = &after_open[..after_open.len() - rest.len()];
            return Some((fields, skip_blank_line(after)));
        }
        rest = after;
    }
}

fn split_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    Some((&s[..idx], &s[idx + 1..]))
}

fn is_marker(line: &str) -> bool {
    line.strip_prefix(MARKER)
        .is_some_and(|rest| rest.trim().is_empty())
}

fn skip_blank_line(s: &str) -> &str {
    s.strip_prefix('\n')
        .or_else(|| s.strip_prefix("\r\n"))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "hello",
        "# Title\n\nSome text\n",
        "\nleading blank line\n",
        "---\n\nnot a header, just a rule\n",
        "---\nmarkd_id: old\nmarkd_name: Old\n---\n\nbody\n",
        "---\r\nmarkd_id: crlf\r\n---\r\n\r\nwindows body\r\n",
        "---\na: 1\n---\n---\nb: 2\n---\nbody",
    ];

    #[test]
    fn extracts_injected_fields() {
        let header = extract(&inject("", "abc", "Doc", Some("parent1")));
        assert_eq!(
            header,
            SyncHeader {
                remote_id: Some("abc".into()),
                display_name: Some("Doc".into()),
                parent_remote_id: Some("parent1".into()),
            }
        );
    }

    #[test]
    fn missing_header_is_empty_not_error() {
        assert_eq!(extract("# Just a note\n"), SyncHeader::default());
        assert_eq!(strip("# Just a note\n"), "# Just a note\n");
    }

    #[test]
    fn header_must_start_the_document() {
        let content = "intro\n---\nmarkd_id: x\n---\nbody";
        assert_eq!(extract(content), SyncHeader::default());
        assert_eq!(strip(content), content);
    }

    #[test]
    fn unterminated_block_is_not_a_header() {
        let content = "---\nmarkd_id: x\nno closing marker\n";
        assert_eq!(extract(content), SyncHeader::default());
        assert_eq!(strip(content), content);
    }

    #[test]
    fn ignores_lines_without_separator_and_strips_quotes() {
        let content = "---\njunk line\nmarkd_id: \"q-1\"\nmarkd_name: 'Quoted: name'\nother: x\n---\nbody";
        let header = extract(content);
        assert_eq!(header.remote_id.as_deref(), Some("q-1"));
        assert_eq!(header.display_name.as_deref(), Some("Quoted: name"));
        assert_eq!(header.parent_remote_id, None);
        assert_eq!(strip(content), "body");
    }

    #[test]
    fn empty_values_count_as_absent() {
        let header = extract("---\nmarkd_id:\nmarkd_name:   \n---\n");
        assert_eq!(header, SyncHeader::default());
    }

    #[test]
    fn reads_crlf_headers() {
        let content = "---\r\nmarkd_id: w1\r\nmarkd_name: Win\r\n---\r\n\r\nbody\r\n";
        let header = extract(content);
        assert_eq!(header.remote_id.as_deref(), Some("w1"));
        assert_eq!(header.display_name.as_deref(), Some("Win"));
        assert_eq!(strip(content), "body\r\n");
    }

    #[test]
    fn inject_writes_parent_only_when_given() {
        let content = inject("body", "id-1", "Name", None);
        assert_eq!(content, "---\nmarkd_id: id-1\nmarkd_name: Name\n---\n\nbody");
    }

    #[test]
    fn inject_replaces_instead_of_merging() {
        let first = inject("body", "id-1", "First", Some("p-1"));
        let second = inject(&first, "id-2", "Second", None);
        assert_eq!(
            extract(&second),
            SyncHeader {
                remote_id: Some("id-2".into()),
                display_name: Some("Second".into()),
                parent_remote_id: None,
            }
        );
        assert_eq!(strip(&second), "body");
    }

    #[test]
    fn inject_collapses_stacked_header_blocks() {
        let stacked = "---\na: 1\n---\n---\nb: 2\n---\nbody";
        let once = inject(stacked, "id", "N", None);
        assert_eq!(once, "---\nmarkd_id: id\nmarkd_name: N\n---\n\nbody");
        assert_eq!(inject(strip(&once), "id", "N", None), once);
    }

    #[test]
    fn inject_flattens_line_breaks_in_values() {
        let content = inject("body", "id", "two\nlines", None);
        assert_eq!(extract(&content).display_name.as_deref(), Some("two lines"));
        assert_eq!(strip(&content), "body");
    }

    #[test]
    fn strip_round_trips_header_free_content() {
        for sample in SAMPLES.iter().filter(|s| strip(s) == **s) {
            let injected = inject(sample, "id", "Name", Some("parent"));
            assert_eq!(strip(&injected), *sample, "sample {sample:?}");
        }
        assert_eq!(strip(&inject("hello", "id", "n", None)), "hello");
        assert_eq!(
            strip(&inject("\nleading blank line\n", "id", "n", None)),
            "\nleading blank line\n"
        );
    }

    #[test]
    fn inject_is_idempotent() {
        for sample in SAMPLES {
            for parent in [None, Some("parent")] {
                let once = inject(sample, "id", "Name", parent);
                assert_eq!(inject(&once, "id", "Name", parent), once, "sample {sample:?}");
                assert_eq!(
                    inject(strip(&once), "id", "Name", parent),
                    once,
                    "sample {sample:?}"
                );
            }
        }
    }
}
