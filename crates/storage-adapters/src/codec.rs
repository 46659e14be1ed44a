//! Text format of a single comment file.
//!
//! ```text
//! ---
//! guid: 9f8c...
//! reply_guid: 41aa...
//! date: 1700000000
//! ip: 203.0.113.7
//! author: alice
//! pending: true
//! ---
//! body, written verbatim
//! ```
//!
//! `reply_guid` and `pending` are only written when set. The body may itself
//! contain `---` lines; only the first closing delimiter ends the metadata.

use chrono::{DateTime, Utc};
use domains::{CommentRecord, DomainError, Result};

const DELIMITER: &str = "---";

pub fn encode(record: &CommentRecord) -> String {
    let mut out = String::with_capacity(record.content.len() + 160);
    out.push_str(DELIMITER);
    out.push('\n');
    push_field(&mut out, "guid", &record.guid);
    if let Some(reply_guid) = &record.reply_guid {
        push_field(&mut out, "reply_guid", reply_guid);
    }
    push_field(&mut out, "date", &record.created_at.timestamp().to_string());
    push_field(&mut out, "ip", &record.remote_address);
    push_field(&mut out, "author", &record.author);
    if record.pending {
        push_field(&mut out, "pending", "true");
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&record.content);
    out
}

fn push_field(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

pub fn decode(text: &str) -> Result<CommentRecord> {
    let rest = text
        .strip_prefix("---\n")
        .ok_or_else(|| DomainError::Parse("missing opening delimiter".into()))?;
    let (meta, body) = split_metadata(rest)
        .ok_or_else(|| DomainError::Parse("missing closing delimiter".into()))?;

    let mut fields = Fields::default();
    for line in meta.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| DomainError::Parse(format!("malformed metadata line {line:?}")))?;
        let value = value.trim();
        match key.trim() {
            "guid" => fields.guid = non_empty(value),
            "reply_guid" => fields.reply_guid = non_empty(value),
            "date" => fields.date = non_empty(value),
            "ip" => fields.ip = value.to_string(),
            "author" => fields.author = non_empty(value),
            "pending" => fields.pending = value == "true",
            // unknown keys are tolerated so records can be annotated by hand
            _ => {}
        }
    }

    let guid = fields.guid.ok_or_else(|| missing("guid"))?;
    let author = fields.author.ok_or_else(|| missing("author"))?;
    let date = fields.date.ok_or_else(|| missing("date"))?;
    let created_at = parse_date(&date)?;

    Ok(CommentRecord {
        guid,
        reply_guid: fields.reply_guid,
        author,
        content: body.to_string(),
        created_at,
        remote_address: fields.ip,
        pending: fields.pending,
    })
}

#[derive(Default)]
struct Fields {
    guid: Option<String>,
    reply_guid: Option<String>,
    date: Option<String>,
    ip: String,
    author: Option<String>,
    pending: bool,
}

/// Splits at the first line consisting solely of the delimiter.
fn split_metadata(rest: &str) -> Option<(&str, &str)> {
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    if let Some(idx) = rest.find("\n---\n") {
        return Some((&rest[..=idx], &rest[idx + 5..]));
    }
    rest.strip_suffix("\n---").map(|meta| (meta, ""))
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = raw
        .parse()
        .map_err(|_| DomainError::Parse(format!("invalid date {raw:?}")))?;
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| DomainError::Parse(format!("date {secs} out of range")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn missing(key: &str) -> DomainError {
    DomainError::Parse(format!("missing required key `{key}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommentRecord {
        CommentRecord {
            guid: "0123456789abcdef0123456789abcdef".into(),
            reply_guid: None,
            author: "alice".into(),
            content: "hi".into(),
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            remote_address: "203.0.113.7".into(),
            pending: false,
        }
    }

    #[test]
    fn encodes_fields_in_stable_order() {
        let mut record = sample();
        record.reply_guid = Some("feedface".into());
        record.pending = true;

        assert_eq!(
            encode(&record),
            "---\n\
             guid: 0123456789abcdef0123456789abcdef\n\
             reply_guid: feedface\n\
             date: 1700000000\n\
             ip: 203.0.113.7\n\
             author: alice\n\
             pending: true\n\
             ---\n\
             hi"
        );
    }

    #[test]
    fn optional_keys_are_omitted() {
        let text = encode(&sample());
        assert!(!text.contains("reply_guid"));
        assert!(!text.contains("pending"));
    }

    #[test]
    fn decodes_what_it_encodes() {
        let mut record = sample();
        record.reply_guid = Some("feedface".into());
        record.pending = true;
        assert_eq!(decode(&encode(&record)).unwrap(), record);
    }

    #[test]
    fn body_may_contain_the_delimiter() {
        let mut record = sample();
        record.content = "first\n---\nsecond\n---\n".into();
        assert_eq!(decode(&encode(&record)).unwrap().content, record.content);
    }

    #[test]
    fn author_with_dashes_does_not_end_metadata() {
        let mut record = sample();
        record.author = "---".into();
        assert_eq!(decode(&encode(&record)).unwrap().author, "---");
    }

    #[test]
    fn values_may_contain_colons() {
        let text = "---\nguid: g\ndate: 5\nip: 2001:db8::1\nauthor: a: b\n---\nx";
        let record = decode(text).unwrap();
        assert_eq!(record.remote_address, "2001:db8::1");
        assert_eq!(record.author, "a: b");
    }

    #[test]
    fn empty_body_at_end_of_file() {
        let record = decode("---\nguid: g\ndate: 5\nauthor: a\n---").unwrap();
        assert_eq!(record.content, "");
        assert_eq!(record.remote_address, "");
    }

    #[test]
    fn rejects_missing_required_keys() {
        for (text, key) in [
            ("---\ndate: 5\nauthor: a\n---\nx", "guid"),
            ("---\nguid: g\nauthor: a\n---\nx", "date"),
            ("---\nguid: g\ndate: 5\n---\nx", "author"),
            ("---\nguid: g\ndate: 5\nauthor: \n---\nx", "author"),
        ] {
            match decode(text) {
                Err(DomainError::Parse(msg)) => assert!(msg.contains(key), "{msg}"),
                other => panic!("expected parse error for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_malformed_structure() {
        for text in [
            "",
            "guid: g\n---\nx",
            "---\nguid: g\ndate: 5\nauthor: a\n",
            "---\nguid g\n---\nx",
            "---\nguid: g\ndate: yesterday\nauthor: a\n---\nx",
        ] {
            assert!(matches!(decode(text), Err(DomainError::Parse(_))), "{text:?}");
        }
    }

    #[test]
    fn only_literal_true_marks_pending() {
        let record = decode("---\nguid: g\ndate: 5\nauthor: a\npending: false\n---\nx").unwrap();
        assert!(!record.pending);
    }
}
