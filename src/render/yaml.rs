use serde_yaml::{Mapping, Value};

/// Serialize a mapping as block-style YAML, keeping key order.
///
/// Strings that carry template syntax (`{{`, `}}`) are always written in
/// double quotes. The runtime step renders these files as templates, and a
/// single-quoted scalar would escape the quotes inside
/// `run_date.strftime('...')`.
pub fn to_yaml(map: &Mapping) -> String {
    let mut out = String::new();
    if map.is_empty() {
        out.push_str("{}\n");
        return out;
    }
    write_mapping(&mut out, map, 0);
    out
}

fn write_mapping(out: &mut String, map: &Mapping, indent: usize) {
    for (key, value) in map {
        push_indent(out, indent);
        out.push_str(&inline(key));
        out.push(':');
        write_nested(out, value, indent);
    }
}

fn write_sequence(out: &mut String, seq: &[Value], indent: usize) {
    for item in seq {
        push_indent(out, indent);
        out.push('-');
        match item {
            Value::Sequence(inner) if !inner.is_empty() => {
                out.push('\n');
                write_sequence(out, inner, indent + 2);
            }
            other => write_nested(out, other, indent),
        }
    }
}

/// Write whatever follows `key:` or `-`.
fn write_nested(out: &mut String, value: &Value, indent: usize) {
    match value {
        Value::Mapping(m) if !m.is_empty() => {
            out.push('\n');
            write_mapping(out, m, indent + 2);
        }
        Value::Sequence(s) if !s.is_empty() => {
            out.push('\n');
            write_sequence(out, s, indent);
        }
        other => {
            out.push(' ');
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string_scalar(s),
        Value::Mapping(_) => "{}".to_string(),
        Value::Sequence(_) => "[]".to_string(),
        Value::Tagged(_) => serde_yaml::to_string(value)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| "null".to_string()),
    }
}

fn string_scalar(s: &str) -> String {
    let needs_double = s.contains("{{")
        || s.contains("}}")
        || s.chars().any(|c| c.is_control());
    if !needs_double {
        // Let serde_yaml decide between plain and single-quoted, so values
        // like "true", "0123" or "a: b" stay strings.
        if let Ok(text) = serde_yaml::to_string(&Value::String(s.to_string())) {
            let text = text.trim_end_matches('\n');
            if !text.contains('\n') {
                return text.to_string();
            }
        }
    }
    double_quoted(s)
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn flat_pairs_keep_order() {
        let map = parse("forceRun: true\nretries: 3\nname: job_a\nratio: 0.5\nnothing: null\n");
        assert_eq!(
            to_yaml(&map),
            "forceRun: true\nretries: 3\nname: job_a\nratio: 0.5\nnothing: null\n"
        );
    }

    #[test]
    fn placeholders_are_double_quoted() {
        let mut map = Mapping::new();
        map.insert(
            "runDate".into(),
            "{{ run_date.strftime('%Y%m%d') }}".into(),
        );
        map.insert("plain".into(), "{{ run_date }}".into());
        assert_eq!(
            to_yaml(&map),
            "runDate: \"{{ run_date.strftime('%Y%m%d') }}\"\nplain: \"{{ run_date }}\"\n"
        );
    }

    #[test]
    fn ambiguous_strings_stay_strings() {
        let mut map = Mapping::new();
        map.insert("a".into(), "true".into());
        map.insert("b".into(), "0123".into());
        map.insert("c".into(), "line1\nline2".into());
        map.insert("d".into(), "".into());

        let text = to_yaml(&map);
        assert_eq!(parse(&text), map);
        assert!(text.contains("c: \"line1\\nline2\"\n"), "{}", text);
    }

    #[test]
    fn nested_structures_round_trip() {
        let src = "outer:\n  inner: 1\n  list:\n  - a\n  - b: 2\n    c: 3\n  - - x\n    - y\nempty_map: {}\nempty_list: []\n";
        let map = parse(src);
        assert_eq!(parse(&to_yaml(&map)), map);
    }

    #[test]
    fn output_is_deterministic() {
        let map = parse("b: 1\na: {x: [1, 2]}\n");
        assert_eq!(to_yaml(&map), to_yaml(&map.clone()));
        assert_eq!(to_yaml(&Mapping::new()), "{}\n");
    }
}
