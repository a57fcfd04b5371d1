//! Parsing helpers for PowerShell output

use super::ProbeResult;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;

/// PowerShell `ConvertTo-Json` output for a pipeline of objects
///
/// A single object serializes bare rather than as a one-element array, and
/// an empty pipeline prints nothing.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Deserialize `ConvertTo-Json` output into typed records
pub(crate) fn json_records<T: DeserializeOwned>(output: &str) -> ProbeResult<Vec<T>> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str(output)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    })
}

fn int_pattern() -> &'static Regex {
    static INT: OnceLock<Regex> = OnceLock::new();
    INT.get_or_init(|| Regex::new(r"^\s*(-?\d+)").expect("valid regex"))
}

/// Integer at the start of `text`, ignoring leading whitespace
pub(crate) fn leading_int(text: &str) -> Option<i64> {
    int_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Value of a `label: value` line from `net accounts` style output
pub(crate) fn labelled_value<'a>(output: &'a str, label: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(label)
            .then(|| value.trim())
    })
}

/// Whether a service status query reported `Running`
pub(crate) fn is_running(status: &str) -> bool {
    status.trim().eq_ignore_ascii_case("running")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct Profile {
        name: String,
        enabled: bool,
    }

    #[test]
    fn test_json_records_array_and_single_object() {
        let many: Vec<Profile> =
            json_records(r#"[{"Name":"Domain","Enabled":true},{"Name":"Private","Enabled":false}]"#)
                .unwrap();
        assert_eq!(many.len(), 2);
        assert!(!many[1].enabled);

        let one: Vec<Profile> = json_records("{\"Name\":\"Public\",\"Enabled\":true}\r\n").unwrap();
        assert_eq!(one, [Profile { name: "Public".into(), enabled: true }]);
    }

    #[test]
    fn test_json_records_empty_and_malformed() {
        assert!(json_records::<Profile>("  \r\n").unwrap().is_empty());
        let err = json_records::<Profile>("Name : Domain").unwrap_err();
        assert!(matches!(err, crate::probes::ProbeError::Parse(_)));
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int(" 42 days"), Some(42));
        assert_eq!(leading_int("Never"), None);
        assert_eq!(leading_int("-1"), Some(-1));
    }

    #[test]
    fn test_labelled_value() {
        let out = "Minimum password length:                              8\nLength of password history maintained:                None";
        assert_eq!(labelled_value(out, "Minimum password length"), Some("8"));
        assert_eq!(labelled_value(out, "Length of password history maintained"), Some("None"));
        assert_eq!(labelled_value(out, "Missing"), None);
    }

    #[test]
    fn test_is_running() {
        assert!(is_running("Running\r\n"));
        assert!(!is_running("Stopped"));
        assert!(!is_running(""));
    }
}
