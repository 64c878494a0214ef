use super::*;

// Attribute payloads are typed by hand far more often than generated, so a
// strict-parse failure gets one repair attempt: drop decoration characters,
// quote bare word runs, parse again. Anything still invalid stays None.
pub fn lenient_parse(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        return Some(value);
    }

    let stripped = strip_decoration(raw)?;
    let quoted = quote_bare_tokens(&stripped)?;
    serde_json::from_str::<serde_json::Value>(&quoted).ok()
}

fn strip_decoration(raw: &str) -> Option<String> {
    let Ok(re) = fancy_regex::Regex::new(r#"['"<>;\s?()]"#) else {
        return None;
    };
    Some(re.replace_all(raw, "").into_owned())
}

fn quote_bare_tokens(raw: &str) -> Option<String> {
    // Colons and slashes stay inside the token, so `key:value` pairs fuse
    // into one quoted string and fail the re-parse instead of guessing.
    let Ok(re) = fancy_regex::Regex::new(r"([\w:/\\]+)") else {
        return None;
    };
    Some(re.replace_all(raw, "\"${1}\"").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_passes_through() {
        let value = lenient_parse(r#"{"redirect":"follow","retries":2}"#);
        assert_eq!(
            value,
            Some(serde_json::json!({"redirect": "follow", "retries": 2}))
        );
    }

    #[test]
    fn bare_word_array_is_repaired() {
        assert_eq!(
            lenient_parse("[alpha, beta]"),
            Some(serde_json::json!(["alpha", "beta"]))
        );
    }

    #[test]
    fn bare_scalar_becomes_a_string() {
        assert_eq!(
            lenient_parse("standalone"),
            Some(serde_json::Value::String("standalone".into()))
        );
    }

    #[test]
    fn unquoted_object_keys_stay_unparseable() {
        // The colon fuses key and value into a single quoted token.
        assert_eq!(lenient_parse("{foo:'bar'}"), None);
        assert_eq!(lenient_parse("{foo:bar}"), None);
    }

    #[test]
    fn null_parses_strictly() {
        assert_eq!(lenient_parse("null"), Some(serde_json::Value::Null));
    }

    #[test]
    fn hostile_input_never_panics() {
        for raw in ["", "???", "{{{{", "<>, ;; ()", "a & b | c", "\u{0}\u{1}"] {
            let _ = lenient_parse(raw);
        }
    }
}
