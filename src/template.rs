use super::*;

const PLACEHOLDER_PATTERN: &str = r"\{\{([^{}]+)\}\}";

enum InsertMode {
    // JSON-stringify the resolved value; the caller strips double quotes.
    Stringify,
    // Strings go in verbatim, everything else JSON-stringified.
    Verbatim,
}

// Dialog override markup may reference reply fields as `{{path.to.field}}`.
// Unresolvable paths keep their placeholder text so authors can see the miss.
pub fn interpolate_string(template: &str, data: &serde_json::Value) -> String {
    let Ok(re) = fancy_regex::Regex::new(PLACEHOLDER_PATTERN) else {
        return template.to_string();
    };
    substitute(&re, template, data, InsertMode::Stringify).replace('"', "")
}

pub(crate) fn interpolate_nodes(
    dom: &mut Dom,
    scope: NodeId,
    data: &serde_json::Value,
) -> Result<()> {
    let Ok(re) = fancy_regex::Regex::new(PLACEHOLDER_PATTERN) else {
        return Ok(());
    };

    for node in dom.element_nodes_under(scope) {
        let html = dom.inner_html(node)?;
        let found = match re.find(&html) {
            Ok(found) => found,
            Err(_) => continue,
        };
        if found.is_none() {
            continue;
        }
        let rewritten = substitute(&re, &html, data, InsertMode::Verbatim);
        // Spliced values may break the markup; degrade to literal text.
        if dom.set_inner_html(node, &rewritten).is_err() {
            dom.set_inner_html(node, &escape_html_text_for_serialization(&rewritten))?;
        }
    }
    Ok(())
}

fn substitute(
    re: &fancy_regex::Regex,
    input: &str,
    data: &serde_json::Value,
    mode: InsertMode,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;

    for caps in re.captures_iter(input) {
        let Ok(caps) = caps else { break };
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        last = whole.end();

        let path = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        match resolve_path(data, path.trim()) {
            Some(value) => match mode {
                InsertMode::Verbatim => match value {
                    serde_json::Value::String(text) => out.push_str(text),
                    other => out.push_str(&other.to_string()),
                },
                InsertMode::Stringify => out.push_str(&value.to_string()),
            },
            None => out.push_str(whole.as_str()),
        }
    }

    out.push_str(&input[last..]);
    out
}

fn resolve_path<'v>(data: &'v serde_json::Value, path: &str) -> Option<&'v serde_json::Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
