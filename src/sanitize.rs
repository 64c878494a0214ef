use super::*;

const ALLOWED_ELEMENTS: [&str; 13] = [
    "p", "span", "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "hr", "br",
];

const ALLOWED_ATTRIBUTES: [&str; 3] = ["id", "class", "style"];

// Override markup comes from widget attributes, which page authors may fill
// from untrusted sources. Keep presentation tags, demote everything else to
// its visible text.
pub fn sanitize_markup(raw: &str) -> String {
    let Ok(dom) = parse_html(raw) else {
        return escape_html_text_for_serialization(raw);
    };

    let mut out = String::new();
    for child in &dom.nodes[dom.root.0].children {
        write_sanitized(&dom, *child, &mut out);
    }
    out
}

fn write_sanitized(dom: &Dom, node_id: NodeId, out: &mut String) {
    match &dom.nodes[node_id.0].node_type {
        NodeType::Document => {
            for child in &dom.nodes[node_id.0].children {
                write_sanitized(dom, *child, out);
            }
        }
        NodeType::Text(text) => {
            out.push_str(&escape_html_text_for_serialization(text));
        }
        NodeType::Element(element) => {
            if !ALLOWED_ELEMENTS.contains(&element.tag_name.as_str()) {
                let text = dom.text_content(node_id);
                out.push_str(&escape_html_text_for_serialization(&text));
                return;
            }

            out.push('<');
            out.push_str(&element.tag_name);
            for (name, value) in &element.attrs {
                if !ALLOWED_ATTRIBUTES.contains(&name.as_str()) {
                    continue;
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html_attr_for_serialization(value));
                out.push('"');
            }
            out.push('>');

            if is_void_tag(&element.tag_name) {
                return;
            }
            for child in &dom.nodes[node_id.0].children {
                write_sanitized(dom, *child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag_name);
            out.push('>');
        }
    }
}
