use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // In flight; no reply yet.
    Pending,
    // Transport-level failure: no well-formed status exists.
    Failed,
    Code(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(serde_json::Value),
}

impl Body {
    pub(crate) fn to_value(&self) -> serde_json::Value {
        match self {
            Body::Text(text) => serde_json::Value::String(text.clone()),
            Body::Json(value) => value.clone(),
        }
    }

    pub(crate) fn to_text(&self) -> String {
        match self {
            Body::Text(text) => text.clone(),
            Body::Json(value) => value.to_string(),
        }
    }
}

// The single hand-off between transport and message resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub body: Body,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireReply {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

// Real-mode collaborator. One exchange per submission, no retry.
pub trait Backend {
    fn exchange(&mut self, request: &RequestDescriptor) -> std::result::Result<WireReply, String>;
}

impl<F> Backend for F
where
    F: FnMut(&RequestDescriptor) -> std::result::Result<WireReply, String>,
{
    fn exchange(&mut self, request: &RequestDescriptor) -> std::result::Result<WireReply, String> {
        self(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    Query,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Real,
    Echo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: String,
    pub target: String,
    pub headers: serde_json::Map<String, serde_json::Value>,
    pub options: serde_json::Map<String, serde_json::Value>,
    pub fields: Vec<(String, String)>,
    pub encoding: FieldEncoding,
    pub mode: TransportMode,
}

pub(crate) fn normalize_reply(reply: WireReply) -> Envelope {
    let body = if reply.content_type.contains("json") {
        match serde_json::from_str(&reply.body) {
            Ok(value) => Body::Json(value),
            // A declared-JSON body that does not decode is a transport failure.
            Err(_) => return fault_envelope(),
        }
    } else {
        Body::Text(reply.body)
    };

    Envelope {
        body,
        status: Status::Code(reply.status),
    }
}

pub(crate) fn fault_envelope() -> Envelope {
    Envelope {
        body: Body::Text("<h1>Server Error</h1>".to_string()),
        status: Status::Failed,
    }
}

pub(crate) const SIMULATION_DISCLAIMER: &str =
    "<p>This result is a simulation. No server side form processing was performed.";

// Echo mode: the reply is built from the request itself, so templates can
// address submitted fields as {{data.<name>}}.
pub(crate) fn synthesize_echo(
    descriptor: &RequestDescriptor,
    response_format: ResponseFormat,
    force_error: bool,
) -> Envelope {
    let status = if force_error { 500 } else { 200 };

    let body = match response_format {
        ResponseFormat::Html => {
            let markup = if force_error {
                "<h1>Error</h1><p>HTML response</p>"
            } else {
                "<h1>Success</h1><p>HTML response</p>"
            };
            Body::Text(format!("{markup}{SIMULATION_DISCLAIMER}"))
        }
        ResponseFormat::Json => {
            let mut echo = descriptor.options.clone();
            echo.insert(
                "method".to_string(),
                serde_json::Value::String(descriptor.method.clone()),
            );
            echo.insert(
                "headers".to_string(),
                serde_json::Value::Object(descriptor.headers.clone()),
            );
            let mut data = serde_json::Map::new();
            for (name, value) in &descriptor.fields {
                data.insert(name.clone(), serde_json::Value::String(value.clone()));
            }
            echo.insert("data".to_string(), serde_json::Value::Object(data));
            Body::Json(serde_json::Value::Object(echo))
        }
    };

    Envelope {
        body,
        status: Status::Code(status),
    }
}

// GET/HEAD submissions: all pairs into the query string, '?' always appended,
// pairs '&'-joined, then the whole target escaped like encodeURI.
pub(crate) fn append_query(target: &str, fields: &[(String, String)]) -> String {
    let mut url = String::from(target);
    url.push('?');
    for (index, (name, value)) in fields.iter().enumerate() {
        if index > 0 {
            url.push('&');
        }
        url.push_str(name);
        url.push('=');
        url.push_str(value);
    }
    encode_uri_like(&url)
}

pub(crate) fn encode_uri_like(src: &str) -> String {
    let mut out = String::new();
    for b in src.as_bytes() {
        if is_unescaped_uri_byte(*b) {
            out.push(*b as char);
        } else {
            out.push('%');
            out.push(to_hex_upper((*b >> 4) & 0x0F));
            out.push(to_hex_upper(*b & 0x0F));
        }
    }
    out
}

fn is_unescaped_uri_byte(b: u8) -> bool {
    if b.is_ascii_alphanumeric() {
        return true;
    }
    matches!(
        b,
        b'-' | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')'
            | b';'
            | b','
            | b'/'
            | b'?'
            | b':'
            | b'@'
            | b'&'
            | b'='
            | b'+'
            | b'$'
            | b'#'
    )
}

fn to_hex_upper(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        10..=15 => (b'A' + (nibble - 10)) as char,
        _ => '?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(fields: Vec<(String, String)>) -> RequestDescriptor {
        RequestDescriptor {
            method: "POST".to_string(),
            target: "/submit".to_string(),
            headers: serde_json::Map::new(),
            options: serde_json::Map::new(),
            fields,
            encoding: FieldEncoding::Body,
            mode: TransportMode::Echo,
        }
    }

    #[test]
    fn json_replies_decode_into_structured_bodies() {
        let envelope = normalize_reply(WireReply {
            status: 200,
            content_type: "application/json; charset=utf-8".to_string(),
            body: r#"{"ok":true}"#.to_string(),
        });
        assert_eq!(envelope.status, Status::Code(200));
        assert_eq!(envelope.body, Body::Json(serde_json::json!({"ok": true})));
    }

    #[test]
    fn undecodable_json_reply_is_a_transport_failure() {
        let envelope = normalize_reply(WireReply {
            status: 200,
            content_type: "application/json".to_string(),
            body: "not json".to_string(),
        });
        assert_eq!(envelope, fault_envelope());
        assert_eq!(envelope.status, Status::Failed);
    }

    #[test]
    fn text_replies_pass_through_verbatim() {
        let envelope = normalize_reply(WireReply {
            status: 404,
            content_type: "text/html".to_string(),
            body: "<h1>Not Found</h1>".to_string(),
        });
        assert_eq!(envelope.status, Status::Code(404));
        assert_eq!(envelope.body, Body::Text("<h1>Not Found</h1>".to_string()));
    }

    #[test]
    fn echo_json_exposes_fields_under_data() {
        let request = descriptor(vec![
            ("name".to_string(), "Foo".to_string()),
            ("age".to_string(), "30".to_string()),
        ]);
        let envelope = synthesize_echo(&request, ResponseFormat::Json, false);
        assert_eq!(envelope.status, Status::Code(200));
        let Body::Json(value) = envelope.body else {
            panic!("expected a structured body");
        };
        assert_eq!(value["data"]["name"], "Foo");
        assert_eq!(value["method"], "POST");
    }

    #[test]
    fn echo_honors_force_error() {
        let request = descriptor(Vec::new());
        let envelope = synthesize_echo(&request, ResponseFormat::Html, true);
        assert_eq!(envelope.status, Status::Code(500));
        assert_eq!(
            envelope.body,
            Body::Text(format!(
                "<h1>Error</h1><p>HTML response</p>{SIMULATION_DISCLAIMER}"
            ))
        );
    }

    #[test]
    fn query_encoding_joins_pairs_in_order() {
        let fields = vec![
            ("name".to_string(), "Foo Bar".to_string()),
            ("city".to_string(), "Oslo".to_string()),
        ];
        assert_eq!(
            append_query("/find", &fields),
            "/find?name=Foo%20Bar&city=Oslo"
        );
    }

    #[test]
    fn query_marker_is_appended_even_without_fields() {
        assert_eq!(append_query("/find", &[]), "/find?");
    }

    #[test]
    fn uri_escaping_keeps_reserved_characters() {
        assert_eq!(
            encode_uri_like("/a b?x=1&y=ä"),
            "/a%20b?x=1&y=%C3%A4"
        );
    }
}
