use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Waiting,
    Success,
    Error,
}

impl Kind {
    pub(crate) const ALL: [Kind; 3] = [Kind::Waiting, Kind::Success, Kind::Error];

    pub(crate) fn from_status(status: &Status) -> Kind {
        match status {
            Status::Pending => Kind::Waiting,
            Status::Failed => Kind::Error,
            Status::Code(code) if *code > 399 => Kind::Error,
            Status::Code(_) => Kind::Success,
        }
    }

    // Doubles as the container CSS class and the slot name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Waiting => "waiting",
            Kind::Success => "success",
            Kind::Error => "error",
        }
    }

    pub(crate) fn default_text(self) -> &'static str {
        match self {
            Kind::Waiting => "<h1>Please Wait...</h1>",
            Kind::Success => "<h3>Submission Received</h3><p>Thank you!</p>",
            Kind::Error => {
                "<h3>Oopsie!</h3><p>There was an error. Your submission was not received.</p>"
            }
        }
    }
}

// Which of the competing sources produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    Override,
    Slotted,
    Body,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub kind: Kind,
    pub source: MessageSource,
    // None when slotted host markup is the message (the DOM is the message).
    pub message: Option<String>,
}

// Host-provided message nodes, captured once at attachment. The host owns
// the nodes; resolution only rewrites their slot attribute.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageSources {
    waiting: Vec<NodeId>,
    success: Vec<NodeId>,
    error: Vec<NodeId>,
}

impl MessageSources {
    pub(crate) fn capture(dom: &Dom, widget: NodeId) -> Result<Self> {
        Ok(Self {
            waiting: dom.query_selector_all_from(widget, "[slot=waiting]")?,
            success: dom.query_selector_all_from(widget, "[slot=success]")?,
            error: dom.query_selector_all_from(widget, "[slot=error]")?,
        })
    }

    pub(crate) fn for_kind(&self, kind: Kind) -> &[NodeId] {
        match kind {
            Kind::Waiting => &self.waiting,
            Kind::Success => &self.success,
            Kind::Error => &self.error,
        }
    }
}

// Picks the winning message source for the envelope and applies the DOM
// markers: container kind class, slot reassignment for slotted sources.
pub(crate) fn resolve_message(
    dom: &mut Dom,
    sources: &MessageSources,
    settings: &Settings,
    container: NodeId,
    envelope: &Envelope,
) -> Result<Resolution> {
    let kind = Kind::from_status(&envelope.status);

    // Undo the previous resolution: stale kind classes off the container,
    // every captured node back on its own slot.
    for stale in Kind::ALL {
        dom.remove_class(container, stale.name())?;
        for node in sources.for_kind(stale) {
            dom.set_attr(*node, "slot", stale.name())?;
        }
    }

    let resolution = if let OverrideSlot::Markup(markup) = settings.override_slot(kind) {
        let message = match settings.response_format() {
            ResponseFormat::Json => interpolate_string(markup, &envelope.body.to_value()),
            ResponseFormat::Html => markup.clone(),
        };
        Resolution {
            kind,
            source: MessageSource::Override,
            message: Some(message),
        }
    } else if !sources.for_kind(kind).is_empty() {
        if settings.response_format() == ResponseFormat::Json {
            let data = envelope.body.to_value();
            for node in sources.for_kind(kind) {
                interpolate_nodes(dom, *node, &data)?;
            }
        }
        for node in sources.for_kind(kind) {
            dom.set_attr(*node, "slot", "message")?;
        }
        Resolution {
            kind,
            source: MessageSource::Slotted,
            message: None,
        }
    } else if settings.response_format() == ResponseFormat::Html && kind != Kind::Waiting {
        Resolution {
            kind,
            source: MessageSource::Body,
            message: Some(envelope.body.to_text()),
        }
    } else {
        Resolution {
            kind,
            source: MessageSource::Default,
            message: Some(kind.default_text().to_string()),
        }
    };

    dom.add_class(container, kind.name())?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Result<(Dom, NodeId, MessageSources)> {
        let dom = parse_html(
            "<form-widget>\
             <p slot=success>Thanks, {{data.name}}!</p>\
             <dialog><div id=dialog-message></div></dialog>\
             </form-widget>",
        )?;
        let widget = dom
            .query_selector("form-widget")?
            .ok_or_else(|| Error::MissingWidget("form-widget".into()))?;
        let sources = MessageSources::capture(&dom, widget)?;
        let container = dom
            .query_selector("#dialog-message")?
            .ok_or_else(|| Error::SelectorNotFound("#dialog-message".into()))?;
        Ok((dom, container, sources))
    }

    fn success_envelope() -> Envelope {
        Envelope {
            body: Body::Json(serde_json::json!({"data": {"name": "Foo"}})),
            status: Status::Code(200),
        }
    }

    #[test]
    fn default_success_round_trip() -> Result<()> {
        let mut dom = parse_html("<div id=dialog-message></div>")?;
        let container = dom
            .query_selector("#dialog-message")?
            .ok_or_else(|| Error::SelectorNotFound("#dialog-message".into()))?;
        let sources = MessageSources::default();
        let settings = Settings::default();
        let resolution = resolve_message(
            &mut dom,
            &sources,
            &settings,
            container,
            &success_envelope(),
        )?;
        assert_eq!(resolution.kind, Kind::Success);
        assert_eq!(resolution.source, MessageSource::Default);
        assert_eq!(
            resolution.message.as_deref(),
            Some("<h3>Submission Received</h3><p>Thank you!</p>")
        );
        assert!(dom.has_class(container, "success"));
        Ok(())
    }

    #[test]
    fn override_wins_over_slotted_nodes() -> Result<()> {
        let (mut dom, container, sources) = fixture()?;
        let mut settings = Settings::default();
        settings.set_override(Kind::Success, "<p>Hi {{data.name}}</p>");
        let resolution = resolve_message(
            &mut dom,
            &sources,
            &settings,
            container,
            &success_envelope(),
        )?;
        assert_eq!(resolution.source, MessageSource::Override);
        assert_eq!(resolution.message.as_deref(), Some("<p>Hi Foo</p>"));
        Ok(())
    }

    #[test]
    fn suppressed_override_falls_through_to_slots() -> Result<()> {
        let (mut dom, container, sources) = fixture()?;
        let mut settings = Settings::default();
        settings.set_override(Kind::Success, "null");
        let resolution = resolve_message(
            &mut dom,
            &sources,
            &settings,
            container,
            &success_envelope(),
        )?;
        assert_eq!(resolution.source, MessageSource::Slotted);
        assert_eq!(resolution.message, None);
        Ok(())
    }

    #[test]
    fn slotted_nodes_interpolate_and_move_to_message_slot() -> Result<()> {
        let (mut dom, container, sources) = fixture()?;
        let settings = Settings::default();
        let resolution = resolve_message(
            &mut dom,
            &sources,
            &settings,
            container,
            &success_envelope(),
        )?;
        assert_eq!(resolution.source, MessageSource::Slotted);
        let node = sources.for_kind(Kind::Success)[0];
        assert_eq!(dom.attr(node, "slot").as_deref(), Some("message"));
        assert_eq!(dom.text_content(node), "Thanks, Foo!");
        Ok(())
    }

    #[test]
    fn resolution_resets_slots_and_classes_each_call() -> Result<()> {
        let (mut dom, container, sources) = fixture()?;
        let settings = Settings::default();
        resolve_message(
            &mut dom,
            &sources,
            &settings,
            container,
            &success_envelope(),
        )?;
        let waiting = Envelope {
            body: Body::Text(String::new()),
            status: Status::Pending,
        };
        resolve_message(&mut dom, &sources, &settings, container, &waiting)?;
        let node = sources.for_kind(Kind::Success)[0];
        assert_eq!(dom.attr(node, "slot").as_deref(), Some("success"));
        assert!(dom.has_class(container, "waiting"));
        assert!(!dom.has_class(container, "success"));
        Ok(())
    }

    #[test]
    fn html_format_trusts_the_server_body() -> Result<()> {
        let mut dom = parse_html("<div id=dialog-message></div>")?;
        let container = dom
            .query_selector("#dialog-message")?
            .ok_or_else(|| Error::SelectorNotFound("#dialog-message".into()))?;
        let mut settings = Settings::default();
        settings.set_response("html");
        let envelope = Envelope {
            body: Body::Text("<h2>Rendered</h2>".into()),
            status: Status::Code(201),
        };
        let resolution = resolve_message(
            &mut dom,
            &MessageSources::default(),
            &settings,
            container,
            &envelope,
        )?;
        assert_eq!(resolution.source, MessageSource::Body);
        assert_eq!(resolution.message.as_deref(), Some("<h2>Rendered</h2>"));
        Ok(())
    }

    #[test]
    fn transport_failure_resolves_as_error_kind() -> Result<()> {
        let mut dom = parse_html("<div id=dialog-message></div>")?;
        let container = dom
            .query_selector("#dialog-message")?
            .ok_or_else(|| Error::SelectorNotFound("#dialog-message".into()))?;
        let settings = Settings::default();
        let envelope = Envelope {
            body: Body::Text("<h1>Server Error</h1>".into()),
            status: Status::Failed,
        };
        let resolution = resolve_message(
            &mut dom,
            &MessageSources::default(),
            &settings,
            container,
            &envelope,
        )?;
        assert_eq!(resolution.kind, Kind::Error);
        assert!(dom.has_class(container, "error"));
        Ok(())
    }
}
