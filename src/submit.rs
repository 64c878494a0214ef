use super::*;

// Form action targets carry transport markers at their end: a `false` suffix
// aborts the submission entirely, a `test` suffix selects the simulated echo.
const NOOP_TARGET_SUFFIX: &str = "false";
const ECHO_TARGET_SUFFIX: &str = "test";

impl FormHarness {
    /// Runs one submission: request building, waiting presentation,
    /// transport, result presentation. Echo-mode results are delivered later
    /// through the task queue; real-mode results present in this call.
    pub fn submit(&mut self) -> Result<()> {
        if self.detached {
            return Err(Error::Harness("widget is detached".into()));
        }
        let form = self
            .form
            .ok_or_else(|| Error::Harness("widget has no form to submit".into()))?;

        let raw_target = self.dom.attr(form, "action").unwrap_or_default();
        if raw_target.ends_with(NOOP_TARGET_SUFFIX) {
            self.trace_line(format!("[submit] abort target={raw_target}"));
            return Ok(());
        }

        let descriptor = self.build_request(form, &raw_target)?;
        self.trace_line(format!(
            "[submit] begin method={} target={} mode={:?} fields={}",
            descriptor.method,
            descriptor.target,
            descriptor.mode,
            descriptor.fields.len()
        ));
        self.last_request = Some(descriptor.clone());

        // The waiting presentation always precedes the result.
        if !self.testing {
            self.present(&Envelope {
                body: Body::Text(String::new()),
                status: Status::Pending,
            })?;
        }

        match descriptor.mode {
            TransportMode::Echo => {
                let envelope = synthesize_echo(
                    &descriptor,
                    self.settings.response_format(),
                    self.settings.force_error(),
                );
                let due_at = self.now_ms.saturating_add(self.echo_delay_ms);
                self.schedule_delivery(envelope, due_at);
                Ok(())
            }
            TransportMode::Real => {
                let envelope = self.exchange(&descriptor);
                self.deliver(envelope)
            }
        }
    }

    fn build_request(&self, form: NodeId, raw_target: &str) -> Result<RequestDescriptor> {
        let method = self
            .dom
            .attr(form, "method")
            .filter(|method| !method.is_empty())
            .unwrap_or_else(|| "post".to_string())
            .to_ascii_uppercase();
        let fields = self.dom.form_data_entries(form)?;

        let mut options = self.settings.fetch_options().entries();
        let mut headers = match options.remove("headers") {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        if !headers.contains_key("Accept") {
            headers.insert(
                "Accept".to_string(),
                serde_json::Value::String(
                    self.settings.response_format().accept_header().to_string(),
                ),
            );
        }

        // Mode is decided on the raw target; query encoding could move a
        // field value into the suffix position.
        let mode = if raw_target.ends_with(ECHO_TARGET_SUFFIX) {
            TransportMode::Echo
        } else {
            TransportMode::Real
        };

        let (target, encoding) = if method == "GET" || method == "HEAD" {
            (append_query(raw_target, &fields), FieldEncoding::Query)
        } else {
            (raw_target.to_string(), FieldEncoding::Body)
        };

        Ok(RequestDescriptor {
            method,
            target,
            headers,
            options,
            fields,
            encoding,
            mode,
        })
    }

    // A missing collaborator or a collaborator error degrades to the fault
    // envelope; a failed send surfaces as an error-kind message, never Err.
    fn exchange(&mut self, descriptor: &RequestDescriptor) -> Envelope {
        let outcome = self
            .backend
            .as_mut()
            .map(|backend| backend.exchange(descriptor));
        match outcome {
            None => {
                self.trace_line("[transport] no backend installed".to_string());
                fault_envelope()
            }
            Some(Err(reason)) => {
                self.trace_line(format!("[transport] exchange failed: {reason}"));
                fault_envelope()
            }
            Some(Ok(reply)) => {
                self.trace_line(format!(
                    "[transport] reply status={} content_type={}",
                    reply.status, reply.content_type
                ));
                normalize_reply(reply)
            }
        }
    }

    // Task-queue delivery point. Testing mode resolves the message without
    // touching the dialog; the result is inspectable via `last_resolution`.
    pub(crate) fn deliver(&mut self, envelope: Envelope) -> Result<()> {
        if self.testing {
            let container = self.message_container()?;
            let resolution = resolve_message(
                &mut self.dom,
                &self.sources,
                &self.settings,
                container,
                &envelope,
            )?;
            self.trace_dialog_line(format!(
                "[dialog] resolve kind={} source={:?}",
                resolution.kind.name(),
                resolution.source
            ));
            self.last_resolution = Some(resolution);
            return Ok(());
        }
        self.present(&envelope)
    }

    fn present(&mut self, envelope: &Envelope) -> Result<()> {
        let dialog = self.dialog_node()?;
        let container = self.message_container()?;
        let resolution = resolve_message(
            &mut self.dom,
            &self.sources,
            &self.settings,
            container,
            envelope,
        )?;

        // Captured before the container is rewritten: the close form may sit
        // inside it from the previous presentation and the arena id survives
        // the detach.
        let close_form = self.dom.query_selector_from(dialog, "form[method=dialog]")?;

        if let Some(message) = &resolution.message {
            // Interpolated values and reply bodies may carry stray angle
            // brackets; unparseable markup degrades to its literal text.
            if self.dom.set_inner_html(container, message).is_err() {
                self.dom
                    .set_inner_html(container, &escape_html_text_for_serialization(message))?;
            }
        }

        if let Some(close_form) = close_form {
            self.dom.append_child(container, close_form)?;
            if resolution.kind == Kind::Waiting {
                // No status yet, nothing to dismiss.
                self.dom.add_class(close_form, "hidden")?;
            } else {
                self.dom.remove_class(close_form, "hidden")?;
                if let Some(button) = self
                    .dom
                    .query_selector_from(close_form, "button, input[type=submit]")?
                {
                    self.focus_node(button);
                }
            }
        }

        if self.settings.modal() {
            self.dom.remove_class(dialog, "modeless")?;
        } else {
            self.dom.add_class(dialog, "modeless")?;
        }
        self.dom.set_attr(dialog, "open", "true")?;

        self.trace_dialog_line(format!(
            "[dialog] present kind={} source={:?}",
            resolution.kind.name(),
            resolution.source
        ));
        self.last_resolution = Some(resolution);
        Ok(())
    }

    /// Closes the dialog; with `reset` enabled the form controls return to
    /// their defaults and the first control takes focus.
    pub fn close_dialog(&mut self) -> Result<()> {
        let dialog = self.dialog_node()?;
        self.dom.remove_attr(dialog, "open")?;
        self.trace_dialog_line("[dialog] close".to_string());

        if self.settings.reset_on_close() {
            if let Some(form) = self.form {
                self.dom.reset_form_controls(form)?;
                if let Some(first) = self
                    .dom
                    .query_selector_from(form, "input, select, textarea")?
                {
                    self.focus_node(first);
                }
            }
        }
        Ok(())
    }

    pub fn dialog_open(&self) -> Result<bool> {
        let dialog = self.dialog_node()?;
        Ok(self.dom.attr(dialog, "open").is_some())
    }

    pub fn assert_dialog_text(&self, expected: &str) -> Result<()> {
        let actual = self.dialog_message_text()?;
        if actual != expected {
            let container = self.message_container()?;
            return Err(Error::AssertionFailed {
                selector: format!("#{}", self.settings.dialog_message_id()),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(container),
            });
        }
        Ok(())
    }

    pub fn assert_message_class(&self, expected: &str) -> Result<()> {
        let container = self.message_container()?;
        if !self.dom.has_class(container, expected) {
            return Err(Error::AssertionFailed {
                selector: format!("#{}", self.settings.dialog_message_id()),
                expected: expected.to_string(),
                actual: self.dom.attr(container, "class").unwrap_or_default(),
                dom_snippet: self.node_snippet(container),
            });
        }
        Ok(())
    }

    // Container text without the relocated close form.
    fn dialog_message_text(&self) -> Result<String> {
        let dialog = self.dialog_node()?;
        let container = self.message_container()?;
        let close_form = self.dom.query_selector_from(dialog, "form[method=dialog]")?;

        let mut out = String::new();
        for child in self.dom.children(container) {
            if Some(*child) == close_form {
                continue;
            }
            out.push_str(&self.dom.text_content(*child));
        }
        Ok(out)
    }

    fn dialog_node(&self) -> Result<NodeId> {
        self.dom
            .query_selector_from(self.widget, "dialog")?
            .ok_or_else(|| Error::Harness("widget has no dialog".into()))
    }

    fn message_container(&self) -> Result<NodeId> {
        let selector = format!("#{}", self.settings.dialog_message_id());
        self.dom
            .query_selector_from(self.widget, &selector)?
            .ok_or_else(|| Error::Harness(format!("no message container matches {selector}")))
    }
}
