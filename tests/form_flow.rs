use form_tester::{
    Error, FieldEncoding, FormHarness, Kind, MessageSource, RequestDescriptor, TransportMode,
    WireReply,
};

const CONTACT_FORM: &str = r#"
<form-widget>
  <form action="https://example.org/contact-test" method="post">
    <label>Name <input name="name" value=""></label>
    <label>Email <input name="email" type="email" value=""></label>
    <label>Message <textarea name="message">Hi there</textarea></label>
    <label><input type="checkbox" name="subscribe" value="yes"> Subscribe</label>
    <select name="topic">
      <option value="sales">Sales</option>
      <option value="support">Support</option>
    </select>
    <input type="submit" value="Send">
  </form>
</form-widget>
"#;

#[test]
fn full_echo_round_trip_from_typing_to_close() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(CONTACT_FORM)?;
    harness.type_text("input[name=name]", "Ada")?;
    harness.type_text("input[name=email]", "ada@example.org")?;
    harness.type_text("textarea", "Hello!")?;
    harness.set_checked("input[name=subscribe]", true)?;
    harness.select_option("select", "support")?;

    harness.submit()?;
    assert!(harness.dialog_open()?);
    harness.assert_dialog_text("Please Wait...")?;
    harness.assert_message_class("waiting")?;

    let request = harness
        .last_request()
        .cloned()
        .ok_or_else(|| Error::Harness("no request recorded".into()))?;
    assert_eq!(request.method, "POST");
    assert_eq!(request.mode, TransportMode::Echo);
    assert_eq!(request.encoding, FieldEncoding::Body);
    assert_eq!(
        request.fields,
        vec![
            ("name".to_string(), "Ada".to_string()),
            ("email".to_string(), "ada@example.org".to_string()),
            ("message".to_string(), "Hello!".to_string()),
            ("subscribe".to_string(), "yes".to_string()),
            ("topic".to_string(), "support".to_string()),
        ]
    );

    harness.advance_time(1_000)?;
    harness.assert_dialog_text("Submission ReceivedThank you!")?;
    harness.assert_message_class("success")?;
    harness.assert_focused("button")?;

    harness.close_dialog()?;
    assert!(!harness.dialog_open()?);
    harness.assert_value("input[name=name]", "")?;
    harness.assert_value("textarea", "Hi there")?;
    harness.assert_checked("input[name=subscribe]", false)?;
    harness.assert_value("select", "sales")?;
    Ok(())
}

#[test]
fn get_form_reaches_the_collaborator_with_an_encoded_query() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget>
             <form action="https://example.org/search" method="get">
               <input name="q" value="grün tea">
               <input name="page" value="2">
             </form>
           </form-widget>"#,
    )?;
    harness.set_backend(
        |request: &RequestDescriptor| -> std::result::Result<WireReply, String> {
            assert_eq!(
                request.target,
                "https://example.org/search?q=gr%C3%BCn%20tea&page=2"
            );
            assert_eq!(request.encoding, FieldEncoding::Query);
            Ok(WireReply {
                status: 200,
                content_type: "application/json".to_string(),
                body: "{\"ok\":true}".to_string(),
            })
        },
    );

    harness.submit()?;
    harness.assert_message_class("success")?;
    Ok(())
}

#[test]
fn waiting_always_precedes_the_result_presentation() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget>
             <form action="/api" method="post"><input name="a" value="1"></form>
           </form-widget>"#,
    )?;
    harness.enable_trace(true);
    harness.set_trace_stderr(false);
    harness.set_backend(
        |_request: &RequestDescriptor| -> std::result::Result<WireReply, String> {
            Ok(WireReply {
                status: 200,
                content_type: "application/json".to_string(),
                body: "{}".to_string(),
            })
        },
    );

    harness.submit()?;
    let logs = harness.take_trace_logs();
    let waiting_at = logs
        .iter()
        .position(|line| line.contains("present kind=waiting"));
    let success_at = logs
        .iter()
        .position(|line| line.contains("present kind=success"));
    assert!(
        matches!((waiting_at, success_at), (Some(w), Some(s)) if w < s),
        "expected waiting before success, trace: {logs:?}"
    );
    Ok(())
}

#[test]
fn slow_echo_delay_is_observable_on_the_virtual_clock() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget>
             <form action="submit-test" method="post"><input name="n" value="1"></form>
           </form-widget>"#,
    )?;
    harness.set_echo_delay_ms(2_500)?;

    harness.submit()?;
    let pending = harness.pending_tasks();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].due_at, 2_500);

    harness.advance_time(2_499)?;
    harness.assert_message_class("waiting")?;
    harness.advance_time(1)?;
    harness.assert_message_class("success")?;
    assert_eq!(harness.now_ms(), 2_500);
    Ok(())
}

#[test]
fn html_response_format_renders_the_echo_markup() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget response="html">
             <form action="submit-test" method="post"><input name="n" value="1"></form>
           </form-widget>"#,
    )?;
    harness.submit()?;
    harness.flush()?;

    harness.assert_message_class("success")?;
    harness.assert_text("h1", "Success")?;
    Ok(())
}

#[test]
fn override_attributes_replace_every_kind_of_message() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget waiting="Hold on"
                        success="Saved {{data.name}}"
                        error="Could not save {{data.name}}">
             <form action="submit-test" method="post"><input name="name" value="Plan A"></form>
           </form-widget>"#,
    )?;

    harness.submit()?;
    harness.assert_dialog_text("Hold on")?;
    harness.flush()?;
    harness.assert_dialog_text("Saved Plan A")?;

    harness.set_attribute("force-error", "")?;
    harness.submit()?;
    harness.flush()?;
    harness.assert_dialog_text("Could not save Plan A")?;
    harness.assert_message_class("error")?;
    Ok(())
}

#[test]
fn suppressed_override_falls_back_to_slotted_nodes() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget success="null">
             <form action="submit-test" method="post"><input name="name" value="Bea"></form>
             <p slot="success">Welcome back, {{data.name}}.</p>
           </form-widget>"#,
    )?;
    harness.submit()?;
    harness.flush()?;

    let resolution = harness
        .last_resolution()
        .cloned()
        .ok_or_else(|| Error::Harness("no resolution recorded".into()))?;
    assert_eq!(resolution.source, MessageSource::Slotted);
    harness.assert_text("p[slot=message]", "Welcome back, Bea.")?;
    Ok(())
}

#[test]
fn repeated_submissions_rebind_slotted_nodes_each_time() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(
        r#"<form-widget>
             <form action="submit-test" method="post"><input name="name" value=""></form>
             <span slot="success">done</span>
             <span slot="error">failed</span>
           </form-widget>"#,
    )?;

    harness.type_text("input[name=name]", "first")?;
    harness.submit()?;
    harness.flush()?;
    harness.assert_exists("span[slot=message]")?;
    harness.assert_text("span[slot=message]", "done")?;

    harness.set_attribute("force-error", "")?;
    harness.submit()?;
    harness.flush()?;
    // The success span went back to its own slot; the error span holds the
    // message slot now.
    harness.assert_text("span[slot=message]", "failed")?;
    harness.assert_exists("span[slot=success]")?;
    harness.assert_message_class("error")?;
    Ok(())
}

#[test]
fn testing_mode_keeps_the_page_quiet_but_records_resolutions() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(CONTACT_FORM)?;
    harness.set_testing(true);
    harness.type_text("input[name=name]", "Quiet")?;

    harness.submit()?;
    assert!(!harness.dialog_open()?);
    harness.flush()?;
    assert!(!harness.dialog_open()?);

    let resolution = harness
        .last_resolution()
        .cloned()
        .ok_or_else(|| Error::Harness("no resolution recorded".into()))?;
    assert_eq!(resolution.kind, Kind::Success);
    harness.assert_message_class("success")?;
    Ok(())
}

#[test]
fn detach_keeps_the_dom_but_swallows_late_deliveries() -> form_tester::Result<()> {
    let mut harness = FormHarness::from_html(CONTACT_FORM)?;
    harness.submit()?;
    harness.assert_message_class("waiting")?;

    harness.detach();
    assert!(harness.is_detached());
    harness.flush()?;

    // The waiting presentation is the last one; the echo result was dropped.
    harness.assert_message_class("waiting")?;
    assert!(harness.pending_tasks().is_empty());

    match harness.submit() {
        Err(Error::Harness(message)) => assert!(message.contains("detached")),
        other => panic!("expected submit on detached widget to fail, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn assertion_failures_carry_a_dom_snippet() -> form_tester::Result<()> {
    let harness = FormHarness::from_html(CONTACT_FORM)?;
    match harness.assert_value("input[name=name]", "unexpected") {
        Err(Error::AssertionFailed {
            selector,
            expected,
            actual,
            dom_snippet,
        }) => {
            assert_eq!(selector, "input[name=name]");
            assert_eq!(expected, "unexpected");
            assert_eq!(actual, "");
            assert!(dom_snippet.contains("<input"));
        }
        other => panic!("expected assertion failure, got: {other:?}"),
    }

    match harness.assert_text("output", "anything") {
        Err(Error::SelectorNotFound(selector)) => assert_eq!(selector, "output"),
        other => panic!("expected missing selector error, got: {other:?}"),
    }

    let dump = harness.dump_dom("form")?;
    assert!(dump.contains("<textarea name=\"message\">"));
    Ok(())
}

#[test]
fn descendant_selectors_are_reported_as_unsupported() -> form_tester::Result<()> {
    let harness = FormHarness::from_html(CONTACT_FORM)?;
    match harness.assert_exists("form input") {
        Err(Error::UnsupportedSelector(_)) => Ok(()),
        other => panic!("expected unsupported selector error, got: {other:?}"),
    }
}
