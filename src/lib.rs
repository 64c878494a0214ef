use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    Harness(String),
    MissingWidget(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::Harness(msg) => write!(f, "harness error: {msg}"),
            Self::MissingWidget(msg) => write!(f, "missing widget: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

mod config;
mod dom;
mod html;
mod json_repair;
mod message;
mod sanitize;
mod submit;
mod template;
mod transport;

pub use config::{
    FetchOptions, OverrideSlot, ResponseFormat, SettingChange, Settings, OBSERVED_ATTRIBUTES,
};
pub use json_repair::lenient_parse;
pub use message::{Kind, MessageSource, Resolution};
pub use sanitize::sanitize_markup;
pub use template::interpolate_string;
pub use transport::{
    Backend, Body, Envelope, FieldEncoding, RequestDescriptor, Status, TransportMode, WireReply,
};

pub(crate) use config::StyleRegistry;
pub(crate) use dom::{is_radio_input, Dom, NodeId, NodeType};
pub(crate) use html::{
    escape_html_attr_for_serialization, escape_html_text_for_serialization, is_void_tag,
    parse_html, truncate_chars,
};
pub(crate) use message::{resolve_message, MessageSources};
pub(crate) use template::interpolate_nodes;
pub(crate) use transport::{append_query, fault_envelope, normalize_reply, synthesize_echo};

pub(crate) const WIDGET_TAG: &str = "form-widget";

// One queued echo delivery. Unlike a browser timer there is no interval and
// no handler: the payload is the envelope itself.
#[derive(Debug, Clone)]
struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    envelope: Envelope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
}

/// Deterministic host for one `<form-widget>` element: owns the parsed DOM,
/// the widget settings, the captured message sources, a virtual clock for
/// the simulated transport delay, and a bounded trace log for assertions.
pub struct FormHarness {
    dom: Dom,
    widget: NodeId,
    form: Option<NodeId>,
    settings: Settings,
    sources: MessageSources,
    styles: StyleRegistry,
    holds_style_ref: bool,
    backend: Option<Box<dyn Backend>>,
    testing: bool,
    echo_delay_ms: i64,
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    next_task_id: i64,
    next_task_order: i64,
    detached: bool,
    active_element: Option<NodeId>,
    last_request: Option<RequestDescriptor>,
    last_resolution: Option<Resolution>,
    trace: bool,
    trace_tasks: bool,
    trace_dialog: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl FormHarness {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        let widget = dom
            .query_selector(WIDGET_TAG)?
            .ok_or_else(|| Error::MissingWidget(WIDGET_TAG.to_string()))?;

        let mut harness = Self {
            dom,
            widget,
            form: None,
            settings: Settings::default(),
            sources: MessageSources::default(),
            styles: StyleRegistry::default(),
            holds_style_ref: false,
            backend: None,
            testing: false,
            echo_delay_ms: 1_000,
            task_queue: Vec::new(),
            now_ms: 0,
            next_task_id: 1,
            next_task_order: 0,
            detached: false,
            active_element: None,
            last_request: None,
            last_resolution: None,
            trace: false,
            trace_tasks: true,
            trace_dialog: true,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        };
        harness.attach()?;
        Ok(harness)
    }

    // Mirrors the attach sequence of the custom element: initial attributes
    // route through their setters first, then the default dialog subtree is
    // mounted when the host supplied none, the shared stylesheet is acquired,
    // and the kind-slotted message nodes are captured.
    fn attach(&mut self) -> Result<()> {
        let initial = self
            .dom
            .element(self.widget)
            .map(|element| element.attrs.clone())
            .unwrap_or_default();
        for (name, value) in initial {
            if let Some(change) = self.settings.apply_attribute(&name, &value) {
                self.apply_setting_change(&name, change)?;
            }
        }

        if self
            .dom
            .query_selector_from(self.widget, "dialog")?
            .is_none()
        {
            self.mount_default_dialog()?;
        }

        if !self.holds_style_ref {
            self.styles.acquire(&mut self.dom)?;
            self.holds_style_ref = true;
        }

        self.form = self.host_form()?;
        self.sources = MessageSources::capture(&self.dom, self.widget)?;
        Ok(())
    }

    // First form inside the widget that is not dialog chrome. The dialog's
    // own close form always carries method=dialog.
    fn host_form(&self) -> Result<Option<NodeId>> {
        for form in self.dom.query_selector_all_from(self.widget, "form")? {
            let method = self.dom.attr(form, "method").unwrap_or_default();
            if method.eq_ignore_ascii_case("dialog") {
                continue;
            }
            if self.dom.find_ancestor_by_tag(form, "dialog").is_some() {
                continue;
            }
            return Ok(Some(form));
        }
        Ok(None)
    }

    fn mount_default_dialog(&mut self) -> Result<()> {
        let dialog = self.dom.create_element(
            self.widget,
            "dialog".to_string(),
            vec![("class".to_string(), "modeless".to_string())],
        );
        let _container = self.dom.create_element(
            dialog,
            "div".to_string(),
            vec![("id".to_string(), "dialog-message".to_string())],
        );
        let close_form = self.dom.create_element(
            dialog,
            "form".to_string(),
            vec![
                ("method".to_string(), "dialog".to_string()),
                ("class".to_string(), "hidden".to_string()),
            ],
        );
        let button = self
            .dom
            .create_element(close_form, "button".to_string(), Vec::new());
        self.dom.create_text(button, "OK".to_string());
        Ok(())
    }

    /// Writes an attribute on the widget root. Observed attribute names also
    /// route to the matching setting with its normalization rules.
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        self.dom.set_attr(self.widget, &lowered, value)?;
        if let Some(change) = self.settings.apply_attribute(&lowered, value) {
            self.trace_line(format!("[config] set {lowered}={value:?}"));
            self.apply_setting_change(&lowered, change)?;
        }
        Ok(())
    }

    pub(crate) fn apply_setting_change(&mut self, name: &str, change: SettingChange) -> Result<()> {
        match change {
            SettingChange::Applied => Ok(()),
            SettingChange::InsertFailField => self.insert_fail_field(),
            SettingChange::RemoveFailField => self.remove_fail_field(),
            SettingChange::EnableDefaultCss => self.acquire_default_style(),
            SettingChange::DisableDefaultCss => self.release_default_style(),
            SettingChange::Rejected(reason) => {
                self.trace_line(format!("[config] {name} rejected: {reason}"));
                Ok(())
            }
        }
    }

    // A cooperating backend reads the hidden fail field and answers with an
    // error status. Insertion is idempotent; removal leaves no residue.
    fn insert_fail_field(&mut self) -> Result<()> {
        if self
            .dom
            .query_selector_from(self.widget, "input[name=fail]")?
            .is_some()
        {
            return Ok(());
        }
        let parent = self.host_form()?.unwrap_or(self.widget);
        self.dom.create_element(
            parent,
            "input".to_string(),
            vec![
                ("name".to_string(), "fail".to_string()),
                ("value".to_string(), "true".to_string()),
                ("type".to_string(), "hidden".to_string()),
            ],
        );
        Ok(())
    }

    fn remove_fail_field(&mut self) -> Result<()> {
        if let Some(input) = self
            .dom
            .query_selector_from(self.widget, "input[name=fail]")?
        {
            self.dom.remove_node(input)?;
        }
        Ok(())
    }

    // A widget holds at most one stylesheet reference, so repeated attribute
    // writes stay idempotent while the registry refcounts across widgets.
    fn acquire_default_style(&mut self) -> Result<()> {
        if self.holds_style_ref {
            return Ok(());
        }
        self.styles.acquire(&mut self.dom)?;
        self.holds_style_ref = true;
        Ok(())
    }

    fn release_default_style(&mut self) -> Result<()> {
        if !self.holds_style_ref {
            return Ok(());
        }
        self.styles.release(&mut self.dom)?;
        self.holds_style_ref = false;
        Ok(())
    }

    /// Marks the widget detached. Queued deliveries stay queued but are
    /// dropped when they fire; the shared stylesheet is not released.
    pub fn detach(&mut self) {
        self.detached = true;
        let pending = self.task_queue.len();
        self.trace_task_line(format!("[task] detach pending={pending}"));
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_request(&self) -> Option<&RequestDescriptor> {
        self.last_request.as_ref()
    }

    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }

    /// Installs the real-mode transport collaborator.
    pub fn set_backend(&mut self, backend: impl Backend + 'static) {
        self.backend = Some(Box::new(backend));
    }

    /// Testing mode skips the waiting presentation and resolves results
    /// without opening the dialog; inspect them via `last_resolution`.
    pub fn set_testing(&mut self, testing: bool) {
        self.testing = testing;
    }

    pub fn set_echo_delay_ms(&mut self, delay_ms: i64) -> Result<()> {
        if delay_ms < 0 {
            return Err(Error::Harness(
                "set_echo_delay_ms requires non-negative milliseconds".into(),
            ));
        }
        self.echo_delay_ms = delay_ms;
        Ok(())
    }

    // ---- user actions -------------------------------------------------

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        if self.dom.readonly(target) {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();

        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let kind = self
            .dom
            .attr(target, "type")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" || (kind != "checkbox" && kind != "radio") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "checkbox or radio input".into(),
                actual: format!("{tag}[type={kind}]"),
            });
        }

        self.dom.set_checked(target, checked)?;
        if checked && kind == "radio" {
            self.uncheck_other_radios_in_group(target)?;
        }
        Ok(())
    }

    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "select" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "select".into(),
                actual: tag,
            });
        }

        let options = self.dom.select_option_values(target)?;
        let found = options
            .iter()
            .any(|(_, option_value)| option_value == value);
        if !found {
            return Err(Error::Harness(format!(
                "select {selector} has no option with value {value:?}"
            )));
        }
        self.dom.set_value(target, value)
    }

    fn uncheck_other_radios_in_group(&mut self, target: NodeId) -> Result<()> {
        let target_name = self.dom.attr(target, "name").unwrap_or_default();
        if target_name.is_empty() {
            return Ok(());
        }
        let target_form = self.form_owner(target);

        for node in self.dom.all_element_nodes() {
            if node == target {
                continue;
            }
            if !is_radio_input(&self.dom, node) {
                continue;
            }
            if self.dom.attr(node, "name").unwrap_or_default() != target_name {
                continue;
            }
            if self.form_owner(node) != target_form {
                continue;
            }
            if self.dom.checked(node)? {
                self.dom.set_checked(node, false)?;
            }
        }

        Ok(())
    }

    fn form_owner(&self, node_id: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(node_id)
            .map(|t| t.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            Some(node_id)
        } else {
            self.dom.find_ancestor_by_tag(node_id, "form")
        }
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) {
        if self.dom.disabled(node) {
            return;
        }
        self.active_element = Some(node);
    }

    // ---- virtual clock ------------------------------------------------

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub fn pending_tasks(&self) -> Vec<PendingTask> {
        let mut tasks = self
            .task_queue
            .iter()
            .map(|task| PendingTask {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        tasks.sort_by_key(|task| (task.due_at, task.order));
        tasks
    }

    pub(crate) fn schedule_delivery(&mut self, envelope: Envelope, due_at: i64) -> i64 {
        let id = self.next_task_id;
        self.next_task_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            envelope,
        });
        self.trace_task_line(format!("[task] schedule id={id} due_at={due_at}"));
        id
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Harness(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms;
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let ran = self.run_due_tasks_internal()?;
        self.trace_task_line(format!(
            "[task] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Harness(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        let from = self.now_ms;
        self.now_ms = target_ms;
        let ran = self.run_due_tasks_internal()?;
        self.trace_task_line(format!(
            "[task] advance_to from={} to={} ran={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    /// Runs every queued task, advancing the clock to each task's due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.now_ms;
        let ran = self.run_task_queue(None, true)?;
        self.trace_task_line(format!(
            "[task] flush from={} to={} ran={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn run_due_tasks(&mut self) -> Result<usize> {
        let ran = self.run_due_tasks_internal()?;
        self.trace_task_line(format!(
            "[task] run_due now_ms={} ran={}",
            self.now_ms, ran
        ));
        Ok(ran)
    }

    fn run_due_tasks_internal(&mut self) -> Result<usize> {
        self.run_task_queue(Some(self.now_ms), false)
    }

    fn run_task_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            let task = self.task_queue.remove(next_idx);
            if advance_clock && task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.execute_task(task)?;
        }
        Ok(steps)
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| {
                if let Some(limit) = due_limit {
                    task.due_at <= limit
                } else {
                    true
                }
            })
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn execute_task(&mut self, task: ScheduledTask) -> Result<()> {
        if self.detached {
            self.trace_task_line(format!("[task] drop id={} detached", task.id));
            return Ok(());
        }
        self.trace_task_line(format!(
            "[task] run id={} due_at={} now_ms={}",
            task.id, task.due_at, self.now_ms
        ));
        self.deliver(task.envelope)
    }

    // ---- trace log ----------------------------------------------------

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_tasks(&mut self, enabled: bool) {
        self.trace_tasks = enabled;
    }

    pub fn set_trace_dialog(&mut self, enabled: bool) {
        self.trace_dialog = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Harness(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        while self.trace_logs.len() > self.trace_log_limit {
            self.trace_logs.remove(0);
        }
        Ok(())
    }

    pub(crate) fn trace_task_line(&mut self, line: String) {
        if self.trace && self.trace_tasks {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_dialog_line(&mut self, line: String) {
        if self.trace && self.trace_dialog {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_line(&mut self, line: String) {
        if self.trace {
            if self.trace_to_stderr {
                eprintln!("{line}");
            }
            if self.trace_logs.len() >= self.trace_log_limit {
                self.trace_logs.remove(0);
            }
            self.trace_logs.push(line);
        }
    }

    // ---- assertions and inspection -------------------------------------

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_checked(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.checked(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_absent(&self, selector: &str) -> Result<()> {
        let found = self
            .dom
            .query_selector(selector)?
            .map(|node| self.node_snippet(node));
        if let Some(snippet) = found {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "no match".into(),
                actual: "match".into(),
                dom_snippet: snippet,
            });
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.active_element != Some(target) {
            let actual = self
                .active_element
                .map(|node| self.node_snippet(node))
                .unwrap_or_else(|| "nothing focused".into());
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "focused".into(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}
