use super::*;

// Attribute names the widget reacts to; everything else is a plain DOM write.
pub const OBSERVED_ATTRIBUTES: [&str; 10] = [
    "custom-css",
    "dialog-message-id",
    "error",
    "fetch-options",
    "force-error",
    "modal",
    "reset",
    "response",
    "success",
    "waiting",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub(crate) fn accept_header(self) -> &'static str {
        match self {
            ResponseFormat::Json => "application/json",
            ResponseFormat::Html => "text/html",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOptions {
    Object(serde_json::Map<String, serde_json::Value>),
    // Recorded parse failure, distinguishable from an empty object.
    Invalid,
}

impl FetchOptions {
    pub fn is_invalid(&self) -> bool {
        matches!(self, FetchOptions::Invalid)
    }

    pub(crate) fn entries(&self) -> serde_json::Map<String, serde_json::Value> {
        match self {
            FetchOptions::Object(map) => map.clone(),
            FetchOptions::Invalid => serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverrideSlot {
    #[default]
    Unset,
    // The literal attribute value "null": disable the override for this
    // kind; resolution falls through to the remaining sources.
    Suppressed,
    Markup(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    waiting: OverrideSlot,
    success: OverrideSlot,
    error: OverrideSlot,
}

impl Overrides {
    pub(crate) fn slot(&self, kind: Kind) -> &OverrideSlot {
        match kind {
            Kind::Waiting => &self.waiting,
            Kind::Success => &self.success,
            Kind::Error => &self.error,
        }
    }

    fn slot_mut(&mut self, kind: Kind) -> &mut OverrideSlot {
        match kind {
            Kind::Waiting => &mut self.waiting,
            Kind::Success => &mut self.success,
            Kind::Error => &mut self.error,
        }
    }
}

// DOM follow-up the caller must perform after a setting write. Mutators
// normalize and store; they never touch the tree themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Applied,
    InsertFailField,
    RemoveFailField,
    EnableDefaultCss,
    DisableDefaultCss,
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct Settings {
    response_format: ResponseFormat,
    modal: bool,
    reset_on_close: bool,
    force_error: bool,
    custom_css: bool,
    dialog_message_id: String,
    fetch_options: FetchOptions,
    overrides: Overrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            response_format: ResponseFormat::Json,
            modal: false,
            reset_on_close: true,
            force_error: false,
            custom_css: false,
            dialog_message_id: "dialog-message".to_string(),
            fetch_options: FetchOptions::Object(serde_json::Map::new()),
            overrides: Overrides::default(),
        }
    }
}

impl Settings {
    pub fn response_format(&self) -> ResponseFormat {
        self.response_format
    }

    pub fn modal(&self) -> bool {
        self.modal
    }

    pub fn reset_on_close(&self) -> bool {
        self.reset_on_close
    }

    pub fn force_error(&self) -> bool {
        self.force_error
    }

    pub fn custom_css(&self) -> bool {
        self.custom_css
    }

    pub fn dialog_message_id(&self) -> &str {
        &self.dialog_message_id
    }

    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch_options
    }

    pub fn override_slot(&self, kind: Kind) -> &OverrideSlot {
        self.overrides.slot(kind)
    }

    pub(crate) fn set_response(&mut self, raw: &str) -> SettingChange {
        match raw.to_ascii_lowercase().as_str() {
            "json" => {
                self.response_format = ResponseFormat::Json;
                SettingChange::Applied
            }
            "html" => {
                self.response_format = ResponseFormat::Html;
                SettingChange::Applied
            }
            _ => SettingChange::Rejected(format!("unsupported response format: {raw}")),
        }
    }

    pub(crate) fn set_modal(&mut self, raw: &str) -> SettingChange {
        self.modal = parse_bool_like(raw);
        SettingChange::Applied
    }

    pub(crate) fn set_reset_on_close(&mut self, raw: &str) -> SettingChange {
        self.reset_on_close = parse_bool_like(raw);
        SettingChange::Applied
    }

    pub(crate) fn set_force_error(&mut self, raw: &str) -> SettingChange {
        self.force_error = parse_bool_like(raw);
        if self.force_error {
            SettingChange::InsertFailField
        } else {
            SettingChange::RemoveFailField
        }
    }

    pub(crate) fn set_custom_css(&mut self, raw: &str) -> SettingChange {
        self.custom_css = parse_bool_like(raw);
        if self.custom_css {
            SettingChange::EnableDefaultCss
        } else {
            SettingChange::DisableDefaultCss
        }
    }

    pub(crate) fn set_dialog_message_id(&mut self, raw: &str) -> SettingChange {
        self.dialog_message_id = raw.to_string();
        SettingChange::Applied
    }

    pub(crate) fn set_fetch_options(&mut self, raw: &str) -> SettingChange {
        self.fetch_options = match lenient_parse(raw) {
            Some(serde_json::Value::Object(map)) => FetchOptions::Object(map),
            Some(serde_json::Value::Null) => FetchOptions::Object(serde_json::Map::new()),
            _ => FetchOptions::Invalid,
        };
        SettingChange::Applied
    }

    pub(crate) fn set_override(&mut self, kind: Kind, raw: &str) -> SettingChange {
        *self.overrides.slot_mut(kind) = if raw.eq_ignore_ascii_case("null") {
            OverrideSlot::Suppressed
        } else {
            OverrideSlot::Markup(sanitize_markup(raw))
        };
        SettingChange::Applied
    }

    // Routes one observed attribute write to its mutator. Returns None for
    // attribute names the widget does not react to.
    pub(crate) fn apply_attribute(&mut self, name: &str, value: &str) -> Option<SettingChange> {
        let change = match name {
            "custom-css" => self.set_custom_css(value),
            "dialog-message-id" => self.set_dialog_message_id(value),
            "error" => self.set_override(Kind::Error, value),
            "fetch-options" => self.set_fetch_options(value),
            "force-error" => self.set_force_error(value),
            "modal" => self.set_modal(value),
            "reset" => self.set_reset_on_close(value),
            "response" => self.set_response(value),
            "success" => self.set_override(Kind::Success, value),
            "waiting" => self.set_override(Kind::Waiting, value),
            _ => return None,
        };
        Some(change)
    }
}

// Only the literal string "false" (any case) reads as false; a bare attribute
// normalizes to the empty string and therefore to true.
pub(crate) fn parse_bool_like(raw: &str) -> bool {
    !raw.eq_ignore_ascii_case("false")
}

pub(crate) const DEFAULT_STYLESHEET_ID: &str = "form-widget-css";

// Structural rules only: the pipeline toggles these classes at runtime.
const DEFAULT_STYLESHEET: &str = "\
.hidden { display: none; }
dialog.modeless { position: absolute; margin: 0 auto; }
#dialog-message.waiting { opacity: 0.7; }
#dialog-message.success { color: darkgreen; }
#dialog-message.error { color: darkred; }";

// One stylesheet node per document, shared by every widget. Explicit
// refcounting replaces a check-then-insert on the live tree.
#[derive(Debug, Default)]
pub(crate) struct StyleRegistry {
    refs: usize,
}

impl StyleRegistry {
    pub(crate) fn acquire(&mut self, dom: &mut Dom) -> Result<()> {
        self.refs += 1;
        if self.refs > 1 {
            return Ok(());
        }
        let parent = match dom.query_selector("head")? {
            Some(head) => head,
            None => dom.root,
        };
        let style = dom.create_element(
            parent,
            "style".to_string(),
            vec![("id".to_string(), DEFAULT_STYLESHEET_ID.to_string())],
        );
        dom.create_text(style, DEFAULT_STYLESHEET.to_string());
        Ok(())
    }

    pub(crate) fn release(&mut self, dom: &mut Dom) -> Result<()> {
        if self.refs == 0 {
            return Ok(());
        }
        self.refs -= 1;
        if self.refs > 0 {
            return Ok(());
        }
        let selector = format!("#{DEFAULT_STYLESHEET_ID}");
        if let Some(style) = dom.query_selector(&selector)? {
            dom.remove_node(style)?;
        }
        Ok(())
    }

    pub(crate) fn refs(&self) -> usize {
        self.refs
    }
}
