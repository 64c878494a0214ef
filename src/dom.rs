use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    // Attribute order is source order so serialization stays deterministic.
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) disabled: bool,
    pub(crate) readonly: bool,
}

impl Element {
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr_entry(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    fn remove_attr_entry(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        // Browsers keep the first occurrence of a duplicated attribute.
        let mut deduped: Vec<(String, String)> = Vec::with_capacity(attrs.len());
        for (name, value) in attrs {
            if !deduped.iter().any(|(seen, _)| *seen == name) {
                deduped.push((name, value));
            }
        }
        let value = deduped
            .iter()
            .find(|(name, _)| name == "value")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        let checked = deduped.iter().any(|(name, _)| name == "checked");
        let disabled = deduped.iter().any(|(name, _)| name == "disabled");
        let readonly = deduped.iter().any(|(name, _)| name == "readonly");
        let element = Element {
            tag_name,
            attrs: deduped,
            value,
            checked,
            disabled,
            readonly,
        };
        self.create_node(Some(parent), NodeType::Element(element))
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn inner_html(&self, node_id: NodeId) -> Result<String> {
        if self.element(node_id).is_none() {
            return Err(Error::Harness("inner_html target is not an element".into()));
        }
        let mut out = String::new();
        for child in &self.nodes[node_id.0].children {
            out.push_str(&self.dump_node(*child));
        }
        Ok(out)
    }

    pub(crate) fn set_inner_html(&mut self, node_id: NodeId, html: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::Harness("inner_html target is not an element".into()));
        }

        let fragment = parse_html(html)?;

        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }

        let children = fragment.nodes[fragment.root.0].children.clone();
        for child in children {
            let _ = self.clone_subtree_from_dom(&fragment, child, Some(node_id))?;
        }
        Ok(())
    }

    fn clone_subtree_from_dom(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let node_type = match &source.nodes[source_node.0].node_type {
            NodeType::Document => {
                return Err(Error::Harness(
                    "cannot clone document node into inner_html target".into(),
                ));
            }
            NodeType::Element(element) => NodeType::Element(element.clone()),
            NodeType::Text(text) => NodeType::Text(text.clone()),
        };

        let node = self.create_node(parent, node_type);
        for child in &source.nodes[source_node.0].children {
            let _ = self.clone_subtree_from_dom(source, *child, Some(node))?;
        }
        Ok(node)
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Harness("value target is not an element".into()))?;
        Ok(element.value.clone())
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("value target is not an element".into()))?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn checked(&self, node_id: NodeId) -> Result<bool> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Harness("checked target is not an element".into()))?;
        Ok(element.checked)
    }

    pub(crate) fn set_checked(&mut self, node_id: NodeId, checked: bool) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("checked target is not an element".into()))?;
        element.checked = checked;
        Ok(())
    }

    pub(crate) fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.disabled).unwrap_or(false)
    }

    pub(crate) fn readonly(&self, node_id: NodeId) -> bool {
        self.element(node_id).map(|e| e.readonly).unwrap_or(false)
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attr(&name.to_ascii_lowercase()))
            .map(ToOwned::to_owned)
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("set_attr target is not an element".into()))?;
        let lowered = name.to_ascii_lowercase();
        element.set_attr_entry(&lowered, value);

        match lowered.as_str() {
            "value" => element.value = value.to_string(),
            "checked" => element.checked = true,
            "disabled" => element.disabled = true,
            "readonly" => element.readonly = true,
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("remove_attr target is not an element".into()))?;
        let lowered = name.to_ascii_lowercase();
        element.remove_attr_entry(&lowered);

        match lowered.as_str() {
            "value" => element.value = String::new(),
            "checked" => element.checked = false,
            "disabled" => element.disabled = false,
            "readonly" => element.readonly = false,
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.element(parent).is_none() && parent != self.root {
            return Err(Error::Harness(
                "append_child target cannot have children".into(),
            ));
        }
        if child == self.root || child == parent {
            return Err(Error::Harness("invalid append_child node".into()));
        }

        // Prevent cycles: parent must not be inside child's subtree.
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::Harness("append_child would create a cycle".into()));
            }
            cursor = self.parent(node);
        }

        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::Harness(
                "remove_child target is not a direct child".into(),
            ));
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::Harness("cannot remove document root".into()));
        }
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.remove_child(parent, node)
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .map(|name| name.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all(selector)?;
        Ok(all.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        let mut ids = Vec::new();
        self.collect_elements_dfs(self.root, &mut ids);

        Ok(ids
            .into_iter()
            .filter(|candidate| groups.iter().any(|step| self.matches_step(*candidate, step)))
            .collect())
    }

    pub(crate) fn query_selector_from(
        &self,
        root: NodeId,
        selector: &str,
    ) -> Result<Option<NodeId>> {
        let all = self.query_selector_all_from(root, selector)?;
        Ok(all.into_iter().next())
    }

    pub(crate) fn query_selector_all_from(
        &self,
        root: NodeId,
        selector: &str,
    ) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        let mut ids = Vec::new();
        for child in &self.nodes[root.0].children {
            self.collect_elements_dfs(*child, &mut ids);
        }

        Ok(ids
            .into_iter()
            .filter(|candidate| groups.iter().any(|step| self.matches_step(*candidate, step)))
            .collect())
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[node_id.0].node_type, NodeType::Element(_)) {
            out.push(node_id);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        self.element_nodes_under(self.root)
    }

    pub(crate) fn element_nodes_under(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(scope, &mut out);
        out
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &step.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        for class in &step.classes {
            if !has_class(element, class) {
                return false;
            }
        }
        for (name, expected) in &step.attr_tests {
            match (element.attr(name), expected) {
                (None, _) => return false,
                (Some(_), None) => {}
                (Some(actual), Some(expected)) => {
                    if actual != expected {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub(crate) fn has_class(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .map(|element| has_class(element, class_name))
            .unwrap_or(false)
    }

    pub(crate) fn add_class(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("class target is not an element".into()))?;
        let mut tokens = class_tokens(element.attr("class"));
        if !tokens.iter().any(|token| token == class_name) {
            tokens.push(class_name.to_string());
        }
        set_class_attr(element, &tokens);
        Ok(())
    }

    pub(crate) fn remove_class(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Harness("class target is not an element".into()))?;
        let mut tokens = class_tokens(element.attr("class"));
        tokens.retain(|token| token != class_name);
        set_class_attr(element, &tokens);
        Ok(())
    }

    pub(crate) fn collect_form_controls(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node.0].children {
            if is_form_control(self, *child) {
                out.push(*child);
            }
            self.collect_form_controls(*child, out);
        }
    }

    pub(crate) fn form_data_entries(&self, form: NodeId) -> Result<Vec<(String, String)>> {
        let mut controls = Vec::new();
        self.collect_form_controls(form, &mut controls);

        let mut out = Vec::new();
        for control in controls {
            if !self.is_successful_form_data_control(control)? {
                continue;
            }
            let name = self.attr(control, "name").unwrap_or_default();
            let value = self.form_data_control_value(control)?;
            out.push((name, value));
        }
        Ok(out)
    }

    fn is_successful_form_data_control(&self, control: NodeId) -> Result<bool> {
        if self.disabled(control) {
            return Ok(false);
        }
        let name = self.attr(control, "name").unwrap_or_default();
        if name.is_empty() {
            return Ok(false);
        }

        let tag = self
            .tag_name(control)
            .ok_or_else(|| Error::Harness("form data target is not an element".into()))?;

        if tag.eq_ignore_ascii_case("button") {
            return Ok(false);
        }

        if tag.eq_ignore_ascii_case("input") {
            let kind = self
                .attr(control, "type")
                .unwrap_or_default()
                .to_ascii_lowercase();
            if matches!(
                kind.as_str(),
                "button" | "submit" | "reset" | "file" | "image"
            ) {
                return Ok(false);
            }
            if kind == "checkbox" || kind == "radio" {
                return self.checked(control);
            }
        }

        Ok(true)
    }

    fn form_data_control_value(&self, control: NodeId) -> Result<String> {
        let mut value = self.value(control)?;
        if value.is_empty()
            && (is_checkbox_input(self, control) || is_radio_input(self, control))
        {
            value = "on".into();
        }
        Ok(value)
    }

    pub(crate) fn reset_form_controls(&mut self, form: NodeId) -> Result<()> {
        let mut controls = Vec::new();
        self.collect_form_controls(form, &mut controls);

        for control in controls {
            let tag = self
                .tag_name(control)
                .unwrap_or_default()
                .to_ascii_lowercase();
            match tag.as_str() {
                "input" => {
                    let default_value = self.attr(control, "value").unwrap_or_default();
                    let default_checked = self.attr(control, "checked").is_some();
                    if let Some(element) = self.element_mut(control) {
                        element.value = default_value;
                        element.checked = default_checked;
                    }
                }
                "textarea" => {
                    let text = self.text_content(control);
                    if let Some(element) = self.element_mut(control) {
                        element.value = text;
                    }
                }
                "select" => self.sync_select_value(control)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) -> Result<()> {
        for node in self.all_element_nodes() {
            let tag = self
                .tag_name(node)
                .unwrap_or_default()
                .to_ascii_lowercase();
            if tag == "textarea" {
                let text = self.text_content(node);
                if let Some(element) = self.element_mut(node) {
                    element.value = text;
                }
            } else if tag == "select" {
                self.sync_select_value(node)?;
            }
        }
        Ok(())
    }

    fn sync_select_value(&mut self, select_node: NodeId) -> Result<()> {
        let value = self.select_value_from_options(select_node)?;
        let element = self
            .element_mut(select_node)
            .ok_or_else(|| Error::Harness("select target is not an element".into()))?;
        element.value = value;
        Ok(())
    }

    fn select_value_from_options(&self, select_node: NodeId) -> Result<String> {
        let mut options = Vec::new();
        self.collect_select_options(select_node, &mut options);
        if options.is_empty() {
            return Ok(String::new());
        }

        let selected = options
            .iter()
            .copied()
            .find(|option| self.attr(*option, "selected").is_some())
            .unwrap_or(options[0]);
        self.option_effective_value(selected)
    }

    fn collect_select_options(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node.0].children {
            if self
                .tag_name(*child)
                .map(|tag| tag.eq_ignore_ascii_case("option"))
                .unwrap_or(false)
            {
                out.push(*child);
            }
            self.collect_select_options(*child, out);
        }
    }

    pub(crate) fn option_effective_value(&self, option_node: NodeId) -> Result<String> {
        let element = self
            .element(option_node)
            .ok_or_else(|| Error::Harness("option target is not an element".into()))?;
        if !element.tag_name.eq_ignore_ascii_case("option") {
            return Err(Error::Harness("option target is not an option".into()));
        }
        if let Some(value) = element.attr("value") {
            return Ok(value.to_string());
        }
        Ok(self.text_content(option_node))
    }

    pub(crate) fn select_option_values(&self, select_node: NodeId) -> Result<Vec<(NodeId, String)>> {
        let mut options = Vec::new();
        self.collect_select_options(select_node, &mut options);
        let mut out = Vec::with_capacity(options.len());
        for option in options {
            out.push((option, self.option_effective_value(option)?));
        }
        Ok(out)
    }
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

pub(crate) fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.remove_attr_entry("class");
    } else {
        element.set_attr_entry("class", &classes.join(" "));
    }
}

pub(crate) fn is_form_control(dom: &Dom, node: NodeId) -> bool {
    dom.tag_name(node)
        .map(|tag| {
            tag.eq_ignore_ascii_case("input")
                || tag.eq_ignore_ascii_case("select")
                || tag.eq_ignore_ascii_case("textarea")
                || tag.eq_ignore_ascii_case("button")
        })
        .unwrap_or(false)
}

pub(crate) fn is_checkbox_input(dom: &Dom, node: NodeId) -> bool {
    input_type_is(dom, node, "checkbox")
}

pub(crate) fn is_radio_input(dom: &Dom, node: NodeId) -> bool {
    input_type_is(dom, node, "radio")
}

fn input_type_is(dom: &Dom, node: NodeId, expected: &str) -> bool {
    dom.tag_name(node)
        .map(|tag| tag.eq_ignore_ascii_case("input"))
        .unwrap_or(false)
        && dom
            .attr(node, "type")
            .map(|kind| kind.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
}

#[derive(Debug, Clone, Default)]
struct SelectorStep {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attr_tests: Vec<(String, Option<String>)>,
}

// Comma-separated groups of compound simple selectors. Combinators
// (descendant whitespace, >, +, ~) are not supported.
fn parse_selector_groups(selector: &str) -> Result<Vec<SelectorStep>> {
    let mut groups = Vec::new();
    for part in split_selector_groups(selector) {
        groups.push(parse_compound_selector(selector, part.trim())?);
    }
    if groups.is_empty() {
        return Err(Error::UnsupportedSelector(selector.to_string()));
    }
    Ok(groups)
}

fn split_selector_groups(selector: &str) -> Vec<&str> {
    let bytes = selector.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut in_brackets = false;
    let mut quote: Option<u8> = None;

    for (i, b) in bytes.iter().enumerate() {
        match quote {
            Some(q) => {
                if *b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' if in_brackets => quote = Some(*b),
                b'[' => in_brackets = true,
                b']' => in_brackets = false,
                b',' if !in_brackets => {
                    parts.push(&selector[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn parse_compound_selector(full: &str, raw: &str) -> Result<SelectorStep> {
    if raw.is_empty() {
        return Err(Error::UnsupportedSelector(full.to_string()));
    }

    let bytes = raw.as_bytes();
    let mut step = SelectorStep::default();
    let mut i = 0usize;

    if bytes[i] == b'*' {
        i += 1;
    } else if is_selector_ident_char(bytes[i]) {
        let start = i;
        while i < bytes.len() && is_selector_ident_char(bytes[i]) {
            i += 1;
        }
        step.tag = Some(raw[start..i].to_ascii_lowercase());
    }

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                i += 1;
                let start = i;
                while i < bytes.len() && is_selector_ident_char(bytes[i]) {
                    i += 1;
                }
                if start == i {
                    return Err(Error::UnsupportedSelector(full.to_string()));
                }
                step.id = Some(raw[start..i].to_string());
            }
            b'.' => {
                i += 1;
                let start = i;
                while i < bytes.len() && is_selector_ident_char(bytes[i]) {
                    i += 1;
                }
                if start == i {
                    return Err(Error::UnsupportedSelector(full.to_string()));
                }
                step.classes.push(raw[start..i].to_string());
            }
            b'[' => {
                i += 1;
                let name_start = i;
                while i < bytes.len() && is_selector_ident_char(bytes[i]) {
                    i += 1;
                }
                if name_start == i {
                    return Err(Error::UnsupportedSelector(full.to_string()));
                }
                let name = raw[name_start..i].to_ascii_lowercase();

                if i < bytes.len() && bytes[i] == b']' {
                    i += 1;
                    step.attr_tests.push((name, None));
                    continue;
                }
                if i >= bytes.len() || bytes[i] != b'=' {
                    return Err(Error::UnsupportedSelector(full.to_string()));
                }
                i += 1;

                let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                    let quote = bytes[i];
                    i += 1;
                    let start = i;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    if i >= bytes.len() {
                        return Err(Error::UnsupportedSelector(full.to_string()));
                    }
                    let value = raw[start..i].to_string();
                    i += 1;
                    value
                } else {
                    let start = i;
                    while i < bytes.len() && bytes[i] != b']' {
                        i += 1;
                    }
                    raw[start..i].to_string()
                };

                if i >= bytes.len() || bytes[i] != b']' {
                    return Err(Error::UnsupportedSelector(full.to_string()));
                }
                i += 1;
                step.attr_tests.push((name, Some(value)));
            }
            _ => return Err(Error::UnsupportedSelector(full.to_string())),
        }
    }

    Ok(step)
}

fn is_selector_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
