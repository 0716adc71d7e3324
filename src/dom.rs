//! dom.rs — a small owned element tree standing in for the host page.
//!
//! Widgets never build markup strings. They build [`Element`] values and hand
//! them to a [`Container`]; text and attribute values are escaped only when the
//! tree is serialized with `to_html`.
//!
//! [`Container`] and [`InputControl`] are cheap shared handles (clone = same
//! element), so a widget and its host can both hold one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tags serialized without a closing tag.
const VOID_TAGS: &[&str] = &["input", "br", "hr", "img"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Own text only (not descendants).
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Own text followed by every descendant's text, depth first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(t) = &self.text {
            out.push_str(t);
        }
        for c in &self.children {
            c.collect_text(out);
        }
    }

    /// First descendant (or self) with the given tag.
    pub fn find_tag(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_tag(tag))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = &self.id {
            push_attr(out, "id", id);
        }
        if !self.classes.is_empty() {
            push_attr(out, "class", &self.classes.join(" "));
        }
        for (k, v) in &self.attrs {
            push_attr(out, k, v);
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }

        if let Some(t) = &self.text {
            out.push_str(&html_escape::encode_text(t));
        }
        for c in &self.children {
            c.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ContainerState {
    children: Vec<Element>,
    /// Index of the child scrolled into view, if any.
    scrolled_to: Option<usize>,
}

/// Shared handle to a block element whose children are owned by a widget.
#[derive(Debug, Clone)]
pub struct Container {
    id: Arc<str>,
    inner: Arc<Mutex<ContainerState>>,
}

impl Container {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            inner: Arc::new(Mutex::new(ContainerState::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drop all children and install `children` in one step.
    pub fn replace_children(&self, children: Vec<Element>) {
        let mut st = lock(&self.inner);
        st.children = children;
        st.scrolled_to = None;
    }

    pub fn append(&self, child: Element) {
        lock(&self.inner).children.push(child);
    }

    pub fn children(&self) -> Vec<Element> {
        lock(&self.inner).children.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scroll_to_bottom(&self) {
        let mut st = lock(&self.inner);
        st.scrolled_to = st.children.len().checked_sub(1);
    }

    pub fn scrolled_to(&self) -> Option<usize> {
        lock(&self.inner).scrolled_to
    }

    /// Same underlying element.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn to_html(&self) -> String {
        let st = lock(&self.inner);
        let mut el = Element::new("div").with_id(&*self.id);
        el.children = st.children.clone();
        el.to_html()
    }
}

#[derive(Debug, Default)]
struct InputState {
    value: String,
    disabled: bool,
    focused: bool,
}

/// What a form submission found in its input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The control is disabled (a request is still pending).
    Disabled,
    /// Empty after trimming; the control is left untouched.
    Blank,
    /// Trimmed text; the control has been cleared and disabled.
    Text(String),
}

/// Shared handle to a single-line text input.
#[derive(Debug, Clone)]
pub struct InputControl {
    id: Arc<str>,
    inner: Arc<Mutex<InputState>>,
}

impl InputControl {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            inner: Arc::new(Mutex::new(InputState::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> String {
        lock(&self.inner).value.clone()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        lock(&self.inner).value = value.into();
    }

    pub fn is_disabled(&self) -> bool {
        lock(&self.inner).disabled
    }

    pub fn set_disabled(&self, disabled: bool) {
        let mut st = lock(&self.inner);
        st.disabled = disabled;
        if disabled {
            st.focused = false;
        }
    }

    pub fn focus(&self) {
        let mut st = lock(&self.inner);
        if !st.disabled {
            st.focused = true;
        }
    }

    pub fn is_focused(&self) -> bool {
        lock(&self.inner).focused
    }

    /// Read, trim, clear and disable in one step so two submissions can never
    /// both see the same enabled control.
    pub fn take_submission(&self) -> Submission {
        let mut st = lock(&self.inner);
        if st.disabled {
            return Submission::Disabled;
        }
        let text = st.value.trim().to_string();
        if text.is_empty() {
            return Submission::Blank;
        }
        st.value.clear();
        st.disabled = true;
        st.focused = false;
        Submission::Text(text)
    }

    fn to_element(&self) -> Element {
        let st = lock(&self.inner);
        let mut el = Element::new("input")
            .with_id(&*self.id)
            .with_attr("type", "text")
            .with_attr("value", st.value.clone());
        if st.disabled {
            el = el.with_attr("disabled", "disabled");
        }
        el
    }
}

#[derive(Debug, Clone)]
enum Node {
    Container(Container),
    Input(InputControl),
    Form(Arc<str>),
}

impl Node {
    fn id(&self) -> &str {
        match self {
            Node::Container(c) => c.id(),
            Node::Input(i) => i.id(),
            Node::Form(id) => &**id,
        }
    }
}

/// The host page: an ordered body of top-level nodes addressable by id.
#[derive(Debug, Clone, Default)]
pub struct Document {
    body: Arc<Mutex<Vec<Node>>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_container(&self, container: Container) {
        lock(&self.body).push(Node::Container(container));
    }

    pub fn append_input(&self, input: InputControl) {
        lock(&self.body).push(Node::Input(input));
    }

    pub fn append_form(&self, id: impl AsRef<str>) {
        lock(&self.body).push(Node::Form(Arc::from(id.as_ref())));
    }

    pub fn container_by_id(&self, id: &str) -> Option<Container> {
        lock(&self.body).iter().find_map(|n| match n {
            Node::Container(c) if c.id() == id => Some(c.clone()),
            _ => None,
        })
    }

    pub fn input_by_id(&self, id: &str) -> Option<InputControl> {
        lock(&self.body).iter().find_map(|n| match n {
            Node::Input(i) if i.id() == id => Some(i.clone()),
            _ => None,
        })
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.count_by_id(id) > 0
    }

    pub fn count_by_id(&self, id: &str) -> usize {
        lock(&self.body).iter().filter(|n| n.id() == id).count()
    }

    /// Look up a container, creating and attaching it when no element uses
    /// `id`. Returns the container and whether it was created, or `None` when
    /// `id` already belongs to an element that is not a container.
    pub fn get_or_create_container(&self, id: &str) -> Option<(Container, bool)> {
        let mut body = lock(&self.body);
        match body.iter().find(|n| n.id() == id) {
            Some(Node::Container(c)) => Some((c.clone(), false)),
            Some(_) => None,
            None => {
                let c = Container::new(id);
                body.push(Node::Container(c.clone()));
                Some((c, true))
            }
        }
    }

    pub fn to_html(&self) -> String {
        let body = lock(&self.body).clone();
        let mut out = String::from("<body>");
        for n in &body {
            match n {
                Node::Container(c) => out.push_str(&c.to_html()),
                Node::Input(i) => out.push_str(&i.to_element().to_html()),
                Node::Form(id) => out.push_str(&Element::new("form").with_id(&**id).to_html()),
            }
        }
        out.push_str("</body>");
        out
    }
}
