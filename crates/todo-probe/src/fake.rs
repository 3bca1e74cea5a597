//! In-memory stand-in for the application under test.
//!
//! [`FakeTodoApp`] renders the screens the page objects drive (list view,
//! add-task screen, task menu, dialogs, sidebar) as a small element tree
//! built from the Locator Registry's own selector strings, and resolves the
//! real [`Step`] chains against it. Clicking an element performs the
//! matching UI transition.
//!
//! It exists to exercise the automation layer without a browser. It is a test
//! double of the rendered surface, nothing more: a handful of
//! [`FakeOptions`] knobs reproduce the markup variations and failure modes
//! the page objects must tolerate.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::driver::{Key, PageDriver, Screenshot};
use crate::expect::normalize_text;
use crate::locator::{Locator, Step};
use crate::registry::{add_task as add, delete_dialog as dlg, list};
use crate::result::{ProbeError, ProbeResult};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const SWATCH_COUNT: usize = 6;

/// Which markup the delete-confirmation dialog renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogMarkup {
    /// MUI root wrapping a `role="dialog"` paper
    #[default]
    Standard,
    /// MUI root without an ARIA role
    MuiOnly,
    /// Unclassed divs, only the title text identifies it
    TitleOnly,
    /// Nothing is rendered
    Missing,
}

/// Behaviour knobs
#[derive(Debug, Clone, Default)]
pub struct FakeOptions {
    /// Delete dialog markup
    pub dialog_markup: DialogMarkup,
    /// Confirm/cancel never close the delete dialog
    pub dialog_never_closes: bool,
    /// Confirming a delete leaves the task in place
    pub stuck_delete: bool,
    /// Never render the "You have N tasks" heading
    pub hide_count_header: bool,
    /// Task menu buttons do nothing
    pub menu_never_opens: bool,
    /// Navigation fails as if the server were down
    pub offline: bool,
    /// Overlays report running animations for this long after opening
    pub animation_ms: u64,
    /// Confirmed deletions take effect after this delay
    pub removal_delay_ms: u64,
    /// Typing into the search box filters the list after this delay
    pub search_debounce_ms: u64,
    /// Every confirmed delete is answered by a new task arriving
    pub replace_deleted: bool,
}

/// A task as the fake application stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTask {
    id: u64,
    /// Title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Deadline, as typed into the datetime-local input
    pub deadline: Option<String>,
    /// Colour swatch index
    pub color: Option<usize>,
    /// Completed flag
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Blank,
    List,
    Add,
    NotFound,
}

#[derive(Debug, Clone, Default)]
struct Form {
    name: String,
    description: String,
    deadline: String,
    color: Option<usize>,
    accordion_open: bool,
    name_invalid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddTask,
    TaskMenu(u64),
    MarkDone(u64, bool),
    Edit,
    RequestDelete(u64),
    ConfirmDelete(u64),
    CancelDelete,
    OpenPurge,
    ConfirmPurge,
    CancelPurge,
    OpenSidebar,
    Back,
    ToggleAccordion,
    Swatch(usize),
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Search,
    Name,
    Description,
    Deadline,
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

#[derive(Debug)]
struct State {
    origin: String,
    route: Route,
    tasks: Vec<FakeTask>,
    storage: Vec<FakeTask>,
    next_id: u64,
    menu: Option<u64>,
    delete_dialog: Option<(u64, String)>,
    purge_dialog: bool,
    sidebar: bool,
    search: String,
    filter: String,
    pending_filter: Option<(String, Instant)>,
    form: Form,
    opened_at: Option<Instant>,
    pending_removals: Vec<(u64, Instant)>,
    history: Vec<String>,
    closed: bool,
}

impl State {
    fn new() -> Self {
        Self {
            origin: String::new(),
            route: Route::Blank,
            tasks: Vec::new(),
            storage: Vec::new(),
            next_id: 1,
            menu: None,
            delete_dialog: None,
            purge_dialog: false,
            sidebar: false,
            search: String::new(),
            filter: String::new(),
            pending_filter: None,
            form: Form::default(),
            opened_at: None,
            pending_removals: Vec::new(),
            history: Vec::new(),
            closed: false,
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        if self.pending_filter.as_ref().is_some_and(|(_, at)| *at <= now) {
            if let Some((filter, _)) = self.pending_filter.take() {
                self.filter = filter;
            }
        }
        let due: Vec<u64> = self
            .pending_removals
            .iter()
            .filter(|(_, at)| *at <= now)
            .map(|(id, _)| *id)
            .collect();
        if due.is_empty() {
            return;
        }
        self.pending_removals.retain(|(id, _)| !due.contains(id));
        self.tasks.retain(|t| !due.contains(&t.id));
        self.persist();
    }

    fn persist(&mut self) {
        self.storage = self.tasks.clone();
    }

    fn close_overlays(&mut self) {
        self.menu = None;
        self.delete_dialog = None;
        self.purge_dialog = false;
        self.sidebar = false;
    }

    /// Full document load: React state is rebuilt from storage
    fn load(&mut self, route: Route) {
        self.route = route;
        self.tasks = self.storage.clone();
        self.close_overlays();
        self.clear_search();
        self.form = Form::default();
    }

    /// Client-side route change
    fn navigate(&mut self, route: Route) {
        self.route = route;
        self.close_overlays();
        self.clear_search();
        if route == Route::Add {
            self.form = Form::default();
        }
    }

    fn clear_search(&mut self) {
        self.search.clear();
        self.filter.clear();
        self.pending_filter = None;
    }

    fn open_overlay(&mut self) {
        self.opened_at = Some(Instant::now());
    }

    fn task(&self, id: u64) -> Option<&FakeTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn add(&mut self, task: FakeTask) {
        self.tasks.push(task);
        self.persist();
    }

    fn new_task(&mut self, title: &str, description: Option<&str>) -> FakeTask {
        let id = self.next_id;
        self.next_id += 1;
        FakeTask {
            id,
            title: title.to_string(),
            description: description.map(ToString::to_string),
            deadline: None,
            color: None,
            done: false,
        }
    }

    fn url(&self) -> String {
        match self.route {
            Route::Blank => "about:blank".to_string(),
            Route::List => format!("{}/", self.origin),
            Route::Add => format!("{}/add", self.origin),
            Route::NotFound => format!("{}/404", self.origin),
        }
    }

    fn perform(&mut self, action: Action, options: &FakeOptions) {
        match action {
            Action::AddTask => self.navigate(Route::Add),
            Action::TaskMenu(id) => {
                if !options.menu_never_opens && self.task(id).is_some() {
                    self.menu = Some(id);
                    self.open_overlay();
                }
            }
            Action::MarkDone(id, done) => {
                self.menu = None;
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.done = done;
                }
                self.persist();
            }
            Action::Edit => self.menu = None,
            Action::RequestDelete(id) => {
                self.menu = None;
                if let Some(title) = self.task(id).map(|t| t.title.clone()) {
                    self.delete_dialog = Some((id, title));
                    self.open_overlay();
                }
            }
            Action::ConfirmDelete(id) => {
                if !options.dialog_never_closes {
                    self.delete_dialog = None;
                }
                if options.stuck_delete {
                    return;
                }
                if options.removal_delay_ms == 0 {
                    self.tasks.retain(|t| t.id != id);
                    if options.replace_deleted {
                        let title = format!("Arrival {}", self.next_id);
                        let task = self.new_task(&title, None);
                        self.tasks.push(task);
                    }
                    self.persist();
                } else {
                    let at = Instant::now() + Duration::from_millis(options.removal_delay_ms);
                    self.pending_removals.push((id, at));
                }
            }
            Action::CancelDelete => {
                if !options.dialog_never_closes {
                    self.delete_dialog = None;
                }
            }
            Action::OpenSidebar => {
                self.sidebar = true;
                self.open_overlay();
            }
            Action::OpenPurge => {
                self.purge_dialog = true;
                self.open_overlay();
            }
            Action::ConfirmPurge => {
                self.purge_dialog = false;
                self.tasks.clear();
                self.persist();
            }
            Action::CancelPurge => self.purge_dialog = false,
            Action::Back => self.navigate(Route::List),
            Action::ToggleAccordion => self.form.accordion_open = !self.form.accordion_open,
            Action::Swatch(index) => self.form.color = Some(index),
            Action::Create => {
                if self.form.name.trim().is_empty() {
                    self.form.name_invalid = true;
                    return;
                }
                let form = std::mem::take(&mut self.form);
                let description = Some(form.description.as_str()).filter(|d| !d.is_empty());
                let mut task = self.new_task(&form.name, description);
                task.deadline = Some(form.deadline).filter(|d| !d.is_empty());
                task.color = form.color;
                self.add(task);
                self.navigate(Route::List);
            }
        }
    }

    fn set_field(&mut self, field: Field, value: &str, options: &FakeOptions) {
        match field {
            Field::Search => {
                self.search = value.to_string();
                if options.search_debounce_ms == 0 {
                    self.filter = value.to_string();
                    self.pending_filter = None;
                } else {
                    let at = Instant::now() + Duration::from_millis(options.search_debounce_ms);
                    self.pending_filter = Some((value.to_string(), at));
                }
            }
            Field::Name => {
                self.form.name = value.to_string();
                if !value.trim().is_empty() {
                    self.form.name_invalid = false;
                }
            }
            Field::Description => self.form.description = value.to_string(),
            Field::Deadline => self.form.deadline = value.to_string(),
        }
    }

    fn escape(&mut self, options: &FakeOptions) {
        if self.menu.is_some() {
            self.menu = None;
        } else if self.delete_dialog.is_some() {
            if !options.dialog_never_closes {
                self.delete_dialog = None;
            }
        } else if self.purge_dialog {
            self.purge_dialog = false;
        } else {
            self.sidebar = false;
        }
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    fn render(&self, options: &FakeOptions) -> Dom {
        let animating = self.opened_at.is_some_and(|at| {
            Instant::now() < at + Duration::from_millis(options.animation_ms)
        });
        let root = match self.route {
            Route::Blank | Route::NotFound => Node::new("div"),
            Route::List => self.render_list(options, animating),
            Route::Add => self.render_add(),
        };
        Dom::build(Node::new("#document").child(root))
    }

    fn render_list(&self, options: &FakeOptions, animating: bool) -> Node {
        let needle = self.filter.to_lowercase();
        let shown: Vec<&FakeTask> = self
            .tasks
            .iter()
            .filter(|t| {
                needle.is_empty()
                    || t.title.to_lowercase().contains(&needle)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect();

        let mut root = Node::new("div").attr("id", "root").child(
            Node::new("button")
                .key(list::SIDEBAR_BUTTON)
                .attr("aria-label", "Sidebar")
                .action(Action::OpenSidebar),
        );

        if !self.tasks.is_empty() && !options.hide_count_header {
            let pending = self.tasks.iter().filter(|t| !t.done).count();
            let noun = if pending == 1 { "task" } else { "tasks" };
            root = root.child(Node::new("h4").text(format!("You have {pending} {noun} to complete")));
        }

        root = root.child(
            Node::new("input")
                .key(list::SEARCH_INPUT)
                .attr("placeholder", "Search for task...")
                .attr("value", &self.search)
                .field(Field::Search),
        );

        if self.tasks.is_empty() {
            root = root.child(
                Node::new("div")
                    .child(Node::new("p").text("You don't have any tasks yet"))
                    .child(Node::new("p").text(list::EMPTY_STATE_TEXTS[1])),
            );
        } else if shown.is_empty() {
            root = root.child(Node::new("p").text(list::EMPTY_STATE_TEXTS[2]));
        }

        for task in shown {
            root = root.child(render_card(task));
        }

        root = root.child(
            Node::new("button")
                .key(list::ADD_TASK_BUTTON)
                .attr("aria-label", "Add Task")
                .action(Action::AddTask),
        );

        if let Some(task) = self.menu.and_then(|id| self.task(id)) {
            let toggle = if task.done {
                (list::MENU_PENDING, Action::MarkDone(task.id, false))
            } else {
                (list::MENU_COMPLETE, Action::MarkDone(task.id, true))
            };
            root = root.child(
                Node::new("ul")
                    .key(list::TASK_MENU)
                    .role("menu")
                    .animated(animating)
                    .child(menu_item(toggle.0, toggle.1))
                    .child(menu_item(list::MENU_EDIT, Action::Edit))
                    .child(menu_item(list::MENU_DELETE, Action::RequestDelete(task.id))),
            );
        }

        if let Some((id, title)) = &self.delete_dialog {
            if let Some(dialog) = render_delete_dialog(*id, title, options.dialog_markup, animating)
            {
                root = root.child(dialog);
            }
        }

        if self.sidebar {
            root = root.child(
                Node::new("div").key(list::SIDEBAR_DRAWER).animated(animating).child(
                    Node::new("ul")
                        .child(Node::new("li").text("Tasks"))
                        .child(
                            Node::new("li")
                                .text(list::PURGE_TEXT)
                                .action(Action::OpenPurge),
                        )
                        .child(Node::new("li").text("Settings")),
                ),
            );
        }

        if self.purge_dialog {
            root = root.child(
                Node::new("div").key(dlg::MUI_DIALOG).child(
                    Node::new("div")
                        .key(list::DIALOG)
                        .role("dialog")
                        .animated(animating)
                        .child(Node::new("h2").text(list::PURGE_DIALOG_TEXT))
                        .child(Node::new("p").text("This will permanently remove every task."))
                        .child(
                            Node::new("button")
                                .key(list::DIALOG_BUTTON)
                                .text("Cancel")
                                .action(Action::CancelPurge),
                        )
                        .child(
                            Node::new("button")
                                .key(list::DIALOG_BUTTON)
                                .text(list::PURGE_CONFIRM_TEXT)
                                .action(Action::ConfirmPurge),
                        ),
                ),
            );
        }

        root
    }

    fn render_add(&self) -> Node {
        let form = &self.form;
        let mut accordion = Node::new("div").attr("class", "MuiAccordion-root").child(
            Node::new("div")
                .key(add::COLOR_ACCORDION)
                .text("Color")
                .action(Action::ToggleAccordion),
        );
        if form.accordion_open {
            accordion = accordion.child(Node::new("div").key(add::COLOR_GRID).children(
                (0..SWATCH_COUNT).map(|i| {
                    Node::new("button")
                        .key(add::COLOR_SWATCH)
                        .attr("id", format!("color-element-{i}"))
                        .attr("aria-pressed", (form.color == Some(i)).to_string())
                        .action(Action::Swatch(i))
                }),
            ));
        }

        Node::new("div")
            .attr("id", "root")
            .child(
                Node::new("button")
                    .key(add::BACK_BUTTON)
                    .attr("aria-label", "Back")
                    .action(Action::Back),
            )
            .child(Node::new("h2").text(add::HEADING_TEXT))
            .child(
                Node::new("input")
                    .key(add::NAME_INPUT)
                    .attr("name", "name")
                    .attr("placeholder", "Enter task name")
                    .attr("value", &form.name)
                    .attr("aria-invalid", form.name_invalid.to_string())
                    .field(Field::Name),
            )
            .child(
                Node::new("textarea")
                    .key(add::DESCRIPTION_INPUT)
                    .attr("name", "name")
                    .attr("placeholder", "Enter task description")
                    .attr("value", &form.description)
                    .field(Field::Description),
            )
            .child(
                Node::new("input")
                    .key(add::DEADLINE_INPUT)
                    .attr("type", "datetime-local")
                    .attr("value", &form.deadline)
                    .field(Field::Deadline),
            )
            .child(accordion)
            .child(
                Node::new("button")
                    .text(add::CREATE_TEXT)
                    .action(Action::Create),
            )
    }
}

fn render_card(task: &FakeTask) -> Node {
    let mut card = Node::new("div")
        .key(list::TASK_CONTAINER)
        .attr("data-testid", "task-container")
        .child(Node::new("h3").text(&task.title));
    if let Some(description) = &task.description {
        card = card.child(Node::new("p").key(list::TASK_DESCRIPTION).text(description));
    }
    if let Some(deadline) = &task.deadline {
        card = card.child(Node::new("span").text(format!("Deadline: {deadline}")));
    }
    if task.done {
        card = card.child(
            Node::new("svg")
                .key(list::COMPLETED_ICON)
                .attr("data-testid", "CheckCircleIcon"),
        );
    }
    card.child(
        Node::new("button")
            .key(list::TASK_MENU_BUTTON)
            .attr("aria-label", "Task Menu")
            .action(Action::TaskMenu(task.id)),
    )
}

fn menu_item(text: &str, action: Action) -> Node {
    Node::new("li")
        .key(list::TASK_MENU_ITEM)
        .role("menuitem")
        .text(text)
        .action(action)
}

fn render_delete_dialog(
    id: u64,
    title: &str,
    markup: DialogMarkup,
    animating: bool,
) -> Option<Node> {
    let body = Node::new("p").text(format!("Are you sure you want to delete \"{title}\"?"));
    let cancel = Node::new("button")
        .text(dlg::CANCEL_NAME)
        .action(Action::CancelDelete);
    let confirm = Node::new("button")
        .text(dlg::CONFIRM_NAME)
        .action(Action::ConfirmDelete(id));

    match markup {
        DialogMarkup::Standard => Some(
            Node::new("div").key(dlg::MUI_DIALOG).child(
                Node::new("div")
                    .key(dlg::ROLE_DIALOG)
                    .role("dialog")
                    .animated(animating)
                    .child(Node::new("h2").text(dlg::TITLE_TEXT))
                    .child(body)
                    .child(cancel.key(list::DIALOG_BUTTON))
                    .child(confirm.key(list::DIALOG_BUTTON)),
            ),
        ),
        DialogMarkup::MuiOnly => Some(
            Node::new("div").key(dlg::MUI_DIALOG).animated(animating).child(
                Node::new("div")
                    .child(Node::new("h2").text(dlg::TITLE_TEXT))
                    .child(body)
                    .child(cancel)
                    .child(confirm),
            ),
        ),
        DialogMarkup::TitleOnly => Some(
            Node::new("div")
                .animated(animating)
                .child(Node::new("div").text(dlg::TITLE_TEXT))
                .child(body)
                .child(cancel)
                .child(confirm),
        ),
        DialogMarkup::Missing => None,
    }
}

// =============================================================================
// ELEMENT TREE
// =============================================================================

#[derive(Debug, Default)]
struct Node {
    tag: &'static str,
    keys: Vec<&'static str>,
    text: String,
    role: Option<&'static str>,
    attrs: Vec<(&'static str, String)>,
    animated: bool,
    action: Option<Action>,
    field: Option<Field>,
    children: Vec<Node>,
}

impl Node {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            role: (tag == "button").then_some("button"),
            ..Self::default()
        }
    }

    fn key(mut self, key: &'static str) -> Self {
        self.keys.push(key);
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn role(mut self, role: &'static str) -> Self {
        self.role = Some(role);
        self
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    fn field(mut self, field: Field) -> Self {
        self.field = Some(field);
        self
    }

    fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Flattened element in document order
#[derive(Debug)]
struct Element {
    tag: &'static str,
    keys: Vec<&'static str>,
    role: Option<&'static str>,
    attrs: Vec<(&'static str, String)>,
    animated: bool,
    action: Option<Action>,
    field: Option<Field>,
    text_content: String,
    parent: Option<usize>,
    /// One past the last descendant
    end: usize,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    fn matches_css(&self, selector: &str) -> bool {
        self.tag == selector || self.keys.iter().any(|key| *key == selector)
    }

    fn accessible_name(&self) -> String {
        self.attr("aria-label")
            .map_or_else(|| normalize_text(&self.text_content), normalize_text)
    }
}

#[derive(Debug)]
struct Dom {
    elements: Vec<Element>,
}

impl Dom {
    fn build(root: Node) -> Self {
        let mut elements = Vec::new();
        flatten(root, None, &mut elements);
        Self { elements }
    }

    fn descendants(&self, roots: &[usize], keep: impl Fn(usize) -> bool) -> Vec<usize> {
        let mut out: Vec<usize> = roots
            .iter()
            .flat_map(|&r| (r + 1)..self.elements[r].end)
            .filter(|&i| keep(i))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        ((index + 1)..self.elements[index].end).filter(move |&j| self.elements[j].parent == Some(index))
    }

    fn resolve(&self, steps: &[Step]) -> Vec<usize> {
        self.apply(vec![0], steps)
    }

    fn apply(&self, roots: Vec<usize>, steps: &[Step]) -> Vec<usize> {
        steps.iter().fold(roots, |current, step| match step {
            Step::Css { value } => {
                self.descendants(&current, |i| self.elements[i].matches_css(value))
            }
            Step::Text { value } => self.descendants(&current, |i| {
                normalize_text(&self.elements[i].text_content) == *value
                    && !self
                        .children(i)
                        .any(|c| normalize_text(&self.elements[c].text_content) == *value)
            }),
            Step::Role { role, name } => self.descendants(&current, |i| {
                let el = &self.elements[i];
                el.role == Some(role.as_str()) && el.accessible_name() == *name
            }),
            Step::HasText { value } => {
                let needle = normalize_text(value).to_lowercase();
                current
                    .into_iter()
                    .filter(|&i| {
                        normalize_text(&self.elements[i].text_content)
                            .to_lowercase()
                            .contains(&needle)
                    })
                    .collect()
            }
            Step::Nth { index } => current.get(*index).copied().into_iter().collect(),
            Step::Visible => current.into_iter().filter(|&i| self.visible(i)).collect(),
            Step::Any { branches } => {
                let mut out: Vec<usize> = branches
                    .iter()
                    .flat_map(|branch| self.apply(current.clone(), branch))
                    .collect();
                out.sort_unstable();
                out.dedup();
                out
            }
        })
    }

    /// Every element of the fake is rendered on screen
    fn visible(&self, index: usize) -> bool {
        index != 0
    }

    fn target(&self, matches: &[usize]) -> Option<usize> {
        matches
            .iter()
            .copied()
            .find(|&i| self.visible(i))
            .or_else(|| matches.first().copied())
    }

    fn settled(&self, index: usize) -> bool {
        self.visible(index) && !(index..self.elements[index].end).any(|i| self.elements[i].animated)
    }

    fn action_for(&self, index: usize) -> Option<Action> {
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if let Some(action) = self.elements[i].action {
                return Some(action);
            }
            cursor = self.elements[i].parent;
        }
        None
    }
}

fn flatten(node: Node, parent: Option<usize>, out: &mut Vec<Element>) -> String {
    let Node {
        tag,
        keys,
        text,
        role,
        attrs,
        animated,
        action,
        field,
        children,
    } = node;
    let index = out.len();
    out.push(Element {
        tag,
        keys,
        role,
        attrs,
        animated,
        action,
        field,
        text_content: String::new(),
        parent,
        end: index + 1,
    });

    let mut content = text;
    for child in children {
        let child_text = flatten(child, Some(index), out);
        if !child_text.is_empty() {
            if !content.is_empty() {
                content.push(' ');
            }
            content.push_str(&child_text);
        }
    }
    out[index].end = out.len();
    out[index].text_content.clone_from(&content);
    content
}

// =============================================================================
// DRIVER
// =============================================================================

/// In-memory application driven through [`PageDriver`]
#[derive(Debug)]
pub struct FakeTodoApp {
    state: Mutex<State>,
    options: FakeOptions,
}

impl Default for FakeTodoApp {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTodoApp {
    /// Fake with default behaviour
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(FakeOptions::default())
    }

    /// Fake with the given knobs
    #[must_use]
    pub fn with_options(options: FakeOptions) -> Self {
        Self {
            state: Mutex::new(State::new()),
            options,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick();
        state
    }

    /// Store a task as if it had been created in an earlier session
    pub fn seed_task(&self, title: &str, description: Option<&str>) {
        let mut state = self.lock();
        let task = state.new_task(title, description);
        state.add(task);
    }

    /// Tasks currently rendered by the application
    #[must_use]
    pub fn tasks(&self) -> Vec<FakeTask> {
        self.lock().tasks.clone()
    }

    /// Tasks in `localStorage`
    #[must_use]
    pub fn stored_tasks(&self) -> Vec<FakeTask> {
        self.lock().storage.clone()
    }

    /// Driver calls received so far, as `method:argument`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Whether a driver method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// Whether [`PageDriver::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn record(&self, call: String) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        state.history.push(call);
        state
    }

    fn inspect<T>(&self, locator: &Locator, f: impl FnOnce(&Dom, &[usize]) -> T) -> T {
        let state = self.lock();
        let dom = state.render(&self.options);
        let matches = dom.resolve(locator.steps());
        f(&dom, &matches)
    }

    fn activate(&self, method: &str, locator: &Locator) -> ProbeResult<()> {
        let mut state = self.record(format!("{method}:{locator}"));
        let dom = state.render(&self.options);
        let matches = dom.resolve(locator.steps());
        let index = dom.target(&matches).ok_or_else(|| ProbeError::Input {
            message: format!("no element matches {locator}"),
        })?;
        if let Some(action) = dom.action_for(index) {
            state.perform(action, &self.options);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakeTodoApp {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("goto:{url}"));
        if self.options.offline {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        if url.starts_with("about:") {
            state.load(Route::Blank);
            return Ok(());
        }
        let Some(scheme_end) = url.find("://") else {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_INVALID_URL".to_string(),
            });
        };
        let (origin, path) = match url[scheme_end + 3..].find('/') {
            Some(slash) => url.split_at(scheme_end + 3 + slash),
            None => (url, "/"),
        };
        let path = path.split(['?', '#']).next().unwrap_or("/");
        let route = match path.trim_end_matches('/') {
            "" => Route::List,
            "/add" => Route::Add,
            _ => Route::NotFound,
        };
        state.origin = origin.to_string();
        state.load(route);
        Ok(())
    }

    async fn reload(&self) -> ProbeResult<()> {
        let mut state = self.record("reload".to_string());
        let route = state.route;
        state.load(route);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.lock().url())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<Value> {
        let mut state = self.record("evaluate".to_string());
        if script.contains("localStorage.clear") {
            state.storage.clear();
            return Ok(Value::Null);
        }
        Err(ProbeError::script(
            "FakeTodoApp only evaluates localStorage resets",
        ))
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.activate("click", locator)
    }

    async fn press_key(&self, key: Key) -> ProbeResult<()> {
        let mut state = self.record(format!("press:{key}"));
        match key {
            Key::Escape => state.escape(&self.options),
        }
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Screenshot> {
        let _state = self.record("screenshot".to_string());
        Ok(Screenshot::new(PNG_MAGIC.to_vec()))
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut state = self.record("close".to_string());
        state.closed = true;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        Ok(self.inspect(locator, |_, matches| matches.len()))
    }

    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self.inspect(locator, |dom, matches| {
            matches.iter().any(|&i| dom.visible(i))
        }))
    }

    async fn is_settled(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self.inspect(locator, |dom, matches| {
            dom.target(matches).is_some_and(|i| dom.settled(i))
        }))
    }

    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        Ok(self.inspect(locator, |dom, matches| {
            dom.target(matches)
                .map(|i| dom.elements[i].text_content.clone())
        }))
    }

    async fn all_text_contents(&self, locator: &Locator) -> ProbeResult<Vec<String>> {
        Ok(self.inspect(locator, |dom, matches| {
            matches
                .iter()
                .map(|&i| dom.elements[i].text_content.clone())
                .collect()
        }))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> ProbeResult<Option<String>> {
        Ok(self.inspect(locator, |dom, matches| {
            dom.target(matches)
                .and_then(|i| dom.elements[i].attr(name).map(ToString::to_string))
        }))
    }

    async fn dispatch_click(&self, locator: &Locator) -> ProbeResult<()> {
        self.activate("dispatch_click", locator)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("fill:{locator}={value}"));
        let dom = state.render(&self.options);
        let matches = dom.resolve(locator.steps());
        let index = dom.target(&matches).ok_or_else(|| ProbeError::Input {
            message: format!("no element matches {locator}"),
        })?;
        let field = dom.elements[index].field.ok_or_else(|| ProbeError::Input {
            message: format!("{locator} is not an editable field"),
        })?;
        state.set_field(field, value, &self.options);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::registry::{AddTaskLocators, DeleteDialogLocators, ListLocators};

    const BASE: &str = "http://localhost:5173";

    async fn list_page(app: &FakeTodoApp) {
        app.goto(&format!("{BASE}/")).await.unwrap();
    }

    mod resolution_tests {
        use super::*;

        #[tokio::test]
        async fn test_css_keys_and_tags() {
            let app = FakeTodoApp::new();
            app.seed_task("Buy milk", None);
            app.seed_task("Walk dog", Some("around the park"));
            list_page(&app).await;
            let list = ListLocators::new();
            assert_eq!(app.count(&list.task_containers).await.unwrap(), 2);
            assert_eq!(app.count(&Locator::css("h3")).await.unwrap(), 2);
            assert!(app.is_visible(&list.add_task_button).await.unwrap());
        }

        #[tokio::test]
        async fn test_has_text_is_case_insensitive_substring() {
            let app = FakeTodoApp::new();
            app.seed_task("Task A", None);
            app.seed_task("Task AB", None);
            list_page(&app).await;
            let list = ListLocators::new();
            assert_eq!(app.count(&list.task_container("task a")).await.unwrap(), 2);
            assert_eq!(app.count(&list.task_container("Task AB")).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_text_matches_innermost_exact() {
            let app = FakeTodoApp::new();
            list_page(&app).await;
            let list = ListLocators::new();
            assert_eq!(app.count(&list.empty_state).await.unwrap(), 1);
            assert_eq!(
                app.count(&Locator::text("Add your")).await.unwrap(),
                0,
                "text steps must not match substrings"
            );
        }

        #[tokio::test]
        async fn test_scoped_locator_and_nth() {
            let app = FakeTodoApp::new();
            app.seed_task("First", None);
            app.seed_task("Second", None);
            list_page(&app).await;
            let list = ListLocators::new();
            let second_title = list.task_containers.clone().nth(1).locator(&list.task_title);
            assert_eq!(
                app.text_content(&second_title).await.unwrap().as_deref(),
                Some("Second")
            );
            let missing = list.task_containers.clone().nth(5);
            assert_eq!(app.text_content(&missing).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_any_is_union_in_document_order() {
            let app = FakeTodoApp::new();
            app.seed_task("Alpha", None);
            app.seed_task("Beta", None);
            list_page(&app).await;
            let list = ListLocators::new();
            let either = list
                .task_container("Beta")
                .or(list.task_container("Alpha"))
                .or(list.task_container("Alpha"));
            let texts = app.all_text_contents(&either.locator(&list.task_title)).await.unwrap();
            assert_eq!(texts, vec!["Alpha".to_string(), "Beta".to_string()]);
        }

        #[tokio::test]
        async fn test_role_uses_accessible_name() {
            let app = FakeTodoApp::new();
            list_page(&app).await;
            assert!(app
                .is_visible(&Locator::role("button", "Add Task"))
                .await
                .unwrap());
            assert!(!app
                .is_visible(&Locator::role("button", "Add"))
                .await
                .unwrap());
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_add_task_through_form() {
            let app = FakeTodoApp::new();
            list_page(&app).await;
            let list = ListLocators::new();
            let add = AddTaskLocators::new();
            app.dispatch_click(&list.add_task_button).await.unwrap();
            assert_eq!(app.current_url().await.unwrap(), format!("{BASE}/add"));
            app.fill(&add.name_input, "Buy milk").await.unwrap();
            app.fill(&add.description_input, "2 litres").await.unwrap();
            app.click(&add.create_button).await.unwrap();
            assert_eq!(app.current_url().await.unwrap(), format!("{BASE}/"));
            let tasks = app.tasks();
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].description.as_deref(), Some("2 litres"));
        }

        #[tokio::test]
        async fn test_empty_name_marks_input_invalid() {
            let app = FakeTodoApp::new();
            app.goto(&format!("{BASE}/add")).await.unwrap();
            let add = AddTaskLocators::new();
            assert_eq!(
                app.attribute(&add.name_input, "aria-invalid").await.unwrap().as_deref(),
                Some("false")
            );
            app.click(&add.create_button).await.unwrap();
            assert_eq!(
                app.attribute(&add.name_input, "aria-invalid").await.unwrap().as_deref(),
                Some("true")
            );
            assert!(app.tasks().is_empty());
        }

        #[tokio::test]
        async fn test_menu_complete_then_escape() {
            let app = FakeTodoApp::new();
            app.seed_task("Buy milk", None);
            list_page(&app).await;
            let list = ListLocators::new();
            let card = list.task_container("Buy milk");
            app.click(&card.locator(&list.task_menu_button)).await.unwrap();
            assert!(app.is_visible(&list.menu_complete).await.unwrap());
            app.click(&list.menu_complete).await.unwrap();
            assert!(!app.is_visible(&list.task_menu).await.unwrap());
            assert!(app.is_visible(&card.locator(&list.completed_icon)).await.unwrap());

            app.click(&card.locator(&list.task_menu_button)).await.unwrap();
            assert!(!app.is_visible(&list.menu_complete).await.unwrap());
            assert!(app.is_visible(&list.menu_pending).await.unwrap());
            app.press_key(Key::Escape).await.unwrap();
            assert!(!app.is_visible(&list.task_menu).await.unwrap());
        }

        #[tokio::test]
        async fn test_delete_dialog_confirm() {
            let app = FakeTodoApp::new();
            app.seed_task("Buy milk", None);
            list_page(&app).await;
            let list = ListLocators::new();
            let dialog = DeleteDialogLocators::new();
            let card = list.task_container("Buy milk");
            app.click(&card.locator(&list.task_menu_button)).await.unwrap();
            app.click(&list.menu_delete).await.unwrap();
            assert!(app.is_visible(&dialog.alternatives[0]).await.unwrap());
            app.click(&dialog.confirm_button).await.unwrap();
            assert!(!app.is_visible(&dialog.alternatives[0]).await.unwrap());
            assert!(!app.is_visible(&card).await.unwrap());
        }

        #[tokio::test]
        async fn test_click_without_match_is_input_error() {
            let app = FakeTodoApp::new();
            list_page(&app).await;
            let err = app.click(&Locator::css("button.nope")).await.unwrap_err();
            assert!(matches!(err, ProbeError::Input { .. }));
        }

        #[tokio::test]
        async fn test_fill_requires_field() {
            let app = FakeTodoApp::new();
            list_page(&app).await;
            let list = ListLocators::new();
            assert!(app.fill(&list.add_task_button, "x").await.is_err());
        }
    }

    mod storage_tests {
        use super::*;

        #[tokio::test]
        async fn test_clear_takes_effect_on_reload() {
            let app = FakeTodoApp::new();
            app.seed_task("Buy milk", None);
            list_page(&app).await;
            app.evaluate("window.localStorage.clear()").await.unwrap();
            assert_eq!(app.tasks().len(), 1, "live state survives until reload");
            app.reload().await.unwrap();
            assert!(app.tasks().is_empty());
        }

        #[tokio::test]
        async fn test_other_scripts_are_rejected() {
            let app = FakeTodoApp::new();
            assert!(app.evaluate("document.title").await.is_err());
        }

        #[tokio::test]
        async fn test_offline_navigation_fails() {
            let app = FakeTodoApp::with_options(FakeOptions {
                offline: true,
                ..FakeOptions::default()
            });
            let err = app.goto(BASE).await.unwrap_err();
            assert!(matches!(err, ProbeError::Navigation { .. }));
        }

        #[tokio::test]
        async fn test_url_without_trailing_slash_is_list() {
            let app = FakeTodoApp::new();
            app.goto(BASE).await.unwrap();
            assert_eq!(app.current_url().await.unwrap(), format!("{BASE}/"));
        }
    }

    mod timing_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_overlay_settles_after_animation() {
            let app = FakeTodoApp::with_options(FakeOptions {
                animation_ms: 200,
                ..FakeOptions::default()
            });
            app.seed_task("Buy milk", None);
            list_page(&app).await;
            let list = ListLocators::new();
            app.click(&list.task_container("Buy milk").locator(&list.task_menu_button))
                .await
                .unwrap();
            assert!(!app.is_settled(&list.task_menu).await.unwrap());
            tokio::time::sleep(Duration::from_millis(250)).await;
            assert!(app.is_settled(&list.task_menu).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_delayed_removal() {
            let app = FakeTodoApp::with_options(FakeOptions {
                removal_delay_ms: 300,
                ..FakeOptions::default()
            });
            app.seed_task("Buy milk", None);
            list_page(&app).await;
            let list = ListLocators::new();
            let dialog = DeleteDialogLocators::new();
            app.click(&list.task_container("Buy milk").locator(&list.task_menu_button))
                .await
                .unwrap();
            app.click(&list.menu_delete).await.unwrap();
            app.click(&dialog.confirm_button).await.unwrap();
            assert_eq!(app.tasks().len(), 1);
            tokio::time::sleep(Duration::from_millis(301)).await;
            assert!(app.tasks().is_empty());
            assert!(app.stored_tasks().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_search_filter_is_debounced() {
            let app = FakeTodoApp::with_options(FakeOptions {
                search_debounce_ms: 300,
                ..FakeOptions::default()
            });
            app.seed_task("Alpha report", None);
            app.seed_task("Beta review", None);
            list_page(&app).await;
            let list = ListLocators::new();
            app.fill(&list.search_input, "alpha").await.unwrap();
            assert_eq!(
                app.attribute(&list.search_input, "value").await.unwrap().as_deref(),
                Some("alpha")
            );
            assert_eq!(app.count(&list.task_containers).await.unwrap(), 2);
            tokio::time::sleep(Duration::from_millis(301)).await;
            assert_eq!(app.count(&list.task_containers).await.unwrap(), 1);
        }
    }
}
