//! Locator Registry
//!
//! Every selector the automation layer depends on, grouped per screen. Page
//! objects build their locators from here and nowhere else, so a markup change
//! in the application is a one-line fix.

use crate::locator::Locator;

// =============================================================================
// SELECTOR CONSTANTS
// =============================================================================

/// List view selectors
pub mod list {
    /// Floating "add task" affordance
    pub const ADD_TASK_BUTTON: &str = r#"button.MuiButtonBase-root[aria-label="Add Task"]"#;
    /// One rendered task card
    pub const TASK_CONTAINER: &str = r#"div[data-testid="task-container"]"#;
    /// Search input
    pub const SEARCH_INPUT: &str = r#"input[placeholder="Search for task..."]"#;
    /// Heading element carrying the task count
    pub const TASK_COUNT_HEADING: &str = "h4";
    /// Text identifying the count heading
    pub const TASK_COUNT_TEXT: &str = "You have";
    /// Sidebar toggle
    pub const SIDEBAR_BUTTON: &str = r#"button[aria-label="Sidebar"]"#;
    /// Open sidebar drawer
    pub const SIDEBAR_DRAWER: &str = "div.MuiDrawer-paper";
    /// Sidebar entries (scoped to the drawer)
    pub const SIDEBAR_ITEM: &str = "li";
    /// Sidebar entry text for purging
    pub const PURGE_TEXT: &str = "Purge Tasks";
    /// Any modal dialog
    pub const DIALOG: &str = r#"div[role="dialog"]"#;
    /// Purge dialog title text
    pub const PURGE_DIALOG_TEXT: &str = "Delete All Tasks";
    /// Buttons inside a modal dialog
    pub const DIALOG_BUTTON: &str = r#"div[role="dialog"] button"#;
    /// Purge confirmation button text
    pub const PURGE_CONFIRM_TEXT: &str = "Delete All";

    /// Per-task menu trigger (scoped to a container)
    pub const TASK_MENU_BUTTON: &str = r#"button[aria-label="Task Menu"]"#;
    /// Task title (scoped to a container)
    pub const TASK_TITLE: &str = "h3";
    /// Task description (scoped to a container)
    pub const TASK_DESCRIPTION: &str = ".MuiTypography-root";
    /// Completed marker icon (scoped to a container)
    pub const COMPLETED_ICON: &str = r#"svg[data-testid="CheckCircleIcon"]"#;

    /// Open task menu
    pub const TASK_MENU: &str = r#"ul[role="menu"]"#;
    /// Task menu entries
    pub const TASK_MENU_ITEM: &str = r#"ul[role="menu"] li"#;
    /// Menu entry marking a task done
    pub const MENU_COMPLETE: &str = "Complete";
    /// Menu entry marking a task not done
    pub const MENU_PENDING: &str = "Pending";
    /// Menu entry for editing
    pub const MENU_EDIT: &str = "Edit";
    /// Menu entry for deleting
    pub const MENU_DELETE: &str = "Delete";

    /// Empty-state messages; whichever is rendered counts
    pub const EMPTY_STATE_TEXTS: [&str; 3] =
        ["No tasks completed yet", "Add your first task", "No tasks found"];

    /// Pattern extracting the number from the count heading
    pub const TASK_COUNT_PATTERN: &str = r"(\d+)\s+tasks?";
}

/// Add-task screen selectors
pub mod add_task {
    /// Back navigation
    pub const BACK_BUTTON: &str = r#"button[aria-label="Back"]"#;
    /// Screen heading element
    pub const HEADING: &str = "h2";
    /// Screen heading text
    pub const HEADING_TEXT: &str = "Add New Task";
    /// Task name input
    pub const NAME_INPUT: &str = r#"input[name="name"][placeholder="Enter task name"]"#;
    /// Description textarea (the application reuses `name="name"`)
    pub const DESCRIPTION_INPUT: &str =
        r#"textarea[name="name"][placeholder="Enter task description"]"#;
    /// Deadline input
    pub const DEADLINE_INPUT: &str = r#"input[type="datetime-local"]"#;
    /// Colour accordion header
    pub const COLOR_ACCORDION: &str = ".MuiAccordionSummary-root";
    /// Colour swatch grid, rendered only when the accordion is expanded
    pub const COLOR_GRID: &str = ".MuiGrid-container .MuiGrid-spacing-xs-1";
    /// Colour swatches
    pub const COLOR_SWATCH: &str = r#"button[id^="color-element-"]"#;
    /// Submit button element
    pub const CREATE_BUTTON: &str = "button";
    /// Submit button text
    pub const CREATE_TEXT: &str = "Create Task";
}

/// Delete-confirmation dialog selectors
pub mod delete_dialog {
    /// Role-based dialog container
    pub const ROLE_DIALOG: &str = r#"div[role="dialog"]"#;
    /// MUI dialog root
    pub const MUI_DIALOG: &str = ".MuiDialog-root";
    /// Generic element for the title-text fallback
    pub const TITLE_CONTAINER: &str = "div";
    /// Dialog title text
    pub const TITLE_TEXT: &str = "Delete Task";
    /// Confirm button accessible name
    pub const CONFIRM_NAME: &str = "Confirm Delete";
    /// Cancel button accessible name
    pub const CANCEL_NAME: &str = "Cancel";
}

// =============================================================================
// PER-SCREEN LOCATOR SETS
// =============================================================================

/// Locators for the task list view
#[derive(Debug, Clone)]
pub struct ListLocators {
    /// Add affordance
    pub add_task_button: Locator,
    /// Every task card
    pub task_containers: Locator,
    /// Search input
    pub search_input: Locator,
    /// "You have N tasks" heading
    pub task_count_header: Locator,
    /// Empty-state message (any of the known texts)
    pub empty_state: Locator,
    /// Sidebar toggle
    pub sidebar_button: Locator,
    /// Sidebar drawer
    pub sidebar_drawer: Locator,
    /// Purge entry in the sidebar
    pub purge_link: Locator,
    /// Purge confirmation dialog
    pub purge_dialog: Locator,
    /// Purge confirmation button
    pub purge_confirm_button: Locator,
    /// Open task menu
    pub task_menu: Locator,
    /// "Complete" menu item
    pub menu_complete: Locator,
    /// "Pending" menu item
    pub menu_pending: Locator,
    /// "Edit" menu item
    pub menu_edit: Locator,
    /// "Delete" menu item
    pub menu_delete: Locator,
    /// Menu button, relative to a container
    pub task_menu_button: Locator,
    /// Title, relative to a container
    pub task_title: Locator,
    /// Description, relative to a container
    pub task_description: Locator,
    /// Completed icon, relative to a container
    pub completed_icon: Locator,
}

impl Default for ListLocators {
    fn default() -> Self {
        Self::new()
    }
}

impl ListLocators {
    /// Build the list view locator set
    #[must_use]
    pub fn new() -> Self {
        use list::*;
        Self {
            add_task_button: Locator::css(ADD_TASK_BUTTON),
            task_containers: Locator::css(TASK_CONTAINER),
            search_input: Locator::css(SEARCH_INPUT),
            task_count_header: Locator::css(TASK_COUNT_HEADING).with_text(TASK_COUNT_TEXT),
            empty_state: Locator::any_of(EMPTY_STATE_TEXTS.iter().map(|t| Locator::text(*t))),
            sidebar_button: Locator::css(SIDEBAR_BUTTON),
            sidebar_drawer: Locator::css(SIDEBAR_DRAWER),
            purge_link: Locator::css(SIDEBAR_DRAWER)
                .locator(&Locator::css(SIDEBAR_ITEM))
                .with_text(PURGE_TEXT),
            purge_dialog: Locator::css(DIALOG).with_text(PURGE_DIALOG_TEXT),
            purge_confirm_button: Locator::css(DIALOG_BUTTON).with_text(PURGE_CONFIRM_TEXT),
            task_menu: Locator::css(TASK_MENU),
            menu_complete: Locator::css(TASK_MENU_ITEM).with_text(MENU_COMPLETE),
            menu_pending: Locator::css(TASK_MENU_ITEM).with_text(MENU_PENDING),
            menu_edit: Locator::css(TASK_MENU_ITEM).with_text(MENU_EDIT),
            menu_delete: Locator::css(TASK_MENU_ITEM).with_text(MENU_DELETE),
            task_menu_button: Locator::css(TASK_MENU_BUTTON),
            task_title: Locator::css(TASK_TITLE),
            task_description: Locator::css(TASK_DESCRIPTION),
            completed_icon: Locator::css(COMPLETED_ICON),
        }
    }

    /// Containers whose text contains `title` (substring, case-insensitive)
    #[must_use]
    pub fn task_container(&self, title: &str) -> Locator {
        self.task_containers.clone().with_text(title)
    }
}

/// Locators for the add-task screen
#[derive(Debug, Clone)]
pub struct AddTaskLocators {
    /// Back navigation
    pub back_button: Locator,
    /// "Add New Task" heading
    pub heading: Locator,
    /// Name input
    pub name_input: Locator,
    /// Description textarea
    pub description_input: Locator,
    /// Deadline input
    pub deadline_input: Locator,
    /// Colour accordion header
    pub color_accordion: Locator,
    /// Colour grid (present when expanded)
    pub color_grid: Locator,
    /// Colour swatches
    pub color_swatches: Locator,
    /// Submit button
    pub create_button: Locator,
}

impl Default for AddTaskLocators {
    fn default() -> Self {
        Self::new()
    }
}

impl AddTaskLocators {
    /// Build the add-task locator set
    #[must_use]
    pub fn new() -> Self {
        use add_task::*;
        Self {
            back_button: Locator::css(BACK_BUTTON),
            heading: Locator::css(HEADING).with_text(HEADING_TEXT),
            name_input: Locator::css(NAME_INPUT),
            description_input: Locator::css(DESCRIPTION_INPUT),
            deadline_input: Locator::css(DEADLINE_INPUT),
            color_accordion: Locator::css(COLOR_ACCORDION),
            color_grid: Locator::css(COLOR_GRID),
            color_swatches: Locator::css(COLOR_SWATCH),
            create_button: Locator::css(CREATE_BUTTON).with_text(CREATE_TEXT),
        }
    }

    /// Swatch at `index`
    #[must_use]
    pub fn color_swatch(&self, index: usize) -> Locator {
        self.color_swatches.clone().nth(index)
    }
}

/// Locators for the delete-confirmation dialog
#[derive(Debug, Clone)]
pub struct DeleteDialogLocators {
    /// Redundant ways of finding the dialog, tried in order
    pub alternatives: Vec<Locator>,
    /// Confirm button
    pub confirm_button: Locator,
    /// Cancel button
    pub cancel_button: Locator,
}

impl Default for DeleteDialogLocators {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteDialogLocators {
    /// Build the dialog locator set
    #[must_use]
    pub fn new() -> Self {
        use delete_dialog::*;
        Self {
            alternatives: vec![
                Locator::css(ROLE_DIALOG),
                Locator::css(MUI_DIALOG),
                Locator::css(TITLE_CONTAINER).with_text(TITLE_TEXT).visible(),
            ],
            confirm_button: Locator::role("button", CONFIRM_NAME),
            cancel_button: Locator::role("button", CANCEL_NAME),
        }
    }
}
