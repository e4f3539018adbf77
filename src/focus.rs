//! Focus registry
//!
//! Enumerates the interactive elements of the active screen as an ordered
//! list. The registry is rebuilt whenever the screen content changes (new
//! page, view switch, error state, player mount/unmount); nothing here is
//! persisted.

/// Kind of interactive element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Button,
    Link,
}

/// What activating an element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusAction {
    /// Open the catalog item at this index of the loaded list
    OpenItem(usize),
    /// Re-issue the failed first-page request
    ReloadView,
    /// Re-issue the failed append request
    RetryPage,
}

/// One interactive unit eligible for directional focus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusableElement {
    /// Stable key within the screen
    pub key: String,
    /// Position in traversal order
    pub order: usize,
    pub role: Role,
    pub activatable: bool,
    pub action: FocusAction,
}

impl FocusableElement {
    pub fn link(key: impl Into<String>, action: FocusAction) -> Self {
        Self {
            key: key.into(),
            order: 0,
            role: Role::Link,
            activatable: true,
            action,
        }
    }

    pub fn button(key: impl Into<String>, action: FocusAction) -> Self {
        Self {
            role: Role::Button,
            ..Self::link(key, action)
        }
    }
}

/// Layout metadata supplied by the presentation layer on every screen change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutDescriptor {
    columns: usize,
}

impl LayoutDescriptor {
    /// Single-column list (channel list, episode list)
    pub fn linear() -> Self {
        Self { columns: 1 }
    }

    /// Poster grid with `columns` items per row (at least 1)
    pub fn grid(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
        }
    }

    /// Derive a grid from available width and a fixed cell width
    pub fn fit(width: u16, cell_width: u16) -> Self {
        if cell_width == 0 {
            return Self::linear();
        }
        Self::grid((width / cell_width) as usize)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

impl Default for LayoutDescriptor {
    fn default() -> Self {
        Self::linear()
    }
}

/// Ordered list of the focusable elements on screen
#[derive(Debug, Clone, Default)]
pub struct FocusRegistry {
    elements: Vec<FocusableElement>,
}

impl FocusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry with `elements`, assigning traversal order by
    /// their position.
    pub fn enumerate(&mut self, elements: impl IntoIterator<Item = FocusableElement>) {
        self.elements = elements
            .into_iter()
            .enumerate()
            .map(|(order, mut el)| {
                el.order = order;
                el
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FocusableElement> {
        self.elements.get(index)
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.key == key)
    }

    /// Action of the element at `index`, if it can be activated
    pub fn activate(&self, index: usize) -> Option<&FocusAction> {
        self.elements
            .get(index)
            .filter(|e| e.activatable)
            .map(|e| &e.action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FocusableElement> {
        self.elements.iter()
    }
}
