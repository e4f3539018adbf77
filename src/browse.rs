//! Browse contexts and navigation history
//!
//! A [`BrowseContext`] describes one listing: which filters the catalog
//! request carries and where focus was when the user left it. Drilling into
//! a category, series or season pushes the current context on the
//! [`HistoryStack`]; back pops it.

use crate::models::{CatalogParams, ContentType, ItemKind, MediaItem};

/// Filters and focus of one listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowseContext {
    pub search: Option<String>,
    pub category: Option<String>,
    pub movie_id: Option<String>,
    pub season_id: Option<String>,
    pub parent_title: Option<String>,
    pub content_type: ContentType,
    pub focused_index: Option<usize>,
    /// Series being browsed, carried down into its seasons and episodes
    pub series: Option<MediaItem>,
}

impl BrowseContext {
    /// Top-level listing of a content type
    pub fn root(content_type: ContentType) -> Self {
        Self {
            content_type,
            ..Self::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.search.is_none()
            && self.category.is_none()
            && self.movie_id.is_none()
            && self.season_id.is_none()
    }

    /// Catalog request for `page` of this listing
    pub fn params(&self, page: usize) -> CatalogParams {
        CatalogParams {
            content_type: self.content_type,
            page: page.max(1),
            search: self.search.clone(),
            category: self.category.clone(),
            movie_id: self.movie_id.clone(),
            season_id: self.season_id.clone(),
            episode_id: None,
        }
    }

    /// Context reached by selecting `item`, or `None` for playable leaves.
    /// Live TV is a single unfiltered channel list, so nothing drills there.
    pub fn drill(&self, item: &MediaItem) -> Option<BrowseContext> {
        if self.content_type.is_live() {
            return None;
        }
        let base = BrowseContext {
            content_type: self.content_type,
            parent_title: Some(item.title.clone()),
            ..BrowseContext::default()
        };
        match item.kind {
            ItemKind::Category => Some(BrowseContext {
                category: Some(item.id.clone()),
                ..base
            }),
            ItemKind::Series => Some(BrowseContext {
                movie_id: Some(item.id.clone()),
                category: self.category.clone(),
                series: Some(item.clone()),
                ..base
            }),
            ItemKind::Season => Some(BrowseContext {
                movie_id: item
                    .series_id
                    .clone()
                    .or_else(|| self.movie_id.clone()),
                season_id: Some(item.id.clone()),
                category: self.category.clone(),
                series: self.series.clone(),
                ..base
            }),
            _ => None,
        }
    }

    /// Search within the current content type
    pub fn with_search(&self, query: &str) -> BrowseContext {
        BrowseContext {
            search: Some(query.trim().to_string()).filter(|q| !q.is_empty()),
            parent_title: Some(format!("Search: {}", query.trim())),
            ..BrowseContext::root(self.content_type)
        }
    }

    /// Title for the listing header
    pub fn title(&self) -> String {
        self.parent_title
            .clone()
            .unwrap_or_else(|| self.content_type.to_string())
    }
}

/// Contexts left behind by drill-in navigation
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: Vec<BrowseContext>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a context, returning the depth before the push (the rollback
    /// mark for an optimistic push)
    pub fn push(&mut self, context: BrowseContext) -> usize {
        let mark = self.entries.len();
        self.entries.push(context);
        mark
    }

    pub fn pop(&mut self) -> Option<BrowseContext> {
        self.entries.pop()
    }

    pub fn peek_mut(&mut self) -> Option<&mut BrowseContext> {
        self.entries.last_mut()
    }

    /// Undo every push made after `mark`
    pub fn rollback(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Titles from the root down, for a breadcrumb
    pub fn breadcrumb(&self) -> Vec<String> {
        self.entries.iter().map(BrowseContext::title).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drill_category_then_series_then_season() {
        let root = BrowseContext::root(ContentType::Series);
        assert!(root.is_root());

        let category = MediaItem::new("drama", "Drama", ItemKind::Category);
        let in_category = root.drill(&category).unwrap();
        assert_eq!(in_category.category.as_deref(), Some("drama"));
        assert_eq!(in_category.title(), "Drama");

        let series = MediaItem::new("show", "The Show", ItemKind::Series);
        let in_series = in_category.drill(&series).unwrap();
        assert_eq!(in_series.movie_id.as_deref(), Some("show"));
        assert_eq!(in_series.series.as_ref().map(|s| s.id.as_str()), Some("show"));

        let season = MediaItem::new("s1", "Season 1", ItemKind::Season);
        let in_season = in_series.drill(&season).unwrap();
        assert_eq!(in_season.movie_id.as_deref(), Some("show"));
        assert_eq!(in_season.season_id.as_deref(), Some("s1"));
        assert!(in_season.series.is_some());

        let params = in_season.params(2);
        assert_eq!(params.page, 2);
        assert_eq!(params.content_type, ContentType::Series);
        assert_eq!(params.season_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_leaves_do_not_drill() {
        let root = BrowseContext::root(ContentType::Movie);
        assert!(root.drill(&MediaItem::new("m", "Heat", ItemKind::Movie)).is_none());
        assert!(root.drill(&MediaItem::channel("c", "News", 1)).is_none());
    }

    #[test]
    fn test_live_categories_do_not_drill() {
        let live = BrowseContext::root(ContentType::Tv);
        let group = MediaItem::new("news", "News", ItemKind::Category);
        assert_eq!(live.drill(&group), None);

        let movies = BrowseContext::root(ContentType::Movie);
        assert!(movies.drill(&group).is_some());
    }

    #[test]
    fn test_contexts_compare_with_series() {
        let series = MediaItem::new("show", "The Show", ItemKind::Series);
        let root = BrowseContext::root(ContentType::Series);
        assert_eq!(root.drill(&series), root.drill(&series.clone()));

        let mut renamed = series.clone();
        renamed.title = "Another Show".into();
        assert_ne!(root.drill(&series), root.drill(&renamed));
    }

    #[test]
    fn test_search_context() {
        let root = BrowseContext::root(ContentType::Movie);
        let search = root.with_search("  heat ");
        assert_eq!(search.search.as_deref(), Some("heat"));
        assert!(!search.is_root());
        assert_eq!(search.params(1).search.as_deref(), Some("heat"));
    }

    #[test]
    fn test_history_rollback() {
        let mut history = HistoryStack::new();
        history.push(BrowseContext::root(ContentType::Movie));
        let mark = history.push(BrowseContext::root(ContentType::Series));
        assert_eq!(mark, 1);
        assert_eq!(history.len(), 2);

        history.rollback(mark);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.pop().map(|c| c.content_type),
            Some(ContentType::Movie)
        );
        assert!(history.is_empty());
    }
}
