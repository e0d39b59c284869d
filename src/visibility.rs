/// Who is reading. Anonymous readers only ever see records that hang off a
/// publicly visible community, and that restriction is applied to the
/// candidate set before any caller-supplied filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(i32),
}

impl Viewer {
    pub fn user_id(self) -> Option<i32> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(id),
        }
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Viewer::User(_))
    }

    /// Whether list queries must be narrowed to publicly visible parents.
    pub fn public_only(self) -> bool {
        !self.is_authenticated()
    }

    pub fn can_see(self, parent_is_public: bool) -> bool {
        parent_is_public || self.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: i32,
        parent: i32,
        parent_is_public: bool,
    }

    fn fixture() -> Vec<Row> {
        vec![
            Row { id: 1, parent: 10, parent_is_public: true },
            Row { id: 2, parent: 10, parent_is_public: true },
            Row { id: 3, parent: 20, parent_is_public: false },
            Row { id: 4, parent: 30, parent_is_public: true },
            Row { id: 5, parent: 20, parent_is_public: false },
        ]
    }

    fn list(viewer: Viewer, parent: Option<i32>) -> Vec<i32> {
        fixture()
            .into_iter()
            .filter(|r| viewer.can_see(r.parent_is_public))
            .filter(|r| parent.map_or(true, |p| r.parent == p))
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn anonymous_sees_only_public_parents() {
        assert!(Viewer::Anonymous.public_only());
        assert_eq!(list(Viewer::Anonymous, None), [1, 2, 4]);
    }

    #[test]
    fn caller_filter_cannot_reach_hidden_parents() {
        assert!(list(Viewer::Anonymous, Some(20)).is_empty());
        assert_eq!(list(Viewer::User(1), Some(20)), [3, 5]);
    }

    #[test]
    fn authenticated_sees_everything() {
        assert!(!Viewer::User(8).public_only());
        assert_eq!(list(Viewer::User(8), None), [1, 2, 3, 4, 5]);
        assert_eq!(Viewer::User(8).user_id(), Some(8));
        assert_eq!(Viewer::Anonymous.user_id(), None);
    }
}
