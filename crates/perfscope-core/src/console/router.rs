//! Top-level view selection

/// Top-level screens of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Capture,
    Queries,
    Results,
}

impl View {
    /// All views in tab order
    pub const ALL: [View; 3] = [View::Capture, View::Queries, View::Results];

    pub fn next(self) -> Self {
        match self {
            Self::Capture => Self::Queries,
            Self::Queries => Self::Results,
            Self::Results => Self::Capture,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Capture => Self::Results,
            Self::Queries => Self::Capture,
            Self::Results => Self::Queries,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Capture => 0,
            Self::Queries => 1,
            Self::Results => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Capture => "Capture",
            Self::Queries => "Queries",
            Self::Results => "Results",
        }
    }
}

/// Which view is active. Switching never touches any other state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewRouter {
    active: View,
}

impl ViewRouter {
    pub fn active(&self) -> View {
        self.active
    }

    /// Make `view` active, returning the previously active one
    pub fn switch(&mut self, view: View) -> View {
        std::mem::replace(&mut self.active, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_round_trip() {
        for view in View::ALL {
            assert_eq!(view.next().prev(), view);
            assert_eq!(View::from_index(view.index()), Some(view));
        }
    }

    #[test]
    fn test_switch_returns_previous() {
        let mut router = ViewRouter::default();
        assert_eq!(router.switch(View::Results), View::Capture);
        assert_eq!(router.active(), View::Results);
    }
}
