#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AlertKind {
    #[default]
    None,
    // Search or expansion returned nothing
    NoMatchFound,
    // Expansion returned only the node that was expanded
    DeadEnd,
}

/// Advisory banner state. Only derivable from a completion's cardinality or
/// reset by a click; there is no way to set an arbitrary alert.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertState {
    show: bool,
    kind: AlertKind,
}

impl AlertState {
    pub fn cleared() -> Self {
        AlertState::default()
    }

    pub fn from_cardinality(cardinality: usize) -> Self {
        match cardinality {
            0 => AlertState { show: true, kind: AlertKind::NoMatchFound },
            1 => AlertState { show: true, kind: AlertKind::DeadEnd },
            _ => AlertState::cleared(),
        }
    }

    pub fn is_shown(&self) -> bool {
        self.show
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn message(&self) -> Option<&'static str> {
        if !self.show {
            return None;
        }
        match self.kind {
            AlertKind::NoMatchFound => Some("No such article was found."),
            AlertKind::DeadEnd => Some("No new connections were found."),
            AlertKind::None => None,
        }
    }
}
