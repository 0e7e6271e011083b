//! UI-agnostic session state types
//!
//! These are shared between the session and whatever presents it, and don't
//! depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// The request classes the session keeps single-flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Query,
    Compile,
    LogFetch,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Query => "query",
            OpKind::Compile => "compile",
            OpKind::LogFetch => "log_fetch",
        }
    }

    pub fn all() -> [OpKind; 3] {
        [OpKind::Query, OpKind::Compile, OpKind::LogFetch]
    }
}

/// Observable phase of one request kind.
///
/// Succeeded, failed and superseded are transitions, not resting states: a
/// settled request drops straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
}

/// Views the presentation layer can show and copy from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Output,
    Summary,
    Artifacts,
    Typeset,
    Logs,
}

impl Tab {
    pub fn all() -> [Tab; 5] {
        [Tab::Output, Tab::Summary, Tab::Artifacts, Tab::Typeset, Tab::Logs]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Output => "Output",
            Tab::Summary => "Summary",
            Tab::Artifacts => "Artifacts",
            Tab::Typeset => "LaTeX",
            Tab::Logs => "Logs",
        }
    }

    pub fn index(&self) -> usize {
        Tab::all().iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Tab {
        let tabs = Tab::all();
        tabs[(self.index() + 1) % tabs.len()]
    }

    pub fn prev(&self) -> Tab {
        let tabs = Tab::all();
        tabs[(self.index() + tabs.len() - 1) % tabs.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle_wraps() {
        assert_eq!(Tab::Logs.next(), Tab::Output);
        assert_eq!(Tab::Output.prev(), Tab::Logs);
        assert_eq!(Tab::Summary.next().prev(), Tab::Summary);
    }
}
