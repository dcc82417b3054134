//! The five screens of the front end and which one is shown.

use std::fmt;
use std::str::FromStr;

use crate::error::CloudError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Register,
    Confirm,
    Login,
    Dashboard,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Home,
        View::Register,
        View::Confirm,
        View::Login,
        View::Dashboard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Register => "register",
            View::Confirm => "confirm",
            View::Login => "login",
            View::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for View {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| CloudError::Custom(format!("Unknown view: {}", s)))
    }
}

/// Which navigation bar is visible.
///
/// The private bar only on the dashboard, the public bar everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavChrome {
    pub private_nav: bool,
    pub public_nav: bool,
}

impl NavChrome {
    pub fn for_view(view: View) -> Self {
        let private_nav = view == View::Dashboard;
        Self {
            private_nav,
            public_nav: !private_nav,
        }
    }
}

/// Result of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub view: View,
    pub chrome: NavChrome,
    /// A dashboard data load is due
    pub refresh: bool,
}

/// Tracks the single active view.
#[derive(Debug, Clone)]
pub struct ViewController {
    active: View,
}

impl Default for ViewController {
    fn default() -> Self {
        Self { active: View::Home }
    }
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> View {
        self.active
    }

    pub fn is_visible(&self, view: View) -> bool {
        self.active == view
    }

    pub fn chrome(&self) -> NavChrome {
        NavChrome::for_view(self.active)
    }

    /// Switch to `target`. Entering the dashboard with a logged-in volume
    /// asks for a data load.
    pub fn navigate(&mut self, target: View, authenticated: bool) -> Navigation {
        self.active = target;
        Navigation {
            view: target,
            chrome: NavChrome::for_view(target),
            refresh: target == View::Dashboard && authenticated,
        }
    }
}

/// Values pre-filled into forms by earlier steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forms {
    /// Email shown on the confirmation screen
    pub confirm_email: Option<String>,
    /// Code echoed by the server in test mode
    pub confirm_code: Option<String>,
    /// Volume name pre-filled on the login screen
    pub login_name: Option<String>,
}
