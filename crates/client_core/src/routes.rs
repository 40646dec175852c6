use std::fmt;

use shared::domain::MovieId;

/// Pages reachable by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Register,
    Login,
    Logout,
    Movies,
    MovieDetail(MovieId),
}

impl Route {
    /// Resolves a URL path. Query strings, fragments and trailing slashes are
    /// ignored; unknown paths resolve to `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Self::Home),
            ["register"] => Some(Self::Register),
            ["login"] => Some(Self::Login),
            ["logout"] => Some(Self::Logout),
            ["movies"] => Some(Self::Movies),
            ["movies", id] => Some(Self::MovieDetail(MovieId::from(*id))),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Register => "/register".to_string(),
            Self::Login => "/login".to_string(),
            Self::Logout => "/logout".to_string(),
            Self::Movies => "/movies".to_string(),
            Self::MovieDetail(id) => format!("/movies/{id}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Register => "Register",
            Self::Login => "Login",
            Self::Logout => "Logout",
            Self::Movies => "Movies",
            Self::MovieDetail(_) => "MovieDetail",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
