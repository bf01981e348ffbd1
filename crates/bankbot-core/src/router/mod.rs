//! Client-side routes and the navigation guard.
//!
//! The route table is static configuration. The guard decides, before each
//! transition, whether to allow it or redirect based only on whether the
//! session holds a credential and whether the target route needs one.

pub mod guard;

pub use guard::{GuardDecision, NavigationGuard};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the portal (home) route
pub const PORTAL_ROUTE: &str = "Portal";

/// Name of the sign-in route
pub const SIGN_ROUTE: &str = "Sign";

/// Query parameter carrying the path to return to after sign-in
pub const REDIRECT_QUERY: &str = "redirect";

// Only used to borrow Url's path and query handling
const PLACEHOLDER_ORIGIN: &str = "http://localhost";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("route table has no route named {0}")]
    MissingRoute(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    #[serde(default)]
    pub login: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub meta: RouteMeta,
}

impl RouteDescriptor {
    pub fn new(name: &str, path: &str, login: bool) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            meta: RouteMeta { login },
        }
    }

    pub fn requires_session(&self) -> bool {
        self.meta.login
    }

    pub fn target(&self) -> NavTarget {
        NavTarget {
            name: self.name.clone(),
            path: self.path.clone(),
            query: Vec::new(),
            requires_session: self.meta.login,
        }
    }
}

/// A concrete navigation destination: a route plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTarget {
    pub name: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub requires_session: bool,
}

impl NavTarget {
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus encoded query, e.g. `/sign?redirect=%2F`.
    pub fn full_path(&self) -> String {
        let Ok(mut url) = Url::parse(PLACEHOLDER_ORIGIN) else {
            return self.path.clone();
        };
        url.set_path(&self.path);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        }
    }
}

/// The client's routes. Always contains a sign-in and a home route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    sign_in: RouteDescriptor,
    home: RouteDescriptor,
}

impl RouteTable {
    pub fn new(
        routes: Vec<RouteDescriptor>,
        sign_in_name: &str,
        home_name: &str,
    ) -> Result<Self, RouteError> {
        let find = |name: &str| {
            routes
                .iter()
                .find(|r| r.name == name)
                .cloned()
                .ok_or_else(|| RouteError::MissingRoute(name.to_string()))
        };
        let sign_in = find(sign_in_name)?;
        let home = find(home_name)?;
        Ok(Self {
            routes,
            sign_in,
            home,
        })
    }

    pub fn sign_in(&self) -> &RouteDescriptor {
        &self.sign_in
    }

    pub fn home(&self) -> &RouteDescriptor {
        &self.home
    }

    pub fn route(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn target(&self, name: &str) -> Option<NavTarget> {
        self.route(name).map(RouteDescriptor::target)
    }

    /// Turn a full path such as `/?schema=loan` back into a target.
    pub fn resolve(&self, full_path: &str) -> Option<NavTarget> {
        let url = Url::parse(PLACEHOLDER_ORIGIN).ok()?.join(full_path).ok()?;
        let route = self.routes.iter().find(|r| r.path == url.path())?;
        let mut target = route.target();
        target.query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Some(target)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let portal = RouteDescriptor::new(PORTAL_ROUTE, "/", true);
        let sign = RouteDescriptor::new(SIGN_ROUTE, "/sign", false);
        Self {
            routes: vec![portal.clone(), sign.clone()],
            sign_in: sign,
            home: portal,
        }
    }
}
