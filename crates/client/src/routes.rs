//! Storefront route table.
//!
//! Maps a location to a named route and its access requirements. Patterns
//! are `/`-separated segments where a `:name` segment captures one path
//! segment.

use crate::navigation::{HOME_PATH, LOGIN_PATH};

/// Access requirements declared by a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// The page renders without the storefront navigation bar.
    pub hide_navbar: bool,
}

impl RouteMeta {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_admin: false,
        hide_navbar: false,
    };

    pub const AUTHENTICATED: Self = Self {
        requires_auth: true,
        requires_admin: false,
        hide_navbar: false,
    };

    pub const ADMIN: Self = Self {
        requires_auth: true,
        requires_admin: true,
        hide_navbar: true,
    };

    /// Whether a session is needed. Admin routes always need one.
    #[must_use]
    pub const fn needs_session(&self) -> bool {
        self.requires_auth || self.requires_admin
    }

    const fn without_navbar(self) -> Self {
        Self {
            hide_navbar: true,
            ..self
        }
    }
}

/// A named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub pattern: &'static str,
    pub meta: RouteMeta,
    /// Locations matching this route are sent here instead.
    pub redirect_to: Option<&'static str>,
}

impl Route {
    const fn page(name: &'static str, pattern: &'static str, meta: RouteMeta) -> Self {
        Self {
            name,
            pattern,
            meta,
            redirect_to: None,
        }
    }

    /// Match `path` against this route's pattern, capturing `:param` segments.
    fn captures(&self, path: &str) -> Option<Vec<(&'static str, String)>> {
        let mut pattern = segments(self.pattern);
        let mut actual = segments(path);
        let mut params = Vec::new();

        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(segment)) => {
                    if let Some(name) = expected.strip_prefix(':') {
                        let value = urlencoding::decode(segment).ok()?;
                        params.push((name, value.into_owned()));
                    } else if expected != segment {
                        return None;
                    }
                }
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// A location resolved to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Normalised path without the query string.
    pub path: String,
    /// Full location, query string included.
    pub location: String,
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch<'_> {
    /// Value of a `:name` segment.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Outcome of resolving a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Matched(RouteMatch<'a>),
    /// The location is an alias or unknown; go here instead.
    Redirect(String),
}

/// Ordered list of routes; the first match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub const fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Routes of the cable storefront and its back office.
    #[must_use]
    pub fn storefront() -> Self {
        let public = RouteMeta::PUBLIC;
        let auth = RouteMeta::AUTHENTICATED;
        let admin = RouteMeta::ADMIN;

        Self::new(vec![
            Route::page("home", HOME_PATH, public),
            Route::page("login", LOGIN_PATH, public),
            Route::page("register", "/register", public),
            Route::page("products", "/products", public),
            Route::page("news", "/news", public),
            Route::page("news-detail", "/news/:id", public),
            Route::page("specs", "/specs", public),
            Route::page("my-inquiries", "/my-inquiries", auth),
            Route::page("my-orders", "/orders/my", auth),
            Route::page("checkout", "/checkout", auth),
            Route::page("inquiries", "/inquiries", auth),
            Route::page("driver", "/driver", auth.without_navbar()),
            Route {
                name: "admin",
                pattern: "/admin",
                meta: admin,
                redirect_to: Some("/admin/dashboard"),
            },
            Route::page("admin-dashboard", "/admin/dashboard", admin),
            Route::page("admin-products", "/admin/products", admin),
            Route::page("admin-categories", "/admin/categories", admin),
            Route::page("admin-users", "/admin/users", admin),
            Route::page("admin-news", "/admin/news", admin),
            Route::page("admin-orders", "/admin/orders", admin),
            Route::page("admin-customers", "/admin/customers", admin),
            Route::page("admin-employees", "/admin/employees", admin),
            Route::page("admin-specs", "/admin/specs", admin),
            Route::page("admin-inquiries", "/admin/inquiries", admin),
            Route::page("admin-costs", "/admin/costs", admin),
        ])
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Look up a route by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Resolve `location` (path plus optional query).
    ///
    /// Trailing slashes are ignored. Unknown paths redirect home.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Resolution<'_> {
        let (raw_path, query) = match location.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (location, None),
        };
        let path = normalize(raw_path);

        for route in &self.routes {
            let Some(params) = route.captures(&path) else {
                continue;
            };
            if let Some(target) = route.redirect_to {
                return Resolution::Redirect(target.to_string());
            }
            let location = match query {
                Some(query) if !query.is_empty() => format!("{path}?{query}"),
                _ => path.clone(),
            };
            return Resolution::Matched(RouteMatch {
                route,
                path,
                location,
                params,
            });
        }
        Resolution::Redirect(HOME_PATH.to_string())
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::storefront()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
