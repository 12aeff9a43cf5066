//! Declarative route metadata, collected into an explicit table at startup.
//!
//! Two independent sources feed each endpoint's requirement: a handler-level
//! declaration (`public` / `authenticated` / `require`) and a group-level
//! default keyed by path prefix. A handler declaration overrides its group's
//! default outright; the two are never merged. A route with neither source is
//! a configuration error and `build()` refuses the table, so a forgotten
//! declaration fails closed before the server ever accepts traffic.

use std::collections::HashMap;

use axum::http::Method;

use crate::error::{AppError, AppResult};

/// The public/permission metadata attached to one endpoint. `required` is an
/// ordered any-of list of permission names (declared without the self-scope
/// suffix); empty means an authenticated principal is sufficient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub public: bool,
    pub required: Vec<String>,
}

impl RouteRequirement {
    pub fn public_route() -> Self {
        Self { public: true, required: Vec::new() }
    }

    pub fn authenticated() -> Self {
        Self { public: false, required: Vec::new() }
    }

    pub fn permissions<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { public: false, required: required.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone)]
enum Declared {
    Public,
    Authenticated,
    Require(Vec<String>),
    /// No handler-level declaration; resolved against group defaults in `build()`.
    Inherited,
}

/// Immutable lookup table: (method, path template) -> requirement.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), RouteRequirement>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn requirement(&self, method: &Method, path_template: &str) -> Option<&RouteRequirement> {
        self.routes.get(&(method.clone(), path_template.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    /// Group defaults by path prefix, in declaration order.
    groups: Vec<(String, Vec<String>)>,
    routes: Vec<(Method, String, Declared)>,
}

impl RouteTableBuilder {
    /// Declare a group-level default: every `route()` under `prefix` without a
    /// handler-level declaration requires `required`.
    pub fn group<I, S>(mut self, prefix: &str, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.push((prefix.to_string(), required.into_iter().map(Into::into).collect()));
        self
    }

    /// Mark an endpoint public: allowed without any principal resolution.
    pub fn public(mut self, method: Method, path: &str) -> Self {
        self.routes.push((method, path.to_string(), Declared::Public));
        self
    }

    /// Declare that an authenticated principal is sufficient (explicit empty
    /// permission list; distinct from declaring nothing at all).
    pub fn authenticated(mut self, method: Method, path: &str) -> Self {
        self.routes.push((method, path.to_string(), Declared::Authenticated));
        self
    }

    /// Handler-level permission declaration. Overrides any group default.
    pub fn require<I, S>(mut self, method: Method, path: &str, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required = required.into_iter().map(Into::into).collect();
        self.routes.push((method, path.to_string(), Declared::Require(required)));
        self
    }

    /// Register an endpoint with no handler-level declaration; it inherits the
    /// longest matching group prefix default, or fails the build.
    pub fn route(mut self, method: Method, path: &str) -> Self {
        self.routes.push((method, path.to_string(), Declared::Inherited));
        self
    }

    pub fn build(self) -> AppResult<RouteTable> {
        let RouteTableBuilder { groups, routes: declarations } = self;
        let mut routes: HashMap<(Method, String), RouteRequirement> = HashMap::new();
        for (method, path, declared) in declarations {
            let requirement = match declared {
                Declared::Public => RouteRequirement::public_route(),
                Declared::Authenticated => RouteRequirement::authenticated(),
                Declared::Require(required) => RouteRequirement::permissions(required),
                Declared::Inherited => match longest_group_match(&groups, &path) {
                    Some(required) => RouteRequirement::permissions(required.clone()),
                    None => {
                        return Err(AppError::config(
                            "undeclared_route".to_string(),
                            format!("{} {} has no requirement declaration and no matching group", method, path),
                        ));
                    }
                },
            };
            if routes.insert((method.clone(), path.clone()), requirement).is_some() {
                return Err(AppError::config(
                    "duplicate_route".to_string(),
                    format!("{} {} is declared twice", method, path),
                ));
            }
        }
        Ok(RouteTable { routes })
    }
}

fn longest_group_match<'a>(groups: &'a [(String, Vec<String>)], path: &str) -> Option<&'a Vec<String>> {
    groups
        .iter()
        .filter(|(prefix, _)| path == prefix.as_str() || path.starts_with(&format!("{}/", prefix.trim_end_matches('/'))))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, required)| required)
}
