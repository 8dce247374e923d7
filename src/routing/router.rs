//! The route binder.
//!
//! # Responsibilities
//! - Declare routes as argument lists, per method or for all methods
//! - Register router-level steps, param hooks, layers and collaborators
//! - Produce an `axum::Router` that runs the compiled chains
//!
//! # Design Decisions
//! - Bind errors surface when a route is declared, never per request
//! - Each path is registered with axum once and dispatches to every binding
//!   of that path, so repeated bindings fall through in order
//! - Unmatched requests still pass through router-level steps before the
//!   fallback router sees them

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::{any, Route as AxumRoute};
use axum::Router;
use tower::{Layer, Service};

use crate::config::RouteConfig;
use crate::executor::{Executor, SharedExecutor};
use crate::http::errors::{DefaultErrorHandler, ErrorHandler, SharedErrorHandler};
use crate::pipeline::step::Marker;
use crate::pipeline::{Argument, BindError, Compiler, SharedStep, Step};
use crate::routing::dispatch::{self, PathTable, Route, Shared};
use crate::routing::matcher::{validate_path, MethodMatcher};
use crate::routing::ParamHook;

/// Default limit for buffered request bodies.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

type LayerFn = Box<dyn FnOnce(Router) -> Router + Send + Sync>;

struct Binding {
    path: String,
    route: Route,
}

/// Declarative route builder.
///
/// ```ignore
/// let mut krauter = Krauter::new(executor);
/// krauter
///     .get("/users/{id}", args!["SELECT * FROM users WHERE id = :params.id:"])?
///     .post("/users", args!["INSERT INTO users (name) VALUES (:body.name:)", 201])?;
/// let app = krauter.into_router();
/// ```
pub struct Krauter {
    compiler: Compiler,
    bindings: Vec<Binding>,
    middleware: Vec<SharedStep>,
    params: Vec<(String, Arc<dyn ParamHook>)>,
    layers: Vec<LayerFn>,
    fallback: Option<Router>,
    errors: SharedErrorHandler,
    body_limit: usize,
}

macro_rules! verbs {
    ($($(#[$doc:meta])* $name:ident => $method:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name<I>(&mut self, path: &str, args: I) -> Result<&mut Self, BindError>
            where
                I: IntoIterator,
                I::Item: Into<Argument>,
            {
                self.bind(axum::http::Method::$method, path, args)
            }
        )*
    };
}

impl Krauter {
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self::from_shared(Arc::new(executor))
    }

    pub fn from_shared(executor: SharedExecutor) -> Self {
        Self {
            compiler: Compiler::new(executor),
            bindings: Vec::new(),
            middleware: Vec::new(),
            params: Vec::new(),
            layers: Vec::new(),
            fallback: None,
            errors: Arc::new(DefaultErrorHandler),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Bind `args` to `method` and `path`.
    pub fn bind<I>(
        &mut self,
        method: axum::http::Method,
        path: &str,
        args: I,
    ) -> Result<&mut Self, BindError>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        self.bind_matcher(MethodMatcher::Only(method), path, args)
    }

    verbs! {
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        /// Explicit `HEAD` binding; `get` routes already answer `HEAD`.
        head => HEAD,
        options => OPTIONS,
        trace => TRACE,
        connect => CONNECT,
    }

    /// Bind `args` for every method.
    pub fn all<I>(&mut self, path: &str, args: I) -> Result<&mut Self, BindError>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        self.bind_matcher(MethodMatcher::Any, path, args)
    }

    fn bind_matcher<I>(
        &mut self,
        method: MethodMatcher,
        path: &str,
        args: I,
    ) -> Result<&mut Self, BindError>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        validate_path(path)?;
        let mut steps: Vec<SharedStep> = vec![Arc::new(Marker)];
        steps.extend(self.compiler.compile_all(args.into_iter().map(Into::<Argument>::into))?);

        tracing::debug!(
            method = %method,
            path = %path,
            steps = steps.len() - 1,
            "Route bound"
        );
        self.bindings.push(Binding {
            path: path.to_string(),
            route: Route { method, steps },
        });
        Ok(self)
    }

    /// Bind routes declared in configuration, classifying each step by shape.
    pub fn bind_routes(&mut self, routes: &[RouteConfig]) -> Result<&mut Self, BindError> {
        for route in routes {
            let method = MethodMatcher::parse(&route.method)?;
            let args = route
                .steps
                .iter()
                .map(Argument::classify)
                .collect::<Result<Vec<_>, _>>()?;
            self.bind_matcher(method, &route.path, args)?;
        }
        Ok(self)
    }

    /// Builder scoped to one path.
    pub fn route(&mut self, path: &str) -> Kraut<'_> {
        Kraut {
            krauter: self,
            path: path.to_string(),
        }
    }

    /// Run `step` for every request this router sees, before any route.
    pub fn use_step(&mut self, step: impl Step + 'static) -> &mut Self {
        self.middleware.push(Arc::new(step));
        self
    }

    /// Run `hook` with the value of path parameter `name` before the routes
    /// of any matching path that declares it.
    pub fn param(&mut self, name: &str, hook: impl ParamHook + 'static) -> &mut Self {
        self.params.push((name.to_string(), Arc::new(hook)));
        self
    }

    /// Apply an axum/tower layer to the produced router.
    pub fn layer<L>(&mut self, layer: L) -> &mut Self
    where
        L: Layer<AxumRoute> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Box::new(move |router: Router| router.layer(layer)));
        self
    }

    /// Router that receives requests no route matched, or that left via
    /// `Flow::ExitRouter`. Without one such requests get `404`.
    pub fn fallback(&mut self, router: Router) -> &mut Self {
        self.fallback = Some(router);
        self
    }

    /// Handler for failed chains.
    pub fn on_error(&mut self, handler: impl ErrorHandler) -> &mut Self {
        self.errors = Arc::new(handler);
        self
    }

    /// Maximum buffered request body, in bytes.
    pub fn body_limit(&mut self, bytes: usize) -> &mut Self {
        self.body_limit = bytes;
        self
    }

    /// Produce the request handler.
    pub fn into_router(self) -> Router {
        let shared = Arc::new(Shared {
            middleware: self.middleware,
            params: self.params,
            fallback: self.fallback,
            errors: self.errors,
            body_limit: self.body_limit,
        });

        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Route>> = HashMap::new();
        for Binding { path, route } in self.bindings {
            if !grouped.contains_key(&path) {
                order.push(path.clone());
            }
            grouped.entry(path).or_default().push(route);
        }

        let mut router = Router::new();
        let mut bound = 0;
        for path in order {
            let routes = grouped.remove(&path).unwrap_or_default();
            bound += routes.len();
            let table = Arc::new(PathTable {
                path: path.clone(),
                routes,
                shared: shared.clone(),
            });
            router = router.route(
                &path,
                any(move |req: Request| dispatch::dispatch(table.clone(), req)),
            );
        }

        let unmatched = Arc::new(PathTable {
            path: "*".to_string(),
            routes: Vec::new(),
            shared,
        });
        router = router.fallback(move |req: Request| dispatch::dispatch(unmatched.clone(), req));

        for apply in self.layers {
            router = apply(router);
        }

        tracing::info!(routes = bound, "Router built");
        router
    }
}

/// Path-scoped builder returned by [`Krauter::route`].
pub struct Kraut<'a> {
    krauter: &'a mut Krauter,
    path: String,
}

macro_rules! scoped_verbs {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name<I>(&mut self, args: I) -> Result<&mut Self, BindError>
            where
                I: IntoIterator,
                I::Item: Into<Argument>,
            {
                self.krauter.$name(&self.path, args)?;
                Ok(self)
            }
        )*
    };
}

impl Kraut<'_> {
    scoped_verbs!(get, post, put, delete, patch, head, options, trace, connect, all);

    pub fn bind<I>(&mut self, method: axum::http::Method, args: I) -> Result<&mut Self, BindError>
    where
        I: IntoIterator,
        I::Item: Into<Argument>,
    {
        self.krauter.bind(method, &self.path, args)?;
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
