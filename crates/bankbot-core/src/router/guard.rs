use tracing::debug;

use super::{NavTarget, RouteTable, REDIRECT_QUERY};
use crate::auth::Session;

/// Upper bound on chained redirects in `navigate`
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(NavTarget),
}

/// Pre-navigation hook enforcing which routes need a session.
#[derive(Clone)]
pub struct NavigationGuard {
    routes: RouteTable,
    session: Session,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable, session: Session) -> Self {
        Self { routes, session }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide a single transition to `to`. No side effects.
    pub fn before_each(&self, to: &NavTarget) -> GuardDecision {
        let authenticated = self.session.is_authenticated();

        if authenticated && to.name == self.routes.sign_in().name {
            GuardDecision::Redirect(self.routes.home().target())
        } else if authenticated || !to.requires_session {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(
                self.routes
                    .sign_in()
                    .target()
                    .with_query(REDIRECT_QUERY, to.full_path()),
            )
        }
    }

    /// Follow guard redirects from `to` until a transition is allowed and
    /// return where the user ends up.
    pub fn navigate(&self, to: NavTarget) -> NavTarget {
        let mut current = to;
        for _ in 0..MAX_REDIRECTS {
            match self.before_each(&current) {
                GuardDecision::Allow => return current,
                GuardDecision::Redirect(next) => {
                    debug!(from = %current.full_path(), to = %next.full_path(), "Guard redirect");
                    current = next;
                }
            }
        }
        current
    }

    /// Where to go after signing in: the preserved `redirect` path when it
    /// names a known route, else home.
    pub fn after_sign_in(&self, sign_in: &NavTarget) -> NavTarget {
        sign_in
            .query_value(REDIRECT_QUERY)
            .and_then(|path| self.routes.resolve(path))
            .unwrap_or_else(|| self.routes.home().target())
    }
}
