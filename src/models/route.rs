use axum::http::Method;
use derive_more::Display;

/// What a request to the events endpoint turns into, decided by its method alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Route {
    #[display(fmt = "preflight")]
    Preflight,
    #[display(fmt = "append")]
    Append,
    #[display(fmt = "list")]
    List,
    #[display(fmt = "rejected")]
    Rejected,
}

impl From<&Method> for Route {
    fn from(method: &Method) -> Self {
        match *method {
            Method::OPTIONS => Self::Preflight,
            Method::POST => Self::Append,
            Method::GET => Self::List,
            _ => Self::Rejected,
        }
    }
}

impl Route {
    pub const fn touches_storage(self) -> bool {
        matches!(self, Self::Append | Self::List)
    }
}
