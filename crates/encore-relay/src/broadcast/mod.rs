//! Event broadcasting
//!
//! Routes published events to room members or to every connection.

mod dispatcher;
mod routes;

pub use dispatcher::{EventDispatcher, RouteError};
pub use routes::{ControlEvent, EventRoute, EventRoutes, TopicTemplate};
