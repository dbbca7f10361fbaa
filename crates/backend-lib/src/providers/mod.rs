//! User, group and throttle providers.

mod groups;
mod throttling;
mod users;

pub use groups::GroupProvider;
pub use throttling::ThrottleProvider;
pub use users::UserProvider;
