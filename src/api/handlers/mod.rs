pub mod auth;

pub mod health;
pub use self::health::health;

pub mod groups;
pub use self::groups::find_groups;

pub mod users;
pub use self::users::{add_user, get_user};
