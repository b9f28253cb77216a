pub mod guard;
pub mod permissions;
pub mod session;
pub mod user;

pub use guard::*;
pub use permissions::*;
pub use session::*;
pub use user::*;
