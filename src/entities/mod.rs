pub mod prelude;

pub mod items;
pub mod movements;
pub mod users;
