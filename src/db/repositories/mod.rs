pub mod item;
pub mod movement;
pub mod user;

pub use item::{ItemQuery, ItemRepository};
pub use movement::MovementRepository;
pub use user::UserRepository;
