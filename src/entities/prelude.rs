pub use super::items::Entity as Items;
pub use super::movements::Entity as Movements;
pub use super::users::Entity as Users;
