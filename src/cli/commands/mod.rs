mod init;
mod serve;
mod users;

pub use init::cmd_init;
pub use serve::cmd_serve;
pub use users::{cmd_users_add, cmd_users_list, cmd_users_set_locked, cmd_users_set_password};
