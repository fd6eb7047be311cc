pub mod item;
pub mod report;
pub mod time;
pub mod user;

pub use item::{Direction, Item, ItemInput, Movement, MovementInput};
pub use report::{
    CodeTotal, CodeUserTotal, DailyPoint, MovementRow, MovementStats, StatsFilter, StockFilter,
    StockLookup, UserTotal,
};
pub use user::{Role, SessionUser, User};
