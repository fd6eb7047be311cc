pub mod auth_service;
pub use auth_service::{AuthError, AuthService};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub use user_service::{NewUser, UserError, UserService, UserUpdate};

pub mod user_service_impl;
pub use user_service_impl::SeaOrmUserService;

pub mod stock_service;
pub use stock_service::{StockError, StockService};

pub mod stock_service_impl;
pub use stock_service_impl::SeaOrmStockService;

pub mod report_service;
pub use report_service::ReportService;

pub mod report_service_impl;
pub use report_service_impl::SeaOrmReportService;
