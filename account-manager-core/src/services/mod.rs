//! 业务逻辑服务层

mod account_store;
mod context;
mod key_lock;
mod picker;

pub use account_store::AccountStore;
pub use context::InteractiveContext;
