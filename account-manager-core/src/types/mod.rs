//! 类型定义模块

mod account;
mod picker;

pub use account::{
    AccountKey, AccountRecord, AccountSnapshot, AddAccountRequest, UserData, USER_DATA_PLAN,
    USER_DATA_TOKEN_SAVED, USER_DATA_TYPE_LABEL,
};
pub use picker::{PickedAccount, PickerEvent};
