pub use entity::{email_summary, prelude::*, user_settings};
pub use sea_orm::{
    prelude::*,
    sea_query::{OnConflict, Value},
    ActiveValue, ConnectionTrait, DatabaseConnection, DbErr, QueryOrder, QuerySelect, Schema,
};
