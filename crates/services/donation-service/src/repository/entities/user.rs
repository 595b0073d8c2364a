//! User database entity for SeaORM.
//!
//! Email and external identity are only ever stored sealed: ciphertext plus
//! blind index. Turning a row into a domain `User` needs the field cipher,
//! so that conversion lives in the user repository.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub email_encrypted: Option<String>,
    #[sea_orm(unique)]
    pub email_hash: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub external_id_encrypted: Option<String>,
    #[sea_orm(unique)]
    pub external_id_hash: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
