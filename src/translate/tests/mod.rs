//! Translation tests over a shared fixture catalog.

mod recursive;
mod select;

use crate::ast::WireType;
use crate::meta::{Catalog, EntityDef, FieldDef};

pub(super) fn catalog() -> Catalog {
    Catalog::new()
        .entity(
            EntityDef::new("users")
                .table("Users")
                .field(
                    FieldDef::new("id", WireType::Int)
                        .column("Id")
                        .primary_key()
                        .auto_increment(),
                )
                .field(FieldDef::new("name", WireType::String).column("Name"))
                .field(
                    FieldDef::new("email", WireType::String)
                        .column("Email")
                        .formatter("lower"),
                )
                .field(FieldDef::new("active", WireType::Bool).column("Active"))
                .field(FieldDef::new("age", WireType::Int).column("Age")),
        )
        .entity(
            EntityDef::new("orders")
                .table("Orders")
                .field(FieldDef::new("id", WireType::Int).column("Id").primary_key())
                .field(FieldDef::new("userId", WireType::Int).column("UserId"))
                .field(FieldDef::new("total", WireType::Decimal).column("Total"))
                .field(FieldDef::new("status", WireType::String).column("Status")),
        )
        .entity(
            EntityDef::new("categories")
                .table("Categories")
                .field(FieldDef::new("id", WireType::Int).column("Id").primary_key())
                .field(FieldDef::new("parentId", WireType::Int).column("ParentId"))
                .field(FieldDef::new("name", WireType::String).column("Name")),
        )
        .entity(
            EntityDef::new("logs")
                .table("Logs0")
                .table("Logs1")
                .field(FieldDef::new("id", WireType::Int).column("Id").primary_key())
                .field(
                    FieldDef::new("bucket", WireType::Int)
                        .column("Bucket")
                        .shard_key(),
                )
                .field(FieldDef::new("message", WireType::String).column("Message")),
        )
        .entity(
            EntityDef::new("metrics")
                .table("Metrics0")
                .table("Metrics1")
                .field(
                    FieldDef::new("id", WireType::Int)
                        .column("Id")
                        .primary_key()
                        .auto_increment(),
                )
                .field(
                    FieldDef::new("bucket", WireType::Int)
                        .column("Bucket")
                        .shard_key(),
                ),
        )
        .relation("orders", "userId", "users", "id")
}
