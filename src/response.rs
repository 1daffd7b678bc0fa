//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl MetaCount {
    fn of<T>(data: &[T]) -> Self {
        MetaCount {
            count: data.len() as u64,
            total: None,
            limit: None,
            offset: None,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data, meta: None }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data, meta: None }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount::of(&data);
    (StatusCode::OK, Json(SuccessMany { data, meta }))
}

pub fn success_many_created<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount::of(&data);
    (StatusCode::CREATED, Json(SuccessMany { data, meta }))
}

/// A list page: `meta` carries the row count plus total, limit and offset.
pub fn success_page<T: Serialize>(data: Vec<T>, total: i64, limit: u32, offset: u32) -> (StatusCode, Json<SuccessMany<T>>) {
    let meta = MetaCount {
        total: Some(total),
        limit: Some(limit),
        offset: Some(offset),
        ..MetaCount::of(&data)
    };
    (StatusCode::OK, Json(SuccessMany { data, meta }))
}
