pub mod normalization;
pub mod pagination;
pub mod slow_path;
