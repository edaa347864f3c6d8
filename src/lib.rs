pub mod coerce;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod orm;
pub mod results;
pub mod submission;
pub mod web;
