pub mod answers;
pub mod questions;
pub mod responses;
pub mod surveys;
pub mod users;
