pub mod assignment;
pub mod question;
pub mod response;
pub mod test_attempt;
pub mod violation;
