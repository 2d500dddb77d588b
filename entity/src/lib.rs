pub mod admin_accounts;
pub mod admin_requests;
pub mod guards;
pub mod projects;
