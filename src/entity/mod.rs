pub mod audit_logs;
pub mod products;
pub mod profiles;
pub mod revoked_tokens;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use products::Entity as Products;
pub use profiles::Entity as Profiles;
pub use revoked_tokens::Entity as RevokedTokens;
pub use users::Entity as Users;
