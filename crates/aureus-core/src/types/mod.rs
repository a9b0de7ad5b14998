pub mod account;
pub mod address;
pub mod operation;
pub mod signed_operation;

pub use account::Account;
pub use address::Address;
pub use operation::Operation;
pub use signed_operation::SignedOperation;
