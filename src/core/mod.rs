//! Core business logic - framework-agnostic ledger, group and user operations.
//!
//! Everything here takes a `SeaORM` connection and returns [`crate::errors::Result`];
//! nothing knows about HTTP. Ledger writes also take the [`crate::cache::BalanceCache`]
//! so they can invalidate it.

/// Balance aggregation over lendings and repayments
pub mod balance;
/// Friend requests and friend lists
pub mod friend;
/// Groups, memberships and permission checks
pub mod group;
/// Lending editor
pub mod lending;
/// Yen amounts, share validation and even splits
pub mod money;
/// Settlement recorder
pub mod repayment;
/// Signup, profile and bank settings
pub mod user;
/// Per-viewer credit and debt lists
pub mod view;
