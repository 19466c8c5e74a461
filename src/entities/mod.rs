//! Entity module - Contains all SeaORM entity definitions for the ledger database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod friendship;
pub mod group;
pub mod group_member;
pub mod lending;
pub mod lending_share;
pub mod repayment;
pub mod user;

// Re-export specific types to avoid conflicts
pub use friendship::{
    Column as FriendshipColumn, Entity as Friendship, Model as FriendshipModel,
};
pub use group::{Column as GroupColumn, Entity as Group, Model as GroupModel};
pub use group_member::{
    Column as GroupMemberColumn, Entity as GroupMember, Model as GroupMemberModel,
};
pub use lending::{Column as LendingColumn, Entity as Lending, Model as LendingModel};
pub use lending_share::{
    Column as LendingShareColumn, Entity as LendingShare, Model as LendingShareModel,
};
pub use repayment::{Column as RepaymentColumn, Entity as Repayment, Model as RepaymentModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
