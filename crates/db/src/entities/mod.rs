//! `SeaORM` entities.

pub mod budgets;
pub mod events;
pub mod users;

pub mod prelude {
    //! Entity aliases.
    pub use super::budgets::Entity as Budgets;
    pub use super::events::Entity as Events;
    pub use super::users::Entity as Users;
}
