pub mod categories;
pub mod customers;
pub mod inventory;
pub mod products;
pub mod sales;
pub mod suppliers;
pub mod users;
