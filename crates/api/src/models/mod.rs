//! Domain models for the API.
//!
//! These are validated domain objects, separate from database row types and
//! from the JSON views rendered by the route handlers.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod token;
pub mod user;

pub use address::{Address, AddressChanges, AddressFields};
pub use cart::{Cart, CartItem, CartLine, CartSummary};
pub use order::{AdminOrder, NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{NewProduct, Product, ProductChanges, ProductImage};
pub use token::{NewToken, TokenKind, TokenRecord};
pub use user::{CurrentUser, User, UserProfile};
