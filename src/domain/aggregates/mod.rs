//! Aggregates module
pub mod cart;
pub mod collection;
pub mod customer;
pub mod order;
pub mod product;
pub mod promotion;
pub mod review;

pub use cart::{merged_quantity, Cart, CartItem, CartItemChanges, NewCartItem, MAX_QUANTITY};
pub use collection::{Collection, NewCollection};
pub use customer::{Address, Customer, CustomerProfile, Membership, NewAddress, NewCustomer};
pub use order::{Order, OrderChanges, OrderError, OrderItem, PaymentStatus, PlaceOrder};
pub use product::{NewProduct, NewProductImage, Product, ProductFilter, ProductImage, ProductPatch, ProductSummary};
pub use promotion::{NewPromotion, Promotion};
pub use review::{NewReview, Review};
