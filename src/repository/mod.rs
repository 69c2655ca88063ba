//! Data access layer.
//!
//! One repository trait per aggregate. Referential checks that the
//! database alone would not enforce (deletion guards, existence of related
//! rows on create) live in the implementations, so both stores behave the
//! same way.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, Collection, Customer, NewAddress, NewCartItem, NewCollection,
    NewCustomer, NewProduct, NewProductImage, NewPromotion, NewReview, Order, PaymentStatus,
    Product, ProductFilter, ProductImage, Promotion, Review,
};
use crate::Result;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<Collection>>;

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>>;

    async fn create_collection(&self, input: NewCollection) -> Result<Collection>;

    async fn update_collection(&self, id: i64, input: NewCollection) -> Result<Collection>;

    /// Refused with [`crate::StoreError::Protected`] while the collection owns products.
    async fn delete_collection(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;

    async fn get_product(&self, id: i64) -> Result<Option<Product>>;

    async fn create_product(&self, input: NewProduct) -> Result<Product>;

    async fn update_product(&self, id: i64, input: NewProduct) -> Result<Product>;

    /// Refused with [`crate::StoreError::Protected`] while any order line references the product.
    async fn delete_product(&self, id: i64) -> Result<()>;

    async fn list_images(&self, product_id: i64) -> Result<Vec<ProductImage>>;

    async fn get_image(&self, product_id: i64, id: i64) -> Result<Option<ProductImage>>;

    async fn add_image(&self, product_id: i64, input: NewProductImage) -> Result<ProductImage>;

    async fn delete_image(&self, product_id: i64, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn list_reviews(&self, product_id: i64) -> Result<Vec<Review>>;

    async fn get_review(&self, product_id: i64, id: i64) -> Result<Option<Review>>;

    async fn create_review(&self, product_id: i64, input: NewReview) -> Result<Review>;

    async fn update_review(&self, product_id: i64, id: i64, input: NewReview) -> Result<Review>;

    async fn delete_review(&self, product_id: i64, id: i64) -> Result<()>;
}

#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn list_promotions(&self) -> Result<Vec<Promotion>>;

    async fn get_promotion(&self, id: i64) -> Result<Option<Promotion>>;

    async fn create_promotion(&self, input: NewPromotion) -> Result<Promotion>;

    async fn delete_promotion(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn create_cart(&self) -> Result<Cart>;

    async fn get_cart(&self, id: Uuid) -> Result<Option<Cart>>;

    async fn delete_cart(&self, id: Uuid) -> Result<()>;

    /// Upsert keyed on (cart, product): an existing line has its quantity incremented.
    async fn add_cart_item(&self, cart_id: Uuid, input: NewCartItem) -> Result<CartItem>;

    async fn get_cart_item(&self, cart_id: Uuid, id: i64) -> Result<Option<CartItem>>;

    async fn set_cart_item_quantity(&self, cart_id: Uuid, id: i64, quantity: i32) -> Result<CartItem>;

    async fn delete_cart_item(&self, cart_id: Uuid, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>>;

    async fn get_customer_by_user(&self, user_id: i64) -> Result<Option<Customer>>;

    async fn create_customer(&self, input: NewCustomer) -> Result<Customer>;

    async fn update_customer(&self, id: i64, input: NewCustomer) -> Result<Customer>;

    /// Refused with [`crate::StoreError::Protected`] while the customer has orders.
    async fn delete_customer(&self, id: i64) -> Result<()>;

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>>;

    async fn add_address(&self, customer_id: i64, input: NewAddress) -> Result<Address>;

    async fn delete_address(&self, customer_id: i64, id: i64) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders of one customer, or all orders when `customer_id` is `None`.
    async fn list_orders(&self, customer_id: Option<i64>) -> Result<Vec<Order>>;

    async fn get_order(&self, id: i64) -> Result<Option<Order>>;

    /// Converts a cart into an order in one transaction: the order and its
    /// lines are created with the products' current prices and the cart is
    /// deleted, or nothing changes at all.
    async fn place_order(&self, user_id: i64, cart_id: Uuid) -> Result<Order>;

    /// Moves the order from `from` to `to`. Fails with a settled-payment
    /// error if another writer changed the status first.
    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Order>;

    async fn delete_order(&self, id: i64) -> Result<()>;
}

/// Every repository behind one handle, as shared by the HTTP layer.
pub trait Store:
    CollectionRepository
    + ProductRepository
    + ReviewRepository
    + PromotionRepository
    + CartRepository
    + CustomerRepository
    + OrderRepository
{
}

impl<T> Store for T where
    T: CollectionRepository
        + ProductRepository
        + ReviewRepository
        + PromotionRepository
        + CartRepository
        + CustomerRepository
        + OrderRepository
{
}

pub(crate) mod messages {
    pub const COLLECTION_HAS_PRODUCTS: &str =
        "Collection cannot be deleted because it includes one or more products.";
    pub const PRODUCT_IN_ORDER: &str =
        "Product cannot be deleted because it is associated with an order item.";
    pub const CUSTOMER_HAS_ORDERS: &str =
        "Customer cannot be deleted because they have placed orders.";
    pub const NO_SUCH_PRODUCT: &str = "No product with the given ID was found.";
    pub const NO_SUCH_COLLECTION: &str = "No collection with the given ID was found.";
    pub const NO_SUCH_PROMOTION: &str = "No promotion with the given ID was found.";
    pub const NO_SUCH_CART: &str = "No cart with the given ID was found.";
    pub const EMPTY_CART: &str = "The cart is empty.";
    pub const QUANTITY_TOO_LARGE: &str = "Ensure the line quantity is less than or equal to 32767.";
    pub const DUPLICATE_CUSTOMER: &str = "A customer profile already exists for this user.";
}
