//! Response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, Collection, Customer, Membership, Order, OrderItem, PaymentStatus, Product,
    ProductImage, ProductSummary, Promotion, Review,
};

#[derive(Debug, Serialize)]
pub struct ProductDto {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub inventory: i32,
    pub price: Decimal,
    pub price_with_tax: Decimal,
    pub collection: i64,
    pub promotions: Vec<i64>,
    pub last_update: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            price: p.unit_price.amount(),
            price_with_tax: p.price_with_tax(),
            title: p.title,
            slug: p.slug.to_string(),
            description: p.description,
            inventory: p.inventory,
            collection: p.collection_id,
            promotions: p.promotion_ids,
            last_update: p.last_update,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimpleProductDto {
    pub id: i64,
    pub title: String,
    pub unit_price: Decimal,
}

impl From<ProductSummary> for SimpleProductDto {
    fn from(p: ProductSummary) -> Self {
        Self { id: p.id, title: p.title, unit_price: p.unit_price.amount() }
    }
}

#[derive(Debug, Serialize)]
pub struct CollectionDto {
    pub id: i64,
    pub title: String,
    pub featured_product: Option<i64>,
    pub products_count: i64,
}

impl From<Collection> for CollectionDto {
    fn from(c: Collection) -> Self {
        Self { id: c.id, title: c.title, featured_product: c.featured_product_id, products_count: c.products_count }
    }
}

#[derive(Debug, Serialize)]
pub struct PromotionDto {
    pub id: i64,
    pub description: String,
    pub discount: f64,
}

impl From<Promotion> for PromotionDto {
    fn from(p: Promotion) -> Self { Self { id: p.id, description: p.description, discount: p.discount } }
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: i64,
    pub product: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewDto {
    fn from(r: Review) -> Self {
        Self { id: r.id, product: r.product_id, name: r.name, description: r.description, created_at: r.created_at }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductImageDto {
    pub id: i64,
    pub image: String,
}

impl From<ProductImage> for ProductImageDto {
    fn from(i: ProductImage) -> Self { Self { id: i.id, image: i.image } }
}

#[derive(Debug, Serialize)]
pub struct CartItemDto {
    pub id: i64,
    pub product: SimpleProductDto,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl From<CartItem> for CartItemDto {
    fn from(item: CartItem) -> Self {
        Self { id: item.id, total_price: item.total_price(), quantity: item.quantity, product: item.product.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct CartDto {
    pub id: Uuid,
    pub items: Vec<CartItemDto>,
    pub total_price: Decimal,
}

impl From<Cart> for CartDto {
    fn from(cart: Cart) -> Self {
        let total_price = cart.total_price();
        Self { id: cart.id, items: cart.items.into_iter().map(Into::into).collect(), total_price }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerDto {
    pub id: i64,
    pub user_id: i64,
    pub phone_number: String,
    pub birth_date: Option<NaiveDate>,
    pub membership: Membership,
}

impl From<Customer> for CustomerDto {
    fn from(c: Customer) -> Self {
        Self { id: c.id, user_id: c.user_id, phone_number: c.phone_number, birth_date: c.birth_date, membership: c.membership }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressDto {
    pub id: i64,
    pub street: String,
    pub city: String,
}

impl From<Address> for AddressDto {
    fn from(a: Address) -> Self { Self { id: a.id, street: a.street, city: a.city } }
}

#[derive(Debug, Serialize)]
pub struct OrderItemDto {
    pub id: i64,
    pub product: SimpleProductDto,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl From<OrderItem> for OrderItemDto {
    fn from(item: OrderItem) -> Self {
        Self { id: item.id, unit_price: item.unit_price.amount(), quantity: item.quantity, product: item.product.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: i64,
    pub customer: i64,
    pub placed_at: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItemDto>,
}

impl From<Order> for OrderDto {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            customer: o.customer_id,
            placed_at: o.placed_at,
            payment_status: o.payment_status,
            items: o.items.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn list<T, D: From<T>>(items: Vec<T>) -> Vec<D> { items.into_iter().map(D::from).collect() }
