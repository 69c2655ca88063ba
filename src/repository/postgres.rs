//! PostgreSQL implementation of the store.
//!
//! Every multi-statement write runs in one transaction. Rows that embed a
//! product summary (cart and order lines) are decoded by hand from joined
//! `product_*` columns.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{query, query_as, query_scalar, FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::messages::*;
use super::{
    CartRepository, CollectionRepository, CustomerRepository, OrderRepository, ProductRepository,
    PromotionRepository, ReviewRepository,
};
use crate::domain::aggregates::{
    Address, Cart, CartItem, Collection, Customer, NewAddress, NewCartItem, NewCollection,
    NewCustomer, NewProduct, NewProductImage, NewPromotion, NewReview, Order, OrderError, OrderItem,
    PaymentStatus, Product, ProductFilter, ProductImage, ProductSummary, Promotion, Review,
};
use crate::domain::value_objects::{Price, Slug};
use crate::{Result, StoreError};

const PRODUCT_SELECT: &str = r#"
SELECT p.id, p.title, p.slug, p.description, p.unit_price, p.inventory, p.last_update, p.collection_id,
       COALESCE(ARRAY_AGG(pp.promotion_id ORDER BY pp.promotion_id)
                FILTER (WHERE pp.promotion_id IS NOT NULL), '{}'::BIGINT[]) AS promotion_ids
FROM products p
LEFT JOIN product_promotions pp ON pp.product_id = p.id
"#;

const COLLECTION_SELECT: &str = r#"
SELECT c.id, c.title, c.featured_product_id, COUNT(p.id) AS products_count
FROM collections c
LEFT JOIN products p ON p.collection_id = c.id
"#;

const CART_ITEM_SELECT: &str = r#"
SELECT ci.id, ci.cart_id, ci.quantity,
       p.id AS product_id, p.title AS product_title, p.unit_price AS product_unit_price
FROM cart_items ci
JOIN products p ON p.id = ci.product_id
"#;

const ORDER_ITEMS_SQL: &str = r#"
SELECT oi.id, oi.order_id, oi.quantity, oi.unit_price,
       p.id AS product_id, p.title AS product_title, p.unit_price AS product_unit_price
FROM order_items oi
JOIN products p ON p.id = oi.product_id
WHERE oi.order_id = ANY($1)
ORDER BY oi.id
"#;

const ORDER_COLUMNS: &str = "id, customer_id, placed_at, payment_status";
const CUSTOMER_COLUMNS: &str = "id, user_id, phone_number, birth_date, membership";

fn product_summary(row: &PgRow) -> sqlx::Result<ProductSummary> {
    Ok(ProductSummary {
        id: row.try_get("product_id")?,
        title: row.try_get("product_title")?,
        unit_price: row.try_get::<Price, _>("product_unit_price")?,
    })
}

impl<'r> FromRow<'r, PgRow> for CartItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            cart_id: row.try_get("cart_id")?,
            product: product_summary(row)?,
            quantity: row.try_get("quantity")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product: product_summary(row)?,
            unit_price: row.try_get("unit_price")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23505")
}

/// A merged cart line past the quantity CHECK, or past the INTEGER range.
fn is_quantity_overflow(err: &sqlx::Error) -> bool {
    has_code(err, "23514") || has_code(err, "22003")
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    err.as_database_error().and_then(|e| e.code()).is_some_and(|c| c == code)
}

/// Takes the cart row lock that serialises line edits against checkout.
async fn lock_cart(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<bool> {
    let cart: Option<Uuid> = query_scalar("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(cart.is_some())
}

async fn fetch_product(conn: &mut PgConnection, id: i64) -> sqlx::Result<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1 GROUP BY p.id");
    query_as::<_, Product>(&sql).bind(id).fetch_optional(conn).await
}

async fn fetch_collection(conn: &mut PgConnection, id: i64) -> sqlx::Result<Option<Collection>> {
    let sql = format!("{COLLECTION_SELECT} WHERE c.id = $1 GROUP BY c.id");
    query_as::<_, Collection>(&sql).bind(id).fetch_optional(conn).await
}

async fn fetch_cart_item(conn: &mut PgConnection, cart_id: Uuid, id: i64) -> sqlx::Result<Option<CartItem>> {
    let sql = format!("{CART_ITEM_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2");
    query_as::<_, CartItem>(&sql).bind(cart_id).bind(id).fetch_optional(conn).await
}

async fn attach_items(conn: &mut PgConnection, mut orders: Vec<Order>) -> sqlx::Result<Vec<Order>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let items = query_as::<_, OrderItem>(ORDER_ITEMS_SQL).bind(&ids).fetch_all(conn).await?;

    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in &mut orders {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

async fn exists(conn: &mut PgConnection, sql: &str, id: i64) -> sqlx::Result<bool> {
    query_scalar::<_, bool>(sql).bind(id).fetch_one(conn).await
}

/// Checks that the collection and promotions a product points at exist.
async fn check_product_input(conn: &mut PgConnection, input: &NewProduct) -> Result<(Slug, Price, Vec<i64>)> {
    let slug = Slug::new(input.slug.clone())?;
    let price = Price::new(input.price)?;

    if !exists(&mut *conn, "SELECT EXISTS(SELECT 1 FROM collections WHERE id = $1)", input.collection).await? {
        return Err(StoreError::field("collection", "does_not_exist", NO_SUCH_COLLECTION));
    }

    let mut promotions = input.promotions.clone();
    promotions.sort_unstable();
    promotions.dedup();
    let found: i64 = query_scalar("SELECT COUNT(*) FROM promotions WHERE id = ANY($1)")
        .bind(&promotions)
        .fetch_one(&mut *conn)
        .await?;
    if found != promotions.len() as i64 {
        return Err(StoreError::field("promotions", "does_not_exist", NO_SUCH_PROMOTION));
    }
    Ok((slug, price, promotions))
}

async fn replace_promotions(conn: &mut PgConnection, product_id: i64, promotions: &[i64]) -> sqlx::Result<()> {
    query("DELETE FROM product_promotions WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    query("INSERT INTO product_promotions (product_id, promotion_id) SELECT $1, UNNEST($2::BIGINT[])")
        .bind(product_id)
        .bind(promotions)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))
    }
}

#[async_trait]
impl CollectionRepository for PgStore {
    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let sql = format!("{COLLECTION_SELECT} GROUP BY c.id ORDER BY c.title");
        Ok(query_as::<_, Collection>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_collection(&mut conn, id).await?)
    }

    async fn create_collection(&self, input: NewCollection) -> Result<Collection> {
        let mut tx = self.pool.begin().await?;
        if let Some(product_id) = input.featured_product {
            if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id).await? {
                return Err(StoreError::field("featured_product", "does_not_exist", NO_SUCH_PRODUCT));
            }
        }
        let id: i64 = query_scalar("INSERT INTO collections (title, featured_product_id) VALUES ($1, $2) RETURNING id")
            .bind(&input.title)
            .bind(input.featured_product)
            .fetch_one(&mut *tx)
            .await?;
        let collection = fetch_collection(&mut tx, id).await?.ok_or(StoreError::NotFound("collection"))?;
        tx.commit().await?;
        tracing::info!(collection_id = id, "Created collection");
        Ok(collection)
    }

    async fn update_collection(&self, id: i64, input: NewCollection) -> Result<Collection> {
        let mut tx = self.pool.begin().await?;
        if let Some(product_id) = input.featured_product {
            if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id).await? {
                return Err(StoreError::field("featured_product", "does_not_exist", NO_SUCH_PRODUCT));
            }
        }
        let updated = query("UPDATE collections SET title = $2, featured_product_id = $3 WHERE id = $1")
            .bind(id)
            .bind(&input.title)
            .bind(input.featured_product)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::NotFound("collection"));
        }
        let collection = fetch_collection(&mut tx, id).await?.ok_or(StoreError::NotFound("collection"))?;
        tx.commit().await?;
        Ok(collection)
    }

    async fn delete_collection(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let collection = fetch_collection(&mut tx, id).await?.ok_or(StoreError::NotFound("collection"))?;
        if !collection.is_empty() {
            return Err(StoreError::Protected(COLLECTION_HAS_PRODUCTS.to_string()));
        }
        query("DELETE FROM collections WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(collection_id = id, "Deleted collection");
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE ($1::BIGINT IS NULL OR p.collection_id = $1) GROUP BY p.id ORDER BY p.id");
        Ok(query_as::<_, Product>(&sql).bind(filter.collection_id).fetch_all(&self.pool).await?)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_product(&mut conn, id).await?)
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let (slug, price, promotions) = check_product_input(&mut tx, &input).await?;
        let id: i64 = query_scalar(
            "INSERT INTO products (title, slug, description, unit_price, inventory, collection_id, last_update) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING id",
        )
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.description)
        .bind(price)
        .bind(input.inventory)
        .bind(input.collection)
        .fetch_one(&mut *tx)
        .await?;
        replace_promotions(&mut tx, id, &promotions).await?;
        let product = fetch_product(&mut tx, id).await?.ok_or(StoreError::NotFound("product"))?;
        tx.commit().await?;
        tracing::info!(product_id = id, "Created product");
        Ok(product)
    }

    async fn update_product(&self, id: i64, input: NewProduct) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let (slug, price, promotions) = check_product_input(&mut tx, &input).await?;
        let updated = query(
            "UPDATE products SET title = $2, slug = $3, description = $4, unit_price = $5, inventory = $6, \
             collection_id = $7, last_update = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.description)
        .bind(price)
        .bind(input.inventory)
        .bind(input.collection)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::NotFound("product"));
        }
        replace_promotions(&mut tx, id, &promotions).await?;
        let product = fetch_product(&mut tx, id).await?.ok_or(StoreError::NotFound("product"))?;
        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", id).await? {
            return Err(StoreError::NotFound("product"));
        }
        if exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM order_items WHERE product_id = $1)", id).await? {
            return Err(StoreError::Protected(PRODUCT_IN_ORDER.to_string()));
        }
        query("DELETE FROM products WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(product_id = id, "Deleted product");
        Ok(())
    }

    async fn list_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
        Ok(query_as::<_, ProductImage>("SELECT id, product_id, image FROM product_images WHERE product_id = $1 ORDER BY id")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_image(&self, product_id: i64, id: i64) -> Result<Option<ProductImage>> {
        Ok(query_as::<_, ProductImage>("SELECT id, product_id, image FROM product_images WHERE product_id = $1 AND id = $2")
            .bind(product_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn add_image(&self, product_id: i64, input: NewProductImage) -> Result<ProductImage> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id).await? {
            return Err(StoreError::NotFound("product"));
        }
        let image = query_as::<_, ProductImage>(
            "INSERT INTO product_images (product_id, image) VALUES ($1, $2) RETURNING id, product_id, image",
        )
        .bind(product_id)
        .bind(&input.image)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(image)
    }

    async fn delete_image(&self, product_id: i64, id: i64) -> Result<()> {
        let deleted = query("DELETE FROM product_images WHERE product_id = $1 AND id = $2")
            .bind(product_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("image")) } else { Ok(()) }
    }
}

#[async_trait]
impl ReviewRepository for PgStore {
    async fn list_reviews(&self, product_id: i64) -> Result<Vec<Review>> {
        Ok(query_as::<_, Review>(
            "SELECT id, product_id, name, description, created_at FROM reviews WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_review(&self, product_id: i64, id: i64) -> Result<Option<Review>> {
        Ok(query_as::<_, Review>(
            "SELECT id, product_id, name, description, created_at FROM reviews WHERE product_id = $1 AND id = $2",
        )
        .bind(product_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_review(&self, product_id: i64, input: NewReview) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", product_id).await? {
            return Err(StoreError::NotFound("product"));
        }
        let review = query_as::<_, Review>(
            "INSERT INTO reviews (product_id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, product_id, name, description, created_at",
        )
        .bind(product_id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(review)
    }

    async fn update_review(&self, product_id: i64, id: i64, input: NewReview) -> Result<Review> {
        query_as::<_, Review>(
            "UPDATE reviews SET name = $3, description = $4 WHERE product_id = $1 AND id = $2 \
             RETURNING id, product_id, name, description, created_at",
        )
        .bind(product_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("review"))
    }

    async fn delete_review(&self, product_id: i64, id: i64) -> Result<()> {
        let deleted = query("DELETE FROM reviews WHERE product_id = $1 AND id = $2")
            .bind(product_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("review")) } else { Ok(()) }
    }
}

#[async_trait]
impl PromotionRepository for PgStore {
    async fn list_promotions(&self) -> Result<Vec<Promotion>> {
        Ok(query_as::<_, Promotion>("SELECT id, description, discount FROM promotions ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_promotion(&self, id: i64) -> Result<Option<Promotion>> {
        Ok(query_as::<_, Promotion>("SELECT id, description, discount FROM promotions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_promotion(&self, input: NewPromotion) -> Result<Promotion> {
        Ok(query_as::<_, Promotion>(
            "INSERT INTO promotions (description, discount) VALUES ($1, $2) RETURNING id, description, discount",
        )
        .bind(&input.description)
        .bind(input.discount)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_promotion(&self, id: i64) -> Result<()> {
        let deleted = query("DELETE FROM promotions WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("promotion")) } else { Ok(()) }
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn create_cart(&self) -> Result<Cart> {
        let cart = Cart::new();
        query("INSERT INTO carts (id, created_at) VALUES ($1, $2)")
            .bind(cart.id)
            .bind(cart.created_at)
            .execute(&self.pool)
            .await?;
        tracing::info!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    async fn get_cart(&self, id: Uuid) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        let created_at: Option<DateTime<Utc>> = query_scalar("SELECT created_at FROM carts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(created_at) = created_at else { return Ok(None) };

        let sql = format!("{CART_ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id");
        let items = query_as::<_, CartItem>(&sql).bind(id).fetch_all(&mut *conn).await?;
        Ok(Some(Cart { id, created_at, items }))
    }

    async fn delete_cart(&self, id: Uuid) -> Result<()> {
        let deleted = query("DELETE FROM carts WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("cart")) } else { Ok(()) }
    }

    async fn add_cart_item(&self, cart_id: Uuid, input: NewCartItem) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? {
            return Err(StoreError::NotFound("cart"));
        }
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)", input.product_id).await? {
            return Err(StoreError::field("product_id", "does_not_exist", NO_SUCH_PRODUCT));
        }

        let id: i64 = query_scalar(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             RETURNING id",
        )
        .bind(cart_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_quantity_overflow(&e) { StoreError::field("quantity", "max_value", QUANTITY_TOO_LARGE) } else { e.into() }
        })?;

        let item = fetch_cart_item(&mut tx, cart_id, id).await?.ok_or(StoreError::NotFound("cart item"))?;
        tx.commit().await?;
        Ok(item)
    }

    async fn get_cart_item(&self, cart_id: Uuid, id: i64) -> Result<Option<CartItem>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_cart_item(&mut conn, cart_id, id).await?)
    }

    async fn set_cart_item_quantity(&self, cart_id: Uuid, id: i64, quantity: i32) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? {
            return Err(StoreError::NotFound("cart item"));
        }
        let updated = query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::NotFound("cart item"));
        }
        let item = fetch_cart_item(&mut tx, cart_id, id).await?.ok_or(StoreError::NotFound("cart item"))?;
        tx.commit().await?;
        Ok(item)
    }

    async fn delete_cart_item(&self, cart_id: Uuid, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? {
            return Err(StoreError::NotFound("cart item"));
        }
        let deleted = query("DELETE FROM cart_items WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::NotFound("cart item"));
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for PgStore {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id");
        Ok(query_as::<_, Customer>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        Ok(query_as::<_, Customer>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_customer_by_user(&self, user_id: i64) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = $1");
        Ok(query_as::<_, Customer>(&sql).bind(user_id).fetch_optional(&self.pool).await?)
    }

    async fn create_customer(&self, input: NewCustomer) -> Result<Customer> {
        let sql = format!(
            "INSERT INTO customers (user_id, phone_number, birth_date, membership) VALUES ($1, $2, $3, $4) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let customer = query_as::<_, Customer>(&sql)
            .bind(input.user_id)
            .bind(&input.phone_number)
            .bind(input.birth_date)
            .bind(input.membership)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) { StoreError::field("user_id", "unique", DUPLICATE_CUSTOMER) } else { e.into() }
            })?;
        tracing::info!(customer_id = customer.id, user_id = customer.user_id, "Created customer");
        Ok(customer)
    }

    async fn update_customer(&self, id: i64, input: NewCustomer) -> Result<Customer> {
        let sql = format!(
            "UPDATE customers SET user_id = $2, phone_number = $3, birth_date = $4, membership = $5 \
             WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        );
        query_as::<_, Customer>(&sql)
            .bind(id)
            .bind(input.user_id)
            .bind(&input.phone_number)
            .bind(input.birth_date)
            .bind(input.membership)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) { StoreError::field("user_id", "unique", DUPLICATE_CUSTOMER) } else { e.into() }
            })?
            .ok_or(StoreError::NotFound("customer"))
    }

    async fn delete_customer(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)", id).await? {
            return Err(StoreError::NotFound("customer"));
        }
        if exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM orders WHERE customer_id = $1)", id).await? {
            return Err(StoreError::Protected(CUSTOMER_HAS_ORDERS.to_string()));
        }
        query("DELETE FROM customers WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>> {
        let mut conn = self.pool.acquire().await?;
        if !exists(&mut conn, "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)", customer_id).await? {
            return Err(StoreError::NotFound("customer"));
        }
        Ok(query_as::<_, Address>("SELECT id, customer_id, street, city FROM addresses WHERE customer_id = $1 ORDER BY id")
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?)
    }

    async fn add_address(&self, customer_id: i64, input: NewAddress) -> Result<Address> {
        let mut tx = self.pool.begin().await?;
        if !exists(&mut tx, "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)", customer_id).await? {
            return Err(StoreError::NotFound("customer"));
        }
        let address = query_as::<_, Address>(
            "INSERT INTO addresses (customer_id, street, city) VALUES ($1, $2, $3) RETURNING id, customer_id, street, city",
        )
        .bind(customer_id)
        .bind(&input.street)
        .bind(&input.city)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn delete_address(&self, customer_id: i64, id: i64) -> Result<()> {
        let deleted = query("DELETE FROM addresses WHERE customer_id = $1 AND id = $2")
            .bind(customer_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("address")) } else { Ok(()) }
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn list_orders(&self, customer_id: Option<i64>) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::BIGINT IS NULL OR customer_id = $1) ORDER BY id");
        let orders = query_as::<_, Order>(&sql).bind(customer_id).fetch_all(&mut *conn).await?;
        Ok(attach_items(&mut conn, orders).await?)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(order) = query_as::<_, Order>(&sql).bind(id).fetch_optional(&mut *conn).await? else {
            return Ok(None);
        };
        Ok(attach_items(&mut conn, vec![order]).await?.pop())
    }

    async fn place_order(&self, user_id: i64, cart_id: Uuid) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Locking the cart row serialises concurrent checkouts and line edits of the same cart.
        if !lock_cart(&mut tx, cart_id).await? {
            return Err(StoreError::field("cart_id", "does_not_exist", NO_SUCH_CART));
        }
        let lines: i64 = query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_one(&mut *tx)
            .await?;
        if lines == 0 {
            return Err(StoreError::field("cart_id", "empty", EMPTY_CART));
        }
        let customer_id: i64 = query_scalar("SELECT id FROM customers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound("customer"))?;

        let sql = format!("INSERT INTO orders (customer_id, payment_status) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}");
        let order = query_as::<_, Order>(&sql)
            .bind(customer_id)
            .bind(PaymentStatus::Pending)
            .fetch_one(&mut *tx)
            .await?;

        let copied = query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
             SELECT $1, ci.product_id, ci.quantity, p.unit_price \
             FROM cart_items ci JOIN products p ON p.id = ci.product_id \
             WHERE ci.cart_id = $2 ORDER BY ci.id",
        )
        .bind(order.id)
        .bind(cart_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if copied == 0 {
            return Err(StoreError::field("cart_id", "empty", EMPTY_CART));
        }

        query("DELETE FROM carts WHERE id = $1").bind(cart_id).execute(&mut *tx).await?;

        let order = attach_items(&mut tx, vec![order])
            .await?
            .pop()
            .ok_or_else(|| StoreError::Internal("order vanished inside its own transaction".into()))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "UPDATE orders SET payment_status = $3 WHERE id = $1 AND payment_status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let updated = query_as::<_, Order>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&mut *conn)
            .await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let current: PaymentStatus = query_scalar("SELECT payment_status FROM orders WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or(StoreError::NotFound("order"))?;
                return Err(OrderError::PaymentSettled(current).into());
            }
        };
        attach_items(&mut conn, vec![order])
            .await?
            .pop()
            .ok_or(StoreError::NotFound("order"))
    }

    async fn delete_order(&self, id: i64) -> Result<()> {
        let deleted = query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?.rows_affected();
        if deleted == 0 { Err(StoreError::NotFound("order")) } else { Ok(()) }
    }
}
