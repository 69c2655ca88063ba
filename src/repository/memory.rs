//! In-memory implementation of the store (for development/testing).
//!
//! All tables sit behind one `RwLock`, so every write method is a single
//! critical section. That is what gives `place_order` and the cart upsert
//! their atomicity here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::messages::*;
use super::{
    CartRepository, CollectionRepository, CustomerRepository, OrderRepository, ProductRepository,
    PromotionRepository, ReviewRepository,
};
use crate::domain::aggregates::{
    merged_quantity, Address, Cart, CartItem, Collection, Customer, NewAddress, NewCartItem, NewCollection,
    NewCustomer, NewProduct, NewProductImage, NewPromotion, NewReview, Order, OrderError, OrderItem,
    PaymentStatus, Product, ProductFilter, ProductImage, Promotion, Review,
};
use crate::domain::value_objects::{Price, Slug};
use crate::{Result, StoreError};

#[derive(Debug, Clone)]
struct CollectionRow {
    id: i64,
    title: String,
    featured_product_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct CartItemRow {
    id: i64,
    cart_id: Uuid,
    product_id: i64,
    quantity: i32,
}

#[derive(Debug, Clone)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    placed_at: DateTime<Utc>,
    payment_status: PaymentStatus,
}

#[derive(Debug, Clone)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: Price,
}

#[derive(Debug, Default)]
struct Tables {
    sequence: i64,
    promotions: BTreeMap<i64, Promotion>,
    collections: BTreeMap<i64, CollectionRow>,
    products: BTreeMap<i64, Product>,
    images: BTreeMap<i64, ProductImage>,
    reviews: BTreeMap<i64, Review>,
    customers: BTreeMap<i64, Customer>,
    addresses: BTreeMap<i64, Address>,
    carts: HashMap<Uuid, DateTime<Utc>>,
    cart_items: BTreeMap<i64, CartItemRow>,
    orders: BTreeMap<i64, OrderRow>,
    order_items: BTreeMap<i64, OrderItemRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn collection(&self, row: &CollectionRow) -> Collection {
        let products_count = self.products.values().filter(|p| p.collection_id == row.id).count();
        Collection {
            id: row.id,
            title: row.title.clone(),
            featured_product_id: row.featured_product_id,
            products_count: products_count as i64,
        }
    }

    fn cart_item(&self, row: &CartItemRow) -> Result<CartItem> {
        let product = self.products.get(&row.product_id).ok_or(StoreError::NotFound("product"))?;
        Ok(CartItem { id: row.id, cart_id: row.cart_id, product: product.summary(), quantity: row.quantity })
    }

    fn cart(&self, id: Uuid) -> Result<Option<Cart>> {
        let Some(created_at) = self.carts.get(&id) else { return Ok(None) };
        let items = self
            .cart_items
            .values()
            .filter(|row| row.cart_id == id)
            .map(|row| self.cart_item(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Cart { id, created_at: *created_at, items }))
    }

    fn order(&self, row: &OrderRow) -> Result<Order> {
        let items = self
            .order_items
            .values()
            .filter(|item| item.order_id == row.id)
            .map(|item| {
                let product = self.products.get(&item.product_id).ok_or(StoreError::NotFound("product"))?;
                Ok(OrderItem {
                    id: item.id,
                    order_id: item.order_id,
                    product: product.summary(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            placed_at: row.placed_at,
            payment_status: row.payment_status,
            items,
        })
    }

    fn ensure_product_exists(&self, field: &'static str, id: i64) -> Result<()> {
        if self.products.contains_key(&id) { Ok(()) } else { Err(StoreError::field(field, "does_not_exist", NO_SUCH_PRODUCT)) }
    }

    fn check_product_input(&self, input: &NewProduct) -> Result<(Slug, Price)> {
        let slug = Slug::new(input.slug.clone())?;
        let price = Price::new(input.price)?;
        if !self.collections.contains_key(&input.collection) {
            return Err(StoreError::field("collection", "does_not_exist", NO_SUCH_COLLECTION));
        }
        if input.promotions.iter().any(|id| !self.promotions.contains_key(id)) {
            return Err(StoreError::field("promotions", "does_not_exist", NO_SUCH_PROMOTION));
        }
        Ok((slug, price))
    }

    fn check_unique_user(&self, user_id: i64, except: Option<i64>) -> Result<()> {
        let taken = self.customers.values().any(|c| c.user_id == user_id && Some(c.id) != except);
        if taken { Err(StoreError::field("user_id", "unique", DUPLICATE_CUSTOMER)) } else { Ok(()) }
    }
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { tables: Arc::new(RwLock::new(Tables::default())) }
    }
}

#[async_trait]
impl CollectionRepository for InMemoryStore {
    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let tables = self.tables.read().await;
        let mut collections: Vec<Collection> = tables.collections.values().map(|row| tables.collection(row)).collect();
        collections.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(collections)
    }

    async fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let tables = self.tables.read().await;
        Ok(tables.collections.get(&id).map(|row| tables.collection(row)))
    }

    async fn create_collection(&self, input: NewCollection) -> Result<Collection> {
        let mut tables = self.tables.write().await;
        if let Some(product_id) = input.featured_product {
            tables.ensure_product_exists("featured_product", product_id)?;
        }
        let row = CollectionRow { id: tables.next_id(), title: input.title, featured_product_id: input.featured_product };
        tables.collections.insert(row.id, row.clone());
        tracing::info!(collection_id = row.id, "Created collection");
        Ok(tables.collection(&row))
    }

    async fn update_collection(&self, id: i64, input: NewCollection) -> Result<Collection> {
        let mut tables = self.tables.write().await;
        if let Some(product_id) = input.featured_product {
            tables.ensure_product_exists("featured_product", product_id)?;
        }
        let row = tables.collections.get_mut(&id).ok_or(StoreError::NotFound("collection"))?;
        row.title = input.title;
        row.featured_product_id = input.featured_product;
        let row = row.clone();
        Ok(tables.collection(&row))
    }

    async fn delete_collection(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables.collections.get(&id).ok_or(StoreError::NotFound("collection"))?;
        if !tables.collection(row).is_empty() {
            return Err(StoreError::Protected(COLLECTION_HAS_PRODUCTS.to_string()));
        }
        tables.collections.remove(&id);
        tracing::info!(collection_id = id, "Deleted collection");
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| filter.collection_id.map_or(true, |id| p.collection_id == id))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let (slug, unit_price) = tables.check_product_input(&input)?;
        let product = Product {
            id: tables.next_id(),
            title: input.title,
            slug,
            description: input.description,
            unit_price,
            inventory: input.inventory,
            last_update: Utc::now(),
            collection_id: input.collection,
            promotion_ids: dedup(input.promotions),
        };
        tables.products.insert(product.id, product.clone());
        tracing::info!(product_id = product.id, "Created product");
        Ok(product)
    }

    async fn update_product(&self, id: i64, input: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let (slug, unit_price) = tables.check_product_input(&input)?;
        let product = tables.products.get_mut(&id).ok_or(StoreError::NotFound("product"))?;
        product.title = input.title;
        product.slug = slug;
        product.description = input.description;
        product.unit_price = unit_price;
        product.inventory = input.inventory;
        product.collection_id = input.collection;
        product.promotion_ids = dedup(input.promotions);
        product.last_update = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::NotFound("product"));
        }
        if tables.order_items.values().any(|item| item.product_id == id) {
            return Err(StoreError::Protected(PRODUCT_IN_ORDER.to_string()));
        }
        tables.products.remove(&id);
        tables.images.retain(|_, image| image.product_id != id);
        tables.reviews.retain(|_, review| review.product_id != id);
        tables.cart_items.retain(|_, item| item.product_id != id);
        for collection in tables.collections.values_mut() {
            if collection.featured_product_id == Some(id) {
                collection.featured_product_id = None;
            }
        }
        tracing::info!(product_id = id, "Deleted product");
        Ok(())
    }

    async fn list_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
        let tables = self.tables.read().await;
        Ok(tables.images.values().filter(|i| i.product_id == product_id).cloned().collect())
    }

    async fn get_image(&self, product_id: i64, id: i64) -> Result<Option<ProductImage>> {
        let tables = self.tables.read().await;
        Ok(tables.images.get(&id).filter(|i| i.product_id == product_id).cloned())
    }

    async fn add_image(&self, product_id: i64, input: NewProductImage) -> Result<ProductImage> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::NotFound("product"));
        }
        let image = ProductImage { id: tables.next_id(), product_id, image: input.image };
        tables.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn delete_image(&self, product_id: i64, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.images.get(&id) {
            Some(image) if image.product_id == product_id => {
                tables.images.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("image")),
        }
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn list_reviews(&self, product_id: i64) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.values().filter(|r| r.product_id == product_id).cloned().collect())
    }

    async fn get_review(&self, product_id: i64, id: i64) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.get(&id).filter(|r| r.product_id == product_id).cloned())
    }

    async fn create_review(&self, product_id: i64, input: NewReview) -> Result<Review> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::NotFound("product"));
        }
        let review = Review {
            id: tables.next_id(),
            product_id,
            name: input.name,
            description: input.description,
            created_at: Utc::now(),
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update_review(&self, product_id: i64, id: i64, input: NewReview) -> Result<Review> {
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .get_mut(&id)
            .filter(|r| r.product_id == product_id)
            .ok_or(StoreError::NotFound("review"))?;
        review.name = input.name;
        review.description = input.description;
        Ok(review.clone())
    }

    async fn delete_review(&self, product_id: i64, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.reviews.get(&id) {
            Some(review) if review.product_id == product_id => {
                tables.reviews.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("review")),
        }
    }
}

#[async_trait]
impl PromotionRepository for InMemoryStore {
    async fn list_promotions(&self) -> Result<Vec<Promotion>> {
        Ok(self.tables.read().await.promotions.values().cloned().collect())
    }

    async fn get_promotion(&self, id: i64) -> Result<Option<Promotion>> {
        Ok(self.tables.read().await.promotions.get(&id).cloned())
    }

    async fn create_promotion(&self, input: NewPromotion) -> Result<Promotion> {
        let mut tables = self.tables.write().await;
        let promotion = Promotion { id: tables.next_id(), description: input.description, discount: input.discount };
        tables.promotions.insert(promotion.id, promotion.clone());
        Ok(promotion)
    }

    async fn delete_promotion(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.promotions.remove(&id).ok_or(StoreError::NotFound("promotion"))?;
        for product in tables.products.values_mut() {
            product.promotion_ids.retain(|p| *p != id);
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn create_cart(&self) -> Result<Cart> {
        let cart = Cart::new();
        self.tables.write().await.carts.insert(cart.id, cart.created_at);
        tracing::info!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    async fn get_cart(&self, id: Uuid) -> Result<Option<Cart>> {
        self.tables.read().await.cart(id)
    }

    async fn delete_cart(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.carts.remove(&id).ok_or(StoreError::NotFound("cart"))?;
        tables.cart_items.retain(|_, item| item.cart_id != id);
        Ok(())
    }

    async fn add_cart_item(&self, cart_id: Uuid, input: NewCartItem) -> Result<CartItem> {
        let mut tables = self.tables.write().await;
        if !tables.carts.contains_key(&cart_id) {
            return Err(StoreError::NotFound("cart"));
        }
        tables.ensure_product_exists("product_id", input.product_id)?;

        let existing = tables
            .cart_items
            .values()
            .find(|row| row.cart_id == cart_id && row.product_id == input.product_id)
            .map(|row| row.id);
        let row = match existing.and_then(|id| tables.cart_items.get_mut(&id)) {
            Some(row) => {
                row.quantity = merged_quantity(row.quantity, input.quantity)
                    .ok_or_else(|| StoreError::field("quantity", "max_value", QUANTITY_TOO_LARGE))?;
                row.clone()
            }
            None => {
                let row = CartItemRow { id: tables.next_id(), cart_id, product_id: input.product_id, quantity: input.quantity };
                tables.cart_items.insert(row.id, row.clone());
                row
            }
        };
        tables.cart_item(&row)
    }

    async fn get_cart_item(&self, cart_id: Uuid, id: i64) -> Result<Option<CartItem>> {
        let tables = self.tables.read().await;
        match tables.cart_items.get(&id) {
            Some(row) if row.cart_id == cart_id => tables.cart_item(row).map(Some),
            _ => Ok(None),
        }
    }

    async fn set_cart_item_quantity(&self, cart_id: Uuid, id: i64, quantity: i32) -> Result<CartItem> {
        let mut tables = self.tables.write().await;
        let row = tables
            .cart_items
            .get_mut(&id)
            .filter(|row| row.cart_id == cart_id)
            .ok_or(StoreError::NotFound("cart item"))?;
        row.quantity = quantity;
        let row = row.clone();
        tables.cart_item(&row)
    }

    async fn delete_cart_item(&self, cart_id: Uuid, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.cart_items.get(&id) {
            Some(row) if row.cart_id == cart_id => {
                tables.cart_items.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("cart item")),
        }
    }
}

#[async_trait]
impl CustomerRepository for InMemoryStore {
    async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn get_customer_by_user(&self, user_id: i64) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn create_customer(&self, input: NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        tables.check_unique_user(input.user_id, None)?;
        let customer = Customer {
            id: tables.next_id(),
            user_id: input.user_id,
            phone_number: input.phone_number,
            birth_date: input.birth_date,
            membership: input.membership,
        };
        tables.customers.insert(customer.id, customer.clone());
        tracing::info!(customer_id = customer.id, user_id = customer.user_id, "Created customer");
        Ok(customer)
    }

    async fn update_customer(&self, id: i64, input: NewCustomer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        tables.check_unique_user(input.user_id, Some(id))?;
        let customer = tables.customers.get_mut(&id).ok_or(StoreError::NotFound("customer"))?;
        customer.user_id = input.user_id;
        customer.phone_number = input.phone_number;
        customer.birth_date = input.birth_date;
        customer.membership = input.membership;
        Ok(customer.clone())
    }

    async fn delete_customer(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&id) {
            return Err(StoreError::NotFound("customer"));
        }
        if tables.orders.values().any(|o| o.customer_id == id) {
            return Err(StoreError::Protected(CUSTOMER_HAS_ORDERS.to_string()));
        }
        tables.customers.remove(&id);
        tables.addresses.retain(|_, a| a.customer_id != id);
        Ok(())
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>> {
        let tables = self.tables.read().await;
        if !tables.customers.contains_key(&customer_id) {
            return Err(StoreError::NotFound("customer"));
        }
        Ok(tables.addresses.values().filter(|a| a.customer_id == customer_id).cloned().collect())
    }

    async fn add_address(&self, customer_id: i64, input: NewAddress) -> Result<Address> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&customer_id) {
            return Err(StoreError::NotFound("customer"));
        }
        let address = Address { id: tables.next_id(), customer_id, street: input.street, city: input.city };
        tables.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn delete_address(&self, customer_id: i64, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.addresses.get(&id) {
            Some(address) if address.customer_id == customer_id => {
                tables.addresses.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("address")),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn list_orders(&self, customer_id: Option<i64>) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        tables
            .orders
            .values()
            .filter(|o| customer_id.map_or(true, |id| o.customer_id == id))
            .map(|o| tables.order(o))
            .collect()
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        tables.orders.get(&id).map(|o| tables.order(o)).transpose()
    }

    async fn place_order(&self, user_id: i64, cart_id: Uuid) -> Result<Order> {
        let mut tables = self.tables.write().await;

        if !tables.carts.contains_key(&cart_id) {
            return Err(StoreError::field("cart_id", "does_not_exist", NO_SUCH_CART));
        }
        let lines: Vec<CartItemRow> = tables.cart_items.values().filter(|row| row.cart_id == cart_id).cloned().collect();
        if lines.is_empty() {
            return Err(StoreError::field("cart_id", "empty", EMPTY_CART));
        }
        let customer_id = tables
            .customers
            .values()
            .find(|c| c.user_id == user_id)
            .map(|c| c.id)
            .ok_or(StoreError::NotFound("customer"))?;

        // Resolve every price before the first write so a failure leaves no trace.
        let priced = lines
            .iter()
            .map(|line| {
                let product = tables.products.get(&line.product_id).ok_or(StoreError::NotFound("product"))?;
                Ok((line.product_id, line.quantity, product.unit_price))
            })
            .collect::<Result<Vec<_>>>()?;

        let order = OrderRow { id: tables.next_id(), customer_id, placed_at: Utc::now(), payment_status: PaymentStatus::Pending };
        tables.orders.insert(order.id, order.clone());
        for (product_id, quantity, unit_price) in priced {
            let item = OrderItemRow { id: tables.next_id(), order_id: order.id, product_id, quantity, unit_price };
            tables.order_items.insert(item.id, item);
        }
        tables.carts.remove(&cart_id);
        tables.cart_items.retain(|_, item| item.cart_id != cart_id);

        tables.order(&order)
    }

    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let row = tables.orders.get_mut(&id).ok_or(StoreError::NotFound("order"))?;
        if row.payment_status != from {
            return Err(OrderError::PaymentSettled(row.payment_status).into());
        }
        row.payment_status = to;
        let row = row.clone();
        tables.order(&row)
    }

    async fn delete_order(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.orders.remove(&id).ok_or(StoreError::NotFound("order"))?;
        tables.order_items.retain(|_, item| item.order_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::MAX_QUANTITY;
    use rust_decimal_macros::dec;

    async fn seed(store: &InMemoryStore) -> (Collection, Product) {
        let collection = store
            .create_collection(NewCollection { title: "Kitchen".into(), featured_product: None })
            .await
            .unwrap();
        let product = store
            .create_product(NewProduct {
                title: "Kettle".into(),
                slug: "kettle".into(),
                description: None,
                price: dec!(20),
                inventory: 5,
                collection: collection.id,
                promotions: vec![],
            })
            .await
            .unwrap();
        (collection, product)
    }

    async fn customer(store: &InMemoryStore, user_id: i64) -> Customer {
        store
            .create_customer(NewCustomer {
                user_id,
                phone_number: "+998901234567".into(),
                birth_date: None,
                membership: Default::default(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_to_cart_merges_quantity() {
        let store = InMemoryStore::new();
        let (_, product) = seed(&store).await;
        let cart = store.create_cart().await.unwrap();

        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 3 }).await.unwrap();
        let item = store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 2 }).await.unwrap();
        assert_eq!(item.quantity, 5);

        let cart = store.get_cart(cart.id).await.unwrap().unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_price(), dec!(100.00));
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_quantity_past_limit() {
        let store = InMemoryStore::new();
        let (_, product) = seed(&store).await;
        let cart = store.create_cart().await.unwrap();

        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: MAX_QUANTITY }).await.unwrap();
        let result = store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 1 }).await;
        assert!(matches!(result, Err(StoreError::Validation(ref e)) if e.field_errors().contains_key("quantity")));

        let cart = store.get_cart(cart.id).await.unwrap().unwrap();
        assert_eq!(cart.items[0].quantity, MAX_QUANTITY);
    }

    #[tokio::test]
    async fn test_add_to_missing_cart() {
        let store = InMemoryStore::new();
        let (_, product) = seed(&store).await;
        let result = store.add_cart_item(Uuid::new_v4(), NewCartItem { product_id: product.id, quantity: 1 }).await;
        assert!(matches!(result, Err(StoreError::NotFound("cart"))));
    }

    #[tokio::test]
    async fn test_place_order_snapshots_prices() {
        let store = InMemoryStore::new();
        let (collection, product) = seed(&store).await;
        let buyer = customer(&store, 10).await;
        let cart = store.create_cart().await.unwrap();
        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 2 }).await.unwrap();

        let order = store.place_order(10, cart.id).await.unwrap();
        assert_eq!(order.customer_id, buyer.id);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price.amount(), dec!(20.00));
        assert!(store.get_cart(cart.id).await.unwrap().is_none());

        let reprice = NewProduct {
            title: product.title.clone(),
            slug: product.slug.to_string(),
            description: None,
            price: dec!(35),
            inventory: 5,
            collection: collection.id,
            promotions: vec![],
        };
        store.update_product(product.id, reprice).await.unwrap();
        let order = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.items[0].unit_price.amount(), dec!(20.00));
        assert_eq!(order.items[0].product.unit_price.amount(), dec!(35.00));
    }

    #[tokio::test]
    async fn test_place_order_without_profile_changes_nothing() {
        let store = InMemoryStore::new();
        let (_, product) = seed(&store).await;
        let cart = store.create_cart().await.unwrap();
        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 1 }).await.unwrap();

        let result = store.place_order(99, cart.id).await;
        assert!(matches!(result, Err(StoreError::NotFound("customer"))));
        assert_eq!(store.get_cart(cart.id).await.unwrap().unwrap().item_count(), 1);
        assert!(store.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_status_change_from_stale_status() {
        let store = InMemoryStore::new();
        let (_, product) = seed(&store).await;
        customer(&store, 1).await;
        let cart = store.create_cart().await.unwrap();
        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 1 }).await.unwrap();
        let order = store.place_order(1, cart.id).await.unwrap();

        store.set_payment_status(order.id, PaymentStatus::Pending, PaymentStatus::Completed).await.unwrap();
        let result = store.set_payment_status(order.id, PaymentStatus::Pending, PaymentStatus::Failed).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        let order = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_deletion_guards() {
        let store = InMemoryStore::new();
        let (collection, product) = seed(&store).await;
        customer(&store, 1).await;

        let result = store.delete_collection(collection.id).await;
        assert!(matches!(result, Err(StoreError::Protected(_))));

        let cart = store.create_cart().await.unwrap();
        store.add_cart_item(cart.id, NewCartItem { product_id: product.id, quantity: 1 }).await.unwrap();
        store.place_order(1, cart.id).await.unwrap();

        let result = store.delete_product(product.id).await;
        assert!(matches!(result, Err(StoreError::Protected(_))));
        assert!(store.get_product(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_customer_rejected() {
        let store = InMemoryStore::new();
        customer(&store, 5).await;
        let result = store
            .create_customer(NewCustomer {
                user_id: 5,
                phone_number: "+998911234567".into(),
                birth_date: None,
                membership: Default::default(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }
}
